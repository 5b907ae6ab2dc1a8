//! Initiator FSM: drives a payment from the sender through
//! `WaitingSecretRequest -> WaitingReveal -> WaitingBalanceProof -> Done`,
//! with `Expired` reachable from any non-terminal state once the lock's
//! expiration passes.

use waypoint_primitives::types::BlockNumber;

use super::routes;
use crate::{
	channel,
	errors::StateTransitionError,
	types::{
		ActionInitInitiator,
		ChannelMap,
		ContractSecretReveal,
		Event,
		EventPaymentSentSuccess,
		EventTransferFailed,
		HashTimeLock,
		InitiatorState,
		InitiatorTransferState,
		LockedTransferState,
		Random,
		ReceiveBalanceProof,
		ReceiveSecretRequest,
		ReceiveSecretReveal,
		ReceiveTransferRefund,
		SendBalanceProof,
		SendLockedTransfer,
		SendSecretReveal,
	},
};

/// Rule 1: select the first route whose channel is open, has enough
/// capacity, and leaves at least `2*reveal_timeout + 1` blocks of margin
/// between the computed expiration and the current block; lock the amount
/// on it and emit the opening `MediatedTransfer`.
pub fn init(
	action: ActionInitInitiator,
	channels: &mut ChannelMap,
	block_number: BlockNumber,
	rng: &mut Random,
) -> Result<(Option<InitiatorTransferState>, Vec<Event>), StateTransitionError> {
	let description = action.transfer_description;
	let picked = routes::pick_route_where(channels, &action.routes, description.amount, |route| {
		let expiration = block_number + route.settle_timeout - route.reveal_timeout;
		expiration.saturating_sub(block_number) >= 2 * route.reveal_timeout + 1
	});

	let route = match picked {
		Ok(route) => route,
		Err(_) => {
			let event = Event::EventTransferFailed(EventTransferFailed {
				payment_identifier: description.payment_identifier,
				secret_hash: description.secret_hash,
				reason: "no route".into(),
			});
			return Ok((None, vec![event]))
		},
	};

	let expiration = block_number + route.settle_timeout - route.reveal_timeout;
	let lock = HashTimeLock { amount: description.amount, expiration, secret_hash: description.secret_hash };
	let channel = channels
		.get_mut(&route.channel_identifier)
		.ok_or_else(|| StateTransitionError::from("route points at an unknown channel"))?;
	let balance_proof = channel::send_locked_transfer(channel, lock)?;

	let transfer = LockedTransferState {
		payment_identifier: description.payment_identifier,
		message_identifier: rng.next(),
		amount: description.amount,
		expiration,
		secret_hash: description.secret_hash,
		secret: None,
		token: description.token_network_address,
		initiator: description.initiator,
		target: description.target,
		canonical_identifier: channel.canonical_identifier.clone(),
	};
	let event = Event::SendLockedTransfer(SendLockedTransfer {
		recipient: route.hop_node,
		message_identifier: transfer.message_identifier,
		canonical_identifier: transfer.canonical_identifier.clone(),
		transfer: transfer.clone(),
		balance_proof,
	});

	let state = InitiatorTransferState {
		transfer_description: description,
		routes: routes::without_route(&action.routes, &route),
		channel_identifier: route.channel_identifier,
		transfer,
		received_secret_request: false,
		state: InitiatorState::WaitingSecretRequest,
	};
	Ok((Some(state), vec![event]))
}

/// Rule 2: the target asking for the secret is only honored once, and only
/// from the declared target with the declared amount.
pub fn handle_secret_request(
	mut state: InitiatorTransferState,
	request: ReceiveSecretRequest,
) -> (Option<InitiatorTransferState>, Vec<Event>) {
	if state.received_secret_request ||
		request.sender != state.transfer.target ||
		request.amount != state.transfer.amount ||
		request.secret_hash != state.transfer.secret_hash
	{
		return (Some(state), vec![])
	}

	state.received_secret_request = true;
	state.state = InitiatorState::WaitingReveal;
	let event = Event::SendSecretReveal(SendSecretReveal {
		recipient: state.transfer.target,
		message_identifier: state.transfer.message_identifier,
		secret: state.transfer_description.secret.clone(),
		secret_hash: state.transfer.secret_hash,
	});
	(Some(state), vec![event])
}

/// Rule 3: learning the secret, whether off-chain from the next hop or
/// on-chain via the secret registry, unlocks the closing balance proof to
/// that hop.
pub fn handle_secret_reveal(
	mut state: InitiatorTransferState,
	reveal: ReceiveSecretReveal,
	channels: &mut ChannelMap,
) -> Result<(Option<InitiatorTransferState>, Vec<Event>), StateTransitionError> {
	bind_secret_and_close(&mut state, reveal.secret, channels)
}

pub fn handle_contract_secret_reveal(
	mut state: InitiatorTransferState,
	reveal: ContractSecretReveal,
	channels: &mut ChannelMap,
) -> Result<(Option<InitiatorTransferState>, Vec<Event>), StateTransitionError> {
	bind_secret_and_close(&mut state, reveal.secret, channels)
}

fn bind_secret_and_close(
	state: &mut InitiatorTransferState,
	secret: waypoint_primitives::types::Secret,
	channels: &mut ChannelMap,
) -> Result<(Option<InitiatorTransferState>, Vec<Event>), StateTransitionError> {
	if state.transfer.secret.is_some() {
		return Ok((Some(state.clone()), vec![]))
	}
	state.transfer.secret = Some(secret.clone());
	state.state = InitiatorState::WaitingBalanceProof;

	let channel = channels
		.get_mut(&state.channel_identifier)
		.ok_or_else(|| StateTransitionError::from("initiator channel vanished"))?;
	let balance_proof = channel::send_unlock(channel, state.transfer.secret_hash)?;
	let recipient = channel.partner_state.address;
	let event = Event::SendBalanceProof(SendBalanceProof {
		recipient,
		message_identifier: state.transfer.message_identifier,
		payment_identifier: state.transfer.payment_identifier,
		secret_hash: state.transfer.secret_hash,
		secret,
		canonical_identifier: channel.canonical_identifier.clone(),
		balance_proof,
	});
	Ok((Some(state.clone()), vec![event]))
}

/// Rule 4: the next hop refused the route; try another, or fail.
pub fn handle_refund(
	state: InitiatorTransferState,
	_refund: ReceiveTransferRefund,
	channels: &mut ChannelMap,
	block_number: BlockNumber,
	rng: &mut Random,
) -> Result<(Option<InitiatorTransferState>, Vec<Event>), StateTransitionError> {
	let action = ActionInitInitiator { transfer_description: state.transfer_description, routes: state.routes };
	init(action, channels, block_number, rng)
}

/// The next hop confirmed the closing balance proof: the payment is done.
pub fn handle_balance_proof(
	state: InitiatorTransferState,
	_proof: ReceiveBalanceProof,
) -> (Option<InitiatorTransferState>, Vec<Event>) {
	let event = Event::EventPaymentSentSuccess(EventPaymentSentSuccess {
		payment_identifier: state.transfer.payment_identifier,
		secret_hash: state.transfer.secret_hash,
		amount: state.transfer.amount,
		target: state.transfer.target,
	});
	(None, vec![event])
}

/// Rule 5: block advance past the reveal deadline without a known secret
/// tries the next route; past the lock's own expiration, the payment fails
/// outright.
pub fn handle_block(
	state: InitiatorTransferState,
	block_number: BlockNumber,
	channels: &mut ChannelMap,
	rng: &mut Random,
) -> Result<(Option<InitiatorTransferState>, Vec<Event>), StateTransitionError> {
	if state.transfer.secret.is_some() {
		return Ok((Some(state), vec![]))
	}

	if block_number >= state.transfer.expiration {
		let event = Event::EventTransferFailed(EventTransferFailed {
			payment_identifier: state.transfer.payment_identifier,
			secret_hash: state.transfer.secret_hash,
			reason: "lock expired".into(),
		});
		return Ok((None, vec![event]))
	}

	if block_number >= state.transfer.expiration.saturating_sub(
		channels
			.get(&state.channel_identifier)
			.map(|c| c.reveal_timeout)
			.unwrap_or_default(),
	) && !state.routes.is_empty()
	{
		let action =
			ActionInitInitiator { transfer_description: state.transfer_description.clone(), routes: state.routes.clone() };
		return init(action, channels, block_number, rng)
	}

	Ok((Some(state), vec![]))
}
