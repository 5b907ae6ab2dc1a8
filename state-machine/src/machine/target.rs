//! Target FSM: receives the payment.
//!
//! Rule 1's silent no-op when `!safeToWait` at init is intentional, not an
//! omission: a lock that already fails the safety margin at the moment it
//! arrives is not worth asking for the secret over — the upstream nodes
//! will recover it through their own expiry handling, and an explicit
//! refusal here would only add another signed message for no change in
//! outcome.

use waypoint_primitives::types::BlockNumber;

use waypoint_primitives::hashing::hash_secret;

use crate::{
	channel,
	errors::StateTransitionError,
	types::{
		ActionInitTarget,
		ChannelMap,
		ChannelStatus,
		ContractSendChannelClose,
		ContractSendWithdraw,
		Event,
		EventTransferReceivedSuccess,
		EventWithdrawFailed,
		EventWithdrawSuccess,
		ReceiveBalanceProof,
		ReceiveSecretReveal,
		SendSecretRequest,
		TargetState,
		TargetTransferState,
	},
	views,
};

/// Rule 1.
pub fn init(
	action: ActionInitTarget,
	channels: &mut ChannelMap,
	block_number: BlockNumber,
	rng: &mut crate::types::Random,
) -> Result<(Option<TargetTransferState>, Vec<Event>), StateTransitionError> {
	let channel = channels
		.get_mut(&action.from_transfer.canonical_identifier.channel_identifier)
		.ok_or_else(|| StateTransitionError::from("inbound route points at an unknown channel"))?;
	let reveal_timeout = channel.reveal_timeout;
	let lock = crate::types::HashTimeLock {
		amount: action.from_transfer.amount,
		expiration: action.from_transfer.expiration,
		secret_hash: action.from_transfer.secret_hash,
	};
	channel::handle_receive_locked_transfer(channel, lock.clone(), action.balance_proof)?;

	if !views::safe_to_wait(&lock, reveal_timeout, block_number) {
		return Ok((None, vec![]))
	}

	let event = Event::SendSecretRequest(SendSecretRequest {
		recipient: action.from_transfer.initiator,
		message_identifier: rng.next(),
		payment_identifier: action.from_transfer.payment_identifier,
		secret_hash: action.from_transfer.secret_hash,
		amount: action.from_transfer.amount,
		expiration: action.from_transfer.expiration,
	});
	let state = TargetTransferState {
		from_transfer: action.from_transfer,
		from_route: action.from_route,
		state: TargetState::SecretRequested,
		withdrawn: false,
	};
	Ok((Some(state), vec![event]))
}

/// Rule 2: the revealed secret must actually hash to the lock it claims to
/// open.
pub fn handle_secret_reveal(
	mut state: TargetTransferState,
	reveal: ReceiveSecretReveal,
) -> (Option<TargetTransferState>, Vec<Event>) {
	if hash_secret(&reveal.secret.0) != state.from_transfer.secret_hash {
		return (
			Some(state),
			vec![Event::ErrorByzantineBehavior(crate::types::ErrorByzantineBehavior {
				sender: reveal.sender,
				reason: "revealed secret does not hash to the locked secret hash".into(),
			})],
		)
	}

	state.from_transfer.secret = Some(reveal.secret.clone());
	state.state = TargetState::RevealSecret;
	let event = Event::SendSecretReveal(crate::types::SendSecretReveal {
		recipient: state.from_route.hop_node,
		message_identifier: state.from_transfer.message_identifier,
		secret: reveal.secret,
		secret_hash: state.from_transfer.secret_hash,
	});
	(Some(state), vec![event])
}

/// Rule 3: once the same hop that forwarded the lock confirms with a
/// balance proof, the payment is complete.
pub fn handle_balance_proof(
	state: TargetTransferState,
	proof: ReceiveBalanceProof,
) -> (Option<TargetTransferState>, Vec<Event>) {
	if proof.sender != state.from_route.hop_node {
		return (Some(state), vec![])
	}

	let events = vec![
		Event::EventTransferReceivedSuccess(EventTransferReceivedSuccess {
			payment_identifier: state.from_transfer.payment_identifier,
			secret_hash: state.from_transfer.secret_hash,
			amount: state.from_transfer.amount,
			initiator: state.from_transfer.initiator,
		}),
		Event::EventWithdrawSuccess(EventWithdrawSuccess { secret_hash: state.from_transfer.secret_hash }),
	];
	(None, events)
}

/// Rule 4: close on-chain if waiting is no longer safe; withdraw on-chain
/// once the inbound channel is no longer open.
pub fn handle_block(
	mut state: TargetTransferState,
	block_number: BlockNumber,
	channels: &mut ChannelMap,
) -> Result<(Option<TargetTransferState>, Vec<Event>), StateTransitionError> {
	if state.from_transfer.secret.is_none() {
		if block_number > state.from_transfer.expiration {
			let event = Event::EventWithdrawFailed(EventWithdrawFailed {
				secret_hash: state.from_transfer.secret_hash,
				reason: "lock expired".into(),
			});
			return Ok((None, vec![event]))
		}
		return Ok((Some(state), vec![]))
	}

	let mut events = vec![];
	let channel = channels.get(&state.from_transfer.canonical_identifier.channel_identifier);
	let reveal_timeout = channel.map(|c| c.reveal_timeout).unwrap_or(state.from_route.reveal_timeout);
	let lock = crate::types::HashTimeLock {
		amount: state.from_transfer.amount,
		expiration: state.from_transfer.expiration,
		secret_hash: state.from_transfer.secret_hash,
	};

	if !views::safe_to_wait(&lock, reveal_timeout, block_number) && state.state != TargetState::WaitingClose {
		events.push(Event::ContractSendChannelClose(ContractSendChannelClose {
			canonical_identifier: state.from_transfer.canonical_identifier.clone(),
		}));
		state.state = TargetState::WaitingClose;
	}

	let channel_open = channel.map(|c| c.status == ChannelStatus::Opened).unwrap_or(true);
	if !channel_open && !state.withdrawn {
		if let Some(channel) = channels.get_mut(&state.from_transfer.canonical_identifier.channel_identifier) {
			channel::handle_refund(channel, state.from_transfer.secret_hash);
		}
		events.push(Event::ContractSendWithdraw(ContractSendWithdraw {
			canonical_identifier: state.from_transfer.canonical_identifier.clone(),
			secret: state.from_transfer.secret.clone().unwrap_or_else(|| waypoint_primitives::types::Bytes(vec![])),
			secret_hash: state.from_transfer.secret_hash,
		}));
		state.withdrawn = true;
	}

	Ok((Some(state), events))
}
