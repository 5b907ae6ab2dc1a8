//! Mediator FSM: the intermediate hop. Its central invariant is that the
//! outbound lock must expire strictly earlier than the inbound lock, by at
//! least `reveal_timeout` blocks, so the mediator always has room to claim
//! on-chain from upstream after learning a secret downstream refuses to
//! settle off-chain.

use waypoint_primitives::{
	hashing::hash_secret,
	types::{
		BlockNumber,
		Bytes,
	},
};

use super::routes;
use crate::{
	channel,
	errors::StateTransitionError,
	types::{
		ActionCancelRoute,
		ActionInitMediator,
		ChannelMap,
		ChannelStatus,
		ContractSecretReveal,
		ContractSendChannelClose,
		ContractSendWithdraw,
		Event,
		HashTimeLock,
		LockedTransferState,
		MediatorTransferState,
		PairState,
		Random,
		ErrorByzantineBehavior,
		ReceiveBalanceProof,
		ReceiveSecretReveal,
		ReceiveTransferRefund,
		RouteState,
		SecretHash,
		SendAnnounceDisposed,
		SendBalanceProof,
		SendLockedTransfer,
		SendSecretReveal,
		TransferPairState,
	},
	views,
};

fn empty_secret() -> Bytes {
	Bytes(vec![])
}

/// Rule 1: pick the first route whose settle-timeout leaves the mediator at
/// least `reveal_timeout` blocks of margin against the inbound lock's
/// expiration, and forward with a strictly earlier expiration. With no such
/// route, refund the payer.
pub fn init(
	action: ActionInitMediator,
	channels: &mut ChannelMap,
	block_number: BlockNumber,
	rng: &mut Random,
) -> Result<(Option<MediatorTransferState>, Vec<Event>), StateTransitionError> {
	let from_transfer = action.from_transfer;
	let payer_channel = channels
		.get_mut(&from_transfer.canonical_identifier.channel_identifier)
		.ok_or_else(|| StateTransitionError::from("inbound route points at an unknown channel"))?;
	channel::handle_receive_locked_transfer(
		payer_channel,
		HashTimeLock { amount: from_transfer.amount, expiration: from_transfer.expiration, secret_hash: from_transfer.secret_hash },
		action.balance_proof,
	)?;

	try_route(from_transfer, action.from_route, action.routes, channels, block_number, rng)
}

/// The routing half of rule 1, split out from `init` so that rule 6's retry
/// (the lock is already recorded on the payer channel from the first
/// delivery) doesn't re-validate it against the channel a second time.
fn try_route(
	from_transfer: LockedTransferState,
	from_route: RouteState,
	available_routes: Vec<RouteState>,
	channels: &mut ChannelMap,
	block_number: BlockNumber,
	rng: &mut Random,
) -> Result<(Option<MediatorTransferState>, Vec<Event>), StateTransitionError> {
	let reveal_timeout = channels
		.get(&from_transfer.canonical_identifier.channel_identifier)
		.map(|c| c.reveal_timeout)
		.unwrap_or_default();
	let required_margin = from_transfer.expiration.saturating_sub(block_number) + reveal_timeout;
	let picked = routes::pick_route_where(channels, &available_routes, from_transfer.amount, |route| {
		route.settle_timeout >= required_margin
	});

	let route = match picked {
		Ok(route) => route,
		Err(_) => {
			let event = Event::SendAnnounceDisposed(SendAnnounceDisposed {
				recipient: from_route.hop_node,
				message_identifier: rng.next(),
				secret_hash: from_transfer.secret_hash,
				transfer: from_transfer,
			});
			return Ok((None, vec![event]))
		},
	};

	let payee_expiration = from_transfer.expiration - reveal_timeout;
	let lock =
		HashTimeLock { amount: from_transfer.amount, expiration: payee_expiration, secret_hash: from_transfer.secret_hash };
	let channel = channels
		.get_mut(&route.channel_identifier)
		.ok_or_else(|| StateTransitionError::from("route points at an unknown channel"))?;
	let balance_proof = channel::send_locked_transfer(channel, lock)?;

	let payee_transfer = LockedTransferState {
		payment_identifier: from_transfer.payment_identifier,
		message_identifier: rng.next(),
		amount: from_transfer.amount,
		expiration: payee_expiration,
		secret_hash: from_transfer.secret_hash,
		secret: from_transfer.secret.clone(),
		token: from_transfer.token,
		initiator: from_transfer.initiator,
		target: from_transfer.target,
		canonical_identifier: channel.canonical_identifier.clone(),
	};
	let event = Event::SendLockedTransfer(SendLockedTransfer {
		recipient: route.hop_node,
		message_identifier: payee_transfer.message_identifier,
		canonical_identifier: payee_transfer.canonical_identifier.clone(),
		transfer: payee_transfer.clone(),
		balance_proof,
	});

	let pair = TransferPairState {
		payer_address: from_route.hop_node,
		payee_address: route.hop_node,
		payer_transfer: from_transfer,
		payee_transfer,
		state: PairState::Pending,
	};
	let state = MediatorTransferState {
		secret_hash: pair.payer_transfer.secret_hash,
		secret: pair.payer_transfer.secret.clone(),
		routes: routes::without_route(&available_routes, &route),
		transfers_pair: vec![pair],
	};
	Ok((Some(state), vec![event]))
}

fn find_pair_mut<'a>(state: &'a mut MediatorTransferState, secret_hash: &SecretHash) -> Option<&'a mut TransferPairState> {
	state.transfers_pair.iter_mut().find(|pair| &pair.payer_transfer.secret_hash == secret_hash)
}

/// Rule 2: the payee revealing the secret is the commit point — from here
/// the mediator can always claim upstream, so it is safe to reveal backward
/// to the payer.
pub fn handle_secret_reveal(
	mut state: MediatorTransferState,
	reveal: ReceiveSecretReveal,
) -> (Option<MediatorTransferState>, Vec<Event>) {
	if hash_secret(&reveal.secret.0) != reveal.secret_hash {
		return (
			Some(state),
			vec![Event::ErrorByzantineBehavior(ErrorByzantineBehavior {
				sender: reveal.sender,
				reason: "revealed secret does not hash to the locked secret hash".into(),
			})],
		)
	}

	let payee_address =
		state.transfers_pair.iter().find(|pair| pair.payer_transfer.secret_hash == reveal.secret_hash).map(|pair| pair.payee_address);
	if let Some(payee_address) = payee_address {
		if reveal.sender != payee_address {
			return (
				Some(state),
				vec![Event::ErrorByzantineBehavior(ErrorByzantineBehavior {
					sender: reveal.sender,
					reason: "secret reveal did not come from the payee of this pair".into(),
				})],
			)
		}
	}

	let mut events = vec![];
	if let Some(pair) = find_pair_mut(&mut state, &reveal.secret_hash) {
		pair.payee_transfer.secret = Some(reveal.secret.clone());
		pair.payer_transfer.secret = Some(reveal.secret.clone());
		pair.state = PairState::PayeeSecretRevealed;
		events.push(Event::SendSecretReveal(SendSecretReveal {
			recipient: pair.payer_address,
			message_identifier: pair.payer_transfer.message_identifier,
			secret: reveal.secret,
			secret_hash: reveal.secret_hash,
		}));
	}
	state.secret = Some(reveal.secret);
	(Some(state), events)
}

/// Rules 3/4: a balance proof from the payee only marks that side settled;
/// the balance proof to the payer is only emitted once the mediator has
/// itself learned the secret and seen the payee's balance proof — never
/// merely because it revealed to the payer.
pub fn handle_balance_proof(
	mut state: MediatorTransferState,
	proof: ReceiveBalanceProof,
	channels: &mut ChannelMap,
) -> Result<(Option<MediatorTransferState>, Vec<Event>), StateTransitionError> {
	let mut events = vec![];
	let is_payee_side = find_pair_mut(&mut state, &proof.secret_hash)
		.map(|pair| proof.sender == pair.payee_address)
		.ok_or_else(|| StateTransitionError::from("balance proof for unknown pair"))?;

	if is_payee_side {
		if let Some(pair) = find_pair_mut(&mut state, &proof.secret_hash) {
			pair.state = PairState::PayeeBalanceProof;
		}
	} else if let Some(pair) = find_pair_mut(&mut state, &proof.secret_hash) {
		if pair.secret_known() && pair.state == PairState::PayeeBalanceProof {
			pair.state = PairState::PayerBalanceProof;
			let channel = channels
				.get_mut(&pair.payee_transfer.canonical_identifier.channel_identifier)
				.ok_or_else(|| StateTransitionError::from("mediator payee channel vanished"))?;
			let balance_proof = channel::send_unlock(channel, pair.payee_transfer.secret_hash)?;
			events.push(Event::SendBalanceProof(SendBalanceProof {
				recipient: pair.payee_address,
				message_identifier: pair.payee_transfer.message_identifier,
				payment_identifier: pair.payee_transfer.payment_identifier,
				secret_hash: pair.payee_transfer.secret_hash,
				secret: pair.payee_transfer.secret.clone().unwrap_or_else(empty_secret),
				canonical_identifier: channel.canonical_identifier.clone(),
				balance_proof,
			}));
		}
	}

	if state.transfers_pair.iter().all(|pair| pair.state == PairState::PayerBalanceProof) {
		return Ok((None, events))
	}
	Ok((Some(state), events))
}

/// Rule 6: the payee refused the route; try forwarding the same inbound
/// lock on the next available route.
pub fn handle_refund(
	mut state: MediatorTransferState,
	refund: ReceiveTransferRefund,
	channels: &mut ChannelMap,
	block_number: BlockNumber,
	rng: &mut Random,
) -> Result<(Option<MediatorTransferState>, Vec<Event>), StateTransitionError> {
	let secret_hash = refund.transfer.secret_hash;
	let position = match state.transfers_pair.iter().position(|pair| pair.payer_transfer.secret_hash == secret_hash) {
		Some(position) => position,
		None => return Ok((Some(state), vec![])),
	};
	let cancelled = state.transfers_pair.remove(position);

	let from_route = RouteState {
		hop_node: cancelled.payer_address,
		channel_identifier: cancelled.payer_transfer.canonical_identifier.channel_identifier,
		available_balance: cancelled.payer_transfer.amount,
		reveal_timeout: 0,
		settle_timeout: 0,
		closed: false,
	};
	let (retried, events) =
		try_route(cancelled.payer_transfer, from_route, state.routes.clone(), channels, block_number, rng)?;
	if let Some(retried) = retried {
		state.transfers_pair.extend(retried.transfers_pair);
		state.routes = retried.routes;
	}

	if state.transfers_pair.is_empty() {
		return Ok((None, events))
	}
	Ok((Some(state), events))
}

pub fn handle_cancel_route(
	mut state: MediatorTransferState,
	cancel: ActionCancelRoute,
) -> (Option<MediatorTransferState>, Vec<Event>) {
	state.transfers_pair.retain(|pair| pair.payer_transfer.secret_hash != cancel.secret_hash);
	if state.transfers_pair.is_empty() {
		return (None, vec![])
	}
	(Some(state), vec![])
}

pub fn handle_contract_secret_reveal(
	mut state: MediatorTransferState,
	reveal: ContractSecretReveal,
) -> (Option<MediatorTransferState>, Vec<Event>) {
	state.secret = Some(reveal.secret.clone());
	for pair in state.transfers_pair.iter_mut() {
		pair.payee_transfer.secret = Some(reveal.secret.clone());
		pair.payer_transfer.secret = Some(reveal.secret.clone());
	}
	(Some(state), vec![])
}

/// Rule 5: per pair, withdraw on-chain once the payer's channel is no
/// longer open and the secret is known; close the payer channel once
/// waiting is no longer safe; drop pairs whose payer lock expired
/// unclaimed.
pub fn handle_block(
	mut state: MediatorTransferState,
	block_number: BlockNumber,
	channels: &ChannelMap,
) -> (Option<MediatorTransferState>, Vec<Event>) {
	let mut events = vec![];
	for pair in state.transfers_pair.iter_mut() {
		if matches!(pair.state, PairState::Expired | PairState::ContractWithdraw) {
			continue
		}
		let secret_known = pair.secret_known();
		let payer_channel = channels.get(&pair.payer_transfer.canonical_identifier.channel_identifier);
		let payer_open = payer_channel.map(|c| c.status == ChannelStatus::Opened).unwrap_or(true);

		if secret_known && !payer_open {
			events.push(Event::ContractSendWithdraw(ContractSendWithdraw {
				canonical_identifier: pair.payer_transfer.canonical_identifier.clone(),
				secret: pair.payer_transfer.secret.clone().unwrap_or_else(empty_secret),
				secret_hash: pair.payer_transfer.secret_hash,
			}));
			pair.state = PairState::ContractWithdraw;
			continue
		}

		let reveal_timeout = payer_channel.map(|c| c.reveal_timeout).unwrap_or_default();
		let inbound_lock = HashTimeLock {
			amount: pair.payer_transfer.amount,
			expiration: pair.payer_transfer.expiration,
			secret_hash: pair.payer_transfer.secret_hash,
		};
		if secret_known &&
			!views::safe_to_wait(&inbound_lock, reveal_timeout, block_number) &&
			pair.state != PairState::ContractClose
		{
			events.push(Event::ContractSendChannelClose(ContractSendChannelClose {
				canonical_identifier: pair.payer_transfer.canonical_identifier.clone(),
			}));
			pair.state = PairState::ContractClose;
			continue
		}

		if !secret_known && block_number >= pair.payer_transfer.expiration {
			pair.state = PairState::Expired;
		}
	}

	state.transfers_pair.retain(|pair| pair.state != PairState::Expired);
	if state.transfers_pair.is_empty() {
		return (None, events)
	}
	(Some(state), events)
}
