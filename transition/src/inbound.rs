//! Wire `Message` to `StateChange` mapping, the reverse of
//! `waypoint_messages::from_event`. Routes are never computed here: a
//! `from_route` is read off the channel the message arrived on, and the
//! mediator's candidate `routes` are the node's other known open channels,
//! not a ranked or pathfound set.

use waypoint_primitives::{
	hashing::hash_secret,
	types::{
		Address,
		ChannelIdentifier,
		SecretHash,
		TokenAmount,
	},
};
use waypoint_messages::{
	AnnounceDisposedMessage,
	BalanceProofMessage,
	MediatedTransfer,
	Message,
	RevealSecretMessage,
	SecretRequestMessage,
};
use waypoint_state_machine::types::{
	ActionInitMediator,
	ActionInitTarget,
	BalanceProofState,
	CanonicalIdentifier,
	ChannelMap,
	ChannelState,
	ChannelStatus,
	LockedTransferState,
	ReceiveBalanceProof,
	ReceiveSecretRequest,
	ReceiveSecretReveal,
	ReceiveTransferRefund,
	RouteState,
	StateChange,
};

use crate::error::RouterError;

fn channel_identifier_of(channels: &ChannelMap, id: ChannelIdentifier) -> Result<&ChannelState, RouterError> {
	channels.get(&id).ok_or(RouterError::UnknownChannel(id))
}

fn route_from_channel(channels: &ChannelMap, channel_identifier: ChannelIdentifier, hop_node: Address) -> Result<RouteState, RouterError> {
	let channel = channel_identifier_of(channels, channel_identifier)?;
	Ok(RouteState {
		hop_node,
		channel_identifier,
		available_balance: channel.partner_state.contract_balance.saturating_sub(channel.partner_state.locked_amount()),
		reveal_timeout: channel.reveal_timeout,
		settle_timeout: channel.settle_timeout,
		closed: channel.status != ChannelStatus::Opened,
	})
}

/// Every other open channel this node knows about, as candidate next hops
/// for a mediated transfer. Not a route-ranking: the FSM itself picks among
/// these by margin, per its own rules.
fn other_open_routes(channels: &ChannelMap, exclude: ChannelIdentifier) -> Vec<RouteState> {
	channels
		.values()
		.filter(|channel| channel.channel_identifier() != exclude && channel.status == ChannelStatus::Opened)
		.map(|channel| RouteState {
			hop_node: channel.partner_state.address,
			channel_identifier: channel.channel_identifier(),
			available_balance: channel.our_state.contract_balance.saturating_sub(channel.our_state.locked_amount()),
			reveal_timeout: channel.reveal_timeout,
			settle_timeout: channel.settle_timeout,
			closed: false,
		})
		.collect()
}

fn mediated_transfer_balance_proof(m: &MediatedTransfer, chain_id: u64) -> BalanceProofState {
	BalanceProofState {
		nonce: m.nonce,
		transferred_amount: m.transferred_amount,
		locked_amount: m.locked_amount,
		locksroot: m.locksroot,
		canonical_identifier: CanonicalIdentifier { chain_id, token_address: m.token, channel_identifier: m.channel_identifier },
		signature: m.signature.clone(),
		sender: m.sender,
	}
}

fn mediated_transfer_locked_transfer(m: &MediatedTransfer, chain_id: u64) -> LockedTransferState {
	LockedTransferState {
		payment_identifier: m.payment_identifier,
		message_identifier: m.message_identifier,
		amount: m.lock.amount,
		expiration: m.lock.expiration,
		secret_hash: m.lock.secret_hash,
		secret: None,
		token: m.token,
		initiator: m.initiator,
		target: m.target,
		canonical_identifier: CanonicalIdentifier { chain_id, token_address: m.token, channel_identifier: m.channel_identifier },
	}
}

/// `m.target == our_address` starts a `Target` instance; anything else
/// starts a `Mediator` instance forwarding toward `m.target`.
fn from_mediated_transfer(m: MediatedTransfer, our_address: Address, channels: &ChannelMap) -> Result<StateChange, RouterError> {
	let channel = channel_identifier_of(channels, m.channel_identifier)?;
	let chain_id = channel.canonical_identifier.chain_id;
	let from_route = route_from_channel(channels, m.channel_identifier, m.sender)?;
	let balance_proof = mediated_transfer_balance_proof(&m, chain_id);
	let from_transfer = mediated_transfer_locked_transfer(&m, chain_id);

	if m.target == our_address {
		return Ok(StateChange::ActionInitTarget(ActionInitTarget { from_transfer, from_route, balance_proof }))
	}

	let routes = other_open_routes(channels, m.channel_identifier);
	Ok(StateChange::ActionInitMediator(ActionInitMediator { from_transfer, from_route, balance_proof, routes }))
}

fn from_secret_request(m: SecretRequestMessage) -> StateChange {
	StateChange::ReceiveSecretRequest(ReceiveSecretRequest { sender: m.sender, secret_hash: m.secret_hash, amount: m.amount })
}

fn from_reveal_secret(m: RevealSecretMessage) -> StateChange {
	let secret_hash = hash_secret(&m.secret.0);
	StateChange::ReceiveSecretReveal(ReceiveSecretReveal { sender: m.sender, secret: m.secret, secret_hash })
}

/// The locked amount on our side of the ledger after this unlock clears, not
/// the wire-claimed figure: derived from the channel's own lock tree so
/// acceptance can't be steered by a sender-supplied number.
fn balance_proof_locked_amount(
	channels: &ChannelMap,
	channel_identifier: ChannelIdentifier,
	secret_hash: SecretHash,
) -> Result<TokenAmount, RouterError> {
	let channel = channel_identifier_of(channels, channel_identifier)?;
	let lock_amount = channel
		.partner_state
		.find_lock(&secret_hash)
		.map(|lock| lock.amount)
		.ok_or(RouterError::UnknownChannel(channel_identifier))?;
	Ok(channel.partner_state.locked_amount().saturating_sub(lock_amount))
}

fn from_balance_proof(m: BalanceProofMessage, channels: &ChannelMap) -> Result<StateChange, RouterError> {
	let channel = channel_identifier_of(channels, m.channel_identifier)?;
	let chain_id = channel.canonical_identifier.chain_id;
	let token_address = channel.token_address;
	let locked_amount = balance_proof_locked_amount(channels, m.channel_identifier, m.secret_hash)?;
	let balance_proof = BalanceProofState {
		nonce: m.nonce,
		transferred_amount: m.transferred_amount,
		locked_amount,
		locksroot: m.locksroot,
		canonical_identifier: CanonicalIdentifier { chain_id, token_address, channel_identifier: m.channel_identifier },
		signature: m.signature,
		sender: m.sender,
	};
	Ok(StateChange::ReceiveBalanceProof(ReceiveBalanceProof { sender: m.sender, secret_hash: m.secret_hash, balance_proof }))
}

fn from_announce_disposed(m: AnnounceDisposedMessage) -> StateChange {
	StateChange::ReceiveTransferRefund(ReceiveTransferRefund { sender: m.sender, transfer: m.transfer })
}

/// Map a verified inbound `Message` to the `StateChange` the Router should
/// apply. `channels` is a point-in-time read of the node's channel cache,
/// used only to fill in fields the wire format itself omits
/// (`chain_id`, route timeouts, the post-unlock locked amount).
pub fn from_message(message: Message, our_address: Address, channels: &ChannelMap) -> Result<StateChange, RouterError> {
	Ok(match message {
		Message::MediatedTransfer(m) => from_mediated_transfer(m, our_address, channels)?,
		Message::SecretRequest(m) => from_secret_request(m),
		Message::RevealSecret(m) => from_reveal_secret(m),
		Message::BalanceProof(m) => from_balance_proof(m, channels)?,
		Message::AnnounceDisposed(m) => from_announce_disposed(m),
	})
}

#[cfg(test)]
mod tests {
	use std::collections::HashMap;

	use waypoint_primitives::types::{
		Address,
		HashTimeLock,
		TokenAmount,
	};
	use waypoint_state_machine::types::{
		ChannelEndState,
		ChannelState,
	};

	use super::*;

	fn sample_channel(channel_identifier: ChannelIdentifier, us: Address, partner: Address) -> ChannelState {
		ChannelState {
			canonical_identifier: CanonicalIdentifier { chain_id: 1, token_address: Address::zero(), channel_identifier },
			token_address: Address::zero(),
			our_state: ChannelEndState::new(us, TokenAmount::from(1_000)),
			partner_state: ChannelEndState::new(partner, TokenAmount::from(1_000)),
			reveal_timeout: 30,
			settle_timeout: 600,
			open_block_number: 1,
			status: ChannelStatus::Opened,
		}
	}

	fn sample_mediated_transfer(channel_identifier: ChannelIdentifier, sender: Address, target: Address) -> MediatedTransfer {
		MediatedTransfer {
			sender,
			message_identifier: 1,
			payment_identifier: 1,
			nonce: 1u64.into(),
			token: Address::zero(),
			channel_identifier,
			transferred_amount: TokenAmount::zero(),
			locked_amount: TokenAmount::from(100),
			recipient: Address::from_low_u64_be(2),
			locksroot: Default::default(),
			lock: HashTimeLock { amount: TokenAmount::from(100), expiration: 500, secret_hash: Default::default() },
			target,
			initiator: sender,
			fee: TokenAmount::zero(),
			signature: None,
		}
	}

	#[test]
	fn mediated_transfer_to_us_starts_target() {
		let us = Address::from_low_u64_be(1);
		let partner = Address::from_low_u64_be(2);
		let mut channels = HashMap::new();
		channels.insert(7u64.into(), sample_channel(7u64.into(), us, partner));

		let change = from_message(
			Message::MediatedTransfer(sample_mediated_transfer(7u64.into(), partner, us)),
			us,
			&channels,
		)
		.unwrap();
		assert!(matches!(change, StateChange::ActionInitTarget(_)));
	}

	#[test]
	fn mediated_transfer_elsewhere_starts_mediator_with_other_routes() {
		let us = Address::from_low_u64_be(1);
		let partner = Address::from_low_u64_be(2);
		let downstream = Address::from_low_u64_be(3);
		let mut channels = HashMap::new();
		channels.insert(7u64.into(), sample_channel(7u64.into(), us, partner));
		channels.insert(8u64.into(), sample_channel(8u64.into(), us, downstream));

		let change = from_message(
			Message::MediatedTransfer(sample_mediated_transfer(7u64.into(), partner, downstream)),
			us,
			&channels,
		)
		.unwrap();
		match change {
			StateChange::ActionInitMediator(action) => {
				assert_eq!(action.routes.len(), 1);
				assert_eq!(action.routes[0].hop_node, downstream);
			},
			other => panic!("expected ActionInitMediator, got {other:?}"),
		}
	}

	#[test]
	fn mediated_transfer_on_unknown_channel_is_rejected() {
		let us = Address::from_low_u64_be(1);
		let partner = Address::from_low_u64_be(2);
		let channels = HashMap::new();
		let result = from_message(Message::MediatedTransfer(sample_mediated_transfer(7u64.into(), partner, us)), us, &channels);
		assert!(result.is_err());
	}

	#[test]
	fn reveal_secret_derives_secret_hash() {
		let sender = Address::from_low_u64_be(2);
		let secret = waypoint_primitives::types::Bytes(vec![1, 2, 3]);
		let message = RevealSecretMessage { sender, message_identifier: 1, secret: secret.clone(), signature: None };
		let change = from_message(Message::RevealSecret(message), Address::from_low_u64_be(1), &HashMap::new()).unwrap();
		match change {
			StateChange::ReceiveSecretReveal(reveal) => assert_eq!(reveal.secret_hash, hash_secret(&secret.0)),
			other => panic!("expected ReceiveSecretReveal, got {other:?}"),
		}
	}
}
