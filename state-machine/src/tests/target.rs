//! Target FSM unit tests: the safe-to-wait gate at init, secret validation,
//! and the completion path.

use waypoint_primitives::types::U256;

use super::factories::{
	addr,
	balance_proof_for_lock,
	new_channel,
	route_to,
	secret,
	REVEAL_TIMEOUT,
};
use crate::{
	machine,
	types::*,
};

fn init_target(channels: &mut ChannelMap, expiration: BlockNumber, secret_hash: SecretHash) -> (Option<PaymentState>, Vec<Event>) {
	let mut rng = Random::new(3);
	let channel = channels.get(&U256::from(1)).unwrap().clone();
	let from_transfer = LockedTransferState {
		payment_identifier: 1,
		message_identifier: 1,
		amount: U256::from(10),
		expiration,
		secret_hash,
		secret: None,
		token: addr(999),
		initiator: addr(1),
		target: addr(3),
		canonical_identifier: channel.canonical_identifier.clone(),
	};
	let lock = HashTimeLock { amount: from_transfer.amount, expiration, secret_hash };
	let balance_proof = balance_proof_for_lock(&channel, &lock);
	let from_route = route_to(&channel, 10);
	let action = StateChange::ActionInitTarget(ActionInitTarget { from_transfer, from_route, balance_proof });
	machine::apply(None, action, channels, 100, &mut rng).unwrap()
}

fn bc_channel_from_target() -> ChannelMap {
	let mut channels = ChannelMap::new();
	let channel = new_channel(1, addr(3), addr(2), 1);
	channels.insert(channel.channel_identifier(), channel);
	channels
}

#[test]
fn stays_silent_when_not_safe_to_wait() {
	let mut channels = bc_channel_from_target();
	// Only exactly `reveal_timeout` away from the current block: not safe.
	let (state, events) = init_target(&mut channels, 100 + REVEAL_TIMEOUT, SecretHash::from_low_u64_be(1));
	assert!(state.is_none());
	assert!(events.is_empty());
}

#[test]
fn requests_the_secret_when_safe_to_wait() {
	let mut channels = bc_channel_from_target();
	let (state, events) = init_target(&mut channels, 560, SecretHash::from_low_u64_be(1));
	assert!(state.is_some());
	assert_eq!(events.len(), 1);
	assert!(matches!(&events[0], Event::SendSecretRequest(_)));
}

#[test]
fn rejects_a_secret_that_does_not_hash_to_the_lock() {
	let mut channels = bc_channel_from_target();
	let (_, transfer_secret_hash) = secret(2);
	let (state, _) = init_target(&mut channels, 560, transfer_secret_hash);
	let mut rng = Random::new(3);

	let (wrong_secret, _) = secret(3);
	let reveal =
		StateChange::ReceiveSecretReveal(ReceiveSecretReveal { sender: addr(2), secret: wrong_secret, secret_hash: transfer_secret_hash });
	let (state, events) = machine::apply(state, reveal, &mut channels, 100, &mut rng).unwrap();
	assert_eq!(events.len(), 1);
	assert!(matches!(&events[0], Event::ErrorByzantineBehavior(e) if e.sender == addr(2)));
	assert!(matches!(state, Some(PaymentState::Target(_))));
}

#[test]
fn completes_once_the_forwarding_hop_confirms_with_a_balance_proof() {
	let mut channels = bc_channel_from_target();
	let (transfer_secret, transfer_secret_hash) = secret(4);
	let (state, _) = init_target(&mut channels, 560, transfer_secret_hash);
	let mut rng = Random::new(3);

	let reveal =
		StateChange::ReceiveSecretReveal(ReceiveSecretReveal { sender: addr(2), secret: transfer_secret, secret_hash: transfer_secret_hash });
	let (state, events) = machine::apply(state, reveal, &mut channels, 100, &mut rng).unwrap();
	assert!(matches!(&events[0], Event::SendSecretReveal(_)));

	let channel = channels.get(&U256::from(1)).unwrap();
	let balance_proof = BalanceProofState {
		nonce: Nonce::from(1),
		transferred_amount: U256::from(10),
		locked_amount: U256::zero(),
		locksroot: Locksroot::zero(),
		canonical_identifier: channel.canonical_identifier.clone(),
		signature: None,
		sender: addr(2),
	};
	let proof = StateChange::ReceiveBalanceProof(ReceiveBalanceProof { sender: addr(2), secret_hash: transfer_secret_hash, balance_proof });
	let (state, events) = machine::apply(state, proof, &mut channels, 100, &mut rng).unwrap();
	assert!(state.is_none());
	assert_eq!(events.len(), 2);
	assert!(matches!(&events[0], Event::EventTransferReceivedSuccess(_)));
	assert!(matches!(&events[1], Event::EventWithdrawSuccess(_)));
}
