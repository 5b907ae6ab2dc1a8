//! Initiator FSM unit tests: route selection, the reveal/close sequence,
//! and the two ways a payment ends without a cooperative close.

use waypoint_primitives::types::U256;

use super::factories::{
	addr,
	secret,
	Line,
};
use crate::{
	machine,
	types::*,
};

#[test]
fn picks_a_route_and_locks_the_amount() {
	let mut line = Line::new();
	let mut rng = Random::new(1);
	let (transfer_secret, secret_hash) = secret(7);

	let ab_route = super::factories::route_to(&line.channels[&U256::from(1)], 100);
	let description = TransferDescriptionState {
		payment_identifier: 1,
		amount: U256::from(10),
		token_network_address: addr(999),
		initiator: addr(1),
		target: addr(3),
		secret: transfer_secret,
		secret_hash,
	};
	let action = StateChange::ActionInitInitiator(ActionInitInitiator { transfer_description: description, routes: vec![ab_route] });

	let (state, events) = machine::apply(None, action, &mut line.channels, 100, &mut rng).unwrap();
	assert_eq!(events.len(), 1);
	match &events[0] {
		Event::SendLockedTransfer(send) => {
			assert_eq!(send.transfer.expiration, 100 + super::factories::SETTLE_TIMEOUT - super::factories::REVEAL_TIMEOUT);
			assert_eq!(send.recipient, addr(2));
		},
		other => panic!("expected SendLockedTransfer, got {other:?}"),
	}
	assert!(matches!(state, Some(PaymentState::Initiator(_))));
}

#[test]
fn no_usable_route_fails_the_payment() {
	let mut channels = ChannelMap::new();
	let mut rng = Random::new(1);
	let (transfer_secret, secret_hash) = secret(1);
	let description = TransferDescriptionState {
		payment_identifier: 1,
		amount: U256::from(10),
		token_network_address: addr(999),
		initiator: addr(1),
		target: addr(3),
		secret: transfer_secret,
		secret_hash,
	};
	let action = StateChange::ActionInitInitiator(ActionInitInitiator { transfer_description: description, routes: vec![] });

	let (state, events) = machine::apply(None, action, &mut channels, 100, &mut rng).unwrap();
	assert!(state.is_none());
	assert_eq!(events.len(), 1);
	assert!(matches!(&events[0], Event::EventTransferFailed(f) if f.reason == "no route"));
}

#[test]
fn lock_expires_without_a_secret() {
	let mut line = Line::new();
	let mut rng = Random::new(5);
	let (transfer_secret, secret_hash) = secret(9);

	let ab_route = super::factories::route_to(&line.channels[&U256::from(1)], 100);
	let description = TransferDescriptionState {
		payment_identifier: 1,
		amount: U256::from(10),
		token_network_address: addr(999),
		initiator: addr(1),
		target: addr(3),
		secret: transfer_secret,
		secret_hash,
	};
	let action = StateChange::ActionInitInitiator(ActionInitInitiator { transfer_description: description, routes: vec![ab_route] });
	let (state, _) = machine::apply(None, action, &mut line.channels, 100, &mut rng).unwrap();
	let expiration = 100 + super::factories::SETTLE_TIMEOUT - super::factories::REVEAL_TIMEOUT;

	let block = StateChange::BlockStateChange(BlockStateChange { block_number: expiration });
	let (state, events) = machine::apply(state, block, &mut line.channels, expiration, &mut rng).unwrap();
	assert!(state.is_none());
	assert!(matches!(&events[0], Event::EventTransferFailed(f) if f.reason == "lock expired"));
}

#[test]
fn reveal_on_the_wrong_channel_is_rejected_by_send_unlock() {
	// The initiator's close path looks the secret's channel up by the
	// `channel_identifier` recorded at send time; a reveal arriving after
	// that channel has since closed must not panic or silently succeed.
	let mut line = Line::new();
	let mut rng = Random::new(2);
	let (transfer_secret, secret_hash) = secret(3);
	let ab_route = super::factories::route_to(&line.channels[&U256::from(1)], 100);
	let description = TransferDescriptionState {
		payment_identifier: 1,
		amount: U256::from(10),
		token_network_address: addr(999),
		initiator: addr(1),
		target: addr(3),
		secret: transfer_secret.clone(),
		secret_hash,
	};
	let action = StateChange::ActionInitInitiator(ActionInitInitiator { transfer_description: description, routes: vec![ab_route] });
	let (state, _) = machine::apply(None, action, &mut line.channels, 100, &mut rng).unwrap();

	line.channels.get_mut(&U256::from(1)).unwrap().status = ChannelStatus::Closed;
	let reveal = StateChange::ReceiveSecretReveal(ReceiveSecretReveal { sender: addr(2), secret: transfer_secret, secret_hash });
	let result = machine::apply(state, reveal, &mut line.channels, 100, &mut rng);
	assert!(result.is_err());
}
