//! Wires the pure state-machine kernel to the store, transport and chain
//! ports: the `Router` serialises state changes through it and persists the
//! result, `inbound` turns wire messages into the state changes it consumes,
//! and the `EventDispatcher` turns the events it produces back into I/O.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod inbound;
pub mod router;

pub use config::DispatcherConfig;
pub use dispatcher::EventDispatcher;
pub use error::RouterError;
pub use inbound::from_message;
pub use router::Router;

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use waypoint_primitives::types::{
		Address,
		TokenAmount,
	};
	use waypoint_state_machine::types::{
		ActionInitInitiator,
		CanonicalIdentifier,
		Event,
		RouteState,
		StateChange,
		TransferDescriptionState,
	};
	use waypoint_storage::{
		ChannelEventKind,
		SqliteStore,
		Store,
	};

	use super::*;

	fn open_channel(store: &SqliteStore, channel_identifier: u64, us: Address, partner: Address) {
		let canonical_identifier = CanonicalIdentifier {
			chain_id: 1,
			token_address: Address::zero(),
			channel_identifier: channel_identifier.into(),
		};
		let channel = waypoint_state_machine::types::ChannelState {
			canonical_identifier: canonical_identifier.clone(),
			token_address: Address::zero(),
			our_state: waypoint_state_machine::types::ChannelEndState::new(us, TokenAmount::from(1_000)),
			partner_state: waypoint_state_machine::types::ChannelEndState::new(partner, TokenAmount::from(1_000)),
			reveal_timeout: 30,
			settle_timeout: 600,
			open_block_number: 1,
			status: waypoint_state_machine::types::ChannelStatus::Opened,
		};
		store.save_channel(&channel, ChannelEventKind::NewChannel).unwrap();
	}

	#[test]
	fn initiator_init_locks_and_emits_locked_transfer() {
		let store = Arc::new(SqliteStore::open_in_memory().unwrap());
		let us = Address::from_low_u64_be(1);
		let hop = Address::from_low_u64_be(2);
		open_channel(&store, 7, us, hop);

		let router = Router::restore(store, 0).unwrap();
		let route = RouteState {
			hop_node: hop,
			channel_identifier: 7u64.into(),
			available_balance: TokenAmount::from(1_000),
			reveal_timeout: 30,
			settle_timeout: 600,
			closed: false,
		};
		let description = TransferDescriptionState {
			payment_identifier: 1,
			amount: TokenAmount::from(100),
			token_network_address: Address::zero(),
			initiator: us,
			target: Address::from_low_u64_be(3),
			secret: waypoint_primitives::types::Bytes(vec![9; 32]),
			secret_hash: waypoint_primitives::hashing::hash_secret(&[9; 32]),
		};
		let change = StateChange::ActionInitInitiator(ActionInitInitiator {
			transfer_description: description.clone(),
			routes: vec![route],
		});

		let events = router.apply_state_change(change).unwrap();
		assert_eq!(events.len(), 1);
		assert!(matches!(events[0], Event::SendLockedTransfer(_)));
		assert!(router.current_state(description.secret_hash).unwrap().is_some());
	}

	#[test]
	fn block_state_change_is_fanned_out_to_live_instances() {
		let store = Arc::new(SqliteStore::open_in_memory().unwrap());
		let router = Router::restore(store, 0).unwrap();
		let events = router
			.apply_state_change(StateChange::BlockStateChange(waypoint_state_machine::types::BlockStateChange {
				block_number: 42,
			}))
			.unwrap();
		assert!(events.is_empty());
		assert_eq!(router.block_number(), 42);
	}
}
