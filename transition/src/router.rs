//! Owns the in-memory channel cache and the live-instance set, and serialises
//! every state change through the pure kernel in `waypoint_state_machine`.
//! Restores itself from the store on start-up and snapshots back to it,
//! keyed per `LockSecretHash` instance rather than one global chain state.

use std::{
	collections::{
		HashMap,
		HashSet,
	},
	sync::Arc,
};

use parking_lot::Mutex;
use waypoint_primitives::types::{
	BlockNumber,
	SecretHash,
};
use waypoint_state_machine::{
	channel,
	machine,
	types::{
		BalanceProofState,
		ChannelMap,
		ChannelStateChange,
		Event,
		PaymentState,
		Random,
		StateChange,
	},
};
use waypoint_storage::{
	ChannelEventKind,
	ChannelFilter,
	Store,
};

use crate::error::RouterError;

/// The `LockSecretHash` a `StateChange` is addressed to, or `None` for
/// `BlockStateChange`, which the caller fans out to every live instance
/// instead of routing to one.
fn target_secret_hash(state_change: &StateChange) -> Option<SecretHash> {
	match state_change {
		StateChange::ActionInitInitiator(a) => Some(a.transfer_description.secret_hash),
		StateChange::ActionInitMediator(a) => Some(a.from_transfer.secret_hash),
		StateChange::ActionInitTarget(a) => Some(a.from_transfer.secret_hash),
		StateChange::ActionCancelRoute(a) => Some(a.secret_hash),
		StateChange::ReceiveSecretRequest(a) => Some(a.secret_hash),
		StateChange::ReceiveSecretReveal(a) => Some(a.secret_hash),
		StateChange::ReceiveTransferRefund(a) => Some(a.transfer.secret_hash),
		StateChange::ReceiveBalanceProof(a) => Some(a.secret_hash),
		StateChange::ContractSecretReveal(a) => Some(a.secret_hash),
		StateChange::BlockStateChange(_) => None,
	}
}

fn channel_event_kind(change: &ChannelStateChange) -> ChannelEventKind {
	match change {
		ChannelStateChange::NewChannel(_) => ChannelEventKind::NewChannel,
		ChannelStateChange::Deposit(_) => ChannelEventKind::Deposit,
		_ => ChannelEventKind::StateChange,
	}
}

pub struct Router<S> {
	store: Arc<S>,
	channels: Mutex<ChannelMap>,
	live: Mutex<HashSet<SecretHash>>,
	block_number: Mutex<BlockNumber>,
	rng: Mutex<Random>,
}

impl<S: Store> Router<S> {
	/// Restores the channel cache, the live-instance set and the chain
	/// cursor from `store`. `rng_seed` should be stable across restarts of
	/// the same node so that replaying the same state-change log reproduces
	/// the same message identifiers.
	pub fn restore(store: Arc<S>, rng_seed: u64) -> Result<Self, RouterError> {
		let mut channels = HashMap::new();
		for channel in store.list_channels(&ChannelFilter::default())? {
			channels.insert(channel.channel_identifier(), channel);
		}
		let live = store.live_payments()?.into_iter().collect();
		let block_number = store.get_chain_cursor()?.unwrap_or(0);
		Ok(Self {
			store,
			channels: Mutex::new(channels),
			live: Mutex::new(live),
			block_number: Mutex::new(block_number),
			rng: Mutex::new(Random::new(rng_seed)),
		})
	}

	/// Apply a chain-observed channel transition directly, bypassing the FSM
	/// kernel. De-duplication by `(channel_identifier, block_number,
	/// event_index)` is the caller's job; this only guards against
	/// re-applying an update a channel already reflects.
	pub fn apply_channel_state_change(&self, change: ChannelStateChange) -> Result<(), RouterError> {
		let canonical_identifier = match &change {
			ChannelStateChange::NewChannel(c) => c.canonical_identifier.clone(),
			ChannelStateChange::Deposit(c) => c.canonical_identifier.clone(),
			ChannelStateChange::Closed(c) => c.canonical_identifier.clone(),
			ChannelStateChange::Settled(c) => c.canonical_identifier.clone(),
			ChannelStateChange::CooperativelySettled(c) => c.canonical_identifier.clone(),
			ChannelStateChange::BalanceProofUpdated(c) => c.canonical_identifier.clone(),
		};
		let kind = channel_event_kind(&change);

		let mut channels = self.channels.lock();
		let current = match channels.get(&canonical_identifier.channel_identifier) {
			Some(channel) => channel.clone(),
			None => match &change {
				ChannelStateChange::NewChannel(new_channel) => channel::create(new_channel)?,
				_ => return Err(RouterError::UnknownChannel(canonical_identifier.channel_identifier)),
			},
		};

		let updated = channel::state_transition(current, change)?;
		self.store.save_channel(&updated, kind)?;
		channels.insert(canonical_identifier.channel_identifier, updated);
		Ok(())
	}

	/// Release the lock `secret_hash` closes out on the partner's side of
	/// whichever channel `balance_proof` names, validating nonce and
	/// locksroot against the channel's own lock tree rather than the
	/// wire-claimed state.
	fn apply_receive_balance_proof(
		&self,
		secret_hash: SecretHash,
		balance_proof: BalanceProofState,
	) -> Result<(), RouterError> {
		let channel_identifier = balance_proof.canonical_identifier.channel_identifier;
		let mut channels = self.channels.lock();
		let channel = channels
			.get_mut(&channel_identifier)
			.ok_or(RouterError::UnknownChannel(channel_identifier))?;
		channel::handle_receive_unlock(channel, secret_hash, balance_proof)?;
		self.store.save_channel(channel, ChannelEventKind::StateChange)?;
		Ok(())
	}

	/// Apply a `StateChange` to the FSM instance it is addressed to, or, for
	/// `BlockStateChange`, to every instance still live. Returns every event
	/// emitted, in emission order, across whichever instances were touched.
	pub fn apply_state_change(&self, state_change: StateChange) -> Result<Vec<Event>, RouterError> {
		if let StateChange::BlockStateChange(block) = &state_change {
			*self.block_number.lock() = block.block_number;
			self.store.set_chain_cursor(block.block_number)?;
			let secret_hashes: Vec<SecretHash> = self.live.lock().iter().copied().collect();
			let mut events = Vec::new();
			for secret_hash in secret_hashes {
				events.extend(self.apply_to_instance(secret_hash, state_change.clone())?);
			}
			return Ok(events)
		}

		// An off-chain balance proof releases the sender's lock on this
		// node's side of the channel in addition to notifying the FSM
		// instance it closes out. Goes through `handle_receive_unlock`
		// rather than the generic `ChannelStateChange::BalanceProofUpdated`
		// path (reserved for chain-observed snapshots) so the locked amount
		// is derived from the lock tree instead of trusted from the wire.
		if let StateChange::ReceiveBalanceProof(proof) = &state_change {
			self.apply_receive_balance_proof(proof.secret_hash, proof.balance_proof.clone())?;
		}

		let secret_hash = target_secret_hash(&state_change)
			.expect("every StateChange variant but BlockStateChange addresses a secret hash");
		self.apply_to_instance(secret_hash, state_change)
	}

	fn apply_to_instance(
		&self,
		secret_hash: SecretHash,
		state_change: StateChange,
	) -> Result<Vec<Event>, RouterError> {
		let snapshot = self.store.load_payment_snapshot(secret_hash)?;
		let (version, prior_state) = match snapshot {
			Some(snapshot) => (snapshot.version, snapshot.state),
			None => (0, None),
		};

		let mut channels = self.channels.lock();
		let before = channels.clone();
		let block_number = *self.block_number.lock();
		let mut rng = self.rng.lock();
		let (next_state, events) =
			machine::apply(prior_state, state_change, &mut channels, block_number, &mut *rng)?;

		for (identifier, channel) in channels.iter() {
			if before.get(identifier) != Some(channel) {
				self.store.save_channel(channel, ChannelEventKind::StateChange)?;
			}
		}
		drop(channels);

		let is_live = next_state.is_some();
		self.store.save_payment_snapshot(secret_hash, version + 1, next_state, events.clone())?;
		let mut live = self.live.lock();
		if is_live {
			live.insert(secret_hash);
		} else {
			live.remove(&secret_hash);
		}

		Ok(events)
	}

	/// The snapshot `version` currently on disk for `secret_hash`, for a
	/// caller (the event dispatcher) that needs it to acknowledge a flush.
	pub fn snapshot_version(&self, secret_hash: SecretHash) -> Result<u64, RouterError> {
		Ok(self.store.load_payment_snapshot(secret_hash)?.map(|s| s.version).unwrap_or(0))
	}

	pub fn current_state(&self, secret_hash: SecretHash) -> Result<Option<PaymentState>, RouterError> {
		Ok(self.store.load_payment_snapshot(secret_hash)?.and_then(|s| s.state))
	}

	pub fn block_number(&self) -> BlockNumber {
		*self.block_number.lock()
	}

	/// A point-in-time copy of the channel cache, for callers outside this
	/// crate (the inbound wire-message mapper) that need to read channel
	/// state without taking part in the dispatcher's own lock ordering.
	pub fn channels_snapshot(&self) -> ChannelMap {
		self.channels.lock().clone()
	}
}
