use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{
	params,
	Connection,
	OptionalExtension,
};
use waypoint_primitives::types::{
	Address,
	BlockNumber,
	TokenAddress,
};
use waypoint_state_machine::types::{
	ChannelIdentifier,
	ChannelState,
	Event,
	PaymentState,
	SecretHash,
};

use crate::{
	error::StoreError,
	schema::MIGRATIONS,
};

pub type Result<T> = std::result::Result<T, StoreError>;

/// Whether a channel-event callback wants to keep observing, or deregister
/// itself after this call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
	Keep,
	Remove,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelEventKind {
	NewChannel,
	Deposit,
	StateChange,
}

#[derive(Debug, Clone)]
pub struct ChannelEvent {
	pub kind: ChannelEventKind,
	pub channel: ChannelState,
}

/// Filters `list_channels` on token address and/or partner address. An
/// absent field matches anything.
#[derive(Debug, Clone, Default)]
pub struct ChannelFilter {
	pub token_address: Option<TokenAddress>,
	pub partner_address: Option<Address>,
}

impl ChannelFilter {
	fn matches(&self, channel: &ChannelState) -> bool {
		if let Some(token) = self.token_address {
			if channel.token_address != token {
				return false
			}
		}
		if let Some(partner) = self.partner_address {
			if channel.partner_state.address != partner {
				return false
			}
		}
		true
	}
}

/// A state-machine instance's durable record: the last snapshot plus any
/// events that were enqueued for it but not yet confirmed flushed to the
/// `EventDispatcher`.
#[derive(Debug, Clone)]
pub struct PaymentSnapshot {
	pub version: u64,
	pub state: Option<PaymentState>,
	pub pending_events: Vec<Event>,
}

/// Crash-consistent persistence of channels and FSM snapshots. See the
/// `SqliteStore` docs for the on-disk layout.
pub trait Store: Send + Sync {
	fn save_channel(&self, channel: &ChannelState, kind: ChannelEventKind) -> Result<()>;
	fn get_channel(&self, token: TokenAddress, partner: Address) -> Result<Option<ChannelState>>;
	fn get_channel_by_identifier(&self, id: ChannelIdentifier) -> Result<Option<ChannelState>>;
	fn list_channels(&self, filter: &ChannelFilter) -> Result<Vec<ChannelState>>;
	fn register_channel_callback(&self, callback: Box<dyn FnMut(&ChannelEvent) -> CallbackAction + Send>);

	/// Write the new FSM snapshot and the events it emitted in one
	/// transaction. `version` must be the snapshot's new, incremented
	/// counter.
	fn save_payment_snapshot(
		&self,
		secret_hash: SecretHash,
		version: u64,
		state: Option<PaymentState>,
		pending_events: Vec<Event>,
	) -> Result<()>;

	fn load_payment_snapshot(&self, secret_hash: SecretHash) -> Result<Option<PaymentSnapshot>>;

	/// Every `secret_hash` whose latest snapshot still carries a live
	/// `PaymentState`. Used to restore the Router's working set on startup
	/// and to fan a `BlockStateChange` out to every instance still running.
	fn live_payments(&self) -> Result<Vec<SecretHash>>;

	/// Acknowledge that the events recorded for `(secret_hash, version)` have
	/// been durably handed to the `EventDispatcher`; they are no longer
	/// replayed on restart.
	fn clear_flushed_events(&self, secret_hash: SecretHash, version: u64) -> Result<()>;

	/// Every snapshot that still has events pending flush, in no particular
	/// order. Called once at startup, before accepting new input.
	fn unflushed_snapshots(&self) -> Result<Vec<(SecretHash, PaymentSnapshot)>>;

	fn set_chain_cursor(&self, block_number: BlockNumber) -> Result<()>;
	fn get_chain_cursor(&self) -> Result<Option<BlockNumber>>;
}

/// Sqlite-backed `Store`. One file under `dataDir`; every mutating method is
/// a single transaction, so a crash mid-write leaves either the old or the
/// new row, never a torn one.
pub struct SqliteStore {
	conn: Mutex<Connection>,
	#[allow(clippy::type_complexity)]
	callbacks: Mutex<Vec<Box<dyn FnMut(&ChannelEvent) -> CallbackAction + Send>>>,
}

impl SqliteStore {
	pub fn open(path: impl AsRef<Path>) -> Result<Self> {
		let conn = Connection::open(path)?;
		conn.execute_batch(MIGRATIONS)?;
		Ok(Self { conn: Mutex::new(conn), callbacks: Mutex::new(Vec::new()) })
	}

	pub fn open_in_memory() -> Result<Self> {
		let conn = Connection::open_in_memory()?;
		conn.execute_batch(MIGRATIONS)?;
		Ok(Self { conn: Mutex::new(conn), callbacks: Mutex::new(Vec::new()) })
	}

	/// Run every registered callback for `event`, collecting and dropping the
	/// ones that ask to be removed. A single mutation pass over the vector
	/// avoids the classic iterator-invalidation bug of removing while
	/// iterating.
	fn notify(&self, event: &ChannelEvent) {
		let mut callbacks = self.callbacks.lock();
		let mut keep = Vec::with_capacity(callbacks.len());
		for mut callback in callbacks.drain(..) {
			if callback(event) == CallbackAction::Keep {
				keep.push(callback);
			}
		}
		*callbacks = keep;
	}
}

impl Store for SqliteStore {
	fn save_channel(&self, channel: &ChannelState, kind: ChannelEventKind) -> Result<()> {
		let state_json = serde_json::to_string(channel)?;
		{
			let conn = self.conn.lock();
			conn.execute(
				"INSERT INTO channels (channel_identifier, token_address, partner_address, state_json)
				 VALUES (?1, ?2, ?3, ?4)
				 ON CONFLICT(channel_identifier) DO UPDATE SET state_json = excluded.state_json",
				params![
					format!("{:x}", channel.channel_identifier()),
					format!("{:x}", channel.token_address),
					format!("{:x}", channel.partner_state.address),
					state_json,
				],
			)?;
		}
		self.notify(&ChannelEvent { kind, channel: channel.clone() });
		Ok(())
	}

	fn get_channel(&self, token: TokenAddress, partner: Address) -> Result<Option<ChannelState>> {
		let conn = self.conn.lock();
		let state_json: Option<String> = conn
			.query_row(
				"SELECT state_json FROM channels WHERE token_address = ?1 AND partner_address = ?2",
				params![format!("{:x}", token), format!("{:x}", partner)],
				|row| row.get(0),
			)
			.optional()?;
		state_json.map(|json| Ok(serde_json::from_str(&json)?)).transpose()
	}

	fn get_channel_by_identifier(&self, id: ChannelIdentifier) -> Result<Option<ChannelState>> {
		let conn = self.conn.lock();
		let state_json: Option<String> = conn
			.query_row(
				"SELECT state_json FROM channels WHERE channel_identifier = ?1",
				params![format!("{:x}", id)],
				|row| row.get(0),
			)
			.optional()?;
		state_json.map(|json| Ok(serde_json::from_str(&json)?)).transpose()
	}

	fn list_channels(&self, filter: &ChannelFilter) -> Result<Vec<ChannelState>> {
		let conn = self.conn.lock();
		let mut stmt = conn.prepare("SELECT state_json FROM channels")?;
		let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
		let mut channels = Vec::new();
		for row in rows {
			let channel: ChannelState = serde_json::from_str(&row?)?;
			if filter.matches(&channel) {
				channels.push(channel);
			}
		}
		Ok(channels)
	}

	fn register_channel_callback(&self, callback: Box<dyn FnMut(&ChannelEvent) -> CallbackAction + Send>) {
		self.callbacks.lock().push(callback);
	}

	fn save_payment_snapshot(
		&self,
		secret_hash: SecretHash,
		version: u64,
		state: Option<PaymentState>,
		pending_events: Vec<Event>,
	) -> Result<()> {
		let state_json = match &state {
			Some(state) => Some(serde_json::to_string(state)?),
			None => None,
		};
		let key = format!("{:x}", secret_hash);
		let mut conn = self.conn.lock();
		let tx = conn.transaction()?;
		tx.execute(
			"INSERT INTO payment_snapshots (secret_hash, version, state_json) VALUES (?1, ?2, ?3)
			 ON CONFLICT(secret_hash) DO UPDATE SET version = excluded.version, state_json = excluded.state_json",
			params![key, version as i64, state_json],
		)?;
		for (seq, event) in pending_events.iter().enumerate() {
			let event_json = serde_json::to_string(event)?;
			tx.execute(
				"INSERT INTO pending_events (secret_hash, version, seq, event_json) VALUES (?1, ?2, ?3, ?4)",
				params![key, version as i64, seq as i64, event_json],
			)?;
		}
		tx.commit()?;
		Ok(())
	}

	fn load_payment_snapshot(&self, secret_hash: SecretHash) -> Result<Option<PaymentSnapshot>> {
		let key = format!("{:x}", secret_hash);
		let conn = self.conn.lock();
		let row: Option<(i64, Option<String>)> = conn
			.query_row(
				"SELECT version, state_json FROM payment_snapshots WHERE secret_hash = ?1",
				params![key],
				|row| Ok((row.get(0)?, row.get(1)?)),
			)
			.optional()?;
		let (version, state_json) = match row {
			Some(row) => row,
			None => return Ok(None),
		};
		let state = state_json.map(|json| serde_json::from_str(&json)).transpose()?;

		let mut stmt = conn.prepare(
			"SELECT event_json FROM pending_events WHERE secret_hash = ?1 AND version = ?2 ORDER BY seq ASC",
		)?;
		let pending_events = stmt
			.query_map(params![key, version], |row| row.get::<_, String>(0))?
			.map(|json| Ok(serde_json::from_str(&json?)?))
			.collect::<Result<Vec<Event>>>()?;

		Ok(Some(PaymentSnapshot { version: version as u64, state, pending_events }))
	}

	fn live_payments(&self) -> Result<Vec<SecretHash>> {
		let conn = self.conn.lock();
		let mut stmt =
			conn.prepare("SELECT secret_hash FROM payment_snapshots WHERE state_json IS NOT NULL")?;
		let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
		let mut out = Vec::new();
		for row in rows {
			out.push(SecretHash::from(hex_to_bytes32(&row?)));
		}
		Ok(out)
	}

	fn clear_flushed_events(&self, secret_hash: SecretHash, version: u64) -> Result<()> {
		let conn = self.conn.lock();
		conn.execute(
			"DELETE FROM pending_events WHERE secret_hash = ?1 AND version = ?2",
			params![format!("{:x}", secret_hash), version as i64],
		)?;
		Ok(())
	}

	fn unflushed_snapshots(&self) -> Result<Vec<(SecretHash, PaymentSnapshot)>> {
		let conn = self.conn.lock();
		let mut stmt = conn.prepare(
			"SELECT DISTINCT secret_hash FROM pending_events",
		)?;
		let secret_hashes = stmt.query_map([], |row| row.get::<_, String>(0))?.collect::<rusqlite::Result<Vec<_>>>()?;
		drop(stmt);
		drop(conn);

		let mut out = Vec::new();
		for hex in secret_hashes {
			let bytes = hex_to_bytes32(&hex);
			let secret_hash = SecretHash::from(bytes);
			if let Some(snapshot) = self.load_payment_snapshot(secret_hash)? {
				out.push((secret_hash, snapshot));
			}
		}
		Ok(out)
	}

	fn set_chain_cursor(&self, block_number: BlockNumber) -> Result<()> {
		let conn = self.conn.lock();
		conn.execute(
			"INSERT INTO chain_cursor (id, block_number) VALUES (0, ?1)
			 ON CONFLICT(id) DO UPDATE SET block_number = excluded.block_number",
			params![block_number as i64],
		)?;
		Ok(())
	}

	fn get_chain_cursor(&self) -> Result<Option<BlockNumber>> {
		let conn = self.conn.lock();
		let block_number: Option<i64> = conn
			.query_row("SELECT block_number FROM chain_cursor WHERE id = 0", [], |row| row.get(0))
			.optional()?;
		Ok(block_number.map(|n| n as BlockNumber))
	}
}

fn hex_to_bytes32(hex: &str) -> [u8; 32] {
	let mut out = [0u8; 32];
	let hex = hex.strip_prefix("0x").unwrap_or(hex);
	for (i, byte) in out.iter_mut().enumerate() {
		let offset = i * 2;
		if offset + 2 <= hex.len() {
			*byte = u8::from_str_radix(&hex[offset..offset + 2], 16).unwrap_or(0);
		}
	}
	out
}

#[cfg(test)]
mod tests {
	use waypoint_primitives::types::{
		Address,
		U256,
	};
	use waypoint_state_machine::{
		channel,
		types::{
			CanonicalIdentifier,
			NewChannel,
			SecretHash,
		},
	};

	use super::*;

	fn sample_channel() -> ChannelState {
		channel::create(&NewChannel {
			canonical_identifier: CanonicalIdentifier {
				chain_id: 1,
				token_address: Address::from_low_u64_be(9),
				channel_identifier: U256::from(1),
			},
			our_address: Address::from_low_u64_be(1),
			partner_address: Address::from_low_u64_be(2),
			reveal_timeout: 30,
			settle_timeout: 600,
			opened_block: 1,
		})
		.expect("well-formed test channel")
	}

	#[test]
	fn channel_round_trips() {
		let store = SqliteStore::open_in_memory().unwrap();
		let channel = sample_channel();
		store.save_channel(&channel, ChannelEventKind::NewChannel).unwrap();
		let loaded = store.get_channel(channel.token_address, channel.partner_state.address).unwrap().unwrap();
		assert_eq!(loaded.channel_identifier(), channel.channel_identifier());
	}

	#[test]
	fn callback_removes_itself() {
		let store = SqliteStore::open_in_memory().unwrap();
		let calls = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
		let calls_clone = calls.clone();
		store.register_channel_callback(Box::new(move |_event| {
			calls_clone.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
			CallbackAction::Remove
		}));
		let channel = sample_channel();
		store.save_channel(&channel, ChannelEventKind::NewChannel).unwrap();
		store.save_channel(&channel, ChannelEventKind::Deposit).unwrap();
		assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
	}

	#[test]
	fn chain_cursor_round_trips() {
		let store = SqliteStore::open_in_memory().unwrap();
		assert_eq!(store.get_chain_cursor().unwrap(), None);
		store.set_chain_cursor(42).unwrap();
		assert_eq!(store.get_chain_cursor().unwrap(), Some(42));
	}

	#[test]
	fn payment_snapshot_replays_pending_events_until_flushed() {
		let store = SqliteStore::open_in_memory().unwrap();
		let secret_hash = SecretHash::from_low_u64_be(7);
		store.save_payment_snapshot(secret_hash, 1, None, vec![]).unwrap();
		let pending = store.unflushed_snapshots().unwrap();
		assert!(pending.is_empty());

		store.save_payment_snapshot(secret_hash, 2, None, vec![]).unwrap();
		let snapshot = store.load_payment_snapshot(secret_hash).unwrap().unwrap();
		assert_eq!(snapshot.version, 2);
	}

	fn sample_target_payment(secret_hash: SecretHash) -> PaymentState {
		use waypoint_state_machine::types::{
			LockedTransferState,
			RouteState,
			TargetState,
			TargetTransferState,
		};

		let canonical_identifier = CanonicalIdentifier {
			chain_id: 1,
			token_address: Address::from_low_u64_be(9),
			channel_identifier: U256::from(1),
		};
		let from_transfer = LockedTransferState {
			payment_identifier: 1,
			message_identifier: 1,
			amount: U256::from(10),
			expiration: 100,
			secret_hash,
			secret: None,
			token: canonical_identifier.token_address,
			initiator: Address::from_low_u64_be(3),
			target: Address::from_low_u64_be(2),
			canonical_identifier: canonical_identifier.clone(),
		};
		let from_route = RouteState {
			hop_node: Address::from_low_u64_be(3),
			channel_identifier: canonical_identifier.channel_identifier,
			available_balance: U256::from(10),
			reveal_timeout: 30,
			settle_timeout: 600,
			closed: false,
		};
		PaymentState::Target(TargetTransferState {
			from_transfer,
			from_route,
			state: TargetState::SecretRequested,
			withdrawn: false,
		})
	}

	#[test]
	fn live_payments_excludes_terminated_instances() {
		let store = SqliteStore::open_in_memory().unwrap();
		let live = SecretHash::from_low_u64_be(1);
		let terminated = SecretHash::from_low_u64_be(2);
		store.save_payment_snapshot(live, 1, Some(sample_target_payment(live)), vec![]).unwrap();
		store.save_payment_snapshot(terminated, 1, None, vec![]).unwrap();
		assert_eq!(store.live_payments().unwrap(), vec![live]);
	}
}
