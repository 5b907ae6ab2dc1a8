use std::time::Duration;

/// Everything the transport needs at start-up, passed in once instead of
/// read from package-level mutable globals.
#[derive(Clone, Debug)]
pub struct TransportConfig {
	pub turn_server: String,
	pub turn_user: String,
	pub turn_password: String,
	pub signal_server_url: String,
	/// How often the idle sweep runs and the unit a `Ready` session's
	/// idleness is measured against (torn down past `2 * check_interval`).
	pub check_interval: Duration,
	/// How long an ICE negotiation may run before it is treated as failed.
	pub negotiation_timeout: Duration,
	/// Capacity of the per-peer outbound send queue.
	pub send_queue_capacity: usize,
}

impl Default for TransportConfig {
	fn default() -> Self {
		Self {
			turn_server: String::new(),
			turn_user: String::new(),
			turn_password: String::new(),
			signal_server_url: String::new(),
			check_interval: Duration::from_secs(60),
			negotiation_timeout: Duration::from_secs(180),
			send_queue_capacity: 100,
		}
	}
}
