use crate::types::Bytes;

/// Stand-in for "no secret known yet".
pub const ABSENT_SECRET: Bytes = Bytes(vec![]);

/// Length, in bytes, of a correctly formed secret.
pub const SECRET_LENGTH: u8 = 32;

/// Lower bound for `reveal_timeout`, in blocks.
pub const MIN_REVEAL_TIMEOUT: u64 = 1;

/// Lower bound for `settle_timeout`, in blocks.
pub const NETTING_CHANNEL_SETTLE_TIMEOUT_MIN: u64 = 6;

/// Upper bound for `settle_timeout`, in blocks. Chosen well above a year
/// of blocks to avoid overflow in on-chain arithmetic.
pub const NETTING_CHANNEL_SETTLE_TIMEOUT_MAX: u64 = 2_700_000;

/// Default reveal timeout, in blocks.
pub const DEFAULT_REVEAL_TIMEOUT: u64 = 30;

/// Default settle timeout, in blocks.
pub const DEFAULT_SETTLE_TIMEOUT: u64 = 600;

/// Default cadence, in seconds, for FSM-level event retries.
pub const DEFAULT_RETRY_INTERVAL: u64 = 1;

/// Default number of retries before exponential backoff kicks in.
pub const DEFAULT_RETRIES_BEFORE_BACKOFF: u32 = 5;

/// Default token-bucket capacity for outbound sends.
pub const DEFAULT_THROTTLE_CAPACITY: u32 = 10;

/// Default token-bucket refill rate, tokens per second.
pub const DEFAULT_THROTTLE_FILL_RATE: u32 = 10;

/// Default ICE negotiation timeout, in seconds.
pub const DEFAULT_NAT_INVITATION_TIMEOUT: u64 = 180;

/// Default number of NAT keep-alive retries.
pub const DEFAULT_NAT_KEEPALIVE_RETRIES: u32 = 5;

/// Default NAT keep-alive timeout, in seconds.
pub const DEFAULT_NAT_KEEPALIVE_TIMEOUT: u64 = 30;

/// A `Ready` transport session idle for longer than `2 * CHECK_INTERVAL`
/// is torn down.
pub const TRANSPORT_CHECK_INTERVAL_SECS: u64 = 120;

/// Maximum encoded wire-message size: one UDP MTU, no fragmentation.
pub const MAX_MESSAGE_SIZE: usize = 1200;

/// Number of applied state changes between automatic FSM snapshots.
pub const SNAPSHOT_STATE_CHANGE_COUNT: u16 = 500;

/// Dispatcher queue drain deadline on shutdown, in seconds.
pub const SHUTDOWN_DRAIN_DEADLINE_SECS: u64 = 300;
