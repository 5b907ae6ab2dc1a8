//! Shared primitive types for the waypoint node: chain-identity types, numeric
//! aliases, hashing helpers and the `Crypto`/`OnChain` port traits.

/// Core type aliases (`Address`, `Hash`, `Amount`, ...).
pub mod types;

/// Constants shared across crates (timeouts, size limits).
pub mod constants;

/// Hashing helpers (secret hashing, balance-proof/locksroot hashing).
pub mod hashing;

/// Port traits consumed, not implemented, by the core: `Crypto`, `OnChain`.
pub mod ports;

/// Serde helpers for `U256` and friends.
pub mod serializers;

pub use ports::{
	Crypto,
	OnChain,
};
