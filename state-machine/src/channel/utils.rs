use waypoint_primitives::hashing::compute_locksroot as primitive_compute_locksroot;

use crate::types::{
	ChannelEndState,
	EncodedLock,
	Locksroot,
};

/// Compute the locksroot for an end-state's current pending locks: the
/// keccak256 of every encoded lock concatenated in `(expiration,
/// secret_hash)` order.
pub fn compute_locksroot(end_state: &ChannelEndState) -> Locksroot {
	let encoded: Vec<EncodedLock> = end_state.encoded_locks();
	primitive_compute_locksroot(&encoded)
}
