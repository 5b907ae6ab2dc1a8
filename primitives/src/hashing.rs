use tiny_keccak::{
	Hasher,
	Keccak,
};

use crate::types::{
	Bytes,
	Locksroot,
	SecretHash,
	H256,
};

/// `Keccak256(secret)`, used to derive a `SecretHash` from a `Secret`.
pub fn hash_secret(secret: &[u8]) -> SecretHash {
	H256::from_slice(&keccak256(secret))
}

/// Raw keccak256 of arbitrary bytes.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
	let mut hasher = Keccak::v256();
	let mut output = [0u8; 32];
	hasher.update(data);
	hasher.finalize(&mut output);
	output
}

/// The locksroot is the keccak256 of the concatenation of every
/// outstanding lock's wire encoding, in the tree's canonical order
/// (expiration, then secret hash). This matches the on-chain netting
/// contract, which only ever needs the root.
pub fn compute_locksroot(encoded_locks: &[Bytes]) -> Locksroot {
	let mut buf = Vec::new();
	for lock in encoded_locks {
		buf.extend_from_slice(&lock.0);
	}
	H256::from_slice(&keccak256(&buf))
}
