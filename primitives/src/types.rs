use derive_more::Display;
use serde::{
	Deserialize,
	Serialize,
};
pub use web3::types::{
	Address,
	Bytes,
	H256,
	U256,
};

/// Alias type for block numbers. Monotonic, 64-bit.
pub type BlockNumber = u64;

/// Alias type for a channel's settle/reveal timeout, expressed in blocks.
pub type BlockTimeout = u64;

/// Alias type for the channel identifier, unique on-chain.
pub type ChannelIdentifier = U256;

/// Alias type for an encoded lock (the bytes folded into the locksroot hash).
pub type EncodedLock = Bytes;

/// Alias type for amounts of locked value.
pub type LockedAmount = U256;

/// Alias type for the root hash of a side's outstanding locks.
pub type Locksroot = H256;

/// Alias type for a per-message identifier used for retry de-duplication.
pub type MessageIdentifier = u64;

/// Alias type for a balance proof's nonce. Strictly increasing per side.
pub type Nonce = U256;

/// Alias type for a payment identifier, chosen by the initiator.
pub type PaymentIdentifier = u64;

/// Alias type for the reveal timeout, in blocks.
pub type RevealTimeout = u64;

/// Alias type for the pre-image of a `SecretHash`.
pub type Secret = Bytes;

/// Alias type for `Keccak(Secret)`.
pub type SecretHash = H256;

/// Alias type for a raw signature.
pub type Signature = Bytes;

/// Alias type for the settle timeout, in blocks.
pub type SettleTimeout = u64;

/// Alias type for an ERC20-style token contract address.
pub type TokenAddress = Address;

/// Alias type for token amounts. Arbitrary precision, non-negative.
pub type TokenAmount = U256;

/// The four-tuple that a balance proof commits to.
pub type BalanceProofData = (Locksroot, Nonce, TokenAmount, LockedAmount);

/// Uniquely identifies a channel across chains and token networks.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct CanonicalIdentifier {
	pub chain_id: u64,
	pub token_address: TokenAddress,
	pub channel_identifier: ChannelIdentifier,
}

/// A `(amount, expiration, secret_hash)` HTLC record.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize, Display)]
#[display(fmt = "Lock(amount={}, expiration={}, secret_hash={:x})", amount, expiration, secret_hash)]
pub struct HashTimeLock {
	pub amount: TokenAmount,
	pub expiration: BlockNumber,
	pub secret_hash: SecretHash,
}

impl HashTimeLock {
	/// The wire encoding of the lock: `expiration || amount || secret_hash`,
	/// big-endian, matching the on-chain netting contract's packing.
	pub fn encode(&self) -> EncodedLock {
		let mut bytes = Vec::with_capacity(32 + 32 + 32);
		let mut expiration_be = [0u8; 32];
		U256::from(self.expiration).to_big_endian(&mut expiration_be);
		bytes.extend_from_slice(&expiration_be);
		let mut amount_be = [0u8; 32];
		self.amount.to_big_endian(&mut amount_be);
		bytes.extend_from_slice(&amount_be);
		bytes.extend_from_slice(self.secret_hash.as_bytes());
		Bytes(bytes)
	}
}
