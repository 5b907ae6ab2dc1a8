use async_trait::async_trait;

use crate::types::{
	Address,
	BlockNumber,
	ChannelIdentifier,
	Locksroot,
	Secret,
	SecretHash,
	Signature,
	TokenAddress,
	TokenAmount,
};

/// The signing/recovery port. Consumed by the messages and transition crates;
/// never implemented inside this repository — production wiring plugs in an
/// ECDSA/secp256k1 backend, tests plug in a deterministic stub.
pub trait Crypto: Send + Sync {
	/// Sign `message` with this node's private key.
	fn sign(&self, message: &[u8]) -> Signature;

	/// Recover the address that produced `signature` over `message`.
	fn recover(&self, message: &[u8], signature: &Signature) -> Option<Address>;

	/// This node's own address, derived from its private key.
	fn address(&self) -> Address;
}

/// The on-chain adapter port. Consumed by the transition crate's event
/// dispatcher to turn `ContractSend*` events into real transactions, and by
/// the chain-event poller to turn confirmed logs into `StateChange`s.
/// Implemented externally (contract bindings); this repository only defines
/// the interface it is driven through.
#[async_trait]
pub trait OnChain: Send + Sync {
	/// The error type surfaced by a failed on-chain call.
	type Error: std::error::Error + Send + Sync + 'static;

	/// Unilaterally close a channel with the last known balance proof.
	async fn close_channel(
		&self,
		channel_identifier: ChannelIdentifier,
		token_address: TokenAddress,
	) -> Result<(), Self::Error>;

	/// Withdraw a single settled lock from a closed channel.
	async fn withdraw(
		&self,
		channel_identifier: ChannelIdentifier,
		secret: Secret,
		secret_hash: SecretHash,
	) -> Result<(), Self::Error>;

	/// Register a secret with the secret registry so it is provable on-chain
	/// independent of any particular channel.
	async fn register_secret(&self, secret: Secret) -> Result<(), Self::Error>;

	/// Settle a channel past its settle-timeout window.
	async fn settle_channel(
		&self,
		channel_identifier: ChannelIdentifier,
		token_address: TokenAddress,
		our_locksroot: Locksroot,
		partner_locksroot: Locksroot,
	) -> Result<(), Self::Error>;

	/// The current confirmed block number.
	async fn current_block_number(&self) -> Result<BlockNumber, Self::Error>;

	/// The confirmed, on-chain balance for `channel_identifier` and `amount`
	/// deposit target, used by callers validating route availability.
	async fn contract_balance(
		&self,
		channel_identifier: ChannelIdentifier,
	) -> Result<TokenAmount, Self::Error>;
}
