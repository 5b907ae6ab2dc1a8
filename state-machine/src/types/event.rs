use serde::{
	Deserialize,
	Serialize,
};
use waypoint_macros::IntoEvent;

use super::{
	Address,
	BalanceProofState,
	BlockNumber,
	CanonicalIdentifier,
	LockedTransferState,
	MessageIdentifier,
	PaymentIdentifier,
	Secret,
	SecretHash,
	TokenAmount,
};

/// Every event a transition can emit: outbound wire messages, on-chain
/// actions, or observational notifications. The Router never mutates
/// this list; the `EventDispatcher` turns each entry into I/O.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
#[serde(tag = "type")]
pub enum Event {
	SendLockedTransfer(SendLockedTransfer),
	SendSecretRequest(SendSecretRequest),
	SendSecretReveal(SendSecretReveal),
	SendBalanceProof(SendBalanceProof),
	SendAnnounceDisposed(SendAnnounceDisposed),
	ContractSendChannelClose(ContractSendChannelClose),
	ContractSendWithdraw(ContractSendWithdraw),
	ContractSendSecretReveal(ContractSendSecretReveal),
	EventTransferFailed(EventTransferFailed),
	EventPaymentSentSuccess(EventPaymentSentSuccess),
	EventTransferReceivedSuccess(EventTransferReceivedSuccess),
	EventWithdrawSuccess(EventWithdrawSuccess),
	EventWithdrawFailed(EventWithdrawFailed),
	ErrorByzantineBehavior(ErrorByzantineBehavior),
}

impl Event {
	/// The inner event's type name, used for log lines and metrics labels.
	pub fn type_name(&self) -> &'static str {
		match self {
			Event::SendLockedTransfer(_) => "SendLockedTransfer",
			Event::SendSecretRequest(_) => "SendSecretRequest",
			Event::SendSecretReveal(_) => "SendSecretReveal",
			Event::SendBalanceProof(_) => "SendBalanceProof",
			Event::SendAnnounceDisposed(_) => "SendAnnounceDisposed",
			Event::ContractSendChannelClose(_) => "ContractSendChannelClose",
			Event::ContractSendWithdraw(_) => "ContractSendWithdraw",
			Event::ContractSendSecretReveal(_) => "ContractSendSecretReveal",
			Event::EventTransferFailed(_) => "EventTransferFailed",
			Event::EventPaymentSentSuccess(_) => "EventPaymentSentSuccess",
			Event::EventTransferReceivedSuccess(_) => "EventTransferReceivedSuccess",
			Event::EventWithdrawSuccess(_) => "EventWithdrawSuccess",
			Event::EventWithdrawFailed(_) => "EventWithdrawFailed",
			Event::ErrorByzantineBehavior(_) => "ErrorByzantineBehavior",
		}
	}
}

/// Send a `MediatedTransfer` message to `recipient`, locking `transfer` on
/// the channel identified by `canonical_identifier`.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq, IntoEvent)]
pub struct SendLockedTransfer {
	pub recipient: Address,
	pub message_identifier: MessageIdentifier,
	pub canonical_identifier: CanonicalIdentifier,
	pub transfer: LockedTransferState,
	pub balance_proof: BalanceProofState,
}

/// Send a `SecretRequest` message asking `recipient` (the initiator) for the
/// secret behind `secret_hash`.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq, IntoEvent)]
pub struct SendSecretRequest {
	pub recipient: Address,
	pub message_identifier: MessageIdentifier,
	pub payment_identifier: PaymentIdentifier,
	pub secret_hash: SecretHash,
	pub amount: TokenAmount,
	pub expiration: BlockNumber,
}

/// Send a `RevealSecret` message to `recipient`.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq, IntoEvent)]
pub struct SendSecretReveal {
	pub recipient: Address,
	pub message_identifier: MessageIdentifier,
	pub secret: Secret,
	pub secret_hash: SecretHash,
}

/// Send a `BalanceProof` message closing the off-chain obligation for
/// `secret_hash` on `canonical_identifier`.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq, IntoEvent)]
pub struct SendBalanceProof {
	pub recipient: Address,
	pub message_identifier: MessageIdentifier,
	pub payment_identifier: PaymentIdentifier,
	pub secret_hash: SecretHash,
	pub secret: Secret,
	pub canonical_identifier: CanonicalIdentifier,
	pub balance_proof: BalanceProofState,
}

/// Send an `AnnounceDisposed` message refunding `transfer` back to the payer.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq, IntoEvent)]
pub struct SendAnnounceDisposed {
	pub recipient: Address,
	pub message_identifier: MessageIdentifier,
	pub secret_hash: SecretHash,
	pub transfer: LockedTransferState,
}

/// Unilaterally close the channel identified by `canonical_identifier`.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq, IntoEvent)]
pub struct ContractSendChannelClose {
	pub canonical_identifier: CanonicalIdentifier,
}

/// Withdraw the lock behind `secret_hash` from the closed channel
/// `canonical_identifier`, presenting `secret` on-chain.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq, IntoEvent)]
pub struct ContractSendWithdraw {
	pub canonical_identifier: CanonicalIdentifier,
	pub secret: Secret,
	pub secret_hash: SecretHash,
}

/// Register `secret` with the on-chain secret registry.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq, IntoEvent)]
pub struct ContractSendSecretReveal {
	pub secret: Secret,
	pub secret_hash: SecretHash,
}

/// The payment failed; `reason` is one of `"no route"` / `"lock expired"`.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq, IntoEvent)]
pub struct EventTransferFailed {
	pub payment_identifier: PaymentIdentifier,
	pub secret_hash: SecretHash,
	pub reason: String,
}

/// The initiator's payment completed end to end.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq, IntoEvent)]
pub struct EventPaymentSentSuccess {
	pub payment_identifier: PaymentIdentifier,
	pub secret_hash: SecretHash,
	pub amount: TokenAmount,
	pub target: Address,
}

/// The target received its payment.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq, IntoEvent)]
pub struct EventTransferReceivedSuccess {
	pub payment_identifier: PaymentIdentifier,
	pub secret_hash: SecretHash,
	pub amount: TokenAmount,
	pub initiator: Address,
}

/// An on-chain (or off-chain, for the target) withdraw completed.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq, IntoEvent)]
pub struct EventWithdrawSuccess {
	pub secret_hash: SecretHash,
}

/// A withdraw could not be completed; `reason` is typically `"lock
/// expired"`.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq, IntoEvent)]
pub struct EventWithdrawFailed {
	pub secret_hash: SecretHash,
	pub reason: String,
}

/// Observational: a peer sent malformed, unsigned, or otherwise invalid
/// input. Never fatal; the message is dropped and state is unchanged.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq, IntoEvent)]
pub struct ErrorByzantineBehavior {
	pub sender: Address,
	pub reason: String,
}
