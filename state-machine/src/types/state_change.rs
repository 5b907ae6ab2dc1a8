use serde::{
	Deserialize,
	Serialize,
};
use waypoint_macros::IntoStateChange;

use super::{
	Address,
	BalanceProofState,
	BlockNumber,
	CanonicalIdentifier,
	LockedTransferState,
	RouteState,
	Secret,
	SecretHash,
	TokenAmount,
	TransferDescriptionState,
};

/// Input alphabet for the role state machines. A `StateChange` is always
/// applied to exactly one `LockSecretHash`-keyed instance, except
/// `BlockStateChange` which the Router fans out to every live instance in
/// block-number order.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
#[serde(tag = "type")]
pub enum StateChange {
	ActionInitInitiator(ActionInitInitiator),
	ActionInitMediator(ActionInitMediator),
	ActionInitTarget(ActionInitTarget),
	ActionCancelRoute(ActionCancelRoute),
	ReceiveSecretRequest(ReceiveSecretRequest),
	ReceiveSecretReveal(ReceiveSecretReveal),
	ReceiveTransferRefund(ReceiveTransferRefund),
	ReceiveBalanceProof(ReceiveBalanceProof),
	ContractSecretReveal(ContractSecretReveal),
	BlockStateChange(BlockStateChange),
}

/// Start a payment as the initiator.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq, IntoStateChange)]
pub struct ActionInitInitiator {
	pub transfer_description: TransferDescriptionState,
	pub routes: Vec<RouteState>,
}

/// Begin mediating a transfer received on `from_route`. `balance_proof` is
/// the payer's balance proof accompanying `from_transfer`'s lock, applied to
/// the inbound channel before the mediator picks an outbound route.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq, IntoStateChange)]
pub struct ActionInitMediator {
	pub from_transfer: LockedTransferState,
	pub from_route: RouteState,
	pub balance_proof: BalanceProofState,
	pub routes: Vec<RouteState>,
}

/// Begin receiving a transfer as the target. `balance_proof` is the payer's
/// balance proof accompanying `from_transfer`'s lock.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq, IntoStateChange)]
pub struct ActionInitTarget {
	pub from_transfer: LockedTransferState,
	pub from_route: RouteState,
	pub balance_proof: BalanceProofState,
}

/// Abandon a pending mediator pair, e.g. because its channel went byzantine.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq, IntoStateChange)]
pub struct ActionCancelRoute {
	pub secret_hash: SecretHash,
}

/// The target asks the initiator for the secret.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq, IntoStateChange)]
pub struct ReceiveSecretRequest {
	pub sender: Address,
	pub secret_hash: SecretHash,
	pub amount: TokenAmount,
}

/// A peer revealed the secret, off-chain.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq, IntoStateChange)]
pub struct ReceiveSecretReveal {
	pub sender: Address,
	pub secret: Secret,
	pub secret_hash: SecretHash,
}

/// The next hop refuses the route, refunding the sender.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq, IntoStateChange)]
pub struct ReceiveTransferRefund {
	pub sender: Address,
	pub transfer: LockedTransferState,
}

/// The next hop has settled off-chain.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq, IntoStateChange)]
pub struct ReceiveBalanceProof {
	pub sender: Address,
	pub secret_hash: SecretHash,
	pub balance_proof: BalanceProofState,
}

/// The secret was registered on-chain. Idempotent under re-delivery since
/// binding an already-known secret is a no-op.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq, IntoStateChange)]
pub struct ContractSecretReveal {
	pub secret_hash: SecretHash,
	pub secret: Secret,
	pub block_number: BlockNumber,
}

/// The chain advanced to `block_number`. Delivered to every live FSM before
/// any state change tagged with a higher block number.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq, IntoStateChange)]
pub struct BlockStateChange {
	pub block_number: BlockNumber,
}

/// Channel-level transitions observed from the chain. Applied directly to
/// the `Channel` module, independent of the FSM kernel, and de-duplicated
/// by the Router using `(channel_identifier, block_number, event_index)`.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
#[serde(tag = "type")]
pub enum ChannelStateChange {
	NewChannel(NewChannel),
	Deposit(Deposit),
	Closed(Closed),
	Settled(Settled),
	CooperativelySettled(CooperativelySettled),
	BalanceProofUpdated(BalanceProofUpdated),
}

#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
pub struct NewChannel {
	pub canonical_identifier: CanonicalIdentifier,
	pub our_address: Address,
	pub partner_address: Address,
	pub reveal_timeout: BlockNumber,
	pub settle_timeout: BlockNumber,
	pub opened_block: BlockNumber,
}

#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
pub struct Deposit {
	pub canonical_identifier: CanonicalIdentifier,
	pub participant: Address,
	pub total_deposit: TokenAmount,
}

#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
pub struct Closed {
	pub canonical_identifier: CanonicalIdentifier,
	pub closing_address: Address,
	pub closed_block: BlockNumber,
}

#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
pub struct Settled {
	pub canonical_identifier: CanonicalIdentifier,
	pub settled_block: BlockNumber,
}

#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
pub struct CooperativelySettled {
	pub canonical_identifier: CanonicalIdentifier,
	pub settled_block: BlockNumber,
}

#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
pub struct BalanceProofUpdated {
	pub canonical_identifier: CanonicalIdentifier,
	pub balance_proof: BalanceProofState,
}
