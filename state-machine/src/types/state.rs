use std::collections::HashMap;

use serde::{
	Deserialize,
	Serialize,
};

use super::{
	Address,
	BlockNumber,
	CanonicalIdentifier,
	ChannelIdentifier,
	EncodedLock,
	HashTimeLock,
	LockedAmount,
	Locksroot,
	MessageIdentifier,
	Nonce,
	PaymentIdentifier,
	Secret,
	SecretHash,
	Signature,
	TokenAddress,
	TokenAmount,
};

/// Lifecycle of a bilateral channel.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Eq, PartialEq)]
pub enum ChannelStatus {
	Opened,
	Closed,
	Settled,
	CooperativelySettled,
}

/// A signed `(nonce, transferred_amount, locksroot, channel_id)` tuple: the
/// on-chain-redeemable summary of a channel side's off-chain state.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
pub struct BalanceProofState {
	pub nonce: Nonce,
	pub transferred_amount: TokenAmount,
	pub locked_amount: LockedAmount,
	pub locksroot: Locksroot,
	pub canonical_identifier: CanonicalIdentifier,
	pub signature: Option<Signature>,
	pub sender: Address,
}

/// One side's view of a channel: its locks, its latest balance proof, its
/// on-chain deposited balance.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
pub struct ChannelEndState {
	pub address: Address,
	pub contract_balance: TokenAmount,
	pub pending_locks: Vec<HashTimeLock>,
	pub balance_proof: Option<BalanceProofState>,
}

impl ChannelEndState {
	pub fn new(address: Address, contract_balance: TokenAmount) -> Self {
		Self { address, contract_balance, pending_locks: Vec::new(), balance_proof: None }
	}

	/// Sum of the amounts of every currently pending lock.
	pub fn locked_amount(&self) -> TokenAmount {
		self.pending_locks.iter().fold(TokenAmount::zero(), |acc, lock| acc + lock.amount)
	}

	/// The `transferred_amount` committed by the latest balance proof, or
	/// zero if none has been exchanged yet.
	pub fn transferred_amount(&self) -> TokenAmount {
		self.balance_proof.as_ref().map(|bp| bp.transferred_amount).unwrap_or_else(TokenAmount::zero)
	}

	/// The `nonce` of the latest balance proof, or zero if none yet.
	pub fn nonce(&self) -> Nonce {
		self.balance_proof.as_ref().map(|bp| bp.nonce).unwrap_or_else(Nonce::zero)
	}

	pub fn find_lock(&self, secret_hash: &SecretHash) -> Option<&HashTimeLock> {
		self.pending_locks.iter().find(|lock| &lock.secret_hash == secret_hash)
	}

	pub fn encoded_locks(&self) -> Vec<EncodedLock> {
		let mut locks = self.pending_locks.clone();
		locks.sort_by_key(|lock| (lock.expiration, lock.secret_hash));
		locks.iter().map(|lock| lock.encode()).collect()
	}
}

/// A bilateral agreement between `our_state.address` and
/// `partner_state.address` over `token_address`.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
pub struct ChannelState {
	pub canonical_identifier: CanonicalIdentifier,
	pub token_address: TokenAddress,
	pub our_state: ChannelEndState,
	pub partner_state: ChannelEndState,
	pub reveal_timeout: BlockNumber,
	pub settle_timeout: BlockNumber,
	pub open_block_number: BlockNumber,
	pub status: ChannelStatus,
}

impl ChannelState {
	pub fn channel_identifier(&self) -> ChannelIdentifier {
		self.canonical_identifier.channel_identifier
	}

	pub fn is_well_formed(&self) -> bool {
		self.reveal_timeout < self.settle_timeout &&
			self.settle_timeout >= crate::constants::NETTING_CHANNEL_SETTLE_TIMEOUT_MIN &&
			self.settle_timeout <= crate::constants::NETTING_CHANNEL_SETTLE_TIMEOUT_MAX
	}
}

/// A forward path to a neighbour, supplied externally. The
/// FSMs only ever consume routes, never compute them.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
pub struct RouteState {
	pub hop_node: Address,
	pub channel_identifier: ChannelIdentifier,
	pub available_balance: TokenAmount,
	pub reveal_timeout: BlockNumber,
	pub settle_timeout: BlockNumber,
	pub closed: bool,
}

/// State carried inside the FSMs for one hop's HTLC.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
pub struct LockedTransferState {
	pub payment_identifier: PaymentIdentifier,
	pub message_identifier: MessageIdentifier,
	pub amount: TokenAmount,
	pub expiration: BlockNumber,
	pub secret_hash: SecretHash,
	pub secret: Option<Secret>,
	pub token: TokenAddress,
	pub initiator: Address,
	pub target: Address,
	pub canonical_identifier: CanonicalIdentifier,
}

/// The sender's unsigned intent to pay, before a route has been chosen.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
pub struct TransferDescriptionState {
	pub payment_identifier: PaymentIdentifier,
	pub amount: TokenAmount,
	pub token_network_address: TokenAddress,
	pub initiator: Address,
	pub target: Address,
	pub secret: Secret,
	pub secret_hash: SecretHash,
}

/// Initiator FSM states.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Eq, PartialEq)]
pub enum InitiatorState {
	WaitingSecretRequest,
	WaitingReveal,
	WaitingBalanceProof,
}

/// Live state of an in-flight payment on the sender.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
pub struct InitiatorTransferState {
	pub transfer_description: TransferDescriptionState,
	pub routes: Vec<RouteState>,
	pub channel_identifier: ChannelIdentifier,
	pub transfer: LockedTransferState,
	pub received_secret_request: bool,
	pub state: InitiatorState,
}

/// One mediator pair's lifecycle, reasoned about as a unit rather than a
/// split payer/payee state.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Eq, PartialEq)]
pub enum PairState {
	Pending,
	PayeeSecretRevealed,
	PayeeBalanceProof,
	PayerBalanceProof,
	Expired,
	ContractClose,
	ContractWithdraw,
}

/// The (inbound-route, outbound-route) twin a mediator tracks for one
/// forwarded payment (glossary: "mediator pair").
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
pub struct TransferPairState {
	pub payer_transfer: LockedTransferState,
	pub payee_transfer: LockedTransferState,
	pub payer_address: Address,
	pub payee_address: Address,
	pub state: PairState,
}

impl TransferPairState {
	pub fn secret_known(&self) -> bool {
		self.payer_transfer.secret.is_some()
	}
}

/// Live state of an in-flight payment on an intermediate hop.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
pub struct MediatorTransferState {
	pub secret_hash: SecretHash,
	pub secret: Option<Secret>,
	pub routes: Vec<RouteState>,
	pub transfers_pair: Vec<TransferPairState>,
}

/// Target FSM states.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Eq, PartialEq)]
pub enum TargetState {
	SecretRequested,
	RevealSecret,
	BalanceProof,
	WaitingClose,
}

/// Live state of an in-flight payment on the receiver.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
pub struct TargetTransferState {
	pub from_transfer: LockedTransferState,
	pub from_route: RouteState,
	pub state: TargetState,
	pub withdrawn: bool,
}

/// Which role a `LockSecretHash`-keyed state-machine instance is playing.
/// Lets `views` answer "is this payment still live" without re-deriving it
/// from the full FSM state.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Eq, PartialEq)]
pub enum TransferRole {
	Initiator,
	Mediator,
	Target,
}

/// The closed sum of the three roles' live states. `None` for a given
/// `LockSecretHash` in the `Store` means that instance has terminated.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
pub enum PaymentState {
	Initiator(InitiatorTransferState),
	Mediator(MediatorTransferState),
	Target(TargetTransferState),
}

impl PaymentState {
	pub fn role(&self) -> TransferRole {
		match self {
			PaymentState::Initiator(_) => TransferRole::Initiator,
			PaymentState::Mediator(_) => TransferRole::Mediator,
			PaymentState::Target(_) => TransferRole::Target,
		}
	}

	/// The `LockSecretHash` this instance is keyed under in the `Store`.
	pub fn secret_hash(&self) -> SecretHash {
		match self {
			PaymentState::Initiator(s) => s.transfer.secret_hash,
			PaymentState::Mediator(s) => s.secret_hash,
			PaymentState::Target(s) => s.from_transfer.secret_hash,
		}
	}
}

/// All channels known to this node, keyed by their on-chain identifier. The
/// Router hands the relevant subset of this map to a transition function;
/// the function returns only the entries it touched.
pub type ChannelMap = HashMap<ChannelIdentifier, ChannelState>;
