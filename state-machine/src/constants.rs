pub use waypoint_primitives::constants::*;

use crate::types::{
	ChannelStatus,
	PairState,
};

/// Channel statuses that still accept off-chain balance-proof updates.
pub const CHANNEL_STATES_PRIOR_TO_CLOSE: [ChannelStatus; 1] = [ChannelStatus::Opened];

/// Channel statuses observed up to and including on-chain close.
pub const CHANNEL_STATES_UP_TO_CLOSE: [ChannelStatus; 2] =
	[ChannelStatus::Opened, ChannelStatus::Closed];

/// Mediator pair states in which the secret is known to this node.
pub const PAIR_STATES_SECRET_KNOWN: [PairState; 4] = [
	PairState::PayeeSecretRevealed,
	PairState::PayeeBalanceProof,
	PairState::PayerBalanceProof,
	PairState::ContractWithdraw,
];

/// Mediator pair states in which this node's side of the pair is settled,
/// off-chain or on-chain.
pub const PAIR_STATES_FINAL: [PairState; 3] =
	[PairState::PayerBalanceProof, PairState::Expired, PairState::ContractWithdraw];
