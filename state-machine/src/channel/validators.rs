use crate::{
	errors::StateTransitionError,
	types::{
		BalanceProofState,
		BlockNumber,
		ChannelEndState,
		ChannelState,
		HashTimeLock,
		TokenAmount,
	},
};

/// No two locks on the same side may share a `secret_hash`.
pub fn validate_no_duplicate_lock(
	end_state: &ChannelEndState,
	lock: &HashTimeLock,
) -> Result<(), StateTransitionError> {
	if end_state.find_lock(&lock.secret_hash).is_some() {
		return Err(format!("lock with secret hash {:x} already exists", lock.secret_hash).into())
	}
	Ok(())
}

/// An incoming lock's expiration must leave room to settle within the
/// channel's settle window, counted from the block the channel opened.
pub fn validate_lock_expiration(
	channel: &ChannelState,
	lock_expiration: BlockNumber,
) -> Result<(), StateTransitionError> {
	let max_expiration =
		channel.settle_timeout + channel.open_block_number - channel.reveal_timeout;
	if lock_expiration > max_expiration {
		return Err(format!(
			"lock expiration {} exceeds the channel's maximum of {}",
			lock_expiration, max_expiration
		)
		.into())
	}
	Ok(())
}

/// The side's contract balance must cover everything it has already
/// transferred plus everything still locked.
pub fn validate_sufficient_balance(
	end_state: &ChannelEndState,
	additional_lock_amount: TokenAmount,
) -> Result<(), StateTransitionError> {
	let required = end_state.transferred_amount() + end_state.locked_amount() + additional_lock_amount;
	if required > end_state.contract_balance {
		return Err(format!(
			"contract balance {} insufficient for transferred+locked {}",
			end_state.contract_balance, required
		)
		.into())
	}
	Ok(())
}

/// A balance proof's nonce must strictly increase over the side's last
/// accepted nonce. Rejects stale or replayed updates.
pub fn validate_nonce(
	end_state: &ChannelEndState,
	balance_proof: &BalanceProofState,
) -> Result<(), StateTransitionError> {
	if balance_proof.nonce <= end_state.nonce() {
		return Err(format!(
			"nonce {} is not greater than the last accepted nonce {}",
			balance_proof.nonce,
			end_state.nonce()
		)
		.into())
	}
	Ok(())
}

/// The balance proof's locksroot must equal the merkle root of the side's
/// lock set once the message's implied lock mutation (addition or removal)
/// is applied.
pub fn validate_locksroot(
	expected: crate::types::Locksroot,
	balance_proof: &BalanceProofState,
) -> Result<(), StateTransitionError> {
	if balance_proof.locksroot != expected {
		return Err(format!(
			"locksroot mismatch: balance proof carries {:x}, expected {:x}",
			balance_proof.locksroot, expected
		)
		.into())
	}
	Ok(())
}

/// Channel must still accept off-chain updates from this side: once
/// `Closed` is observed, no further off-chain updates from that side are
/// accepted.
pub fn validate_channel_open(channel: &ChannelState) -> Result<(), StateTransitionError> {
	if channel.status != crate::types::ChannelStatus::Opened {
		return Err(format!("channel {} is not open", channel.channel_identifier()).into())
	}
	Ok(())
}
