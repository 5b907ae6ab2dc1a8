//! Channel bookkeeping: balance-proof construction/verification and
//! the lock tree. The FSMs call into this module to mutate the channel(s)
//! touched by a transition; the Router calls into it directly for
//! chain-observed transitions (`ChannelStateChange`).

pub mod utils;
pub mod validators;

use waypoint_primitives::types::Bytes;

use self::{
	utils::compute_locksroot,
	validators::{
		validate_channel_open,
		validate_lock_expiration,
		validate_locksroot,
		validate_no_duplicate_lock,
		validate_nonce,
		validate_sufficient_balance,
	},
};
use crate::{
	errors::StateTransitionError,
	types::{
		Address,
		BalanceProofState,
		BalanceProofUpdated,
		CanonicalIdentifier,
		ChannelEndState,
		ChannelState,
		ChannelStateChange,
		ChannelStatus,
		Closed,
		CooperativelySettled,
		Deposit,
		HashTimeLock,
		NewChannel,
		Nonce,
		SecretHash,
		Settled,
		TokenAmount,
	},
};

/// Build the initial channel state from an observed `NewChannel` chain
/// event. Rejects a channel whose `reveal_timeout`/`settle_timeout` pair
/// isn't well formed rather than silently accepting it.
pub fn create(new_channel: &NewChannel) -> Result<ChannelState, StateTransitionError> {
	let channel = ChannelState {
		canonical_identifier: new_channel.canonical_identifier.clone(),
		token_address: new_channel.canonical_identifier.token_address,
		our_state: ChannelEndState::new(new_channel.our_address, TokenAmount::zero()),
		partner_state: ChannelEndState::new(new_channel.partner_address, TokenAmount::zero()),
		reveal_timeout: new_channel.reveal_timeout,
		settle_timeout: new_channel.settle_timeout,
		open_block_number: new_channel.opened_block,
		status: ChannelStatus::Opened,
	};
	if !channel.is_well_formed() {
		return Err(StateTransitionError::from(format!(
			"channel {} is not well formed: reveal_timeout {} / settle_timeout {}",
			channel.channel_identifier(),
			channel.reveal_timeout,
			channel.settle_timeout
		)))
	}
	Ok(channel)
}

/// Top-level dispatcher for chain-observed channel transitions. Each arm is
/// idempotent when applied twice with the same payload; true de-duplication
/// by `(channel_identifier, block_number, event_index)` is the Router's job,
/// this function only guards against re-applying a state that already
/// reflects the event.
pub fn state_transition(
	mut channel: ChannelState,
	state_change: ChannelStateChange,
) -> Result<ChannelState, StateTransitionError> {
	match state_change {
		ChannelStateChange::NewChannel(_) => Ok(channel),
		ChannelStateChange::Deposit(deposit) => {
			apply_deposit(&mut channel, &deposit);
			Ok(channel)
		},
		ChannelStateChange::Closed(closed) => {
			apply_closed(&mut channel, &closed);
			Ok(channel)
		},
		ChannelStateChange::Settled(settled) => {
			apply_settled(&mut channel, &settled);
			Ok(channel)
		},
		ChannelStateChange::CooperativelySettled(event) => {
			apply_cooperatively_settled(&mut channel, &event);
			Ok(channel)
		},
		ChannelStateChange::BalanceProofUpdated(event) => {
			apply_balance_proof_updated(&mut channel, event)?;
			Ok(channel)
		},
	}
}

fn end_state_mut<'a>(channel: &'a mut ChannelState, participant: Address) -> &'a mut ChannelEndState {
	if channel.our_state.address == participant {
		&mut channel.our_state
	} else {
		&mut channel.partner_state
	}
}

fn apply_deposit(channel: &mut ChannelState, deposit: &Deposit) {
	let end_state = end_state_mut(channel, deposit.participant);
	if deposit.total_deposit > end_state.contract_balance {
		end_state.contract_balance = deposit.total_deposit;
	}
}

fn apply_closed(channel: &mut ChannelState, _closed: &Closed) {
	// Once Closed is observed, no further off-chain updates from either
	// side are accepted.
	channel.status = ChannelStatus::Closed;
}

fn apply_settled(channel: &mut ChannelState, _settled: &Settled) {
	channel.status = ChannelStatus::Settled;
}

fn apply_cooperatively_settled(channel: &mut ChannelState, _event: &CooperativelySettled) {
	channel.status = ChannelStatus::CooperativelySettled;
}

/// An externally-supplied balance proof update (e.g. replayed from the
/// monitoring service, or an on-chain `updateNonClosingBalanceProof`). Must
/// still clear the ordinary nonce/locksroot checks.
fn apply_balance_proof_updated(
	channel: &mut ChannelState,
	event: BalanceProofUpdated,
) -> Result<(), StateTransitionError> {
	let is_ours = event.balance_proof.sender == channel.our_state.address;
	let end_state = if is_ours { &mut channel.our_state } else { &mut channel.partner_state };
	validate_nonce(end_state, &event.balance_proof)?;
	end_state.balance_proof = Some(event.balance_proof);
	Ok(())
}

/// Lock `lock` on our side, producing the balance proof to attach to the
/// outbound `MediatedTransfer`/refund message.
pub(crate) fn send_locked_transfer(
	channel: &mut ChannelState,
	lock: HashTimeLock,
) -> Result<BalanceProofState, StateTransitionError> {
	validate_channel_open(channel)?;
	validate_no_duplicate_lock(&channel.our_state, &lock)?;
	validate_sufficient_balance(&channel.our_state, lock.amount)?;

	channel.our_state.pending_locks.push(lock);
	let locksroot = compute_locksroot(&channel.our_state);
	let balance_proof = BalanceProofState {
		nonce: channel.our_state.nonce() + Nonce::from(1),
		transferred_amount: channel.our_state.transferred_amount(),
		locked_amount: channel.our_state.locked_amount(),
		locksroot,
		canonical_identifier: channel.canonical_identifier.clone(),
		signature: None,
		sender: channel.our_state.address,
	};
	channel.our_state.balance_proof = Some(balance_proof.clone());
	Ok(balance_proof)
}

/// Validate and apply an incoming `MediatedTransfer`'s lock against the
/// partner's side of the channel.
pub(crate) fn handle_receive_locked_transfer(
	channel: &mut ChannelState,
	lock: HashTimeLock,
	balance_proof: BalanceProofState,
) -> Result<(), StateTransitionError> {
	validate_channel_open(channel)?;
	validate_lock_expiration(channel, lock.expiration)?;
	validate_no_duplicate_lock(&channel.partner_state, &lock)?;
	validate_sufficient_balance(&channel.partner_state, lock.amount)?;
	validate_nonce(&channel.partner_state, &balance_proof)?;

	channel.partner_state.pending_locks.push(lock);
	let expected_locksroot = compute_locksroot(&channel.partner_state);
	validate_locksroot(expected_locksroot, &balance_proof)?;

	channel.partner_state.balance_proof = Some(balance_proof);
	Ok(())
}

/// Remove our lock for `secret_hash`, moving its amount into
/// `transferred_amount`, producing the balance proof for the outbound
/// `BalanceProof`/unlock message.
pub(crate) fn send_unlock(
	channel: &mut ChannelState,
	secret_hash: SecretHash,
) -> Result<BalanceProofState, StateTransitionError> {
	validate_channel_open(channel)?;
	let lock = channel
		.our_state
		.find_lock(&secret_hash)
		.cloned()
		.ok_or_else(|| StateTransitionError::from(format!("no lock for secret hash {:x}", secret_hash)))?;

	channel.our_state.pending_locks.retain(|l| l.secret_hash != secret_hash);
	let new_transferred_amount = channel.our_state.transferred_amount() + lock.amount;
	let locksroot = compute_locksroot(&channel.our_state);
	let balance_proof = BalanceProofState {
		nonce: channel.our_state.nonce() + Nonce::from(1),
		transferred_amount: new_transferred_amount,
		locked_amount: channel.our_state.locked_amount(),
		locksroot,
		canonical_identifier: channel.canonical_identifier.clone(),
		signature: None,
		sender: channel.our_state.address,
	};
	channel.our_state.balance_proof = Some(balance_proof.clone());
	Ok(balance_proof)
}

/// Validate and apply an incoming unlock, returning the amount that was
/// unlocked so the caller's FSM can credit it (e.g. `PaymentSentSuccess`).
/// Public so that the off-chain `ReceiveBalanceProof` wire path, which lives
/// outside this crate, can derive the correct `locked_amount` from the lock
/// tree rather than trusting a chain-observed snapshot.
pub fn handle_receive_unlock(
	channel: &mut ChannelState,
	secret_hash: SecretHash,
	balance_proof: BalanceProofState,
) -> Result<TokenAmount, StateTransitionError> {
	validate_channel_open(channel)?;
	let lock = channel.partner_state.find_lock(&secret_hash).cloned().ok_or_else(|| {
		StateTransitionError::from(format!("no lock for secret hash {:x}", secret_hash))
	})?;
	validate_nonce(&channel.partner_state, &balance_proof)?;

	channel.partner_state.pending_locks.retain(|l| l.secret_hash != secret_hash);
	let expected_locksroot = compute_locksroot(&channel.partner_state);
	validate_locksroot(expected_locksroot, &balance_proof)?;

	channel.partner_state.balance_proof = Some(balance_proof);
	Ok(lock.amount)
}

/// Refund a lock we had sent: remove it from our side without moving any
/// amount into `transferred_amount` — the payee produced an
/// `AnnounceDisposed` refund, clearing our obligation.
pub(crate) fn handle_refund(channel: &mut ChannelState, secret_hash: SecretHash) {
	channel.our_state.pending_locks.retain(|l| l.secret_hash != secret_hash);
}

/// A zero-length placeholder secret, used before a secret is known.
pub fn no_secret() -> Bytes {
	Bytes(vec![])
}

#[cfg(test)]
mod tests {
	use waypoint_primitives::types::{
		Address,
		U256,
	};

	use super::*;
	use crate::types::SecretHash;

	fn make_channel() -> ChannelState {
		create(&NewChannel {
			canonical_identifier: CanonicalIdentifier {
				chain_id: 1,
				token_address: Address::zero(),
				channel_identifier: U256::from(1),
			},
			our_address: Address::from_low_u64_be(1),
			partner_address: Address::from_low_u64_be(2),
			reveal_timeout: 30,
			settle_timeout: 600,
			opened_block: 1,
		})
		.expect("well-formed test channel")
	}

	#[test]
	fn malformed_channel_is_rejected() {
		let result = create(&NewChannel {
			canonical_identifier: CanonicalIdentifier {
				chain_id: 1,
				token_address: Address::zero(),
				channel_identifier: U256::from(1),
			},
			our_address: Address::from_low_u64_be(1),
			partner_address: Address::from_low_u64_be(2),
			reveal_timeout: 600,
			settle_timeout: 600,
			opened_block: 1,
		});
		assert!(result.is_err());
	}

	#[test]
	fn deposit_raises_contract_balance() {
		let mut channel = make_channel();
		apply_deposit(
			&mut channel,
			&Deposit {
				canonical_identifier: channel.canonical_identifier.clone(),
				participant: channel.our_state.address,
				total_deposit: U256::from(100),
			},
		);
		assert_eq!(channel.our_state.contract_balance, U256::from(100));
	}

	#[test]
	fn locked_transfer_round_trips_locksroot() {
		let mut sender_channel = make_channel();
		apply_deposit(
			&mut sender_channel,
			&Deposit {
				canonical_identifier: sender_channel.canonical_identifier.clone(),
				participant: sender_channel.our_state.address,
				total_deposit: U256::from(100),
			},
		);
		let lock = HashTimeLock {
			amount: U256::from(10),
			expiration: 100,
			secret_hash: SecretHash::from_low_u64_be(42),
		};
		let bp = send_locked_transfer(&mut sender_channel, lock.clone()).unwrap();

		let mut receiver_channel = make_channel();
		// swap our/partner to mirror the other side of the same channel
		std::mem::swap(&mut receiver_channel.our_state, &mut receiver_channel.partner_state);
		apply_deposit(
			&mut receiver_channel,
			&Deposit {
				canonical_identifier: receiver_channel.canonical_identifier.clone(),
				participant: receiver_channel.partner_state.address,
				total_deposit: U256::from(100),
			},
		);
		handle_receive_locked_transfer(&mut receiver_channel, lock, bp).unwrap();
		assert_eq!(receiver_channel.partner_state.pending_locks.len(), 1);
	}

	#[test]
	fn duplicate_lock_is_rejected() {
		let mut channel = make_channel();
		apply_deposit(
			&mut channel,
			&Deposit {
				canonical_identifier: channel.canonical_identifier.clone(),
				participant: channel.our_state.address,
				total_deposit: U256::from(100),
			},
		);
		let lock = HashTimeLock {
			amount: U256::from(1),
			expiration: 100,
			secret_hash: SecretHash::from_low_u64_be(1),
		};
		send_locked_transfer(&mut channel, lock.clone()).unwrap();
		assert!(send_locked_transfer(&mut channel, lock).is_err());
	}

	#[test]
	fn insufficient_balance_is_rejected() {
		let mut channel = make_channel();
		let lock = HashTimeLock {
			amount: U256::from(10),
			expiration: 100,
			secret_hash: SecretHash::from_low_u64_be(1),
		};
		assert!(send_locked_transfer(&mut channel, lock).is_err());
	}

	#[test]
	fn closed_channel_rejects_new_locks() {
		let mut channel = make_channel();
		apply_closed(
			&mut channel,
			&Closed {
				canonical_identifier: channel.canonical_identifier.clone(),
				closing_address: channel.partner_state.address,
				closed_block: 50,
			},
		);
		let lock = HashTimeLock {
			amount: U256::from(1),
			expiration: 100,
			secret_hash: SecretHash::from_low_u64_be(1),
		};
		assert!(send_locked_transfer(&mut channel, lock).is_err());
	}
}
