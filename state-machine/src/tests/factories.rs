//! Shared builders for channels, routes and locks. Kept separate from the
//! tests that use them so a channel shape only needs fixing in one place.

use waypoint_primitives::{
	hashing::hash_secret,
	types::{
		Address,
		U256,
	},
};

use crate::{
	channel,
	types::*,
};

pub(super) const REVEAL_TIMEOUT: BlockTimeout = 30;
pub(super) const SETTLE_TIMEOUT: BlockTimeout = 600;

pub(super) fn addr(n: u64) -> Address {
	Address::from_low_u64_be(n)
}

/// A `(secret, secret_hash)` pair derived from `seed`, distinct per seed.
pub(super) fn secret(seed: u8) -> (Secret, SecretHash) {
	let secret = Bytes(vec![seed; 32]);
	let hash = hash_secret(&secret.0);
	(secret, hash)
}

pub(super) fn new_channel(id: u64, us: Address, partner: Address, opened_block: BlockNumber) -> ChannelState {
	channel::create(&NewChannel {
		canonical_identifier: CanonicalIdentifier { chain_id: 1, token_address: addr(999), channel_identifier: U256::from(id) },
		our_address: us,
		partner_address: partner,
		reveal_timeout: REVEAL_TIMEOUT,
		settle_timeout: SETTLE_TIMEOUT,
		opened_block,
	})
	.expect("well-formed test channel")
}

pub(super) fn deposited(mut channel: ChannelState, amount: u64) -> ChannelState {
	channel.our_state.contract_balance = U256::from(amount);
	channel
}

/// A channel as one specific participant (`us`) observes it, with both
/// sides' on-chain deposits recorded the way each node tracks its
/// counterparty's deposits independently of its own.
pub(super) fn channel_view(
	id: u64,
	us: Address,
	us_balance: u64,
	partner: Address,
	partner_balance: u64,
	opened_block: BlockNumber,
) -> ChannelState {
	let mut channel = new_channel(id, us, partner, opened_block);
	channel.our_state.contract_balance = U256::from(us_balance);
	channel.partner_state.contract_balance = U256::from(partner_balance);
	channel
}

pub(super) fn route_to(channel: &ChannelState, balance: u64) -> RouteState {
	RouteState {
		hop_node: channel.partner_state.address,
		channel_identifier: channel.channel_identifier(),
		available_balance: U256::from(balance),
		reveal_timeout: channel.reveal_timeout,
		settle_timeout: channel.settle_timeout,
		closed: false,
	}
}

/// The balance proof the channel's partner would have attached to a
/// `MediatedTransfer` carrying `lock`, valid against `channel`'s current
/// nonce and locksroot. Lets a test construct `ActionInitMediator`'s and
/// `ActionInitTarget`'s mandatory `balance_proof` field the way the wire
/// layer would, instead of trusting an unchecked stand-in.
pub(super) fn balance_proof_for_lock(channel: &ChannelState, lock: &HashTimeLock) -> BalanceProofState {
	let mut partner_state = channel.partner_state.clone();
	let nonce = partner_state.nonce() + Nonce::from(1);
	partner_state.pending_locks.push(lock.clone());
	BalanceProofState {
		nonce,
		transferred_amount: partner_state.transferred_amount(),
		locked_amount: partner_state.locked_amount(),
		locksroot: channel::utils::compute_locksroot(&partner_state),
		canonical_identifier: channel.canonical_identifier.clone(),
		signature: None,
		sender: partner_state.address,
	}
}

/// The `A -> B -> C` line: `A-B` is channel 1, `B-C` is channel 2, both
/// deposited 100 T and opened at block 1, keyed as each of the two
/// participants on the forwarding side sees it.
pub(super) struct Line {
	pub(super) channels: ChannelMap,
}

impl Line {
	pub(super) fn new() -> Self {
		let mut channels = ChannelMap::new();

		let ab_from_a = deposited(new_channel(1, addr(1), addr(2), 1), 100);
		channels.insert(ab_from_a.channel_identifier(), ab_from_a);

		let bc_from_b = deposited(new_channel(2, addr(2), addr(3), 1), 100);
		channels.insert(bc_from_b.channel_identifier(), bc_from_b);

		Self { channels }
	}

	/// The same line with a third route `A-D` (channel 3) and `D-C` (channel
	/// 4) available as an alternate path once `B` refuses.
	pub(super) fn with_alternate_via(mut self, d: Address) -> Self {
		let ad = deposited(new_channel(3, addr(1), d, 1), 100);
		self.channels.insert(ad.channel_identifier(), ad);

		let dc = deposited(new_channel(4, d, addr(3), 1), 100);
		self.channels.insert(dc.channel_identifier(), dc);

		self
	}
}
