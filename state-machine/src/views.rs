//! Read-only helpers shared by the role transitions. None of these mutate
//! state; they exist so the three FSMs agree on the same predicates instead
//! of each re-deriving them.

use waypoint_primitives::types::BlockNumber;

use crate::types::{
	ChannelMap,
	ChannelState,
	ChannelStatus,
	HashTimeLock,
	RevealTimeout,
	RouteState,
};

/// Whether it is still safe to wait for a peer to reveal a secret before the
/// lock backing it expires: the lock must still have more than a full
/// `reveal_timeout` window of blocks left. Shared by the mediator and the
/// target so that a lock neither side considers safe to wait on is never
/// accidentally unlocked by one of them racing the other.
pub fn safe_to_wait(lock: &HashTimeLock, reveal_timeout: RevealTimeout, block_number: BlockNumber) -> bool {
	lock.expiration.saturating_sub(block_number) > reveal_timeout
}

/// Whether `lock` has already expired at `block_number`.
pub fn is_lock_expired(lock: &HashTimeLock, block_number: BlockNumber) -> bool {
	block_number >= lock.expiration
}

/// The channel backing `route`, if it is known and still open.
pub fn get_open_channel<'a>(channels: &'a ChannelMap, route: &RouteState) -> Option<&'a ChannelState> {
	channels
		.get(&route.channel_identifier)
		.filter(|channel| channel.status == ChannelStatus::Opened)
}

/// The first route in `routes` whose channel is open and carries at least
/// `amount` of spendable balance. Route order is the caller's
/// responsibility; this only filters for usability.
pub fn next_usable_route<'a>(
	channels: &ChannelMap,
	routes: &'a [RouteState],
	amount: waypoint_primitives::types::TokenAmount,
) -> Option<&'a RouteState> {
	routes.iter().find(|route| {
		!route.closed && route.available_balance >= amount && get_open_channel(channels, route).is_some()
	})
}
