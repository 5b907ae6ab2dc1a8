//! Route selection used when starting or forwarding a transfer. Both the
//! initiator and the mediator pick the first route with sufficient capacity
//! rather than optimizing for fees — there are no fees to optimize for.

use waypoint_primitives::types::TokenAmount;

use crate::{
	errors::StateTransitionError,
	types::{
		ChannelMap,
		RouteState,
	},
	views,
};

/// Pick the first usable route for `amount`, consuming it from `routes` so
/// the caller can retry with what remains if the channel later turns out to
/// be unusable (closed mid-flight, etc).
pub fn pick_route(
	channels: &ChannelMap,
	routes: &[RouteState],
	amount: TokenAmount,
) -> Result<RouteState, StateTransitionError> {
	views::next_usable_route(channels, routes, amount)
		.cloned()
		.ok_or_else(|| StateTransitionError::from("no usable route"))
}

/// Like [`pick_route`] but with an extra role-specific acceptance test run
/// against each otherwise-usable route (e.g. the initiator's minimum
/// reveal-timeout margin, the mediator's downstream settle-timeout check).
pub fn pick_route_where(
	channels: &ChannelMap,
	routes: &[RouteState],
	amount: TokenAmount,
	extra: impl Fn(&RouteState) -> bool,
) -> Result<RouteState, StateTransitionError> {
	routes
		.iter()
		.find(|route| {
			!route.closed &&
				route.available_balance >= amount &&
				views::get_open_channel(channels, route).is_some() &&
				extra(route)
		})
		.cloned()
		.ok_or_else(|| StateTransitionError::from("no usable route"))
}

/// Remove `route` from `routes`, used after a route has been tried and
/// refused so the next attempt does not pick it again.
pub fn without_route(routes: &[RouteState], route: &RouteState) -> Vec<RouteState> {
	routes.iter().filter(|r| r.channel_identifier != route.channel_identifier).cloned().collect()
}
