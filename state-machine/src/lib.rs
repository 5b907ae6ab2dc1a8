//! The pure core of the node: channel bookkeeping, the lock tree, and the
//! three mediated-transfer state machines (Initiator, Mediator, Target).
//!
//! Nothing in this crate performs I/O. Every public transition function has
//! the shape `(state, state_change, ...) -> (state', events)`; time enters
//! only through a `BlockStateChange` carried in the state-change stream.

/// State machine constants (timeouts, size limits, status groupings).
pub mod constants;

/// The `StateTransitionError` used for malformed-construction bugs.
pub mod errors;

/// Channel bookkeeping: balance proofs, the lock tree, validation.
pub mod channel;

/// The generic kernel plus the Initiator/Mediator/Target role machines.
pub mod machine;

/// All state, event and state-change value types.
pub mod types;

/// Read-only helpers over `ChannelState`/`RouteState` for FSM decisions.
pub mod views;

#[cfg(test)]
mod tests;
