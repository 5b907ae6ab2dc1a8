use waypoint_primitives::types::ChannelIdentifier;
use waypoint_state_machine::errors::StateTransitionError;
use waypoint_storage::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum RouterError {
	#[error("channel {0} is not known to this node")]
	UnknownChannel(ChannelIdentifier),

	#[error("transition error: {0}")]
	Transition(#[from] StateTransitionError),

	#[error("store error: {0}")]
	Store(#[from] StoreError),
}
