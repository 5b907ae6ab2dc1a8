use waypoint_primitives::types::Address;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
	#[error("transport has stopped")]
	Stopped,

	#[error("transport has stopped receiving")]
	ReceiveStopped,

	#[error("session with {0:x} is not ready to send")]
	NotReady(Address),

	#[error("{0:x} sent an SDP offer while a session with it is already negotiating")]
	SimultaneousOpen(Address),

	#[error("ICE negotiation with {0:x} timed out")]
	NegotiationTimeout(Address),

	#[error("ICE negotiation with {0:x} failed: {1}")]
	NegotiationFailed(Address, String),

	#[error("signalling exchange with {0:x} failed: {1}")]
	Signalling(Address, String),
}
