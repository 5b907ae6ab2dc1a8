use waypoint_primitives::types::Address;

/// The registered receive callback. Called once per inbound datagram, after
/// the session's liveness timestamp has been updated.
pub trait ReceiveSink: Send + Sync {
	fn receive(&self, peer: Address, data: Vec<u8>);
}
