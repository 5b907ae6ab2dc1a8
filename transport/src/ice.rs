use async_trait::async_trait;
use waypoint_primitives::types::Address;

use crate::error::TransportError;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IceRole {
	/// We originated the session: we gather candidates first and send the
	/// offer.
	Controlling,
	/// The peer originated the session: we answer their offer.
	Controlled,
}

/// One ICE agent bound to a single peer. The concrete implementation wraps
/// the `webrtc` crate's ICE agent and STUN/TURN candidate gathering; this
/// crate only depends on the shape below, the same way it depends on
/// `Crypto`/`OnChain` as ports rather than concrete adapters. Kept
/// dyn-compatible (a fixed error type rather than an associated one) since
/// the dispatch loop holds one boxed agent per peer.
#[async_trait]
pub trait IceAgent: Send + Sync {
	/// Start gathering local candidates for `role`.
	async fn init(&mut self, role: IceRole) -> Result<(), TransportError>;

	/// The local session description, to be exchanged out of band.
	async fn local_sdp(&mut self) -> Result<String, TransportError>;

	/// Feed the peer's session description and begin connectivity checks.
	async fn start_negotiation(&mut self, remote_sdp: String) -> Result<(), TransportError>;

	/// Send one datagram over the negotiated candidate pair. Only valid
	/// after negotiation completes.
	async fn send(&self, data: &[u8]) -> Result<(), TransportError>;

	/// Release the underlying ICE/DTLS resources.
	async fn stop(&mut self);
}

/// Out-of-band SDP exchange, e.g. over a signalling service the peer is
/// already subscribed to.
#[async_trait]
pub trait Signaller: Send + Sync {
	/// Confirm `peer` is reachable through the signalling service before
	/// spending effort on ICE.
	async fn try_reach(&self, peer: Address) -> Result<(), TransportError>;

	/// Send `local_sdp` to `peer` and wait for their answer.
	async fn exchange_sdp(&self, peer: Address, local_sdp: String) -> Result<String, TransportError>;
}

/// Builds a fresh `IceAgent` for a new peer session. Implemented by whatever
/// owns the `webrtc` ICE stack and TURN credentials. `peer` is passed through
/// so a concrete adapter can resolve it to whatever out-of-band address
/// (socket address, relay id, ...) its negotiation actually needs.
pub trait IceAgentFactory: Send + Sync {
	fn new_agent(&self, peer: Address) -> Box<dyn IceAgent>;
}
