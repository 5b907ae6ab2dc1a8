//! Concrete `Signaller`/`IceAgentFactory` adapters for this exerciser
//! binary. Real NAT traversal (STUN/TURN candidate negotiation over a
//! signalling service) is out of scope here — see the design ledger; peers
//! are expected to be directly reachable at a socket address known up
//! front from config, which stands in for the signalling exchange the
//! `Signaller` port is meant to abstract over.

use std::{
	collections::HashMap,
	net::SocketAddr,
	sync::Arc,
};

use async_trait::async_trait;
use tokio::{
	net::UdpSocket,
	sync::OnceCell,
	task::JoinHandle,
};
use tracing::warn;
use waypoint_primitives::{
	constants::MAX_MESSAGE_SIZE,
	types::Address,
};
use waypoint_transport::{
	IceAgent,
	IceAgentFactory,
	IceRole,
	Signaller,
	TransportError,
	TransportHandle,
};

/// Out-of-band knowledge of every peer's reachable socket address. Stands
/// in for a real signalling service: `exchange_sdp` never touches the
/// network, it looks the peer up in a table built from config.
pub struct PeerTableSignaller {
	peers: HashMap<Address, SocketAddr>,
}

impl PeerTableSignaller {
	pub fn new(peers: HashMap<Address, SocketAddr>) -> Self {
		Self { peers }
	}
}

#[async_trait]
impl Signaller for PeerTableSignaller {
	async fn try_reach(&self, peer: Address) -> Result<(), TransportError> {
		self.peers
			.get(&peer)
			.map(|_| ())
			.ok_or_else(|| TransportError::Signalling(peer, "peer not present in the configured peer table".into()))
	}

	async fn exchange_sdp(&self, peer: Address, _local_sdp: String) -> Result<String, TransportError> {
		let addr = self
			.peers
			.get(&peer)
			.ok_or_else(|| TransportError::Signalling(peer, "peer not present in the configured peer table".into()))?;
		Ok(addr.to_string())
	}
}

/// Builds one UDP socket per peer session. The "SDP" exchanged between
/// sides is nothing more than each side's own bound socket address; there
/// is no real candidate gathering, so this only works between peers that
/// can already reach each other's address directly.
pub struct UdpIceAgentFactory {
	handle: Arc<OnceCell<TransportHandle>>,
	bind_ip: std::net::IpAddr,
}

impl UdpIceAgentFactory {
	pub fn new(handle: Arc<OnceCell<TransportHandle>>, bind_ip: std::net::IpAddr) -> Self {
		Self { handle, bind_ip }
	}
}

impl IceAgentFactory for UdpIceAgentFactory {
	fn new_agent(&self, peer: Address) -> Box<dyn IceAgent> {
		Box::new(UdpIceAgent {
			peer,
			handle: self.handle.clone(),
			bind_ip: self.bind_ip,
			socket: None,
			reader: None,
		})
	}
}

pub struct UdpIceAgent {
	peer: Address,
	handle: Arc<OnceCell<TransportHandle>>,
	bind_ip: std::net::IpAddr,
	socket: Option<Arc<UdpSocket>>,
	reader: Option<JoinHandle<()>>,
}

#[async_trait]
impl IceAgent for UdpIceAgent {
	async fn init(&mut self, _role: IceRole) -> Result<(), TransportError> {
		let socket = UdpSocket::bind((self.bind_ip, 0))
			.await
			.map_err(|error| TransportError::NegotiationFailed(self.peer, error.to_string()))?;
		self.socket = Some(Arc::new(socket));
		Ok(())
	}

	async fn local_sdp(&mut self) -> Result<String, TransportError> {
		let socket =
			self.socket.as_ref().ok_or_else(|| TransportError::NegotiationFailed(self.peer, "agent not initialised".into()))?;
		socket.local_addr().map(|addr| addr.to_string()).map_err(|error| TransportError::NegotiationFailed(self.peer, error.to_string()))
	}

	async fn start_negotiation(&mut self, remote_sdp: String) -> Result<(), TransportError> {
		let remote: SocketAddr = remote_sdp
			.parse()
			.map_err(|_| TransportError::NegotiationFailed(self.peer, format!("malformed peer address {remote_sdp}")))?;
		let socket = self
			.socket
			.as_ref()
			.ok_or_else(|| TransportError::NegotiationFailed(self.peer, "agent not initialised".into()))?
			.clone();
		socket.connect(remote).await.map_err(|error| TransportError::NegotiationFailed(self.peer, error.to_string()))?;

		let handle = self.handle.get().cloned();
		let peer = self.peer;
		let reader_socket = socket.clone();
		self.reader = Some(tokio::spawn(async move {
			let handle = match handle {
				Some(handle) => handle,
				None => {
					warn!(peer = ?peer, "transport handle not ready, dropping receive loop");
					return
				},
			};
			let mut buf = vec![0u8; MAX_MESSAGE_SIZE];
			loop {
				match reader_socket.recv(&mut buf).await {
					Ok(n) => {
						if handle.deliver_inbound(peer, buf[..n].to_vec()).await.is_err() {
							break
						}
					},
					Err(error) => {
						warn!(peer = ?peer, %error, "udp receive loop ended");
						break
					},
				}
			}
		}));
		Ok(())
	}

	async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
		let socket = self.socket.as_ref().ok_or(TransportError::NotReady(self.peer))?;
		socket.send(data).await.map_err(|error| TransportError::NegotiationFailed(self.peer, error.to_string()))?;
		Ok(())
	}

	async fn stop(&mut self) {
		if let Some(reader) = self.reader.take() {
			reader.abort();
		}
		self.socket = None;
	}
}
