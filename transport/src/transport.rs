use std::{
	collections::HashMap,
	sync::Arc,
};

use parking_lot::Mutex;
use tokio::sync::{
	mpsc,
	oneshot,
};
use tokio_stream::{
	wrappers::IntervalStream,
	StreamExt,
};
use tracing::{
	debug,
	info,
	trace,
	warn,
};
use waypoint_primitives::types::Address;

use crate::{
	config::TransportConfig,
	error::TransportError,
	ice::{
		IceAgent,
		IceAgentFactory,
		IceRole,
		Signaller,
	},
	session::{
		PeerSession,
		PeerState,
	},
	sink::ReceiveSink,
};

enum Command {
	Send { peer: Address, data: Vec<u8> },
	Inbound { peer: Address, data: Vec<u8> },
	NegotiationDone { peer: Address, agent: Option<mpsc::Sender<AgentCommand>>, result: Result<(), TransportError> },
	SdpOffer { peer: Address, sdp: String, reply: oneshot::Sender<Result<String, TransportError>> },
	StopAccepting,
	Stop,
}

/// What the dedicated per-agent task accepts. Owning the `Box<dyn IceAgent>`
/// exclusively on its own task means `send`/`stop` never need to cross a
/// mutex guard over an `.await` point.
enum AgentCommand {
	Send(Vec<u8>),
	Stop,
}

/// A cheaply-cloneable front door to the transport's actor loop. `send` is
/// non-blocking from the caller's perspective: it either queues or reports
/// `TransportError::Stopped`, and never itself drives I/O.
#[derive(Clone)]
pub struct TransportHandle {
	commands: mpsc::Sender<Command>,
}

impl TransportHandle {
	pub async fn send(&self, peer: Address, data: Vec<u8>) -> Result<(), TransportError> {
		self.commands.send(Command::Send { peer, data }).await.map_err(|_| TransportError::Stopped)
	}

	/// Feed a datagram read off a concrete `IceAgent`'s own transport (a UDP
	/// socket, a relay connection, ...) back into the actor loop, which
	/// touches the session's liveness timestamp and forwards to the sink.
	pub async fn deliver_inbound(&self, peer: Address, data: Vec<u8>) -> Result<(), TransportError> {
		self.commands.send(Command::Inbound { peer, data }).await.map_err(|_| TransportError::Stopped)
	}

	/// Delivers an SDP offer that arrived out of band (from the signalling
	/// service) and waits for our answer.
	pub async fn offer_arrived(&self, peer: Address, sdp: String) -> Result<String, TransportError> {
		let (reply_tx, reply_rx) = oneshot::channel();
		self.commands
			.send(Command::SdpOffer { peer, sdp, reply: reply_tx })
			.await
			.map_err(|_| TransportError::Stopped)?;
		reply_rx.await.map_err(|_| TransportError::Stopped)?
	}

	pub async fn stop_accepting(&self) {
		let _ = self.commands.send(Command::StopAccepting).await;
	}

	pub async fn stop(&self) {
		let _ = self.commands.send(Command::Stop).await;
	}
}

fn spawn_agent_task(mut agent: Box<dyn IceAgent>) -> mpsc::Sender<AgentCommand> {
	let (tx, mut rx) = mpsc::channel::<AgentCommand>(32);
	tokio::spawn(async move {
		while let Some(command) = rx.recv().await {
			match command {
				AgentCommand::Send(data) => {
					if let Err(error) = agent.send(&data).await {
						warn!(%error, "send failed");
					}
				},
				AgentCommand::Stop => {
					agent.stop().await;
					break
				},
			}
		}
	});
	tx
}

/// Peer-addressed datagram transport. Owns one mutex over the per-peer
/// session table, acquired only to mutate it; ICE negotiation and signalling
/// exchanges run outside the lock on their own tasks, reporting back through
/// the command queue (the async translation of the original's
/// goroutine-plus-channel pattern).
pub struct Transport<S: Signaller + 'static> {
	config: TransportConfig,
	signaller: Arc<S>,
	agent_factory: Arc<dyn IceAgentFactory>,
	sink: Arc<dyn ReceiveSink>,
	sessions: Arc<Mutex<HashMap<Address, PeerSession>>>,
	agents: Arc<Mutex<HashMap<Address, mpsc::Sender<AgentCommand>>>>,
	commands: mpsc::Sender<Command>,
	command_rx: mpsc::Receiver<Command>,
	accepting: bool,
}

impl<S: Signaller + 'static> Transport<S> {
	pub fn new(
		config: TransportConfig,
		signaller: S,
		agent_factory: Arc<dyn IceAgentFactory>,
		sink: Arc<dyn ReceiveSink>,
	) -> (Self, TransportHandle) {
		let (commands, command_rx) = mpsc::channel(config.send_queue_capacity);
		let handle = TransportHandle { commands: commands.clone() };
		let transport = Self {
			config,
			signaller: Arc::new(signaller),
			agent_factory,
			sink,
			sessions: Arc::new(Mutex::new(HashMap::new())),
			agents: Arc::new(Mutex::new(HashMap::new())),
			commands,
			command_rx,
			accepting: false,
		};
		(transport, handle)
	}

	/// Runs the actor loop until `Stop` is received. Call on its own task.
	pub async fn run(mut self) {
		self.accepting = true;
		let mut idle_sweep = IntervalStream::new(tokio::time::interval(self.config.check_interval));
		loop {
			tokio::select! {
				command = self.command_rx.recv() => {
					match command {
						Some(Command::Send { peer, data }) => self.handle_send(peer, data).await,
						Some(Command::Inbound { peer, data }) => self.handle_inbound(peer, data),
						Some(Command::NegotiationDone { peer, agent, result }) => {
							self.handle_negotiation_done(peer, agent, result).await
						},
						Some(Command::SdpOffer { peer, sdp, reply }) => {
							let outcome = self.handle_sdp_offer(peer, sdp).await;
							let _ = reply.send(outcome);
						},
						Some(Command::StopAccepting) => self.accepting = false,
						Some(Command::Stop) | None => break,
					}
				}
				Some(_) = idle_sweep.next() => self.sweep_idle_sessions(),
			}
		}
		self.shutdown().await;
	}

	async fn handle_send(&self, peer: Address, data: Vec<u8>) {
		enum Action {
			SendNow(mpsc::Sender<AgentCommand>),
			Queued,
			StartNegotiation,
		}

		let action = {
			let mut sessions = self.sessions.lock();
			match sessions.get_mut(&peer) {
				Some(session) if session.state == PeerState::Ready => {
					match self.agents.lock().get(&peer).cloned() {
						Some(agent) => Action::SendNow(agent),
						None => Action::Queued,
					}
				},
				Some(session) => {
					session.pending.push(data.clone());
					Action::Queued
				},
				None => {
					sessions.insert(peer, PeerSession::negotiating(tokio::time::Instant::now()));
					Action::StartNegotiation
				},
			}
		};

		match action {
			Action::SendNow(agent) => {
				if agent.send(AgentCommand::Send(data)).await.is_err() {
					warn!(peer = ?peer, "agent task gone, dropping send");
				}
			},
			Action::Queued => trace!(peer = ?peer, "negotiation already in flight, queued"),
			Action::StartNegotiation => self.start_negotiation(peer, data).await,
		}
	}

	async fn start_negotiation(&self, peer: Address, pending_send: Vec<u8>) {
		{
			let mut sessions = self.sessions.lock();
			let session = sessions.entry(peer).or_insert_with(|| PeerSession::negotiating(tokio::time::Instant::now()));
			session.pending.push(pending_send);
		}

		let signaller = self.signaller.clone();
		let agent_factory = self.agent_factory.clone();
		let commands = self.commands.clone();
		let negotiation_timeout = self.config.negotiation_timeout;

		tokio::spawn(async move {
			let attempt = tokio::time::timeout(negotiation_timeout, async {
				signaller.try_reach(peer).await?;
				let mut agent = agent_factory.new_agent(peer);
				agent.init(IceRole::Controlling).await?;
				let local_sdp = agent.local_sdp().await?;
				let remote_sdp = signaller.exchange_sdp(peer, local_sdp).await?;
				agent.start_negotiation(remote_sdp).await?;
				Ok::<Box<dyn IceAgent>, TransportError>(agent)
			})
			.await
			.unwrap_or(Err(TransportError::NegotiationTimeout(peer)));

			let (agent_handle, result) = match attempt {
				Ok(agent) => (Some(spawn_agent_task(agent)), Ok(())),
				Err(error) => (None, Err(error)),
			};
			let _ = commands.send(Command::NegotiationDone { peer, agent: agent_handle, result }).await;
		});
	}

	async fn handle_negotiation_done(
		&self,
		peer: Address,
		agent: Option<mpsc::Sender<AgentCommand>>,
		result: Result<(), TransportError>,
	) {
		match (result, agent) {
			(Ok(()), Some(agent)) => {
				let pending = {
					let mut sessions = self.sessions.lock();
					match sessions.get_mut(&peer) {
						Some(session) => session.mark_ready(tokio::time::Instant::now()),
						None => Vec::new(),
					}
				};
				self.agents.lock().insert(peer, agent.clone());
				for data in pending {
					let _ = agent.send(AgentCommand::Send(data)).await;
				}
			},
			(error, _) => {
				if let Err(error) = error {
					info!(peer = ?peer, %error, "negotiation failed, dropping queued sends");
				}
				self.sessions.lock().remove(&peer);
				self.agents.lock().remove(&peer);
			},
		}
	}

	fn handle_inbound(&self, peer: Address, data: Vec<u8>) {
		{
			let mut sessions = self.sessions.lock();
			if let Some(session) = sessions.get_mut(&peer) {
				session.touch(tokio::time::Instant::now());
			}
		}
		self.sink.receive(peer, data);
	}

	/// Simultaneous-open collision: if we already have a session with this
	/// peer, reject the incoming offer rather than racing two negotiations.
	async fn handle_sdp_offer(&self, peer: Address, sdp: String) -> Result<String, TransportError> {
		if !self.accepting {
			return Err(TransportError::ReceiveStopped)
		}
		{
			let mut sessions = self.sessions.lock();
			if sessions.contains_key(&peer) {
				return Err(TransportError::SimultaneousOpen(peer))
			}
			sessions.insert(peer, PeerSession::negotiating(tokio::time::Instant::now()));
		}

		let mut agent = self.agent_factory.new_agent(peer);
		agent.init(IceRole::Controlled).await?;
		agent.start_negotiation(sdp).await?;
		let local_sdp = agent.local_sdp().await?;

		let pending = {
			let mut sessions = self.sessions.lock();
			match sessions.get_mut(&peer) {
				Some(session) => session.mark_ready(tokio::time::Instant::now()),
				None => Vec::new(),
			}
		};
		let agent_handle = spawn_agent_task(agent);
		self.agents.lock().insert(peer, agent_handle.clone());
		for data in pending {
			let _ = agent_handle.send(AgentCommand::Send(data)).await;
		}
		Ok(local_sdp)
	}

	fn sweep_idle_sessions(&self) {
		let now = tokio::time::Instant::now();
		let threshold = self.config.check_interval * 2;
		let expired: Vec<Address> = {
			let sessions = self.sessions.lock();
			sessions
				.iter()
				.filter(|(_, session)| session.state == PeerState::Ready && session.idle_for(now) > threshold)
				.map(|(peer, _)| *peer)
				.collect()
		};
		for peer in expired {
			debug!(peer = ?peer, "idle session torn down");
			self.sessions.lock().remove(&peer);
			if let Some(agent) = self.agents.lock().remove(&peer) {
				tokio::spawn(async move {
					let _ = agent.send(AgentCommand::Stop).await;
				});
			}
		}
	}

	async fn shutdown(self) {
		self.sessions.lock().clear();
		let agents: Vec<mpsc::Sender<AgentCommand>> = self.agents.lock().drain().map(|(_, agent)| agent).collect();
		for agent in agents {
			let _ = agent.send(AgentCommand::Stop).await;
		}
	}
}
