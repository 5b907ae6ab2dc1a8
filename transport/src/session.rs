use tokio::time::Instant;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PeerState {
	Negotiating,
	Ready,
}

/// Per-peer bookkeeping the dispatch loop keeps under its single mutex.
/// Only the state and the two timestamps/queue are mutated under lock;
/// the actual ICE I/O happens outside it.
pub struct PeerSession {
	pub state: PeerState,
	pub last_active: Instant,
	/// Datagrams that arrived while negotiation was still in flight.
	/// Flushed, in order, once the session reaches `Ready`.
	pub pending: Vec<Vec<u8>>,
}

impl PeerSession {
	pub fn negotiating(now: Instant) -> Self {
		Self { state: PeerState::Negotiating, last_active: now, pending: Vec::new() }
	}

	pub fn mark_ready(&mut self, now: Instant) -> Vec<Vec<u8>> {
		self.state = PeerState::Ready;
		self.last_active = now;
		std::mem::take(&mut self.pending)
	}

	pub fn touch(&mut self, now: Instant) {
		self.last_active = now;
	}

	pub fn idle_for(&self, now: Instant) -> std::time::Duration {
		now.saturating_duration_since(self.last_active)
	}
}
