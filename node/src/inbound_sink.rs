//! Bridges the transport's `ReceiveSink` callback (sync, called from the
//! transport's own actor loop) to the dispatcher task: decode, verify, map
//! to a `StateChange`, hand off over a channel. Malformed or unverifiable
//! input is dropped and logged, per the validation-error policy — never
//! fatal, no signal back to the sender.

use std::sync::Arc;

use tracing::warn;
use waypoint_chain::PrivateKey;
use waypoint_messages::Message;
use waypoint_primitives::types::Address;
use waypoint_state_machine::types::StateChange;
use waypoint_storage::SqliteStore;
use waypoint_transition::{
	from_message,
	Router,
};
use waypoint_transport::ReceiveSink;

pub struct InboundSink {
	pub router: Arc<Router<SqliteStore>>,
	pub crypto: Arc<PrivateKey>,
	pub our_address: Address,
	pub state_changes: tokio::sync::mpsc::Sender<StateChange>,
}

impl ReceiveSink for InboundSink {
	fn receive(&self, peer: Address, data: Vec<u8>) {
		let message = match Message::decode(&data) {
			Ok(message) => message,
			Err(error) => {
				warn!(peer = ?peer, %error, "dropping malformed message");
				return
			},
		};

		if message.sender() != peer {
			warn!(peer = ?peer, declared = ?message.sender(), "dropping message whose declared sender doesn't match the transport peer");
			return
		}

		if let Err(error) = message.verify(&*self.crypto) {
			warn!(peer = ?peer, %error, "dropping message with invalid signature");
			return
		}

		let channels = self.router.channels_snapshot();
		let change = match from_message(message, self.our_address, &channels) {
			Ok(change) => change,
			Err(error) => {
				warn!(peer = ?peer, %error, "dropping message referencing unknown channel state");
				return
			},
		};

		// `try_send` rather than blocking: `receive` runs on the transport's
		// own actor loop, which must not stall waiting on the dispatcher.
		// Dropping under backpressure relies on the sender's own retry
		// cadence, the same way a full socket buffer would.
		if self.state_changes.try_send(change).is_err() {
			warn!(peer = ?peer, "dispatcher queue full, dropping inbound message");
		}
	}
}
