//! Turns outbound `Event`s into I/O: signed wire messages over the
//! transport, or on-chain calls through the `OnChain` port. Retries with a
//! fixed-then-backoff cadence, since nothing here can tell a transient
//! failure from a permanent one.

use std::sync::Arc;

use tracing::{
	error,
	warn,
};
use waypoint_messages::{
	event_recipient,
	from_event,
};
use waypoint_primitives::ports::{
	Crypto,
	OnChain,
};
use waypoint_state_machine::types::Event;
use waypoint_transport::TransportHandle;

use crate::config::{
	Backoff,
	DispatcherConfig,
};

async fn retry<F, Fut, T, E>(config: &DispatcherConfig, mut op: F) -> T
where
	F: FnMut() -> Fut,
	Fut: std::future::Future<Output = Result<T, E>>,
	E: std::fmt::Display,
{
	let mut backoff = Backoff::new(config.clone());
	loop {
		match op().await {
			Ok(value) => return value,
			Err(error) => {
				warn!(%error, "retrying after failed dispatch");
				tokio::time::sleep(backoff.next_delay()).await;
			},
		}
	}
}

pub struct EventDispatcher<C, O> {
	crypto: Arc<C>,
	chain: Arc<O>,
	transport: TransportHandle,
	config: DispatcherConfig,
}

impl<C, O> EventDispatcher<C, O>
where
	C: Crypto,
	O: OnChain,
{
	pub fn new(crypto: Arc<C>, chain: Arc<O>, transport: TransportHandle, config: DispatcherConfig) -> Self {
		Self { crypto, chain, transport, config }
	}

	/// Drive one event to completion. Contract sends and transport sends
	/// retry indefinitely on failure, per the error-handling design: the
	/// dispatcher has no way to know whether a failure is transient, so it
	/// relies on the FSM's own timeouts to eventually give up (a lock
	/// expiring, a route being abandoned) rather than capping attempts here.
	pub async fn dispatch(&self, event: Event) {
		match &event {
			Event::ContractSendChannelClose(e) => {
				let id = e.canonical_identifier.clone();
				retry(&self.config, || self.chain.close_channel(id.channel_identifier, id.token_address)).await;
			},
			Event::ContractSendWithdraw(e) => {
				let id = e.canonical_identifier.clone();
				retry(&self.config, || {
					self.chain.withdraw(id.channel_identifier, e.secret.clone(), e.secret_hash)
				})
				.await;
			},
			Event::ContractSendSecretReveal(e) => {
				retry(&self.config, || self.chain.register_secret(e.secret.clone())).await;
			},
			Event::EventTransferFailed(e) => {
				warn!(payment_identifier = ?e.payment_identifier, reason = %e.reason, "payment failed");
			},
			Event::EventPaymentSentSuccess(e) => {
				tracing::info!(payment_identifier = ?e.payment_identifier, target = ?e.target, "payment sent");
			},
			Event::EventTransferReceivedSuccess(e) => {
				tracing::info!(payment_identifier = ?e.payment_identifier, initiator = ?e.initiator, "payment received");
			},
			Event::EventWithdrawSuccess(e) => {
				tracing::info!(secret_hash = ?e.secret_hash, "withdraw succeeded");
			},
			Event::EventWithdrawFailed(e) => {
				warn!(secret_hash = ?e.secret_hash, reason = %e.reason, "withdraw failed");
			},
			Event::ErrorByzantineBehavior(e) => {
				warn!(sender = ?e.sender, reason = %e.reason, "byzantine behavior observed");
			},
			_ => self.dispatch_message(event).await,
		}
	}

	async fn dispatch_message(&self, event: Event) {
		let our_address = self.crypto.address();
		let recipient = match event_recipient(&event) {
			Some(recipient) => recipient,
			None => return,
		};
		let mut message = match from_event(&event, our_address) {
			Some(message) => message,
			None => return,
		};
		message.sign(&*self.crypto);
		let bytes = match message.encode() {
			Ok(bytes) => bytes,
			Err(error) => {
				error!(%error, "failed to encode outbound message");
				return
			},
		};

		retry(&self.config, || self.transport.send(recipient, bytes.clone())).await;
	}
}
