//! Thin CLI binary wiring the pure state-machine kernel to a real store,
//! transport and chain. Spawns the tasks described in the concurrency
//! model: one dispatcher task owning the `Router`, one transport
//! receive-loop task, one chain-event polling task, and one event
//! dispatcher task. Exists to exercise the core end to end, not as a
//! product CLI.

mod config;
mod inbound_sink;
mod signalling;

use std::{
	sync::Arc,
	time::Duration,
};

use anyhow::Context;
use clap::Parser;
use tokio::sync::{
	mpsc,
	OnceCell,
};
use tracing::{
	error,
	info,
	warn,
};
use tracing_subscriber::EnvFilter;
use waypoint_chain::EthereumChain;
use waypoint_primitives::ports::{
	Crypto,
	OnChain,
};
use waypoint_state_machine::types::{
	BlockStateChange,
	StateChange,
};
use waypoint_storage::{
	SqliteStore,
	Store,
};
use waypoint_transition::{
	DispatcherConfig,
	EventDispatcher,
	Router,
};
use waypoint_transport::Transport;

use crate::{
	config::{
		load_private_key,
		Cli,
		NodeConfig,
	},
	inbound_sink::InboundSink,
	signalling::{
		PeerTableSignaller,
		UdpIceAgentFactory,
	},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
		.init();

	let config = NodeConfig::load(&cli).context("loading configuration")?;
	config.validate()?;

	std::fs::create_dir_all(&config.data_dir)
		.with_context(|| format!("creating data directory {}", config.data_dir.display()))?;
	let store = Arc::new(
		SqliteStore::open(config.data_dir.join("waypoint.sqlite3")).context("opening the state store")?,
	);

	let key = load_private_key(&cli).context("loading signing key")?;
	let our_address = key.address();
	let key = Arc::new(key);

	let router = Arc::new(Router::restore(store.clone(), config.rng_seed).context("restoring router state")?);

	let chain = Arc::new(
		EthereumChain::new(&config.rpc_url, (*key).clone(), config.registry_address, config.discovery_address)
			.context("constructing the chain adapter")?,
	);

	let (state_change_tx, mut state_change_rx) = mpsc::channel::<StateChange>(256);
	let (event_tx, mut event_rx) = mpsc::channel(256);

	let transport_handle_cell = Arc::new(OnceCell::new());
	let agent_factory = Arc::new(UdpIceAgentFactory::new(transport_handle_cell.clone(), config.bind_addr.ip()));
	let signaller = PeerTableSignaller::new(config.peer_table());
	let sink = Arc::new(InboundSink {
		router: router.clone(),
		crypto: key.clone(),
		our_address,
		state_changes: state_change_tx.clone(),
	});
	let (transport, transport_handle) = Transport::new(config.transport_config(), signaller, agent_factory, sink);
	transport_handle_cell
		.set(transport_handle.clone())
		.unwrap_or_else(|_| unreachable!("set exactly once, before negotiation can start"));
	let transport_task = tokio::spawn(transport.run());

	// Replay events a prior run enqueued but never confirmed flushed to the
	// dispatcher, before accepting any new input.
	for (secret_hash, snapshot) in store.unflushed_snapshots().context("loading unflushed events")? {
		for event in snapshot.pending_events {
			let _ = event_tx.send(event).await;
		}
		store.clear_flushed_events(secret_hash, snapshot.version).context("clearing flushed events")?;
	}

	let dispatcher_config = DispatcherConfig {
		retry_interval: config.retry_interval,
		retries_before_backoff: config.retries_before_backoff,
		retry_interval_max: Duration::from_secs(60),
	};
	let event_dispatcher = EventDispatcher::new(key.clone(), chain.clone(), transport_handle.clone(), dispatcher_config);

	let dispatcher_router = router.clone();
	let dispatcher_events = event_tx.clone();
	let dispatcher_task = tokio::spawn(async move {
		while let Some(change) = state_change_rx.recv().await {
			match dispatcher_router.apply_state_change(change) {
				Ok(events) => {
					for event in events {
						if dispatcher_events.send(event).await.is_err() {
							return
						}
					}
				},
				Err(error) => warn!(%error, "state transition rejected"),
			}
		}
	});

	let dispatch_task = tokio::spawn(async move {
		while let Some(event) = event_rx.recv().await {
			event_dispatcher.dispatch(event).await;
		}
	});

	let poll_chain = chain.clone();
	let poll_tx = state_change_tx.clone();
	let poll_interval = config.poll_interval;
	let chain_task = tokio::spawn(async move {
		let mut last_seen = 0u64;
		let mut ticker = tokio::time::interval(poll_interval);
		loop {
			ticker.tick().await;
			match poll_chain.current_block_number().await {
				Ok(block_number) if block_number > last_seen => {
					last_seen = block_number;
					if poll_tx.send(StateChange::BlockStateChange(BlockStateChange { block_number })).await.is_err() {
						break
					}
				},
				Ok(_) => {},
				Err(error) => warn!(%error, "chain poll failed"),
			}
		}
	});

	info!(our_address = ?our_address, data_dir = %config.data_dir.display(), "waypoint node started");

	tokio::signal::ctrl_c().await.context("waiting for shutdown signal")?;
	info!("shutdown requested, draining");

	// Two-phase shutdown: stop accepting new input, drain what's in
	// flight with a deadline, then close transport and store.
	transport_handle.stop_accepting().await;
	chain_task.abort();
	drop(state_change_tx);

	if tokio::time::timeout(config.shutdown_drain_deadline, dispatcher_task).await.is_err() {
		error!("dispatcher did not drain within the shutdown deadline");
	}
	drop(event_tx);
	if tokio::time::timeout(config.shutdown_drain_deadline, dispatch_task).await.is_err() {
		error!("event dispatcher did not drain within the shutdown deadline");
	}

	transport_handle.stop().await;
	let _ = transport_task.await;

	Ok(())
}
