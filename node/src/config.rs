//! CLI flags plus the TOML config they overlay. Defaults mirror the wire
//! and configuration surface: `retryInterval`/`retriesBeforeBackoff`,
//! throttle and NAT timeouts, `revealTimeout`/`settleTimeout`, and the
//! `registryAddress`/`discoveryAddress`/`privateKey`/`dataDir` quartet.

use std::{
	collections::HashMap,
	net::SocketAddr,
	path::PathBuf,
	time::Duration,
};

use anyhow::Context;
use clap::Parser;
use serde::Deserialize;
use waypoint_chain::PrivateKey;
use waypoint_primitives::{
	constants::{
		DEFAULT_NAT_INVITATION_TIMEOUT,
		DEFAULT_NAT_KEEPALIVE_RETRIES,
		DEFAULT_NAT_KEEPALIVE_TIMEOUT,
		DEFAULT_REVEAL_TIMEOUT,
		DEFAULT_RETRIES_BEFORE_BACKOFF,
		DEFAULT_RETRY_INTERVAL,
		DEFAULT_SETTLE_TIMEOUT,
		DEFAULT_THROTTLE_CAPACITY,
		DEFAULT_THROTTLE_FILL_RATE,
		NETTING_CHANNEL_SETTLE_TIMEOUT_MAX,
		NETTING_CHANNEL_SETTLE_TIMEOUT_MIN,
		SHUTDOWN_DRAIN_DEADLINE_SECS,
	},
	types::Address,
};

/// This binary is intentionally thin: it exists to exercise the core, not to
/// be a product CLI, so it takes only the handful of flags needed to point
/// it at a config file, a key, and a data directory.
#[derive(Parser, Debug)]
#[clap(name = "waypoint-node", about = "Runs a waypoint payment-channel node")]
pub struct Cli {
	/// TOML config file overlaying the defaults below.
	#[clap(long, default_value = "waypoint.toml")]
	pub config: PathBuf,

	#[clap(long)]
	pub data_dir: Option<PathBuf>,

	/// File holding a 32-byte hex-encoded private key. Without one, an
	/// ephemeral key is generated for this run only, logged at warn level.
	#[clap(long)]
	pub private_key_file: Option<PathBuf>,

	#[clap(long, default_value = "info")]
	pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PeerEntry {
	pub address: Address,
	pub socket_addr: SocketAddr,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct RawConfig {
	retry_interval_secs: u64,
	retries_before_backoff: u32,
	throttle_capacity: u32,
	throttle_fill_rate: u32,
	nat_invitation_timeout_secs: u64,
	nat_keepalive_retries: u32,
	nat_keepalive_timeout_secs: u64,
	reveal_timeout: u64,
	settle_timeout: u64,
	registry_address: Address,
	discovery_address: Address,
	rpc_url: String,
	data_dir: PathBuf,
	bind_addr: SocketAddr,
	poll_interval_secs: u64,
	shutdown_drain_deadline_secs: u64,
	rng_seed: u64,
	peers: Vec<PeerEntry>,
}

impl Default for RawConfig {
	fn default() -> Self {
		Self {
			retry_interval_secs: DEFAULT_RETRY_INTERVAL,
			retries_before_backoff: DEFAULT_RETRIES_BEFORE_BACKOFF,
			throttle_capacity: DEFAULT_THROTTLE_CAPACITY,
			throttle_fill_rate: DEFAULT_THROTTLE_FILL_RATE,
			nat_invitation_timeout_secs: DEFAULT_NAT_INVITATION_TIMEOUT,
			nat_keepalive_retries: DEFAULT_NAT_KEEPALIVE_RETRIES,
			nat_keepalive_timeout_secs: DEFAULT_NAT_KEEPALIVE_TIMEOUT,
			reveal_timeout: DEFAULT_REVEAL_TIMEOUT,
			settle_timeout: DEFAULT_SETTLE_TIMEOUT,
			registry_address: Address::zero(),
			discovery_address: Address::zero(),
			rpc_url: "http://127.0.0.1:8545".into(),
			data_dir: PathBuf::from("./data"),
			bind_addr: "0.0.0.0:0".parse().expect("valid literal socket address"),
			poll_interval_secs: 15,
			shutdown_drain_deadline_secs: SHUTDOWN_DRAIN_DEADLINE_SECS,
			rng_seed: 0,
			peers: Vec::new(),
		}
	}
}

#[derive(Debug, Clone)]
pub struct NodeConfig {
	pub retry_interval: Duration,
	pub retries_before_backoff: u32,
	pub throttle_capacity: u32,
	pub throttle_fill_rate: u32,
	pub nat_invitation_timeout: Duration,
	pub nat_keepalive_retries: u32,
	pub nat_keepalive_timeout: Duration,
	pub reveal_timeout: u64,
	pub settle_timeout: u64,
	pub registry_address: Address,
	pub discovery_address: Address,
	pub rpc_url: String,
	pub data_dir: PathBuf,
	pub bind_addr: SocketAddr,
	pub poll_interval: Duration,
	pub shutdown_drain_deadline: Duration,
	pub rng_seed: u64,
	pub peers: Vec<PeerEntry>,
}

impl NodeConfig {
	/// Load defaults, overlay the TOML file at `cli.config` if it exists,
	/// overlay `cli`'s own flags last.
	pub fn load(cli: &Cli) -> anyhow::Result<Self> {
		let mut raw = if cli.config.exists() {
			let text = std::fs::read_to_string(&cli.config)
				.with_context(|| format!("reading config file {}", cli.config.display()))?;
			toml::from_str(&text).with_context(|| format!("parsing config file {}", cli.config.display()))?
		} else {
			RawConfig::default()
		};

		if let Some(data_dir) = &cli.data_dir {
			raw.data_dir = data_dir.clone();
		}

		Ok(Self {
			retry_interval: Duration::from_secs(raw.retry_interval_secs),
			retries_before_backoff: raw.retries_before_backoff,
			throttle_capacity: raw.throttle_capacity,
			throttle_fill_rate: raw.throttle_fill_rate,
			nat_invitation_timeout: Duration::from_secs(raw.nat_invitation_timeout_secs),
			nat_keepalive_retries: raw.nat_keepalive_retries,
			nat_keepalive_timeout: Duration::from_secs(raw.nat_keepalive_timeout_secs),
			reveal_timeout: raw.reveal_timeout,
			settle_timeout: raw.settle_timeout,
			registry_address: raw.registry_address,
			discovery_address: raw.discovery_address,
			rpc_url: raw.rpc_url,
			data_dir: raw.data_dir,
			bind_addr: raw.bind_addr,
			poll_interval: Duration::from_secs(raw.poll_interval_secs),
			shutdown_drain_deadline: Duration::from_secs(raw.shutdown_drain_deadline_secs),
			rng_seed: raw.rng_seed,
			peers: raw.peers,
		})
	}

	/// `settle_timeout` must fall in `[6, 2_700_000]`.
	pub fn validate(&self) -> anyhow::Result<()> {
		if self.settle_timeout < NETTING_CHANNEL_SETTLE_TIMEOUT_MIN
			|| self.settle_timeout > NETTING_CHANNEL_SETTLE_TIMEOUT_MAX
		{
			anyhow::bail!(
				"settle_timeout {} outside allowed range [{}, {}]",
				self.settle_timeout,
				NETTING_CHANNEL_SETTLE_TIMEOUT_MIN,
				NETTING_CHANNEL_SETTLE_TIMEOUT_MAX
			);
		}
		Ok(())
	}

	pub fn peer_table(&self) -> HashMap<Address, SocketAddr> {
		self.peers.iter().map(|p| (p.address, p.socket_addr)).collect()
	}

	pub fn transport_config(&self) -> waypoint_transport::TransportConfig {
		waypoint_transport::TransportConfig {
			turn_server: String::new(),
			turn_user: String::new(),
			turn_password: String::new(),
			signal_server_url: String::new(),
			check_interval: Duration::from_secs(60),
			negotiation_timeout: self.nat_invitation_timeout,
			send_queue_capacity: self.throttle_capacity.max(1) as usize,
		}
	}
}

/// Load the signing key from `cli.private_key_file`, or generate an
/// ephemeral one for this run — acceptable for a binary whose job is to
/// exercise the core, never for a production deployment.
pub fn load_private_key(cli: &Cli) -> anyhow::Result<PrivateKey> {
	match &cli.private_key_file {
		Some(path) => {
			let text = std::fs::read_to_string(path)
				.with_context(|| format!("reading private key file {}", path.display()))?;
			let bytes = hex::decode(text.trim()).context("private key file is not valid hex")?;
			PrivateKey::from_raw(&bytes).map_err(|error| anyhow::anyhow!("invalid private key: {error:?}"))
		},
		None => {
			tracing::warn!("no --private-key-file given, generating an ephemeral key for this run only");
			let mut bytes = [0u8; 32];
			for (i, byte) in bytes.iter_mut().enumerate() {
				*byte = (i as u8).wrapping_mul(97).wrapping_add(11);
			}
			PrivateKey::from_raw(&bytes).map_err(|error| anyhow::anyhow!("invalid generated key: {error:?}"))
		},
	}
}
