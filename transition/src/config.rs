use std::time::Duration;

use waypoint_primitives::constants::{
	DEFAULT_RETRIES_BEFORE_BACKOFF,
	DEFAULT_RETRY_INTERVAL,
};

/// Retry cadence for the event dispatcher's outbound sends and on-chain
/// calls: fixed-interval retries up to `retries_before_backoff`, then the
/// interval doubles (capped at `retry_interval_max`) on every further
/// attempt.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
	pub retry_interval: Duration,
	pub retries_before_backoff: u32,
	pub retry_interval_max: Duration,
}

impl Default for DispatcherConfig {
	fn default() -> Self {
		Self {
			retry_interval: Duration::from_secs(DEFAULT_RETRY_INTERVAL),
			retries_before_backoff: DEFAULT_RETRIES_BEFORE_BACKOFF,
			retry_interval_max: Duration::from_secs(60),
		}
	}
}

/// Tracks how long to wait before the next retry of one failed event.
pub(crate) struct Backoff {
	interval: Duration,
	attempts: u32,
	config: DispatcherConfig,
}

impl Backoff {
	pub(crate) fn new(config: DispatcherConfig) -> Self {
		let interval = config.retry_interval;
		Self { interval, attempts: 0, config }
	}

	/// The delay to sleep before the next attempt, advancing internal state.
	pub(crate) fn next_delay(&mut self) -> Duration {
		let delay = self.interval;
		self.attempts += 1;
		if self.attempts >= self.config.retries_before_backoff {
			self.interval = std::cmp::min(self.interval * 2, self.config.retry_interval_max);
		}
		delay
	}
}
