use thiserror::Error;

/// Any failure here is, per the error-handling design, fatal: the process
/// cannot guarantee safety without durable state, so the caller halts the
/// dispatcher and exits non-zero rather than continuing on unknown ground.
#[derive(Debug, Error)]
pub enum StoreError {
	#[error("sqlite error: {0}")]
	Sqlite(#[from] rusqlite::Error),

	#[error("snapshot (de)serialization error: {0}")]
	Serde(#[from] serde_json::Error),

	#[error("no channel found for identifier {0}")]
	ChannelNotFound(String),

	#[error("no payment state found for secret hash {0}")]
	PaymentNotFound(String),
}
