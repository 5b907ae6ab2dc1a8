use thiserror::Error;

#[derive(Debug, Error)]
pub enum MessageError {
	#[error("message truncated while reading {0}")]
	Truncated(&'static str),

	#[error("unknown message discriminator {0}")]
	UnknownDiscriminator(u8),

	#[error("encoded message of {0} bytes exceeds the {1}-byte limit")]
	TooLarge(usize, usize),

	#[error("message is unsigned")]
	Unsigned,

	#[error("recovered signer {recovered:x} does not match declared sender {declared:x}")]
	SignerMismatch { recovered: waypoint_primitives::types::Address, declared: waypoint_primitives::types::Address },
}
