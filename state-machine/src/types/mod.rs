mod event;
mod state;
mod state_change;

pub use event::*;
use rand_chacha::{
	rand_core::{
		RngCore,
		SeedableRng,
	},
	ChaChaRng,
};
use serde::{
	Deserialize,
	Serialize,
};
pub use state::*;
pub use state_change::*;
pub use waypoint_primitives::types::*;

/// The node's pseudo-random message-identifier generator. Seeded explicitly
/// so that replaying the same state-change log reproduces the same message
/// identifiers (property P6, dispatcher determinism).
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct Random(ChaChaRng);

impl Random {
	pub fn new(seed: u64) -> Self {
		Self(ChaChaRng::seed_from_u64(seed))
	}

	pub fn next(&mut self) -> MessageIdentifier {
		self.0.next_u64()
	}
}

impl Default for Random {
	fn default() -> Self {
		Self::new(0)
	}
}
