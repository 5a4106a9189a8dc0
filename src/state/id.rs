/// A dense, permanent index assigned in order of first discovery.
///
/// Id `0` is reserved for the synthetic absorbing state (spec.md S3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StateId(pub u32);

impl StateId {
	pub const ABSORBING: StateId = StateId(0);

	pub fn index(self) -> usize {
		self.0 as usize
	}

	pub fn from_index(index: usize) -> Self {
		StateId(index as u32)
	}
}

impl std::fmt::Display for StateId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "#{}", self.0)
	}
}
