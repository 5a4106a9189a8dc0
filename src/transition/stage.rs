//! Staging area for outgoing transitions before they are flushed into a
//! sparse matrix (spec.md S4.2, S5 "stage then flush").
//!
//! Unlike the reference builder, which can write transitions straight into
//! the sparse matrix as they're discovered, every pass here rebuilds the
//! matrix from scratch (spec.md S4.6), so the stage only needs to hold the
//! *current* pass's edges. A state's outgoing bucket is replaced, not
//! appended to, when re-expansion happens after a later pass: the perimeter
//! wiring that aggregated a state's residual rate into the absorbing state
//! must not survive alongside the real transitions found once that state
//! gets expanded for real.

use crate::state::StateId;

#[derive(Debug, Default)]
pub struct TransitionStage {
	buckets: Vec<Option<Vec<(StateId, f64)>>>,
}

impl TransitionStage {
	pub fn new() -> Self {
		Self { buckets: Vec::new() }
	}

	fn ensure_len(&mut self, len: usize) {
		if self.buckets.len() < len {
			self.buckets.resize_with(len, || None);
		}
	}

	/// Replaces `src`'s entire outgoing edge set with `edges`. This is the
	/// only way to populate a bucket: there is no append entry point, so a
	/// caller that wants to add a perimeter edge to existing real edges must
	/// read the current bucket first via `outgoing_of`.
	pub fn set_outgoing(&mut self, src: StateId, edges: Vec<(StateId, f64)>) {
		self.ensure_len(src.index() + 1);
		self.buckets[src.index()] = Some(edges);
	}

	pub fn outgoing_of(&self, src: StateId) -> &[(StateId, f64)] {
		self.buckets
			.get(src.index())
			.and_then(|b| b.as_ref())
			.map(Vec::as_slice)
			.unwrap_or(&[])
	}

	pub fn has_outgoing(&self, src: StateId) -> bool {
		self.buckets
			.get(src.index())
			.map(|b| b.is_some())
			.unwrap_or(false)
	}

	pub fn sources(&self) -> impl Iterator<Item = StateId> + '_ {
		self.buckets
			.iter()
			.enumerate()
			.filter(|(_, b)| b.is_some())
			.map(|(i, _)| StateId::from_index(i))
	}

	pub fn clear(&mut self) {
		self.buckets.clear();
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn set_outgoing_replaces_rather_than_appends() {
		let mut stage = TransitionStage::new();
		let src = StateId::from_index(2);
		stage.set_outgoing(src, vec![(StateId::ABSORBING, 0.5)]);
		assert_eq!(stage.outgoing_of(src), &[(StateId::ABSORBING, 0.5)]);

		stage.set_outgoing(src, vec![(StateId::from_index(3), 0.4), (StateId::from_index(4), 0.1)]);
		assert_eq!(
			stage.outgoing_of(src),
			&[(StateId::from_index(3), 0.4), (StateId::from_index(4), 0.1)]
		);
	}

	#[test]
	fn unpopulated_bucket_is_empty_slice() {
		let stage = TransitionStage::new();
		assert!(stage.outgoing_of(StateId::from_index(7)).is_empty());
		assert!(!stage.has_outgoing(StateId::from_index(7)));
	}

	#[test]
	fn sources_enumerates_only_populated_buckets() {
		let mut stage = TransitionStage::new();
		stage.set_outgoing(StateId::from_index(0), vec![(StateId::from_index(1), 1.0)]);
		stage.set_outgoing(StateId::from_index(5), vec![(StateId::from_index(1), 1.0)]);
		let sources: Vec<_> = stage.sources().collect();
		assert_eq!(sources, vec![StateId::from_index(0), StateId::from_index(5)]);
	}
}
