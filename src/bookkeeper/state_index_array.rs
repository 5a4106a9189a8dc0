//! Block-pool arena holding one `ProbabilityState` per dense `StateId`
//! (spec.md S3). Indexing by `StateId` rather than keeping the records
//! behind a hash map keeps per-state lookups O(1) without the pointer
//! churn the original's `std::shared_ptr`-per-state scheme carried.

use crate::bookkeeper::probability_state::ProbabilityState;
use crate::state::StateId;

const BLOCK_SIZE: usize = 4096;

#[derive(Debug, Default)]
pub struct StateIndexArray {
	blocks: Vec<Vec<Option<ProbabilityState>>>,
}

impl StateIndexArray {
	pub fn new() -> Self {
		Self { blocks: Vec::new() }
	}

	fn block_and_offset(index: usize) -> (usize, usize) {
		(index / BLOCK_SIZE, index % BLOCK_SIZE)
	}

	fn ensure_block(&mut self, block: usize) {
		while self.blocks.len() <= block {
			let mut new_block = Vec::with_capacity(BLOCK_SIZE);
			new_block.resize_with(BLOCK_SIZE, || None);
			self.blocks.push(new_block);
		}
	}

	/// Inserts a freshly allocated `ProbabilityState` for `id`. Panics if
	/// `id` was already populated: callers only reach this path right after
	/// `StateIdMap::find_or_insert` reports a fresh id.
	pub fn insert_new(&mut self, id: StateId, state: ProbabilityState) {
		let (block, offset) = Self::block_and_offset(id.index());
		self.ensure_block(block);
		let slot = &mut self.blocks[block][offset];
		debug_assert!(slot.is_none(), "state id already populated");
		*slot = Some(state);
	}

	pub fn get(&self, id: StateId) -> Option<&ProbabilityState> {
		let (block, offset) = Self::block_and_offset(id.index());
		self.blocks.get(block)?.get(offset)?.as_ref()
	}

	pub fn get_mut(&mut self, id: StateId) -> Option<&mut ProbabilityState> {
		let (block, offset) = Self::block_and_offset(id.index());
		self.blocks.get_mut(block)?.get_mut(offset)?.as_mut()
	}

	pub fn len(&self) -> usize {
		self.blocks
			.iter()
			.flatten()
			.filter(|s| s.is_some())
			.count()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn iter(&self) -> impl Iterator<Item = &ProbabilityState> {
		self.blocks.iter().flatten().filter_map(|s| s.as_ref())
	}

	pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ProbabilityState> {
		self.blocks.iter_mut().flatten().filter_map(|s| s.as_mut())
	}

	/// States still awaiting real expansion (spec.md S4.2). Perimeter wiring
	/// and the termination estimator both iterate exactly this set.
	pub fn perimeter_states(&self) -> Vec<StateId> {
		self.iter().filter(|s| s.terminal).map(|s| s.index).collect()
	}

	pub fn count_terminal(&self) -> usize {
		self.iter().filter(|s| s.terminal).count()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn insert_and_get_across_block_boundary() {
		let mut arr = StateIndexArray::new();
		let id = StateId::from_index(BLOCK_SIZE + 5);
		arr.insert_new(id, ProbabilityState::new(id, 0));
		assert!(arr.get(id).is_some());
		assert_eq!(arr.get(id).unwrap().index, id);
	}

	#[test]
	fn get_on_unpopulated_id_is_none() {
		let arr = StateIndexArray::new();
		assert!(arr.get(StateId::from_index(100)).is_none());
	}

	#[test]
	fn len_counts_populated_slots_only() {
		let mut arr = StateIndexArray::new();
		arr.insert_new(StateId::from_index(0), ProbabilityState::new(StateId::from_index(0), 0));
		arr.insert_new(StateId::from_index(10), ProbabilityState::new(StateId::from_index(10), 0));
		assert_eq!(arr.len(), 2);
	}

	#[test]
	fn perimeter_states_and_count_terminal_agree() {
		let mut arr = StateIndexArray::new();
		let terminal = StateId::from_index(0);
		let expanded = StateId::from_index(1);
		arr.insert_new(terminal, ProbabilityState::new(terminal, 0));
		let mut done = ProbabilityState::new(expanded, 0);
		done.terminal = false;
		arr.insert_new(expanded, done);

		assert_eq!(arr.perimeter_states(), vec![terminal]);
		assert_eq!(arr.count_terminal(), 1);
	}
}
