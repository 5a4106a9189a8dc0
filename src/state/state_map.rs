//! Content-addressed dedup map from `CompressedState` to dense `StateId`
//! (spec.md S4.1). This is the single-threaded form; the threaded variant
//! wraps the same map behind a `RwLock` (see `crate::threaded`).

use std::collections::HashMap;

use super::compressed::CompressedState;
use super::id::StateId;

#[derive(Debug, Default)]
pub struct StateIdMap {
	index: HashMap<CompressedState, StateId>,
	states: Vec<CompressedState>,
}

impl StateIdMap {
	pub fn new() -> Self {
		Self {
			index: HashMap::new(),
			states: Vec::new(),
		}
	}

	pub fn contains(&self, state: &CompressedState) -> bool {
		self.index.contains_key(state)
	}

	pub fn get(&self, state: &CompressedState) -> Option<StateId> {
		self.index.get(state).copied()
	}

	/// Looks up `state`; if absent, assigns it the next dense id and stores
	/// it. Returns `(id, true)` when a fresh id was assigned, `(id, false)`
	/// when the state was already known — mirroring
	/// `StaminaModelBuilder::getOrAddStateIndex`'s new/old return.
	pub fn find_or_insert(&mut self, state: CompressedState) -> (StateId, bool) {
		if let Some(&id) = self.index.get(&state) {
			return (id, false);
		}
		let id = StateId::from_index(self.states.len());
		self.states.push(state.clone());
		self.index.insert(state, id);
		(id, true)
	}

	pub fn state_of(&self, id: StateId) -> &CompressedState {
		&self.states[id.index()]
	}

	pub fn len(&self) -> usize {
		self.states.len()
	}

	pub fn is_empty(&self) -> bool {
		self.states.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = (StateId, &CompressedState)> {
		self.states
			.iter()
			.enumerate()
			.map(|(i, s)| (StateId::from_index(i), s))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn first_insert_is_new_second_is_not() {
		let mut map = StateIdMap::new();
		let s = CompressedState::new(8);
		let (id1, fresh1) = map.find_or_insert(s.clone());
		let (id2, fresh2) = map.find_or_insert(s);
		assert!(fresh1);
		assert!(!fresh2);
		assert_eq!(id1, id2);
	}

	#[test]
	fn distinct_states_get_distinct_dense_ids() {
		let mut map = StateIdMap::new();
		let mut a = CompressedState::new(8);
		let mut b = CompressedState::new(8);
		a.set_bits(0, 8, 1);
		b.set_bits(0, 8, 2);
		let (id_a, _) = map.find_or_insert(a);
		let (id_b, _) = map.find_or_insert(b);
		assert_ne!(id_a, id_b);
		assert_eq!(map.len(), 2);
	}

	#[test]
	fn state_of_reverses_find_or_insert() {
		let mut map = StateIdMap::new();
		let mut s = CompressedState::new(8);
		s.set_bits(0, 8, 42);
		let (id, _) = map.find_or_insert(s.clone());
		assert_eq!(map.state_of(id), &s);
	}
}
