//! Absorbing-state setup and end-of-pass perimeter wiring (spec.md S4.3,
//! S4.5, grounded on `setUpAbsorbingState` and
//! `connectTerminalStatesToAbsorbing`).

use crate::bookkeeper::{ProbabilityState, StateIndexArray};
use crate::error::{EngineError, EngineResult};
use crate::generator::Generator;
use crate::state::{StateId, StateIdMap, VariableInformation};
use crate::transition::TransitionStage;

/// Registers the synthetic absorbing state as the very first entry in
/// `state_map`, guaranteeing it lands on id 0 (spec.md S3, S8 invariant
/// "id(absorbing) = 0 and no other state maps to 0"). Stages its permanent
/// unit self-loop once; `TransitionStage` buckets persist across passes, so
/// this edge survives every later flush without being touched again.
pub fn setup(
	vars: &VariableInformation,
	state_map: &mut StateIdMap,
	bookkeeper: &mut StateIndexArray,
	stage: &mut TransitionStage,
) -> EngineResult<StateId> {
	let mut absorbing_state = vars.blank_state();
	vars.set_absorbing(&mut absorbing_state);
	let (id, fresh) = state_map.find_or_insert(absorbing_state);
	if !fresh || id != StateId::ABSORBING {
		return Err(EngineError::Inconsistent(
			"absorbing state did not land on id 0; state map was not empty at setup".into(),
		));
	}

	let mut record = ProbabilityState::new(id, 0);
	record.terminal = false;
	record.pi = 0.0;
	bookkeeper.insert_new(id, record);

	// Mass that enters the absorbing state never leaves (spec.md S8
	// invariant "the absorbing state has exactly one outgoing edge: (0, 0,
	// 1)").
	stage.set_outgoing(id, vec![(id, 1.0)]);

	Ok(id)
}

/// Wires every carry-over state still sitting in the terminal queue to its
/// real end-of-pass behavior (spec.md S4.5, grounded on
/// `connectTerminalStatesToAbsorbing`). The generator is asked for the
/// state's full behavior through the terminal callback: successors already
/// known to `state_map` get a direct edge at their real rate, and every
/// other successor's rate is folded into a single edge to the absorbing
/// state, preserving the state's true total exit rate rather than
/// fabricating a unit placeholder.
///
/// A carry-over id that isn't actually eligible (already re-expanded for
/// real this pass, or never marked as put into the terminal queue) is left
/// untouched.
pub fn connect_perimeter<G: Generator>(
	stage: &mut TransitionStage,
	bookkeeper: &mut StateIndexArray,
	state_map: &StateIdMap,
	generator: &G,
	carry_over: &[StateId],
) -> EngineResult<()> {
	for &id in carry_over {
		let eligible = bookkeeper
			.get(id)
			.map(|s| s.terminal && s.was_put_in_terminal_queue)
			.unwrap_or(false);
		if !eligible {
			continue;
		}

		let compressed = state_map.state_of(id).clone();
		let behavior = generator.behavior_at(&compressed)?;
		if behavior.is_deadlock() {
			stage.set_outgoing(id, vec![(id, 1.0)]);
		} else {
			if !behavior.is_deterministic() {
				return Err(EngineError::Inconsistent(format!(
					"perimeter state {id} has {} nondeterministic choices; this engine only supports CTMC semantics",
					behavior.choices.len()
				)));
			}

			let distribution = &behavior.choices[0];
			let total_rate: f64 = distribution.iter().map(|c| c.rate).sum();
			if total_rate <= 0.0 {
				return Err(EngineError::Numeric(format!(
					"perimeter state {id} has non-positive total outgoing rate"
				)));
			}

			let mut edges = Vec::with_capacity(distribution.len() + 1);
			let mut rate_to_absorbing = 0.0;
			for choice in distribution {
				match state_map.get(&choice.successor) {
					Some(succ_id) => edges.push((succ_id, choice.rate)),
					None => rate_to_absorbing += choice.rate,
				}
			}
			edges.push((StateId::ABSORBING, rate_to_absorbing));
			stage.set_outgoing(id, edges);
		}

		if let Some(record) = bookkeeper.get_mut(id) {
			record.terminal = false;
			record.was_put_in_terminal_queue = false;
		}
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::generator::coin_flip_chain;

	#[test]
	fn setup_puts_absorbing_at_id_zero() {
		let vars = VariableInformation::new();
		let mut map = StateIdMap::new();
		let mut bk = StateIndexArray::new();
		let mut stage = TransitionStage::new();
		let id = setup(&vars, &mut map, &mut bk, &mut stage).unwrap();
		assert_eq!(id, StateId::ABSORBING);
		assert_eq!(map.len(), 1);
		assert_eq!(stage.outgoing_of(id), &[(StateId::ABSORBING, 1.0)]);
	}

	#[test]
	fn setup_rejects_a_non_empty_state_map() {
		let vars = VariableInformation::new();
		let mut map = StateIdMap::new();
		map.find_or_insert(vars.blank_state());
		let mut bk = StateIndexArray::new();
		let mut stage = TransitionStage::new();
		let err = setup(&vars, &mut map, &mut bk, &mut stage).unwrap_err();
		assert!(matches!(err, EngineError::Inconsistent(_)));
	}

	/// spec.md S8 conservation of mass: a carry-over state with total exit
	/// rate 2.0 (one known successor, one not-yet-discovered successor)
	/// keeps that total rate after perimeter wiring instead of collapsing to
	/// a unit placeholder edge.
	#[test]
	fn perimeter_wiring_preserves_the_real_total_rate() {
		let gen = coin_flip_chain(12, 4);
		let mut state_map = StateIdMap::new();
		let mut bookkeeper = StateIndexArray::new();
		let mut stage = TransitionStage::new();

		let depth0 = gen.initial_states().remove(0);
		let (a_id, _) = state_map.find_or_insert(depth0);
		let mut record = ProbabilityState::new(a_id, 0);
		record.was_put_in_terminal_queue = true;
		bookkeeper.insert_new(a_id, record);

		let behavior = gen.behavior_at(state_map.state_of(a_id)).unwrap();
		let done_successor = behavior.choices[0]
			.iter()
			.find(|c| c.successor != *state_map.state_of(a_id))
			.unwrap()
			.successor
			.clone();
		state_map.find_or_insert(done_successor.clone());

		connect_perimeter(&mut stage, &mut bookkeeper, &state_map, &gen, &[a_id]).unwrap();

		let edges = stage.outgoing_of(a_id);
		let total: f64 = edges.iter().map(|(_, rate)| rate).sum();
		assert!((total - 2.0).abs() < 1e-12, "expected total exit rate 2.0, got {total}");

		let known_id = state_map.get(&done_successor).unwrap();
		let direct: f64 = edges.iter().filter(|(dst, _)| *dst == known_id).map(|(_, r)| r).sum();
		assert!((direct - 1.0).abs() < 1e-12);
		let to_absorbing: f64 = edges.iter().filter(|(dst, _)| *dst == StateId::ABSORBING).map(|(_, r)| r).sum();
		assert!((to_absorbing - 1.0).abs() < 1e-12);

		assert!(!bookkeeper.get(a_id).unwrap().terminal);
		assert!(!bookkeeper.get(a_id).unwrap().was_put_in_terminal_queue);
	}

	#[test]
	fn perimeter_wiring_skips_states_not_marked_eligible() {
		let gen = coin_flip_chain(12, 4);
		let mut state_map = StateIdMap::new();
		let mut bookkeeper = StateIndexArray::new();
		let mut stage = TransitionStage::new();

		let depth0 = gen.initial_states().remove(0);
		let (a_id, _) = state_map.find_or_insert(depth0);
		// terminal, but never actually put in the terminal queue: already
		// re-expanded for real this pass, so its staged edges must survive.
		bookkeeper.insert_new(a_id, ProbabilityState::new(a_id, 0));
		stage.set_outgoing(a_id, vec![(StateId::from_index(9), 2.0)]);

		connect_perimeter(&mut stage, &mut bookkeeper, &state_map, &gen, &[a_id]).unwrap();

		assert_eq!(stage.outgoing_of(a_id), &[(StateId::from_index(9), 2.0)]);
	}
}
