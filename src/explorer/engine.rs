//! Per-pass exploration: pulls states off the frontier, expands them
//! through the generator, applies the property short-circuit and κ-based
//! truncation, and stages the resulting transitions (spec.md S4.4-S4.6,
//! grounded on `StaminaIterativeModelBuilder::buildModelComponents`).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::bookkeeper::{ProbabilityState, StateIndexArray};
use crate::error::{EngineError, EngineResult};
use crate::generator::Generator;
use crate::logging::{debug_message, message};
use crate::property::{is_short_circuited, Property};
use crate::state::{StateId, StateIdMap, VariableInformation};
use crate::transition::{self, GeneratorMatrix, TransitionStage};

use super::absorbing;
use super::config::Config;
use super::frontier::Frontier;

pub struct Explorer<'g, G: Generator> {
	generator: &'g G,
	state_map: StateIdMap,
	bookkeeper: StateIndexArray,
	frontier: Frontier,
	stage: TransitionStage,
	iteration: u32,
	deadlocks: Vec<StateId>,
	initials: Vec<StateId>,
	cancel: Arc<AtomicBool>,
	last_termination_estimate: f64,
}

impl<'g, G: Generator> Explorer<'g, G> {
	pub fn new(generator: &'g G) -> EngineResult<Self> {
		let vars = generator.variable_information();
		let mut state_map = StateIdMap::new();
		let mut bookkeeper = StateIndexArray::new();
		let mut stage = TransitionStage::new();
		absorbing::setup(vars, &mut state_map, &mut bookkeeper, &mut stage)?;

		let initials = generator.initial_states();
		if initials.is_empty() {
			return Err(EngineError::TruncationArtifact(
				"generator returned no initial states".into(),
			));
		}

		let mut frontier = Frontier::new();
		let mut initial_ids = Vec::new();
		let share = 1.0 / initials.len() as f64;
		for init in initials {
			let (id, fresh) = state_map.find_or_insert(init);
			if fresh {
				let mut record = ProbabilityState::new(id, 0);
				record.pi = share;
				bookkeeper.insert_new(id, record);
			} else if let Some(record) = bookkeeper.get_mut(id) {
				record.add_to_pi(share);
			}
			frontier.push(id);
			initial_ids.push(id);
		}

		Ok(Self {
			generator,
			state_map,
			bookkeeper,
			frontier,
			stage,
			iteration: 0,
			deadlocks: Vec::new(),
			initials: initial_ids,
			cancel: Arc::new(AtomicBool::new(false)),
			last_termination_estimate: 0.0,
		})
	}

	/// Allows an external caller (e.g. a signal handler) to stop the run at
	/// the next frontier pop or pass boundary (spec.md S5, S7 `Aborted`).
	pub fn cancel_handle(&self) -> Arc<AtomicBool> {
		Arc::clone(&self.cancel)
	}

	pub fn state_count(&self) -> usize {
		self.state_map.len()
	}

	pub fn deadlocks(&self) -> &[StateId] {
		&self.deadlocks
	}

	pub fn variable_information(&self) -> &VariableInformation {
		self.generator.variable_information()
	}

	pub fn state_map(&self) -> &StateIdMap {
		&self.state_map
	}

	pub fn initials(&self) -> &[StateId] {
		&self.initials
	}

	/// Upper bound on the probability mass leaked to the absorbing state
	/// during the most recent pass, `|terminal| * kappa_local` measured at
	/// entry to perimeter wiring (spec.md S4.5). The refinement controller
	/// uses this alongside the solved window to decide how hard to shrink
	/// kappa for the next pass.
	pub fn last_termination_estimate(&self) -> f64 {
		self.last_termination_estimate
	}

	/// Runs one build pass: re-admits any carry-over state whose π has
	/// crossed `kappa`, expands the frontier until it drains, then wires
	/// the perimeter. Returns the dimension of the resulting matrix.
	pub fn build_pass(&mut self, kappa: f64, property: Option<&Property>, config: &Config) -> EngineResult<usize> {
		self.iteration += 1;
		let iteration = self.iteration;

		let bookkeeper = &mut self.bookkeeper;
		self.frontier.promote_carry_over(|id| {
			let admit = bookkeeper.get(id).map(|s| s.pi >= kappa).unwrap_or(false);
			if admit {
				if let Some(record) = bookkeeper.get_mut(id) {
					record.iteration_last_seen = iteration;
					record.was_put_in_terminal_queue = false;
				}
			}
			admit
		});

		let mut steps: u64 = 0;
		while let Some(id) = self.frontier.pop() {
			if self.cancel.load(Ordering::Relaxed) {
				self.frontier.push_carry_over(id);
				return Err(EngineError::Aborted(format!(
					"terminate signal received mid-pass: {} states committed, pass {iteration}",
					self.state_map.len()
				)));
			}
			if let Some(limit) = config.max_iterations {
				if steps >= limit {
					self.mark_carried_over(id);
					self.frontier.push_carry_over(id);
					break;
				}
			}
			steps += 1;
			self.expand(id, iteration, kappa, property, config)?;
		}

		if self.cancel.load(Ordering::Relaxed) {
			return Err(EngineError::Aborted(format!(
				"terminate signal received at end of pass {iteration}: {} states committed",
				self.state_map.len()
			)));
		}

		self.last_termination_estimate = self.bookkeeper.count_terminal() as f64 * kappa;

		let carry_over = self.frontier.carry_over().to_vec();
		absorbing::connect_perimeter(&mut self.stage, &mut self.bookkeeper, &self.state_map, self.generator, &carry_over)?;

		if !config.quiet {
			message!(
				"pass {iteration}: {} states committed, {} carried over, kappa={kappa:.3e}",
				self.state_map.len(),
				self.frontier.carry_over().len()
			);
		}

		Ok(self.state_map.len())
	}

	fn expand(
		&mut self,
		id: StateId,
		iteration: u32,
		kappa: f64,
		property: Option<&Property>,
		config: &Config,
	) -> EngineResult<()> {
		let compressed = self.state_map.state_of(id).clone();
		let src_pi = self
			.bookkeeper
			.get(id)
			.map(|s| s.pi)
			.ok_or_else(|| EngineError::Inconsistent(format!("state {id} missing from bookkeeper")))?;

		if config.preterminate {
			if let Some(prop) = property {
				let ctx = self.generator.variable_information().eval_context(&compressed);
				let left_holds = prop.left.eval(&ctx)?;
				let right_holds = prop.right.eval(&ctx)?;
				if is_short_circuited(prop, left_holds, right_holds) {
					self.stage.set_outgoing(id, vec![(id, 1.0)]);
					self.mark_expanded(id);
					return Ok(());
				}
			}
		}

		let behavior = self.generator.behavior_at(&compressed)?;
		if behavior.is_deadlock() {
			self.stage.set_outgoing(id, vec![(id, 1.0)]);
			self.mark_expanded(id);
			self.deadlocks.push(id);
			if let Some(record) = self.bookkeeper.get_mut(id) {
				record.deadlock = true;
			}
			return Ok(());
		}
		if !behavior.is_deterministic() {
			return Err(EngineError::Inconsistent(format!(
				"state {id} has {} nondeterministic choices; this engine only supports CTMC semantics",
				behavior.choices.len()
			)));
		}

		let distribution = &behavior.choices[0];
		let total_rate: f64 = distribution.iter().map(|c| c.rate).sum();
		if total_rate <= 0.0 {
			return Err(EngineError::Numeric(format!("state {id} has non-positive total outgoing rate")));
		}

		let mut edges = Vec::with_capacity(distribution.len());
		for choice in distribution {
			let (succ_id, fresh) = self.state_map.find_or_insert(choice.successor.clone());
			if fresh {
				self.bookkeeper.insert_new(succ_id, ProbabilityState::new(succ_id, 0));
			}

			let contribution = src_pi * (choice.rate / total_rate);
			let record = self
				.bookkeeper
				.get_mut(succ_id)
				.ok_or_else(|| EngineError::Inconsistent(format!("successor {succ_id} missing from bookkeeper")))?;
			record.add_to_pi(contribution);
			self.clamp_overshoot(succ_id, config)?;

			let still_terminal = self.bookkeeper.get(succ_id).map(|s| s.terminal).unwrap_or(false);
			let pi_now = self.bookkeeper.get(succ_id).map(|s| s.pi).unwrap_or(0.0);

			if still_terminal && pi_now < kappa {
				edges.push((StateId::ABSORBING, choice.rate));
				if fresh {
					self.mark_carried_over(succ_id);
					self.frontier.push_carry_over(succ_id);
				}
				continue;
			}

			edges.push((succ_id, choice.rate));
			if still_terminal && self.bookkeeper.get(succ_id).map(|s| s.iteration_last_seen != iteration).unwrap_or(true) {
				if let Some(record) = self.bookkeeper.get_mut(succ_id) {
					record.iteration_last_seen = iteration;
				}
				self.frontier.push(succ_id);
			}
		}

		self.stage.set_outgoing(id, edges);
		self.mark_expanded(id);
		Ok(())
	}

	fn mark_expanded(&mut self, id: StateId) {
		if let Some(record) = self.bookkeeper.get_mut(id) {
			record.terminal = false;
			record.is_new = false;
		}
	}

	/// Marks `id` as sitting in the terminal queue (spec.md S4.4.c): carried
	/// to the next pass without being expanded, and eligible for the
	/// generator-backed perimeter wiring in `connect_perimeter` if it's
	/// still there at the end of this one.
	fn mark_carried_over(&mut self, id: StateId) {
		if let Some(record) = self.bookkeeper.get_mut(id) {
			record.was_put_in_terminal_queue = true;
		}
	}

	fn clamp_overshoot(&mut self, id: StateId, config: &Config) -> EngineResult<()> {
		let tolerance = config.reachability_overshoot_tolerance;
		if let Some(record) = self.bookkeeper.get_mut(id) {
			if record.pi > 1.0 {
				if record.pi - 1.0 > tolerance {
					return Err(EngineError::Numeric(format!(
						"reachability estimate for {id} overshot 1.0 by more than tolerance: {}",
						record.pi
					)));
				}
				debug_message!("clamping overshot reachability estimate for {id}: {}", record.pi);
				record.pi = 1.0;
			}
		}
		Ok(())
	}

	pub fn flush_matrix(&self) -> EngineResult<GeneratorMatrix> {
		transition::flush(&self.stage, self.state_map.len())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::generator::{counting_chain, deadlock_model, pruned_successor, two_state_chain};
	use crate::property::StateFormula;

	#[test]
	fn single_pass_explores_two_state_chain() {
		let gen = two_state_chain();
		let mut explorer = Explorer::new(&gen).unwrap();
		let config = Config::default();
		explorer.build_pass(1e-9, None, &config).unwrap();
		// absorbing + A + B
		assert_eq!(explorer.state_count(), 3);
	}

	/// spec.md S8 scenario 2: B is committed directly, C is pruned to the
	/// absorbing state, and A's total outgoing rate is conserved.
	#[test]
	fn trivially_pruned_successor_redirects_low_rate_edge() {
		let gen = pruned_successor();
		let mut explorer = Explorer::new(&gen).unwrap();
		let config = Config::default();
		explorer.build_pass(0.01, None, &config).unwrap();

		let matrix = explorer.flush_matrix().unwrap();
		let a_id = explorer.initials()[0];
		assert_eq!(matrix.out_rate(a_id), 10.0001);

		let row = matrix.csr.row(a_id.index());
		let to_absorbing: f64 = row
			.col_indices()
			.iter()
			.zip(row.values())
			.filter(|(&col, _)| col == StateId::ABSORBING.index())
			.map(|(_, &rate)| rate)
			.sum();
		assert!((to_absorbing - 0.0001).abs() < 1e-12);
	}

	/// spec.md S8 scenario 3: the property short-circuits on `x >= 5` before
	/// the generator's successor for that state is ever consulted, so `x`
	/// never advances past 5 along any explored path.
	#[test]
	fn until_short_circuit_stops_at_right_condition() {
		let gen = counting_chain(4);
		let mut explorer = Explorer::new(&gen).unwrap();
		let config = Config::default();
		let property = Property::until(StateFormula::new("x < 5"), StateFormula::new("x == 5"), None);
		for _ in 0..8 {
			explorer.build_pass(1e-9, Some(&property), &config).unwrap();
		}

		let vars = explorer.variable_information();
		for (_, state) in explorer.state_map().iter() {
			let x = state.get_bits(0, 4);
			if x != 0 {
				// every reachable non-initial state satisfies x <= 5; the
				// short-circuit self-loops as soon as x == 5 is reached, and
				// states with x == 6.. are unreachable once that happens.
				let _ = vars;
				assert!(x <= 5, "explored past the short-circuit boundary: x={x}");
			}
		}
	}

	/// spec.md S8 scenario 6: a one-state deadlock model gets a synthetic
	/// self-loop of rate 1 and is recorded in `deadlocks()`.
	#[test]
	fn deadlock_wiring_self_loops_at_rate_one() {
		let gen = deadlock_model();
		let mut explorer = Explorer::new(&gen).unwrap();
		let config = Config::default();
		explorer.build_pass(1e-9, None, &config).unwrap();

		let only_id = explorer.initials()[0];
		assert_eq!(explorer.deadlocks(), &[only_id]);

		let matrix = explorer.flush_matrix().unwrap();
		assert_eq!(matrix.out_rate(only_id), 1.0);
	}

	#[test]
	fn deterministic_violation_is_inconsistent() {
		use crate::generator::{Behavior, Choice};
		use crate::state::CompressedState;

		struct Nondeterministic {
			vars: VariableInformation,
		}
		impl Generator for Nondeterministic {
			fn variable_information(&self) -> &VariableInformation {
				&self.vars
			}
			fn initial_states(&self) -> Vec<CompressedState> {
				vec![self.vars.blank_state()]
			}
			fn behavior_at(&self, _state: &CompressedState) -> EngineResult<Behavior> {
				let succ = self.vars.blank_state();
				Ok(Behavior {
					choices: vec![
						vec![Choice { rate: 1.0, successor: succ.clone() }],
						vec![Choice { rate: 2.0, successor: succ }],
					],
				})
			}
		}

		let gen = Nondeterministic { vars: VariableInformation::new() };
		let mut explorer = Explorer::new(&gen).unwrap();
		let config = Config::default();
		let err = explorer.build_pass(1e-9, None, &config).unwrap_err();
		assert!(matches!(err, EngineError::Inconsistent(_)));
	}
}
