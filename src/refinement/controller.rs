//! The refinement loop: build a pass, wire the perimeter, solve the two-
//! sided probability bounds, and either report convergence or shrink κ and
//! go again (spec.md S4.6, grounded on
//! `StaminaModelChecker::performPropertyChecking`'s outer loop).

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::error::EngineResult;
use crate::explorer::{Config, Explorer};
use crate::generator::Generator;
use crate::logging::message;
use crate::property::{rewrite_for_bound, Bound, Property, StateFormula};
use crate::solver::TransientSolver;
use crate::state::{StateId, StateIdMap, VariableInformation};

#[derive(Debug, Clone)]
pub struct RefinementOutcome {
	pub p_min: f64,
	pub p_max: f64,
	pub passes: u32,
	pub states: usize,
}

impl RefinementOutcome {
	pub fn window(&self) -> f64 {
		self.p_max - self.p_min
	}
}

pub struct Controller<'g, G: Generator> {
	explorer: Explorer<'g, G>,
	config: Config,
}

impl<'g, G: Generator> Controller<'g, G> {
	pub fn new(generator: &'g G, config: Config) -> EngineResult<Self> {
		Ok(Self {
			explorer: Explorer::new(generator)?,
			config,
		})
	}

	pub fn run(&mut self, property: &Property, solver: &impl TransientSolver) -> EngineResult<RefinementOutcome> {
		let mut kappa = self.config.kappa;
		let mut approx_factor = self.config.approx_factor;
		let mut pass = 0;

		loop {
			pass += 1;
			self.explorer.build_pass(kappa, Some(property), &self.config)?;
			let matrix = self.explorer.flush_matrix()?;

			let vars = self.explorer.variable_information();
			let state_map = self.explorer.state_map();
			let left = truth_vector(vars, state_map, &property.left)?;

			let min_prop = rewrite_for_bound(property, Bound::Min);
			let max_prop = rewrite_for_bound(property, Bound::Max);
			let right_min = truth_vector(vars, state_map, &min_prop.right)?;
			let right_max = truth_vector(vars, state_map, &max_prop.right)?;

			let p_min_vec = solver.probability_until(&matrix, &left, &right_min, property.bound)?;
			let p_max_vec = solver.probability_until(&matrix, &left, &right_max, property.bound)?;

			let (p_min, p_max) = weighted_initial_average(self.explorer.initials(), &p_min_vec, &p_max_vec);

			if !self.config.quiet {
				message!("pass {pass}: P_min={p_min:.6}, P_max={p_max:.6}, window={:.2e}", p_max - p_min);
			}

			let window = p_max - p_min;
			if window <= self.config.prob_win || pass >= self.config.max_approx_count {
				return Ok(RefinementOutcome {
					p_min,
					p_max,
					passes: pass,
					states: self.explorer.state_count(),
				});
			}

			let termination_estimate = self.explorer.last_termination_estimate();
			if !self.config.quiet {
				message!("pass {pass}: termination estimate (leaked mass upper bound) = {termination_estimate:.3e}");
			}

			if !self.config.no_prop_refine {
				// The termination estimator can flag a pass as unsafe to
				// stabilize on even when the solved window happens to look
				// tight, so it biases the same way the window does rather
				// than only reacting to P_max - P_min.
				let worst_case = window.max(termination_estimate);
				let percent_off = (worst_case * 4.0 / self.config.prob_win).min(1.0);
				approx_factor = (approx_factor * self.config.fudge_factor * percent_off).max(1.0);
			}
			// approx_factor >= 1.0 always, so this divisor only ever makes
			// kappa shrink at least as fast as the unadapted reduce_kappa
			// rate, more aggressively when the window (or the leaked-mass
			// estimate) is loose (spec.md S4.6).
			kappa /= self.config.reduce_kappa * approx_factor;
		}
	}

	/// Allows an external caller to stop the run at the next frontier pop or
	/// pass boundary (spec.md S5, S7 `Aborted`).
	pub fn cancel_handle(&self) -> Arc<AtomicBool> {
		self.explorer.cancel_handle()
	}
}

fn truth_vector(vars: &VariableInformation, state_map: &StateIdMap, formula: &StateFormula) -> EngineResult<Vec<bool>> {
	let mut out = Vec::with_capacity(state_map.len());
	for (_, state) in state_map.iter() {
		let ctx = vars.eval_context(state);
		out.push(formula.eval(&ctx)?);
	}
	Ok(out)
}

fn weighted_initial_average(initials: &[StateId], p_min_vec: &[f64], p_max_vec: &[f64]) -> (f64, f64) {
	if initials.is_empty() {
		return (0.0, 0.0);
	}
	let weight = 1.0 / initials.len() as f64;
	let p_min = initials.iter().map(|id| p_min_vec[id.index()] * weight).sum();
	let p_max = initials.iter().map(|id| p_max_vec[id.index()] * weight).sum();
	(p_min, p_max)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::generator::two_state_chain;
	use crate::property::StateFormula;
	use crate::solver::UniformizationSolver;

	#[test]
	fn two_state_chain_converges_to_closed_form() {
		let gen = two_state_chain();
		let mut config = Config::default();
		config.kappa = 1.0e-12;
		config.quiet = true;
		let mut controller = Controller::new(&gen, config).unwrap();
		let property = Property::until(StateFormula::new("true"), StateFormula::new("at_b"), Some(1.0));
		let solver = UniformizationSolver::new();
		let outcome = controller.run(&property, &solver).unwrap();

		let expected = 1.0 - (-1.0_f64).exp();
		assert!((outcome.p_min - expected).abs() < 1e-3, "{outcome:?}");
		assert!((outcome.p_max - expected).abs() < 1e-3, "{outcome:?}");
	}

	/// spec.md S8 scenario 4: a loose starting kappa leaves a sizable window
	/// after the first pass; halving kappa every pass (`reduce_kappa = 2`)
	/// closes it to within `prob_win` well before `max_approx_count` passes.
	#[test]
	fn refinement_closes_the_window_within_the_pass_budget() {
		use crate::generator::coin_flip_chain;

		let gen = coin_flip_chain(12, 4);
		let mut config = Config::default();
		config.kappa = 0.3;
		config.reduce_kappa = 2.0;
		config.prob_win = 0.01;
		config.max_approx_count = 8;
		config.quiet = true;
		let mut controller = Controller::new(&gen, config.clone()).unwrap();
		let property = Property::until(StateFormula::new("true"), StateFormula::new("done"), None);
		let solver = UniformizationSolver::new();
		let outcome = controller.run(&property, &solver).unwrap();

		assert!(
			outcome.window() <= config.prob_win,
			"window failed to close within {} passes: {outcome:?}",
			config.max_approx_count
		);
		assert!(
			outcome.passes < config.max_approx_count,
			"refinement hit the pass budget instead of converging: {outcome:?}"
		);
	}

	#[test]
	fn p_min_never_exceeds_p_max() {
		let gen = two_state_chain();
		let mut config = Config::default();
		config.quiet = true;
		let mut controller = Controller::new(&gen, config).unwrap();
		let property = Property::until(StateFormula::new("true"), StateFormula::new("at_b"), Some(1.0));
		let solver = UniformizationSolver::new();
		let outcome = controller.run(&property, &solver).unwrap();
		assert!(outcome.p_min <= outcome.p_max + 1e-9);
	}
}
