//! Reference `TransientSolver` built on uniformization (bounded horizon)
//! and an embedded-jump-chain hitting-probability linear solve (unbounded
//! horizon). Both techniques are standard CTMC transient-analysis methods;
//! this module exists to exercise the refinement controller end to end
//! without depending on an external model checker, not to be a
//! performance-competitive solver.

use nalgebra::{DMatrix, DVector};

use crate::error::{EngineError, EngineResult};
use crate::transition::GeneratorMatrix;

use super::TransientSolver;

const MAX_UNIFORMIZATION_STEPS: usize = 20_000;
const TAIL_TOLERANCE: f64 = 1e-10;

#[derive(Debug, Default)]
pub struct UniformizationSolver;

impl UniformizationSolver {
	pub fn new() -> Self {
		Self
	}

	fn solve_bounded(
		&self,
		matrix: &GeneratorMatrix,
		left: &[bool],
		right: &[bool],
		t: f64,
	) -> EngineResult<Vec<f64>> {
		let n = matrix.dimension;
		if t < 0.0 {
			return Err(EngineError::InvalidInput(format!("negative time bound {t}")));
		}
		let lambda = (0..n)
			.map(|i| matrix.out_rate(crate::state::StateId::from_index(i)))
			.fold(0.0_f64, f64::max)
			.max(1.0);

		// Build the uniformized DTMC restricted to "maybe" states: yes/no
		// states are frozen (self-loop with probability 1) since the
		// property's outcome is already decided once a path reaches them.
		let maybe = |i: usize| left[i] && !right[i];
		let mut u = DVector::<f64>::from_element(n, 0.0);
		for i in 0..n {
			if right[i] {
				u[i] = 1.0;
			}
		}

		let mut cumulative_poisson = 0.0;
		let mut poisson = (-lambda * t).exp();
		let mut acc = DVector::<f64>::from_element(n, 0.0);
		for i in 0..n {
			acc[i] = if right[i] { 1.0 } else { 0.0 };
		}

		let mut result = &acc * poisson;
		cumulative_poisson += poisson;

		for k in 1..MAX_UNIFORMIZATION_STEPS {
			let mut next = DVector::<f64>::from_element(n, 0.0);
			for i in 0..n {
				if right[i] {
					next[i] = 1.0;
					continue;
				}
				if !left[i] {
					next[i] = 0.0;
					continue;
				}
				debug_assert!(maybe(i));
				let row = matrix.csr.row(i);
				let out = lambda;
				let mut stay_mass = out;
				let mut value = 0.0;
				for (&j, &rate) in row.col_indices().iter().zip(row.values()) {
					value += (rate / out) * acc[j];
					stay_mass -= rate;
				}
				value += (stay_mass / out) * acc[i];
				next[i] = value;
			}
			acc = next;

			poisson *= lambda * t / k as f64;
			result += &acc * poisson;
			cumulative_poisson += poisson;

			if cumulative_poisson >= 1.0 - TAIL_TOLERANCE {
				break;
			}
		}

		Ok(result.iter().copied().collect())
	}

	fn solve_unbounded(&self, matrix: &GeneratorMatrix, left: &[bool], right: &[bool]) -> EngineResult<Vec<f64>> {
		let n = matrix.dimension;
		let p = matrix.to_row_stochastic();

		let maybe_indices: Vec<usize> = (0..n).filter(|&i| left[i] && !right[i]).collect();
		let mut result = vec![0.0; n];
		for i in 0..n {
			if right[i] {
				result[i] = 1.0;
			}
		}
		if maybe_indices.is_empty() {
			return Ok(result);
		}

		let m = maybe_indices.len();
		let local_index: std::collections::HashMap<usize, usize> =
			maybe_indices.iter().enumerate().map(|(k, &i)| (i, k)).collect();

		let mut a = DMatrix::<f64>::identity(m, m);
		let mut b = DVector::<f64>::from_element(m, 0.0);

		for (row_k, &i) in maybe_indices.iter().enumerate() {
			let row = p.row(i);
			for (&j, &prob) in row.col_indices().iter().zip(row.values()) {
				if right[j] {
					b[row_k] += prob;
				} else if let Some(&col_k) = local_index.get(&j) {
					a[(row_k, col_k)] -= prob;
				}
				// transitions into "no" states contribute zero.
			}
		}

		let solution = a
			.lu()
			.solve(&b)
			.ok_or_else(|| EngineError::Numeric("unbounded-until linear system is singular".into()))?;

		for (k, &i) in maybe_indices.iter().enumerate() {
			result[i] = solution[k];
		}
		Ok(result)
	}
}

impl TransientSolver for UniformizationSolver {
	fn probability_until(
		&self,
		matrix: &GeneratorMatrix,
		left: &[bool],
		right: &[bool],
		bound: Option<f64>,
	) -> EngineResult<Vec<f64>> {
		match bound {
			Some(t) => self.solve_bounded(matrix, left, right, t),
			None => self.solve_unbounded(matrix, left, right),
		}
	}
}
