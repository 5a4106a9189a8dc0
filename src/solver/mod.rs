//! The transient-probability solver boundary (spec.md S2, S9 "External
//! Interfaces"). Computing `P(left U<=bound right)` over a built CTMC is
//! explicitly out of scope for the truncation engine itself in production
//! use — a real deployment wires in an external model checker. The
//! `UniformizationSolver` here is a correct but unoptimized reference
//! implementation, useful for the bundled demo and for testing the
//! refinement controller end to end without an external dependency.

mod uniformization;

pub use uniformization::UniformizationSolver;

use crate::error::EngineResult;
use crate::transition::GeneratorMatrix;

/// Computes, for every state in `matrix`, the probability of satisfying
/// `left U<=bound right` starting from that state. `left`/`right` are
/// precomputed per-state atomic truth values (indexed the same way as
/// `matrix`'s dimension) rather than `StateFormula`s, so a solver
/// implementation never has to touch `evalexpr` itself.
pub trait TransientSolver {
	fn probability_until(
		&self,
		matrix: &GeneratorMatrix,
		left: &[bool],
		right: &[bool],
		bound: Option<f64>,
	) -> EngineResult<Vec<f64>>;
}
