//! Flushes a `TransitionStage` into a sparse generator matrix (spec.md S5).
//!
//! The matrix is row-stochastic in *rate* space (off-diagonal entries are
//! transition rates, not probabilities); the solver is responsible for
//! uniformizing or otherwise normalizing before use. Self-loops introduced
//! by the property short-circuit (spec.md S6) are kept as explicit
//! diagonal entries rather than folded away, since the solver needs to see
//! them to know a state should not advance under the bounded-until formula.

use nalgebra_sparse::{CooMatrix, CsrMatrix};

use crate::error::{EngineError, EngineResult};
use crate::state::StateId;

use super::stage::TransitionStage;

#[derive(Debug)]
pub struct GeneratorMatrix {
	pub csr: CsrMatrix<f64>,
	pub dimension: usize,
}

/// Builds a fresh `GeneratorMatrix` from the stage, covering exactly the
/// `dimension` dense ids `0..dimension` (spec.md S4.6: every pass rebuilds
/// the matrix rather than patching the previous one).
pub fn flush(stage: &TransitionStage, dimension: usize) -> EngineResult<GeneratorMatrix> {
	let mut coo = CooMatrix::new(dimension, dimension);
	for src in stage.sources() {
		if src.index() >= dimension {
			continue;
		}
		let edges = stage.outgoing_of(src);
		let total: f64 = edges.iter().map(|(_, rate)| rate).sum();
		if edges.is_empty() || total <= 0.0 {
			return Err(EngineError::Numeric(format!(
				"state {src} has no positive outgoing rate at flush time"
			)));
		}
		for &(dst, rate) in edges {
			if dst.index() >= dimension {
				return Err(EngineError::Inconsistent(format!(
					"transition from {src} targets out-of-range state {dst}"
				)));
			}
			coo.push(src.index(), dst.index(), rate);
		}
	}
	Ok(GeneratorMatrix {
		csr: CsrMatrix::from(&coo),
		dimension,
	})
}

impl GeneratorMatrix {
	/// Row-normalizes rates into a transition probability matrix for the
	/// embedded discrete-time chain, used by the solver (spec.md S6).
	pub fn to_row_stochastic(&self) -> CsrMatrix<f64> {
		let mut coo = CooMatrix::new(self.dimension, self.dimension);
		for row in 0..self.dimension {
			let row_view = self.csr.row(row);
			let total: f64 = row_view.values().iter().sum();
			if total <= 0.0 {
				continue;
			}
			for (&col, &rate) in row_view.col_indices().iter().zip(row_view.values()) {
				coo.push(row, col, rate / total);
			}
		}
		CsrMatrix::from(&coo)
	}

	pub fn out_rate(&self, state: StateId) -> f64 {
		if state.index() >= self.dimension {
			return 0.0;
		}
		self.csr.row(state.index()).values().iter().sum()
	}
}
