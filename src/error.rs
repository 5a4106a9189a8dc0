//! Error kinds surfaced by the truncation engine (spec.md S7).
//!
//! Fatal kinds (`Inconsistent`, `TruncationArtifact`) propagate all the way
//! up to the refinement controller and abort the run. `Numeric` conditions
//! are usually logged and clamped by the caller rather than returned, but
//! the variant exists so that a non-recoverable overshoot still has a
//! proper error to bubble up.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
	/// Unparseable constants, missing model/property input, or an
	/// unsupported model type reaching the engine boundary.
	#[error("invalid input: {0}")]
	InvalidInput(String),

	/// A structural invariant the engine relies on was violated: the
	/// absorbing state didn't land on id 0, a model returned more than one
	/// choice for a state, or a perimeter state expanded to nothing.
	#[error("inconsistent model or engine state: {0}")]
	Inconsistent(String),

	/// A reachability estimate drifted out of `[0, 1]` by more than the
	/// configured overshoot tolerance, or a choice's rates summed to zero.
	#[error("numeric error: {0}")]
	Numeric(String),

	/// The initial-state set was empty, so no exploration could start.
	#[error("truncation artifact: {0}")]
	TruncationArtifact(String),

	/// The run was cancelled via the shared terminate flag.
	#[error("aborted: {0}")]
	Aborted(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
