//! Tuning parameters for the explorer and refinement controller (spec.md
//! S7, grounded on `core::Options` in the reference implementation, which
//! stores these as a process-wide singleton; here they're an explicit
//! immutable struct threaded through instead — spec.md S9 "Global mutable
//! configuration").

/// Whether the target property describes a rare or common event, used to
/// bias exploration priority toward the frontier states that matter most
/// for closing the probability window fastest (spec.md S9 "priority
/// method"). The exact weighting formula is left to a pluggable
/// `PriorityFn` (see `crate::bookkeeper`); this only selects the bias.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventBias {
	Rare,
	Common,
	Undefined,
}

/// Which build-pass strategy the explorer uses (spec.md S9 "Dynamic
/// dispatch over method variants"). Only `Iterative` is fully worked out;
/// `Priority` and `ReExploring` are represented so the tagged variant
/// exists, but both currently delegate to the same iterative build pass —
/// `Priority` additionally threads a `PriorityFn` through frontier
/// ordering once one is supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
	Iterative,
	Priority,
	ReExploring,
}

#[derive(Debug, Clone)]
pub struct Config {
	/// Initial per-state reachability-estimate threshold below which a
	/// state is truncated instead of expanded.
	pub kappa: f64,
	/// Factor `kappa` is divided by between refinement passes.
	pub reduce_kappa: f64,
	/// Initial fraction of the probability window a pass is allowed to
	/// miss by before another refinement pass is triggered.
	pub approx_factor: f64,
	/// Multiplier nudging `approx_factor` back toward 1.0 between passes.
	pub fudge_factor: f64,
	/// Target width of the `[P_min, P_max]` window.
	pub prob_win: f64,
	/// Hard cap on refinement passes regardless of window convergence.
	pub max_approx_count: u32,
	/// Disables the `approx_factor` adaptation; each pass halves `kappa`
	/// by `reduce_kappa` only, ignoring the window.
	pub no_prop_refine: bool,
	/// Hard cap on exploration steps within a single pass.
	pub max_iterations: Option<u64>,
	/// Hard cap on total committed states across the run.
	pub max_states: Option<usize>,
	/// Worker thread count for `crate::threaded`; 1 runs single-threaded.
	pub threads: usize,
	pub method: Method,
	/// Whether to apply the property short-circuit during exploration.
	pub preterminate: bool,
	/// Suppresses per-pass progress messages.
	pub quiet: bool,
	pub event: EventBias,
	pub distance_weight: f64,
	/// Allowed `[0,1]` overshoot on a reachability estimate before it's
	/// treated as a numeric error rather than clamped (spec.md S9 Open
	/// Questions).
	pub reachability_overshoot_tolerance: f64,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			kappa: 1.0e-6,
			reduce_kappa: 1000.0,
			approx_factor: 2.0,
			fudge_factor: 1.0,
			prob_win: 1.0e-3,
			max_approx_count: 10,
			no_prop_refine: false,
			max_iterations: None,
			max_states: None,
			threads: 1,
			method: Method::Iterative,
			preterminate: true,
			quiet: false,
			event: EventBias::Undefined,
			distance_weight: 0.0,
			reachability_overshoot_tolerance: 1.0e-9,
		}
	}
}
