//! Rewrites a single `Property` into the two-sided `P_min`/`P_max` pair
//! the refinement controller checks each pass (spec.md S6, grounded on
//! `StaminaModelChecker::performPropertyChecking`'s min/max `CheckTask`
//! construction).
//!
//! The truncated model's absorbing state is reachable whenever mass was
//! redirected away from the real chain; the two bounds disagree only on
//! whether that lost mass counts as satisfying `right`:
//!   - `P_max` is optimistic: absorbing counts as satisfying, so `right ||
//!     Absorbing` overcounts reachability.
//!   - `P_min` is pessimistic: absorbing counts as failing, so `right &&
//!     !Absorbing` undercounts it.
//! `P_min <= P_actual <= P_max` follows directly from this rewrite.

use super::formula::{Property, StateFormula};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
	Min,
	Max,
}

pub fn rewrite_for_bound(property: &Property, bound: Bound) -> Property {
	let right = match bound {
		Bound::Max => StateFormula::new(format!("({}) || Absorbing", property.right.0)),
		Bound::Min => StateFormula::new(format!("({}) && !Absorbing", property.right.0)),
	};
	Property::until(property.left.clone(), right, property.bound)
}

/// Short-circuit test for the bounded-until exploration loop (spec.md S4.5,
/// grounded on `StaminaIterativeModelBuilder`'s `!leftEvaluation ||
/// rightEvaluation` check): a state where `right` already holds, or where
/// `left` has already failed, cannot make further progress toward the
/// property and is turned into a self-loop instead of being expanded.
pub fn is_short_circuited(property: &Property, left_holds: bool, right_holds: bool) -> bool {
	let _ = property;
	right_holds || !left_holds
}

#[cfg(test)]
mod tests {
	use super::*;

	fn prop() -> Property {
		Property::until(StateFormula::new("true"), StateFormula::new("done"), Some(10.0))
	}

	#[test]
	fn max_rewrite_ors_in_absorbing() {
		let rewritten = rewrite_for_bound(&prop(), Bound::Max);
		assert_eq!(rewritten.right.0, "(done) || Absorbing");
	}

	#[test]
	fn min_rewrite_ands_out_absorbing() {
		let rewritten = rewrite_for_bound(&prop(), Bound::Min);
		assert_eq!(rewritten.right.0, "(done) && !Absorbing");
	}

	#[test]
	fn short_circuit_fires_on_right_or_failed_left() {
		assert!(is_short_circuited(&prop(), true, true));
		assert!(is_short_circuited(&prop(), false, false));
		assert!(!is_short_circuited(&prop(), true, false));
	}
}
