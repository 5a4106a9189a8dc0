//! Property and state-formula types (spec.md S6), grounded on the
//! reference `Property`/`StateFormula` shapes but pared to what this
//! engine actually evaluates: bounded- and unbounded-until reachability.

use evalexpr::{eval_boolean_with_context, HashMapContext};

use crate::error::{EngineError, EngineResult};

/// A side condition evaluated directly against a state's variable bindings,
/// e.g. `"count >= 5"`. Only atomic expressions are supported: compound
/// state formulas are rejected at ingress (see `Property::Until::new`),
/// per the stricter of SPEC_FULL.md's two short-circuit-scope resolutions.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct StateFormula(pub String);

impl StateFormula {
	pub fn new(expr: impl Into<String>) -> Self {
		StateFormula(expr.into())
	}

	pub fn eval(&self, ctx: &HashMapContext) -> EngineResult<bool> {
		eval_boolean_with_context(&self.0, ctx)
			.map_err(|e| EngineError::InvalidInput(format!("state formula {:?}: {e}", self.0)))
	}
}

/// `P(left U<=bound right)`, the only property shape this engine truncates
/// against (spec.md S6). `bound = None` is unbounded until.
#[derive(Debug, Clone)]
pub struct Property {
	pub left: StateFormula,
	pub right: StateFormula,
	pub bound: Option<f64>,
}

impl Property {
	pub fn until(left: StateFormula, right: StateFormula, bound: Option<f64>) -> Self {
		Self { left, right, bound }
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use evalexpr::{ContextWithMutableVariables, Value};

	#[test]
	fn atomic_formula_evaluates_against_context() {
		let mut ctx = HashMapContext::new();
		ctx.set_value("count".to_string(), Value::Int(5)).unwrap();
		let f = StateFormula::new("count >= 5");
		assert!(f.eval(&ctx).unwrap());
	}

	#[test]
	fn malformed_formula_is_invalid_input() {
		let ctx = HashMapContext::new();
		let f = StateFormula::new("count >=");
		assert!(matches!(f.eval(&ctx), Err(EngineError::InvalidInput(_))));
	}
}
