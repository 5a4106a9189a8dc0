//! Bit-layout bookkeeping for a `CompressedState` and the bridge to
//! `evalexpr`'s evaluation context, which the property rewriter (spec.md
//! S6) needs to check state-formula atoms against a given state.

use evalexpr::{ContextWithMutableVariables, HashMapContext, Value};

use super::compressed::CompressedState;

#[derive(Debug, Clone)]
pub struct VariableInfo {
	pub name: String,
	pub offset: u32,
	pub width: u32,
}

/// Describes how a model's variables are packed into a `CompressedState`,
/// in the order the bits were assigned during model construction. Booleans
/// and bounded integers are tracked separately because they decode to
/// different `evalexpr::Value` variants; "locations" are the automaton/module
/// program-counter variables PRISM-style models expose alongside data
/// variables and decode the same way as bounded ints.
#[derive(Debug, Clone, Default)]
pub struct VariableInformation {
	pub bools: Vec<VariableInfo>,
	pub ints: Vec<VariableInfo>,
	pub locations: Vec<VariableInfo>,
	absorbing_offset: Option<u32>,
	total_bits: u32,
}

impl VariableInformation {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push_bool(&mut self, name: impl Into<String>) -> u32 {
		let offset = self.total_bits;
		self.bools.push(VariableInfo {
			name: name.into(),
			offset,
			width: 1,
		});
		self.total_bits += 1;
		offset
	}

	pub fn push_int(&mut self, name: impl Into<String>, width: u32) -> u32 {
		let offset = self.total_bits;
		self.ints.push(VariableInfo {
			name: name.into(),
			offset,
			width,
		});
		self.total_bits += width;
		offset
	}

	pub fn push_location(&mut self, name: impl Into<String>, width: u32) -> u32 {
		let offset = self.total_bits;
		self.locations.push(VariableInfo {
			name: name.into(),
			offset,
			width,
		});
		self.total_bits += width;
		offset
	}

	/// Reserves the trailing `Absorbing` bit. Must be called exactly once,
	/// after every model variable has been registered (spec.md S4.3).
	pub fn add_absorbing_bit(&mut self) -> u32 {
		debug_assert!(self.absorbing_offset.is_none(), "absorbing bit already reserved");
		let offset = self.total_bits;
		self.absorbing_offset = Some(offset);
		self.total_bits += 1;
		offset
	}

	pub fn total_bits(&self) -> u32 {
		self.total_bits
	}

	pub fn blank_state(&self) -> CompressedState {
		CompressedState::new(self.total_bits)
	}

	pub fn is_absorbing(&self, state: &CompressedState) -> bool {
		match self.absorbing_offset {
			Some(offset) => state.get_bits(offset, 1) == 1,
			None => false,
		}
	}

	pub fn set_absorbing(&self, state: &mut CompressedState) {
		let offset = self
			.absorbing_offset
			.expect("absorbing bit not reserved on this layout");
		state.set_bits(offset, 1, 1);
	}

	/// Builds an `evalexpr` context binding every tracked variable (plus a
	/// synthetic `Absorbing` boolean) to its decoded value in `state`, for
	/// evaluating `StateFormula` atoms (spec.md S6).
	pub fn eval_context(&self, state: &CompressedState) -> HashMapContext {
		let mut ctx = HashMapContext::new();
		for var in &self.bools {
			let bit = state.get_bits(var.offset, var.width);
			let _ = ctx.set_value(var.name.clone(), Value::Boolean(bit == 1));
		}
		for var in self.ints.iter().chain(self.locations.iter()) {
			let value = state.get_bits(var.offset, var.width);
			let _ = ctx.set_value(var.name.clone(), Value::Int(value as i64));
		}
		let _ = ctx.set_value("Absorbing".to_string(), Value::Boolean(self.is_absorbing(state)));
		ctx
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn layout_assigns_disjoint_offsets() {
		let mut info = VariableInformation::new();
		let b = info.push_bool("up");
		let i = info.push_int("count", 10);
		let abs = info.add_absorbing_bit();
		assert_eq!(b, 0);
		assert_eq!(i, 1);
		assert_eq!(abs, 11);
		assert_eq!(info.total_bits(), 12);
	}

	#[test]
	fn absorbing_bit_round_trips() {
		let mut info = VariableInformation::new();
		info.push_bool("up");
		info.add_absorbing_bit();
		let mut s = info.blank_state();
		assert!(!info.is_absorbing(&s));
		info.set_absorbing(&mut s);
		assert!(info.is_absorbing(&s));
	}

	#[test]
	fn eval_context_decodes_variables() {
		use evalexpr::eval_boolean_with_context;

		let mut info = VariableInformation::new();
		info.push_bool("up");
		info.push_int("count", 10);
		let mut s = info.blank_state();
		s.set_bits(0, 1, 1);
		s.set_bits(1, 10, 5);
		let ctx = info.eval_context(&s);
		assert!(eval_boolean_with_context("up && count == 5", &ctx).unwrap());
	}
}
