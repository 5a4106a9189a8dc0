//! Staged transition collection and sparse-matrix construction (spec.md
//! S4.2, S5).

mod matrix;
mod stage;

pub use matrix::{flush, GeneratorMatrix};
pub use stage::TransitionStage;
