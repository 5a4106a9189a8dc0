//! The outer refinement loop tying the explorer, property rewrite, and
//! solver together (spec.md S4.6).

mod controller;

pub use controller::{Controller, RefinementOutcome};
