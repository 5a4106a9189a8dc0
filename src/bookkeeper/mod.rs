//! Per-state bookkeeping: the `ProbabilityState` record and its block-pool
//! arena, addressed by dense `StateId` (spec.md S3).

mod probability_state;
mod state_index_array;

pub use probability_state::{max_heap_on_pi, PriorityFn, ProbabilityState};
pub use state_index_array::StateIndexArray;
