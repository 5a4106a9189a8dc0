//! Channel types wiring workers to each other and to the control thread
//! (spec.md S9 "Concurrency re-architecture"): a shared work queue stands
//! in for the original's per-worker `LockableDeque` cross-exploration
//! queues, and a single results channel stands in for its per-worker
//! transition-output queues — `crossbeam_channel` senders/receivers are
//! cheaply cloned, so both are genuinely multi-producer without a mutex
//! around a `VecDeque`.

use crate::state::StateId;

/// One state ready for expansion, pulled by whichever worker is free.
pub type WorkItem = StateId;

/// A worker's output for one expanded state: its id and the real outgoing
/// edges the generator produced (post short-circuit/truncation). Routed
/// to the control thread, which owns the single `TransitionStage`.
pub type EdgeBatch = (StateId, Vec<(StateId, f64)>);
