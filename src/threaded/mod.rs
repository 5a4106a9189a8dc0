//! Data-parallel build pass (spec.md S4.8, S9 "Concurrency
//! re-architecture"). Optional: `explorer::Explorer` alone is a complete,
//! correct single-threaded implementation of the whole engine. This
//! module trades the original's per-thread state-ownership partitioning
//! for a shared `RwLock`/`Mutex` pair plus `crossbeam_channel` work and
//! result queues — see `control_thread` for the tradeoff rationale.

mod control_thread;
mod queues;
mod worker;

pub use control_thread::ControlThread;
