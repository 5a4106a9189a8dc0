//! Spawns worker threads, seeds the shared work queue with the initial
//! states, drains the edge-batch channel into the single `TransitionStage`
//! it owns, and joins everyone once the pending-work counter hits zero
//! (spec.md S4.8, grounded on `ControlThread` in original_source).

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use crossbeam_channel::unbounded;

use crate::bookkeeper::{ProbabilityState, StateIndexArray};
use crate::error::{EngineError, EngineResult};
use crate::explorer::{absorbing, Config};
use crate::generator::Generator;
use crate::property::Property;
use crate::state::StateIdMap;
use crate::transition::{self, GeneratorMatrix, TransitionStage};

use super::worker;

pub struct ControlThread {
	cancel: Arc<AtomicBool>,
}

impl ControlThread {
	pub fn new() -> Self {
		Self {
			cancel: Arc::new(AtomicBool::new(false)),
		}
	}

	/// Allows an external caller (e.g. a signal handler) to stop the run
	/// at the next pass boundary.
	pub fn cancel_handle(&self) -> Arc<AtomicBool> {
		Arc::clone(&self.cancel)
	}

	/// Runs a single build pass across `config.threads` workers and
	/// returns the flushed matrix, mirroring `Explorer::build_pass` plus
	/// `Explorer::flush_matrix` but spread across threads.
	pub fn build_pass<G: Generator + Sync>(
		&self,
		generator: &G,
		kappa: f64,
		property: Option<&Property>,
		config: &Config,
	) -> EngineResult<GeneratorMatrix> {
		let vars = generator.variable_information();
		let state_map = Arc::new(RwLock::new(StateIdMap::new()));
		let bookkeeper = Arc::new(Mutex::new(StateIndexArray::new()));
		let mut stage = TransitionStage::new();
		{
			let mut map = state_map.write().unwrap();
			let mut bk = bookkeeper.lock().unwrap();
			absorbing::setup(vars, &mut map, &mut bk, &mut stage)?;
		}

		let initials = generator.initial_states();
		if initials.is_empty() {
			return Err(EngineError::TruncationArtifact("generator returned no initial states".into()));
		}

		let (work_tx, work_rx) = unbounded();
		let (edge_tx, edge_rx) = unbounded();
		let pending = Arc::new(AtomicI64::new(0));

		let share = 1.0 / initials.len() as f64;
		{
			let mut map = state_map.write().unwrap();
			let mut bk = bookkeeper.lock().unwrap();
			for init in initials {
				let (id, fresh) = map.find_or_insert(init);
				if fresh {
					let mut record = ProbabilityState::new(id, 0);
					record.pi = share;
					bk.insert_new(id, record);
				} else if let Some(record) = bk.get_mut(id) {
					record.add_to_pi(share);
				}
				pending.fetch_add(1, Ordering::AcqRel);
				work_tx.send(id).ok();
			}
		}

		let threads = config.threads.max(1);
		std::thread::scope(|scope| {
			for _ in 0..threads {
				let state_map = Arc::clone(&state_map);
				let bookkeeper = Arc::clone(&bookkeeper);
				let work_tx = work_tx.clone();
				let work_rx = work_rx.clone();
				let edge_tx = edge_tx.clone();
				let pending = Arc::clone(&pending);
				let cancel = Arc::clone(&self.cancel);
				scope.spawn(move || {
					let _ = worker::run(
						generator, kappa, property, config, &state_map, &bookkeeper, &work_tx, &work_rx, &edge_tx,
						&pending, &cancel,
					);
				});
			}
		});
		drop(edge_tx);

		while let Ok((id, edges)) = edge_rx.recv() {
			stage.set_outgoing(id, edges);
		}

		if self.cancel.load(Ordering::Relaxed) {
			let dimension = state_map.read().unwrap().len();
			return Err(EngineError::Aborted(format!(
				"terminate signal received mid-pass: {dimension} states committed"
			)));
		}

		let carry_over = {
			let bk = bookkeeper.lock().unwrap();
			bk.perimeter_states()
		};
		{
			let map = state_map.read().unwrap();
			let mut bk = bookkeeper.lock().unwrap();
			absorbing::connect_perimeter(&mut stage, &mut bk, &map, generator, &carry_over)?;
		}

		let dimension = state_map.read().unwrap().len();
		transition::flush(&stage, dimension)
	}
}

impl Default for ControlThread {
	fn default() -> Self {
		Self::new()
	}
}
