//! A single exploration worker (spec.md S4.8, grounded on
//! `ExplorationThread` in original_source). Each worker pulls a state id
//! off the shared work queue, expands it through the generator, and
//! reports the resulting edges to the control thread.
//!
//! The original partitions state ownership across threads so only one
//! thread ever writes a given state's bookkeeping record. This
//! implementation instead shares `StateIdMap` behind an `RwLock` and
//! `StateIndexArray` behind a `Mutex`, taking the lock only for the brief
//! insert/update rather than for the whole expansion — simpler to get
//! right than id-range ownership routing, at the cost of some lock
//! contention under high thread counts (see DESIGN.md).

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use crossbeam_channel::{Receiver, Sender};

use crate::bookkeeper::{ProbabilityState, StateIndexArray};
use crate::error::EngineResult;
use crate::explorer::Config;
use crate::generator::Generator;
use crate::property::{is_short_circuited, Property};
use crate::state::{StateId, StateIdMap};

use super::queues::{EdgeBatch, WorkItem};

/// Sentinel `iteration_last_seen` value marking a successor as already
/// enqueued within the current `build_pass` call (there is only ever one
/// logical iteration per call, unlike the persistent explorer's per-pass
/// counter).
const ENQUEUED_MARK: u32 = 1;

pub fn run<G: Generator + Sync>(
	generator: &G,
	kappa: f64,
	property: Option<&Property>,
	config: &Config,
	state_map: &Arc<RwLock<StateIdMap>>,
	bookkeeper: &Arc<Mutex<StateIndexArray>>,
	work_tx: &Sender<WorkItem>,
	work_rx: &Receiver<WorkItem>,
	edge_tx: &Sender<EdgeBatch>,
	pending: &Arc<AtomicI64>,
	cancel: &Arc<AtomicBool>,
) -> EngineResult<()> {
	loop {
		if cancel.load(Ordering::Relaxed) {
			return Ok(());
		}
		if pending.load(Ordering::Acquire) <= 0 {
			return Ok(());
		}
		let id = match work_rx.recv_timeout(std::time::Duration::from_millis(20)) {
			Ok(id) => id,
			Err(crossbeam_channel::RecvTimeoutError::Timeout) => continue,
			Err(crossbeam_channel::RecvTimeoutError::Disconnected) => return Ok(()),
		};

		expand_one(generator, id, kappa, property, config, state_map, bookkeeper, work_tx, edge_tx, pending)?;
		pending.fetch_sub(1, Ordering::AcqRel);
	}
}

#[allow(clippy::too_many_arguments)]
fn expand_one<G: Generator + Sync>(
	generator: &G,
	id: StateId,
	kappa: f64,
	property: Option<&Property>,
	config: &Config,
	state_map: &Arc<RwLock<StateIdMap>>,
	bookkeeper: &Arc<Mutex<StateIndexArray>>,
	work_tx: &Sender<WorkItem>,
	edge_tx: &Sender<EdgeBatch>,
	pending: &Arc<AtomicI64>,
) -> EngineResult<()> {
	let compressed = state_map.read().unwrap().state_of(id).clone();
	let src_pi = bookkeeper.lock().unwrap().get(id).map(|s| s.pi).unwrap_or(0.0);

	if config.preterminate {
		if let Some(prop) = property {
			let ctx = generator.variable_information().eval_context(&compressed);
			let left_holds = prop.left.eval(&ctx)?;
			let right_holds = prop.right.eval(&ctx)?;
			if is_short_circuited(prop, left_holds, right_holds) {
				edge_tx.send((id, vec![(id, 1.0)])).ok();
				if let Some(record) = bookkeeper.lock().unwrap().get_mut(id) {
					record.terminal = false;
				}
				return Ok(());
			}
		}
	}

	let behavior = generator.behavior_at(&compressed)?;
	if behavior.is_deadlock() {
		edge_tx.send((id, vec![(id, 1.0)])).ok();
		if let Some(record) = bookkeeper.lock().unwrap().get_mut(id) {
			record.terminal = false;
			record.deadlock = true;
		}
		return Ok(());
	}
	if !behavior.is_deterministic() {
		return Err(crate::error::EngineError::Inconsistent(format!(
			"state {id} has {} nondeterministic choices; this engine only supports CTMC semantics",
			behavior.choices.len()
		)));
	}

	let distribution = &behavior.choices[0];
	let total_rate: f64 = distribution.iter().map(|c| c.rate).sum();
	if total_rate <= 0.0 {
		return Err(crate::error::EngineError::Numeric(format!(
			"state {id} has non-positive total outgoing rate"
		)));
	}

	let mut edges = Vec::with_capacity(distribution.len());
	for choice in distribution {
		let (succ_id, fresh) = state_map.write().unwrap().find_or_insert(choice.successor.clone());

		let mut bk = bookkeeper.lock().unwrap();
		if fresh {
			bk.insert_new(succ_id, ProbabilityState::new(succ_id, 0));
		}
		let contribution = src_pi * (choice.rate / total_rate);
		let record = bk.get_mut(succ_id).expect("just inserted or pre-existing");
		record.add_to_pi(contribution);
		if record.pi > 1.0 {
			if record.pi - 1.0 > config.reachability_overshoot_tolerance {
				return Err(crate::error::EngineError::Numeric(format!(
					"reachability estimate for {succ_id} overshot 1.0 by more than tolerance: {}",
					record.pi
				)));
			}
			record.pi = 1.0;
		}
		let still_terminal = record.terminal;
		let pi_now = record.pi;
		// `iteration_last_seen` doubles as an already-enqueued marker for the
		// lifetime of this call: a successor can gain enough π to cross kappa
		// from a later choice's contribution even after an earlier one found
		// it still below threshold, and it must still get enqueued then, not
		// just on the choice that happened to make it fresh.
		let should_enqueue = still_terminal && pi_now >= kappa && record.iteration_last_seen != ENQUEUED_MARK;
		if should_enqueue {
			record.iteration_last_seen = ENQUEUED_MARK;
		}
		if still_terminal && pi_now < kappa {
			record.was_put_in_terminal_queue = true;
		}
		drop(bk);

		if still_terminal && pi_now < kappa {
			edges.push((StateId::ABSORBING, choice.rate));
			continue;
		}

		edges.push((succ_id, choice.rate));
		if should_enqueue {
			pending.fetch_add(1, Ordering::AcqRel);
			work_tx.send(succ_id).ok();
		}
	}

	edge_tx.send((id, edges)).ok();
	if let Some(record) = bookkeeper.lock().unwrap().get_mut(id) {
		record.terminal = false;
	}
	Ok(())
}
