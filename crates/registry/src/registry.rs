#![cfg_attr(doc, allow(rustdoc::private_intra_doc_links))]
//! The model registry: path index, node state machine and single-flight
//! materialization.
//!
//! # Mental Model
//!
//! 1. **Registration:** [`ModelRegistry::register`] stores a [`ModelCreator`] under its path.
//!    Nothing runs yet; other rules may keep appending projections to the creator.
//! 2. **Materialization:** the first [`ModelRegistry::materialize`] for a path claims it, runs
//!    the registration actions then the creation actions with no registry lock held, freezes
//!    the projection list and publishes the node (or the failure).
//! 3. **Consumption:** every later call returns the same [`NodeHandle`] or a clone of the same
//!    [`MaterializationError`]. Views are resolved on the node through its projections.
//!
//! # State Machine
//!
//! `Unregistered → Registered → Materializing → Realized | Failed`. Realized and Failed are
//! terminal.
//!
//! # Concurrency
//!
//! - **Index:** one mutex over the slot map and the in-flight bookkeeping. It is never held
//!   while user actions run.
//! - **Waiting:** a thread that finds a node materializing elsewhere parks on a condition
//!   variable until that node settles.
//! - **Projection lists:** lock-free (CAS publication inside each creator).
//!
//! # Invariants
//!
//! - A path has at most one creator.
//!   - Enforced in: [`ModelRegistry::register`]
//!   - Tested by: [`crate::registry::invariants::test_duplicate_registration_conflicts`]
//!   - Failure symptom: Two rules silently race to define the same element.
//!
//! - A node's pipeline runs at most once, and every caller observes the same outcome.
//!   - Enforced in: [`ModelRegistry::materialize`] (claim under lock, waiters park on `settled`).
//!   - Tested by: [`crate::registry::invariants::test_single_flight_materialization`],
//!     [`crate::registry::invariants::test_single_flight_failure`]
//!   - Failure symptom: Initializer side effects applied twice; callers see different nodes.
//!
//! - Realized and Failed are terminal; a failure is re-delivered verbatim.
//!   - Enforced in: [`ModelRegistry::materialize`] (terminal slots return early).
//!   - Tested by: [`crate::registry::invariants::test_failure_is_cached`]
//!   - Failure symptom: A failed node is retried and half-applies its actions.
//!
//! - The projection list is frozen before the node leaves Materializing.
//!   - Enforced in: `ModelRegistry::settle`
//!   - Tested by: [`crate::registry::invariants::test_add_projection_after_realization_fails`]
//!   - Failure symptom: A realized node's view surface changes under its readers.
//!
//! - Re-entrant materialization that closes a loop fails fast on every path of the loop.
//!   - Enforced in: `RegistryState::find_cycle`, `ModelRegistry::action_failure`
//!   - Tested by: [`crate::registry::invariants::test_same_thread_cycle`],
//!     [`crate::registry::invariants::test_cross_thread_cycle`]
//!   - Failure symptom: Deadlock or unbounded recursion.
//!
//! - A panicking action fails the node and releases its waiters.
//!   - Enforced in: `InFlight::drop`
//!   - Tested by: [`crate::registry::invariants::test_panic_fails_node`],
//!     [`crate::registry::invariants::test_panic_releases_waiters`]
//!   - Failure symptom: Waiters block forever on a node that will never settle.

use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::{Condvar, Mutex};
use tessera_primitives::ModelPath;

use crate::config::RegistryConfig;
use crate::creator::{ActionPhase, InitializerAction, ModelCreator};
use crate::error::{
	ActionError, ConflictingCreatorError, InitializerActionError, MaterializationError,
};
use crate::node::{ModelNode, MutableModelNode, NodeDraft, NodeHandle};

mod inflight;

use inflight::{RegistryState, Slot, SlotState};

/// What the registry currently holds for a path.
#[derive(Debug, Clone)]
pub enum ModelEntry {
	/// Registered or materializing; not realized yet.
	Creator(Arc<ModelCreator>),
	Node(NodeHandle),
	Failed(MaterializationError),
}

/// Lifecycle state of a registered path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeStatus {
	Registered,
	Materializing,
	Realized,
	Failed,
}

/// Owns every creator and node of one model.
pub struct ModelRegistry {
	config: RegistryConfig,
	state: Mutex<RegistryState>,
	settled: Condvar,
}

impl Default for ModelRegistry {
	fn default() -> Self {
		Self::new(RegistryConfig::default())
	}
}

impl std::fmt::Debug for ModelRegistry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ModelRegistry")
			.field("label", &self.config.label)
			.field("len", &self.len())
			.finish()
	}
}

impl ModelRegistry {
	pub fn new(config: RegistryConfig) -> Self {
		Self {
			config,
			state: Mutex::new(RegistryState::default()),
			settled: Condvar::new(),
		}
	}

	pub fn config(&self) -> &RegistryConfig {
		&self.config
	}

	/// Registers a creator under its path.
	///
	/// Returns the shared creator so other rules can keep adding projections.
	pub fn register(
		&self,
		creator: ModelCreator,
	) -> Result<Arc<ModelCreator>, ConflictingCreatorError> {
		let creator = Arc::new(creator);
		let mut state = self.state.lock();
		if let Some(existing) = state.slots.get(creator.path()) {
			tracing::debug!(
				registry = %self.config.label,
				path = %creator.path(),
				existing = %existing.creator.descriptor(),
				incoming = %creator.descriptor(),
				"conflicting model registration"
			);
			return Err(ConflictingCreatorError {
				path: creator.path().clone(),
				existing: existing.creator.descriptor().clone(),
				incoming: creator.descriptor().clone(),
			});
		}
		state
			.slots
			.insert(creator.path().clone(), Slot::new(Arc::clone(&creator)));
		Ok(creator)
	}

	/// Never creates state.
	pub fn lookup(&self, path: &ModelPath) -> Option<ModelEntry> {
		let state = self.state.lock();
		let slot = state.slots.get(path)?;
		Some(match &slot.state {
			SlotState::Registered | SlotState::Materializing { .. } => {
				ModelEntry::Creator(Arc::clone(&slot.creator))
			}
			SlotState::Realized(node) => ModelEntry::Node(Arc::clone(node)),
			SlotState::Failed(err) => ModelEntry::Failed(err.clone()),
		})
	}

	pub fn creator(&self, path: &ModelPath) -> Option<Arc<ModelCreator>> {
		let state = self.state.lock();
		state.slots.get(path).map(|slot| Arc::clone(&slot.creator))
	}

	/// `None` means the path is not registered.
	pub fn status(&self, path: &ModelPath) -> Option<NodeStatus> {
		let state = self.state.lock();
		Some(match state.slots.get(path)?.state {
			SlotState::Registered => NodeStatus::Registered,
			SlotState::Materializing { .. } => NodeStatus::Materializing,
			SlotState::Realized(_) => NodeStatus::Realized,
			SlotState::Failed(_) => NodeStatus::Failed,
		})
	}

	/// Every registered path, in path order.
	pub fn paths(&self) -> Vec<ModelPath> {
		self.state.lock().slots.keys().cloned().collect()
	}

	/// Registered direct children of `parent`, in path order.
	///
	/// Hidden children are left out unless [`RegistryConfig::list_hidden`] is set.
	pub fn children(&self, parent: &ModelPath) -> Vec<ModelPath> {
		self.collect_children(parent, self.config.list_hidden)
	}

	/// Registered direct children of `parent`, hidden ones included.
	pub fn all_children(&self, parent: &ModelPath) -> Vec<ModelPath> {
		self.collect_children(parent, true)
	}

	fn collect_children(&self, parent: &ModelPath, include_hidden: bool) -> Vec<ModelPath> {
		let state = self.state.lock();
		// Descendants sort directly after their ancestor.
		state
			.slots
			.range(parent.clone()..)
			.skip_while(|(path, _)| *path == parent)
			.take_while(|(path, _)| path.is_descendant_of(parent))
			.filter(|(path, slot)| {
				path.is_direct_child_of(parent) && (include_hidden || !slot.is_hidden())
			})
			.map(|(path, _)| path.clone())
			.collect()
	}

	pub fn len(&self) -> usize {
		self.state.lock().slots.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Realizes the node at `path`, running its pipeline on first access.
	///
	/// Blocks while another thread materializes the same node. A request that
	/// would wait on itself, directly or through other threads, fails with
	/// [`MaterializationError::Cycle`].
	pub fn materialize(&self, path: &ModelPath) -> Result<NodeHandle, MaterializationError> {
		let me = thread::current().id();
		let creator = {
			let mut state = self.state.lock();
			loop {
				let Some(slot) = state.slots.get(path) else {
					return Err(MaterializationError::UnknownPath { path: path.clone() });
				};
				match &slot.state {
					SlotState::Realized(node) => return Ok(Arc::clone(node)),
					SlotState::Failed(err) => return Err(err.clone()),
					SlotState::Registered => {
						let creator = Arc::clone(&slot.creator);
						let depth = state.depth(me);
						if depth >= self.config.max_depth {
							tracing::warn!(
								registry = %self.config.label,
								path = %path,
								depth,
								"materialization nesting limit reached"
							);
							return Err(MaterializationError::DepthExceeded {
								path: path.clone(),
								limit: self.config.max_depth,
							});
						}
						if let Some(slot) = state.slots.get_mut(path) {
							slot.state = SlotState::Materializing { owner: me };
						}
						state.enter(me, path);
						break creator;
					}
					SlotState::Materializing { .. } => {
						if let Some(cycle) = state.find_cycle(me, path) {
							tracing::debug!(
								registry = %self.config.label,
								path = %path,
								%cycle,
								"materialization cycle"
							);
							return Err(cycle.into());
						}
						state.begin_wait(me, path);
						self.settled.wait(&mut state);
						state.end_wait(me);
					}
				}
			}
		};

		let in_flight = InFlight {
			registry: self,
			creator: &creator,
			thread: me,
			armed: true,
		};
		let outcome = self.run_pipeline(&creator);
		in_flight.finish(outcome)
	}

	fn run_pipeline(&self, creator: &ModelCreator) -> Result<NodeHandle, MaterializationError> {
		let path = creator.path();
		let span = tracing::debug_span!("materialize", registry = %self.config.label, path = %path);
		let _enter = span.enter();

		let mut draft = NodeDraft::default();
		let phases = [
			(ActionPhase::Registration, creator.registration_actions()),
			(ActionPhase::Creation, creator.creation_actions()),
		];
		{
			let mut node = MutableModelNode::new(self, creator, &mut draft);
			for (phase, actions) in phases {
				for (index, action) in actions.iter().enumerate() {
					tracing::trace!(%phase, index, rule = %action.descriptor(), "running initializer action");
					if let Err(err) = action.execute(&mut node) {
						let err = Self::action_failure(path, phase, index, action, err);
						tracing::warn!(error = %err, "model element failed to materialize");
						return Err(err);
					}
				}
			}
		}

		let node = Arc::new(ModelNode::realize(creator, draft));
		tracing::debug!(
			hidden = node.is_hidden(),
			projections = creator.projection().len(),
			"model element realized"
		);
		Ok(node)
	}

	fn action_failure(
		path: &ModelPath,
		phase: ActionPhase,
		index: usize,
		action: &InitializerAction,
		err: ActionError,
	) -> MaterializationError {
		// Nodes on a cycle report the cycle itself; anything else is wrapped.
		if let ActionError::Materialization(MaterializationError::Cycle(cycle)) = &err
			&& cycle.involves(path)
		{
			return MaterializationError::Cycle(cycle.clone());
		}
		InitializerActionError {
			path: path.clone(),
			descriptor: action.descriptor().clone(),
			phase,
			index,
			source: Arc::new(err),
		}
		.into()
	}

	/// Freezes the creator, publishes the outcome and wakes waiters.
	fn settle(
		&self,
		creator: &ModelCreator,
		thread: ThreadId,
		outcome: &Result<NodeHandle, MaterializationError>,
	) {
		creator.freeze();
		{
			let mut state = self.state.lock();
			state.leave(thread, creator.path());
			if let Some(slot) = state.slots.get_mut(creator.path()) {
				slot.state = match outcome {
					Ok(node) => SlotState::Realized(Arc::clone(node)),
					Err(err) => SlotState::Failed(err.clone()),
				};
			}
		}
		self.settled.notify_all();
	}
}

/// Settles a claimed node even if its pipeline unwinds.
struct InFlight<'a> {
	registry: &'a ModelRegistry,
	creator: &'a ModelCreator,
	thread: ThreadId,
	armed: bool,
}

impl InFlight<'_> {
	fn finish(
		mut self,
		outcome: Result<NodeHandle, MaterializationError>,
	) -> Result<NodeHandle, MaterializationError> {
		self.armed = false;
		self.registry.settle(self.creator, self.thread, &outcome);
		outcome
	}
}

impl Drop for InFlight<'_> {
	fn drop(&mut self) {
		if !self.armed {
			return;
		}
		let path = self.creator.path().clone();
		tracing::warn!(
			registry = %self.registry.config.label,
			path = %path,
			"initializer pipeline panicked"
		);
		let outcome = Err(MaterializationError::Panicked { path });
		self.registry.settle(self.creator, self.thread, &outcome);
	}
}

#[cfg(any(test, doc))]
pub(crate) mod invariants;

#[cfg(test)]
mod tests;
