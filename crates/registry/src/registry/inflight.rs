//! Bookkeeping for in-progress materializations.
//!
//! Each thread keeps the stack of paths it is currently materializing, and a
//! thread blocked on another thread's node records the path it waits for. A
//! request closes a cycle when following owner → waited-for path → owner
//! leads back to the requesting thread.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread::ThreadId;

use rustc_hash::{FxHashMap, FxHashSet};
use tessera_primitives::ModelPath;

use crate::creator::ModelCreator;
use crate::error::{CycleError, CycleLink, MaterializationError};
use crate::node::NodeHandle;

pub(crate) enum SlotState {
	Registered,
	Materializing { owner: ThreadId },
	Realized(NodeHandle),
	Failed(MaterializationError),
}

pub(crate) struct Slot {
	pub(crate) creator: Arc<ModelCreator>,
	pub(crate) state: SlotState,
}

impl Slot {
	pub(crate) fn new(creator: Arc<ModelCreator>) -> Self {
		Self {
			creator,
			state: SlotState::Registered,
		}
	}

	/// Realized flag once realized, the declared flag before.
	pub(crate) fn is_hidden(&self) -> bool {
		match &self.state {
			SlotState::Realized(node) => node.is_hidden(),
			_ => self.creator.declared_hidden().unwrap_or(false),
		}
	}
}

#[derive(Default)]
pub(crate) struct RegistryState {
	pub(crate) slots: BTreeMap<ModelPath, Slot>,
	stacks: FxHashMap<ThreadId, Vec<ModelPath>>,
	waiting: FxHashMap<ThreadId, ModelPath>,
}

impl RegistryState {
	pub(crate) fn depth(&self, thread: ThreadId) -> usize {
		self.stacks.get(&thread).map_or(0, Vec::len)
	}

	pub(crate) fn enter(&mut self, thread: ThreadId, path: &ModelPath) {
		self.stacks.entry(thread).or_default().push(path.clone());
	}

	pub(crate) fn leave(&mut self, thread: ThreadId, path: &ModelPath) {
		let Some(stack) = self.stacks.get_mut(&thread) else {
			return;
		};
		debug_assert_eq!(stack.last(), Some(path));
		if let Some(pos) = stack.iter().rposition(|p| p == path) {
			stack.remove(pos);
		}
		if stack.is_empty() {
			self.stacks.remove(&thread);
		}
	}

	pub(crate) fn begin_wait(&mut self, thread: ThreadId, path: &ModelPath) {
		self.waiting.insert(thread, path.clone());
	}

	pub(crate) fn end_wait(&mut self, thread: ThreadId) {
		self.waiting.remove(&thread);
	}

	fn owner(&self, path: &ModelPath) -> Option<ThreadId> {
		match self.slots.get(path)?.state {
			SlotState::Materializing { owner } => Some(owner),
			_ => None,
		}
	}

	/// The cycle `requester` would close by waiting on `requested`, if any.
	///
	/// `requested` must currently be materializing.
	pub(crate) fn find_cycle(&self, requester: ThreadId, requested: &ModelPath) -> Option<CycleError> {
		let mut segments: Vec<&[ModelPath]> = Vec::new();
		let mut visited = FxHashSet::default();
		let mut target = requested;

		loop {
			let owner = self.owner(target)?;
			if !visited.insert(owner) {
				// A wait loop that does not pass through the requester.
				return None;
			}
			let stack = self.stacks.get(&owner)?;
			let pos = stack.iter().position(|p| p == target)?;
			segments.push(&stack[pos..]);
			if owner == requester {
				break;
			}
			target = self.waiting.get(&owner)?;
		}

		// The requester's own segment ends with the request, so it leads.
		segments.rotate_right(1);
		let mut paths: Vec<&ModelPath> = segments.into_iter().flatten().collect();
		let first = *paths.first()?;
		paths.push(first);

		let links = paths
			.into_iter()
			.map(|path| CycleLink {
				path: path.clone(),
				descriptor: self
					.slots
					.get(path)
					.map(|slot| slot.creator.descriptor().clone())
					.unwrap_or_else(|| "<unknown>".into()),
			})
			.collect();
		Some(CycleError { links })
	}
}
