//! Append-only projection list and the first-match dispatcher over it.
//!
//! # Invariants
//!
//! - Concurrent appends are linearizable; none is lost (CAS publication).
//! - Once frozen, the published list never changes and appends fail.
//! - Queries never lock; they load the current published list.

use std::sync::Arc;

use arc_swap::ArcSwap;
use tessera_primitives::{ModelPath, ModelType};

use super::{ModelAdapter, ModelPromise, ProjectionRef};
use crate::error::{NoViewAvailableError, ViewError};
use crate::node::ModelNode;
use crate::view::{ErasedView, ViewAccess};

/// One published version of the list.
struct ProjectionSet {
	items: Arc<[ProjectionRef]>,
	frozen: bool,
}

/// Growable projection list that is frozen into an immutable snapshot.
pub(crate) struct ProjectionList {
	current: ArcSwap<ProjectionSet>,
}

/// Returned by [`ProjectionList::push`] when the list is already frozen.
pub(crate) struct Frozen;

impl ProjectionList {
	pub(crate) fn new(initial: Vec<ProjectionRef>) -> Self {
		Self {
			current: ArcSwap::from_pointee(ProjectionSet {
				items: Arc::from(initial),
				frozen: false,
			}),
		}
	}

	/// Appends a projection, retrying until the new list is published.
	pub(crate) fn push(&self, projection: ProjectionRef) -> Result<(), Frozen> {
		loop {
			let old = self.current.load_full();
			if old.frozen {
				return Err(Frozen);
			}

			let mut items = Vec::with_capacity(old.items.len() + 1);
			items.extend(old.items.iter().cloned());
			items.push(Arc::clone(&projection));
			let next = Arc::new(ProjectionSet {
				items: Arc::from(items),
				frozen: false,
			});

			let prev = self.current.compare_and_swap(&old, next);
			if Arc::ptr_eq(&prev, &old) {
				return Ok(());
			}
			// Lost the race against another append or the freeze; retry.
		}
	}

	/// Freezes the list and returns the final snapshot. Idempotent.
	pub(crate) fn freeze(&self) -> Arc<[ProjectionRef]> {
		loop {
			let old = self.current.load_full();
			if old.frozen {
				return Arc::clone(&old.items);
			}
			let next = Arc::new(ProjectionSet {
				items: Arc::clone(&old.items),
				frozen: true,
			});
			let prev = self.current.compare_and_swap(&old, next);
			if Arc::ptr_eq(&prev, &old) {
				return Arc::clone(&old.items);
			}
		}
	}

	pub(crate) fn is_frozen(&self) -> bool {
		self.current.load().frozen
	}

	pub(crate) fn snapshot(&self) -> Arc<[ProjectionRef]> {
		Arc::clone(&self.current.load().items)
	}
}

/// First-match dispatcher over a creator's projections.
///
/// Implements both [`ModelPromise`] and [`ModelAdapter`] so the two facets
/// always agree. Reflects the live list until the node is realized.
#[derive(Clone)]
pub struct ChainingProjection {
	list: Arc<ProjectionList>,
}

impl ChainingProjection {
	pub(crate) fn new(list: Arc<ProjectionList>) -> Self {
		Self { list }
	}

	/// Current members in registration order.
	pub fn projections(&self) -> Arc<[ProjectionRef]> {
		self.list.snapshot()
	}

	pub fn len(&self) -> usize {
		self.list.snapshot().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	fn no_view(
		items: &[ProjectionRef],
		path: &ModelPath,
		requested: ModelType,
		access: ViewAccess,
	) -> ViewError {
		NoViewAvailableError {
			path: path.clone(),
			requested,
			access,
			readable: union(items.iter().map(|p| p.readable_types())),
			writable: union(items.iter().map(|p| p.writable_types())),
		}
		.into()
	}

	fn dispatch(
		&self,
		ty: ModelType,
		node: &ModelNode,
		access: ViewAccess,
	) -> Result<ErasedView, ViewError> {
		let items = self.list.snapshot();
		let member = items.iter().find(|p| match access {
			ViewAccess::ReadOnly => p.can_be_viewed_as_read_only(ty),
			ViewAccess::Writable => p.can_be_viewed_as_writable(ty),
		});
		let Some(member) = member else {
			return Err(Self::no_view(&items, node.path(), ty, access));
		};
		let view = match access {
			ViewAccess::ReadOnly => member.as_read_only(ty, node),
			ViewAccess::Writable => member.as_writable(ty, node),
		};
		view.ok_or_else(|| ViewError::Uninitialized {
			path: node.path().clone(),
			requested: ty,
		})
	}
}

/// Concatenates type lists, dropping repeats but keeping first-seen order.
fn union(lists: impl Iterator<Item = Vec<ModelType>>) -> Vec<ModelType> {
	let mut out: Vec<ModelType> = Vec::new();
	for ty in lists.flatten() {
		if !out.contains(&ty) {
			out.push(ty);
		}
	}
	out
}

impl ModelPromise for ChainingProjection {
	fn can_be_viewed_as_read_only(&self, ty: ModelType) -> bool {
		self.list
			.snapshot()
			.iter()
			.any(|p| p.can_be_viewed_as_read_only(ty))
	}

	fn can_be_viewed_as_writable(&self, ty: ModelType) -> bool {
		self.list
			.snapshot()
			.iter()
			.any(|p| p.can_be_viewed_as_writable(ty))
	}

	fn readable_types(&self) -> Vec<ModelType> {
		union(self.list.snapshot().iter().map(|p| p.readable_types()))
	}

	fn writable_types(&self) -> Vec<ModelType> {
		union(self.list.snapshot().iter().map(|p| p.writable_types()))
	}
}

impl ModelAdapter for ChainingProjection {
	fn as_read_only(&self, ty: ModelType, node: &ModelNode) -> Result<ErasedView, ViewError> {
		self.dispatch(ty, node, ViewAccess::ReadOnly)
	}

	fn as_writable(&self, ty: ModelType, node: &ModelNode) -> Result<ErasedView, ViewError> {
		self.dispatch(ty, node, ViewAccess::Writable)
	}
}

impl std::fmt::Debug for ChainingProjection {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ChainingProjection")
			.field("len", &self.len())
			.field("frozen", &self.list.is_frozen())
			.finish()
	}
}
