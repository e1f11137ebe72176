//! Realized nodes and the mutable handle initializer actions work on.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tessera_primitives::{ModelPath, ModelType, RuleDescriptor};

use crate::creator::ModelCreator;
use crate::error::{FrozenCreatorError, MaterializationError, ViewError};
use crate::projection::{ChainingProjection, ModelAdapter, ModelProjection, ModelPromise};
use crate::registry::ModelRegistry;
use crate::view::{self, ErasedView, ReadView, WriteView};

/// Shared handle to a realized node.
pub type NodeHandle = Arc<ModelNode>;

/// A node's backing state: a single typed cell.
#[derive(Clone)]
pub(crate) struct PrivateData {
	ty: ModelType,
	cell: ErasedView,
}

impl PrivateData {
	pub(crate) fn new<T: Send + Sync + 'static>(value: T) -> Self {
		Self {
			ty: ModelType::of::<T>(),
			cell: view::erase(Arc::new(RwLock::new(value))),
		}
	}

	fn get<T: Send + Sync + 'static>(&self) -> Option<Arc<RwLock<T>>> {
		if !self.ty.is::<T>() {
			return None;
		}
		Arc::clone(&self.cell).downcast::<RwLock<T>>().ok()
	}
}

/// State accumulated while the initializer pipeline runs.
#[derive(Default)]
pub(crate) struct NodeDraft {
	pub(crate) hidden: bool,
	pub(crate) private_data: Option<PrivateData>,
}

/// The realized form of a [`ModelCreator`].
///
/// Never mutated by the registry after realization; state changes go through
/// the views its projections hand out.
pub struct ModelNode {
	path: ModelPath,
	descriptor: RuleDescriptor,
	ephemeral: bool,
	hidden: bool,
	private_data: Option<PrivateData>,
	projection: ChainingProjection,
}

impl ModelNode {
	pub(crate) fn realize(creator: &ModelCreator, draft: NodeDraft) -> Self {
		Self {
			path: creator.path().clone(),
			descriptor: creator.descriptor().clone(),
			ephemeral: creator.is_ephemeral(),
			hidden: draft.hidden,
			private_data: draft.private_data,
			projection: creator.projection().clone(),
		}
	}

	pub fn path(&self) -> &ModelPath {
		&self.path
	}

	pub fn descriptor(&self) -> &RuleDescriptor {
		&self.descriptor
	}

	pub fn is_ephemeral(&self) -> bool {
		self.ephemeral
	}

	/// Hidden nodes are left out of default listings but still resolve by path.
	pub fn is_hidden(&self) -> bool {
		self.hidden
	}

	pub fn private_data_type(&self) -> Option<ModelType> {
		self.private_data.as_ref().map(|data| data.ty)
	}

	/// The backing cell, if the node holds state of type `T`.
	///
	/// Intended for [`ModelProjection`] implementations.
	pub fn private_data<T: Send + Sync + 'static>(&self) -> Option<Arc<RwLock<T>>> {
		self.private_data.as_ref()?.get::<T>()
	}

	pub fn promise(&self) -> &dyn ModelPromise {
		&self.projection
	}

	pub fn adapter(&self) -> &dyn ModelAdapter {
		&self.projection
	}

	pub fn as_read_only<T: Send + Sync + 'static>(&self) -> Result<ReadView<T>, ViewError> {
		let erased = self.projection.as_read_only(ModelType::of::<T>(), self)?;
		view::typed_read(&self.path, erased)
	}

	pub fn as_writable<T: Send + Sync + 'static>(&self) -> Result<WriteView<T>, ViewError> {
		let erased = self.projection.as_writable(ModelType::of::<T>(), self)?;
		view::typed_write(&self.path, erased)
	}
}

impl fmt::Debug for ModelNode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ModelNode")
			.field("path", &self.path)
			.field("descriptor", &self.descriptor)
			.field("ephemeral", &self.ephemeral)
			.field("hidden", &self.hidden)
			.field("private_data", &self.private_data_type())
			.field("projection", &self.projection)
			.finish()
	}
}

/// Mutable handle passed to initializer actions while a node materializes.
pub struct MutableModelNode<'a> {
	registry: &'a ModelRegistry,
	creator: &'a ModelCreator,
	draft: &'a mut NodeDraft,
}

impl<'a> MutableModelNode<'a> {
	pub(crate) fn new(
		registry: &'a ModelRegistry,
		creator: &'a ModelCreator,
		draft: &'a mut NodeDraft,
	) -> Self {
		Self {
			registry,
			creator,
			draft,
		}
	}

	pub fn path(&self) -> &ModelPath {
		self.creator.path()
	}

	/// Descriptor of the rule that registered this node.
	pub fn descriptor(&self) -> &RuleDescriptor {
		self.creator.descriptor()
	}

	pub fn is_hidden(&self) -> bool {
		self.draft.hidden
	}

	pub fn set_hidden(&mut self, hidden: bool) {
		self.draft.hidden = hidden;
	}

	pub fn private_data_type(&self) -> Option<ModelType> {
		self.draft.private_data.as_ref().map(|data| data.ty)
	}

	/// Replaces the node's backing state.
	pub fn set_private_data<T: Send + Sync + 'static>(&mut self, value: T) {
		self.draft.private_data = Some(PrivateData::new(value));
	}

	/// Reads the backing state if it is a `T`.
	pub fn with_private_data<T, R>(&self, f: impl FnOnce(&T) -> R) -> Option<R>
	where
		T: Send + Sync + 'static,
	{
		let cell = self.draft.private_data.as_ref()?.get::<T>()?;
		let guard = cell.read();
		Some(f(&*guard))
	}

	/// Mutates the backing state in place if it is a `T`.
	pub fn update_private_data<T, R>(&mut self, f: impl FnOnce(&mut T) -> R) -> Option<R>
	where
		T: Send + Sync + 'static,
	{
		let cell = self.draft.private_data.as_ref()?.get::<T>()?;
		let mut guard = cell.write();
		Some(f(&mut *guard))
	}

	/// Appends a projection to this node's creator before it is frozen.
	pub fn add_projection<P: ModelProjection>(&self, projection: P) -> Result<(), FrozenCreatorError> {
		self.creator.add_projection(projection)
	}

	pub fn registry(&self) -> &'a ModelRegistry {
		self.registry
	}

	/// Materializes another node; re-entrant calls are cycle-checked.
	pub fn materialize(&self, path: &ModelPath) -> Result<NodeHandle, MaterializationError> {
		self.registry.materialize(path)
	}
}
