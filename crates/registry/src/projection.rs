//! Typed projections and the promise/adapter facets built on them.
//!
//! A projection binds requested [`ModelType`]s to logic that produces a read
//! view or accepts a write view of a node's backing state. A node usually has
//! several; [`ChainingProjection`] dispatches to the first one that matches.

use std::sync::Arc;

use tessera_primitives::ModelType;

use crate::error::ViewError;
use crate::node::ModelNode;
use crate::view::ErasedView;

mod chaining;
mod derived;
mod unmanaged;

pub use chaining::ChainingProjection;
pub(crate) use chaining::ProjectionList;
pub use derived::DerivedProjection;
pub use unmanaged::UnmanagedProjection;

/// Strategy mapping requested types to views of a node's state.
///
/// `as_read_only`/`as_writable` are only called after the matching
/// `can_be_viewed_*` predicate returned true for the same type. Returning
/// `None` there means the node lacks the state the projection needs.
pub trait ModelProjection: Send + Sync + 'static {
	fn can_be_viewed_as_read_only(&self, ty: ModelType) -> bool;

	fn can_be_viewed_as_writable(&self, ty: ModelType) -> bool;

	fn as_read_only(&self, ty: ModelType, node: &ModelNode) -> Option<ErasedView>;

	fn as_writable(&self, ty: ModelType, node: &ModelNode) -> Option<ErasedView>;

	/// Every type this projection can produce a read view of.
	fn readable_types(&self) -> Vec<ModelType>;

	/// Every type this projection can produce a write view of.
	fn writable_types(&self) -> Vec<ModelType>;
}

/// Shared handle to a projection.
pub type ProjectionRef = Arc<dyn ModelProjection>;

/// Capability queries that never construct a view.
pub trait ModelPromise {
	fn can_be_viewed_as_read_only(&self, ty: ModelType) -> bool;

	fn can_be_viewed_as_writable(&self, ty: ModelType) -> bool;

	fn readable_types(&self) -> Vec<ModelType>;

	fn writable_types(&self) -> Vec<ModelType>;
}

/// Produces views of a realized node.
///
/// Agrees with the [`ModelPromise`] of the same node: a type the promise
/// reports as viewable resolves to the same projection here.
/// That agreement covers which projection is selected only: a selected
/// projection whose backing state was never written still fails with
/// [`ViewError::Uninitialized`].
pub trait ModelAdapter {
	fn as_read_only(&self, ty: ModelType, node: &ModelNode) -> Result<ErasedView, ViewError>;

	fn as_writable(&self, ty: ModelType, node: &ModelNode) -> Result<ErasedView, ViewError>;
}
