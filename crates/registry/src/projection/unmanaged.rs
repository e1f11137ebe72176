use std::fmt;
use std::marker::PhantomData;

use tessera_primitives::ModelType;

use super::ModelProjection;
use crate::node::ModelNode;
use crate::view::{ErasedView, erase};

/// Views a node's backing state directly as `T`.
///
/// Read and write views share the node's cell, so writes are visible to
/// every reader.
pub struct UnmanagedProjection<T> {
	writable: bool,
	_marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> UnmanagedProjection<T> {
	/// Read and write access.
	pub fn new() -> Self {
		Self {
			writable: true,
			_marker: PhantomData,
		}
	}

	/// Read access only; write requests for `T` fall through to later projections.
	pub fn read_only() -> Self {
		Self {
			writable: false,
			_marker: PhantomData,
		}
	}

	fn view(node: &ModelNode) -> Option<ErasedView> {
		node.private_data::<T>().map(erase)
	}
}

impl<T: Send + Sync + 'static> Default for UnmanagedProjection<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T: Send + Sync + 'static> ModelProjection for UnmanagedProjection<T> {
	fn can_be_viewed_as_read_only(&self, ty: ModelType) -> bool {
		ty.is::<T>()
	}

	fn can_be_viewed_as_writable(&self, ty: ModelType) -> bool {
		self.writable && ty.is::<T>()
	}

	fn as_read_only(&self, ty: ModelType, node: &ModelNode) -> Option<ErasedView> {
		self.can_be_viewed_as_read_only(ty).then(|| Self::view(node))?
	}

	fn as_writable(&self, ty: ModelType, node: &ModelNode) -> Option<ErasedView> {
		self.can_be_viewed_as_writable(ty).then(|| Self::view(node))?
	}

	fn readable_types(&self) -> Vec<ModelType> {
		vec![ModelType::of::<T>()]
	}

	fn writable_types(&self) -> Vec<ModelType> {
		if self.writable {
			vec![ModelType::of::<T>()]
		} else {
			Vec::new()
		}
	}
}

impl<T> fmt::Debug for UnmanagedProjection<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("UnmanagedProjection")
			.field("type", &std::any::type_name::<T>())
			.field("writable", &self.writable)
			.finish()
	}
}
