use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tessera_primitives::ModelType;

use super::ModelProjection;
use crate::node::ModelNode;
use crate::view::{ErasedView, erase};

type DeriveFn<S, T> = dyn Fn(&S) -> T + Send + Sync;

/// Read-only view of a `T` computed from backing state `S`.
///
/// The value is computed each time a view is requested; the returned view
/// does not track later changes to `S`.
pub struct DerivedProjection<S, T> {
	derive: Box<DeriveFn<S, T>>,
}

impl<S, T> DerivedProjection<S, T>
where
	S: Send + Sync + 'static,
	T: Send + Sync + 'static,
{
	pub fn new(derive: impl Fn(&S) -> T + Send + Sync + 'static) -> Self {
		Self {
			derive: Box::new(derive),
		}
	}
}

impl<S, T> ModelProjection for DerivedProjection<S, T>
where
	S: Send + Sync + 'static,
	T: Send + Sync + 'static,
{
	fn can_be_viewed_as_read_only(&self, ty: ModelType) -> bool {
		ty.is::<T>()
	}

	fn can_be_viewed_as_writable(&self, _ty: ModelType) -> bool {
		false
	}

	fn as_read_only(&self, ty: ModelType, node: &ModelNode) -> Option<ErasedView> {
		if !ty.is::<T>() {
			return None;
		}
		let source = node.private_data::<S>()?;
		let value = (self.derive)(&*source.read());
		Some(erase(Arc::new(RwLock::new(value))))
	}

	fn as_writable(&self, _ty: ModelType, _node: &ModelNode) -> Option<ErasedView> {
		None
	}

	fn readable_types(&self) -> Vec<ModelType> {
		vec![ModelType::of::<T>()]
	}

	fn writable_types(&self) -> Vec<ModelType> {
		Vec::new()
	}
}

impl<S, T> fmt::Debug for DerivedProjection<S, T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("DerivedProjection")
			.field("from", &std::any::type_name::<S>())
			.field("to", &std::any::type_name::<T>())
			.finish()
	}
}
