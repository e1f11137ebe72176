//! Typed read and write views over a node's backing state.
//!
//! Every view shares the node's backing cell, so a mutation made through a
//! [`WriteView`] is observed by any [`ReadView`] obtained before or after it.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tessera_primitives::{ModelPath, ModelType};

use crate::error::ViewError;

/// Type-erased view handed across the [`crate::ModelProjection`] boundary.
///
/// Always an `Arc<RwLock<T>>` for the type the projection was asked for.
pub type ErasedView = Arc<dyn Any + Send + Sync>;

/// Erases a backing cell so it can be returned from a projection.
pub fn erase<T: Send + Sync + 'static>(cell: Arc<RwLock<T>>) -> ErasedView {
	cell
}

/// Which kind of view a caller asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewAccess {
	ReadOnly,
	Writable,
}

impl fmt::Display for ViewAccess {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::ReadOnly => f.write_str("read-only"),
			Self::Writable => f.write_str("writable"),
		}
	}
}

/// Read access to a node's state as a `T`.
pub struct ReadView<T> {
	path: ModelPath,
	cell: Arc<RwLock<T>>,
}

impl<T> ReadView<T> {
	pub fn path(&self) -> &ModelPath {
		&self.path
	}

	pub fn get(&self) -> RwLockReadGuard<'_, T> {
		self.cell.read()
	}

	pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
		f(&*self.cell.read())
	}

	/// Returns true if both views share the same backing cell.
	pub fn shares_state_with(&self, other: &WriteView<T>) -> bool {
		Arc::ptr_eq(&self.cell, &other.cell)
	}
}

impl<T: Clone> ReadView<T> {
	pub fn cloned(&self) -> T {
		self.cell.read().clone()
	}
}

impl<T> fmt::Debug for ReadView<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ReadView")
			.field("path", &self.path)
			.field("type", &std::any::type_name::<T>())
			.finish()
	}
}

/// Mutable access to a node's state as a `T`.
pub struct WriteView<T> {
	path: ModelPath,
	cell: Arc<RwLock<T>>,
}

impl<T> WriteView<T> {
	pub fn path(&self) -> &ModelPath {
		&self.path
	}

	pub fn get(&self) -> RwLockReadGuard<'_, T> {
		self.cell.read()
	}

	pub fn get_mut(&self) -> RwLockWriteGuard<'_, T> {
		self.cell.write()
	}

	pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
		f(&mut *self.cell.write())
	}

	/// Downgrades to a read view over the same state.
	pub fn read_only(&self) -> ReadView<T> {
		ReadView {
			path: self.path.clone(),
			cell: Arc::clone(&self.cell),
		}
	}
}

impl<T> fmt::Debug for WriteView<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("WriteView")
			.field("path", &self.path)
			.field("type", &std::any::type_name::<T>())
			.finish()
	}
}

fn downcast<T: Send + Sync + 'static>(
	path: &ModelPath,
	erased: ErasedView,
) -> Result<Arc<RwLock<T>>, ViewError> {
	erased
		.downcast::<RwLock<T>>()
		.map_err(|_| ViewError::TypeMismatch {
			path: path.clone(),
			requested: ModelType::of::<T>(),
		})
}

pub(crate) fn typed_read<T: Send + Sync + 'static>(
	path: &ModelPath,
	erased: ErasedView,
) -> Result<ReadView<T>, ViewError> {
	Ok(ReadView {
		path: path.clone(),
		cell: downcast(path, erased)?,
	})
}

pub(crate) fn typed_write<T: Send + Sync + 'static>(
	path: &ModelPath,
	erased: ErasedView,
) -> Result<WriteView<T>, ViewError> {
	Ok(WriteView {
		path: path.clone(),
		cell: downcast(path, erased)?,
	})
}
