use std::any::{Any, TypeId};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Runtime type token passed at call sites to request a typed view.
///
/// Identity is the [`TypeId`]; the name is carried for diagnostics only.
#[derive(Clone, Copy)]
pub struct ModelType {
	id: TypeId,
	name: &'static str,
}

impl ModelType {
	pub fn of<T: Any + ?Sized>() -> Self {
		Self {
			id: TypeId::of::<T>(),
			name: std::any::type_name::<T>(),
		}
	}

	pub fn type_id(&self) -> TypeId {
		self.id
	}

	/// Fully qualified type name as reported by the compiler.
	pub fn name(&self) -> &'static str {
		self.name
	}

	/// Type name with the module path stripped, e.g. `CompileOptions`.
	///
	/// Generic types keep their full name since their arguments carry paths too.
	pub fn simple_name(&self) -> &'static str {
		if self.name.contains('<') {
			return self.name;
		}
		self.name.rsplit("::").next().unwrap_or(self.name)
	}

	pub fn is<T: Any + ?Sized>(&self) -> bool {
		self.id == TypeId::of::<T>()
	}
}

impl PartialEq for ModelType {
	fn eq(&self, other: &Self) -> bool {
		self.id == other.id
	}
}

impl Eq for ModelType {}

impl Hash for ModelType {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.id.hash(state);
	}
}

impl PartialOrd for ModelType {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for ModelType {
	fn cmp(&self, other: &Self) -> Ordering {
		self.name.cmp(other.name).then_with(|| self.id.cmp(&other.id))
	}
}

impl fmt::Display for ModelType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.simple_name())
	}
}

impl fmt::Debug for ModelType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "ModelType({})", self.name)
	}
}
