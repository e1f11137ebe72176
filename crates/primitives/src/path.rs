use std::fmt;
use std::sync::Arc;

/// Separator between path segments in the textual form.
pub const SEPARATOR: char = '.';

/// Errors produced when a path or path segment fails validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidPathError {
	#[error("model element name cannot be empty (in path '{path}')")]
	EmptySegment { path: String },
	#[error(
		"model element name '{name}' has illegal first character '{ch}' (names must start with an ASCII letter or underscore)"
	)]
	IllegalFirstChar { name: String, ch: char },
	#[error(
		"model element name '{name}' contains illegal character '{ch}' at index {index} (only ASCII letters, digits, underscore and hyphen are allowed)"
	)]
	IllegalChar { name: String, ch: char, index: usize },
}

/// Immutable hierarchical identifier of a model element.
///
/// Equality, hashing and ordering are structural over the segment sequence, so
/// `a` < `a.b` < `a.c` < `b`. Cloning is a reference-count bump.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelPath {
	segments: Arc<[Box<str>]>,
}

impl ModelPath {
	/// Returns the root path (no segments).
	pub fn root() -> Self {
		Self {
			segments: Arc::from(Vec::<Box<str>>::new()),
		}
	}

	/// Parses a `.`-separated path, validating every segment.
	///
	/// The empty string parses to the root path.
	pub fn parse(path: &str) -> Result<Self, InvalidPathError> {
		if path.is_empty() {
			return Ok(Self::root());
		}
		let segments = path
			.split(SEPARATOR)
			.map(|name| {
				if name.is_empty() {
					return Err(InvalidPathError::EmptySegment {
						path: path.to_string(),
					});
				}
				validate_name(name)?;
				Ok(Box::from(name))
			})
			.collect::<Result<Vec<_>, _>>()?;
		Ok(Self {
			segments: Arc::from(segments),
		})
	}

	/// Builds a path from individual segment names.
	pub fn from_segments<I, S>(segments: I) -> Result<Self, InvalidPathError>
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let segments = segments
			.into_iter()
			.map(|name| {
				let name = name.as_ref();
				validate_name(name)?;
				Ok(Box::from(name))
			})
			.collect::<Result<Vec<_>, InvalidPathError>>()?;
		Ok(Self {
			segments: Arc::from(segments),
		})
	}

	/// Returns a new path with `name` appended.
	pub fn child(&self, name: &str) -> Result<Self, InvalidPathError> {
		validate_name(name)?;
		let mut segments = self.segments.to_vec();
		segments.push(Box::from(name));
		Ok(Self {
			segments: Arc::from(segments),
		})
	}

	/// Returns the parent path, or `None` for the root.
	pub fn parent(&self) -> Option<Self> {
		let (_, init) = self.segments.split_last()?;
		Some(Self {
			segments: Arc::from(init),
		})
	}

	/// Returns the last segment, or `None` for the root.
	pub fn name(&self) -> Option<&str> {
		self.segments.last().map(|s| &**s)
	}

	/// Returns the segment names in order.
	pub fn segments(&self) -> impl ExactSizeIterator<Item = &str> + '_ {
		self.segments.iter().map(|s| &**s)
	}

	/// Number of segments; the root has depth zero.
	pub fn depth(&self) -> usize {
		self.segments.len()
	}

	pub fn is_root(&self) -> bool {
		self.segments.is_empty()
	}

	/// Returns true if `self` is a strict prefix of `other`.
	pub fn is_ancestor_of(&self, other: &ModelPath) -> bool {
		self.depth() < other.depth() && other.segments.starts_with(&self.segments)
	}

	/// Returns true if `other` is a strict prefix of `self`.
	pub fn is_descendant_of(&self, other: &ModelPath) -> bool {
		other.is_ancestor_of(self)
	}

	/// Returns true if `self` sits exactly one level below `parent`.
	pub fn is_direct_child_of(&self, parent: &ModelPath) -> bool {
		self.depth() == parent.depth() + 1 && self.segments.starts_with(&parent.segments)
	}

	/// Iterates over strict ancestors, nearest first, ending with the root.
	pub fn ancestors(&self) -> impl Iterator<Item = ModelPath> + '_ {
		(0..self.depth()).rev().map(|len| Self {
			segments: Arc::from(&self.segments[..len]),
		})
	}
}

/// Validates a single path segment.
pub fn validate_name(name: &str) -> Result<(), InvalidPathError> {
	let mut chars = name.chars();
	let Some(first) = chars.next() else {
		return Err(InvalidPathError::EmptySegment {
			path: name.to_string(),
		});
	};
	if !(first.is_ascii_alphabetic() || first == '_') {
		return Err(InvalidPathError::IllegalFirstChar {
			name: name.to_string(),
			ch: first,
		});
	}
	for (index, ch) in name.char_indices().skip(1) {
		if !(ch.is_ascii_alphanumeric() || ch == '_' || ch == '-') {
			return Err(InvalidPathError::IllegalChar {
				name: name.to_string(),
				ch,
				index,
			});
		}
	}
	Ok(())
}

impl fmt::Display for ModelPath {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.is_root() {
			return f.write_str("<root>");
		}
		for (i, segment) in self.segments.iter().enumerate() {
			if i > 0 {
				write!(f, "{SEPARATOR}")?;
			}
			f.write_str(segment)?;
		}
		Ok(())
	}
}

impl fmt::Debug for ModelPath {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "ModelPath({self})")
	}
}

impl std::str::FromStr for ModelPath {
	type Err = InvalidPathError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}
