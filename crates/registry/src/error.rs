//! Error taxonomy for registration, materialization and view resolution.

use std::fmt;
use std::sync::Arc;

use tessera_primitives::{InvalidPathError, ModelPath, ModelType, RuleDescriptor};

use crate::creator::ActionPhase;
use crate::view::ViewAccess;

/// A second creator was registered for a path that already has one.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot register model element '{path}' by {incoming}: already registered by {existing}")]
pub struct ConflictingCreatorError {
	pub path: ModelPath,
	pub existing: RuleDescriptor,
	pub incoming: RuleDescriptor,
}

/// A projection was added after the owning node was realized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot add projection to model element '{path}': element has already been realized")]
pub struct FrozenCreatorError {
	pub path: ModelPath,
}

/// No projection on a node supports the requested type and access.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
	"model element '{path}' cannot be viewed as {access} {requested}; {}",
	describe_offered(.readable, .writable)
)]
pub struct NoViewAvailableError {
	pub path: ModelPath,
	pub requested: ModelType,
	pub access: ViewAccess,
	/// Union of every projection's readable types, first-seen order.
	pub readable: Vec<ModelType>,
	/// Union of every projection's writable types, first-seen order.
	pub writable: Vec<ModelType>,
}

impl NoViewAvailableError {
	/// The types that could have been requested instead for the same access.
	pub fn offered(&self) -> &[ModelType] {
		match self.access {
			ViewAccess::ReadOnly => &self.readable,
			ViewAccess::Writable => &self.writable,
		}
	}
}

fn describe_offered<'a>(readable: &'a [ModelType], writable: &'a [ModelType]) -> DescribeOffered<'a> {
	DescribeOffered { readable, writable }
}

struct DescribeOffered<'a> {
	readable: &'a [ModelType],
	writable: &'a [ModelType],
}

impl fmt::Display for DescribeOffered<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.readable.is_empty() && self.writable.is_empty() {
			return f.write_str("no projections are registered");
		}
		write!(
			f,
			"readable types: [{}]; writable types: [{}]",
			join(self.readable),
			join(self.writable)
		)
	}
}

fn join(types: &[ModelType]) -> String {
	types.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

/// Failure to produce a typed view of a realized node.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ViewError {
	#[error(transparent)]
	NoView(#[from] NoViewAvailableError),
	/// A projection claimed the type but the node carries no backing state for it.
	#[error("model element '{path}' has no backing state to view as {requested}")]
	Uninitialized { path: ModelPath, requested: ModelType },
	/// A projection produced a view of a different type than it claimed.
	#[error("projection for model element '{path}' produced a view that is not a {requested}")]
	TypeMismatch { path: ModelPath, requested: ModelType },
}

/// One step of a materialization cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleLink {
	pub path: ModelPath,
	pub descriptor: RuleDescriptor,
}

/// Re-entrant materialization closed a loop.
///
/// `links` starts and ends with the same path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cycle detected while materializing model elements: {}", DescribeCycle(.links))]
pub struct CycleError {
	pub links: Vec<CycleLink>,
}

impl CycleError {
	pub fn paths(&self) -> impl Iterator<Item = &ModelPath> + '_ {
		self.links.iter().map(|link| &link.path)
	}

	/// Returns true if `path` participates in the cycle.
	pub fn involves(&self, path: &ModelPath) -> bool {
		self.paths().any(|p| p == path)
	}
}

struct DescribeCycle<'a>(&'a [CycleLink]);

impl fmt::Display for DescribeCycle<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for (i, link) in self.0.iter().enumerate() {
			if i > 0 {
				f.write_str(" -> ")?;
			}
			write!(f, "'{}' ({})", link.path, link.descriptor)?;
		}
		Ok(())
	}
}

/// Errors returned by initializer actions.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
	#[error(transparent)]
	Materialization(#[from] MaterializationError),
	#[error(transparent)]
	View(#[from] ViewError),
	#[error(transparent)]
	Frozen(#[from] FrozenCreatorError),
	#[error(transparent)]
	Path(#[from] InvalidPathError),
	#[error("{0}")]
	Message(String),
	#[error("{0}")]
	Other(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ActionError {
	pub fn msg(message: impl Into<String>) -> Self {
		Self::Message(message.into())
	}

	pub fn other(err: impl std::error::Error + Send + Sync + 'static) -> Self {
		Self::Other(Box::new(err))
	}
}

/// An initializer action failed; carries the offending rule and position.
#[derive(Debug, Clone, thiserror::Error)]
#[error("exception thrown while executing model rule: {descriptor} ({phase} action #{index} of '{path}')")]
pub struct InitializerActionError {
	pub path: ModelPath,
	pub descriptor: RuleDescriptor,
	pub phase: ActionPhase,
	pub index: usize,
	pub source: Arc<ActionError>,
}

/// Failure to realize a node. Cached on the node and re-delivered verbatim.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MaterializationError {
	#[error("no model element is registered at '{path}'")]
	UnknownPath { path: ModelPath },
	#[error(transparent)]
	Cycle(#[from] CycleError),
	#[error(transparent)]
	Initializer(#[from] InitializerActionError),
	#[error("materializing '{path}' exceeded the nesting limit of {limit}")]
	DepthExceeded { path: ModelPath, limit: usize },
	#[error("initializer pipeline for '{path}' panicked")]
	Panicked { path: ModelPath },
}

impl MaterializationError {
	pub fn as_cycle(&self) -> Option<&CycleError> {
		match self {
			Self::Cycle(cycle) => Some(cycle),
			_ => None,
		}
	}

	pub fn is_cycle(&self) -> bool {
		self.as_cycle().is_some()
	}
}
