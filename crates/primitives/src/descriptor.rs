use std::fmt;
use std::sync::Arc;

/// Opaque provenance token identifying the rule that contributed something.
///
/// Only used for diagnostics; the registry never inspects its contents.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleDescriptor(Arc<str>);

impl RuleDescriptor {
	pub fn new(description: impl Into<Arc<str>>) -> Self {
		Self(description.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for RuleDescriptor {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl fmt::Debug for RuleDescriptor {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "RuleDescriptor({:?})", &*self.0)
	}
}

impl From<&str> for RuleDescriptor {
	fn from(s: &str) -> Self {
		Self::new(s)
	}
}

impl From<String> for RuleDescriptor {
	fn from(s: String) -> Self {
		Self::new(s)
	}
}
