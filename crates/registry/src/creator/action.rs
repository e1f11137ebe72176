use std::fmt;
use std::sync::Arc;

use tessera_primitives::RuleDescriptor;

use crate::error::ActionError;
use crate::node::MutableModelNode;

type ActionFn = dyn Fn(&mut MutableModelNode<'_>) -> Result<(), ActionError> + Send + Sync;

/// Which of a creator's two action lists an action belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionPhase {
	Registration,
	Creation,
}

impl fmt::Display for ActionPhase {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Registration => f.write_str("registration"),
			Self::Creation => f.write_str("creation"),
		}
	}
}

/// One ordered step run against a materializing node.
#[derive(Clone)]
pub struct InitializerAction {
	descriptor: RuleDescriptor,
	run: Arc<ActionFn>,
}

impl InitializerAction {
	pub fn new<F>(descriptor: RuleDescriptor, run: F) -> Self
	where
		F: Fn(&mut MutableModelNode<'_>) -> Result<(), ActionError> + Send + Sync + 'static,
	{
		Self {
			descriptor,
			run: Arc::new(run),
		}
	}

	/// The rule this action came from; reported when it fails.
	pub fn descriptor(&self) -> &RuleDescriptor {
		&self.descriptor
	}

	pub(crate) fn execute(&self, node: &mut MutableModelNode<'_>) -> Result<(), ActionError> {
		(self.run)(node)
	}
}

impl fmt::Debug for InitializerAction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("InitializerAction")
			.field("descriptor", &self.descriptor)
			.finish_non_exhaustive()
	}
}
