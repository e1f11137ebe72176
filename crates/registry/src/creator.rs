//! Creators: the declaration that a path can be materialized.
//!
//! A creator carries two fixed action lists and a projection list that other
//! rules may extend until the node is realized. Registration actions always end
//! with a synthetic step that stamps the node's hidden flag, so user
//! registration actions never observe the final value.

use std::fmt;
use std::sync::Arc;

use tessera_primitives::{ModelPath, RuleDescriptor};

use crate::error::{ActionError, FrozenCreatorError};
use crate::node::MutableModelNode;
use crate::projection::{
	ChainingProjection, ModelAdapter, ModelProjection, ModelPromise, ProjectionList, ProjectionRef,
};

mod action;

pub use action::{ActionPhase, InitializerAction};

/// Declaration of how a path's node will be produced.
pub struct ModelCreator {
	path: ModelPath,
	descriptor: RuleDescriptor,
	ephemeral: bool,
	declared_hidden: Option<bool>,
	registration_actions: Box<[InitializerAction]>,
	creation_actions: Box<[InitializerAction]>,
	projections: Arc<ProjectionList>,
	projection: ChainingProjection,
}

impl ModelCreator {
	pub fn builder(path: ModelPath, descriptor: impl Into<RuleDescriptor>) -> ModelCreatorBuilder {
		ModelCreatorBuilder {
			path,
			descriptor: descriptor.into(),
			ephemeral: false,
			hidden: None,
			projections: Vec::new(),
			registration_actions: Vec::new(),
			creation_actions: Vec::new(),
		}
	}

	pub fn path(&self) -> &ModelPath {
		&self.path
	}

	pub fn descriptor(&self) -> &RuleDescriptor {
		&self.descriptor
	}

	/// Recorded for the scheduler; the registry itself does not act on it.
	pub fn is_ephemeral(&self) -> bool {
		self.ephemeral
	}

	/// The hidden flag stamped by the synthetic registration action, if declared.
	pub fn declared_hidden(&self) -> Option<bool> {
		self.declared_hidden
	}

	pub fn registration_actions(&self) -> &[InitializerAction] {
		&self.registration_actions
	}

	pub fn creation_actions(&self) -> &[InitializerAction] {
		&self.creation_actions
	}

	/// Appends a projection. Later projections only win for types no earlier one claims.
	pub fn add_projection<P: ModelProjection>(&self, projection: P) -> Result<(), FrozenCreatorError> {
		self.add_shared_projection(Arc::new(projection))
	}

	pub fn add_shared_projection(&self, projection: ProjectionRef) -> Result<(), FrozenCreatorError> {
		self.projections
			.push(projection)
			.map_err(|_| FrozenCreatorError {
				path: self.path.clone(),
			})
	}

	pub fn is_frozen(&self) -> bool {
		self.projections.is_frozen()
	}

	pub(crate) fn freeze(&self) -> usize {
		self.projections.freeze().len()
	}

	pub fn projection(&self) -> &ChainingProjection {
		&self.projection
	}

	pub fn promise(&self) -> &dyn ModelPromise {
		&self.projection
	}

	pub fn adapter(&self) -> &dyn ModelAdapter {
		&self.projection
	}
}

impl fmt::Debug for ModelCreator {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ModelCreator")
			.field("path", &self.path)
			.field("descriptor", &self.descriptor)
			.field("ephemeral", &self.ephemeral)
			.field("declared_hidden", &self.declared_hidden)
			.field("registration_actions", &self.registration_actions.len())
			.field("creation_actions", &self.creation_actions.len())
			.field("projection", &self.projection)
			.finish()
	}
}

/// Builder for [`ModelCreator`].
pub struct ModelCreatorBuilder {
	path: ModelPath,
	descriptor: RuleDescriptor,
	ephemeral: bool,
	hidden: Option<bool>,
	projections: Vec<ProjectionRef>,
	registration_actions: Vec<InitializerAction>,
	creation_actions: Vec<InitializerAction>,
}

impl ModelCreatorBuilder {
	pub fn ephemeral(mut self, ephemeral: bool) -> Self {
		self.ephemeral = ephemeral;
		self
	}

	/// Declares the value the synthetic registration action stamps.
	///
	/// Left undeclared, the stamp keeps whatever earlier actions set.
	pub fn hidden(mut self, hidden: bool) -> Self {
		self.hidden = Some(hidden);
		self
	}

	pub fn projection<P: ModelProjection>(mut self, projection: P) -> Self {
		self.projections.push(Arc::new(projection));
		self
	}

	pub fn shared_projection(mut self, projection: ProjectionRef) -> Self {
		self.projections.push(projection);
		self
	}

	pub fn registration_action<F>(self, run: F) -> Self
	where
		F: Fn(&mut MutableModelNode<'_>) -> Result<(), ActionError> + Send + Sync + 'static,
	{
		let descriptor = self.descriptor.clone();
		self.registration_action_with(descriptor, run)
	}

	pub fn registration_action_with<F>(mut self, descriptor: RuleDescriptor, run: F) -> Self
	where
		F: Fn(&mut MutableModelNode<'_>) -> Result<(), ActionError> + Send + Sync + 'static,
	{
		self.registration_actions
			.push(InitializerAction::new(descriptor, run));
		self
	}

	pub fn creation_action<F>(self, run: F) -> Self
	where
		F: Fn(&mut MutableModelNode<'_>) -> Result<(), ActionError> + Send + Sync + 'static,
	{
		let descriptor = self.descriptor.clone();
		self.creation_action_with(descriptor, run)
	}

	pub fn creation_action_with<F>(mut self, descriptor: RuleDescriptor, run: F) -> Self
	where
		F: Fn(&mut MutableModelNode<'_>) -> Result<(), ActionError> + Send + Sync + 'static,
	{
		self.creation_actions
			.push(InitializerAction::new(descriptor, run));
		self
	}

	pub fn build(self) -> ModelCreator {
		let Self {
			path,
			descriptor,
			ephemeral,
			hidden,
			projections,
			mut registration_actions,
			creation_actions,
		} = self;

		registration_actions.push(InitializerAction::new(
			descriptor.clone(),
			move |node: &mut MutableModelNode<'_>| {
				if let Some(hidden) = hidden {
					node.set_hidden(hidden);
				}
				Ok(())
			},
		));

		let projections = Arc::new(ProjectionList::new(projections));
		ModelCreator {
			path,
			descriptor,
			ephemeral,
			declared_hidden: hidden,
			registration_actions: registration_actions.into_boxed_slice(),
			creation_actions: creation_actions.into_boxed_slice(),
			projection: ChainingProjection::new(Arc::clone(&projections)),
			projections,
		}
	}
}

#[cfg(test)]
mod tests;
