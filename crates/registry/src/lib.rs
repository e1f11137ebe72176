//! Lazy, rule-driven model registry.
//!
//! Rules register a [`ModelCreator`] per [`ModelPath`]: a list of registration
//! actions, a list of creation actions, and a growing list of typed projections.
//! Nothing runs until someone calls [`ModelRegistry::materialize`]; the node is
//! then built exactly once and viewed through its projections.
//!
//! # Modules
//!
//! - [`creator`] - Creators, their builder and initializer actions
//! - [`projection`] - The projection trait, provided projections and the chaining dispatcher
//! - [`node`] - Realized nodes and the mutable handle actions work on
//! - [`view`] - Typed read/write views over a node's backing state
//! - [`registry`] - The path index and materialization state machine
//! - [`config`] - Registry tunables loaded from TOML
//! - [`error`] - Error types
//!
//! # Example
//!
//! ```
//! use tessera_registry::{ModelCreator, ModelPath, ModelRegistry, UnmanagedProjection};
//!
//! let registry = ModelRegistry::default();
//! let path = ModelPath::parse("tasks.compile").unwrap();
//! registry
//! 	.register(
//! 		ModelCreator::builder(path.clone(), "CompileRules#tasks")
//! 			.projection(UnmanagedProjection::<Vec<String>>::new())
//! 			.creation_action(|node| {
//! 				node.set_private_data(Vec::<String>::new());
//! 				Ok(())
//! 			})
//! 			.build(),
//! 	)
//! 	.unwrap();
//!
//! let node = registry.materialize(&path).unwrap();
//! node.as_writable::<Vec<String>>().unwrap().update(|args| args.push("-O2".into()));
//! assert_eq!(node.as_read_only::<Vec<String>>().unwrap().cloned(), ["-O2"]);
//! ```

pub mod config;
pub mod creator;
pub mod error;
pub mod node;
pub mod projection;
pub mod registry;
pub mod view;

pub use config::{ConfigError, RegistryConfig};
pub use creator::{ActionPhase, InitializerAction, ModelCreator, ModelCreatorBuilder};
pub use error::{
	ActionError, ConflictingCreatorError, CycleError, CycleLink, FrozenCreatorError,
	InitializerActionError, MaterializationError, NoViewAvailableError, ViewError,
};
pub use node::{ModelNode, MutableModelNode, NodeHandle};
pub use projection::{
	ChainingProjection, DerivedProjection, ModelAdapter, ModelProjection, ModelPromise,
	ProjectionRef, UnmanagedProjection,
};
pub use registry::{ModelEntry, ModelRegistry, NodeStatus};
pub use tessera_primitives::{InvalidPathError, ModelPath, ModelType, RuleDescriptor};
pub use view::{ErasedView, ReadView, ViewAccess, WriteView, erase};
