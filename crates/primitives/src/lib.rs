//! Leaf types shared by the model registry: hierarchical paths, rule provenance
//! and runtime type tokens.

/// Opaque provenance tokens attached to rules and actions.
pub mod descriptor;
/// Runtime type tokens used for capability-by-type dispatch.
pub mod model_type;
/// Hierarchical model paths.
pub mod path;

pub use descriptor::RuleDescriptor;
pub use model_type::ModelType;
pub use path::{InvalidPathError, ModelPath};
