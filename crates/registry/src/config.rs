//! Registry configuration.

use serde::Deserialize;
use thiserror::Error;

/// Errors raised while loading a [`RegistryConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("failed to parse registry config: {0}")]
	Parse(#[from] toml::de::Error),
	#[error("invalid registry config: {0}")]
	Invalid(String),
}

/// Tunables for a [`crate::ModelRegistry`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistryConfig {
	/// Name attached to tracing spans, useful when several registries coexist.
	pub label: String,
	/// Maximum nesting of materializations on one thread.
	pub max_depth: usize,
	/// Whether [`crate::ModelRegistry::children`] includes hidden nodes.
	pub list_hidden: bool,
}

impl Default for RegistryConfig {
	fn default() -> Self {
		Self {
			label: "model".to_string(),
			max_depth: 64,
			list_hidden: false,
		}
	}
}

impl RegistryConfig {
	/// Parses and validates a TOML document. Missing keys take their defaults.
	pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
		let config: Self = toml::from_str(source)?;
		config.validate()?;
		Ok(config)
	}

	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.label.trim().is_empty() {
			return Err(ConfigError::Invalid("label must not be empty".to_string()));
		}
		if self.max_depth == 0 {
			return Err(ConfigError::Invalid(
				"max_depth must be at least 1".to_string(),
			));
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_empty_document_uses_defaults() {
		let config = RegistryConfig::from_toml("").unwrap();
		assert_eq!(config, RegistryConfig::default());
	}

	#[test]
	fn test_partial_document_overrides() {
		let config = RegistryConfig::from_toml("label = \"project\"\nlist_hidden = true\n").unwrap();
		assert_eq!(config.label, "project");
		assert_eq!(config.max_depth, 64);
		assert!(config.list_hidden);
	}

	#[test]
	fn test_unknown_key_rejected() {
		let err = RegistryConfig::from_toml("max_dpeth = 3").unwrap_err();
		assert!(matches!(err, ConfigError::Parse(_)), "{err}");
	}

	#[test]
	fn test_zero_depth_rejected() {
		let err = RegistryConfig::from_toml("max_depth = 0").unwrap_err();
		assert!(matches!(err, ConfigError::Invalid(_)), "{err}");
	}

	#[test]
	fn test_blank_label_rejected() {
		let err = RegistryConfig::from_toml("label = \"  \"").unwrap_err();
		assert!(err.to_string().contains("label"), "{err}");
	}
}
