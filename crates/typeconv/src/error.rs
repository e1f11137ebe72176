use thiserror::Error;

use crate::scalar::ScalarType;

/// Failure to turn a textual notation into a scalar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
	/// The notation or target type cannot be handled at all.
	#[error("{0}")]
	Unsupported(String),
	#[error("Cannot coerce string value '{value}' to type {ty}")]
	Coercion { value: String, ty: ScalarType },
	#[error("Cannot coerce string value '{value}' with length {len} to type {ty}")]
	Length {
		value: String,
		len: usize,
		ty: ScalarType,
	},
	#[error(
		"Cannot convert string value '{value}' to an enum value of type '{ty}' (valid case insensitive values: {candidates})"
	)]
	UnknownVariant {
		value: String,
		ty: &'static str,
		candidates: String,
	},
}

impl ConversionError {
	pub(crate) fn null_to_primitive() -> Self {
		Self::Unsupported("Cannot convert null to a primitive type.".to_string())
	}

	pub(crate) fn unsupported_type(ty: ScalarType) -> Self {
		Self::Unsupported(format!("Unsupported type {ty}"))
	}
}
