//! String-to-scalar coercion for configuration values that arrive as text.
//!
//! Numbers are trimmed before parsing; booleans are true only for the exact
//! text `true`; characters must be a single character after trimming; strings
//! pass through unchanged. A missing value is only accepted for nullable
//! targets.

mod converters;
mod enums;
mod error;
mod scalar;

pub use converters::{Converter, ScalarConverters, parse};
pub use enums::parse_enum;
pub use error::ConversionError;
pub use scalar::{FromScalar, ScalarType, ScalarValue};
