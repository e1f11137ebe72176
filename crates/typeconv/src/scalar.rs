//! Scalar type tags and values.

use rust_decimal::Decimal;
use strum::{Display, EnumIter};

/// Target type of a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter)]
pub enum ScalarType {
	#[strum(serialize = "bool")]
	Bool,
	#[strum(serialize = "char")]
	Char,
	#[strum(serialize = "i8")]
	I8,
	#[strum(serialize = "i16")]
	I16,
	#[strum(serialize = "i32")]
	I32,
	#[strum(serialize = "i64")]
	I64,
	#[strum(serialize = "i128")]
	I128,
	#[strum(serialize = "f32")]
	F32,
	#[strum(serialize = "f64")]
	F64,
	Decimal,
	String,
}

/// A converted value, tagged like [`ScalarType`].
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
	Bool(bool),
	Char(char),
	I8(i8),
	I16(i16),
	I32(i32),
	I64(i64),
	I128(i128),
	F32(f32),
	F64(f64),
	Decimal(Decimal),
	String(String),
}

impl ScalarValue {
	pub fn scalar_type(&self) -> ScalarType {
		match self {
			Self::Bool(_) => ScalarType::Bool,
			Self::Char(_) => ScalarType::Char,
			Self::I8(_) => ScalarType::I8,
			Self::I16(_) => ScalarType::I16,
			Self::I32(_) => ScalarType::I32,
			Self::I64(_) => ScalarType::I64,
			Self::I128(_) => ScalarType::I128,
			Self::F32(_) => ScalarType::F32,
			Self::F64(_) => ScalarType::F64,
			Self::Decimal(_) => ScalarType::Decimal,
			Self::String(_) => ScalarType::String,
		}
	}
}

mod sealed {
	pub trait Sealed {}
}

/// Rust types a [`ScalarValue`] can be unpacked into.
pub trait FromScalar: sealed::Sealed + Sized {
	const TYPE: ScalarType;

	/// Unpacks `value` if it carries this type.
	fn from_scalar(value: ScalarValue) -> Option<Self>;
}

macro_rules! scalar {
	($($ty:ty => $variant:ident),* $(,)?) => {
		$(
			impl sealed::Sealed for $ty {}

			impl FromScalar for $ty {
				const TYPE: ScalarType = ScalarType::$variant;

				fn from_scalar(value: ScalarValue) -> Option<Self> {
					match value {
						ScalarValue::$variant(v) => Some(v),
						_ => None,
					}
				}
			}

			impl From<$ty> for ScalarValue {
				fn from(value: $ty) -> Self {
					Self::$variant(value)
				}
			}
		)*
	};
}

scalar! {
	bool => Bool,
	char => Char,
	i8 => I8,
	i16 => I16,
	i32 => I32,
	i64 => I64,
	i128 => I128,
	f32 => F32,
	f64 => F64,
	Decimal => Decimal,
	String => String,
}
