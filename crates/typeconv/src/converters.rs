//! The converter table.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use strum::IntoEnumIterator;

use crate::error::ConversionError;
use crate::scalar::{FromScalar, ScalarType, ScalarValue};

/// Converts trimmed-or-raw text to a value of the given type.
pub type Converter = fn(&str, ScalarType) -> Result<ScalarValue, ConversionError>;

/// One converter per supported [`ScalarType`].
#[derive(Clone)]
pub struct ScalarConverters {
	table: FxHashMap<ScalarType, Converter>,
}

impl Default for ScalarConverters {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Debug for ScalarConverters {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut types: Vec<_> = self.table.keys().copied().collect();
		types.sort();
		f.debug_struct("ScalarConverters")
			.field("types", &types)
			.finish()
	}
}

impl ScalarConverters {
	/// A table with the built-in converter for every scalar type.
	pub fn new() -> Self {
		Self {
			table: ScalarType::iter()
				.map(|ty| (ty, builtin(ty)))
				.collect(),
		}
	}

	/// A table with no converters registered.
	pub fn empty() -> Self {
		Self {
			table: FxHashMap::default(),
		}
	}

	/// Installs `converter` for `ty`, returning the one it replaces.
	pub fn register(&mut self, ty: ScalarType, converter: Converter) -> Option<Converter> {
		self.table.insert(ty, converter)
	}

	pub fn supports(&self, ty: ScalarType) -> bool {
		self.table.contains_key(&ty)
	}

	/// Converts `notation` to `ty`.
	///
	/// A missing notation is `Ok(None)` when `nullable`, and an error otherwise.
	pub fn convert(
		&self,
		notation: Option<&str>,
		ty: ScalarType,
		nullable: bool,
	) -> Result<Option<ScalarValue>, ConversionError> {
		let Some(notation) = notation else {
			if nullable {
				return Ok(None);
			}
			return Err(ConversionError::null_to_primitive());
		};
		let converter = self
			.table
			.get(&ty)
			.ok_or_else(|| ConversionError::unsupported_type(ty))?;
		converter(notation, ty).map(Some)
	}

	/// Typed form of [`Self::convert`] for a required value.
	pub fn convert_to<T: FromScalar>(&self, notation: &str) -> Result<T, ConversionError> {
		let value = self
			.convert(Some(notation), T::TYPE, false)?
			.ok_or_else(ConversionError::null_to_primitive)?;
		unpack(value)
	}
}

/// Converts with the built-in converter for `T`.
pub fn parse<T: FromScalar>(notation: &str) -> Result<T, ConversionError> {
	unpack(builtin(T::TYPE)(notation, T::TYPE)?)
}

fn unpack<T: FromScalar>(value: ScalarValue) -> Result<T, ConversionError> {
	let actual = value.scalar_type();
	T::from_scalar(value).ok_or_else(|| {
		ConversionError::Unsupported(format!(
			"converter for {} produced a {actual} value",
			T::TYPE
		))
	})
}

fn builtin(ty: ScalarType) -> Converter {
	match ty {
		ScalarType::Bool => convert_bool,
		ScalarType::Char => convert_char,
		ScalarType::I8 => convert_number::<i8>,
		ScalarType::I16 => convert_number::<i16>,
		ScalarType::I32 => convert_number::<i32>,
		ScalarType::I64 => convert_number::<i64>,
		ScalarType::I128 => convert_number::<i128>,
		ScalarType::F32 => convert_number::<f32>,
		ScalarType::F64 => convert_number::<f64>,
		ScalarType::Decimal => convert_number::<Decimal>,
		ScalarType::String => convert_string,
	}
}

fn convert_number<T>(notation: &str, ty: ScalarType) -> Result<ScalarValue, ConversionError>
where
	T: FromStr + Into<ScalarValue>,
{
	notation
		.trim()
		.parse::<T>()
		.map(Into::into)
		.map_err(|_| ConversionError::Coercion {
			value: notation.to_string(),
			ty,
		})
}

/// Only the exact text `true` (after trimming) is true.
fn convert_bool(notation: &str, _ty: ScalarType) -> Result<ScalarValue, ConversionError> {
	Ok(ScalarValue::Bool(notation.trim() == "true"))
}

fn convert_char(notation: &str, ty: ScalarType) -> Result<ScalarValue, ConversionError> {
	let trimmed = notation.trim();
	let mut chars = trimmed.chars();
	match (chars.next(), chars.next()) {
		(Some(c), None) => Ok(ScalarValue::Char(c)),
		_ => Err(ConversionError::Length {
			value: trimmed.to_string(),
			len: trimmed.chars().count(),
			ty,
		}),
	}
}

fn convert_string(notation: &str, _ty: ScalarType) -> Result<ScalarValue, ConversionError> {
	Ok(ScalarValue::String(notation.to_string()))
}
