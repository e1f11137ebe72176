use std::str::FromStr;

use strum::VariantNames;

use crate::error::ConversionError;

/// Parses an enum variant by name.
///
/// The notation is trimmed and matched exactly first, then ignoring ASCII case.
pub fn parse_enum<E>(notation: &str) -> Result<E, ConversionError>
where
	E: FromStr + VariantNames,
{
	let trimmed = notation.trim();
	if let Ok(value) = trimmed.parse::<E>() {
		return Ok(value);
	}
	E::VARIANTS
		.iter()
		.find(|name| name.eq_ignore_ascii_case(trimmed))
		.and_then(|name| name.parse::<E>().ok())
		.ok_or_else(|| ConversionError::UnknownVariant {
			value: trimmed.to_string(),
			ty: short_type_name::<E>(),
			candidates: E::VARIANTS.join(", "),
		})
}

fn short_type_name<E>() -> &'static str {
	let name = std::any::type_name::<E>();
	name.rsplit("::").next().unwrap_or(name)
}
