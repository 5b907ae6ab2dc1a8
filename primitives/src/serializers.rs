//! `serde` helpers for types that don't have a native JSON-friendly
//! representation, in the style of a `u256_to_str`/`u256_from_str` pair.

use serde::{
	de::Error as DeError,
	Deserialize,
	Deserializer,
	Serializer,
};

use crate::types::U256;

/// Serialize a `U256` as a decimal string (JSON cannot hold a full 256-bit
/// integer without precision loss).
pub fn u256_to_str<S>(value: &U256, serializer: S) -> Result<S::Ok, S::Error>
where
	S: Serializer,
{
	serializer.serialize_str(&value.to_string())
}

/// Deserialize a `U256` from a decimal string.
pub fn u256_from_str<'de, D>(deserializer: D) -> Result<U256, D::Error>
where
	D: Deserializer<'de>,
{
	let s = String::deserialize(deserializer)?;
	U256::from_dec_str(&s).map_err(DeError::custom)
}
