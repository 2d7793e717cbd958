//! Deserializers for integer ids posted by HTML forms, which arrive as either
//! JSON numbers or strings holding a number.

use serde::de::{self, Deserializer};
use serde::Deserialize;

#[derive(Deserialize)]
#[serde(untagged)]
enum IntOrString {
    Int(i64),
    Str(String),
}

impl IntOrString {
    /// `Ok(None)` for a blank string.
    fn into_i32<E: de::Error>(self) -> Result<Option<i32>, E> {
        let wide = match self {
            IntOrString::Int(n) => n,
            IntOrString::Str(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Ok(None);
                }
                trimmed
                    .parse::<i64>()
                    .map_err(|_| E::custom(format!("expected an integer, found {trimmed:?}")))?
            }
        };
        i32::try_from(wide)
            .map(Some)
            .map_err(|_| E::custom(format!("integer {wide} is out of range")))
    }
}

/// A required integer.
pub fn int<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    IntOrString::deserialize(deserializer)?
        .into_i32()?
        .ok_or_else(|| de::Error::custom("expected an integer, found an empty string"))
}

/// An optional integer; `null`, a missing field (with `#[serde(default)]`) and
/// a blank string all mean "not supplied".
pub fn opt_int<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<IntOrString>::deserialize(deserializer)? {
        Some(value) => value.into_i32(),
        None => Ok(None),
    }
}
