pub mod elements;
pub mod error;
pub mod orbit;
pub mod satellites;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::time::parse_utc;

pub(crate) fn default_satellite() -> String {
    "ISS".to_string()
}

pub(crate) fn deserialize_datetime<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_utc(&s).map_err(serde::de::Error::custom)
}

/// Like `deserialize_datetime`, but a blank value means "not given".
pub(crate) fn deserialize_optional_datetime<'de, D>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(s) if !s.trim().is_empty() => parse_utc(&s).map(Some).map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}
