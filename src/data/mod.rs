pub mod geojson;
pub mod hierarchy;
pub mod load;
pub mod locations;
pub mod network;
pub mod sankey;
pub mod stats;
pub mod violin;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

pub use load::Dataset;

/// Identifiers in the site's documents are sometimes numbers.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    value_to_string(&value).ok_or_else(|| {
        serde::de::Error::custom(format!("expected a string or a number, found {value}"))
    })
}

pub(crate) fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}
