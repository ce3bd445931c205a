//! Decoding the model's parameter bags into typed structs.
//!
//! Models send booleans as strings and handles with or without `@`; these
//! helpers accept both.

use murmur_core::error::ToolError;
use serde::de::{DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;

/// Decode `params` into `T`. A missing or `null` bag decodes as `{}`.
pub fn decode<T: DeserializeOwned>(params: Value) -> Result<T, ToolError> {
    let params = match params {
        Value::Null => Value::Object(serde_json::Map::new()),
        other => other,
    };
    serde_json::from_value(params).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

/// `true`, `"true"`, `"1"`, `"yes"` (any case) and `1` are true. Everything
/// else, including a missing field, is false.
pub fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Bool(b)) => b,
        Some(Value::String(s)) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
        Some(Value::Number(n)) => n.as_i64() == Some(1),
        _ => false,
    })
}

/// A platform handle with any leading `@` removed.
pub fn handle<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let raw = String::deserialize(deserializer)?;
    Ok(strip_handle(&raw))
}

pub fn strip_handle(raw: &str) -> String {
    raw.trim().trim_start_matches('@').to_string()
}

/// Accepts a string or a number, for ids the model may emit unquoted.
pub fn id_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::String(s) => Ok(s.trim().to_string()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("expected an id, got {other}"))),
    }
}
