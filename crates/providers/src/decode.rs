//! Structured-output decoding with a fixed fallback ladder.
//!
//! Providers do not always honor a requested JSON schema. Every caller that
//! asks for a shape goes through [`decode_structured`], which tries, in order:
//!
//! 1. a strict parse of the whole reply,
//! 2. the first embedded `{...}` object that parses as `T`,
//! 3. `T::default()`.
//!
//! Downstream code therefore always receives a typed value.

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// Which rung of the ladder produced the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStage {
    Strict,
    Embedded,
    Fallback,
}

/// Decode a model reply into `T`. Never fails.
pub fn decode_structured<T: DeserializeOwned + Default>(raw: &str) -> T {
    decode_with_stage(raw).0
}

/// Like [`decode_structured`], also reporting which stage succeeded.
pub fn decode_with_stage<T: DeserializeOwned + Default>(raw: &str) -> (T, DecodeStage) {
    let trimmed = raw.trim();

    if let Ok(value) = serde_json::from_str::<T>(trimmed) {
        return (value, DecodeStage::Strict);
    }

    for (offset, _) in trimmed.match_indices('{') {
        let mut stream = serde_json::Deserializer::from_str(&trimmed[offset..]).into_iter::<T>();
        if let Some(Ok(value)) = stream.next() {
            debug!(offset, "Recovered embedded JSON object from model reply");
            return (value, DecodeStage::Embedded);
        }
    }

    warn!(
        preview = %trimmed.chars().take(120).collect::<String>(),
        "Model reply is not valid JSON, using default"
    );
    (T::default(), DecodeStage::Fallback)
}
