//! Payload codec
//!
//! The single (de)serialization boundary between typed values and the
//! opaque text payloads stored in both tiers. Payloads are JSON.

use serde::{de::DeserializeOwned, Serialize};

use crate::error::Result;

/// Encodes a value into its stored payload form.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

/// Decodes a stored payload back into a typed value.
pub fn decode<T: DeserializeOwned>(payload: &str) -> Result<T> {
    Ok(serde_json::from_str(payload)?)
}
