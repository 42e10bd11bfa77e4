//! JSON encode/decode collaborator pair.
//!
//! The core treats structured bodies as opaque [`serde_json::Value`]s and
//! funnels every conversion through these two functions, keeping the codec
//! a replaceable seam rather than something smeared across the server.

use serde_json::Value;

/// Encode a structured value to JSON bytes.
///
/// # Errors
///
/// Propagates serializer failures (e.g. non-string map keys).
pub fn encode(value: &Value) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(value)
}

/// Decode JSON bytes into a structured value.
///
/// # Errors
///
/// Propagates any parse failure.
pub fn decode(bytes: &[u8]) -> Result<Value, serde_json::Error> {
    serde_json::from_slice(bytes)
}
