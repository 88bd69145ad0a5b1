//! Opaque identifiers
//!
//! Identifiers travel as strings so that 64-bit keys never pass through a
//! floating point representation on the client side.

use serde_json::Value;

/// Exact string form of an identifier returned by the data service.
///
/// Numbers keep every digit, strings pass through, and a row object with a
/// single column (`{"id": 42}`) is unwrapped to that column's value.
pub fn identifier_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Object(map) if map.len() == 1 => map.values().next().and_then(identifier_to_string),
        _ => None,
    }
}

/// Identifier supplied in a request body, if present and non-blank.
pub fn identifier_from_body(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Identifier supplied as a path segment, if non-blank.
pub fn require_identifier(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
