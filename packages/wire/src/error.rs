//! Error types for the wire layer.

use thiserror::Error;

/// Errors raised while translating engine payloads.
#[derive(Debug, Error)]
pub enum WireError {
    /// A callback arrived on a channel name we never registered.
    #[error("unknown callback channel: {name}")]
    UnknownCallback { name: String },

    /// The payload did not have the JSON type the channel requires.
    #[error("unexpected payload type: expected {expected}, got {actual}")]
    UnexpectedType {
        expected: &'static str,
        actual: &'static str,
    },

    /// The payload had the right shape but could not be decoded into an item.
    #[error("item decode error: {0}")]
    Decode(#[source] serde_json::Error),

    /// An item could not be encoded for the engine.
    #[error("item encode error: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Result type alias for wire operations.
pub type Result<T> = std::result::Result<T, WireError>;

/// Name of the JSON type of a value, for error messages.
pub(crate) fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
