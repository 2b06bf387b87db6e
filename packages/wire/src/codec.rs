//! Conversions between domain items and engine payloads.
//!
//! Everything the engine hands back is an untyped `serde_json::Value`. This
//! module is the only place those values are inspected.

use std::collections::BTreeMap;

use lockbox_domain::Item;
use serde_json::Value;

use crate::error::{json_type_name, Result, WireError};

/// Decode a single item object.
pub fn decode_item(value: Value) -> Result<Item> {
    if !value.is_object() {
        return Err(WireError::UnexpectedType {
            expected: "object",
            actual: json_type_name(&value),
        });
    }
    serde_json::from_value(value).map_err(WireError::Decode)
}

/// Encode an item as the JSON value the engine expects.
pub fn encode_item(item: &Item) -> Result<Value> {
    serde_json::to_value(item).map_err(WireError::Encode)
}

/// Encode an item as JSON source text, suitable for splicing into a script.
pub fn item_to_json_string(item: &Item) -> Result<String> {
    serde_json::to_string(item).map_err(WireError::Encode)
}

/// Decode a list payload: an array of `[id, item]` pairs.
///
/// Only a non-array payload is an error. Pairs that are malformed or whose
/// item fails to decode are dropped; later duplicates of an id win.
pub fn decode_item_list(value: Value) -> Result<BTreeMap<String, Item>> {
    let Value::Array(pairs) = value else {
        return Err(WireError::UnexpectedType {
            expected: "array",
            actual: json_type_name(&value),
        });
    };

    let mut items = BTreeMap::new();
    for (index, pair) in pairs.into_iter().enumerate() {
        match decode_pair(pair) {
            Ok((id, item)) => {
                items.insert(id, item);
            }
            Err(e) => {
                tracing::warn!(index, error = %e, "dropping undecodable list entry");
            }
        }
    }
    Ok(items)
}

fn decode_pair(pair: Value) -> Result<(String, Item)> {
    let Value::Array(mut parts) = pair else {
        return Err(WireError::UnexpectedType {
            expected: "array",
            actual: json_type_name(&pair),
        });
    };
    if parts.len() < 2 {
        return Err(WireError::UnexpectedType {
            expected: "[id, item] pair",
            actual: "short array",
        });
    }

    let item = decode_item(parts.swap_remove(1))?;
    match parts.swap_remove(0) {
        Value::String(id) => Ok((id, item)),
        other => Err(WireError::UnexpectedType {
            expected: "string",
            actual: json_type_name(&other),
        }),
    }
}

/// Decode the result of a boolean property read.
pub fn decode_bool(value: &Value) -> Result<bool> {
    value.as_bool().ok_or_else(|| WireError::UnexpectedType {
        expected: "bool",
        actual: json_type_name(value),
    })
}
