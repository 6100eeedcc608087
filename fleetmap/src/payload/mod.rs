//! Tile payload decoding.
//!
//! Spatial store drivers disagree on how a `bytea` tile comes back: raw
//! bytes, `\x`-prefixed hex text, base64 text, a JSON array of numbers, or
//! `null` when no feature matched. [`TransportValue`] captures every shape
//! a driver can hand back, and [`decode`] turns it into vector-tile bytes
//! through an ordered chain of parse attempts.
//!
//! # Example
//!
//! ```
//! use fleetmap::payload::{decode, TransportValue};
//!
//! let value = TransportValue::Text("\\x1a02".to_string());
//! assert_eq!(decode(&value), vec![0x1a, 0x02]);
//! assert!(decode(&TransportValue::Null).is_empty());
//! ```

mod decoder;

pub use decoder::{classify, decode, encode_hex, Decoded, MAX_BASE64_PAYLOAD};

use serde_json::Value;

/// Raw tile value as returned by a store driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportValue {
    Null,
    Text(String),
    Binary(Vec<u8>),
    Numbers(Vec<i64>),
    /// Anything else; carries the JSON type name.
    Other(String),
}

impl TransportValue {
    /// Map a JSON response body onto a transport shape.
    ///
    /// Arrays of integers become [`TransportValue::Numbers`], as does the
    /// `{"type": "Buffer", "data": [...]}` object some JavaScript gateways
    /// emit for binary columns.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => TransportValue::Null,
            Value::String(text) => TransportValue::Text(text),
            Value::Array(items) => numbers_from_json(&items)
                .map(TransportValue::Numbers)
                .unwrap_or_else(|| TransportValue::Other("array".to_string())),
            Value::Object(map) => {
                let is_buffer = map.get("type").and_then(Value::as_str) == Some("Buffer");
                match map.get("data") {
                    Some(Value::Array(items)) if is_buffer => numbers_from_json(items)
                        .map(TransportValue::Numbers)
                        .unwrap_or_else(|| TransportValue::Other("object".to_string())),
                    _ => TransportValue::Other("object".to_string()),
                }
            }
            Value::Bool(_) => TransportValue::Other("bool".to_string()),
            Value::Number(_) => TransportValue::Other("number".to_string()),
        }
    }

    /// Shape name used in diagnostics.
    pub fn shape(&self) -> &'static str {
        match self {
            TransportValue::Null => "null",
            TransportValue::Text(_) => "text",
            TransportValue::Binary(_) => "binary",
            TransportValue::Numbers(_) => "numbers",
            TransportValue::Other(_) => "other",
        }
    }

    /// Short excerpt of the value for log lines.
    pub fn preview(&self) -> String {
        const PREVIEW_LEN: usize = 16;
        match self {
            TransportValue::Null => String::new(),
            TransportValue::Text(text) => text.chars().take(PREVIEW_LEN).collect(),
            TransportValue::Binary(bytes) => {
                hex::encode(&bytes[..bytes.len().min(PREVIEW_LEN)])
            }
            TransportValue::Numbers(numbers) => format!(
                "{:?}",
                &numbers[..numbers.len().min(PREVIEW_LEN)]
            ),
            TransportValue::Other(kind) => kind.clone(),
        }
    }
}

fn numbers_from_json(items: &[Value]) -> Option<Vec<i64>> {
    items.iter().map(Value::as_i64).collect()
}
