//! Ordered decode chain for tile payloads.

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use base64::Engine;
use tracing::warn;

use super::TransportValue;

/// Upper bound on a base64-decoded tile. Larger results are treated as a
/// misdetection and handed to the next attempt.
pub const MAX_BASE64_PAYLOAD: usize = 10 * 1024 * 1024;

/// Text shorter than this is the empty marker (`\x`) or noise.
const MIN_TEXT_LEN: usize = 3;

const HEX_PREFIXES: [&str; 3] = ["\\x", "0x", "0X"];

/// Result of classifying a transport value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// A recognized "no features" value.
    Empty,
    /// Decoded tile bytes.
    Bytes(Vec<u8>),
    /// Nothing in the chain accepted the value.
    Unrecognized {
        /// Shape of the value, for diagnostics.
        shape: &'static str,
        /// Leading characters or bytes, for diagnostics.
        preview: String,
    },
}

impl Decoded {
    /// Collapse into bytes; unrecognized values become empty.
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Decoded::Bytes(bytes) => bytes,
            Decoded::Empty | Decoded::Unrecognized { .. } => Vec::new(),
        }
    }

    pub fn is_unrecognized(&self) -> bool {
        matches!(self, Decoded::Unrecognized { .. })
    }
}

/// A single total parse attempt: `None` passes to the next one.
type Attempt = fn(&TransportValue) -> Option<Decoded>;

/// Attempts in priority order. The first `Some` wins.
const ATTEMPTS: [(&str, Attempt); 6] = [
    ("null", attempt_null),
    ("empty-marker", attempt_empty_marker),
    ("base64", attempt_base64),
    ("hex", attempt_hex),
    ("binary", attempt_binary),
    ("numbers", attempt_numbers),
];

/// Run the chain and report which representation matched.
pub fn classify(value: &TransportValue) -> Decoded {
    for (name, attempt) in ATTEMPTS {
        if let Some(decoded) = attempt(value) {
            tracing::trace!(attempt = name, shape = value.shape(), "Payload decoded");
            return decoded;
        }
    }

    Decoded::Unrecognized {
        shape: value.shape(),
        preview: value.preview(),
    }
}

/// Decode a transport value into vector-tile bytes.
///
/// Never fails: unrecognized values log a warning and decode to an empty
/// buffer, which renders as a tile with no features.
pub fn decode(value: &TransportValue) -> Vec<u8> {
    let decoded = classify(value);
    if let Decoded::Unrecognized { shape, preview } = &decoded {
        warn!(shape, preview = %preview, "Unrecognized tile payload, returning empty tile");
    }
    decoded.into_bytes()
}

/// Encode bytes in the `\x`-prefixed hex text form PostgreSQL uses for
/// `bytea` output.
pub fn encode_hex(bytes: &[u8]) -> String {
    format!("\\x{}", hex::encode(bytes))
}

fn attempt_null(value: &TransportValue) -> Option<Decoded> {
    matches!(value, TransportValue::Null).then_some(Decoded::Empty)
}

fn attempt_empty_marker(value: &TransportValue) -> Option<Decoded> {
    match value {
        TransportValue::Text(text) if text.chars().count() < MIN_TEXT_LEN => Some(Decoded::Empty),
        _ => None,
    }
}

fn attempt_base64(value: &TransportValue) -> Option<Decoded> {
    let TransportValue::Text(text) = value else {
        return None;
    };
    if has_hex_prefix(text) {
        return None;
    }

    let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(&cleaned)
        .or_else(|_| STANDARD_NO_PAD.decode(&cleaned))
        .ok()?;

    (1..=MAX_BASE64_PAYLOAD)
        .contains(&bytes.len())
        .then_some(Decoded::Bytes(bytes))
}

fn attempt_hex(value: &TransportValue) -> Option<Decoded> {
    let TransportValue::Text(text) = value else {
        return None;
    };

    let body = HEX_PREFIXES
        .iter()
        .find_map(|prefix| text.strip_prefix(prefix))
        .unwrap_or(text);
    let cleaned: String = body.chars().filter(|c| !c.is_whitespace()).collect();

    if cleaned.is_empty()
        || cleaned.len() % 2 != 0
        || !cleaned.chars().all(|c| c.is_ascii_hexdigit())
    {
        return None;
    }

    hex::decode(&cleaned).ok().map(Decoded::Bytes)
}

fn attempt_binary(value: &TransportValue) -> Option<Decoded> {
    match value {
        TransportValue::Binary(bytes) if bytes.is_empty() => Some(Decoded::Empty),
        TransportValue::Binary(bytes) => Some(Decoded::Bytes(bytes.clone())),
        _ => None,
    }
}

fn attempt_numbers(value: &TransportValue) -> Option<Decoded> {
    let TransportValue::Numbers(numbers) = value else {
        return None;
    };
    if numbers.is_empty() {
        return Some(Decoded::Empty);
    }

    numbers
        .iter()
        .map(|&n| u8::try_from(n).ok())
        .collect::<Option<Vec<u8>>>()
        .map(Decoded::Bytes)
}

fn has_hex_prefix(text: &str) -> bool {
    HEX_PREFIXES.iter().any(|prefix| text.starts_with(prefix))
}
