//! Redaction of sensitive material before any value reaches a log sink.
//!
//! Two rules: object keys matching a case-insensitive substring of the
//! sensitive set have their values replaced wholesale, and bare strings
//! shaped like opaque tokens are replaced even when their key was not
//! flagged. The transform is deep, order-preserving, and never fails.

use serde_json::{Map, Value};

/// Fixed placeholder substituted for sensitive values.
pub const REDACTION_MARKER: &str = "[REDACTED]";

/// Case-insensitive substrings that classify an object key as sensitive.
/// Immutable for the process lifetime.
const SENSITIVE_KEYS: &[&str] = &[
    "token",
    "password",
    "secret",
    "apikey",
    "api_key",
    "credential",
    "auth",
    "private_key",
];

/// Bare strings longer than this made only of `[A-Za-z0-9_-]` are treated
/// as opaque tokens.
const OPAQUE_TOKEN_THRESHOLD: usize = 20;

pub fn redact_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, val) in map {
                let key_lower = key.to_lowercase();
                if SENSITIVE_KEYS.iter().any(|s| key_lower.contains(s)) {
                    out.insert(key.clone(), Value::String(REDACTION_MARKER.to_string()));
                } else {
                    out.insert(key.clone(), redact_value(val));
                }
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact_value).collect()),
        Value::String(s) if looks_like_opaque_token(s) => {
            Value::String(REDACTION_MARKER.to_string())
        }
        other => other.clone(),
    }
}

fn looks_like_opaque_token(s: &str) -> bool {
    s.len() > OPAQUE_TOKEN_THRESHOLD
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
