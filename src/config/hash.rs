//! Canonical config form and content hash
//!
//! Canonical form: compact JSON, keys sorted at every nesting level, UTF-8
//! without ASCII escaping. The hash is SHA-256 over those bytes, hex-encoded.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use super::Config;

/// SHA-256 of `bytes`, as 64 lowercase hex characters.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Rebuild `value` with every mapping's keys inserted in sorted order.
#[must_use]
pub fn canonical_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::with_capacity(map.len());
            for key in keys {
                sorted.insert(key.clone(), canonical_value(&map[key.as_str()]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonical_value).collect()),
        scalar => scalar.clone(),
    }
}

/// Canonical JSON text of `cfg`.
#[must_use]
pub fn canonical_json(cfg: &Config) -> String {
    let mut out = String::new();
    write_canonical(&Value::Object(cfg.clone()), &mut out);
    out
}

// Map iteration order is insertion order under serde_json's `preserve_order`
// feature, so keys are sorted here.
fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::from(key.as_str()).to_string());
                out.push(':');
                write_canonical(item, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Content hash of a config: SHA-256 of its canonical JSON form.
///
/// Two configs with the same keys and values hash identically regardless of
/// insertion order.
///
/// ## Example
///
/// ```rust
/// use exptrack::config::{config_hash, Config};
///
/// let a: Config = serde_json::from_str(r#"{"x": 1, "y": {"b": 2, "a": 3}}"#)?;
/// let b: Config = serde_json::from_str(r#"{"y": {"a": 3, "b": 2}, "x": 1}"#)?;
/// assert_eq!(config_hash(&a), config_hash(&b));
/// # Ok::<(), serde_json::Error>(())
/// ```
#[must_use]
pub fn config_hash(cfg: &Config) -> String {
    sha256_hex(canonical_json(cfg).as_bytes())
}
