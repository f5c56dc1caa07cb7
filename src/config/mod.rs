//! Experiment configuration: loading, overrides, canonical hashing
//!
//! A [`Config`] is a string-keyed mapping over the recursive JSON value type
//! (scalar | mapping | sequence). Every transformation returns a new config;
//! the loaded config is never mutated in place.
//!
//! ## Layering
//!
//! ```text
//! file (.yaml/.yml/.json) ──> Config ──> --seed ──> --set a.b=v ... ──> final Config
//!                                                                          │
//!                                                  config_hash ◄───────────┤
//!                                                  config_final.yaml ◄─────┘
//! ```

mod format;
mod hash;
mod loader;
mod overrides;

pub use format::{yaml_to_value, ConfigFormat};
pub use hash::{canonical_json, canonical_value, config_hash, sha256_hex};
pub use loader::{dump_yaml, load_config};
pub use overrides::{apply_overrides, parse_override, set_by_path, Override};
pub use serde_json::Value;

/// Config mapping: string keys to arbitrarily nested values.
pub type Config = serde_json::Map<String, Value>;

/// Human-readable name of a value's kind, used in error messages.
#[must_use]
pub const fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}

/// Return a copy of `cfg` with `seed` set at the top level.
///
/// Applied before `--set` overrides, so an explicit `--set seed=...` still wins.
#[must_use]
pub fn with_seed(cfg: &Config, seed: i64) -> Config {
    let mut out = cfg.clone();
    out.insert("seed".to_string(), Value::from(seed));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_with_seed_leaves_original() {
        let base: Config = serde_json::from_value(json!({"seed": 1, "a": 2})).unwrap();
        let seeded = with_seed(&base, 7);
        assert_eq!(seeded["seed"], json!(7));
        assert_eq!(base["seed"], json!(1));
    }

    #[test]
    fn test_value_kind() {
        assert_eq!(value_kind(&json!([1])), "sequence");
        assert_eq!(value_kind(&json!({})), "mapping");
        assert_eq!(value_kind(&Value::Null), "null");
    }
}
