//! Override engine: `key.path=value` strings applied onto a config
//!
//! Values use the same typed-scalar rules as YAML config files, so
//! `1e-3` is a float, `true` a boolean and `null` an absent value. Non-finite
//! floats (`.inf`, `.nan`) are rejected rather than collapsing to `null`.

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};

use super::{yaml_to_value, Config};
use crate::{Error, Result};

/// A single parsed `a.b.c=value` instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Override {
    path: Vec<String>,
    value: Value,
}

impl Override {
    /// Key path segments (never empty).
    #[must_use]
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Typed value to place at the path.
    #[must_use]
    pub const fn value(&self) -> &Value {
        &self.value
    }

    /// Apply this override to `cfg` in place.
    ///
    /// # Errors
    ///
    /// See [`set_by_path`].
    pub fn apply_to(&self, cfg: &mut Config) -> Result<()> {
        set_by_path(cfg, &self.path, self.value.clone())
    }
}

impl fmt::Display for Override {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.path.join("."), self.value)
    }
}

impl FromStr for Override {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_override(s)
    }
}

/// Parse `"a.b.c=VALUE"` into an [`Override`].
///
/// Splits on the first `=` only, so values may contain `=`.
///
/// # Errors
///
/// Returns [`Error::InvalidOverride`] if there is no `=`, or the trimmed key
/// or value is empty.
pub fn parse_override(s: &str) -> Result<Override> {
    let invalid = |reason| Error::InvalidOverride {
        input: s.to_string(),
        reason,
    };

    let (key, raw) = s.split_once('=').ok_or_else(|| invalid("missing '='"))?;
    let key = key.trim();
    let raw = raw.trim();

    if key.is_empty() {
        return Err(invalid("empty key"));
    }
    if raw.is_empty() {
        return Err(invalid("empty value"));
    }

    let parsed: serde_yaml::Value =
        serde_yaml::from_str(raw).map_err(|_| invalid("value is not a valid YAML scalar"))?;
    let value = yaml_to_value(parsed)
        .map_err(|_| invalid("value must use finite numbers and string keys"))?;

    Ok(Override {
        path: key.split('.').map(str::to_string).collect(),
        value,
    })
}

/// Set `value` at `path`, creating intermediate mappings as needed.
///
/// The terminal segment is always replaced, even if it held a mapping.
///
/// # Errors
///
/// Returns [`Error::OverridePath`] if an intermediate segment holds a
/// non-mapping value, or [`Error::InvalidOverride`] for an empty path.
pub fn set_by_path(cfg: &mut Config, path: &[String], value: Value) -> Result<()> {
    let Some((last, parents)) = path.split_last() else {
        return Err(Error::InvalidOverride {
            input: String::new(),
            reason: "empty key path",
        });
    };

    let mut cur = cfg;
    for segment in parents {
        let slot = cur
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        match slot {
            Value::Object(map) => cur = map,
            _ => {
                return Err(Error::OverridePath {
                    path: path.join("."),
                    segment: segment.clone(),
                })
            }
        }
    }

    cur.insert(last.clone(), value);
    Ok(())
}

/// Apply override strings in order to a copy of `cfg`.
///
/// Later overrides win when paths collide. `cfg` itself is untouched.
///
/// # Errors
///
/// Fails on the first override that does not parse or cannot be applied.
pub fn apply_overrides<S: AsRef<str>>(cfg: &Config, overrides: &[S]) -> Result<Config> {
    let mut out = cfg.clone();
    for raw in overrides {
        parse_override(raw.as_ref())?.apply_to(&mut out)?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cfg(v: Value) -> Config {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn test_parse_scientific_float() {
        let o = parse_override("trainer.lr=1e-3").unwrap();
        assert_eq!(o.path(), ["trainer", "lr"]);
        assert!((o.value().as_f64().unwrap() - 0.001).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_typed_values() {
        assert_eq!(parse_override("a=true").unwrap().value(), &json!(true));
        assert_eq!(parse_override("a=null").unwrap().value(), &Value::Null);
        assert_eq!(parse_override("a=42").unwrap().value(), &json!(42));
        assert_eq!(parse_override("a=hello").unwrap().value(), &json!("hello"));
        assert_eq!(parse_override(" a.b = 0.5 ").unwrap().path(), ["a", "b"]);
    }

    #[test]
    fn test_parse_rejects_non_finite() {
        for raw in ["a=.inf", "a=-.inf", "a=.nan", "a=[1, .inf]"] {
            assert!(
                matches!(parse_override(raw), Err(Error::InvalidOverride { .. })),
                "{raw} should fail"
            );
        }
        assert_eq!(parse_override("a=null").unwrap().value(), &Value::Null);
        assert_eq!(parse_override("a='.inf'").unwrap().value(), &json!(".inf"));
    }

    #[test]
    fn test_parse_rejects_non_string_keys() {
        assert!(matches!(parse_override("a={1: b}"), Err(Error::InvalidOverride { .. })));
        assert_eq!(parse_override("a={x: 1}").unwrap().value(), &json!({"x": 1}));
    }

    #[test]
    fn test_parse_splits_on_first_equals() {
        let o = parse_override("query=x=1").unwrap();
        assert_eq!(o.path(), ["query"]);
        assert_eq!(o.value(), &json!("x=1"));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(matches!(parse_override("novalue"), Err(Error::InvalidOverride { .. })));
        assert!(matches!(parse_override("=b"), Err(Error::InvalidOverride { .. })));
        assert!(matches!(parse_override("a="), Err(Error::InvalidOverride { .. })));
        assert!(matches!(parse_override("  =1"), Err(Error::InvalidOverride { .. })));
    }

    #[test]
    fn test_set_by_path_creates_levels() {
        let mut c = Config::new();
        set_by_path(&mut c, &["a".into(), "b".into(), "c".into()], json!(1)).unwrap();
        assert_eq!(Value::Object(c), json!({"a": {"b": {"c": 1}}}));
    }

    #[test]
    fn test_set_by_path_through_scalar_fails() {
        let mut c = cfg(json!({"a": 1}));
        let err = set_by_path(&mut c, &["a".into(), "b".into()], json!(2)).unwrap_err();
        assert!(matches!(err, Error::OverridePath { ref segment, .. } if segment == "a"));
        assert_eq!(c["a"], json!(1));
    }

    #[test]
    fn test_terminal_mapping_is_replaced() {
        let out = apply_overrides(&cfg(json!({"model": {"params": {"C": 1}}})), &["model=7"]).unwrap();
        assert_eq!(out["model"], json!(7));
    }

    #[test]
    fn test_later_override_wins() {
        let base = Config::new();
        let out = apply_overrides(&base, &["a.b=1", "a.b=2"]).unwrap();
        assert_eq!(out["a"]["b"], json!(2));
        let out = apply_overrides(&base, &["a.b=2", "a.b=1"]).unwrap();
        assert_eq!(out["a"]["b"], json!(1));
    }

    #[test]
    fn test_apply_does_not_mutate_input() {
        let base = cfg(json!({"model": {"params": {"C": 1.0}}}));
        let snapshot = base.clone();
        let out = apply_overrides(&base, &["model.params.C=0.5", "model.params.max_iter=50"]).unwrap();
        assert_eq!(base, snapshot);
        assert_eq!(out["model"]["params"]["C"], json!(0.5));
    }

    #[test]
    fn test_display_round_trip() {
        let o: Override = "a.b=0.5".parse().unwrap();
        assert_eq!(o.to_string(), "a.b=0.5");
    }
}
