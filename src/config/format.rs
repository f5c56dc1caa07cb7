//! Config file formats

use std::path::Path;

use serde_json::{Map, Number, Value};
use serde_yaml::Value as Yaml;

use crate::{Error, Result};

fn yaml_kind(value: &Yaml) -> &'static str {
    match value {
        Yaml::Null => "null",
        Yaml::Bool(_) => "boolean",
        Yaml::Number(_) => "number",
        Yaml::String(_) => "string",
        Yaml::Sequence(_) => "sequence",
        Yaml::Mapping(_) => "mapping",
        Yaml::Tagged(_) => "tagged value",
    }
}

/// Convert a YAML document into the config value tree.
///
/// Mapping keys must be strings, so `1: a` and `"1": a` stay distinct
/// documents. Floats must be finite (`.inf` and `.nan` have no canonical
/// JSON form). Tags are dropped and the tagged value kept.
///
/// # Errors
///
/// Returns a description of the first key or number that cannot be
/// represented.
pub fn yaml_to_value(yaml: Yaml) -> std::result::Result<Value, String> {
    match yaml {
        Yaml::Null => Ok(Value::Null),
        Yaml::Bool(b) => Ok(Value::Bool(b)),
        Yaml::String(s) => Ok(Value::String(s)),
        Yaml::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::from(i))
            } else if let Some(u) = n.as_u64() {
                Ok(Value::from(u))
            } else {
                n.as_f64()
                    .and_then(Number::from_f64)
                    .map(Value::Number)
                    .ok_or_else(|| format!("non-finite float {n} is not supported"))
            }
        }
        Yaml::Sequence(items) => items
            .into_iter()
            .map(yaml_to_value)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(Value::Array),
        Yaml::Mapping(mapping) => {
            let mut out = Map::new();
            for (key, item) in mapping {
                let Yaml::String(key) = key else {
                    return Err(format!(
                        "mapping keys must be strings, found {} key",
                        yaml_kind(&key)
                    ));
                };
                out.insert(key, yaml_to_value(item)?);
            }
            Ok(Value::Object(out))
        }
        Yaml::Tagged(tagged) => yaml_to_value(tagged.value),
    }
}

/// Supported config file formats, selected by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// `.yaml` / `.yml`
    Yaml,
    /// `.json`
    Json,
}

impl ConfigFormat {
    /// Determine the format from a path's extension (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedFormat`] for any other extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        match ext.as_deref() {
            Some("yaml" | "yml") => Ok(Self::Yaml),
            Some("json") => Ok(Self::Json),
            _ => Err(Error::UnsupportedFormat(path.to_path_buf())),
        }
    }

    /// Parse document text into a value tree.
    ///
    /// An empty document parses to `Value::Null`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigParse`] if the text is not valid for the format.
    pub fn parse(self, text: &str, path: &Path) -> Result<Value> {
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        let parse_err = |message: String| Error::ConfigParse {
            path: path.to_path_buf(),
            message,
        };

        match self {
            Self::Yaml => {
                let doc: Yaml = serde_yaml::from_str(text).map_err(|e| parse_err(e.to_string()))?;
                yaml_to_value(doc).map_err(parse_err)
            }
            Self::Json => serde_json::from_str(text).map_err(|e| parse_err(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_path() {
        assert_eq!(ConfigFormat::from_path(Path::new("a.yaml")).unwrap(), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path(Path::new("a.YML")).unwrap(), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path(Path::new("a.json")).unwrap(), ConfigFormat::Json);
        assert!(matches!(
            ConfigFormat::from_path(Path::new("a.toml")),
            Err(Error::UnsupportedFormat(_))
        ));
        assert!(ConfigFormat::from_path(Path::new("noext")).is_err());
    }

    #[test]
    fn test_yaml_typed_scalars() {
        let v = ConfigFormat::Yaml
            .parse("lr: 1e-3\nflag: true\nnone: null\nn: 3\n", Path::new("c.yaml"))
            .unwrap();
        assert_eq!(v["lr"], json!(0.001));
        assert_eq!(v["flag"], json!(true));
        assert_eq!(v["none"], Value::Null);
        assert_eq!(v["n"], json!(3));
    }

    #[test]
    fn test_empty_document_is_null() {
        assert_eq!(ConfigFormat::Json.parse("  \n", Path::new("c.json")).unwrap(), Value::Null);
        assert_eq!(ConfigFormat::Yaml.parse("", Path::new("c.yaml")).unwrap(), Value::Null);
    }

    #[test]
    fn test_non_finite_floats_rejected() {
        for text in ["lr: .inf\n", "lr: -.inf\n", "scale: .nan\n", "a:\n  - 1\n  - .NaN\n"] {
            let err = ConfigFormat::Yaml.parse(text, Path::new("c.yaml")).unwrap_err();
            assert!(
                matches!(err, Error::ConfigParse { ref message, .. } if message.contains("non-finite")),
                "{text:?} gave {err}"
            );
        }
    }

    #[test]
    fn test_non_string_keys_rejected() {
        for text in ["~: a\n", "1: a\n", "true: a\n", "a:\n  2: b\n"] {
            let err = ConfigFormat::Yaml.parse(text, Path::new("c.yaml")).unwrap_err();
            assert!(
                matches!(err, Error::ConfigParse { ref message, .. } if message.contains("keys must be strings")),
                "{text:?} gave {err}"
            );
        }
        let quoted = ConfigFormat::Yaml.parse("\"1\": a\n", Path::new("c.yaml")).unwrap();
        assert_eq!(quoted, json!({"1": "a"}));
    }

    #[test]
    fn test_large_unsigned() {
        let v = ConfigFormat::Yaml
            .parse("big: 18446744073709551615\n", Path::new("c.yaml"))
            .unwrap();
        assert_eq!(v["big"], json!(u64::MAX));
    }

    #[test]
    fn test_invalid_json() {
        let err = ConfigFormat::Json.parse("{", Path::new("c.json")).unwrap_err();
        assert!(matches!(err, Error::ConfigParse { .. }));
    }
}
