//! Config loading and snapshot writing

use std::fs;
use std::path::Path;

use serde_json::Value;

use super::{canonical_value, value_kind, Config, ConfigFormat};
use crate::{Error, Result};

/// Load a config file into a mapping.
///
/// The format is chosen by extension (see [`ConfigFormat`]). An empty document
/// yields an empty mapping.
///
/// # Errors
///
/// - [`Error::ConfigNotFound`] if the path does not exist
/// - [`Error::UnsupportedFormat`] for extensions other than yaml/yml/json
/// - [`Error::ConfigParse`] if the document is malformed
/// - [`Error::ConfigRoot`] if the root is a sequence or scalar
pub fn load_config(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::ConfigNotFound(path.to_path_buf()));
    }

    let format = ConfigFormat::from_path(path)?;
    let text = fs::read_to_string(path)?;

    match format.parse(&text, path)? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Config::new()),
        other => Err(Error::ConfigRoot(value_kind(&other))),
    }
}

/// Write `cfg` as YAML with keys sorted at every level.
///
/// Parent directories are created as needed.
///
/// # Errors
///
/// Returns an error if serialization or the file write fails.
pub fn dump_yaml(path: impl AsRef<Path>, cfg: &Config) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let sorted = canonical_value(&Value::Object(cfg.clone()));
    let text = serde_yaml::to_string(&sorted)?;
    fs::write(path, text)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_load_yaml_and_json_agree() {
        let dir = tempdir().unwrap();
        let yaml = dir.path().join("c.yaml");
        let json_path = dir.path().join("c.json");
        fs::write(&yaml, "model:\n  params:\n    C: 1.0\nseed: 3\n").unwrap();
        fs::write(&json_path, r#"{"seed": 3, "model": {"params": {"C": 1.0}}}"#).unwrap();

        assert_eq!(load_config(&yaml).unwrap(), load_config(&json_path).unwrap());
    }

    #[test]
    fn test_load_missing_is_not_found() {
        let dir = tempdir().unwrap();
        let err = load_config(dir.path().join("missing.yaml")).unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound(_)));
    }

    #[test]
    fn test_load_sequence_root_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("list.yaml");
        fs::write(&path, "- 1\n- 2\n").unwrap();
        assert!(matches!(load_config(&path), Err(Error::ConfigRoot("sequence"))));
    }

    #[test]
    fn test_dump_yaml_sorted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("out.yaml");
        let cfg: Config = serde_json::from_value(json!({"b": 1, "a": {"z": 2, "y": 3}})).unwrap();

        dump_yaml(&path, &cfg).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "a:\n  y: 3\n  z: 2\nb: 1\n");
        assert_eq!(load_config(&path).unwrap(), cfg);
    }
}
