//! On-disk layout of a run directory
//!
//! ```text
//! runs/<run_id>/
//! ├── meta.json            RunMeta, written last
//! ├── config_final.yaml    final config, sorted keys
//! ├── deps/pip_freeze.txt  dependency listing
//! ├── logs/run.log         run log
//! ├── metrics.json         experiment metrics
//! └── plots/*.png          experiment plots
//! ```

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::RunId;
use crate::{Error, Result};

/// RunMeta record.
pub const META_FILE: &str = "meta.json";
/// Final config snapshot.
pub const CONFIG_SNAPSHOT_FILE: &str = "config_final.yaml";
/// Dependency listing.
pub const DEPS_FILE: &str = "deps/pip_freeze.txt";
/// Run log.
pub const LOG_FILE: &str = "logs/run.log";
/// Metrics record.
pub const METRICS_FILE: &str = "metrics.json";
/// Plots subdirectory.
pub const PLOTS_DIR: &str = "plots";

/// Default parent directory for runs: `<cwd>/runs`.
#[must_use]
pub fn default_runs_root(cwd: &Path) -> PathBuf {
    cwd.join("runs")
}

/// Handle to one run's directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunDir {
    run_id: String,
    path: PathBuf,
}

impl RunDir {
    /// Create `<runs_root>/<run_id>` exclusively.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RunCollision`] if the directory already exists; its
    /// contents are left untouched.
    pub fn create(runs_root: &Path, run_id: &RunId) -> Result<Self> {
        fs::create_dir_all(runs_root)?;
        let path = runs_root.join(run_id.as_str());

        match fs::create_dir(&path) {
            Ok(()) => Ok(Self {
                run_id: run_id.to_string(),
                path,
            }),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(Error::RunCollision(path)),
            Err(e) => Err(e.into()),
        }
    }

    /// Open an existing run directory; the run id is the directory name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RunNotFound`] if `path` is not a directory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_dir() {
            return Err(Error::RunNotFound(path.to_path_buf()));
        }
        let run_id = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self {
            run_id,
            path: path.to_path_buf(),
        })
    }

    /// Run identifier.
    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Directory path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `meta.json`
    #[must_use]
    pub fn meta_path(&self) -> PathBuf {
        self.path.join(META_FILE)
    }

    /// `config_final.yaml`
    #[must_use]
    pub fn config_snapshot_path(&self) -> PathBuf {
        self.path.join(CONFIG_SNAPSHOT_FILE)
    }

    /// `deps/pip_freeze.txt`
    #[must_use]
    pub fn deps_path(&self) -> PathBuf {
        self.path.join(DEPS_FILE)
    }

    /// `logs/run.log`
    #[must_use]
    pub fn log_path(&self) -> PathBuf {
        self.path.join(LOG_FILE)
    }

    /// `metrics.json`
    #[must_use]
    pub fn metrics_path(&self) -> PathBuf {
        self.path.join(METRICS_FILE)
    }

    /// `plots/`
    #[must_use]
    pub fn plots_dir(&self) -> PathBuf {
        self.path.join(PLOTS_DIR)
    }
}

/// Write `value` as 2-space indented JSON with a trailing newline.
///
/// # Errors
///
/// Returns an error if serialization or the write fails.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut text = serde_json::to_string_pretty(value)?;
    text.push('\n');
    write_text(path, &text)
}

/// Write `text` to `path`, creating parent directories.
///
/// # Errors
///
/// Returns an error if a directory or the file cannot be written.
pub fn write_text(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, text)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_create_and_paths() {
        let root = tempdir().unwrap();
        let id = RunId::generate();
        let run = RunDir::create(&root.path().join("runs"), &id).unwrap();

        assert!(run.path().is_dir());
        assert_eq!(run.run_id(), id.as_str());
        assert_eq!(run.meta_path(), run.path().join("meta.json"));
        assert_eq!(run.deps_path(), run.path().join("deps").join("pip_freeze.txt"));
    }

    #[test]
    fn test_create_collision() {
        let root = tempdir().unwrap();
        let id = RunId::generate();
        RunDir::create(root.path(), &id).unwrap();

        let err = RunDir::create(root.path(), &id).unwrap_err();
        assert!(matches!(err, Error::RunCollision(_)));
    }

    #[test]
    fn test_open_missing() {
        let root = tempdir().unwrap();
        let err = RunDir::open(root.path().join("nope")).unwrap_err();
        assert!(matches!(err, Error::RunNotFound(_)));
    }

    #[test]
    fn test_write_json_format() {
        let root = tempdir().unwrap();
        let path = root.path().join("a").join("m.json");
        write_json(&path, &serde_json::json!({"k": 1})).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "{\n  \"k\": 1\n}\n");
    }
}
