//! Per-run logging handle
//!
//! A [`RunLogger`] owns its own `tracing` dispatcher writing to the run's
//! `logs/run.log`. It is created once per run and passed by reference to
//! whatever needs to log run diagnostics; no global logger is installed.

use std::fmt::Display;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{Dispatch, Level};

use crate::Result;

/// Logging handle for a single run.
#[derive(Debug, Clone)]
pub struct RunLogger {
    dispatch: Dispatch,
    path: PathBuf,
}

impl RunLogger {
    /// Open (append) the log file at `path` and build a dispatcher for it.
    ///
    /// Lines are `<RFC 3339 timestamp>  <LEVEL> <message>`, without ANSI colors.
    ///
    /// # Errors
    ///
    /// Returns an error if the log directory or file cannot be created.
    pub fn to_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        let subscriber = tracing_subscriber::fmt()
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .with_target(false)
            .with_max_level(Level::INFO)
            .finish();

        Ok(Self {
            dispatch: Dispatch::new(subscriber),
            path: path.to_path_buf(),
        })
    }

    /// Log file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `f` with this logger as the current dispatcher, so `tracing`
    /// macros inside it write to the run log.
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }

    /// Log at INFO.
    pub fn info(&self, message: impl Display) {
        self.in_scope(|| tracing::info!("{message}"));
    }

    /// Log at WARN.
    pub fn warn(&self, message: impl Display) {
        self.in_scope(|| tracing::warn!("{message}"));
    }

    /// Log at ERROR.
    pub fn error(&self, message: impl Display) {
        self.in_scope(|| tracing::error!("{message}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_lines_written_to_file() {
        let dir = tempdir().unwrap();
        let logger = RunLogger::to_file(dir.path().join("logs").join("run.log")).unwrap();

        logger.info("run started: abc");
        logger.warn("deps snapshot failed");

        let text = fs::read_to_string(logger.path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("INFO"));
        assert!(lines[0].ends_with("run started: abc"));
        assert!(lines[1].contains("WARN"));
        assert!(!text.contains('\u{1b}'));
    }

    #[test]
    fn test_loggers_are_independent() {
        let dir = tempdir().unwrap();
        let a = RunLogger::to_file(dir.path().join("a.log")).unwrap();
        let b = RunLogger::to_file(dir.path().join("b.log")).unwrap();

        a.info("only in a");
        b.info("only in b");

        let a_text = fs::read_to_string(a.path()).unwrap();
        assert!(a_text.contains("only in a"));
        assert!(!a_text.contains("only in b"));
    }
}
