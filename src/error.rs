//! Error types for exptrack
//!
//! Toyota Way: Clear error messages with actionable guidance (Respect for People)

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// exptrack error types
///
/// Provenance collection never surfaces here: it degrades to
/// [`crate::provenance::Provenance::Unavailable`] instead.
#[derive(Error, Debug)]
pub enum Error {
    /// Config file does not exist
    #[error("config not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    /// Config file extension is not a supported format
    #[error("unsupported config format: {}\nConfig must be .yaml, .yml or .json", .0.display())]
    UnsupportedFormat(PathBuf),

    /// Config file could not be parsed
    #[error("config parse error in {}: {message}", .path.display())]
    ConfigParse {
        /// Offending config file
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// Config root parsed to something other than a mapping
    #[error("config root must be a mapping, found {0}")]
    ConfigRoot(&'static str),

    /// Override string is malformed (missing `=`, empty key or empty value)
    #[error("invalid override '{input}': {reason}")]
    InvalidOverride {
        /// Raw override string
        input: String,
        /// What is wrong with it
        reason: &'static str,
    },

    /// Override path walks through a value that is not a mapping
    #[error("override path hits non-mapping at '{segment}' (path: {path})")]
    OverridePath {
        /// Full dotted path
        path: String,
        /// Segment holding the non-mapping value
        segment: String,
    },

    /// Run directory already exists (identifier collision)
    #[error("run directory already exists: {}\nRefusing to merge two runs into one directory", .0.display())]
    RunCollision(PathBuf),

    /// Run directory does not exist
    #[error("run_dir not found: {}", .0.display())]
    RunNotFound(PathBuf),

    /// Run directory lacks its meta.json record
    #[error("meta.json not found in: {}", .0.display())]
    MetaNotFound(PathBuf),

    /// Experiment config names a dataset with no built-in experiment
    #[error("unknown dataset: {0} (try data.name: iris)")]
    UnknownDataset(String),

    /// Experiment parameters are out of range or mistyped
    #[error("invalid experiment parameter: {0}")]
    InvalidExperiment(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encode/decode error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML encode/decode error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
