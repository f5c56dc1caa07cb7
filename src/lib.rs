//! # exptrack: Experiment Tracking for Small ML Experiments
//!
//! **Version**: 0.1.0
//!
//! exptrack snapshots an experiment's configuration, records provenance
//! (git commit, dependency listing), runs a built-in experiment and renders a
//! Markdown report from the persisted run directory.
//!
//! ## Design Principles (Toyota Way Aligned)
//!
//! - **Jidoka**: Config hashes are canonical, so identical effective configs
//!   are detectable across runs
//! - **Poka-Yoke safety**: Run directories are created exclusively, so two runs
//!   never merge into one directory
//! - **Genchi Genbutsu**: Reports are derived only from what the run persisted
//! - **Respect for People**: Provenance is best-effort and never aborts a run
//!
//! ## Pipeline
//!
//! ```text
//! load_config ──> apply_overrides ──> config_hash ──> snapshot
//!                                          │
//!                      RunDir::create ─────┴──> provenance ──> experiment ──> meta.json
//!
//! generate_report(run_dir) ──> report.md + assets/   (any time later)
//! ```
//!
//! ## Example Usage
//!
//! ```rust
//! use exptrack::config::{apply_overrides, config_hash, Config};
//!
//! let base = Config::new();
//! let cfg = apply_overrides(&base, &["trainer.lr=1e-3", "data.name=iris"])?;
//!
//! assert_eq!(cfg["trainer"]["lr"], serde_json::json!(0.001));
//! assert_eq!(config_hash(&cfg).len(), 64);
//! assert!(base.is_empty());
//! # Ok::<(), exptrack::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod cli;
pub mod config;
pub mod error;
pub mod experiment;
pub mod provenance;
pub mod report;
pub mod run;

pub use error::{Error, Result};
