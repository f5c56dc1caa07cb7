//! Run identity, layout and the `run` pipeline
//!
//! ## Pipeline
//!
//! 1. Load config (optional), inject `--seed`, apply `--set` overrides
//! 2. Generate a [`RunId`] and create `runs/<run_id>/` exclusively
//! 3. Open the run log, write `config_final.yaml`, hash the final config
//! 4. Best-effort provenance: dependency listing, git commit and dirty flag
//! 5. Execute the experiment if the config has a `data` section
//! 6. Write `meta.json` last
//!
//! Config and override errors surface before the run directory exists, so
//! a rejected invocation leaves nothing on disk.

mod id;
mod layout;
mod logger;
mod meta;

pub use id::RunId;
pub use layout::{
    default_runs_root, write_json, write_text, RunDir, CONFIG_SNAPSHOT_FILE, DEPS_FILE,
    LOG_FILE, META_FILE, METRICS_FILE, PLOTS_DIR,
};
pub use logger::RunLogger;
pub use meta::{invocation_command, utc_now_iso, RunMeta, RunMetaBuilder};

use std::path::{Path, PathBuf};

use crate::config::{apply_overrides, config_hash, dump_yaml, load_config, with_seed, Config};
use crate::experiment::{has_experiment, run_experiment};
use crate::provenance::{self, Provenance};
use crate::Result;

/// Collapse a provenance lookup to an `Option`, logging why it is absent.
fn settle<T>(logger: &RunLogger, what: &str, lookup: Provenance<T>) -> Option<T> {
    match lookup {
        Provenance::Available(value) => Some(value),
        Provenance::Unavailable(reason) => {
            logger.warn(format!("{what} unavailable: {reason}"));
            None
        }
    }
}

/// Inputs to one `run` invocation.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Config file, if any.
    pub config_path: Option<PathBuf>,
    /// Seed written into the config before overrides.
    pub seed: Option<i64>,
    /// `key.path=value` overrides, applied in order.
    pub overrides: Vec<String>,
    /// Working directory recorded in metadata and queried for git state.
    pub cwd: PathBuf,
    /// Parent directory for run directories.
    pub runs_root: PathBuf,
    /// Command line recorded in metadata.
    pub command: String,
    /// Dependency listing command, program first.
    pub deps_command: Vec<String>,
    /// Execute the experiment when the config has a `data` section.
    pub execute: bool,
}

impl RunOptions {
    /// Options for a tracking run in `cwd` with default layout.
    #[must_use]
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        let cwd = cwd.into();
        Self {
            config_path: None,
            seed: None,
            overrides: Vec::new(),
            runs_root: default_runs_root(&cwd),
            cwd,
            command: String::new(),
            deps_command: vec!["pip".to_string(), "freeze".to_string()],
            execute: true,
        }
    }
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// The run's directory.
    pub run_dir: RunDir,
    /// The persisted metadata.
    pub meta: RunMeta,
    /// The final config that was hashed and snapshotted.
    pub config: Config,
}

/// Load the config file (if any), inject `seed`, then apply `overrides`.
///
/// # Errors
///
/// Propagates config loading and override errors.
pub fn resolve_config(
    config_path: Option<&Path>,
    seed: Option<i64>,
    overrides: &[String],
) -> Result<Config> {
    let mut cfg = match config_path {
        Some(path) => load_config(path)?,
        None => Config::new(),
    };
    if let Some(seed) = seed {
        cfg = with_seed(&cfg, seed);
    }
    apply_overrides(&cfg, overrides)
}

/// Execute one tracked run.
///
/// # Errors
///
/// Fails on config/override errors, a run directory collision, artifact
/// write failures, or experiment errors. Provenance failures are logged as
/// warnings and recorded as absent.
pub fn execute_run(opts: &RunOptions) -> Result<RunOutcome> {
    let builder = RunMeta::builder("", &opts.cwd, opts.command.clone());

    let final_cfg = resolve_config(opts.config_path.as_deref(), opts.seed, &opts.overrides)?;

    let run_id = RunId::generate();
    let run_dir = RunDir::create(&opts.runs_root, &run_id)?;
    tracing::info!(run_id = %run_id, path = %run_dir.path().display(), "run directory created");

    let logger = RunLogger::to_file(run_dir.log_path())?;
    logger.info(format!("run started: {run_id}"));

    dump_yaml(run_dir.config_snapshot_path(), &final_cfg)?;
    let chash = config_hash(&final_cfg);
    logger.info(format!("config_hash={chash}"));

    let deps_hash = match provenance::dependency_snapshot(&opts.deps_command) {
        Provenance::Available(listing) => {
            write_text(&run_dir.deps_path(), &listing)?;
            let digest = provenance::digest(&listing);
            logger.info(format!("deps_hash={digest}"));
            Some(digest)
        }
        Provenance::Unavailable(reason) => {
            logger.warn(format!("deps snapshot failed: {reason}"));
            None
        }
    };

    let git_commit = settle(&logger, "git commit", provenance::git_commit(&opts.cwd));
    let git_dirty = settle(&logger, "git status", provenance::git_dirty(&opts.cwd));
    logger.info(format!(
        "git_commit={} git_dirty={}",
        git_commit.as_deref().unwrap_or("unknown"),
        git_dirty.map_or_else(|| "unknown".to_string(), |d| d.to_string())
    ));

    if opts.execute && has_experiment(&final_cfg) {
        match run_experiment(&final_cfg, &run_dir, &logger) {
            Ok(metrics) => {
                write_json(&run_dir.metrics_path(), &metrics)?;
                logger.info("metrics written");
            }
            Err(e) => {
                logger.error(format!("experiment failed: {e}"));
                return Err(e);
            }
        }
    } else {
        logger.info("no experiment executed (tracking-only run)");
    }

    let meta = builder
        .run_id(run_id.as_str())
        .config_path(opts.config_path.as_ref().map(|p| p.display().to_string()))
        .config_hash(chash)
        .seed(opts.seed)
        .overrides(opts.overrides.clone())
        .git(git_commit, git_dirty)
        .deps_hash(deps_hash)
        .finish();
    write_json(&run_dir.meta_path(), &meta)?;
    logger.info(format!("run finished duration_sec={:.3}", meta.duration_sec()));

    Ok(RunOutcome {
        run_dir,
        meta,
        config: final_cfg,
    })
}
