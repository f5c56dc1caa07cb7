//! Markdown report assembly
//!
//! A report is derived from a run directory's persisted artifacts only and
//! can be deleted and regenerated at any time. Generation never writes into
//! the run directory.
//!
//! ## Output layout
//!
//! ```text
//! <out_dir>/
//! ├── report.md
//! └── assets/<copied plot images>
//! ```
//!
//! ## Sections (fixed order)
//!
//! Title, Summary, Metrics, Plots, Final Config Snapshot, Reproduce. Only
//! `meta.json` is required; every other artifact missing becomes a note.

mod assets;
mod markdown;

pub use assets::{copy_plot_assets, is_image, IMAGE_EXTENSIONS};
pub use markdown::{cell_text, escape_cell, is_scalar, render_kv_table, render_metrics_table};

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::config::value_kind;
use crate::run::RunDir;
use crate::{Error, Result};

/// Report file name inside the output directory.
pub const REPORT_FILE: &str = "report.md";
/// Asset subdirectory inside the output directory.
pub const ASSETS_DIR: &str = "assets";

/// `meta.json` fields shown in the Summary table, in order.
pub const SUMMARY_FIELDS: [&str; 13] = [
    "run_id",
    "created_at",
    "cwd",
    "command",
    "seed",
    "config_path",
    "config_hash",
    "deps_hash",
    "git_commit",
    "git_dirty",
    "duration_sec",
    "platform",
    "python_version",
];

/// Default report directory for a run: `<cwd>/reports/<run_id>`.
#[must_use]
pub fn default_report_dir(cwd: &Path, run_id: &str) -> PathBuf {
    cwd.join("reports").join(run_id)
}

/// An optional run artifact as found on disk.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Artifact<T> {
    /// The file does not exist.
    #[default]
    Missing,
    /// The file exists but could not be read or parsed (e.g. truncated by an
    /// interrupted run).
    Unreadable(String),
    /// The file was read.
    Present(T),
}

/// Everything a report is rendered from.
#[derive(Debug, Clone, Default)]
pub struct ReportInputs {
    /// Run identifier (the run directory's name).
    pub run_id: String,
    /// Parsed `meta.json`.
    pub meta: Map<String, Value>,
    /// Raw `config_final.yaml`.
    pub config_text: Artifact<String>,
    /// Parsed `metrics.json`.
    pub metrics: Artifact<Map<String, Value>>,
    /// Copied plot file names, sorted.
    pub assets: Vec<String>,
}

fn parse_json_map(text: &str) -> std::result::Result<Map<String, Value>, String> {
    match serde_json::from_str::<Value>(text).map_err(|e| e.to_string())? {
        Value::Object(map) => Ok(map),
        other => Err(format!("expected a JSON object, found {}", value_kind(&other))),
    }
}

/// Read an optional artifact, degrading read and parse failures to
/// [`Artifact::Unreadable`] with a warning.
fn read_artifact<T>(
    path: &Path,
    parse: impl FnOnce(String) -> std::result::Result<T, String>,
) -> Artifact<T> {
    if !path.is_file() {
        return Artifact::Missing;
    }
    match fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(parse)
    {
        Ok(value) => Artifact::Present(value),
        Err(reason) => {
            tracing::warn!(path = %path.display(), %reason, "artifact could not be read");
            Artifact::Unreadable(reason)
        }
    }
}

/// Render the Markdown document.
#[must_use]
pub fn render_report(inputs: &ReportInputs) -> String {
    let mut md: Vec<String> = Vec::new();
    md.push(format!("# Experiment Report — {}\n", inputs.run_id));

    md.push("## Summary".into());
    md.push(render_kv_table(
        SUMMARY_FIELDS.iter().map(|&k| (k, inputs.meta.get(k))),
    ));
    md.push(String::new());

    md.push("## Metrics".into());
    match &inputs.metrics {
        Artifact::Present(metrics) if !metrics.is_empty() => {
            md.push(render_metrics_table(metrics));
        }
        Artifact::Unreadable(reason) => md.push(format!(
            "_metrics.json could not be read ({})._",
            escape_cell(reason)
        )),
        _ => md.push(
            "_metrics.json not found (this run may have failed or metrics were not generated)._"
                .into(),
        ),
    }
    md.push(String::new());

    md.push("## Plots".into());
    if inputs.assets.is_empty() {
        md.push("_No plot assets found._".into());
        md.push(String::new());
    } else {
        for name in &inputs.assets {
            md.push(format!("### {name}"));
            md.push(format!("![{name}]({ASSETS_DIR}/{name})"));
            md.push(String::new());
        }
    }

    md.push("## Final Config Snapshot".into());
    match &inputs.config_text {
        Artifact::Present(text) if !text.trim().is_empty() => {
            md.push("```yaml".into());
            md.push(text.trim_end().to_string());
            md.push("```".into());
        }
        Artifact::Unreadable(reason) => md.push(format!(
            "_config_final.yaml could not be read ({})._",
            escape_cell(reason)
        )),
        _ => md.push("_config_final.yaml not found._".into()),
    }
    md.push(String::new());

    md.push("## Reproduce".into());
    match inputs.meta.get("command").and_then(Value::as_str).filter(|c| !c.is_empty()) {
        Some(command) => {
            md.push("```bash".into());
            md.push(command.to_string());
            md.push("```".into());
        }
        None => md.push("_No command recorded._".into()),
    }
    md.push(String::new());

    md.join("\n")
}

/// Generate `<out_dir>/report.md` (and `assets/`) from `run_dir`.
///
/// Returns the report path.
///
/// # Errors
///
/// - [`Error::RunNotFound`] if `run_dir` does not exist
/// - [`Error::MetaNotFound`] if `run_dir/meta.json` is missing
/// - IO/JSON errors reading artifacts or writing the report
pub fn generate_report(run_dir: impl AsRef<Path>, out_dir: impl AsRef<Path>) -> Result<PathBuf> {
    let run = RunDir::open(run_dir)?;
    let out_dir = out_dir.as_ref();

    let meta_path = run.meta_path();
    if !meta_path.is_file() {
        return Err(Error::MetaNotFound(run.path().to_path_buf()));
    }
    let meta = match serde_json::from_str::<Value>(&fs::read_to_string(&meta_path)?)? {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    let config_text = read_artifact(&run.config_snapshot_path(), Ok);
    let metrics = read_artifact(&run.metrics_path(), |text| parse_json_map(&text));

    fs::create_dir_all(out_dir)?;
    let assets = copy_plot_assets(&run.plots_dir(), &out_dir.join(ASSETS_DIR))?;

    let inputs = ReportInputs {
        run_id: run.run_id().to_string(),
        meta,
        config_text,
        metrics,
        assets,
    };

    let report_path = out_dir.join(REPORT_FILE);
    fs::write(&report_path, render_report(&inputs))?;
    tracing::info!(run_id = %inputs.run_id, path = %report_path.display(), "report written");
    Ok(report_path)
}
