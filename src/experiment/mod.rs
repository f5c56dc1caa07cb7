//! Experiment execution
//!
//! Dispatches on `data.name` in the final config to a built-in experiment.
//! An experiment writes its plots under the run's `plots/` directory and
//! returns a metrics mapping; the caller persists it as `metrics.json`.
//!
//! ## Built-in experiments
//!
//! | `data.name` | experiment                                   |
//! |-------------|----------------------------------------------|
//! | `iris`      | logistic regression on the Iris dataset      |

mod dataset;
pub mod iris;
mod plot;

pub use dataset::{IRIS, IRIS_CLASSES, IRIS_FEATURES};
pub use plot::save_confusion_matrix;

use serde_json::Value;

use crate::config::Config;
use crate::run::{RunDir, RunLogger};
use crate::{Error, Result};

/// Metrics mapping returned by an experiment.
pub type Metrics = serde_json::Map<String, Value>;

/// True if `cfg` describes an experiment to execute (has a `data` section).
#[must_use]
pub fn has_experiment(cfg: &Config) -> bool {
    cfg.get("data").is_some_and(|d| !d.is_null())
}

/// Run the experiment selected by `data.name`.
///
/// # Errors
///
/// Returns [`Error::UnknownDataset`] if `data.name` names no built-in
/// experiment, or whatever the experiment itself fails with.
pub fn run_experiment(cfg: &Config, run_dir: &RunDir, logger: &RunLogger) -> Result<Metrics> {
    let name = cfg
        .get("data")
        .and_then(Value::as_object)
        .and_then(|data| data.get("name"));

    match name.and_then(Value::as_str) {
        Some("iris") => iris::run(cfg, run_dir, logger),
        _ => Err(Error::UnknownDataset(
            name.map_or_else(|| "null".to_string(), Value::to_string),
        )),
    }
}
