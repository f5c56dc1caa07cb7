//! Iris classification: stratified split + multinomial logistic regression
//!
//! Config keys (all optional):
//!
//! | key                   | default | meaning                          |
//! |-----------------------|---------|----------------------------------|
//! | `seed`                | 0       | split shuffle seed               |
//! | `trainer.test_size`   | 0.2     | test fraction, in (0, 1)         |
//! | `model.type`          | -       | only logistic regression is used |
//! | `model.params.C`      | 1.0     | inverse L2 regularization        |
//! | `model.params.max_iter` | 200   | gradient descent iterations      |

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde_json::{Map, Value};

use super::dataset::{IRIS, IRIS_CLASSES, IRIS_FEATURES};
use super::plot::save_confusion_matrix;
use super::Metrics;
use crate::config::Config;
use crate::run::{RunDir, RunLogger};
use crate::{Error, Result};

const LEARNING_RATE: f64 = 0.5;
const PLOT_FILE: &str = "confusion_matrix.png";

/// Parameters of the iris experiment, read from config.
#[derive(Debug, Clone, PartialEq)]
pub struct IrisParams {
    /// Split shuffle seed.
    pub seed: u64,
    /// Test fraction.
    pub test_size: f64,
    /// Inverse regularization strength.
    pub c: f64,
    /// Gradient descent iterations.
    pub max_iter: usize,
    /// Requested model type, if any.
    pub model_type: Option<String>,
}

fn invalid(msg: impl Into<String>) -> Error {
    Error::InvalidExperiment(msg.into())
}

/// Sub-mapping at `key`; missing or null is `None`.
fn section<'a>(
    map: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(inner)) => Ok(Some(inner)),
        Some(_) => Err(invalid(format!("{key} must be a mapping"))),
    }
}

fn scalar<'a>(map: Option<&'a Map<String, Value>>, key: &str) -> Option<&'a Value> {
    map.and_then(|m| m.get(key)).filter(|v| !v.is_null())
}

fn number(map: Option<&Map<String, Value>>, key: &str, default: f64) -> Result<f64> {
    scalar(map, key).map_or(Ok(default), |v| {
        v.as_f64().ok_or_else(|| invalid(format!("{key} must be a number, got {v}")))
    })
}

fn count(map: Option<&Map<String, Value>>, key: &str, default: u64) -> Result<u64> {
    scalar(map, key).map_or(Ok(default), |v| {
        v.as_u64()
            .ok_or_else(|| invalid(format!("{key} must be a non-negative integer, got {v}")))
    })
}

impl IrisParams {
    /// Read parameters from `cfg`, applying defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidExperiment`] for mistyped or out-of-range values.
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let seed = count(Some(cfg), "seed", 0)?;

        let test_size = number(section(cfg, "trainer")?, "test_size", 0.2)?;
        if !(test_size > 0.0 && test_size < 1.0) {
            return Err(invalid(format!("trainer.test_size must be in (0, 1), got {test_size}")));
        }

        let model = section(cfg, "model")?;
        let model_type = scalar(model, "type")
            .map(|v| v.as_str().map_or_else(|| v.to_string(), str::to_string));
        let params = match model {
            Some(m) => section(m, "params")?,
            None => None,
        };

        let c = number(params, "C", 1.0)?;
        if !(c.is_finite() && c > 0.0) {
            return Err(invalid(format!("model.params.C must be positive, got {c}")));
        }
        let max_iter = usize::try_from(count(params, "max_iter", 200)?)
            .map_err(|_| invalid("model.params.max_iter is too large"))?;
        if max_iter == 0 {
            return Err(invalid("model.params.max_iter must be at least 1"));
        }

        Ok(Self {
            seed,
            test_size,
            c,
            max_iter,
            model_type,
        })
    }
}

/// Train/test index split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    /// Training sample indices, ascending.
    pub train: Vec<usize>,
    /// Test sample indices, ascending.
    pub test: Vec<usize>,
}

/// Stratified split: each class contributes to the test set in proportion to
/// its size. The test set has `ceil(test_size * n)` samples.
///
/// # Errors
///
/// Returns [`Error::InvalidExperiment`] if either side would hold fewer
/// samples than there are classes.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn stratified_split(labels: &[usize], test_size: f64, seed: u64) -> Result<Split> {
    let n = labels.len();
    let n_classes = labels.iter().max().map_or(0, |m| m + 1);
    let n_test = (test_size * n as f64).ceil() as usize;
    if n_test < n_classes || n - n_test.min(n) < n_classes {
        return Err(invalid(format!(
            "test_size={test_size} leaves fewer samples than classes on one side of the split"
        )));
    }

    let mut by_class: Vec<Vec<usize>> = vec![Vec::new(); n_classes];
    for (i, &y) in labels.iter().enumerate() {
        by_class[y].push(i);
    }

    // Largest-remainder allocation of n_test across classes.
    let exact: Vec<f64> = by_class
        .iter()
        .map(|idx| n_test as f64 * idx.len() as f64 / n as f64)
        .collect();
    let mut per_class: Vec<usize> = exact.iter().map(|e| e.floor() as usize).collect();
    let mut order: Vec<usize> = (0..n_classes).collect();
    order.sort_by(|&a, &b| {
        let ra = exact[a] - exact[a].floor();
        let rb = exact[b] - exact[b].floor();
        rb.total_cmp(&ra).then(a.cmp(&b))
    });
    let assigned: usize = per_class.iter().sum();
    for &k in order.iter().take(n_test - assigned) {
        per_class[k] += 1;
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut split = Split {
        train: Vec::with_capacity(n - n_test),
        test: Vec::with_capacity(n_test),
    };
    for (mut idx, take) in by_class.into_iter().zip(per_class) {
        idx.shuffle(&mut rng);
        let (test, train) = idx.split_at(take.min(idx.len()));
        split.test.extend_from_slice(test);
        split.train.extend_from_slice(train);
    }
    split.train.sort_unstable();
    split.test.sort_unstable();
    Ok(split)
}

/// Multinomial logistic regression with L2 penalty, trained by full-batch
/// gradient descent on standardized features.
#[derive(Debug, Clone)]
pub struct LogisticRegression {
    mean: Vec<f64>,
    scale: Vec<f64>,
    // One row per class: feature weights followed by the bias.
    weights: Vec<Vec<f64>>,
}

impl LogisticRegression {
    /// Fit on `x`/`y`. Minimizes mean cross-entropy plus `||W||² / (2·C·n)`;
    /// the bias is not penalized.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fit(x: &[Vec<f64>], y: &[usize], n_classes: usize, c: f64, max_iter: usize) -> Self {
        let n = x.len().max(1) as f64;
        let d = x.first().map_or(0, Vec::len);

        let mean: Vec<f64> = (0..d).map(|j| x.iter().map(|r| r[j]).sum::<f64>() / n).collect();
        let scale: Vec<f64> = (0..d)
            .map(|j| {
                let var = x.iter().map(|r| (r[j] - mean[j]).powi(2)).sum::<f64>() / n;
                if var > 0.0 {
                    var.sqrt()
                } else {
                    1.0
                }
            })
            .collect();

        let mut model = Self {
            mean,
            scale,
            weights: vec![vec![0.0; d + 1]; n_classes],
        };
        let z: Vec<Vec<f64>> = x.iter().map(|r| model.augment(r)).collect();

        for _ in 0..max_iter {
            let mut grad = vec![vec![0.0; d + 1]; n_classes];
            for (zi, &yi) in z.iter().zip(y) {
                let p = model.probabilities(zi);
                for (k, g) in grad.iter_mut().enumerate() {
                    let err = p[k] - if k == yi { 1.0 } else { 0.0 };
                    for (gj, zj) in g.iter_mut().zip(zi) {
                        *gj += err * zj / n;
                    }
                }
            }
            for (w, g) in model.weights.iter_mut().zip(&grad) {
                for (j, (wj, gj)) in w.iter_mut().zip(g).enumerate() {
                    let penalty = if j < d { *wj / (c * n) } else { 0.0 };
                    *wj -= LEARNING_RATE * (gj + penalty);
                }
            }
        }
        model
    }

    fn augment(&self, row: &[f64]) -> Vec<f64> {
        let mut z: Vec<f64> = row
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(v, (m, s))| (v - m) / s)
            .collect();
        z.push(1.0);
        z
    }

    fn probabilities(&self, z: &[f64]) -> Vec<f64> {
        let logits: Vec<f64> = self
            .weights
            .iter()
            .map(|w| w.iter().zip(z).map(|(a, b)| a * b).sum())
            .collect();
        let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let exp: Vec<f64> = logits.iter().map(|l| (l - max).exp()).collect();
        let total: f64 = exp.iter().sum();
        exp.into_iter().map(|e| e / total).collect()
    }

    /// Most probable class for `row`.
    #[must_use]
    pub fn predict(&self, row: &[f64]) -> usize {
        let p = self.probabilities(&self.augment(row));
        p.iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map_or(0, |(k, _)| k)
    }
}

/// Confusion matrix indexed `[true][predicted]`.
#[must_use]
pub fn confusion_matrix(y_true: &[usize], y_pred: &[usize], n_classes: usize) -> Vec<Vec<u64>> {
    let mut cm = vec![vec![0u64; n_classes]; n_classes];
    for (&t, &p) in y_true.iter().zip(y_pred) {
        cm[t][p] += 1;
    }
    cm
}

/// Run the iris experiment and write its confusion matrix plot.
///
/// # Errors
///
/// Returns an error for invalid parameters or if the plot cannot be written.
#[allow(clippy::cast_precision_loss)]
pub fn run(cfg: &Config, run_dir: &RunDir, logger: &RunLogger) -> Result<Metrics> {
    let params = IrisParams::from_config(cfg)?;
    if let Some(model_type) = params
        .model_type
        .as_deref()
        .filter(|t| !matches!(*t, "logistic_regression" | "logreg"))
    {
        logger.warn(format!(
            "model.type={model_type} (iris experiment uses logistic regression anyway)"
        ));
    }

    logger.info("load iris dataset");
    let x: Vec<Vec<f64>> = IRIS.iter().map(|(row, _)| row.to_vec()).collect();
    let y: Vec<usize> = IRIS.iter().map(|(_, label)| *label).collect();

    logger.info(format!(
        "stratified split test_size={} seed={}",
        params.test_size, params.seed
    ));
    let split = stratified_split(&y, params.test_size, params.seed)?;
    let pick_x = |idx: &[usize]| idx.iter().map(|&i| x[i].clone()).collect::<Vec<_>>();
    let pick_y = |idx: &[usize]| idx.iter().map(|&i| y[i]).collect::<Vec<_>>();
    let (x_train, y_train) = (pick_x(&split.train), pick_y(&split.train));
    let (x_test, y_test) = (pick_x(&split.test), pick_y(&split.test));

    logger.info(format!(
        "train logistic regression C={} max_iter={} features={IRIS_FEATURES}",
        params.c, params.max_iter
    ));
    let model = LogisticRegression::fit(
        &x_train,
        &y_train,
        IRIS_CLASSES.len(),
        params.c,
        params.max_iter,
    );

    let y_pred: Vec<usize> = x_test.iter().map(|r| model.predict(r)).collect();
    let correct = y_pred.iter().zip(&y_test).filter(|(p, t)| p == t).count();
    let accuracy = correct as f64 / y_test.len() as f64;
    let cm = confusion_matrix(&y_test, &y_pred, IRIS_CLASSES.len());
    logger.info(format!("accuracy={accuracy:.4}"));

    let plot_path = run_dir.plots_dir().join(PLOT_FILE);
    save_confusion_matrix(&cm, &IRIS_CLASSES, &plot_path)?;
    logger.info(format!("plot saved: {}", plot_path.display()));

    let mut metrics = Metrics::new();
    metrics.insert("accuracy".into(), Value::from(accuracy));
    metrics.insert("n_train".into(), Value::from(x_train.len()));
    metrics.insert("n_test".into(), Value::from(x_test.len()));
    metrics.insert("confusion_matrix".into(), serde_json::to_value(&cm)?);
    metrics.insert("class_names".into(), serde_json::to_value(IRIS_CLASSES)?);
    Ok(metrics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cfg(v: Value) -> Config {
        serde_json::from_value(v).unwrap()
    }

    fn labels() -> Vec<usize> {
        IRIS.iter().map(|(_, y)| *y).collect()
    }

    #[test]
    fn test_params_defaults() {
        let p = IrisParams::from_config(&Config::new()).unwrap();
        assert_eq!(p.seed, 0);
        assert!((p.test_size - 0.2).abs() < f64::EPSILON);
        assert!((p.c - 1.0).abs() < f64::EPSILON);
        assert_eq!(p.max_iter, 200);
        assert!(p.model_type.is_none());
    }

    #[test]
    fn test_params_from_config() {
        let p = IrisParams::from_config(&cfg(json!({
            "seed": 7,
            "trainer": {"test_size": 0.3},
            "model": {"type": "logreg", "params": {"C": 0.5, "max_iter": 50}}
        })))
        .unwrap();
        assert_eq!(p.seed, 7);
        assert!((p.c - 0.5).abs() < f64::EPSILON);
        assert_eq!(p.max_iter, 50);
        assert_eq!(p.model_type.as_deref(), Some("logreg"));
    }

    #[test]
    fn test_params_rejects_bad_values() {
        assert!(IrisParams::from_config(&cfg(json!({"trainer": {"test_size": 1.5}}))).is_err());
        assert!(IrisParams::from_config(&cfg(json!({"model": {"params": {"C": 0}}}))).is_err());
        assert!(IrisParams::from_config(&cfg(json!({"seed": -1}))).is_err());
        assert!(IrisParams::from_config(&cfg(json!({"trainer": 3}))).is_err());
    }

    #[test]
    fn test_stratified_split_proportions() {
        let y = labels();
        let split = stratified_split(&y, 0.2, 0).unwrap();
        assert_eq!(split.test.len(), 30);
        assert_eq!(split.train.len(), 120);
        for class in 0..3 {
            assert_eq!(split.test.iter().filter(|&&i| y[i] == class).count(), 10);
        }
        let mut all: Vec<usize> = split.train.iter().chain(&split.test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..150).collect::<Vec<_>>());
    }

    #[test]
    fn test_stratified_split_deterministic() {
        let y = labels();
        assert_eq!(stratified_split(&y, 0.2, 42).unwrap(), stratified_split(&y, 0.2, 42).unwrap());
        assert_ne!(stratified_split(&y, 0.2, 1).unwrap(), stratified_split(&y, 0.2, 2).unwrap());
    }

    #[test]
    fn test_split_too_small_rejected() {
        assert!(stratified_split(&labels(), 0.01, 0).is_err());
    }

    #[test]
    fn test_model_learns_iris() {
        let y = labels();
        let split = stratified_split(&y, 0.2, 0).unwrap();
        let x: Vec<Vec<f64>> = IRIS.iter().map(|(r, _)| r.to_vec()).collect();
        let xs: Vec<Vec<f64>> = split.train.iter().map(|&i| x[i].clone()).collect();
        let ys: Vec<usize> = split.train.iter().map(|&i| y[i]).collect();

        let model = LogisticRegression::fit(&xs, &ys, 3, 1.0, 200);
        let correct = split.test.iter().filter(|&&i| model.predict(&x[i]) == y[i]).count();
        assert!(correct >= 24, "only {correct}/30 correct");
    }

    #[test]
    fn test_confusion_matrix() {
        let cm = confusion_matrix(&[0, 1, 2, 2], &[0, 2, 2, 2], 3);
        assert_eq!(cm, vec![vec![1, 0, 0], vec![0, 0, 1], vec![0, 0, 2]]);
    }
}
