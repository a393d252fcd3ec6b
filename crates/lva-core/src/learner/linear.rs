//! Ridge regression from history features to activity rate.

use super::Predictor;
use crate::features::{vectorize, FEATURE_COUNT};
use crate::logging::event_names;
use lva_common::{Error, Result, TrainingExample, UserHistory};
use lva_config::LinearConfig;
use tracing::{debug, info};

const PIVOT_EPSILON: f64 = 1e-12;

/// Fitted coefficients over standardized features.
#[derive(Debug, Clone, PartialEq)]
struct LinearModel {
    center: [f64; FEATURE_COUNT],
    scale: [f64; FEATURE_COUNT],
    intercept: f64,
    weights: [f64; FEATURE_COUNT],
}

impl LinearModel {
    fn rate(&self, features: &[f64; FEATURE_COUNT]) -> f64 {
        let mut r = self.intercept;
        for j in 0..FEATURE_COUNT {
            r += self.weights[j] * (features[j] - self.center[j]) / self.scale[j];
        }
        r
    }
}

/// Predicts `max(0, rate) * period` where `rate` is linear in the
/// [`vectorize`] features of the query.
#[derive(Debug, Clone)]
pub struct LinearRateLearner {
    ridge: f64,
    model: Option<LinearModel>,
}

impl LinearRateLearner {
    pub fn new(config: &LinearConfig) -> Self {
        Self {
            ridge: config.ridge,
            model: None,
        }
    }

    pub fn is_trained(&self) -> bool {
        self.model.is_some()
    }
}

impl Predictor for LinearRateLearner {
    fn name(&self) -> String {
        "LinearRegression".to_string()
    }

    fn learn(&mut self, examples: &[TrainingExample]) -> Result<()> {
        self.model = None;

        let mut rows = Vec::with_capacity(examples.len());
        let mut targets = Vec::with_capacity(examples.len());
        for ex in examples {
            let features = match vectorize(&ex.history) {
                Ok(f) => f,
                Err(Error::InsufficientHistory { .. }) => continue,
                Err(e) => return Err(e),
            };
            rows.push(features);
            targets.push(ex.outcome.activity_rate()?);
        }
        if rows.is_empty() {
            return Err(Error::InvalidTrainingSet(
                "no example has enough history to compute features".to_string(),
            ));
        }
        debug!(
            event = event_names::DATA_FILTERED,
            kept = rows.len(),
            dropped = examples.len() - rows.len(),
            "feature rows prepared"
        );

        let model = fit_ridge(&rows, &targets, self.ridge)?;
        info!(
            event = event_names::LEARN_FINISHED,
            learner = "LinearRegression",
            rows = rows.len(),
            intercept = model.intercept,
            "linear model fitted"
        );
        self.model = Some(model);
        Ok(())
    }

    fn predict(&self, query: &UserHistory, period: f64) -> Result<f64> {
        if !(period.is_finite() && period > 0.0) {
            return Err(Error::InvalidArgument(format!(
                "prediction period must be finite and > 0, got {}",
                period
            )));
        }
        let model = self.model.as_ref().ok_or(Error::NoModelAvailable)?;
        let features = vectorize(&query.history)?;
        Ok(model.rate(&features).max(0.0) * period)
    }
}

fn fit_ridge(rows: &[[f64; FEATURE_COUNT]], targets: &[f64], ridge: f64) -> Result<LinearModel> {
    let n = rows.len() as f64;

    let mut center = [0.0; FEATURE_COUNT];
    let mut scale = [1.0; FEATURE_COUNT];
    for j in 0..FEATURE_COUNT {
        let column: Vec<f64> = rows.iter().map(|r| r[j]).collect();
        center[j] = lva_math::mean(&column);
        let sd = lva_math::variance(&column).sqrt();
        // Constant columns stay unscaled and end up with weight ~0.
        if sd.is_finite() && sd > PIVOT_EPSILON {
            scale[j] = sd;
        }
    }

    // Normal equations over [1, z_1..z_p]; the intercept is not penalised.
    let dim = FEATURE_COUNT + 1;
    let mut a = vec![vec![0.0; dim]; dim];
    let mut b = vec![0.0; dim];
    for (row, &y) in rows.iter().zip(targets) {
        let mut z = [0.0; FEATURE_COUNT + 1];
        z[0] = 1.0;
        for j in 0..FEATURE_COUNT {
            z[j + 1] = (row[j] - center[j]) / scale[j];
        }
        for i in 0..dim {
            b[i] += z[i] * y;
            for k in 0..dim {
                a[i][k] += z[i] * z[k];
            }
        }
    }
    for (i, row) in a.iter_mut().enumerate().skip(1) {
        row[i] += ridge * n;
    }

    let beta = solve(a, b).ok_or_else(|| {
        Error::InvalidTrainingSet(
            "feature matrix is singular; raise linear.ridge".to_string(),
        )
    })?;

    let mut weights = [0.0; FEATURE_COUNT];
    weights.copy_from_slice(&beta[1..]);
    Ok(LinearModel {
        center,
        scale,
        intercept: beta[0],
        weights,
    })
}

/// Gaussian elimination with partial pivoting. `None` when singular.
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if !(a[pivot][col].abs() > PIVOT_EPSILON) {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    x.iter().all(|v| v.is_finite()).then_some(x)
}
