//! Prediction error metrics and the held-out evaluation harness.
//!
//! Every metric takes `(predicted, actual)` counts. Averages are taken over
//! successful predictions only; failed predictions are counted separately
//! by error code and never scored as zero.

use crate::learner::{make_rng, Predictor};
use crate::logging::event_names;
use chrono::{DateTime, Utc};
use lva_common::{Error, Result, TrainingExample};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{info, warn};

/// `|predicted / actual - 1|`; an actual of zero divides by one instead.
pub fn percent_error(predicted: f64, actual: f64) -> f64 {
    let denom = if actual == 0.0 { 1.0 } else { actual };
    (predicted / denom - 1.0).abs()
}

pub fn square_error(predicted: f64, actual: f64) -> f64 {
    (predicted - actual).powi(2)
}

/// Distance in natural-log orders of magnitude. A non-positive side counts
/// as order `-1`.
pub fn magnitude_error(predicted: f64, actual: f64) -> f64 {
    let order = |v: f64| if v > 0.0 { v.ln() } else { -1.0 };
    (order(predicted) - order(actual)).abs()
}

/// Percent error, counted only when the prediction is too low.
pub fn under_error(predicted: f64, actual: f64) -> f64 {
    if predicted < actual {
        percent_error(predicted, actual)
    } else {
        0.0
    }
}

/// Percent error, counted only when the prediction is too high.
pub fn over_error(predicted: f64, actual: f64) -> f64 {
    if predicted > actual {
        percent_error(predicted, actual)
    } else {
        0.0
    }
}

/// Mean of each metric over the scored predictions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorMetrics {
    pub magnitude: f64,
    pub percent: f64,
    pub square: f64,
    pub under: f64,
    pub over: f64,
}

impl ErrorMetrics {
    /// Metrics for a single prediction.
    pub fn of(predicted: f64, actual: f64) -> Self {
        Self {
            magnitude: magnitude_error(predicted, actual),
            percent: percent_error(predicted, actual),
            square: square_error(predicted, actual),
            under: under_error(predicted, actual),
            over: over_error(predicted, actual),
        }
    }

    fn accumulate(&mut self, other: &ErrorMetrics) {
        self.magnitude += other.magnitude;
        self.percent += other.percent;
        self.square += other.square;
        self.under += other.under;
        self.over += other.over;
    }

    fn scaled(&self, factor: f64) -> Self {
        Self {
            magnitude: self.magnitude * factor,
            percent: self.percent * factor,
            square: self.square * factor,
            under: self.under * factor,
            over: self.over * factor,
        }
    }
}

/// Result of running a predictor over a held-out set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub learner: String,
    pub generated_at: DateTime<Utc>,
    pub train_count: usize,
    pub test_count: usize,
    /// Predictions that produced a count.
    pub scored: usize,
    /// Predictions that returned an error.
    pub failed: usize,
    /// Failure counts keyed by error code.
    pub failures_by_code: BTreeMap<u32, usize>,
    /// `None` when nothing was scored.
    pub metrics: Option<ErrorMetrics>,
    pub elapsed_ms: u64,
}

/// Predict every test example over its own outcome window and score the
/// result against the observed action count.
pub fn evaluate(
    predictor: &dyn Predictor,
    train_count: usize,
    test: &[TrainingExample],
) -> EvaluationReport {
    let started = Instant::now();
    let mut totals = ErrorMetrics::default();
    let mut scored = 0usize;
    let mut failures_by_code = BTreeMap::new();

    for ex in test {
        match predictor.predict(&ex.query(), ex.outcome.duration) {
            Ok(predicted) => {
                totals.accumulate(&ErrorMetrics::of(predicted, ex.outcome.action_count as f64));
                scored += 1;
            }
            Err(e) => {
                warn!(
                    event = event_names::PREDICT_FAILED,
                    user_id = %ex.user_id,
                    code = e.code(),
                    error = %e,
                    "prediction failed"
                );
                *failures_by_code.entry(e.code()).or_insert(0) += 1;
            }
        }
    }

    let failed = test.len() - scored;
    let metrics = (scored > 0).then(|| totals.scaled(1.0 / scored as f64));
    let elapsed_ms = started.elapsed().as_millis() as u64;
    info!(
        event = event_names::EVAL_FINISHED,
        learner = %predictor.name(),
        scored,
        failed,
        elapsed_ms,
        "evaluation finished"
    );

    EvaluationReport {
        learner: predictor.name(),
        generated_at: Utc::now(),
        train_count,
        test_count: test.len(),
        scored,
        failed,
        failures_by_code,
        metrics,
        elapsed_ms,
    }
}

/// Shuffle and split into `(train, test)`, with `round(len * test_fraction)`
/// examples held out. The same seed always yields the same split.
pub fn split_examples(
    examples: &[TrainingExample],
    test_fraction: f64,
    seed: Option<u64>,
) -> Result<(Vec<TrainingExample>, Vec<TrainingExample>)> {
    if !(0.0..=1.0).contains(&test_fraction) {
        return Err(Error::InvalidArgument(format!(
            "test fraction must be within [0, 1], got {}",
            test_fraction
        )));
    }
    let mut shuffled = examples.to_vec();
    shuffled.shuffle(&mut make_rng(seed));

    let test_len = ((shuffled.len() as f64) * test_fraction).round() as usize;
    let test = shuffled.split_off(shuffled.len() - test_len.min(shuffled.len()));
    Ok((shuffled, test))
}
