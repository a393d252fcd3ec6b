//! Rate baseline: observed actions per second, times the period.

use super::Predictor;
use lva_common::{Error, Result, TrainingExample, UserHistory};
use lva_config::BaselineConfig;

/// Predicts `len / (span + padding) * period`.
///
/// Timestamps often have day resolution, so the observed span under-counts
/// the real window; `padding` (one day by default) compensates. Needs no
/// training.
#[derive(Debug, Clone)]
pub struct SimpleRateLearner {
    padding_secs: f64,
}

impl SimpleRateLearner {
    pub fn new(config: &BaselineConfig) -> Self {
        Self {
            padding_secs: config.span_padding_secs,
        }
    }

    /// Actions per second over the padded observed span.
    pub fn rate(&self, query: &UserHistory) -> Result<f64> {
        let ts = query.history.timestamps();
        if ts.is_empty() {
            return Err(Error::InsufficientHistory {
                required: 1,
                actual: 0,
            });
        }
        if ts.iter().any(|t| !t.is_finite()) {
            return Err(Error::InvalidArgument(format!(
                "user {} has non-finite timestamps",
                query.user_id
            )));
        }
        let first = ts.iter().copied().fold(f64::INFINITY, f64::min);
        let last = ts.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let window = last - first + self.padding_secs;
        if window <= 0.0 {
            return Err(Error::InvalidArgument(
                "observation window must be positive; raise baseline.span_padding_secs".to_string(),
            ));
        }
        Ok(ts.len() as f64 / window)
    }
}

impl Predictor for SimpleRateLearner {
    fn name(&self) -> String {
        "SimpleLearner".to_string()
    }

    fn learn(&mut self, _examples: &[TrainingExample]) -> Result<()> {
        Ok(())
    }

    fn predict(&self, query: &UserHistory, period: f64) -> Result<f64> {
        if !(period.is_finite() && period > 0.0) {
            return Err(Error::InvalidArgument(format!(
                "prediction period must be finite and > 0, got {}",
                period
            )));
        }
        Ok(self.rate(query)? * period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: f64 = 86_400.0;

    fn learner() -> SimpleRateLearner {
        SimpleRateLearner::new(&BaselineConfig::default())
    }

    #[test]
    fn test_rate_over_padded_span() {
        // 4 actions over 2 days of span + 1 day padding
        let q = UserHistory::new(1u64, vec![0.0, DAY, 2.0 * DAY, 2.0 * DAY]);
        let p = learner().predict(&q, 3.0 * DAY).unwrap();
        assert!((p - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_action_uses_padding_only() {
        let q = UserHistory::new(1u64, vec![5.0]);
        let p = learner().predict(&q, DAY).unwrap();
        assert!((p - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_unsorted_history() {
        let a = UserHistory::new(1u64, vec![2.0 * DAY, 0.0, DAY]);
        let b = UserHistory::new(1u64, vec![0.0, DAY, 2.0 * DAY]);
        assert_eq!(
            learner().predict(&a, DAY).unwrap(),
            learner().predict(&b, DAY).unwrap()
        );
    }

    #[test]
    fn test_errors() {
        let empty = UserHistory::new(1u64, Vec::<f64>::new());
        assert!(matches!(
            learner().predict(&empty, DAY),
            Err(Error::InsufficientHistory { .. })
        ));
        let q = UserHistory::new(1u64, vec![0.0, 1.0]);
        assert!(matches!(
            learner().predict(&q, 0.0),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_learn_is_noop() {
        let mut l = learner();
        l.learn(&[]).unwrap();
        assert_eq!(l.name(), "SimpleLearner");
    }
}
