//! Posterior-conditioned rollout.
//!
//! The model's start distribution is temporarily replaced by the filtering
//! posterior at the user's last observed interval, so the sampled future
//! continues from where the user's history left off. The replacement is held
//! by [`StartOverride`], which restores the original on drop.

use crate::hmm::GaussianHmm;
use crate::logging::event_names;
use lva_common::{Error, Result};
use lva_config::SamplingConfig;
use rand::Rng;
use std::ops::{Deref, DerefMut};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, trace};

/// Lock a shared model, recovering the data if a previous holder panicked.
///
/// A panicking holder cannot leave the start distribution overridden, since
/// [`StartOverride`] restores it while unwinding.
pub fn lock_model(model: &Mutex<GaussianHmm>) -> MutexGuard<'_, GaussianHmm> {
    model.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Scoped start-distribution override.
pub struct StartOverride<'a> {
    model: &'a mut GaussianHmm,
    original: Option<Vec<f64>>,
}

impl<'a> StartOverride<'a> {
    pub fn apply(model: &'a mut GaussianHmm, start_prob: Vec<f64>) -> Result<Self> {
        let original = model.replace_start_prob(start_prob)?;
        Ok(Self {
            model,
            original: Some(original),
        })
    }
}

impl Deref for StartOverride<'_> {
    type Target = GaussianHmm;

    fn deref(&self) -> &GaussianHmm {
        self.model
    }
}

impl DerefMut for StartOverride<'_> {
    fn deref_mut(&mut self) -> &mut GaussianHmm {
        self.model
    }
}

impl Drop for StartOverride<'_> {
    fn drop(&mut self) {
        if let Some(original) = self.original.take() {
            // Same length as the current vector, so this cannot fail.
            let _ = self.model.replace_start_prob(original);
        }
    }
}

/// Turns a model plus a history into a predicted action count.
#[derive(Debug, Clone)]
pub struct PredictionSampler {
    max_rollout_steps: usize,
}

impl Default for PredictionSampler {
    fn default() -> Self {
        Self::new(&SamplingConfig::default())
    }
}

impl PredictionSampler {
    pub fn new(config: &SamplingConfig) -> Self {
        Self {
            max_rollout_steps: config.max_rollout_steps,
        }
    }

    /// Predict how many actions fit into the next `period` seconds.
    pub fn predict_count<R: Rng>(
        &self,
        model: &Mutex<GaussianHmm>,
        history: &[f64],
        period: f64,
        rng: &mut R,
    ) -> Result<f64> {
        if !(period.is_finite() && period > 0.0) {
            return Err(Error::InvalidArgument(format!(
                "prediction period must be finite and > 0, got {}",
                period
            )));
        }

        let mut guard = lock_model(model);
        let Some(posterior) = guard.filtering_posterior(history) else {
            // Zero-probability history: roll out from the fitted start distribution.
            debug!(
                event = event_names::PREDICT_ROLLOUT,
                "history has zero likelihood, keeping fitted start distribution"
            );
            return self.rollout(&guard, period, rng);
        };

        let conditioned = StartOverride::apply(&mut guard, posterior)?;
        self.rollout(&conditioned, period, rng)
    }

    /// One trajectory; counts intervals whose running sum stays within `period`.
    pub fn rollout<R: Rng>(&self, model: &GaussianHmm, period: f64, rng: &mut R) -> Result<f64> {
        let mut state = model.sample_initial_state(rng);
        let mut elapsed = 0.0;
        let mut count: usize = 0;

        for _ in 0..self.max_rollout_steps {
            elapsed += model.sample_emission(state, rng);
            if elapsed > period {
                trace!(
                    event = event_names::PREDICT_ROLLOUT,
                    count,
                    "rollout finished"
                );
                return Ok(count as f64);
            }
            count += 1;
            state = model.sample_next_state(state, rng);
        }

        Err(Error::SamplingDivergence {
            steps: self.max_rollout_steps,
            period,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sampler(max_rollout_steps: usize) -> PredictionSampler {
        PredictionSampler::new(&SamplingConfig { max_rollout_steps })
    }

    /// Two states with tiny, well-separated emissions that never cover a long period.
    fn slow_model() -> GaussianHmm {
        GaussianHmm::new(
            vec![0.5, 0.5],
            vec![vec![0.5, 0.5], vec![0.5, 0.5]],
            vec![0.0, 0.001],
            vec![1e-8, 1e-8],
        )
        .unwrap()
    }

    #[test]
    fn test_constant_interval_count() {
        // Intervals of exactly ~10s: 100s holds 10 of them.
        let model = Mutex::new(GaussianHmm::new(vec![1.0], vec![vec![1.0]], vec![10.0], vec![1e-12]).unwrap());
        let mut rng = StdRng::seed_from_u64(1);
        let count = sampler(1000)
            .predict_count(&model, &[10.0, 10.0], 105.0, &mut rng)
            .unwrap();
        assert_eq!(count, 10.0);
    }

    #[test]
    fn test_first_interval_exceeding_period_gives_zero() {
        let model = Mutex::new(GaussianHmm::new(vec![1.0], vec![vec![1.0]], vec![500.0], vec![1e-6]).unwrap());
        let mut rng = StdRng::seed_from_u64(1);
        let count = sampler(10)
            .predict_count(&model, &[500.0], 100.0, &mut rng)
            .unwrap();
        assert_eq!(count, 0.0);
    }

    #[test]
    fn test_invalid_period() {
        let model = Mutex::new(GaussianHmm::degenerate(1.0));
        let mut rng = StdRng::seed_from_u64(1);
        for period in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let err = sampler(10)
                .predict_count(&model, &[1.0], period, &mut rng)
                .unwrap_err();
            assert!(matches!(err, Error::InvalidArgument(_)));
        }
    }

    #[test]
    fn test_start_restored_after_success() {
        let model = Mutex::new(GaussianHmm::new(
            vec![0.5, 0.5],
            vec![vec![0.9, 0.1], vec![0.1, 0.9]],
            vec![10.0, 1000.0],
            vec![1.0, 1.0],
        )
        .unwrap());
        let mut rng = StdRng::seed_from_u64(4);
        sampler(10_000)
            .predict_count(&model, &[10.0, 1000.0], 5000.0, &mut rng)
            .unwrap();
        assert_eq!(lock_model(&model).start_prob(), &[0.5, 0.5]);
    }

    #[test]
    fn test_start_restored_after_divergence() {
        let model = Mutex::new(slow_model());
        let mut rng = StdRng::seed_from_u64(4);
        let err = sampler(100)
            .predict_count(&model, &[0.001], 1e6, &mut rng)
            .unwrap_err();
        assert!(matches!(err, Error::SamplingDivergence { steps: 100, .. }));
        assert_eq!(lock_model(&model).start_prob(), &[0.5, 0.5]);
    }

    #[test]
    fn test_start_restored_after_panic() {
        let model = Mutex::new(slow_model());
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let mut guard = lock_model(&model);
            let overridden = StartOverride::apply(&mut guard, vec![0.0, 1.0]).unwrap();
            assert_eq!(overridden.start_prob(), &[0.0, 1.0]);
            panic!("rollout blew up");
        }));
        assert!(result.is_err());
        assert!(model.is_poisoned());
        assert_eq!(lock_model(&model).start_prob(), &[0.5, 0.5]);
    }

    #[test]
    fn test_posterior_steers_first_state() {
        // Near-absorbing states; a history ending in the fast state keeps sampling fast intervals.
        let switch = 1e-12;
        let model = Mutex::new(GaussianHmm::new(
            vec![0.5, 0.5],
            vec![vec![1.0 - switch, switch], vec![switch, 1.0 - switch]],
            vec![1.0, 100.0],
            vec![1e-4, 1e-4],
        )
        .unwrap());
        let mut rng = StdRng::seed_from_u64(8);
        let s = sampler(10_000);
        for _ in 0..20 {
            let fast = s.predict_count(&model, &[100.0, 1.0], 50.5, &mut rng).unwrap();
            assert_eq!(fast, 50.0);
            let slow = s.predict_count(&model, &[1.0, 100.0], 50.5, &mut rng).unwrap();
            assert_eq!(slow, 0.0);
        }
    }
}
