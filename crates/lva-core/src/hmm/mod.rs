//! Gaussian hidden Markov model over inter-event intervals.
//!
//! # Model
//!
//! - Hidden states: `S_t ∈ {0, …, n-1}`
//! - Start: `P(S_0 = i) = π_i`
//! - Transitions: `P(S_{t+1} = j | S_t = i) = A_ij` (row-stochastic)
//! - Emissions: `x_t | S_t = i ~ N(μ_i, σ²_i)`
//!
//! All recursions run in the log domain with [`lva_math::log_sum_exp`].
//! Fitting lives in [`fit`]; trajectory sampling in [`sample`].

pub mod fit;
pub mod sample;

pub use fit::{fit_model, FitOptions, FitReport};

use lva_common::Error;
use lva_math::{gaussian_log_pdf, log_sum_exp, normalize_log_weights, safe_ln};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Probability vectors must sum to one within this tolerance.
const PROB_SUM_TOLERANCE: f64 = 1e-6;

/// Model-local fitting errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {
    #[error("no observations to fit")]
    NoObservations { states: usize },

    #[error("{distinct} distinct observations cannot support {states} states")]
    TooFewDistinct { distinct: usize, states: usize },

    #[error("state {state} lost all responsibility")]
    VanishingState { state: usize, states: usize },

    #[error("log-likelihood became non-finite at iteration {iteration}")]
    NonFiniteLikelihood { iteration: usize, states: usize },

    #[error("invalid model parameters: {message}")]
    InvalidParameters { message: String, states: usize },
}

impl FitError {
    /// State count of the failed attempt.
    pub fn states(&self) -> usize {
        match self {
            FitError::NoObservations { states }
            | FitError::TooFewDistinct { states, .. }
            | FitError::VanishingState { states, .. }
            | FitError::NonFiniteLikelihood { states, .. }
            | FitError::InvalidParameters { states, .. } => *states,
        }
    }
}

impl From<FitError> for Error {
    fn from(err: FitError) -> Self {
        Error::ModelFitFailure {
            states: err.states(),
            reason: err.to_string(),
        }
    }
}

/// A fitted (or prior) Gaussian HMM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaussianHmm {
    start_prob: Vec<f64>,
    trans_prob: Vec<Vec<f64>>,
    means: Vec<f64>,
    variances: Vec<f64>,
}

impl GaussianHmm {
    /// Build a model, checking shapes and that every distribution sums to one.
    pub fn new(
        start_prob: Vec<f64>,
        trans_prob: Vec<Vec<f64>>,
        means: Vec<f64>,
        variances: Vec<f64>,
    ) -> Result<Self, FitError> {
        let n = start_prob.len();
        let invalid = |message: String| FitError::InvalidParameters { message, states: n };

        if n == 0 {
            return Err(invalid("state count must be at least 1".to_string()));
        }
        if trans_prob.len() != n || means.len() != n || variances.len() != n {
            return Err(invalid(format!(
                "dimension mismatch: start={}, trans={}, means={}, variances={}",
                n,
                trans_prob.len(),
                means.len(),
                variances.len()
            )));
        }
        check_distribution(&start_prob).map_err(|m| invalid(format!("start_prob {}", m)))?;
        for (i, row) in trans_prob.iter().enumerate() {
            if row.len() != n {
                return Err(invalid(format!("trans_prob row {} has {} entries", i, row.len())));
            }
            check_distribution(row).map_err(|m| invalid(format!("trans_prob row {} {}", i, m)))?;
        }
        if let Some(i) = means.iter().position(|m| !m.is_finite()) {
            return Err(invalid(format!("mean {} is not finite", i)));
        }
        if let Some(i) = variances
            .iter()
            .position(|v| !(v.is_finite() && *v > 0.0))
        {
            return Err(invalid(format!("variance {} must be finite and > 0", i)));
        }

        Ok(Self {
            start_prob,
            trans_prob,
            means,
            variances,
        })
    }

    /// Uniform start distribution with every transition row equal to it.
    pub fn fair_prior(means: Vec<f64>, variances: Vec<f64>) -> Result<Self, FitError> {
        let n = means.len();
        let uniform = vec![1.0 / n.max(1) as f64; n];
        Self::new(uniform.clone(), vec![uniform; n], means, variances)
    }

    /// One state emitting `N(0, min_variance)`.
    pub fn degenerate(min_variance: f64) -> Self {
        Self {
            start_prob: vec![1.0],
            trans_prob: vec![vec![1.0]],
            means: vec![0.0],
            variances: vec![min_variance],
        }
    }

    pub fn state_count(&self) -> usize {
        self.start_prob.len()
    }

    pub fn start_prob(&self) -> &[f64] {
        &self.start_prob
    }

    pub fn trans_prob(&self) -> &[Vec<f64>] {
        &self.trans_prob
    }

    pub fn means(&self) -> &[f64] {
        &self.means
    }

    pub fn variances(&self) -> &[f64] {
        &self.variances
    }

    /// Swap in a new start distribution, returning the previous one.
    pub fn replace_start_prob(&mut self, start_prob: Vec<f64>) -> Result<Vec<f64>, FitError> {
        if start_prob.len() != self.state_count() {
            return Err(FitError::InvalidParameters {
                message: format!(
                    "start_prob has {} entries for {} states",
                    start_prob.len(),
                    self.state_count()
                ),
                states: self.state_count(),
            });
        }
        check_distribution(&start_prob).map_err(|m| FitError::InvalidParameters {
            message: format!("start_prob {}", m),
            states: self.state_count(),
        })?;
        Ok(std::mem::replace(&mut self.start_prob, start_prob))
    }

    /// Emission log-density of `x` under `state`.
    pub fn log_emission(&self, state: usize, x: f64) -> f64 {
        gaussian_log_pdf(x, self.means[state], self.variances[state])
    }

    fn log_trans(&self) -> Vec<Vec<f64>> {
        self.trans_prob
            .iter()
            .map(|row| row.iter().map(|p| safe_ln(*p)).collect())
            .collect()
    }

    /// Forward recursion: `alpha[t][i] = log P(x_0..x_t, S_t = i)`.
    pub fn forward(&self, obs: &[f64]) -> Vec<Vec<f64>> {
        let n = self.state_count();
        let log_a = self.log_trans();
        let mut alpha: Vec<Vec<f64>> = Vec::with_capacity(obs.len());
        let mut scratch = vec![0.0; n];

        for (t, &x) in obs.iter().enumerate() {
            let row: Vec<f64> = if t == 0 {
                (0..n)
                    .map(|i| safe_ln(self.start_prob[i]) + self.log_emission(i, x))
                    .collect()
            } else {
                let prev = &alpha[t - 1];
                (0..n)
                    .map(|j| {
                        for i in 0..n {
                            scratch[i] = prev[i] + log_a[i][j];
                        }
                        log_sum_exp(&scratch) + self.log_emission(j, x)
                    })
                    .collect()
            };
            alpha.push(row);
        }
        alpha
    }

    /// Backward recursion: `beta[t][i] = log P(x_{t+1}..x_{T-1} | S_t = i)`.
    pub fn backward(&self, obs: &[f64]) -> Vec<Vec<f64>> {
        let n = self.state_count();
        let t_len = obs.len();
        if t_len == 0 {
            return Vec::new();
        }
        let log_a = self.log_trans();
        let mut beta = vec![vec![0.0; n]; t_len];
        let mut scratch = vec![0.0; n];

        for t in (0..t_len - 1).rev() {
            let emit: Vec<f64> = (0..n).map(|j| self.log_emission(j, obs[t + 1])).collect();
            for i in 0..n {
                for j in 0..n {
                    scratch[j] = log_a[i][j] + emit[j] + beta[t + 1][j];
                }
                beta[t][i] = log_sum_exp(&scratch);
            }
        }
        beta
    }

    /// `log P(obs)`. An empty sequence has log-likelihood 0.
    pub fn log_likelihood(&self, obs: &[f64]) -> f64 {
        match self.forward(obs).last() {
            Some(last) => log_sum_exp(last),
            None => 0.0,
        }
    }

    /// `P(S_{T-1} = i | x_0..x_{T-1})` for the last observed step.
    ///
    /// An empty sequence returns the start distribution. Returns None when
    /// the observations have zero probability under the model.
    pub fn filtering_posterior(&self, obs: &[f64]) -> Option<Vec<f64>> {
        match self.forward(obs).last() {
            Some(last) => normalize_log_weights(last),
            None => Some(self.start_prob.clone()),
        }
    }
}

fn check_distribution(probs: &[f64]) -> Result<(), String> {
    if probs.iter().any(|p| !(p.is_finite() && *p >= 0.0)) {
        return Err("has a negative or non-finite entry".to_string());
    }
    let sum: f64 = probs.iter().sum();
    if (sum - 1.0).abs() > PROB_SUM_TOLERANCE {
        return Err(format!("sums to {} instead of 1", sum));
    }
    Ok(())
}
