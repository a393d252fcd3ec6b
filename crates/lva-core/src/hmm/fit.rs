//! Baum-Welch (EM) fitting over a collection of interval sequences.

use super::{FitError, GaussianHmm};
use crate::cluster::lloyd_1d;
use lva_math::{log_sum_exp, safe_ln, variance};

/// Responsibility mass below which a state counts as vanished.
const MIN_STATE_RESPONSIBILITY: f64 = 1e-10;

/// Lloyd iterations for the emission-mean initialisation.
const INIT_KMEANS_ITERATIONS: usize = 100;

/// EM controls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitOptions {
    pub max_iterations: usize,
    /// Stop when total log-likelihood improves by less than this.
    pub tolerance: f64,
    /// Floor applied to every emission variance.
    pub min_variance: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerance: 1e-2,
            min_variance: 1e-3,
        }
    }
}

impl From<&lva_config::SelectionConfig> for FitOptions {
    fn from(cfg: &lva_config::SelectionConfig) -> Self {
        Self {
            max_iterations: cfg.max_iterations,
            tolerance: cfg.tolerance,
            min_variance: cfg.min_variance,
        }
    }
}

/// Result of one EM run.
#[derive(Debug, Clone)]
pub struct FitReport {
    pub model: GaussianHmm,
    pub iterations: usize,
    pub converged: bool,
    /// Total log-likelihood of the training data under each evaluated model,
    /// in iteration order; the last entry belongs to `model`.
    pub log_likelihood_trace: Vec<f64>,
}

impl FitReport {
    pub fn log_likelihood(&self) -> f64 {
        self.log_likelihood_trace
            .last()
            .copied()
            .unwrap_or(f64::NEG_INFINITY)
    }
}

/// Fit an `states`-state model to `sequences` starting from the fair prior.
///
/// Empty sequences are ignored. Fails when the pooled observations have
/// fewer distinct values than states, when a state loses all responsibility,
/// or when the likelihood stops being finite.
pub fn fit_model(
    states: usize,
    sequences: &[&[f64]],
    options: &FitOptions,
) -> Result<FitReport, FitError> {
    let sequences: Vec<&[f64]> = sequences.iter().copied().filter(|s| !s.is_empty()).collect();
    let pooled: Vec<f64> = sequences.iter().flat_map(|s| s.iter().copied()).collect();
    if pooled.is_empty() || states == 0 {
        return Err(FitError::NoObservations { states });
    }

    let mut distinct = pooled.clone();
    distinct.sort_by(|a, b| a.total_cmp(b));
    distinct.dedup();
    if distinct.len() < states {
        return Err(FitError::TooFewDistinct {
            distinct: distinct.len(),
            states,
        });
    }

    let means = initial_means(&distinct, &pooled, states);
    let init_var = variance(&pooled) + options.min_variance;
    let mut model = GaussianHmm::fair_prior(means, vec![init_var; states])?;

    let mut trace = Vec::new();
    let mut converged = false;
    let mut iterations = 0;

    while iterations < options.max_iterations {
        let stats = expectation(&model, &sequences);
        if !stats.log_likelihood.is_finite() {
            return Err(FitError::NonFiniteLikelihood {
                iteration: iterations,
                states,
            });
        }
        if let Some(prev) = trace.last() {
            if stats.log_likelihood - prev < options.tolerance {
                trace.push(stats.log_likelihood);
                converged = true;
                break;
            }
        }
        trace.push(stats.log_likelihood);
        model = maximization(&model, &sequences, &stats, options.min_variance)?;
        iterations += 1;
    }

    if !converged {
        let final_ll: f64 = sequences.iter().map(|s| model.log_likelihood(s)).sum();
        if !final_ll.is_finite() {
            return Err(FitError::NonFiniteLikelihood {
                iteration: iterations,
                states,
            });
        }
        trace.push(final_ll);
    }

    Ok(FitReport {
        model,
        iterations,
        converged,
        log_likelihood_trace: trace,
    })
}

/// Seed centroids at quantiles of the distinct values, then refine with Lloyd.
fn initial_means(distinct: &[f64], pooled: &[f64], states: usize) -> Vec<f64> {
    let seeds: Vec<f64> = (0..states)
        .map(|i| {
            let q = (i as f64 + 0.5) / states as f64;
            let idx = ((q * distinct.len() as f64) as usize).min(distinct.len() - 1);
            distinct[idx]
        })
        .collect();
    let mut means = lloyd_1d(pooled, seeds, INIT_KMEANS_ITERATIONS, 0.0).centroids;
    means.sort_by(|a, b| a.total_cmp(b));
    means
}

struct Expectation {
    /// Per sequence, per step, per state posterior `P(S_t = i | x)`.
    gammas: Vec<Vec<Vec<f64>>>,
    /// Expected transition counts summed over all sequences.
    trans_counts: Vec<Vec<f64>>,
    log_likelihood: f64,
}

fn expectation(model: &GaussianHmm, sequences: &[&[f64]]) -> Expectation {
    let n = model.state_count();
    let log_a: Vec<Vec<f64>> = model
        .trans_prob()
        .iter()
        .map(|row| row.iter().map(|p| safe_ln(*p)).collect())
        .collect();

    let mut gammas = Vec::with_capacity(sequences.len());
    let mut trans_counts = vec![vec![0.0; n]; n];
    let mut total_ll = 0.0;

    for obs in sequences {
        let alpha = model.forward(obs);
        let beta = model.backward(obs);
        let ll = log_sum_exp(&alpha[obs.len() - 1]);
        total_ll += ll;
        if !ll.is_finite() {
            gammas.push(Vec::new());
            continue;
        }

        let gamma: Vec<Vec<f64>> = alpha
            .iter()
            .zip(beta.iter())
            .map(|(a, b)| (0..n).map(|i| (a[i] + b[i] - ll).exp()).collect())
            .collect();

        for t in 0..obs.len().saturating_sub(1) {
            let emit: Vec<f64> = (0..n).map(|j| model.log_emission(j, obs[t + 1])).collect();
            for i in 0..n {
                for j in 0..n {
                    let log_xi = alpha[t][i] + log_a[i][j] + emit[j] + beta[t + 1][j] - ll;
                    trans_counts[i][j] += log_xi.exp();
                }
            }
        }
        gammas.push(gamma);
    }

    Expectation {
        gammas,
        trans_counts,
        log_likelihood: total_ll,
    }
}

fn maximization(
    model: &GaussianHmm,
    sequences: &[&[f64]],
    stats: &Expectation,
    min_variance: f64,
) -> Result<GaussianHmm, FitError> {
    let n = model.state_count();
    let mut occupancy = vec![0.0; n];
    let mut weighted_sum = vec![0.0; n];
    let mut start = vec![0.0; n];

    for (obs, gamma) in sequences.iter().zip(stats.gammas.iter()) {
        if let Some(first) = gamma.first() {
            for i in 0..n {
                start[i] += first[i];
            }
        }
        for (x, g) in obs.iter().zip(gamma.iter()) {
            for i in 0..n {
                occupancy[i] += g[i];
                weighted_sum[i] += g[i] * x;
            }
        }
    }

    if let Some(state) = occupancy.iter().position(|o| *o < MIN_STATE_RESPONSIBILITY) {
        return Err(FitError::VanishingState { state, states: n });
    }

    let means: Vec<f64> = (0..n).map(|i| weighted_sum[i] / occupancy[i]).collect();

    let mut sq_dev = vec![0.0; n];
    for (obs, gamma) in sequences.iter().zip(stats.gammas.iter()) {
        for (x, g) in obs.iter().zip(gamma.iter()) {
            for i in 0..n {
                let d = x - means[i];
                sq_dev[i] += g[i] * d * d;
            }
        }
    }
    let variances: Vec<f64> = (0..n)
        .map(|i| (sq_dev[i] / occupancy[i]).max(min_variance))
        .collect();

    let start_total: f64 = start.iter().sum();
    let start_prob: Vec<f64> = start.iter().map(|s| s / start_total).collect();

    // A state seen only at sequence ends has no outgoing evidence; keep its row.
    let trans_prob: Vec<Vec<f64>> = stats
        .trans_counts
        .iter()
        .zip(model.trans_prob().iter())
        .map(|(counts, prev)| {
            let row_total: f64 = counts.iter().sum();
            if row_total > MIN_STATE_RESPONSIBILITY {
                counts.iter().map(|c| c / row_total).collect()
            } else {
                prev.clone()
            }
        })
        .collect();

    GaussianHmm::new(start_prob, trans_prob, means, variances)
}
