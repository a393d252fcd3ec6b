//! State-count search for the interval model.
//!
//! Fits `n = 1, 2, …` states and keeps the smallest model whose
//! per-observation log-likelihood has not yet started to drop. The search
//! is sequential and bounded by `max_states` and a soft wall-clock budget
//! checked after every attempt.

use crate::hmm::{fit_model, FitError, FitOptions, FitReport, GaussianHmm};
use crate::logging::event_names;
use lva_common::{Error, IntervalSequence, Result};
use lva_config::{RegressionPolicy, SelectionConfig};
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Mean over non-empty sequences of `log_likelihood(seq) / len(seq)`.
///
/// Returns None when no sequence has observations.
pub fn score(model: &GaussianHmm, sequences: &[&[f64]]) -> Option<f64> {
    let per_obs: Vec<f64> = sequences
        .iter()
        .filter(|s| !s.is_empty())
        .map(|s| model.log_likelihood(s) / s.len() as f64)
        .collect();
    if per_obs.is_empty() {
        return None;
    }
    Some(per_obs.iter().sum::<f64>() / per_obs.len() as f64)
}

/// What happened at one state count.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum AttemptResult {
    Scored { score: f64, iterations: usize, converged: bool },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionAttempt {
    pub states: usize,
    #[serde(flatten)]
    pub result: AttemptResult,
    pub elapsed_ms: f64,
}

/// Why the search ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Score dropped (after confirmation, under `ConfirmOnce`).
    LocalMaximum,
    FitFailure,
    Timeout,
    MaxStates,
    /// Every sequence was empty; the one-state placeholder was returned.
    NoObservations,
}

/// Search result: the chosen model plus every attempt for inspection.
#[derive(Debug, Clone)]
pub struct SelectionOutcome {
    pub model: Option<GaussianHmm>,
    pub score: Option<f64>,
    pub attempts: Vec<SelectionAttempt>,
    pub stop_reason: StopReason,
}

impl SelectionOutcome {
    pub fn state_count(&self) -> Option<usize> {
        self.model.as_ref().map(GaussianHmm::state_count)
    }
}

/// Chooses model complexity for a collection of interval sequences.
#[derive(Debug, Clone)]
pub struct ModelSelector {
    config: SelectionConfig,
}

impl ModelSelector {
    pub fn new(config: SelectionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SelectionConfig {
        &self.config
    }

    pub fn select(&self, sequences: &[IntervalSequence]) -> Result<SelectionOutcome> {
        let slices: Vec<&[f64]> = sequences.iter().map(IntervalSequence::as_slice).collect();
        self.select_slices(&slices)
    }

    pub fn select_slices(&self, sequences: &[&[f64]]) -> Result<SelectionOutcome> {
        if sequences.is_empty() {
            return Err(Error::InvalidTrainingSet(
                "model selection needs at least one interval sequence".to_string(),
            ));
        }
        if sequences.iter().all(|s| s.is_empty()) {
            debug!(
                event = event_names::SELECTION_STOPPED,
                reason = "no_observations",
                "all sequences empty, using one-state placeholder"
            );
            return Ok(SelectionOutcome {
                model: Some(GaussianHmm::degenerate(self.config.min_variance)),
                score: None,
                attempts: Vec::new(),
                stop_reason: StopReason::NoObservations,
            });
        }

        let options = FitOptions::from(&self.config);
        Ok(self.select_with(|states| {
            let report = fit_model(states, sequences, &options)?;
            let candidate_score = score(&report.model, sequences).unwrap_or(f64::NEG_INFINITY);
            Ok((report, candidate_score))
        }))
    }

    /// Run the state-count search with `fit` producing the fitted model and
    /// its score for each `n`. Stops on the first fit error, on a score
    /// drop (per the regression policy), at `max_states`, or once the time
    /// budget is spent.
    pub fn select_with<F>(&self, mut fit: F) -> SelectionOutcome
    where
        F: FnMut(usize) -> std::result::Result<(FitReport, f64), FitError>,
    {
        let timeout = self.config.timeout();
        let started = Instant::now();

        let mut best: Option<(GaussianHmm, f64)> = None;
        let mut attempts = Vec::new();
        let mut confirming = false;
        let mut confirmation_used = false;
        let mut stop_reason = StopReason::MaxStates;

        for states in 1..=self.config.max_states {
            let attempt_start = Instant::now();
            let fitted = fit(states);
            let elapsed = attempt_start.elapsed();

            match fitted {
                Err(err) => {
                    debug!(
                        event = event_names::SELECTION_CANDIDATE,
                        states,
                        error = %err,
                        "fit failed"
                    );
                    attempts.push(SelectionAttempt {
                        states,
                        result: AttemptResult::Failed {
                            reason: err.to_string(),
                        },
                        elapsed_ms: millis(elapsed),
                    });
                    stop_reason = StopReason::FitFailure;
                    break;
                }
                Ok((report, candidate_score)) => {
                    debug!(
                        event = event_names::SELECTION_CANDIDATE,
                        states,
                        score = candidate_score,
                        iterations = report.iterations,
                        converged = report.converged,
                        "fit candidate"
                    );
                    attempts.push(SelectionAttempt {
                        states,
                        result: AttemptResult::Scored {
                            score: candidate_score,
                            iterations: report.iterations,
                            converged: report.converged,
                        },
                        elapsed_ms: millis(elapsed),
                    });

                    let best_score = best.as_ref().map(|(_, s)| *s);
                    match best_score {
                        Some(b) if candidate_score < b => {
                            let may_confirm = self.config.regression_policy
                                == RegressionPolicy::ConfirmOnce
                                && !confirmation_used;
                            if may_confirm {
                                confirming = true;
                                confirmation_used = true;
                            } else {
                                stop_reason = StopReason::LocalMaximum;
                                break;
                            }
                        }
                        _ => {
                            best = Some((report.model, candidate_score));
                            confirming = false;
                        }
                    }
                }
            }

            if started.elapsed() >= timeout {
                stop_reason = StopReason::Timeout;
                break;
            }
        }

        // The confirmation attempt ran out of room without beating the best.
        if confirming && stop_reason == StopReason::MaxStates {
            stop_reason = StopReason::LocalMaximum;
        }

        let (model, best_score) = match best {
            Some((m, s)) => (Some(m), Some(s)),
            None => (None, None),
        };
        info!(
            event = event_names::SELECTION_STOPPED,
            states = model.as_ref().map(GaussianHmm::state_count),
            score = best_score,
            attempts = attempts.len(),
            reason = ?stop_reason,
            "model selection finished"
        );

        SelectionOutcome {
            model,
            score: best_score,
            attempts,
            stop_reason,
        }
    }
}

fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}
