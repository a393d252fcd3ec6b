//! One trained interval model per activity-rate cluster.
//!
//! Populated entirely by [`ClusterModelBank::train`]; read-only afterwards
//! except for the scoped start-distribution override taken under each
//! model's own lock during prediction.

use crate::cluster::{ClusterAssigner, Partition};
use crate::hmm::GaussianHmm;
use crate::interval::intervals;
use crate::logging::event_names;
use crate::sampler::lock_model;
use crate::selection::{ModelSelector, StopReason};
use lva_common::{ClusterId, Error, IntervalSequence, Result, TrainingExample};
use rand::Rng;
use rayon::prelude::*;
use serde::Serialize;
use std::sync::Mutex;
use tracing::{debug, info};

/// A cluster and its (optional) model.
#[derive(Debug)]
pub struct Cluster {
    pub id: ClusterId,
    /// Mean activity rate (actions per second) of the members.
    pub centroid: f64,
    pub members: usize,
    pub model: Option<Mutex<GaussianHmm>>,
    pub stop_reason: Option<StopReason>,
}

/// Inspection view of a cluster.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterSummary {
    pub id: ClusterId,
    pub centroid: f64,
    pub members: usize,
    pub states: Option<usize>,
    pub stop_reason: Option<StopReason>,
}

/// Ordered clusters with their models.
#[derive(Debug, Default)]
pub struct ClusterModelBank {
    clusters: Vec<Cluster>,
}

impl ClusterModelBank {
    /// Partition the examples by rate and fit one model per non-empty cluster.
    pub fn train<R: Rng>(
        examples: &[TrainingExample],
        assigner: &ClusterAssigner,
        selector: &ModelSelector,
        rng: &mut R,
    ) -> Result<Self> {
        let partition = assigner.assign(examples, rng)?;
        let groups = group_intervals(examples, &partition)?;

        let counts = partition.member_counts();
        info!(
            event = event_names::CLUSTER_ASSIGNED,
            clusters = partition.cluster_count(),
            members = ?counts,
            centroids = ?partition.centroids,
            "users assigned to clusters"
        );

        let fitted: Vec<Result<(Option<GaussianHmm>, Option<StopReason>)>> = groups
            .par_iter()
            .enumerate()
            .map(|(idx, group)| {
                if group.is_empty() {
                    return Ok((None, None));
                }
                let outcome = selector.select(group)?;
                debug!(
                    event = event_names::CLUSTER_FITTED,
                    cluster = idx,
                    states = outcome.state_count(),
                    "cluster model fitted"
                );
                Ok((outcome.model, Some(outcome.stop_reason)))
            })
            .collect();

        let mut clusters = Vec::with_capacity(fitted.len());
        for (idx, result) in fitted.into_iter().enumerate() {
            let (model, stop_reason) = result?;
            clusters.push(Cluster {
                id: ClusterId(idx),
                centroid: partition.centroids[idx],
                members: counts[idx],
                model: model.map(Mutex::new),
                stop_reason,
            });
        }
        Ok(Self { clusters })
    }

    /// A bank holding a single pre-built model, for the unclustered learner.
    pub fn single(model: Option<GaussianHmm>, centroid: f64, members: usize) -> Self {
        Self {
            clusters: vec![Cluster {
                id: ClusterId(0),
                centroid,
                members,
                model: model.map(Mutex::new),
                stop_reason: None,
            }],
        }
    }

    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    pub fn has_model(&self) -> bool {
        self.clusters.iter().any(|c| c.model.is_some())
    }

    pub fn summaries(&self) -> Vec<ClusterSummary> {
        self.clusters
            .iter()
            .map(|c| ClusterSummary {
                id: c.id,
                centroid: c.centroid,
                members: c.members,
                states: c.model.as_ref().map(|m| lock_model(m).state_count()),
                stop_reason: c.stop_reason,
            })
            .collect()
    }

    /// The cluster whose model gives `intervals` the highest log-likelihood.
    ///
    /// Ties, including every model scoring zero probability, go to the
    /// lowest cluster id.
    pub fn best_fit(&self, intervals: &[f64]) -> Result<(ClusterId, &Mutex<GaussianHmm>)> {
        let mut best: Option<(ClusterId, &Mutex<GaussianHmm>, f64)> = None;
        for cluster in &self.clusters {
            let Some(model) = cluster.model.as_ref() else {
                continue;
            };
            let mut ll = lock_model(model).log_likelihood(intervals);
            if ll.is_nan() {
                ll = f64::NEG_INFINITY;
            }
            let better = match &best {
                Some((_, _, best_ll)) => ll > *best_ll,
                None => true,
            };
            if better {
                best = Some((cluster.id, model, ll));
            }
        }

        let (id, model, ll) = best.ok_or(Error::NoModelAvailable)?;
        debug!(
            event = event_names::PREDICT_BEST_FIT,
            cluster = %id,
            log_likelihood = ll,
            "best-fit cluster selected"
        );
        Ok((id, model))
    }
}

/// Interval sequence of every example, grouped by cluster.
///
/// Histories too short to yield an interval contribute an empty sequence.
fn group_intervals(
    examples: &[TrainingExample],
    partition: &Partition,
) -> Result<Vec<Vec<IntervalSequence>>> {
    let mut groups = vec![Vec::new(); partition.cluster_count()];
    for (ex, label) in examples.iter().zip(&partition.labels) {
        let seq = match intervals(&ex.history) {
            Ok(seq) => seq,
            Err(Error::InsufficientHistory { .. }) => IntervalSequence::default(),
            Err(e) => return Err(e),
        };
        groups[label.index()].push(seq);
    }
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lva_common::Outcome;
    use lva_config::{ClusteringConfig, SelectionConfig};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn model_with_mean(mean: f64) -> GaussianHmm {
        GaussianHmm::new(vec![1.0], vec![vec![1.0]], vec![mean], vec![1.0]).unwrap()
    }

    fn bank_of(models: Vec<Option<GaussianHmm>>) -> ClusterModelBank {
        ClusterModelBank {
            clusters: models
                .into_iter()
                .enumerate()
                .map(|(i, m)| Cluster {
                    id: ClusterId(i),
                    centroid: i as f64,
                    members: 1,
                    model: m.map(Mutex::new),
                    stop_reason: None,
                })
                .collect(),
        }
    }

    #[test]
    fn test_best_fit_picks_highest_likelihood() {
        let bank = bank_of(vec![Some(model_with_mean(1.0)), Some(model_with_mean(50.0))]);
        let (id, _) = bank.best_fit(&[49.0, 51.0]).unwrap();
        assert_eq!(id, ClusterId(1));
        let (id, _) = bank.best_fit(&[1.0, 1.5]).unwrap();
        assert_eq!(id, ClusterId(0));
    }

    #[test]
    fn test_best_fit_ties_go_low_and_skip_empty() {
        let bank = bank_of(vec![
            None,
            Some(model_with_mean(5.0)),
            Some(model_with_mean(5.0)),
        ]);
        for _ in 0..10 {
            let (id, _) = bank.best_fit(&[5.0]).unwrap();
            assert_eq!(id, ClusterId(1));
        }
    }

    #[test]
    fn test_no_model_available() {
        let bank = bank_of(vec![None, None]);
        assert!(matches!(bank.best_fit(&[1.0]), Err(Error::NoModelAvailable)));
        assert!(!bank.has_model());
        assert!(matches!(
            ClusterModelBank::default().best_fit(&[]),
            Err(Error::NoModelAvailable)
        ));
    }

    #[test]
    fn test_train_builds_one_model_per_cluster() {
        let mut examples = Vec::new();
        for u in 0..6u64 {
            let slow: Vec<f64> = (0..8).map(|i| i as f64 * (1000.0 + u as f64 * 7.0 + i as f64)).collect();
            examples.push(TrainingExample::new(u, slow, Outcome::new(1, 1000.0)));
            let fast: Vec<f64> = (0..8).map(|i| i as f64 * (10.0 + u as f64 * 0.3 + i as f64 * 0.1)).collect();
            examples.push(TrainingExample::new(100 + u, fast, Outcome::new(100, 1000.0)));
        }
        let bank = ClusterModelBank::train(
            &examples,
            &ClusterAssigner::new(ClusteringConfig::default()),
            &ModelSelector::new(SelectionConfig {
                max_states: 2,
                ..Default::default()
            }),
            &mut StdRng::seed_from_u64(17),
        )
        .unwrap();

        let summaries = bank.summaries();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].members, 6);
        assert_eq!(summaries[1].members, 6);
        assert!(summaries[0].centroid < summaries[1].centroid);
        assert!(summaries.iter().all(|s| s.states.is_some()));
    }

    #[test]
    fn test_short_histories_contribute_empty_sequences() {
        let examples = vec![
            TrainingExample::new(1u64, vec![5.0], Outcome::new(1, 10.0)),
            TrainingExample::new(2u64, vec![1.0, 4.0], Outcome::new(1, 10.0)),
        ];
        let partition = Partition {
            centroids: vec![0.1],
            labels: vec![ClusterId(0), ClusterId(0)],
            inertia: 0.0,
        };
        let groups = group_intervals(&examples, &partition).unwrap();
        assert_eq!(groups[0].len(), 2);
        assert!(groups[0][0].is_empty());
        assert_eq!(groups[0][1].as_slice(), &[3.0]);
    }
}
