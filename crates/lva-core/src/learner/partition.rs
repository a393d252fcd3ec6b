//! Clustered interval-model learner.

use super::{lock_rng, make_rng, Predictor};
use crate::bank::{ClusterModelBank, ClusterSummary};
use crate::cluster::ClusterAssigner;
use crate::interval::intervals;
use crate::logging::event_names;
use crate::sampler::PredictionSampler;
use crate::selection::ModelSelector;
use lva_common::{Error, Result, TrainingExample, UserHistory};
use lva_config::{ClusteringConfig, SamplingConfig, SelectionConfig};
use rand::rngs::StdRng;
use std::sync::Mutex;
use std::time::Instant;
use tracing::info;

/// Partitions users into `k` activity-rate clusters and trains one interval
/// model per cluster. Predictions use the cluster whose model best explains
/// the query's history.
#[derive(Debug)]
pub struct PartitionHmmLearner {
    assigner: ClusterAssigner,
    selector: ModelSelector,
    sampler: PredictionSampler,
    rng: Mutex<StdRng>,
    bank: ClusterModelBank,
}

impl PartitionHmmLearner {
    pub fn new(
        selection: SelectionConfig,
        clustering: ClusteringConfig,
        sampling: &SamplingConfig,
        seed: Option<u64>,
    ) -> Self {
        Self {
            assigner: ClusterAssigner::new(clustering),
            selector: ModelSelector::new(selection),
            sampler: PredictionSampler::new(sampling),
            rng: Mutex::new(make_rng(seed)),
            bank: ClusterModelBank::default(),
        }
    }

    pub fn bank(&self) -> &ClusterModelBank {
        &self.bank
    }

    pub fn cluster_summaries(&self) -> Vec<ClusterSummary> {
        self.bank.summaries()
    }
}

impl Predictor for PartitionHmmLearner {
    fn name(&self) -> String {
        format!("HMM+Cluster({})", self.assigner.config().clusters)
    }

    fn learn(&mut self, examples: &[TrainingExample]) -> Result<()> {
        self.bank = ClusterModelBank::default();
        if examples.is_empty() {
            return Err(Error::InvalidTrainingSet("no training examples".to_string()));
        }
        let started = Instant::now();
        info!(
            event = event_names::LEARN_STARTED,
            learner = %self.name(),
            examples = examples.len(),
            "training clustered model"
        );

        let bank = {
            let mut rng = lock_rng(&self.rng);
            ClusterModelBank::train(examples, &self.assigner, &self.selector, &mut *rng)?
        };
        self.bank = bank;

        info!(
            event = event_names::LEARN_FINISHED,
            learner = %self.name(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "training finished"
        );
        Ok(())
    }

    fn predict(&self, query: &UserHistory, period: f64) -> Result<f64> {
        predict_with_bank(&self.bank, &self.sampler, &self.rng, query, period)
    }
}

/// Best-fit cluster, then one posterior-conditioned rollout.
pub(super) fn predict_with_bank(
    bank: &ClusterModelBank,
    sampler: &PredictionSampler,
    rng: &Mutex<StdRng>,
    query: &UserHistory,
    period: f64,
) -> Result<f64> {
    if !bank.has_model() {
        return Err(Error::NoModelAvailable);
    }
    let seq = intervals(&query.history)?;
    let (_, model) = bank.best_fit(seq.as_slice())?;
    let mut rng = lock_rng(rng);
    sampler.predict_count(model, seq.as_slice(), period, &mut *rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lva_common::{ClusterId, Outcome};

    fn learner(seed: u64) -> PartitionHmmLearner {
        PartitionHmmLearner::new(
            SelectionConfig {
                max_states: 2,
                ..Default::default()
            },
            ClusteringConfig::default(),
            &SamplingConfig::default(),
            Some(seed),
        )
    }

    /// Evenly spaced actions with a little deterministic jitter.
    fn history(gap: f64, n: usize, salt: u64) -> Vec<f64> {
        let mut t = 0.0;
        (0..n)
            .map(|i| {
                let jitter = ((i as u64 * 31 + salt * 17) % 11) as f64 / 10.0 - 0.5;
                t += gap * (1.0 + 0.2 * jitter);
                t
            })
            .collect()
    }

    fn dataset() -> Vec<TrainingExample> {
        let mut out = Vec::new();
        for u in 0..5u64 {
            out.push(TrainingExample::new(u, history(600.0, 20, u), Outcome::new(6, 3600.0)));
            out.push(TrainingExample::new(100 + u, history(60.0, 20, u), Outcome::new(60, 3600.0)));
        }
        out
    }

    #[test]
    fn test_predict_before_learn() {
        let l = learner(1);
        let q = UserHistory::new(1u64, vec![0.0, 10.0, 20.0]);
        assert!(matches!(l.predict(&q, 100.0), Err(Error::NoModelAvailable)));
    }

    #[test]
    fn test_learn_empty_rejected() {
        let mut l = learner(1);
        assert!(matches!(l.learn(&[]), Err(Error::InvalidTrainingSet(_))));
    }

    #[test]
    fn test_fast_user_predicted_higher() {
        let mut l = learner(7);
        l.learn(&dataset()).unwrap();
        assert_eq!(l.cluster_summaries().len(), 2);

        let slow = UserHistory::new(1u64, history(600.0, 20, 9));
        let fast = UserHistory::new(101u64, history(60.0, 20, 9));
        let p_slow = l.predict(&slow, 3600.0).unwrap();
        let p_fast = l.predict(&fast, 3600.0).unwrap();
        assert!(p_fast > 3.0 * p_slow.max(1.0), "fast {} slow {}", p_fast, p_slow);
    }

    #[test]
    fn test_best_fit_cluster_matches_rate() {
        let mut l = learner(7);
        l.learn(&dataset()).unwrap();
        let fast = intervals(&history(60.0, 20, 3).into()).unwrap();
        let (id, _) = l.bank().best_fit(fast.as_slice()).unwrap();
        assert_eq!(id, ClusterId(1));
    }

    #[test]
    fn test_short_query_history() {
        let mut l = learner(7);
        l.learn(&dataset()).unwrap();
        let q = UserHistory::new(1u64, vec![5.0]);
        assert!(matches!(
            l.predict(&q, 100.0),
            Err(Error::InsufficientHistory { .. })
        ));
    }

    #[test]
    fn test_name_reports_cluster_count() {
        assert_eq!(learner(1).name(), "HMM+Cluster(2)");
    }
}
