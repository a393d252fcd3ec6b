//! Single interval model shared by every user.

use super::partition::predict_with_bank;
use super::{make_rng, Predictor};
use crate::bank::ClusterModelBank;
use crate::cluster::activity_rates;
use crate::interval::intervals;
use crate::logging::event_names;
use crate::sampler::PredictionSampler;
use crate::selection::ModelSelector;
use lva_common::{Error, IntervalSequence, Result, TrainingExample, UserHistory};
use lva_config::{SamplingConfig, SelectionConfig};
use rand::rngs::StdRng;
use std::sync::Mutex;
use tracing::info;

/// Unclustered variant: one model selected over all training histories.
#[derive(Debug)]
pub struct HmmLearner {
    selector: ModelSelector,
    sampler: PredictionSampler,
    rng: Mutex<StdRng>,
    bank: ClusterModelBank,
}

impl HmmLearner {
    pub fn new(selection: SelectionConfig, sampling: &SamplingConfig, seed: Option<u64>) -> Self {
        Self {
            selector: ModelSelector::new(selection),
            sampler: PredictionSampler::new(sampling),
            rng: Mutex::new(make_rng(seed)),
            bank: ClusterModelBank::default(),
        }
    }

    pub fn bank(&self) -> &ClusterModelBank {
        &self.bank
    }
}

impl Predictor for HmmLearner {
    fn name(&self) -> String {
        "HMM".to_string()
    }

    fn learn(&mut self, examples: &[TrainingExample]) -> Result<()> {
        self.bank = ClusterModelBank::default();
        if examples.is_empty() {
            return Err(Error::InvalidTrainingSet("no training examples".to_string()));
        }
        info!(
            event = event_names::LEARN_STARTED,
            learner = "HMM",
            examples = examples.len(),
            "training single model"
        );

        let rates = activity_rates(examples)?;
        let mean_rate = lva_math::mean(&rates);

        let mut sequences = Vec::with_capacity(examples.len());
        for ex in examples {
            match intervals(&ex.history) {
                Ok(seq) => sequences.push(seq),
                Err(Error::InsufficientHistory { .. }) => sequences.push(IntervalSequence::default()),
                Err(e) => return Err(e),
            }
        }

        let outcome = self.selector.select(&sequences)?;
        info!(
            event = event_names::LEARN_FINISHED,
            learner = "HMM",
            states = outcome.state_count(),
            "training finished"
        );
        self.bank = ClusterModelBank::single(outcome.model, mean_rate, examples.len());
        Ok(())
    }

    fn predict(&self, query: &UserHistory, period: f64) -> Result<f64> {
        predict_with_bank(&self.bank, &self.sampler, &self.rng, query, period)
    }
}
