//! Predictors behind a uniform learn/predict contract.
//!
//! Every learner implements [`Predictor`]. [`LearnerSpec`] describes a
//! learner and its parameters; [`build_predictor`] turns a spec into a boxed
//! predictor.

pub mod ensemble;
pub mod hmm;
pub mod linear;
pub mod partition;
pub mod simple;

pub use ensemble::EnsembleCombiner;
pub use hmm::HmmLearner;
pub use linear::LinearRateLearner;
pub use partition::PartitionHmmLearner;
pub use simple::SimpleRateLearner;

use lva_common::{Error, Result, TrainingExample, UserHistory};
use lva_config::{
    BaselineConfig, ClusteringConfig, LearnerKind, LinearConfig, LvaConfig, SamplingConfig,
    SelectionConfig,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Uniform learner contract.
pub trait Predictor: Send + Sync {
    /// Display name, e.g. `HMM+Cluster(2)`.
    fn name(&self) -> String;

    /// Retrain from scratch on `examples`.
    fn learn(&mut self, examples: &[TrainingExample]) -> Result<()>;

    /// Expected number of actions by `query.user_id` over the next `period` seconds.
    fn predict(&self, query: &UserHistory, period: f64) -> Result<f64>;
}

/// A learner and everything needed to build it.
#[derive(Debug, Clone, PartialEq)]
pub enum LearnerSpec {
    Simple(BaselineConfig),
    Hmm {
        selection: SelectionConfig,
        sampling: SamplingConfig,
        seed: Option<u64>,
    },
    PartitionHmm {
        selection: SelectionConfig,
        clustering: ClusteringConfig,
        sampling: SamplingConfig,
        seed: Option<u64>,
    },
    Linear(LinearConfig),
    Ensemble(Vec<(LearnerSpec, f64)>),
}

impl LearnerSpec {
    /// Resolve `kind` against the configuration sections.
    pub fn from_config(kind: LearnerKind, config: &LvaConfig) -> Self {
        Self::resolve(kind, config, config.seed)
    }

    fn resolve(kind: LearnerKind, config: &LvaConfig, seed: Option<u64>) -> Self {
        match kind {
            LearnerKind::Simple => LearnerSpec::Simple(config.baseline.clone()),
            LearnerKind::Hmm => LearnerSpec::Hmm {
                selection: config.selection.clone(),
                sampling: config.sampling.clone(),
                seed,
            },
            LearnerKind::PartitionHmm => LearnerSpec::PartitionHmm {
                selection: config.selection.clone(),
                clustering: config.clustering.clone(),
                sampling: config.sampling.clone(),
                seed,
            },
            LearnerKind::Linear => LearnerSpec::Linear(config.linear.clone()),
            LearnerKind::Ensemble => LearnerSpec::Ensemble(
                config
                    .ensemble
                    .members
                    .iter()
                    .enumerate()
                    // Distinct seeds so members do not share a random stream.
                    .map(|(i, m)| {
                        if m.learner == LearnerKind::Ensemble {
                            // Left unexpanded; build_predictor rejects it.
                            return (LearnerSpec::Ensemble(Vec::new()), m.weight);
                        }
                        let member_seed = seed.map(|s| s.wrapping_add(i as u64 + 1));
                        (Self::resolve(m.learner, config, member_seed), m.weight)
                    })
                    .collect(),
            ),
        }
    }

    pub fn kind(&self) -> LearnerKind {
        match self {
            LearnerSpec::Simple(_) => LearnerKind::Simple,
            LearnerSpec::Hmm { .. } => LearnerKind::Hmm,
            LearnerSpec::PartitionHmm { .. } => LearnerKind::PartitionHmm,
            LearnerSpec::Linear(_) => LearnerKind::Linear,
            LearnerSpec::Ensemble(_) => LearnerKind::Ensemble,
        }
    }
}

/// Build the predictor a spec describes.
pub fn build_predictor(spec: &LearnerSpec) -> Result<Box<dyn Predictor>> {
    let predictor: Box<dyn Predictor> = match spec {
        LearnerSpec::Simple(cfg) => Box::new(SimpleRateLearner::new(cfg)),
        LearnerSpec::Hmm {
            selection,
            sampling,
            seed,
        } => Box::new(HmmLearner::new(selection.clone(), sampling, *seed)),
        LearnerSpec::PartitionHmm {
            selection,
            clustering,
            sampling,
            seed,
        } => Box::new(PartitionHmmLearner::new(
            selection.clone(),
            clustering.clone(),
            sampling,
            *seed,
        )),
        LearnerSpec::Linear(cfg) => Box::new(LinearRateLearner::new(cfg)),
        LearnerSpec::Ensemble(members) => {
            if members.iter().any(|(m, _)| matches!(m, LearnerSpec::Ensemble(_))) {
                return Err(Error::Config("ensembles cannot nest".to_string()));
            }
            let children = members
                .iter()
                .map(|(m, w)| Ok((build_predictor(m)?, *w)))
                .collect::<Result<Vec<_>>>()?;
            Box::new(EnsembleCombiner::new(children)?)
        }
    };
    Ok(predictor)
}

/// Seeded RNG when a seed is configured, OS entropy otherwise.
pub(crate) fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_os_rng(),
    }
}

pub(crate) fn lock_rng(rng: &Mutex<StdRng>) -> MutexGuard<'_, StdRng> {
    rng.lock().unwrap_or_else(PoisonError::into_inner)
}
