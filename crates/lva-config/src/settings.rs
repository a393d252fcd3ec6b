//! Learner configuration types.
//!
//! Every section carries `#[serde(default)]` so a config file only needs to
//! mention the values it overrides.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Complete learner configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LvaConfig {
    pub schema_version: String,

    /// Seed for every RNG the learners own (k-means seeding, rollouts).
    /// `None` draws from OS entropy.
    pub seed: Option<u64>,

    /// Which predictor `build_predictor` constructs.
    pub learner: LearnerKind,

    pub selection: SelectionConfig,
    pub clustering: ClusteringConfig,
    pub sampling: SamplingConfig,
    pub baseline: BaselineConfig,
    pub linear: LinearConfig,
    pub ensemble: EnsembleConfig,
    pub data: DataConfig,
}

impl Default for LvaConfig {
    fn default() -> Self {
        Self {
            schema_version: crate::CONFIG_SCHEMA_VERSION.to_string(),
            seed: None,
            learner: LearnerKind::PartitionHmm,
            selection: SelectionConfig::default(),
            clustering: ClusteringConfig::default(),
            sampling: SamplingConfig::default(),
            baseline: BaselineConfig::default(),
            linear: LinearConfig::default(),
            ensemble: EnsembleConfig::default(),
            data: DataConfig::default(),
        }
    }
}

/// Learner strategies available behind the predictor contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LearnerKind {
    /// Rate over the observed span, padded by one day.
    Simple,
    /// One latent-state model for every user.
    Hmm,
    /// One latent-state model per activity-rate cluster.
    PartitionHmm,
    /// Least-squares map from history features to rate.
    Linear,
    /// Fixed-weight blend of other learners.
    Ensemble,
}

impl LearnerKind {
    pub const ALL: [LearnerKind; 5] = [
        LearnerKind::Simple,
        LearnerKind::Hmm,
        LearnerKind::PartitionHmm,
        LearnerKind::Linear,
        LearnerKind::Ensemble,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            LearnerKind::Simple => "simple",
            LearnerKind::Hmm => "hmm",
            LearnerKind::PartitionHmm => "partition-hmm",
            LearnerKind::Linear => "linear",
            LearnerKind::Ensemble => "ensemble",
        }
    }
}

impl fmt::Display for LearnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for LearnerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "simple" | "rate" | "baseline" => Ok(LearnerKind::Simple),
            "hmm" => Ok(LearnerKind::Hmm),
            "partition-hmm" | "partition" | "cluster" => Ok(LearnerKind::PartitionHmm),
            "linear" | "linreg" => Ok(LearnerKind::Linear),
            "ensemble" | "combination" => Ok(LearnerKind::Ensemble),
            _ => Err(format!("unknown learner: {}", s)),
        }
    }
}

/// What the state-count search does when a score drops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegressionPolicy {
    /// Stop at the first score decrease and keep the previous model.
    #[default]
    StopOnFirst,
    /// Try one more state count after the first decrease; continue only if
    /// it beats the best score so far.
    ConfirmOnce,
}

/// Model-order search parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Largest state count attempted.
    pub max_states: usize,
    /// EM iteration cap per state count.
    pub max_iterations: usize,
    /// EM stops early when total log-likelihood improves by less than this.
    pub tolerance: f64,
    /// Floor for every emission variance (seconds squared).
    pub min_variance: f64,
    /// Soft wall-clock budget for the whole search.
    pub timeout_secs: f64,
    pub regression_policy: RegressionPolicy,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            max_states: 6,
            max_iterations: 100,
            tolerance: 1e-2,
            min_variance: 1e-3,
            timeout_secs: 600.0,
            regression_policy: RegressionPolicy::StopOnFirst,
        }
    }
}

impl SelectionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_secs.max(0.0))
    }
}

/// Activity-rate clustering parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    /// Number of clusters `k`.
    pub clusters: usize,
    /// Independent k-means++ restarts; the lowest-inertia run wins.
    pub restarts: usize,
    /// Lloyd iterations per restart.
    pub max_iterations: usize,
    /// Restart converges when no centroid moves more than this.
    pub tolerance: f64,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            clusters: 2,
            restarts: 40,
            max_iterations: 300,
            tolerance: 1e-10,
        }
    }
}

/// Rollout parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Sampled intervals allowed in one rollout before giving up.
    pub max_rollout_steps: usize,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            max_rollout_steps: 1_000_000,
        }
    }
}

/// Rate baseline parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaselineConfig {
    /// Added to the observed span; day-resolution timestamps under-count it.
    pub span_padding_secs: f64,
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            span_padding_secs: 86_400.0,
        }
    }
}

/// Linear rate regression parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinearConfig {
    /// Ridge penalty on standardized feature weights.
    pub ridge: f64,
}

impl Default for LinearConfig {
    fn default() -> Self {
        Self { ridge: 1e-6 }
    }
}

/// One weighted ensemble member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleMember {
    pub learner: LearnerKind,
    pub weight: f64,
}

/// Fixed-weight ensemble composition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnsembleConfig {
    pub members: Vec<EnsembleMember>,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            members: vec![
                EnsembleMember {
                    learner: LearnerKind::PartitionHmm,
                    weight: 0.5,
                },
                EnsembleMember {
                    learner: LearnerKind::Simple,
                    weight: 0.5,
                },
            ],
        }
    }
}

impl EnsembleConfig {
    pub fn weights(&self) -> Vec<f64> {
        self.members.iter().map(|m| m.weight).collect()
    }
}

/// Dataset filtering applied by the loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Users with fewer raw actions are dropped before learning.
    pub min_actions: usize,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self { min_actions: 5 }
    }
}
