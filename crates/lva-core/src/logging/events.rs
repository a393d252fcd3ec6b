//! Event names and pipeline stages used in structured logs.

use serde::{Deserialize, Serialize};

/// Stages of an lva run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Startup and configuration.
    Init,
    /// Dataset loading and filtering.
    Load,
    /// Training a predictor.
    Learn,
    /// Answering a prediction query.
    Predict,
    /// Scoring predictions against held-out outcomes.
    Evaluate,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Init => "init",
            Stage::Load => "load",
            Stage::Learn => "learn",
            Stage::Predict => "predict",
            Stage::Evaluate => "evaluate",
        };
        write!(f, "{}", s)
    }
}

/// Standard event names used in logging.
pub mod event_names {
    // Run lifecycle
    pub const RUN_STARTED: &str = "run.started";
    pub const RUN_FINISHED: &str = "run.finished";

    // Config
    pub const CONFIG_LOADED: &str = "config.loaded";
    pub const CONFIG_DEFAULT_USED: &str = "config.default_used";

    // Data
    pub const DATA_LOADED: &str = "data.loaded";
    pub const DATA_FILTERED: &str = "data.filtered";

    // Learning
    pub const LEARN_STARTED: &str = "learn.started";
    pub const LEARN_FINISHED: &str = "learn.finished";
    pub const CLUSTER_ASSIGNED: &str = "cluster.assigned";
    pub const CLUSTER_FITTED: &str = "cluster.fitted";
    pub const SELECTION_CANDIDATE: &str = "selection.candidate";
    pub const SELECTION_STOPPED: &str = "selection.stopped";

    // Prediction
    pub const PREDICT_BEST_FIT: &str = "predict.best_fit";
    pub const PREDICT_ROLLOUT: &str = "predict.rollout";
    pub const PREDICT_FAILED: &str = "predict.failed";

    // Evaluation
    pub const EVAL_FINISHED: &str = "eval.finished";

    pub const INTERNAL_ERROR: &str = "internal_error";
}
