//! LVA Core Library
//!
//! Predicts how many actions a user will take over a future window from the
//! timestamps of their past actions:
//! - Interval extraction and history features
//! - Gaussian hidden Markov models with state-count selection
//! - Activity-rate clustering with one model per cluster
//! - Posterior-conditioned rollout sampling
//! - Pluggable predictors, ensembles and an evaluation harness
//!
//! The binary entry point is in `main.rs`.

pub mod bank;
pub mod cluster;
pub mod dataset;
pub mod evaluate;
pub mod exit_codes;
pub mod features;
pub mod hmm;
pub mod interval;
pub mod learner;
pub mod logging;
pub mod sampler;
pub mod selection;

pub use learner::{build_predictor, LearnerSpec, Predictor};
