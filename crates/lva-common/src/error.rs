//! Error types for LVA.
//!
//! This module provides structured error handling with:
//! - Stable error codes for machine parsing
//! - Category classification for error grouping
//! - Recoverability hints for drivers
//! - Remediation suggestions for humans
//!
//! # Human-Facing Output
//!
//! ```text
//! ✗ No Model Available
//!   Reason: no trained model available for prediction
//!   Fix: Run learn with a non-empty training set before predicting.
//! ```
//!
//! # Machine-Facing Output
//!
//! ```json
//! {
//!   "code": 32,
//!   "category": "inference",
//!   "message": "sampling diverged after 1000000 steps without covering 86400s",
//!   "recoverable": true,
//!   "context": { "steps": 1000000, "period": 86400.0 }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for LVA operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Configuration file errors.
    Config,
    /// Malformed or insufficient input data.
    Data,
    /// Model fitting errors.
    Training,
    /// Prediction-time errors.
    Inference,
    /// File I/O and serialization errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Data => write!(f, "data"),
            ErrorCategory::Training => write!(f, "training"),
            ErrorCategory::Inference => write!(f, "inference"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Unified error type for LVA.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    // Data errors (20-29)
    #[error("insufficient history: need at least {required} timestamps, got {actual}")]
    InsufficientHistory { required: usize, actual: usize },

    #[error("invalid training set: {0}")]
    InvalidTrainingSet(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    // Training and inference errors (30-39)
    #[error("model fit failed with {states} states: {reason}")]
    ModelFitFailure { states: usize, reason: String },

    #[error("no trained model available for prediction")]
    NoModelAvailable,

    #[error("sampling diverged after {steps} steps without covering {period}s")]
    SamplingDivergence { steps: usize, period: f64 },

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the error code for this error type.
    ///
    /// Error codes are stable and grouped by category:
    /// - 10-19: Configuration errors
    /// - 20-29: Data errors
    /// - 30-39: Training/inference errors
    /// - 60-69: I/O errors
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::InsufficientHistory { .. } => 20,
            Error::InvalidTrainingSet(_) => 21,
            Error::InvalidArgument(_) => 22,
            Error::ModelFitFailure { .. } => 30,
            Error::NoModelAvailable => 31,
            Error::SamplingDivergence { .. } => 32,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_) => ErrorCategory::Config,

            Error::InsufficientHistory { .. }
            | Error::InvalidTrainingSet(_)
            | Error::InvalidArgument(_) => ErrorCategory::Data,

            Error::ModelFitFailure { .. } => ErrorCategory::Training,

            Error::NoModelAvailable | Error::SamplingDivergence { .. } => ErrorCategory::Inference,

            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// Returns whether this error is potentially recoverable by the caller.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Config(_) => true,

            // Bad input stays bad on retry
            Error::InsufficientHistory { .. } => false,
            Error::InvalidTrainingSet(_) => false,
            Error::InvalidArgument(_) => false,

            // Selector falls back to the last good model
            Error::ModelFitFailure { .. } => true,
            Error::NoModelAvailable => false,
            // Rollouts are stochastic
            Error::SamplingDivergence { .. } => true,

            Error::Io(_) => true,
            Error::Json(_) => false,
        }
    }

    /// Returns a human-readable remediation hint.
    pub fn remediation(&self) -> &'static str {
        match self {
            Error::Config(_) => "Run 'lva config validate' and check the config file syntax.",
            Error::InsufficientHistory { .. } => {
                "Users need at least two timestamps; filter short histories before predicting."
            }
            Error::InvalidTrainingSet(_) => {
                "Provide a non-empty training set with positive outcome durations."
            }
            Error::InvalidArgument(_) => "Check the prediction period and timestamps are finite and positive.",
            Error::ModelFitFailure { .. } => {
                "Lower selection.max_states or provide more distinct interval observations."
            }
            Error::NoModelAvailable => "Run learn with a non-empty training set before predicting.",
            Error::SamplingDivergence { .. } => {
                "The selected model emits non-positive intervals; retrain or raise sampling.max_rollout_steps."
            }
            Error::Io(_) => "Check the file exists and is readable.",
            Error::Json(_) => "Invalid JSON in input. Check syntax with 'jq . <file>'.",
        }
    }

    /// Returns a short headline for human-readable output.
    pub fn headline(&self) -> &'static str {
        match self {
            Error::Config(_) => "Configuration Error",
            Error::InsufficientHistory { .. } => "Insufficient History",
            Error::InvalidTrainingSet(_) => "Invalid Training Set",
            Error::InvalidArgument(_) => "Invalid Argument",
            Error::ModelFitFailure { .. } => "Model Fit Failure",
            Error::NoModelAvailable => "No Model Available",
            Error::SamplingDivergence { .. } => "Sampling Divergence",
            Error::Io(_) => "I/O Error",
            Error::Json(_) => "JSON Parse Error",
        }
    }
}

/// Structured error response for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Stable error code.
    pub code: u32,

    /// Error category for grouping.
    pub category: ErrorCategory,

    /// Human-readable error message.
    pub message: String,

    /// Whether the error is potentially recoverable.
    pub recoverable: bool,

    /// Additional structured context.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,
}

impl From<&Error> for StructuredError {
    fn from(err: &Error) -> Self {
        let mut context = HashMap::new();

        match err {
            Error::InsufficientHistory { required, actual } => {
                context.insert("required".to_string(), serde_json::json!(required));
                context.insert("actual".to_string(), serde_json::json!(actual));
            }
            Error::ModelFitFailure { states, .. } => {
                context.insert("states".to_string(), serde_json::json!(states));
            }
            Error::SamplingDivergence { steps, period } => {
                context.insert("steps".to_string(), serde_json::json!(steps));
                context.insert("period".to_string(), serde_json::json!(period));
            }
            _ => {}
        }

        StructuredError {
            code: err.code(),
            category: err.category(),
            message: err.to_string(),
            recoverable: err.is_recoverable(),
            context,
        }
    }
}

impl StructuredError {
    /// Add additional context to the error.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":{},"error":"serialization_failed"}}"#, self.code)
        })
    }
}

/// Format an error for human-readable stderr output.
///
/// Output format:
/// ```text
/// ✗ [Headline]
///   Reason: [Error message]
///   Fix: [Remediation hint]
/// ```
pub fn format_error_human(err: &Error, use_color: bool) -> String {
    let (red, cyan, reset) = if use_color {
        ("\x1b[31m", "\x1b[36m", "\x1b[0m")
    } else {
        ("", "", "")
    };

    format!(
        "{red}✗{reset} {headline}\n  Reason: {message}\n  {cyan}Fix:{reset} {remediation}",
        red = red,
        cyan = cyan,
        reset = reset,
        headline = err.headline(),
        message = err,
        remediation = err.remediation()
    )
}
