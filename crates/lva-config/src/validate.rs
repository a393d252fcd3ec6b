//! Configuration validation errors and semantic validation.

use crate::settings::{LearnerKind, LvaConfig};
use thiserror::Error;

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Weight sums are accepted within this distance of 1.
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Restarts below this make k-means too sensitive to seeding.
const MIN_CLUSTER_RESTARTS: usize = 10;

/// Configuration validation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Semantic validation failed: {0}")]
    SemanticError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },
}

impl ValidationError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ValidationError::SemanticError(_) => 63,
            ValidationError::InvalidValue { .. } => 65,
            ValidationError::VersionMismatch { .. } => 66,
        }
    }
}

fn invalid(field: &str, message: impl Into<String>) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        message: message.into(),
    }
}

fn check_positive(field: &str, value: f64) -> ValidationResult<()> {
    if !(value.is_finite() && value > 0.0) {
        return Err(invalid(field, format!("must be finite and > 0, got {}", value)));
    }
    Ok(())
}

/// Validate a full configuration semantically.
pub fn validate_config(config: &LvaConfig) -> ValidationResult<()> {
    if config.schema_version != crate::CONFIG_SCHEMA_VERSION {
        return Err(ValidationError::VersionMismatch {
            expected: crate::CONFIG_SCHEMA_VERSION.to_string(),
            actual: config.schema_version.clone(),
        });
    }

    let sel = &config.selection;
    if sel.max_states == 0 {
        return Err(invalid("selection.max_states", "must be at least 1"));
    }
    if sel.max_iterations == 0 {
        return Err(invalid("selection.max_iterations", "must be at least 1"));
    }
    check_positive("selection.min_variance", sel.min_variance)?;
    if !(sel.tolerance.is_finite() && sel.tolerance >= 0.0) {
        return Err(invalid("selection.tolerance", "must be finite and >= 0"));
    }
    if !(sel.timeout_secs.is_finite() && sel.timeout_secs >= 0.0) {
        return Err(invalid("selection.timeout_secs", "must be finite and >= 0"));
    }

    let cl = &config.clustering;
    if cl.clusters == 0 {
        return Err(invalid("clustering.clusters", "must be at least 1"));
    }
    if cl.restarts < MIN_CLUSTER_RESTARTS {
        return Err(invalid(
            "clustering.restarts",
            format!("must be at least {}, got {}", MIN_CLUSTER_RESTARTS, cl.restarts),
        ));
    }
    if cl.max_iterations == 0 {
        return Err(invalid("clustering.max_iterations", "must be at least 1"));
    }

    if config.sampling.max_rollout_steps == 0 {
        return Err(invalid("sampling.max_rollout_steps", "must be at least 1"));
    }

    if !(config.baseline.span_padding_secs.is_finite() && config.baseline.span_padding_secs >= 0.0)
    {
        return Err(invalid("baseline.span_padding_secs", "must be finite and >= 0"));
    }
    if !(config.linear.ridge.is_finite() && config.linear.ridge >= 0.0) {
        return Err(invalid("linear.ridge", "must be finite and >= 0"));
    }

    if config.data.min_actions < 2 {
        return Err(invalid(
            "data.min_actions",
            "must be at least 2 so every user has an interval",
        ));
    }

    validate_ensemble(config)?;

    Ok(())
}

fn validate_ensemble(config: &LvaConfig) -> ValidationResult<()> {
    let members = &config.ensemble.members;
    // Only checked when the ensemble can actually be built.
    if config.learner != LearnerKind::Ensemble && members.is_empty() {
        return Ok(());
    }
    if members.is_empty() {
        return Err(ValidationError::SemanticError(
            "ensemble needs at least one member".to_string(),
        ));
    }
    for (i, member) in members.iter().enumerate() {
        if member.learner == LearnerKind::Ensemble {
            return Err(invalid(
                &format!("ensemble.members[{}].learner", i),
                "ensembles cannot nest",
            ));
        }
        if !(member.weight.is_finite() && member.weight >= 0.0) {
            return Err(invalid(
                &format!("ensemble.members[{}].weight", i),
                format!("must be finite and >= 0, got {}", member.weight),
            ));
        }
    }
    let sum: f64 = members.iter().map(|m| m.weight).sum();
    if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
        return Err(ValidationError::SemanticError(format!(
            "ensemble weights must sum to 1.0, got {}",
            sum
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::EnsembleMember;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&LvaConfig::default()).is_ok());
    }

    #[test]
    fn rejects_version_mismatch() {
        let cfg = LvaConfig {
            schema_version: "0.1.0".to_string(),
            ..Default::default()
        };
        let err = validate_config(&cfg).unwrap_err();
        assert!(matches!(err, ValidationError::VersionMismatch { .. }));
        assert_eq!(err.code(), 66);
    }

    #[test]
    fn rejects_zero_states_and_few_restarts() {
        let mut cfg = LvaConfig::default();
        cfg.selection.max_states = 0;
        assert!(validate_config(&cfg).is_err());

        let mut cfg = LvaConfig::default();
        cfg.clustering.restarts = 9;
        let err = validate_config(&cfg).unwrap_err();
        assert!(err.to_string().contains("clustering.restarts"));
    }

    #[test]
    fn rejects_non_positive_variance_floor() {
        let mut cfg = LvaConfig::default();
        cfg.selection.min_variance = 0.0;
        assert!(validate_config(&cfg).is_err());
    }

    #[test]
    fn rejects_weights_not_summing_to_one() {
        let mut cfg = LvaConfig::default();
        cfg.ensemble.members[0].weight = 0.7;
        let err = validate_config(&cfg).unwrap_err();
        assert!(matches!(err, ValidationError::SemanticError(_)));
    }

    #[test]
    fn rejects_negative_weight_and_nesting() {
        let mut cfg = LvaConfig::default();
        cfg.ensemble.members = vec![
            EnsembleMember {
                learner: LearnerKind::Simple,
                weight: 1.5,
            },
            EnsembleMember {
                learner: LearnerKind::Hmm,
                weight: -0.5,
            },
        ];
        assert!(validate_config(&cfg).is_err());

        let mut cfg = LvaConfig::default();
        cfg.ensemble.members[1].learner = LearnerKind::Ensemble;
        assert!(validate_config(&cfg).is_err());
    }

    #[test]
    fn empty_ensemble_only_matters_when_selected() {
        let mut cfg = LvaConfig::default();
        cfg.ensemble.members.clear();
        assert!(validate_config(&cfg).is_ok());

        cfg.learner = LearnerKind::Ensemble;
        assert!(validate_config(&cfg).is_err());
    }
}
