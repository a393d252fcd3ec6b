//! LVA configuration loading and validation.
//!
//! This crate provides:
//! - Typed Rust structs for the learner configuration (`lva.toml` / `lva.json`)
//! - Config resolution (CLI → env → XDG → system → defaults)
//! - Semantic validation
//! - File loading with provenance

pub mod load;
pub mod resolve;
pub mod settings;
pub mod validate;

pub use load::{load_config, load_config_file, ConfigError, LoadedConfig};
pub use resolve::{resolve_config_path, ConfigSource};
pub use settings::{
    BaselineConfig, ClusteringConfig, DataConfig, EnsembleConfig, EnsembleMember, LearnerKind,
    LinearConfig, LvaConfig, RegressionPolicy, SamplingConfig, SelectionConfig,
};
pub use validate::{validate_config, ValidationError, ValidationResult};

/// Schema version for configuration files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";
