//! Configuration file loading.
//!
//! Files ending in `.json` are parsed as JSON; everything else as TOML.
//! Loaded configs are validated before being returned.

use crate::resolve::{resolve_config_path, ConfigSource};
use crate::settings::LvaConfig;
use crate::validate::{validate_config, ValidationError};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during config loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Invalid TOML in config file {path}: {source}")]
    TomlError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid JSON in config file {path}: {source}")]
    JsonError {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Semantic validation failed: {0}")]
    ValidationError(#[from] ValidationError),

    #[error("I/O error reading {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A validated configuration with provenance.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: LvaConfig,
    /// File the config was read from (None for built-in defaults).
    pub path: Option<PathBuf>,
    pub source: ConfigSource,
}

impl LoadedConfig {
    pub fn defaults() -> Self {
        Self {
            config: LvaConfig::default(),
            path: None,
            source: ConfigSource::BuiltinDefault,
        }
    }
}

/// Resolve, read, parse and validate the configuration.
pub fn load_config(cli_path: Option<&Path>) -> Result<LoadedConfig, ConfigError> {
    match resolve_config_path(cli_path) {
        Some((path, source)) => {
            let config = load_config_file(&path)?;
            Ok(LoadedConfig {
                config,
                path: Some(path),
                source,
            })
        }
        None => Ok(LoadedConfig::defaults()),
    }
}

/// Read and validate a single config file.
pub fn load_config_file(path: &Path) -> Result<LvaConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
        path: path.to_path_buf(),
        source: e,
    })?;
    let config = parse_config(path, &content)?;
    validate_config(&config)?;
    Ok(config)
}

fn parse_config(path: &Path, content: &str) -> Result<LvaConfig, ConfigError> {
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        serde_json::from_str(content).map_err(|e| ConfigError::JsonError {
            path: path.to_path_buf(),
            source: e,
        })
    } else {
        toml::from_str(content).map_err(|e| ConfigError::TomlError {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::LearnerKind;
    use tempfile::TempDir;

    #[test]
    fn missing_cli_path_is_not_found() {
        let err = load_config(Some(Path::new("/nonexistent/lva.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    fn loads_toml_with_provenance() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lva.toml");
        std::fs::write(&path, "learner = \"simple\"\nseed = 3\n").unwrap();

        let loaded = load_config(Some(&path)).unwrap();
        assert_eq!(loaded.source, ConfigSource::CliArgument);
        assert_eq!(loaded.path.as_deref(), Some(path.as_path()));
        assert_eq!(loaded.config.learner, LearnerKind::Simple);
        assert_eq!(loaded.config.seed, Some(3));
    }

    #[test]
    fn loads_json_by_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lva.json");
        std::fs::write(&path, r#"{"clustering": {"clusters": 4}}"#).unwrap();

        let cfg = load_config_file(&path).unwrap();
        assert_eq!(cfg.clustering.clusters, 4);
    }

    #[test]
    fn malformed_toml_reports_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "learner = [").unwrap();

        let err = load_config_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TomlError { .. }));
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn invalid_values_fail_validation() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lva.toml");
        std::fs::write(&path, "[clustering]\nrestarts = 2\n").unwrap();

        let err = load_config_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }
}
