//! Configuration path discovery.
//!
//! Resolution order: CLI argument → `LVA_CONFIG` → `LVA_CONFIG_DIR` → XDG
//! config dir → `/etc/lva` → built-in defaults.

use std::path::{Path, PathBuf};

/// Where the configuration came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfigSource {
    /// Explicitly provided via `--config`.
    CliArgument,

    /// `LVA_CONFIG` or `LVA_CONFIG_DIR`.
    Environment,

    /// Found under the XDG config directory.
    XdgConfig,

    /// Found in /etc/lva/.
    SystemConfig,

    /// No file; built-in defaults.
    #[default]
    BuiltinDefault,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::CliArgument => write!(f, "CLI argument"),
            ConfigSource::Environment => write!(f, "environment variable"),
            ConfigSource::XdgConfig => write!(f, "XDG config"),
            ConfigSource::SystemConfig => write!(f, "system config"),
            ConfigSource::BuiltinDefault => write!(f, "builtin default"),
        }
    }
}

const ENV_CONFIG_PATH: &str = "LVA_CONFIG";
const ENV_CONFIG_DIR: &str = "LVA_CONFIG_DIR";

const CONFIG_FILENAME: &str = "lva.toml";

const APP_NAME: &str = "lva";

/// Locate the configuration file.
///
/// An explicit CLI path is returned even when it does not exist so the
/// loader can report it; every other source is only used if the file is
/// present. `None` means built-in defaults.
pub fn resolve_config_path(cli_path: Option<&Path>) -> Option<(PathBuf, ConfigSource)> {
    if let Some(path) = cli_path {
        return Some((path.to_path_buf(), ConfigSource::CliArgument));
    }
    resolve_from_env(
        std::env::var_os(ENV_CONFIG_PATH).map(PathBuf::from),
        std::env::var_os(ENV_CONFIG_DIR).map(PathBuf::from),
    )
    .or_else(|| {
        xdg_config_dir()
            .map(|d| d.join(CONFIG_FILENAME))
            .filter(|p| p.is_file())
            .map(|p| (p, ConfigSource::XdgConfig))
    })
    .or_else(|| {
        let path = system_config_dir().join(CONFIG_FILENAME);
        path.is_file().then_some((path, ConfigSource::SystemConfig))
    })
}

fn resolve_from_env(
    direct: Option<PathBuf>,
    dir: Option<PathBuf>,
) -> Option<(PathBuf, ConfigSource)> {
    if let Some(path) = direct.filter(|p| p.is_file()) {
        return Some((path, ConfigSource::Environment));
    }
    dir.map(|d| d.join(CONFIG_FILENAME))
        .filter(|p| p.is_file())
        .map(|p| (p, ConfigSource::Environment))
}

/// XDG config directory for lva.
pub fn xdg_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// System config directory.
pub fn system_config_dir() -> PathBuf {
    PathBuf::from("/etc").join(APP_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_source_display() {
        assert_eq!(format!("{}", ConfigSource::CliArgument), "CLI argument");
        assert_eq!(
            format!("{}", ConfigSource::Environment),
            "environment variable"
        );
        assert_eq!(format!("{}", ConfigSource::XdgConfig), "XDG config");
        assert_eq!(format!("{}", ConfigSource::SystemConfig), "system config");
        assert_eq!(
            format!("{}", ConfigSource::BuiltinDefault),
            "builtin default"
        );
    }

    #[test]
    fn cli_path_wins_even_if_missing() {
        let missing = Path::new("/nonexistent/lva.toml");
        let (path, source) = resolve_config_path(Some(missing)).unwrap();
        assert_eq!(path, missing);
        assert_eq!(source, ConfigSource::CliArgument);
    }

    #[test]
    fn env_direct_path_before_dir() {
        let dir = TempDir::new().unwrap();
        let direct = dir.path().join("custom.toml");
        std::fs::write(&direct, "").unwrap();
        std::fs::write(dir.path().join(CONFIG_FILENAME), "").unwrap();

        let (path, source) =
            resolve_from_env(Some(direct.clone()), Some(dir.path().to_path_buf())).unwrap();
        assert_eq!(path, direct);
        assert_eq!(source, ConfigSource::Environment);
    }

    #[test]
    fn env_dir_used_when_direct_missing() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILENAME), "").unwrap();

        let (path, _) = resolve_from_env(
            Some(dir.path().join("missing.toml")),
            Some(dir.path().to_path_buf()),
        )
        .unwrap();
        assert_eq!(path, dir.path().join(CONFIG_FILENAME));
    }

    #[test]
    fn env_dir_without_file_falls_through() {
        let dir = TempDir::new().unwrap();
        assert!(resolve_from_env(None, Some(dir.path().to_path_buf())).is_none());
    }

    #[test]
    fn system_dir_is_under_etc() {
        assert_eq!(system_config_dir(), PathBuf::from("/etc/lva"));
    }
}
