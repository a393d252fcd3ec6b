//! Log level and format selection.
//!
//! Both are plain command-line values; `--log-level` falls back to `LVA_LOG`
//! and `--log-format` to `LVA_LOG_FORMAT`. A `RUST_LOG` directive set in the
//! environment replaces the level filter entirely (see [`super::init_logging`]).

use clap::ValueEnum;

/// Where log lines go and how they look. Always stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    /// Human-readable console lines.
    #[default]
    Human,
    /// One JSON object per line; errors are also reported as JSON.
    #[value(alias = "json")]
    Jsonl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    #[value(alias = "warning")]
    Warn,
    Error,
    #[value(alias = "quiet")]
    Off,
}

impl LogLevel {
    /// Directive spelling understood by `EnvFilter`.
    pub fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
}

impl LogConfig {
    /// Unset options keep their defaults.
    pub fn new(level: Option<LogLevel>, format: Option<LogFormat>) -> Self {
        Self {
            level: level.unwrap_or_default(),
            format: format.unwrap_or_default(),
        }
    }

    /// Errors go to stderr as a JSON object rather than the human block.
    pub fn structured_errors(&self) -> bool {
        self.format == LogFormat::Jsonl
    }

    /// Filter used when `RUST_LOG` is absent.
    pub fn default_directives(&self) -> String {
        format!("lva_core={0},lva={0}", self.level.as_directive())
    }
}
