//! Exit codes for the lva CLI.
//!
//! Exit code ranges:
//! - 0: success
//! - 10-19: user/input errors (recoverable by fixing arguments, config or data)
//! - 20-29: internal or model errors

use lva_common::{Error, ErrorCategory};

/// Exit codes for lva operations. Stable contract for automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success
    Ok = 0,

    // ========================================================================
    // User / Input Errors (10-19)
    // ========================================================================
    /// Invalid arguments
    ArgsError = 10,

    /// Configuration missing, malformed or invalid
    ConfigError = 11,

    /// Dataset or query unusable
    DataError = 12,

    // ========================================================================
    // Internal Errors (20-29)
    // ========================================================================
    /// Internal error (bug - please report)
    InternalError = 20,

    /// No trained model could serve the prediction
    NoModel = 21,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the error code name as a string constant (for JSON output).
    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Ok => "OK",
            ExitCode::ArgsError => "ERR_ARGS",
            ExitCode::ConfigError => "ERR_CONFIG",
            ExitCode::DataError => "ERR_DATA",
            ExitCode::InternalError => "ERR_INTERNAL",
            ExitCode::NoModel => "ERR_NO_MODEL",
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl From<&Error> for ExitCode {
    fn from(err: &Error) -> Self {
        match err {
            Error::NoModelAvailable => ExitCode::NoModel,
            Error::InvalidArgument(_) => ExitCode::ArgsError,
            other => match other.category() {
                ErrorCategory::Config => ExitCode::ConfigError,
                ErrorCategory::Data | ErrorCategory::Io => ExitCode::DataError,
                ErrorCategory::Training | ErrorCategory::Inference => ExitCode::InternalError,
            },
        }
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code_name(), self.as_i32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(ExitCode::Ok.as_i32(), 0);
        assert_eq!(ExitCode::ArgsError.as_i32(), 10);
        assert_eq!(ExitCode::ConfigError.as_i32(), 11);
        assert_eq!(ExitCode::DataError.as_i32(), 12);
        assert_eq!(ExitCode::InternalError.as_i32(), 20);
        assert_eq!(ExitCode::NoModel.as_i32(), 21);
    }

    #[test]
    fn test_from_error() {
        assert_eq!(ExitCode::from(&Error::NoModelAvailable), ExitCode::NoModel);
        assert_eq!(ExitCode::from(&Error::Config("x".into())), ExitCode::ConfigError);
        assert_eq!(
            ExitCode::from(&Error::InvalidTrainingSet("x".into())),
            ExitCode::DataError
        );
        assert_eq!(
            ExitCode::from(&Error::InvalidArgument("x".into())),
            ExitCode::ArgsError
        );
        assert_eq!(
            ExitCode::from(&Error::SamplingDivergence { steps: 1, period: 1.0 }),
            ExitCode::InternalError
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(ExitCode::NoModel.to_string(), "ERR_NO_MODEL (21)");
    }
}
