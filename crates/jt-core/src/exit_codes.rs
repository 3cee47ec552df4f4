//! Exit codes for the jt-core CLI.
//!
//! Stable contract for scripts:
//! - 0: success
//! - 10-19: user errors (bad arguments, invalid network, invalid query)
//! - 20-29: internal or environment errors

use crate::config::ConfigError;
use crate::error::{EngineError, ErrorCategory};

/// Process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Ok = 0,

    /// Invalid arguments or settings.
    ArgsError = 10,

    /// Network file failed to parse or validate.
    NetworkInvalid = 11,

    /// Unknown variable/state, empty event, or mismatched distribution.
    QueryInvalid = 12,

    /// Internal error (bug).
    InternalError = 20,

    /// File could not be read or written.
    IoError = 21,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn is_success(self) -> bool {
        self == ExitCode::Ok
    }

    /// Codes 10-19, fixable by the caller.
    pub fn is_user_error(self) -> bool {
        (10..20).contains(&self.as_i32())
    }

    /// Name used in JSON error payloads.
    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Ok => "OK",
            ExitCode::ArgsError => "ERR_ARGS",
            ExitCode::NetworkInvalid => "ERR_NETWORK",
            ExitCode::QueryInvalid => "ERR_QUERY",
            ExitCode::InternalError => "ERR_INTERNAL",
            ExitCode::IoError => "ERR_IO",
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        // All codes fit in a u8.
        std::process::ExitCode::from(code.as_i32() as u8)
    }
}

impl From<&EngineError> for ExitCode {
    fn from(err: &EngineError) -> Self {
        match err.category() {
            ErrorCategory::Network => ExitCode::NetworkInvalid,
            ErrorCategory::Query | ErrorCategory::Distribution => ExitCode::QueryInvalid,
            ErrorCategory::Config => ExitCode::ArgsError,
            ErrorCategory::Internal => ExitCode::InternalError,
        }
    }
}

impl From<&ConfigError> for ExitCode {
    fn from(err: &ConfigError) -> Self {
        match err {
            ConfigError::MissingNetwork | ConfigError::InvalidSettings { .. } => ExitCode::ArgsError,
            ConfigError::IoError { .. } => ExitCode::IoError,
            ConfigError::InvalidNetwork { .. } => ExitCode::NetworkInvalid,
        }
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code_name(), self.as_i32())
    }
}
