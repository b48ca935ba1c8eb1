//! Exit codes for the driftgate CLI.
//!
//! The exit code is the pipeline's real API: the calling CI gate
//! consumes it without parsing output. Codes 0 and 1 are the decision
//! contract; codes >= 10 report errors that need operator attention.

use dg_common::Error;

/// Exit codes for driftgate operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// No high-risk drift, including all degrade-to-baseline cases.
    Clean = 0,

    /// At least one high-risk row; remediation should be triggered.
    HighRisk = 1,

    /// Configuration error.
    ConfigError = 10,

    /// Feature table cannot be mapped onto the canonical schema.
    SchemaError = 12,

    /// Artifact I/O error.
    IoError = 13,

    /// Internal/unknown error.
    InternalError = 99,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Check if this exit code indicates an error requiring attention.
    pub fn is_error(self) -> bool {
        (self as i32) >= 10
    }

    /// Map a pipeline error onto the exit-code contract.
    pub fn from_error(err: &Error) -> Self {
        match err {
            Error::Config(_) => ExitCode::ConfigError,
            Error::SchemaMismatch { .. } | Error::MalformedTable { .. } => ExitCode::SchemaError,
            Error::Io(_) => ExitCode::IoError,
            Error::Json(_) | Error::Training(_) | Error::ModelArtifact(_) => {
                ExitCode::InternalError
            }
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}
