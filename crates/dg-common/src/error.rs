//! Error types for Driftgate.

use thiserror::Error;

/// Result type alias for Driftgate operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for Driftgate.
///
/// Bad *data* (absent, malformed, or empty input) is not an error anywhere
/// in the pipeline: those regimes degrade to the safe baseline or the
/// bootstrap dataset inside the stage that observes them. The variants here
/// cover genuinely broken configuration, a feature table that cannot be
/// mapped onto the canonical schema at inference time, and artifact I/O.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    // Schema errors (20-29)
    #[error("schema mismatch in {artifact}: missing required column '{column}'")]
    SchemaMismatch { artifact: String, column: String },

    #[error("malformed table {path}: {reason}")]
    MalformedTable { path: String, reason: String },

    // Model errors (30-39)
    #[error("model training failed: {0}")]
    Training(String),

    #[error("model artifact unusable: {0}")]
    ModelArtifact(String),

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the error code for this error type.
    /// Used for detailed error reporting in logs.
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::SchemaMismatch { .. } => 20,
            Error::MalformedTable { .. } => 21,
            Error::Training(_) => 30,
            Error::ModelArtifact(_) => 31,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_mismatch_names_artifact_and_column() {
        let err = Error::SchemaMismatch {
            artifact: "drift_features.csv".to_string(),
            column: "num_resources_changed".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("drift_features.csv"));
        assert!(msg.contains("num_resources_changed"));
        assert_eq!(err.code(), 20);
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io.into();
        assert_eq!(err.code(), 60);
    }
}
