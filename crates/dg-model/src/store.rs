//! Model artifact persistence.
//!
//! The model artifact is a single JSON object owning the trained ensemble
//! plus enough metadata to verify the cross-stage feature contract at load
//! time. Absence of the artifact is a normal signal (`Ok(None)`); it is
//! how the classifier decides between model and fallback paths.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use dg_common::{ModelId, NUMERIC_FEATURE_COLUMNS, SCHEMA_VERSION};

use crate::forest::Forest;

/// A persisted trained model with its feature contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub schema_version: String,
    pub model_id: ModelId,
    pub trained_at: String,
    /// The numeric columns the model was fitted on, in order. Checked
    /// against the canonical list at load time.
    pub feature_columns: Vec<String>,
    pub forest: Forest,
}

impl ModelArtifact {
    pub fn new(forest: Forest) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            model_id: ModelId::new(),
            trained_at: chrono::Utc::now().to_rfc3339(),
            feature_columns: NUMERIC_FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            forest,
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("model artifact corrupted at {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("model at {path} was fitted on columns {found:?}, expected {expected:?}")]
    ColumnMismatch {
        path: PathBuf,
        found: Vec<String>,
        expected: Vec<String>,
    },
}

/// Load the model artifact if one exists.
///
/// `Ok(None)` means no model has ever been trained — the caller should
/// route to the fallback heuristic. A file that exists but cannot be
/// parsed, or that was fitted on a different column set, is reported
/// distinctly so the caller can log why the model was not used.
pub fn load_model(path: &Path) -> Result<Option<ModelArtifact>, StoreError> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let artifact: ModelArtifact =
        serde_json::from_str(&contents).map_err(|source| StoreError::Corrupt {
            path: path.to_path_buf(),
            source,
        })?;

    let expected: Vec<String> = NUMERIC_FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect();
    if artifact.feature_columns != expected {
        return Err(StoreError::ColumnMismatch {
            path: path.to_path_buf(),
            found: artifact.feature_columns,
            expected,
        });
    }

    Ok(Some(artifact))
}

/// Save the model artifact atomically (write to temp, then rename).
pub fn save_model(path: &Path, artifact: &ModelArtifact) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }

    let json = serde_json::to_vec_pretty(artifact).expect("model artifact serialization");

    let tmp_path = path.with_extension("json.tmp");
    {
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp_path)
            .map_err(|source| StoreError::Io {
                path: tmp_path.clone(),
                source,
            })?;
        file.write_all(&json).map_err(|source| StoreError::Io {
            path: tmp_path.clone(),
            source,
        })?;
        file.flush().map_err(|source| StoreError::Io {
            path: tmp_path.clone(),
            source,
        })?;
    }
    fs::rename(&tmp_path, path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    debug!(
        target: "model.store",
        model_id = %artifact.model_id,
        path = %path.display(),
        "model artifact saved"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forest::ForestConfig;

    fn trained_forest() -> Forest {
        let x = vec![
            vec![1.0, 0.0, 1.0],
            vec![3.0, 1.0, 5.0],
            vec![10.0, 1.0, 12.0],
            vec![2.0, 0.0, 2.0],
        ];
        let y = vec![0, 1, 1, 0];
        Forest::fit(&x, &y, ForestConfig::with_seed(42)).unwrap()
    }

    #[test]
    fn missing_artifact_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_model(&dir.path().join("drift_model.json")).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn save_then_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drift_model.json");
        let artifact = ModelArtifact::new(trained_forest());
        save_model(&path, &artifact).unwrap();

        let loaded = load_model(&path).unwrap().expect("artifact present");
        assert_eq!(loaded.model_id, artifact.model_id);
        assert_eq!(loaded.feature_columns, artifact.feature_columns);
        assert_eq!(
            loaded.forest.predict(&[3.0, 1.0, 5.0]),
            artifact.forest.predict(&[3.0, 1.0, 5.0])
        );
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/data/drift_model.json");
        save_model(&path, &ModelArtifact::new(trained_forest())).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn corrupt_artifact_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drift_model.json");
        fs::write(&path, "{not json").unwrap();
        let err = load_model(&path).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[test]
    fn column_mismatch_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drift_model.json");
        let mut artifact = ModelArtifact::new(trained_forest());
        artifact.feature_columns = vec![
            "open_ssh".to_string(),
            "public_access".to_string(),
            "tag_changed".to_string(),
        ];
        save_model(&path, &artifact).unwrap();
        let err = load_model(&path).unwrap_err();
        assert!(matches!(err, StoreError::ColumnMismatch { .. }));
    }
}
