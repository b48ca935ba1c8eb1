//! Driftgate configuration resolution.
//!
//! This crate provides:
//! - Typed artifact path configuration for the three pipeline stages
//! - Resolution (CLI/env overrides → defaults under `data/`)
//! - The critical-resource predicate patterns used during extraction
//!
//! Stages receive a [`Config`] explicitly instead of reading global
//! default paths, so each stage is independently testable against a
//! temporary directory.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Schema version for configuration snapshots.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";

/// Default artifact layout, shared with the upstream drift detector.
pub const DEFAULT_INPUT_PATH: &str = "data/drift_results.json";
pub const DEFAULT_FEATURES_PATH: &str = "data/drift_features.csv";
pub const DEFAULT_HISTORY_PATH: &str = "data/drift_history.csv";
pub const DEFAULT_MODEL_PATH: &str = "data/drift_model.json";
pub const DEFAULT_PREDICTIONS_PATH: &str = "data/drift_predictions.csv";

/// Fixed seed for deterministic training runs.
pub const DEFAULT_TRAINING_SEED: u64 = 42;

/// Resource type/address substrings that mark a resource as critical
/// regardless of its change verbs. Matching is case-insensitive.
pub fn default_critical_patterns() -> Vec<String> {
    ["security_group", "iam_", "kms_", "firewall"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Resolved configuration for a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Raw change records from the drift detector.
    pub input_path: PathBuf,

    /// Extracted feature table.
    pub features_path: PathBuf,

    /// Labeled historical feature table used for training.
    pub history_path: PathBuf,

    /// Trained model artifact. Presence of this file is the sole signal
    /// the classifier uses to choose model over fallback heuristic.
    pub model_path: PathBuf,

    /// Predictions artifact (decision basis record).
    pub predictions_path: PathBuf,

    #[serde(default = "default_critical_patterns")]
    pub critical_patterns: Vec<String>,

    #[serde(default = "default_training_seed")]
    pub training_seed: u64,
}

fn default_training_seed() -> u64 {
    DEFAULT_TRAINING_SEED
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from(DEFAULT_INPUT_PATH),
            features_path: PathBuf::from(DEFAULT_FEATURES_PATH),
            history_path: PathBuf::from(DEFAULT_HISTORY_PATH),
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            predictions_path: PathBuf::from(DEFAULT_PREDICTIONS_PATH),
            critical_patterns: default_critical_patterns(),
            training_seed: DEFAULT_TRAINING_SEED,
        }
    }
}

/// Optional per-field overrides, typically collected from CLI flags
/// (which themselves fall back to `DRIFTGATE_*` environment variables).
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub input_path: Option<PathBuf>,
    pub features_path: Option<PathBuf>,
    pub history_path: Option<PathBuf>,
    pub model_path: Option<PathBuf>,
    pub predictions_path: Option<PathBuf>,
    pub training_seed: Option<u64>,
}

/// Resolve a configuration: each override wins over the default.
pub fn resolve_config(overrides: ConfigOverrides) -> Config {
    let base = Config::default();
    Config {
        input_path: overrides.input_path.unwrap_or(base.input_path),
        features_path: overrides.features_path.unwrap_or(base.features_path),
        history_path: overrides.history_path.unwrap_or(base.history_path),
        model_path: overrides.model_path.unwrap_or(base.model_path),
        predictions_path: overrides.predictions_path.unwrap_or(base.predictions_path),
        critical_patterns: base.critical_patterns,
        training_seed: overrides.training_seed.unwrap_or(base.training_seed),
    }
}

impl Config {
    /// Rebase every default-relative artifact path onto `root`.
    /// Intended for tests and sandboxed runs.
    pub fn rooted_at(root: &Path) -> Self {
        let base = Config::default();
        Config {
            input_path: root.join(base.input_path),
            features_path: root.join(base.features_path),
            history_path: root.join(base.history_path),
            model_path: root.join(base.model_path),
            predictions_path: root.join(base.predictions_path),
            critical_patterns: base.critical_patterns,
            training_seed: base.training_seed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_data_layout() {
        let config = Config::default();
        assert_eq!(config.input_path, PathBuf::from("data/drift_results.json"));
        assert_eq!(config.model_path, PathBuf::from("data/drift_model.json"));
        assert_eq!(config.training_seed, 42);
    }

    #[test]
    fn overrides_win_over_defaults() {
        let config = resolve_config(ConfigOverrides {
            input_path: Some(PathBuf::from("/tmp/plan.json")),
            training_seed: Some(7),
            ..Default::default()
        });
        assert_eq!(config.input_path, PathBuf::from("/tmp/plan.json"));
        assert_eq!(config.training_seed, 7);
        // Untouched fields keep their defaults.
        assert_eq!(config.features_path, PathBuf::from(DEFAULT_FEATURES_PATH));
    }

    #[test]
    fn rooted_config_prefixes_all_paths() {
        let config = Config::rooted_at(Path::new("/work"));
        assert_eq!(
            config.predictions_path,
            PathBuf::from("/work/data/drift_predictions.csv")
        );
        assert_eq!(config.history_path, PathBuf::from("/work/data/drift_history.csv"));
    }

    #[test]
    fn default_patterns_cover_security_groups() {
        let patterns = default_critical_patterns();
        assert!(patterns.iter().any(|p| p == "security_group"));
    }

    #[test]
    fn config_serde_roundtrip() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back.input_path, config.input_path);
        assert_eq!(back.critical_patterns, config.critical_patterns);
    }
}
