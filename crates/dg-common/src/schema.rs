//! Canonical feature schema and label vocabularies.
//!
//! The column list here is the single source of truth for every stage:
//! extraction writes it, training reads it, and inference validates
//! against it. Trainer and classifier must never disagree on feature
//! column order or count.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Current schema version for all artifacts.
///
/// Follows semver: MAJOR.MINOR.PATCH
/// - MAJOR: Breaking changes (column removals, type changes)
/// - MINOR: Additive changes (new optional columns)
/// - PATCH: Bug fixes, documentation
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Feature table columns, in artifact order. The first two are
/// informational only and are never fed to a model.
pub const FEATURE_COLUMNS: [&str; 5] = [
    "address",
    "type",
    "num_resources_changed",
    "critical_services_affected",
    "drift_duration_hours",
];

/// The numeric columns a model consumes, in canonical order.
pub const NUMERIC_FEATURE_COLUMNS: [&str; 3] = [
    "num_resources_changed",
    "critical_services_affected",
    "drift_duration_hours",
];

/// Ground-truth label column (training rows only).
pub const LABEL_COLUMN: &str = "risk_label";

/// Predicted label column in the predictions artifact.
pub const PREDICTION_COLUMN: &str = "predicted_risk";

/// Risk classification of a drift row.
///
/// Ordering is severity ordering: `Safe < Low < High`. Only the fallback
/// heuristic can emit `Safe`; a trained model's negative class means
/// "not high", not "provably nothing happened".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Safe,
    Low,
    High,
}

impl RiskLevel {
    /// Artifact spelling of this level.
    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Safe => "safe",
            RiskLevel::Low => "low",
            RiskLevel::High => "high",
        }
    }

    /// Parse an artifact label. Unknown spellings return `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "safe" => Some(RiskLevel::Safe),
            "low" => Some(RiskLevel::Low),
            "high" => Some(RiskLevel::High),
            _ => None,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A change verb reported by the upstream drift detector.
///
/// Detectors emit free-form verb strings; anything outside the known
/// vocabulary is preserved as `Other` so a record still counts its actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    Create,
    Update,
    Delete,
    Replace,
    Other,
}

impl ChangeAction {
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "create" => ChangeAction::Create,
            "update" => ChangeAction::Update,
            "delete" => ChangeAction::Delete,
            "replace" => ChangeAction::Replace,
            _ => ChangeAction::Other,
        }
    }

    /// Whether this verb alone marks the change as affecting critical
    /// services. `replace` and `delete` take precedence over `update`.
    pub fn is_destructive(self) -> bool {
        matches!(self, ChangeAction::Delete | ChangeAction::Replace)
    }
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChangeAction::Create => "create",
            ChangeAction::Update => "update",
            ChangeAction::Delete => "delete",
            ChangeAction::Replace => "replace",
            ChangeAction::Other => "other",
        };
        write!(f, "{s}")
    }
}

/// Optional severity hint carried on a change record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityHint {
    Low,
    High,
    #[default]
    Unknown,
}

impl SeverityHint {
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "low" => SeverityHint::Low,
            "high" => SeverityHint::High,
            _ => SeverityHint::Unknown,
        }
    }
}
