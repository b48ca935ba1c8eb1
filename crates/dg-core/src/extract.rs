//! Feature extraction stage.
//!
//! Maps change records into the canonical feature table. Total by
//! contract: every bad-input regime (absent, malformed, empty) resolves
//! locally into the single-row safe baseline with a logged warning, and
//! extraction never fails the pipeline.

use std::path::PathBuf;

use tracing::{info, warn};

use dg_common::{Result, RiskLevel, SeverityHint};
use dg_config::Config;

use crate::record::{load_change_records, ChangeRecord, RecordSource};
use crate::table::{FeatureRow, FeatureTable};

/// Stateless mapper from change records to feature rows.
///
/// The critical-resource predicate is fixed at construction; extraction
/// itself is a pure function of its input.
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    /// Lowercased substrings matched against resource type and address.
    critical_patterns: Vec<String>,
}

impl FeatureExtractor {
    pub fn new(critical_patterns: &[String]) -> Self {
        Self {
            critical_patterns: critical_patterns.iter().map(|p| p.to_lowercase()).collect(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.critical_patterns)
    }

    /// Map a record source to a feature table. Absent, malformed, and
    /// empty inputs all yield the safe baseline; real records map
    /// one-to-one, order preserved.
    pub fn extract(&self, source: &RecordSource) -> FeatureTable {
        match source {
            RecordSource::Absent => {
                warn!(target: "extract", "no drift input found, generating safe baseline");
                FeatureTable::baseline()
            }
            RecordSource::Malformed { reason } => {
                warn!(target: "extract", reason = %reason, "invalid drift input, generating safe baseline");
                FeatureTable::baseline()
            }
            RecordSource::Empty => {
                info!(target: "extract", "no drift detected, generating baseline features");
                FeatureTable::baseline()
            }
            RecordSource::Records(records) => {
                let rows = records.iter().map(|r| self.row_for(r)).collect();
                FeatureTable::from_rows(rows)
            }
        }
    }

    fn row_for(&self, record: &ChangeRecord) -> FeatureRow {
        let num_resources_changed = if record.actions.is_empty() {
            // Flag-only detectors report drift without verbs.
            u32::from(record.drifted == Some(true))
        } else {
            record.actions.len() as u32
        };

        // Precedence: destructive verbs, then the resource predicate,
        // then an explicit high-severity hint.
        let critical = record.has_destructive_action()
            || self.matches_critical(record)
            || record.severity_hint == SeverityHint::High;

        let drift_duration_hours = record
            .drift_duration_hours
            .filter(|d| d.is_finite() && *d > 0.0)
            .unwrap_or(1.0);

        let label = if record.has_replace() {
            RiskLevel::High
        } else {
            RiskLevel::Low
        };

        FeatureRow {
            address: record.address.clone(),
            resource_type: record.resource_type.clone(),
            num_resources_changed,
            critical_services_affected: u8::from(critical),
            drift_duration_hours,
            risk_label: Some(label.as_str().to_string()),
        }
    }

    fn matches_critical(&self, record: &ChangeRecord) -> bool {
        let resource_type = record.resource_type.to_lowercase();
        let address = record.address.to_lowercase();
        self.critical_patterns
            .iter()
            .any(|p| resource_type.contains(p) || address.contains(p))
    }
}

/// Outcome summary for the extraction stage.
#[derive(Debug)]
pub struct ExtractSummary {
    pub rows: usize,
    pub degraded_to_baseline: bool,
    pub features_path: PathBuf,
}

/// Run the stage: load the input artifact, extract, persist the feature
/// table. Only the artifact write can fail.
pub fn run_extract(config: &Config) -> Result<ExtractSummary> {
    let source = load_change_records(&config.input_path);
    let degraded = !matches!(source, RecordSource::Records(_));

    let extractor = FeatureExtractor::from_config(config);
    let table = extractor.extract(&source);
    table.write(&config.features_path)?;

    info!(
        target: "extract",
        rows = table.len(),
        degraded,
        path = %config.features_path.display(),
        "features extracted"
    );

    Ok(ExtractSummary {
        rows: table.len(),
        degraded_to_baseline: degraded,
        features_path: config.features_path.clone(),
    })
}
