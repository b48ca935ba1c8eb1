//! Feature table representation and artifact codec.
//!
//! The feature table is the contract between all three stages. Column
//! names and order come from `dg_common::schema`; this module enforces
//! them on read and write. Fields are resource identifiers and numbers,
//! so the codec is a plain line/field parser; no quoting is required.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use tracing::debug;

use dg_common::{Error, Result, RiskLevel, FEATURE_COLUMNS, LABEL_COLUMN};

/// One numeric feature vector derived from zero or one change record
/// (zero only for the synthetic baseline row).
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    /// Resource identifier, informational only.
    pub address: String,
    /// Resource type, informational only.
    pub resource_type: String,
    pub num_resources_changed: u32,
    /// 0 or 1.
    pub critical_services_affected: u8,
    pub drift_duration_hours: f64,
    /// Ground-truth label as written in the artifact. Kept raw so that
    /// historical labels outside {safe, low, high} survive a read and can
    /// be folded by the trainer's binarization.
    pub risk_label: Option<String>,
}

impl FeatureRow {
    /// The synthetic "no drift" row substituted for absent, empty, or
    /// invalid input.
    pub fn safe_baseline() -> Self {
        Self {
            address: String::new(),
            resource_type: String::new(),
            num_resources_changed: 0,
            critical_services_affected: 0,
            drift_duration_hours: 1.0,
            risk_label: Some(RiskLevel::Safe.as_str().to_string()),
        }
    }

    /// The numeric columns a model consumes, in canonical order.
    pub fn numeric_features(&self) -> [f64; 3] {
        [
            f64::from(self.num_resources_changed),
            f64::from(self.critical_services_affected),
            self.drift_duration_hours,
        ]
    }
}

/// Ordered feature rows sharing the fixed schema.
///
/// Invariant: never empty. Absence of real drift is represented by
/// exactly one safe-baseline row, so downstream consumers always have a
/// defined aggregate.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    rows: Vec<FeatureRow>,
}

impl FeatureTable {
    /// The single-row safe baseline table.
    pub fn baseline() -> Self {
        Self {
            rows: vec![FeatureRow::safe_baseline()],
        }
    }

    /// Build a table from extracted rows; zero rows degrade to the
    /// baseline to uphold the non-empty invariant.
    pub fn from_rows(rows: Vec<FeatureRow>) -> Self {
        if rows.is_empty() {
            Self::baseline()
        } else {
            Self { rows }
        }
    }

    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether any row carries a ground-truth label.
    pub fn is_labeled(&self) -> bool {
        self.rows.iter().any(|r| r.risk_label.is_some())
    }

    /// Serialize to the artifact format. The label column is included
    /// whenever any row is labeled.
    pub fn to_csv(&self) -> String {
        let labeled = self.is_labeled();
        let mut out = String::new();
        out.push_str(&FEATURE_COLUMNS.join(","));
        if labeled {
            out.push(',');
            out.push_str(LABEL_COLUMN);
        }
        out.push('\n');
        for row in &self.rows {
            out.push_str(&format!(
                "{},{},{},{},{}",
                row.address,
                row.resource_type,
                row.num_resources_changed,
                row.critical_services_affected,
                row.drift_duration_hours,
            ));
            if labeled {
                out.push(',');
                out.push_str(row.risk_label.as_deref().unwrap_or(""));
            }
            out.push('\n');
        }
        out
    }

    /// Parse the artifact format. `origin` names the artifact in errors.
    ///
    /// The three numeric columns are required; the informational and
    /// label columns are optional. A header-only file parses to the
    /// baseline table (the non-empty invariant holds everywhere).
    pub fn parse_csv(content: &str, origin: &str) -> Result<Self> {
        let mut lines = content.lines().filter(|l| !l.trim().is_empty());
        let header = lines.next().ok_or_else(|| Error::MalformedTable {
            path: origin.to_string(),
            reason: "empty file".to_string(),
        })?;
        let columns: Vec<&str> = header.split(',').map(str::trim).collect();

        let index_of = |name: &str| columns.iter().position(|c| *c == name);
        let address_idx = index_of(FEATURE_COLUMNS[0]);
        let type_idx = index_of(FEATURE_COLUMNS[1]);
        let label_idx = index_of(LABEL_COLUMN);
        let mut numeric_idx = [0usize; 3];
        for (slot, name) in numeric_idx.iter_mut().zip(&FEATURE_COLUMNS[2..]) {
            *slot = index_of(name).ok_or_else(|| Error::SchemaMismatch {
                artifact: origin.to_string(),
                column: name.to_string(),
            })?;
        }

        let mut rows = Vec::new();
        for (line_no, line) in lines.enumerate() {
            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            let numeric = |idx: usize| -> Result<f64> {
                let raw = fields.get(idx).copied().unwrap_or("");
                raw.parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| Error::MalformedTable {
                        path: origin.to_string(),
                        reason: format!("row {}: bad numeric value '{raw}'", line_no + 1),
                    })
            };

            let num = numeric(numeric_idx[0])?;
            if num < 0.0 {
                return Err(Error::MalformedTable {
                    path: origin.to_string(),
                    reason: format!("row {}: negative change count", line_no + 1),
                });
            }
            let critical = numeric(numeric_idx[1])?;
            let duration = numeric(numeric_idx[2])?;

            let text = |idx: Option<usize>| {
                idx.and_then(|i| fields.get(i))
                    .map(|s| s.to_string())
                    .unwrap_or_default()
            };

            rows.push(FeatureRow {
                address: text(address_idx),
                resource_type: text(type_idx),
                num_resources_changed: num.round() as u32,
                critical_services_affected: u8::from(critical != 0.0),
                drift_duration_hours: duration,
                risk_label: label_idx
                    .and_then(|i| fields.get(i))
                    .filter(|s| !s.is_empty())
                    .map(|s| s.to_string()),
            });
        }

        Ok(Self::from_rows(rows))
    }

    /// Read a feature table artifact. The caller decides how to treat an
    /// absent file; this propagates the I/O error.
    pub fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse_csv(&content, &path.display().to_string())
    }

    /// Write the artifact atomically.
    pub fn write(&self, path: &Path) -> Result<()> {
        write_atomic(path, &self.to_csv())?;
        debug!(target: "table", rows = self.len(), path = %path.display(), "feature table written");
        Ok(())
    }
}

/// Write `contents` to `path` via a temp file and rename, so a reader in
/// the same run never observes a partial artifact.
pub(crate) fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    let tmp_path = path.with_extension("csv.tmp");
    {
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp_path)?;
        file.write_all(contents.as_bytes())?;
        file.flush()?;
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}
