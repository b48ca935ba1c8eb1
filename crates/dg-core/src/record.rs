//! Change record input parsing.
//!
//! The drift detector's output is heterogeneous: a flat JSON array of
//! change entries, or a Terraform-plan-shaped object keying the entries
//! under `resource_changes` or `resources`. Entries themselves vary:
//! verbs may appear as `actions`, as a bare `change` array, or nested
//! under `change.actions`. Every shape problem resolves to a well-defined
//! [`RecordSource`] variant; nothing in this module returns an error.

use std::path::Path;

use serde_json::Value;

use dg_common::{ChangeAction, SeverityHint};

/// One observed infrastructure drift event, immutable once read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeRecord {
    pub address: String,
    pub resource_type: String,
    /// Ordered change verbs; empty means no-op.
    pub actions: Vec<ChangeAction>,
    pub severity_hint: SeverityHint,
    /// Opaque attribute maps; keys are not fixed.
    pub before: Option<Value>,
    pub after: Option<Value>,
    /// Duration telemetry, when the detector provides it.
    pub drift_duration_hours: Option<f64>,
    /// Some detectors only report a boolean "drifted" flag.
    pub drifted: Option<bool>,
}

impl ChangeRecord {
    pub fn has_destructive_action(&self) -> bool {
        self.actions.iter().any(|a| a.is_destructive())
    }

    pub fn has_replace(&self) -> bool {
        self.actions.contains(&ChangeAction::Replace)
    }
}

/// Outcome of loading the input artifact. The four "bad input" regimes
/// each get a distinct, non-error representation.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordSource {
    /// The input artifact does not exist.
    Absent,
    /// The artifact exists but is unreadable or not valid structured data.
    Malformed { reason: String },
    /// Valid structure containing zero change records.
    Empty,
    /// At least one change record, in input order.
    Records(Vec<ChangeRecord>),
}

/// Load the change-record artifact. Total: never fails.
pub fn load_change_records(path: &Path) -> RecordSource {
    if !path.exists() {
        return RecordSource::Absent;
    }

    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            return RecordSource::Malformed {
                reason: format!("unreadable: {e}"),
            }
        }
    };

    let value: Value = match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(e) => {
            return RecordSource::Malformed {
                reason: format!("invalid JSON: {e}"),
            }
        }
    };

    let entries = match &value {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => {
            match map
                .get("resource_changes")
                .or_else(|| map.get("resources"))
            {
                Some(Value::Array(items)) => items.as_slice(),
                Some(_) => {
                    return RecordSource::Malformed {
                        reason: "change collection is not an array".to_string(),
                    }
                }
                None if map.is_empty() => return RecordSource::Empty,
                None => {
                    return RecordSource::Malformed {
                        reason: "no resource_changes or resources field".to_string(),
                    }
                }
            }
        }
        Value::Null => return RecordSource::Empty,
        _ => {
            return RecordSource::Malformed {
                reason: "top-level value is not an array or object".to_string(),
            }
        }
    };

    if entries.is_empty() {
        return RecordSource::Empty;
    }

    RecordSource::Records(entries.iter().map(parse_record).collect())
}

/// Parse one entry. Entries are partial by nature; anything unrecognized
/// degrades to a no-op record so the row count stays aligned with the
/// input.
fn parse_record(entry: &Value) -> ChangeRecord {
    let Some(obj) = entry.as_object() else {
        return ChangeRecord::default();
    };

    let address = string_field(obj, &["address", "name"]);
    let resource_type = string_field(obj, &["type", "resource_type"]);

    let change_obj = obj.get("change").and_then(Value::as_object);

    let actions_value = obj
        .get("actions")
        .or_else(|| change_obj.and_then(|c| c.get("actions")))
        .or_else(|| obj.get("change").filter(|v| v.is_array()));
    let actions = actions_value
        .and_then(Value::as_array)
        .map(|verbs| {
            verbs
                .iter()
                .filter_map(Value::as_str)
                .map(ChangeAction::parse)
                .collect()
        })
        .unwrap_or_default();

    let severity_hint = obj
        .get("severity")
        .or_else(|| obj.get("severity_hint"))
        .and_then(Value::as_str)
        .map(SeverityHint::parse)
        .unwrap_or_default();

    let before = obj
        .get("before")
        .or_else(|| change_obj.and_then(|c| c.get("before")))
        .cloned();
    let after = obj
        .get("after")
        .or_else(|| change_obj.and_then(|c| c.get("after")))
        .cloned();

    ChangeRecord {
        address,
        resource_type,
        actions,
        severity_hint,
        before,
        after,
        drift_duration_hours: obj.get("drift_duration_hours").and_then(Value::as_f64),
        drifted: obj.get("drifted").and_then(Value::as_bool),
    }
}

fn string_field(obj: &serde_json::Map<String, Value>, keys: &[&str]) -> String {
    keys.iter()
        .find_map(|k| obj.get(*k).and_then(Value::as_str))
        .unwrap_or_default()
        .to_string()
}
