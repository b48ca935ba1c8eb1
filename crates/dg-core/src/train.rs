//! Model training stage.
//!
//! Builds the risk classifier from historical labeled drift. History that
//! is absent, malformed, lacking the label column, too small, or
//! single-class is substituted with the embedded bootstrap dataset. A
//! training-data problem never fails the pipeline; only persisting the
//! model artifact can.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use dg_common::{Error, ModelId, Result, RiskLevel};
use dg_config::Config;
use dg_model::{save_model, Forest, ForestConfig, ModelArtifact};

use crate::store_error;
use crate::table::{FeatureRow, FeatureTable};

/// Fixed synthetic history used whenever real history is unusable:
/// four examples, diverse in every feature and balanced by label.
pub fn bootstrap_dataset() -> FeatureTable {
    let example = |num: u32, critical: u8, duration: f64, label: RiskLevel| FeatureRow {
        address: String::new(),
        resource_type: String::new(),
        num_resources_changed: num,
        critical_services_affected: critical,
        drift_duration_hours: duration,
        risk_label: Some(label.as_str().to_string()),
    };
    FeatureTable::from_rows(vec![
        example(1, 0, 1.0, RiskLevel::Low),
        example(3, 1, 5.0, RiskLevel::High),
        example(10, 1, 12.0, RiskLevel::High),
        example(2, 0, 2.0, RiskLevel::Low),
    ])
}

/// Strict two-class reduction: `high` is the positive class, every other
/// label value (including absent ones) folds into the negative class.
fn binarize(row: &FeatureRow) -> u8 {
    u8::from(row.risk_label.as_deref() == Some("high"))
}

/// Load the training dataset, substituting the bootstrap dataset when
/// history is unusable. Returns the table and whether substitution
/// happened.
pub fn load_training_dataset(history_path: &Path) -> (FeatureTable, bool) {
    if !history_path.exists() {
        warn!(
            target: "train",
            path = %history_path.display(),
            "drift history not found, using bootstrap dataset"
        );
        return (bootstrap_dataset(), true);
    }

    let table = match FeatureTable::read(history_path) {
        Ok(table) => table,
        Err(e) => {
            warn!(
                target: "train",
                path = %history_path.display(),
                error = %e,
                "drift history unusable, using bootstrap dataset"
            );
            return (bootstrap_dataset(), true);
        }
    };

    if let Err(reason) = validate_dataset(&table) {
        warn!(
            target: "train",
            path = %history_path.display(),
            reason,
            "drift history rejected, using bootstrap dataset"
        );
        return (bootstrap_dataset(), true);
    }

    (table, false)
}

/// A usable dataset has at least two examples and both label classes.
fn validate_dataset(table: &FeatureTable) -> std::result::Result<(), &'static str> {
    if !table.is_labeled() {
        return Err("no risk_label column");
    }
    if table.len() < 2 {
        return Err("fewer than 2 examples");
    }
    let positives = table.rows().iter().filter(|r| binarize(r) == 1).count();
    if positives == 0 {
        return Err("no high-risk examples");
    }
    if positives == table.len() {
        return Err("no low-risk examples");
    }
    Ok(())
}

/// Fit the ensemble on a validated (or bootstrap) dataset.
pub fn train_model(table: &FeatureTable, seed: u64) -> Result<Forest> {
    let x: Vec<Vec<f64>> = table
        .rows()
        .iter()
        .map(|r| r.numeric_features().to_vec())
        .collect();
    let y: Vec<u8> = table.rows().iter().map(binarize).collect();

    Forest::fit(&x, &y, ForestConfig::with_seed(seed)).map_err(|e| Error::Training(e.to_string()))
}

/// Outcome summary for the training stage.
#[derive(Debug)]
pub struct TrainSummary {
    pub model_id: ModelId,
    pub examples: usize,
    pub used_bootstrap: bool,
    pub model_path: PathBuf,
}

/// Run the stage: load (or substitute) history, fit, persist the model.
pub fn run_train(config: &Config) -> Result<TrainSummary> {
    let (dataset, used_bootstrap) = load_training_dataset(&config.history_path);
    let forest = train_model(&dataset, config.training_seed)?;

    let artifact = ModelArtifact::new(forest);
    save_model(&config.model_path, &artifact).map_err(store_error)?;

    info!(
        target: "train",
        model_id = %artifact.model_id,
        examples = dataset.len(),
        used_bootstrap,
        seed = config.training_seed,
        path = %config.model_path.display(),
        "model trained and saved"
    );

    Ok(TrainSummary {
        model_id: artifact.model_id,
        examples: dataset.len(),
        used_bootstrap,
        model_path: config.model_path.clone(),
    })
}
