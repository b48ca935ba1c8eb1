//! Risk classification stage.
//!
//! Consumes the feature table and either the trained model or the
//! fallback heuristic, produces per-row predictions and the aggregate
//! remediation decision, and records the decision basis in the
//! predictions artifact.
//!
//! Model selection is driven solely by artifact presence. An artifact
//! that exists but cannot be used routes to the fallback with a warning.
//! The stage stays fail-open on everything except a feature table that
//! cannot be mapped onto the canonical schema.

use std::path::PathBuf;

use tracing::{info, warn};

use dg_common::{Result, RiskLevel, FEATURE_COLUMNS, LABEL_COLUMN, PREDICTION_COLUMN};
use dg_config::Config;
use dg_model::{load_model, HeuristicScorer, RiskModel};

use crate::table::{write_atomic, FeatureRow, FeatureTable};

/// A feature row plus its predicted risk. Created once per inference
/// run, written to the predictions artifact, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub row: FeatureRow,
    pub predicted_risk: RiskLevel,
}

/// Which classifier variant produced a run's predictions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelChoice {
    Trained,
    Fallback,
}

/// Outcome of the classification stage.
#[derive(Debug)]
pub struct ClassifyOutcome {
    pub predictions: Vec<Prediction>,
    /// True iff any prediction is high; the value the CI gate consumes.
    pub high_risk: bool,
    pub model_choice: ModelChoice,
    pub predictions_path: PathBuf,
}

/// Classify every row of a table against the given model capability.
pub fn classify_table(table: &FeatureTable, model: &dyn RiskModel) -> (Vec<Prediction>, bool) {
    let predictions: Vec<Prediction> = table
        .rows()
        .iter()
        .map(|row| Prediction {
            predicted_risk: model.predict_row(&row.numeric_features()),
            row: row.clone(),
        })
        .collect();
    let high_risk = predictions
        .iter()
        .any(|p| p.predicted_risk == RiskLevel::High);
    (predictions, high_risk)
}

/// Serialize predictions in the artifact format: the feature columns,
/// the label column when present, then `predicted_risk`.
pub fn predictions_csv(predictions: &[Prediction]) -> String {
    let labeled = predictions.iter().any(|p| p.row.risk_label.is_some());
    let mut out = String::new();
    out.push_str(&FEATURE_COLUMNS.join(","));
    if labeled {
        out.push(',');
        out.push_str(LABEL_COLUMN);
    }
    out.push(',');
    out.push_str(PREDICTION_COLUMN);
    out.push('\n');
    for p in predictions {
        out.push_str(&format!(
            "{},{},{},{},{}",
            p.row.address,
            p.row.resource_type,
            p.row.num_resources_changed,
            p.row.critical_services_affected,
            p.row.drift_duration_hours,
        ));
        if labeled {
            out.push(',');
            out.push_str(p.row.risk_label.as_deref().unwrap_or(""));
        }
        out.push(',');
        out.push_str(p.predicted_risk.as_str());
        out.push('\n');
    }
    out
}

/// Run the stage: read features, pick the classifier variant, predict,
/// persist the predictions artifact, aggregate the decision.
///
/// An absent features artifact degrades to the baseline table (safe
/// decision) rather than erroring; a features artifact that is missing
/// canonical columns is a hard schema error for this stage.
pub fn run_classify(config: &Config) -> Result<ClassifyOutcome> {
    let table = if config.features_path.exists() {
        FeatureTable::read(&config.features_path)?
    } else {
        warn!(
            target: "classify",
            path = %config.features_path.display(),
            "drift features not found, classifying safe baseline"
        );
        FeatureTable::baseline()
    };

    let (model_choice, predictions, high_risk) = match load_model(&config.model_path) {
        Ok(Some(artifact)) => {
            info!(
                target: "classify",
                model_id = %artifact.model_id,
                trained_at = %artifact.trained_at,
                "classifying with trained model"
            );
            let (predictions, high_risk) = classify_table(&table, &artifact.forest);
            (ModelChoice::Trained, predictions, high_risk)
        }
        Ok(None) => {
            info!(
                target: "classify",
                path = %config.model_path.display(),
                "no trained model, using fallback heuristic"
            );
            let (predictions, high_risk) = classify_table(&table, &HeuristicScorer);
            (ModelChoice::Fallback, predictions, high_risk)
        }
        Err(e) => {
            warn!(
                target: "classify",
                error = %e,
                "model artifact unusable, using fallback heuristic"
            );
            let (predictions, high_risk) = classify_table(&table, &HeuristicScorer);
            (ModelChoice::Fallback, predictions, high_risk)
        }
    };

    write_atomic(&config.predictions_path, &predictions_csv(&predictions))?;

    info!(
        target: "classify",
        rows = predictions.len(),
        high_risk,
        path = %config.predictions_path.display(),
        "predictions written"
    );

    Ok(ClassifyOutcome {
        predictions,
        high_risk,
        model_choice,
        predictions_path: config.predictions_path.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::train::{bootstrap_dataset, train_model};
    use std::fs;

    fn row(num: u32, critical: u8) -> FeatureRow {
        FeatureRow {
            address: "aws_instance.web".to_string(),
            resource_type: "aws_instance".to_string(),
            num_resources_changed: num,
            critical_services_affected: critical,
            drift_duration_hours: 1.0,
            risk_label: None,
        }
    }

    #[test]
    fn fallback_scores_follow_the_fixed_rule() {
        let table = FeatureTable::from_rows(vec![row(0, 0), row(1, 0), row(1, 1), row(3, 0)]);
        let (predictions, high_risk) = classify_table(&table, &HeuristicScorer);
        let levels: Vec<RiskLevel> = predictions.iter().map(|p| p.predicted_risk).collect();
        assert_eq!(
            levels,
            vec![
                RiskLevel::Safe,
                RiskLevel::Low,
                RiskLevel::High,
                RiskLevel::High
            ]
        );
        assert!(high_risk);
    }

    #[test]
    fn baseline_table_classifies_safe_with_no_high_risk() {
        let (predictions, high_risk) = classify_table(&FeatureTable::baseline(), &HeuristicScorer);
        assert_eq!(predictions.len(), 1);
        assert_eq!(predictions[0].predicted_risk, RiskLevel::Safe);
        assert!(!high_risk);
    }

    #[test]
    fn decision_is_false_for_all_low_tables() {
        let table = FeatureTable::from_rows(vec![row(1, 0), row(1, 0)]);
        let (_, high_risk) = classify_table(&table, &HeuristicScorer);
        assert!(!high_risk);
    }

    #[test]
    fn trained_model_emits_only_low_and_high() {
        let forest = train_model(&bootstrap_dataset(), 42).unwrap();
        let table = FeatureTable::from_rows(vec![row(0, 0), row(10, 1)]);
        let (predictions, _) = classify_table(&table, &forest);
        for p in &predictions {
            assert_ne!(p.predicted_risk, RiskLevel::Safe);
        }
    }

    #[test]
    fn predictions_csv_appends_predicted_risk_column() {
        let (predictions, _) =
            classify_table(&FeatureTable::baseline(), &HeuristicScorer);
        let csv = predictions_csv(&predictions);
        let header = csv.lines().next().unwrap();
        assert_eq!(
            header,
            "address,type,num_resources_changed,critical_services_affected,drift_duration_hours,risk_label,predicted_risk"
        );
        assert!(csv.lines().nth(1).unwrap().ends_with(",safe"));
    }

    #[test]
    fn run_classify_without_features_is_safe() {
        let dir = tempfile::tempdir().unwrap();
        let config = dg_config::Config::rooted_at(dir.path());
        let outcome = run_classify(&config).unwrap();
        assert!(!outcome.high_risk);
        assert_eq!(outcome.predictions.len(), 1);
        assert_eq!(outcome.predictions[0].predicted_risk, RiskLevel::Safe);
        assert!(config.predictions_path.exists());
    }

    #[test]
    fn run_classify_uses_fallback_when_no_model() {
        let dir = tempfile::tempdir().unwrap();
        let config = dg_config::Config::rooted_at(dir.path());
        FeatureTable::from_rows(vec![row(1, 1)])
            .write(&config.features_path)
            .unwrap();
        let outcome = run_classify(&config).unwrap();
        assert_eq!(outcome.model_choice, ModelChoice::Fallback);
        assert!(outcome.high_risk);
    }

    #[test]
    fn run_classify_uses_trained_model_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let config = dg_config::Config::rooted_at(dir.path());
        FeatureTable::from_rows(vec![row(0, 0)])
            .write(&config.features_path)
            .unwrap();
        crate::train::run_train(&config).unwrap();
        let outcome = run_classify(&config).unwrap();
        assert_eq!(outcome.model_choice, ModelChoice::Trained);
        // Trained path maps the negative class to low, never safe.
        assert_eq!(outcome.predictions[0].predicted_risk, RiskLevel::Low);
    }

    #[test]
    fn corrupt_model_falls_back_with_warning() {
        let dir = tempfile::tempdir().unwrap();
        let config = dg_config::Config::rooted_at(dir.path());
        fs::create_dir_all(config.model_path.parent().unwrap()).unwrap();
        fs::write(&config.model_path, "{broken").unwrap();
        let outcome = run_classify(&config).unwrap();
        assert_eq!(outcome.model_choice, ModelChoice::Fallback);
        assert!(!outcome.high_risk);
    }

    #[test]
    fn features_missing_canonical_columns_is_hard_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = dg_config::Config::rooted_at(dir.path());
        fs::create_dir_all(config.features_path.parent().unwrap()).unwrap();
        fs::write(
            &config.features_path,
            "address,type,open_ssh,public_access,tag_changed\na,b,1,0,0\n",
        )
        .unwrap();
        let err = run_classify(&config).unwrap_err();
        assert!(matches!(err, dg_common::Error::SchemaMismatch { .. }));
    }
}
