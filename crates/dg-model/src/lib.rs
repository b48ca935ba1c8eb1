//! Driftgate risk model capability.
//!
//! This crate provides:
//! - [`RiskModel`]: the per-row prediction capability both classifier
//!   variants implement
//! - [`Forest`]: a seeded bagged decision-tree ensemble with `fit`
//! - [`HeuristicScorer`]: the deterministic fallback used when no model
//!   artifact exists
//! - [`store`]: opaque load/save of the model artifact

pub mod forest;
pub mod heuristic;
pub mod store;

pub use forest::{Forest, ForestConfig, TrainError};
pub use heuristic::HeuristicScorer;
pub use store::{load_model, save_model, ModelArtifact, StoreError};

use dg_common::RiskLevel;

/// Per-row risk prediction over the canonical numeric feature vector
/// (`num_resources_changed`, `critical_services_affected`,
/// `drift_duration_hours`, in that order).
///
/// The trained ensemble and the fallback heuristic both implement this,
/// so the classifier stage is written once against the capability and
/// does not care which variant is active.
pub trait RiskModel {
    fn predict_row(&self, features: &[f64]) -> RiskLevel;
}
