//! Driftgate common types, feature schema, and errors.
//!
//! This crate provides foundational types shared across driftgate stages:
//! - Canonical feature schema (column names and order)
//! - Risk level and change action vocabularies
//! - Model identity
//! - Common error types

pub mod error;
pub mod id;
pub mod schema;

pub use error::{Error, Result};
pub use id::ModelId;
pub use schema::{
    ChangeAction, RiskLevel, SeverityHint, FEATURE_COLUMNS, LABEL_COLUMN, NUMERIC_FEATURE_COLUMNS,
    PREDICTION_COLUMN, SCHEMA_VERSION,
};
