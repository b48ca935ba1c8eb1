//! Driftgate core pipeline.
//!
//! Three independently invokable stages over shared on-disk artifacts:
//! - [`extract`]: change records → canonical feature table
//! - [`train`]: labeled drift history → persisted risk model
//! - [`classify`]: feature table + model (or fallback heuristic) →
//!   predictions and the remediation decision
//!
//! The pipeline is deliberately fail-open on data problems: absent,
//! malformed, or empty inputs degrade to safe defaults and never abort
//! the calling CI process.

pub mod classify;
pub mod exit_codes;
pub mod extract;
pub mod record;
pub mod table;
pub mod train;

pub use exit_codes::ExitCode;

use dg_common::Error;
use dg_model::StoreError;

/// Map a model-store failure onto the unified error type.
pub(crate) fn store_error(err: StoreError) -> Error {
    match err {
        StoreError::Io { source, .. } => Error::Io(source),
        other => Error::ModelArtifact(other.to_string()),
    }
}
