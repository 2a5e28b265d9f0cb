//! Pipeline-level error taxonomy.
//!
//! Per-view degeneracies are not represented here; they are isolated inside
//! the run and surface as rejected views in the report. This enum covers the
//! failures that abort the whole run.

use camcal_linear::{DistortionFitError, ExtrinsicsError, IntrinsicsError, NormalizeError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CalibrationError {
    /// The observation set is malformed before any numerics run.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Too few usable views survived the per-view stages.
    #[error("not enough usable views: kept {kept}, need at least {need}")]
    NotEnoughViews { kept: usize, need: usize },

    /// A view was degenerate and dropping views is disabled.
    #[error("view {index} is degenerate: {reason}")]
    DegenerateView { index: usize, reason: String },

    /// The pooled observation set could not be normalized.
    #[error("normalization failed: {0}")]
    Normalization(#[from] NormalizeError),

    /// The closed-form intrinsics solve failed.
    #[error("intrinsics solve failed: {0}")]
    Intrinsics(#[from] IntrinsicsError),

    /// Pose decomposition failed for a view and dropping is disabled.
    #[error("extrinsics decomposition failed for view {index}: {source}")]
    Extrinsics {
        index: usize,
        source: ExtrinsicsError,
    },

    /// The closed-form distortion fit failed.
    #[error("distortion fit failed: {0}")]
    Distortion(#[from] DistortionFitError),

    /// A stage produced NaN or infinite values.
    #[error("non-finite values produced by the {stage} stage")]
    NonFinite { stage: &'static str },

    /// A refinement stage failed to assemble its problem.
    #[error("{stage} refinement failed: {cause}")]
    Refinement {
        stage: &'static str,
        cause: anyhow::Error,
    },
}
