//! Configuration and report types for a calibration run.

use camcal_core::{CalibrationResult, Real};
use camcal_optim::SolveOptions;
use serde::{Deserialize, Serialize};

/// Tunable knobs of the staged pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// Shared solver termination criteria for every refinement stage.
    #[serde(default)]
    pub solver: SolveOptions,
    /// Drop views that fail their per-view stages instead of aborting.
    #[serde(default = "default_drop_degenerate")]
    pub drop_degenerate_views: bool,
}

fn default_drop_degenerate() -> bool {
    true
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            solver: SolveOptions::default(),
            drop_degenerate_views: true,
        }
    }
}

/// Per-view error track through the pipeline.
///
/// `index` refers to the view's position in the input set, so diagnostics
/// stay meaningful when some views were rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewDiagnostics {
    pub index: usize,
    /// RMS right after the linear pose decomposition, no distortion.
    pub initial_rms: Real,
    /// RMS after the per-view pose refinement, no distortion.
    pub refined_rms: Real,
    /// RMS under the final jointly optimized model.
    pub final_rms: Real,
}

/// A view excluded from the solve, with the reason it was dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectedView {
    pub index: usize,
    pub reason: String,
}

/// Full outcome of a calibration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationReport {
    /// Final camera model. Poses are listed in kept-view order; match them
    /// to input views through `views[i].index`.
    pub result: CalibrationResult,
    pub views: Vec<ViewDiagnostics>,
    pub rejected_views: Vec<RejectedView>,
    /// Overall RMS reprojection error of the final model (pixels).
    pub rms: Real,
    /// Final cost reported by the joint solver.
    pub final_cost: Real,
    /// False when any refinement stage stopped on its iteration cap rather
    /// than a tolerance criterion. Parameters are still the best found.
    pub converged: bool,
}
