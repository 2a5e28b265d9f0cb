//! Staged planar calibration: closed-form initialization followed by
//! nonlinear refinement, ending in a joint bundle over intrinsics, poses
//! and distortion.

mod error;
mod functions;
mod types;

pub use camcal_optim::SolveOptions;
pub use error::CalibrationError;
pub use functions::run_calibration;
pub use types::{CalibrationConfig, CalibrationReport, RejectedView, ViewDiagnostics};
