//! Camera model types.
//!
//! The calibrated camera is `pixel = A ∘ distort ∘ dehomogenize ∘ [R|t]`,
//! where `A` is the upper-triangular intrinsic matrix, `[R|t]` the per-view
//! pose, and `distort` the two-term radial distortion acting on normalized
//! camera coordinates.

mod distortion;
mod intrinsics;
mod pose;
mod projection;
mod result;

pub use distortion::RadialDistortion;
pub use intrinsics::CameraIntrinsics;
pub use pose::CameraPose;
pub use projection::{project_point, reprojection_rms, reprojection_stats, ReprojectionStats};
pub use result::CalibrationResult;
