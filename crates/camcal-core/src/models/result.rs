use serde::{Deserialize, Serialize};

use crate::models::{CameraIntrinsics, CameraPose, RadialDistortion};

/// Final calibrated camera model: shared intrinsics and distortion plus one
/// pose per accepted view.
///
/// Produced only after joint optimization; intermediate stage outputs are
/// never exposed through this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationResult {
    /// Intrinsic matrix parameters, shared across views.
    pub intrinsics: CameraIntrinsics,
    /// Radial distortion coefficients, shared across views.
    pub distortion: RadialDistortion,
    /// Per-view extrinsic poses, in accepted-view order.
    pub poses: Vec<CameraPose>,
}

impl CalibrationResult {
    /// True if every parameter in the snapshot is finite.
    pub fn is_finite(&self) -> bool {
        self.intrinsics.is_finite()
            && self.distortion.is_finite()
            && self.poses.iter().all(|p| p.is_finite())
    }
}
