//! Closed-form estimation stages for planar camera calibration.
//!
//! Each module implements one linear stage of the classical two-stage
//! method: point normalization, DLT homography estimation, Zhang's
//! closed-form intrinsics, homography decomposition into extrinsic poses,
//! and the linear radial-distortion fit. Nonlinear refinement lives in
//! `camcal-optim`.

pub mod distortion;
pub mod extrinsics;
pub mod homography;
pub mod intrinsics;
pub mod normalize;

pub use distortion::{estimate_radial_distortion, DistortionFitError, DistortionFitView};
pub use extrinsics::{pose_from_homography, ExtrinsicsError};
pub use homography::{dlt_homography, HomographyError};
pub use intrinsics::{denormalize_intrinsics, estimate_intrinsics, IntrinsicsError};
pub use normalize::{normalization_from_points, normalize_points, Normalization, NormalizeError};
