//! Refinement problems, one per pipeline stage.
//!
//! All problems share the residual convention of the classical method: one
//! scalar residual per observed point, the Euclidean reprojection distance.

pub mod bundle;
pub mod distortion;
pub mod extrinsics;
pub mod homography;
