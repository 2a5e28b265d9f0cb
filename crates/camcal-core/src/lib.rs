//! Core math and camera-model primitives for `camcal`.
//!
//! This crate contains:
//! - linear algebra type aliases (`Real`, `Pt2`, `Mat3`, ...),
//! - the pinhole camera model (intrinsics, 3x4 pose, two-term radial
//!   distortion) and the reprojection evaluator,
//! - observation containers for planar calibration data,
//! - synthetic planar target generation used by tests and examples.

/// Linear algebra type aliases and helpers.
pub mod math;
/// Camera model types and the reprojection evaluator.
pub mod models;
/// Synthetic planar targets and deterministic pixel noise.
pub mod synthetic;
/// Observation containers for planar calibration.
pub mod view;

pub use math::*;
pub use models::*;
pub use view::*;
