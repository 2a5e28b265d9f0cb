//! Synthetic planar calibration data.
//!
//! Used by tests and examples to build ground-truth scenarios: a planar
//! point grid, a family of camera poses, exact projections, and
//! deterministic pixel noise.

mod noise;
mod planar;

pub use noise::PixelNoise;
pub use planar::{grid_points, project_view, project_views, tilted_poses};
