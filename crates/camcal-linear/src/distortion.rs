//! Closed-form radial distortion from reprojection residuals.
//!
//! With intrinsics and poses fixed, the two-term radial model is linear in
//! `(k1, k2)` when the ideal (undistorted) projections are known:
//!
//! ```text
//! û − u = (u − cx) (k1 r² + k2 r⁴)
//! v̂ − v = (v − cy) (k1 r² + k2 r⁴)
//! ```
//!
//! where `(u, v)` is the ideal pixel, `(û, v̂)` the observation, and `r` the
//! radius of the ideal point in normalized camera coordinates. Stacking two
//! rows per observation across all views gives an overdetermined system
//! solved by linear least squares.

use camcal_core::{CameraIntrinsics, Pt2, RadialDistortion, Real, Vec3};
use nalgebra::{DMatrix, DVector};
use thiserror::Error;

/// Minimum observation count for the two-parameter fit.
const MIN_POINTS: usize = 3;

/// Largest normalized radius must exceed this, otherwise the coefficients
/// are unobservable (all points near the principal axis).
const MIN_RADIAL_SPREAD: Real = 1e-6;

#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum DistortionFitError {
    /// Too few observations.
    #[error("need at least {0} observations for distortion estimation, got {1}")]
    NotEnoughPoints(usize, usize),
    /// Observed and projected point counts disagree.
    #[error("observed and projected point counts differ: {0} vs {1}")]
    MismatchedPoints(usize, usize),
    /// The intrinsic matrix is singular.
    #[error("intrinsic matrix is not invertible")]
    IntrinsicsNotInvertible,
    /// No radial diversity in the projections.
    #[error("degenerate configuration: all points near the principal axis")]
    DegenerateRadius,
    /// Least-squares solve failed.
    #[error("least-squares solve failed during distortion estimation")]
    SolveFailed,
}

/// One view's contribution to the distortion fit.
#[derive(Debug, Clone, Copy)]
pub struct DistortionFitView<'a> {
    /// Observed (distorted) pixel coordinates.
    pub observed: &'a [Pt2],
    /// Ideal pixel coordinates projected without distortion.
    pub projected: &'a [Pt2],
}

/// Estimate `(k1, k2)` from the discrepancy between undistorted projections
/// and observations across all views.
pub fn estimate_radial_distortion(
    a: &CameraIntrinsics,
    views: &[DistortionFitView<'_>],
) -> Result<RadialDistortion, DistortionFitError> {
    for view in views {
        if view.observed.len() != view.projected.len() {
            return Err(DistortionFitError::MismatchedPoints(
                view.observed.len(),
                view.projected.len(),
            ));
        }
    }

    let total: usize = views.iter().map(|v| v.observed.len()).sum();
    if total < MIN_POINTS {
        return Err(DistortionFitError::NotEnoughPoints(MIN_POINTS, total));
    }

    let a_inv = a
        .k_matrix()
        .try_inverse()
        .ok_or(DistortionFitError::IntrinsicsNotInvertible)?;

    let mut d = DMatrix::<Real>::zeros(2 * total, 2);
    let mut rhs = DVector::<Real>::zeros(2 * total);

    let mut max_r2: Real = 0.0;
    let mut row = 0;
    for view in views {
        for (obs, proj) in view.observed.iter().zip(view.projected.iter()) {
            // Normalized camera coordinates of the ideal projection.
            let n = a_inv * Vec3::new(proj.x, proj.y, 1.0);
            let nx = n.x / n.z;
            let ny = n.y / n.z;
            let r2 = nx * nx + ny * ny;
            let r4 = r2 * r2;
            max_r2 = max_r2.max(r2);

            let du = proj.x - a.cx;
            let dv = proj.y - a.cy;

            d[(row, 0)] = du * r2;
            d[(row, 1)] = du * r4;
            d[(row + 1, 0)] = dv * r2;
            d[(row + 1, 1)] = dv * r4;

            rhs[row] = obs.x - proj.x;
            rhs[row + 1] = obs.y - proj.y;

            row += 2;
        }
    }

    if max_r2 < MIN_RADIAL_SPREAD {
        return Err(DistortionFitError::DegenerateRadius);
    }

    let svd = d.svd(true, true);
    let k = svd
        .solve(&rhs, 1e-10)
        .map_err(|_| DistortionFitError::SolveFailed)?;

    let dist = RadialDistortion { k1: k[0], k2: k[1] };
    if !dist.is_finite() {
        return Err(DistortionFitError::SolveFailed);
    }
    Ok(dist)
}

#[cfg(test)]
mod tests {
    use super::*;
    use camcal_core::synthetic::{grid_points, project_view, tilted_poses};

    fn intrinsics() -> CameraIntrinsics {
        CameraIntrinsics {
            fx: 800.0,
            fy: 800.0,
            cx: 640.0,
            cy: 360.0,
            skew: 0.0,
        }
    }

    fn fit_from_synthetic(dist_gt: RadialDistortion) -> RadialDistortion {
        let a = intrinsics();
        let model = grid_points(7, 7, 0.03);
        let poses = tilted_poses(3, 0.12, 0.9, 0.15, Vec3::new(0.09, 0.09, 0.0));

        let ideal: Vec<_> = poses
            .iter()
            .map(|p| project_view(&a, None, p, &model))
            .collect();
        let observed: Vec<_> = poses
            .iter()
            .map(|p| project_view(&a, Some(&dist_gt), p, &model))
            .collect();

        let views: Vec<DistortionFitView<'_>> = ideal
            .iter()
            .zip(observed.iter())
            .map(|(i, o)| DistortionFitView {
                observed: &o.points,
                projected: &i.points,
            })
            .collect();

        estimate_radial_distortion(&a, &views).unwrap()
    }

    #[test]
    fn recovers_radial_coefficients_exactly_from_ideal_projections() {
        let gt = RadialDistortion { k1: -0.2, k2: 0.05 };
        let est = fit_from_synthetic(gt);
        // The model is exactly linear in (k1, k2) when the ideal points are
        // exact, so recovery is tight.
        assert!((est.k1 - gt.k1).abs() < 1e-9, "k1: {}", est.k1);
        assert!((est.k2 - gt.k2).abs() < 1e-9, "k2: {}", est.k2);
    }

    #[test]
    fn zero_distortion_yields_zero_coefficients() {
        let est = fit_from_synthetic(RadialDistortion::zero());
        assert!(est.k1.abs() < 1e-10);
        assert!(est.k2.abs() < 1e-10);
    }

    #[test]
    fn rejects_mismatched_views() {
        let a = intrinsics();
        let obs = vec![Pt2::new(0.0, 0.0); 4];
        let proj = vec![Pt2::new(0.0, 0.0); 3];
        let views = [DistortionFitView {
            observed: &obs,
            projected: &proj,
        }];
        assert_eq!(
            estimate_radial_distortion(&a, &views).unwrap_err(),
            DistortionFitError::MismatchedPoints(4, 3)
        );
    }
}
