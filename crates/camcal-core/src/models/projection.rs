//! Reprojection evaluator: project pattern points through the current camera
//! model and compare against observations.

use crate::math::{Pt2, Pt3, Real, Vec2};
use crate::models::{CameraIntrinsics, CameraPose, RadialDistortion};

/// Depth below which the perspective divide is skipped.
///
/// A vanishing third coordinate makes the projection undefined; treating it
/// as unit depth keeps optimizer residuals bounded instead of producing
/// infinities mid-iteration.
const DEPTH_EPS: Real = 1e-12;

/// Project one pattern point through intrinsics, pose and optional distortion.
pub fn project_point(
    a: &CameraIntrinsics,
    pose: &CameraPose,
    dist: Option<&RadialDistortion>,
    pw: &Pt3,
) -> Pt2 {
    let pc = pose.transform_point(pw);
    let inv_z = if pc.z.abs() > DEPTH_EPS {
        1.0 / pc.z
    } else {
        1.0
    };

    let mut n = Vec2::new(pc.x * inv_z, pc.y * inv_z);
    if let Some(d) = dist {
        n = d.distort(&n);
    }

    Pt2::new(a.fx * n.x + a.skew * n.y + a.cx, a.fy * n.y + a.cy)
}

/// Result of evaluating one view: the scalar error plus the full projected
/// point set for diagnostics.
#[derive(Debug, Clone)]
pub struct ReprojectionStats {
    /// Root-mean-square Euclidean reprojection distance (pixels).
    pub rms: Real,
    /// Projected pattern points, aligned index-for-index with the model.
    pub projected: Vec<Pt2>,
}

/// Project all pattern points of a view and compute the RMS distance to the
/// observed points.
pub fn reprojection_stats(
    a: &CameraIntrinsics,
    pose: &CameraPose,
    dist: Option<&RadialDistortion>,
    model_points: &[Pt3],
    observed: &[Pt2],
) -> ReprojectionStats {
    debug_assert_eq!(model_points.len(), observed.len());

    let mut sum_sq = 0.0;
    let mut projected = Vec::with_capacity(model_points.len());
    for (pw, obs) in model_points.iter().zip(observed.iter()) {
        let proj = project_point(a, pose, dist, pw);
        sum_sq += (obs - proj).norm_squared();
        projected.push(proj);
    }

    let n = model_points.len().max(1) as Real;
    ReprojectionStats {
        rms: (sum_sq / n).sqrt(),
        projected,
    }
}

/// RMS reprojection error of one view.
pub fn reprojection_rms(
    a: &CameraIntrinsics,
    pose: &CameraPose,
    dist: Option<&RadialDistortion>,
    model_points: &[Pt3],
    observed: &[Pt2],
) -> Real {
    reprojection_stats(a, pose, dist, model_points, observed).rms
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Mat3, Vec3};

    fn test_intrinsics() -> CameraIntrinsics {
        CameraIntrinsics {
            fx: 100.0,
            fy: 120.0,
            cx: 320.0,
            cy: 240.0,
            skew: 0.0,
        }
    }

    #[test]
    fn projects_point_at_unit_depth() {
        let a = test_intrinsics();
        let pose = CameraPose::from_rt(Mat3::identity(), Vec3::new(0.0, 0.0, 1.0));
        let p = project_point(&a, &pose, None, &Pt3::new(0.1, -0.2, 0.0));
        assert!((p.x - (320.0 + 10.0)).abs() < 1e-12);
        assert!((p.y - (240.0 - 24.0)).abs() < 1e-12);
    }

    #[test]
    fn distortion_shifts_projection_radially() {
        let a = test_intrinsics();
        let pose = CameraPose::from_rt(Mat3::identity(), Vec3::new(0.0, 0.0, 1.0));
        let d = RadialDistortion { k1: -0.1, k2: 0.0 };
        let pw = Pt3::new(0.5, 0.0, 0.0);
        let ideal = project_point(&a, &pose, None, &pw);
        let distorted = project_point(&a, &pose, Some(&d), &pw);
        assert!(distorted.x < ideal.x);
        assert!((distorted.y - ideal.y).abs() < 1e-12);
    }

    #[test]
    fn exact_model_has_zero_rms() {
        let a = test_intrinsics();
        let pose = CameraPose::from_rt(Mat3::identity(), Vec3::new(0.0, 0.0, 2.0));
        let model: Vec<Pt3> = (0..5)
            .map(|i| Pt3::new(0.1 * i as Real, 0.05 * i as Real, 0.0))
            .collect();
        let observed: Vec<Pt2> = model
            .iter()
            .map(|p| project_point(&a, &pose, None, p))
            .collect();

        let stats = reprojection_stats(&a, &pose, None, &model, &observed);
        assert!(stats.rms < 1e-12);
        assert_eq!(stats.projected.len(), model.len());
    }
}
