use nalgebra::Rotation3;

use crate::math::{Pt3, Real, Vec3};
use crate::models::{project_point, CameraIntrinsics, CameraPose, RadialDistortion};
use crate::view::PlanarView;

/// Generate an `nx × ny` planar grid of pattern points on the `z = 0` plane.
///
/// Points are ordered row-major (y major), matching the order a chessboard
/// detector would emit.
pub fn grid_points(nx: usize, ny: usize, spacing: Real) -> Vec<Pt3> {
    let mut points = Vec::with_capacity(nx * ny);
    for j in 0..ny {
        for i in 0..nx {
            points.push(Pt3::new(i as Real * spacing, j as Real * spacing, 0.0));
        }
    }
    points
}

/// Generate `n` poses with varying tilt so the pattern plane is seen under
/// distinct orientations (required for a well-posed intrinsics solve).
///
/// View `i` rotates by `i * tilt_step` around alternating axes and moves the
/// pattern to depth `z0 + i * dz`, keeping it roughly centered via `center`.
pub fn tilted_poses(n: usize, tilt_step: Real, z0: Real, dz: Real, center: Vec3) -> Vec<CameraPose> {
    let mut poses = Vec::with_capacity(n);
    for i in 0..n {
        let a = tilt_step * (i as Real + 1.0);
        let (rx, ry, rz) = match i % 3 {
            0 => (a, -0.5 * a, 0.1 * a),
            1 => (-0.5 * a, a, -0.1 * a),
            _ => (0.3 * a, 0.3 * a, a),
        };
        let rot = *Rotation3::from_euler_angles(rx, ry, rz).matrix();
        let t = Vec3::new(-center.x, -center.y, z0 + dz * i as Real);
        poses.push(CameraPose::from_rt(rot, t));
    }
    poses
}

/// Project the pattern through a ground-truth camera into one view.
pub fn project_view(
    a: &CameraIntrinsics,
    dist: Option<&RadialDistortion>,
    pose: &CameraPose,
    model_points: &[Pt3],
) -> PlanarView {
    let points = model_points
        .iter()
        .map(|pw| project_point(a, pose, dist, pw))
        .collect();
    PlanarView::new(points)
}

/// Project the pattern into every pose.
pub fn project_views(
    a: &CameraIntrinsics,
    dist: Option<&RadialDistortion>,
    poses: &[CameraPose],
    model_points: &[Pt3],
) -> Vec<PlanarView> {
    poses
        .iter()
        .map(|pose| project_view(a, dist, pose, model_points))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_has_expected_layout() {
        let pts = grid_points(3, 2, 0.5);
        assert_eq!(pts.len(), 6);
        assert_eq!(pts[0], Pt3::new(0.0, 0.0, 0.0));
        assert_eq!(pts[1], Pt3::new(0.5, 0.0, 0.0));
        assert_eq!(pts[3], Pt3::new(0.0, 0.5, 0.0));
        assert!(pts.iter().all(|p| p.z == 0.0));
    }

    #[test]
    fn projected_views_are_finite() {
        let a = CameraIntrinsics {
            fx: 800.0,
            fy: 780.0,
            cx: 320.0,
            cy: 240.0,
            skew: 0.0,
        };
        let model = grid_points(6, 4, 0.03);
        let poses = tilted_poses(3, 0.12, 0.8, 0.1, Vec3::new(0.08, 0.05, 0.0));
        let views = project_views(&a, None, &poses, &model);

        assert_eq!(views.len(), 3);
        for view in &views {
            assert_eq!(view.len(), model.len());
            assert!(view.points.iter().all(|p| p.x.is_finite() && p.y.is_finite()));
        }
    }
}
