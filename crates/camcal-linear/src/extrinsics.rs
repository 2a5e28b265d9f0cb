//! Extrinsic pose from intrinsics and a plane homography.

use camcal_core::{CameraIntrinsics, CameraPose, Mat3, Real, Vec3};
use thiserror::Error;

/// Column norms below this make the homography scale undefined.
const MIN_COLUMN_NORM: Real = 1e-12;

#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum ExtrinsicsError {
    /// The intrinsic matrix is singular.
    #[error("intrinsic matrix is not invertible")]
    IntrinsicsNotInvertible,
    /// The homography collapses one of the rotation columns.
    #[error("degenerate homography: vanishing rotation column")]
    DegenerateHomography,
    /// SVD re-orthogonalization failed.
    #[error("svd failed during pose extraction")]
    SvdFailed,
}

/// Decompose `M = A⁻¹·H` into a `[R | t]` pose.
///
/// The first two columns of `M`, normalized, give the first two rotation
/// columns; the third is their cross product. Under noisy homographies this
/// construction leaves `R` only approximately orthonormal, so the result is
/// projected onto SO(3) via SVD before use downstream.
pub fn pose_from_homography(
    a: &CameraIntrinsics,
    h: &Mat3,
) -> Result<CameraPose, ExtrinsicsError> {
    let a_inv = a
        .k_matrix()
        .try_inverse()
        .ok_or(ExtrinsicsError::IntrinsicsNotInvertible)?;

    let m1 = a_inv * h.column(0);
    let m2 = a_inv * h.column(1);
    let m3 = a_inv * h.column(2);

    let norm1 = m1.norm();
    let norm2 = m2.norm();
    if norm1 < MIN_COLUMN_NORM || norm2 < MIN_COLUMN_NORM {
        return Err(ExtrinsicsError::DegenerateHomography);
    }

    // Averaging the two column scales spreads homography noise evenly.
    let lambda = 2.0 / (norm1 + norm2);

    let r1: Vec3 = lambda * m1;
    let r2: Vec3 = lambda * m2;
    let r3 = r1.cross(&r2);

    let mut r = Mat3::zeros();
    r.set_column(0, &r1);
    r.set_column(1, &r2);
    r.set_column(2, &r3);

    // Nearest rotation in Frobenius norm (polar decomposition via SVD).
    let svd = r.svd(true, true);
    let u = svd.u.ok_or(ExtrinsicsError::SvdFailed)?;
    let v_t = svd.v_t.ok_or(ExtrinsicsError::SvdFailed)?;

    let mut r_orth = u * v_t;
    if r_orth.determinant() < 0.0 {
        let mut u_flipped = u;
        u_flipped.column_mut(2).neg_mut();
        r_orth = u_flipped * v_t;
    }

    let t: Vec3 = lambda * m3;

    let pose = CameraPose::from_rt(r_orth, t);
    if !pose.is_finite() {
        return Err(ExtrinsicsError::SvdFailed);
    }
    Ok(pose)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Rotation3;

    fn intrinsics() -> CameraIntrinsics {
        CameraIntrinsics {
            fx: 800.0,
            fy: 780.0,
            cx: 640.0,
            cy: 360.0,
            skew: 0.0,
        }
    }

    fn homography_for(pose: &CameraPose, a: &CameraIntrinsics) -> Mat3 {
        let k = a.k_matrix();
        let r = pose.rotation();
        let mut h = Mat3::zeros();
        h.set_column(0, &(k * r.column(0)));
        h.set_column(1, &(k * r.column(1)));
        h.set_column(2, &(k * pose.translation()));
        h
    }

    #[test]
    fn recovers_pose_from_exact_homography() {
        let a = intrinsics();
        let pose_gt = CameraPose::from_rt(
            *Rotation3::from_euler_angles(0.1, -0.05, 0.2).matrix(),
            Vec3::new(0.1, -0.05, 1.0),
        );
        let h = homography_for(&pose_gt, &a);

        let pose = pose_from_homography(&a, &h).unwrap();

        assert!((pose.translation() - pose_gt.translation()).norm() < 1e-6);
        let r_diff = pose.rotation().transpose() * pose_gt.rotation();
        let angle = ((r_diff.trace() - 1.0) * 0.5).clamp(-1.0, 1.0).acos();
        assert!(angle < 1e-6, "rotation error too large: {angle}");
    }

    #[test]
    fn extracted_rotation_is_orthonormal_under_noise() {
        let a = intrinsics();
        let pose_gt = CameraPose::from_rt(
            *Rotation3::from_euler_angles(-0.2, 0.1, 0.05).matrix(),
            Vec3::new(-0.05, 0.1, 1.2),
        );
        let mut h = homography_for(&pose_gt, &a);

        // Perturb the homography so the naive column construction would
        // leave SO(3).
        h[(0, 0)] *= 1.01;
        h[(1, 1)] *= 0.99;
        h[(2, 0)] += 1e-4;

        let pose = pose_from_homography(&a, &h).unwrap();
        assert!(
            pose.orthonormality_error() < 1e-9,
            "R not re-orthogonalized: {}",
            pose.orthonormality_error()
        );
        let det = pose.rotation().determinant();
        assert!((det - 1.0).abs() < 1e-9, "det(R) = {det}");
    }

    #[test]
    fn rejects_rank_deficient_homography() {
        let a = intrinsics();
        let mut h = Mat3::zeros();
        h[(2, 2)] = 1.0;
        assert_eq!(
            pose_from_homography(&a, &h).unwrap_err(),
            ExtrinsicsError::DegenerateHomography
        );
    }
}
