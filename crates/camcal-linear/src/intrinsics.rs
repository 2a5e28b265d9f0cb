//! Zhang's closed-form intrinsics from plane homographies.
//!
//! Each homography `H = A [r1 r2 t]` constrains `B = A⁻ᵀA⁻¹` through the
//! orthonormality of `r1` and `r2`: `h1ᵀ B h2 = 0` and
//! `h1ᵀ B h1 = h2ᵀ B h2`. Stacking two such rows per homography yields a
//! homogeneous system in the six independent entries of the symmetric `B`,
//! solved via null space; `A` is then recovered from `B` in closed form.

use camcal_core::{CameraIntrinsics, Mat3, Real};
use log::debug;
use nalgebra::{DMatrix, SVector};
use thiserror::Error;

use crate::normalize::Normalization;

/// Relative guard on `B11·B22 − B12²`; below this the view set does not
/// constrain the principal point.
const DEGENERACY_TOL: Real = 1e-6;

#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum IntrinsicsError {
    /// Fewer than two homographies.
    #[error("need at least 2 homographies for intrinsics estimation, got {0}")]
    NotEnoughHomographies(usize),
    /// The stacked constraint system does not pin down `B`.
    #[error("degenerate view configuration in intrinsics estimation")]
    DegenerateConfiguration,
    /// The recovered `B` is not positive definite: no real camera matrix
    /// exists for it (insufficient view diversity or corrupt homographies).
    #[error("intrinsic constraint matrix is not positive definite")]
    NotPositiveDefinite,
    /// SVD failed or produced non-finite parameters.
    #[error("svd failed during intrinsics estimation")]
    SvdFailed,
}

/// The 6-vector `v_ij(H)` of Zhang's constraint rows.
fn v_ij(h: &Mat3, i: usize, j: usize) -> SVector<Real, 6> {
    let hi = h.column(i);
    let hj = h.column(j);

    SVector::<Real, 6>::from_row_slice(&[
        hi[0] * hj[0],
        hi[0] * hj[1] + hi[1] * hj[0],
        hi[1] * hj[1],
        hi[2] * hj[0] + hi[0] * hj[2],
        hi[2] * hj[1] + hi[1] * hj[2],
        hi[2] * hj[2],
    ])
}

/// Estimate camera intrinsics from a set of plane homographies.
///
/// Two homographies are the well-posed minimum, achieved by constraining the
/// skew to zero; three or more are recommended for numerical stability.
pub fn estimate_intrinsics(homographies: &[Mat3]) -> Result<CameraIntrinsics, IntrinsicsError> {
    let m = homographies.len();
    if m < 2 {
        return Err(IntrinsicsError::NotEnoughHomographies(m));
    }

    // With only two homographies the 6-parameter B is underdetermined;
    // the extra row B12 = 0 imposes zero skew, as in Zhang's paper.
    let constraint_rows = 2 * m + usize::from(m == 2);

    // Pad to at least 6 rows so the SVD carries all right singular vectors.
    let mut vmtx = DMatrix::<Real>::zeros(constraint_rows.max(6), 6);

    for (k, h) in homographies.iter().enumerate() {
        let v11 = v_ij(h, 0, 0);
        let v22 = v_ij(h, 1, 1);
        let v12 = v_ij(h, 0, 1);

        vmtx.row_mut(2 * k).copy_from(&v12.transpose());
        vmtx.row_mut(2 * k + 1).copy_from(&(v11 - v22).transpose());
    }
    if m == 2 {
        vmtx[(4, 1)] = 1.0;
    }

    let svd = vmtx.svd(true, true);
    let v_t = svd.v_t.as_ref().ok_or(IntrinsicsError::SvdFailed)?;
    let b = v_t.row(v_t.nrows() - 1);

    let b11 = b[0];
    let b12 = b[1];
    let b22 = b[2];
    let b13 = b[3];
    let b23 = b[4];
    let b33 = b[5];

    // Closed-form recovery of A from B (Zhang, appendix B):
    //
    // v0 = (B12 B13 - B11 B23) / (B11 B22 - B12²)
    // λ  = B33 - (B13² + v0 (B12 B13 - B11 B23)) / B11
    // α  = sqrt(λ / B11)
    // β  = sqrt(λ B11 / (B11 B22 - B12²))
    // γ  = -B12 α² β / λ
    // u0 = γ v0 / β - B13 α² / λ

    let denom = b11 * b22 - b12 * b12;
    let denom_norm = b11 * b11 + b22 * b22;
    if denom_norm <= 0.0 || denom.abs() / denom_norm <= DEGENERACY_TOL {
        return Err(IntrinsicsError::DegenerateConfiguration);
    }

    let v0 = (b12 * b13 - b11 * b23) / denom;
    let lambda = b33 - (b13 * b13 + v0 * (b12 * b13 - b11 * b23)) / b11;

    // B is defined up to scale; λ and B11 sharing a sign is exactly the
    // positive-definiteness condition that makes the square roots real.
    if lambda.signum() != b11.signum() || lambda / b11 <= 0.0 || lambda / denom * b11 <= 0.0 {
        return Err(IntrinsicsError::NotPositiveDefinite);
    }

    let alpha = (lambda / b11).sqrt();
    let beta = (lambda * b11 / denom).sqrt();
    let gamma = -b12 * alpha * alpha * beta / lambda;
    let u0 = gamma * v0 / beta - b13 * alpha * alpha / lambda;

    let intrinsics = CameraIntrinsics {
        fx: alpha,
        fy: beta,
        cx: u0,
        cy: v0,
        skew: gamma,
    };

    if !intrinsics.is_finite() {
        return Err(IntrinsicsError::SvdFailed);
    }

    debug!(
        "closed-form intrinsics from {} homographies: fx={:.3} fy={:.3} cx={:.3} cy={:.3} skew={:.5}",
        m, intrinsics.fx, intrinsics.fy, intrinsics.cx, intrinsics.cy, intrinsics.skew
    );

    Ok(intrinsics)
}

/// Map intrinsics estimated in the normalized image frame back to pixel
/// coordinates: `A = N⁻¹ · A′`.
pub fn denormalize_intrinsics(a_norm: &CameraIntrinsics, norm: &Normalization) -> CameraIntrinsics {
    let a = norm.inverse * a_norm.k_matrix();
    CameraIntrinsics::from_k_matrix(&a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use camcal_core::{CameraPose, Vec3};
    use nalgebra::Rotation3;

    fn homography_for_pose(k: &Mat3, pose: &CameraPose) -> Mat3 {
        // For the Z=0 plane, H = A [r1 r2 t].
        let r = pose.rotation();
        let mut h = Mat3::zeros();
        h.set_column(0, &(k * r.column(0)));
        h.set_column(1, &(k * r.column(1)));
        h.set_column(2, &(k * pose.translation()));
        h
    }

    fn ground_truth() -> CameraIntrinsics {
        CameraIntrinsics {
            fx: 900.0,
            fy: 880.0,
            cx: 640.0,
            cy: 360.0,
            skew: 0.0,
        }
    }

    fn synthetic_homographies(n: usize) -> Vec<Mat3> {
        let k = ground_truth().k_matrix();
        let rotations = [
            (0.1, 0.0, 0.05),
            (-0.05, 0.15, -0.1),
            (0.2, -0.1, 0.0),
            (-0.15, -0.05, 0.1),
        ];
        let translations = [
            Vec3::new(0.1, -0.05, 1.0),
            Vec3::new(-0.05, 0.1, 1.2),
            Vec3::new(0.0, 0.0, 0.9),
            Vec3::new(0.05, 0.05, 1.1),
        ];

        (0..n)
            .map(|i| {
                let (rx, ry, rz) = rotations[i];
                let pose = CameraPose::from_rt(
                    *Rotation3::from_euler_angles(rx, ry, rz).matrix(),
                    translations[i],
                );
                homography_for_pose(&k, &pose)
            })
            .collect()
    }

    #[test]
    fn recovers_intrinsics_from_three_homographies() {
        let gt = ground_truth();
        let est = estimate_intrinsics(&synthetic_homographies(3)).unwrap();

        assert!((est.fx - gt.fx).abs() < 1e-3, "fx: {}", est.fx);
        assert!((est.fy - gt.fy).abs() < 1e-3, "fy: {}", est.fy);
        assert!((est.cx - gt.cx).abs() < 1e-3, "cx: {}", est.cx);
        assert!((est.cy - gt.cy).abs() < 1e-3, "cy: {}", est.cy);
        assert!(est.skew.abs() < 1e-3, "skew: {}", est.skew);
    }

    #[test]
    fn two_homographies_solve_with_zero_skew_constraint() {
        let gt = ground_truth();
        let est = estimate_intrinsics(&synthetic_homographies(2)).unwrap();

        assert!((est.fx - gt.fx).abs() < 1e-2);
        assert!((est.fy - gt.fy).abs() < 1e-2);
        assert!(est.skew.abs() < 1e-6);
    }

    #[test]
    fn rejects_single_homography() {
        let hs = synthetic_homographies(1);
        assert_eq!(
            estimate_intrinsics(&hs).unwrap_err(),
            IntrinsicsError::NotEnoughHomographies(1)
        );
    }
}
