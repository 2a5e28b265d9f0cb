//! DLT homography estimation.

use camcal_core::{mat3_is_finite, Mat3, Pt2, Real};
use nalgebra::DMatrix;
use thiserror::Error;

use crate::normalize::{normalize_points, NormalizeError};

/// Relative singular-value threshold below which the DLT system is treated
/// as rank deficient (collinear or duplicate correspondences).
const RANK_TOL: Real = 1e-12;

#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum HomographyError {
    /// Fewer than four correspondences.
    #[error("need at least 4 point correspondences, got {0}")]
    NotEnoughPoints(usize),
    /// Model and image point counts disagree.
    #[error("mismatched point counts: {0} model vs {1} image")]
    MismatchedPoints(usize, usize),
    /// Correspondences are collinear or duplicated.
    #[error("degenerate correspondences: DLT system has rank < 8")]
    RankDeficient,
    /// Point normalization failed.
    #[error("point normalization failed: {0}")]
    Normalization(#[from] NormalizeError),
    /// SVD failed or produced non-finite entries.
    #[error("svd failed during homography estimation")]
    SvdFailed,
}

/// Estimate `H` such that `image ~ H · model` using the direct linear
/// transform.
///
/// Both point sets are normalized internally for conditioning and the
/// result is denormalized via `H = N_img⁻¹ · Ĥ · N_model`, then scaled so
/// `H[2][2] = 1`.
pub fn dlt_homography(model: &[Pt2], image: &[Pt2]) -> Result<Mat3, HomographyError> {
    let n = model.len();
    if image.len() != n {
        return Err(HomographyError::MismatchedPoints(n, image.len()));
    }
    if n < 4 {
        return Err(HomographyError::NotEnoughPoints(n));
    }

    let (model_n, n_model) = normalize_points(model)?;
    let (image_n, n_image) = normalize_points(image)?;

    // Two rows per correspondence; pad to at least 9 rows so the SVD always
    // carries the full set of right singular vectors.
    let rows = (2 * n).max(9);
    let mut a = DMatrix::<Real>::zeros(rows, 9);

    for (i, (pw, pi)) in model_n.iter().zip(image_n.iter()).enumerate() {
        let x = pw.x;
        let y = pw.y;
        let u = pi.x;
        let v = pi.y;

        let r0 = 2 * i;
        let r1 = 2 * i + 1;

        a[(r0, 0)] = -x;
        a[(r0, 1)] = -y;
        a[(r0, 2)] = -1.0;
        a[(r0, 6)] = u * x;
        a[(r0, 7)] = u * y;
        a[(r0, 8)] = u;

        a[(r1, 3)] = -x;
        a[(r1, 4)] = -y;
        a[(r1, 5)] = -1.0;
        a[(r1, 6)] = v * x;
        a[(r1, 7)] = v * y;
        a[(r1, 8)] = v;
    }

    // Solve A h = 0 via SVD; the null-space estimate is the right singular
    // vector of the smallest singular value.
    let svd = a.svd(true, true);
    let v_t = svd.v_t.as_ref().ok_or(HomographyError::SvdFailed)?;
    let sv = &svd.singular_values;

    // A well-posed homography needs rank 8: σ₈ must be significantly
    // nonzero relative to σ₁ (singular values are sorted descending).
    if sv[7] < RANK_TOL * sv[0] {
        return Err(HomographyError::RankDeficient);
    }

    let h = v_t.row(v_t.nrows() - 1);
    let mut h_norm = Mat3::zeros();
    for r in 0..3 {
        for c in 0..3 {
            h_norm[(r, c)] = h[3 * r + c];
        }
    }

    let mut h_mat = n_image.inverse * h_norm * n_model.forward;

    let scale = h_mat[(2, 2)];
    if scale.abs() > Real::EPSILON {
        h_mat /= scale;
    }

    if !mat3_is_finite(&h_mat) {
        return Err(HomographyError::SvdFailed);
    }

    Ok(h_mat)
}
