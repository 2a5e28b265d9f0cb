use serde::{Deserialize, Serialize};

use crate::math::{Mat3, Real};

/// Pinhole intrinsic parameters: the five free entries of the
/// upper-triangular matrix `A`.
///
/// ```text
/// A = | fx  skew  cx |
///     |  0   fy   cy |
///     |  0    0    1 |
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    /// Focal length along x (pixels).
    pub fx: Real,
    /// Focal length along y (pixels).
    pub fy: Real,
    /// Principal point x (pixels).
    pub cx: Real,
    /// Principal point y (pixels).
    pub cy: Real,
    /// Axis skew.
    pub skew: Real,
}

impl CameraIntrinsics {
    /// Assemble the full 3×3 intrinsic matrix.
    pub fn k_matrix(&self) -> Mat3 {
        Mat3::new(
            self.fx, self.skew, self.cx, 0.0, self.fy, self.cy, 0.0, 0.0, 1.0,
        )
    }

    /// Read the five free parameters back from an upper-triangular matrix.
    ///
    /// The lower-triangular entries and the fixed `A[2][2] = 1` are ignored;
    /// the caller is expected to pass a matrix of the intrinsic form.
    pub fn from_k_matrix(k: &Mat3) -> Self {
        Self {
            fx: k[(0, 0)],
            skew: k[(0, 1)],
            cx: k[(0, 2)],
            fy: k[(1, 1)],
            cy: k[(1, 2)],
        }
    }

    /// True if all parameters are finite.
    pub fn is_finite(&self) -> bool {
        self.fx.is_finite()
            && self.fy.is_finite()
            && self.cx.is_finite()
            && self.cy.is_finite()
            && self.skew.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn k_matrix_roundtrip() {
        let intr = CameraIntrinsics {
            fx: 800.0,
            fy: 780.0,
            cx: 640.0,
            cy: 360.0,
            skew: 0.5,
        };
        let k = intr.k_matrix();
        assert_eq!(k[(2, 2)], 1.0);
        assert_eq!(k[(1, 0)], 0.0);
        assert_eq!(CameraIntrinsics::from_k_matrix(&k), intr);
    }
}
