use nalgebra::Vector4;
use serde::{Deserialize, Serialize};

use crate::math::{Mat3, Mat34, Pt3, Real, Vec3};

/// Per-view extrinsic pose `[R | t]` mapping pattern coordinates into the
/// camera frame.
///
/// The pose is stored as a raw 3×4 matrix because the refinement stages
/// optimize all twelve entries. Only poses produced by the closed-form
/// decomposition are guaranteed to carry an exact rotation; refined poses may
/// drift off SO(3) and [`CameraPose::orthonormality_error`] measures by how
/// much.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraPose {
    /// The `[R | t]` matrix.
    pub matrix: Mat34,
}

impl CameraPose {
    /// Build from a rotation matrix and a translation vector.
    pub fn from_rt(r: Mat3, t: Vec3) -> Self {
        let mut m = Mat34::zeros();
        m.fixed_view_mut::<3, 3>(0, 0).copy_from(&r);
        m.set_column(3, &t);
        Self { matrix: m }
    }

    /// Rotation block (first three columns).
    pub fn rotation(&self) -> Mat3 {
        self.matrix.fixed_view::<3, 3>(0, 0).into_owned()
    }

    /// Translation (fourth column).
    pub fn translation(&self) -> Vec3 {
        self.matrix.column(3).into_owned()
    }

    /// Map a pattern point into camera coordinates: `[R|t] · (x, y, z, 1)`.
    pub fn transform_point(&self, p: &Pt3) -> Vec3 {
        self.matrix * Vector4::new(p.x, p.y, p.z, 1.0)
    }

    /// Frobenius norm of `RᵀR − I` plus `|det(R) − 1|`.
    pub fn orthonormality_error(&self) -> Real {
        let r = self.rotation();
        let gram = r.transpose() * r;
        (gram - Mat3::identity()).norm() + (r.determinant() - 1.0).abs()
    }

    /// True if every entry is finite.
    pub fn is_finite(&self) -> bool {
        self.matrix.iter().all(|v| v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Rotation3;

    #[test]
    fn rt_accessors_match_construction() {
        let r = *Rotation3::from_euler_angles(0.1, -0.2, 0.3).matrix();
        let t = Vec3::new(0.5, -0.1, 2.0);
        let pose = CameraPose::from_rt(r, t);

        assert!((pose.rotation() - r).norm() < 1e-15);
        assert!((pose.translation() - t).norm() < 1e-15);
        assert!(pose.orthonormality_error() < 1e-12);
    }

    #[test]
    fn transform_point_applies_rotation_and_translation() {
        let pose = CameraPose::from_rt(Mat3::identity(), Vec3::new(1.0, 2.0, 3.0));
        let p = pose.transform_point(&Pt3::new(0.5, 0.0, 0.0));
        assert!((p - Vec3::new(1.5, 2.0, 3.0)).norm() < 1e-15);
    }
}
