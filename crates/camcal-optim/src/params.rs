//! Typed pack/unpack layer between structured camera parameters and the
//! flat vectors consumed by the solver.
//!
//! Every refinement stage goes through these functions, so the offset
//! arithmetic for the `[5 intrinsics | 12 per-view pose | 2 distortion]`
//! bundle layout lives in exactly one place.

use camcal_core::{CameraIntrinsics, CameraPose, Mat3, Mat34, RadialDistortion, Real};
use nalgebra::DVector;

/// Free intrinsic parameters: `fx, skew, cx, fy, cy`.
pub const INTRINSICS_DIM: usize = 5;
/// Raw `[R|t]` entries per view, row-major.
pub const POSE_DIM: usize = 12;
/// Radial coefficients.
pub const DISTORTION_DIM: usize = 2;
/// Homography entries, row-major.
pub const HOMOGRAPHY_DIM: usize = 9;

/// Offsets into the joint bundle vector for a given view count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BundleLayout {
    pub num_views: usize,
}

impl BundleLayout {
    pub fn new(num_views: usize) -> Self {
        Self { num_views }
    }

    /// Total parameter count: `5 + 12·n + 2`.
    pub fn dim(&self) -> usize {
        INTRINSICS_DIM + POSE_DIM * self.num_views + DISTORTION_DIM
    }

    pub fn pose_offset(&self, view_idx: usize) -> usize {
        debug_assert!(view_idx < self.num_views);
        INTRINSICS_DIM + POSE_DIM * view_idx
    }

    pub fn distortion_offset(&self) -> usize {
        INTRINSICS_DIM + POSE_DIM * self.num_views
    }
}

/// Write the five free intrinsics into `x` starting at `offset`.
pub fn pack_intrinsics(a: &CameraIntrinsics, x: &mut DVector<Real>, offset: usize) {
    x[offset] = a.fx;
    x[offset + 1] = a.skew;
    x[offset + 2] = a.cx;
    x[offset + 3] = a.fy;
    x[offset + 4] = a.cy;
}

/// Read intrinsics from `x` starting at `offset`.
pub fn unpack_intrinsics(x: &DVector<Real>, offset: usize) -> CameraIntrinsics {
    CameraIntrinsics {
        fx: x[offset],
        skew: x[offset + 1],
        cx: x[offset + 2],
        fy: x[offset + 3],
        cy: x[offset + 4],
    }
}

/// Write the twelve raw pose entries into `x` starting at `offset`.
pub fn pack_pose(pose: &CameraPose, x: &mut DVector<Real>, offset: usize) {
    for r in 0..3 {
        for c in 0..4 {
            x[offset + 4 * r + c] = pose.matrix[(r, c)];
        }
    }
}

/// Read a raw pose from `x` starting at `offset`.
pub fn unpack_pose(x: &DVector<Real>, offset: usize) -> CameraPose {
    let mut m = Mat34::zeros();
    for r in 0..3 {
        for c in 0..4 {
            m[(r, c)] = x[offset + 4 * r + c];
        }
    }
    CameraPose { matrix: m }
}

/// Write the radial coefficients into `x` starting at `offset`.
pub fn pack_distortion(k: &RadialDistortion, x: &mut DVector<Real>, offset: usize) {
    x[offset] = k.k1;
    x[offset + 1] = k.k2;
}

/// Read radial coefficients from `x` starting at `offset`.
pub fn unpack_distortion(x: &DVector<Real>, offset: usize) -> RadialDistortion {
    RadialDistortion {
        k1: x[offset],
        k2: x[offset + 1],
    }
}

/// Pack a homography's nine entries row-major.
pub fn pack_homography(h: &Mat3) -> DVector<Real> {
    let mut x = DVector::zeros(HOMOGRAPHY_DIM);
    for r in 0..3 {
        for c in 0..3 {
            x[3 * r + c] = h[(r, c)];
        }
    }
    x
}

/// Unpack a homography from nine row-major entries.
pub fn unpack_homography(x: &DVector<Real>) -> Mat3 {
    let mut h = Mat3::zeros();
    for r in 0..3 {
        for c in 0..3 {
            h[(r, c)] = x[3 * r + c];
        }
    }
    h
}

/// Pack the full bundle `(A, all poses, k)` into one flat vector.
pub fn pack_bundle(
    a: &CameraIntrinsics,
    poses: &[CameraPose],
    k: &RadialDistortion,
) -> DVector<Real> {
    let layout = BundleLayout::new(poses.len());
    let mut x = DVector::zeros(layout.dim());

    pack_intrinsics(a, &mut x, 0);
    for (i, pose) in poses.iter().enumerate() {
        pack_pose(pose, &mut x, layout.pose_offset(i));
    }
    pack_distortion(k, &mut x, layout.distortion_offset());
    x
}

/// Unpack the full bundle from a flat vector.
pub fn unpack_bundle(
    x: &DVector<Real>,
    num_views: usize,
) -> (CameraIntrinsics, Vec<CameraPose>, RadialDistortion) {
    let layout = BundleLayout::new(num_views);
    debug_assert_eq!(x.len(), layout.dim());

    let a = unpack_intrinsics(x, 0);
    let poses = (0..num_views)
        .map(|i| unpack_pose(x, layout.pose_offset(i)))
        .collect();
    let k = unpack_distortion(x, layout.distortion_offset());
    (a, poses, k)
}
