//! Per-view extrinsic pose refinement.

use anyhow::{ensure, Result};
use camcal_core::{project_point, CameraIntrinsics, CameraPose, Pt2, Pt3, Real};
use nalgebra::DVector;

use crate::params::{pack_pose, unpack_pose, POSE_DIM};
use crate::traits::{NllsProblem, NllsSolverBackend, SolveOptions, SolveReport};

/// Refines the twelve raw `[R|t]` entries of one view's pose, holding the
/// intrinsics fixed.
///
/// The rotation block is free to drift off SO(3) during iteration; the
/// joint bundle stage uses the same parameterization, so the drift is
/// absorbed rather than amplified.
#[derive(Debug, Clone)]
pub struct PoseRefineProblem {
    intrinsics: CameraIntrinsics,
    model: Vec<Pt3>,
    image: Vec<Pt2>,
}

impl PoseRefineProblem {
    pub fn new(intrinsics: CameraIntrinsics, model: Vec<Pt3>, image: Vec<Pt2>) -> Result<Self> {
        ensure!(
            model.len() == image.len(),
            "model / image point counts must match ({} vs {})",
            model.len(),
            image.len()
        );
        ensure!(!model.is_empty(), "need at least one observation");
        Ok(Self {
            intrinsics,
            model,
            image,
        })
    }
}

impl NllsProblem for PoseRefineProblem {
    fn num_params(&self) -> usize {
        POSE_DIM
    }

    fn num_residuals(&self) -> usize {
        self.model.len()
    }

    fn residuals(&self, x: &DVector<Real>) -> DVector<Real> {
        let pose = unpack_pose(x, 0);
        let mut r = DVector::zeros(self.num_residuals());

        for (i, (pw, obs)) in self.model.iter().zip(self.image.iter()).enumerate() {
            let proj = project_point(&self.intrinsics, &pose, None, pw);
            r[i] = (obs - proj).norm();
        }
        r
    }
}

/// Refine one view's pose against its observations.
pub fn refine_pose<B: NllsSolverBackend>(
    backend: &B,
    intrinsics: &CameraIntrinsics,
    model: &[Pt3],
    image: &[Pt2],
    pose0: &CameraPose,
    opts: &SolveOptions,
) -> Result<(CameraPose, SolveReport)> {
    let problem = PoseRefineProblem::new(*intrinsics, model.to_vec(), image.to_vec())?;

    let mut x0 = DVector::zeros(POSE_DIM);
    pack_pose(pose0, &mut x0, 0);

    let (x_opt, report) = backend.solve(&problem, x0, opts);
    Ok((unpack_pose(&x_opt, 0), report))
}
