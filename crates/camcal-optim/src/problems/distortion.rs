//! Nonlinear refinement of the two-term radial distortion model.

use anyhow::{ensure, Result};
use camcal_core::{project_point, CameraIntrinsics, CameraPose, Pt2, Pt3, RadialDistortion, Real};
use nalgebra::DVector;

use crate::params::{pack_distortion, unpack_distortion, DISTORTION_DIM};
use crate::traits::{NllsProblem, NllsSolverBackend, SolveOptions, SolveReport};

/// Refines `(k1, k2)` against all views at once, with intrinsics and poses
/// held fixed.
///
/// The closed-form fit already solves this model exactly for noise-free
/// data; the nonlinear pass matters once the poses themselves carry noise,
/// because the residual is then no longer linear in the coefficients.
#[derive(Debug, Clone)]
pub struct DistortionRefineProblem {
    intrinsics: CameraIntrinsics,
    poses: Vec<CameraPose>,
    model: Vec<Pt3>,
    views: Vec<Vec<Pt2>>,
}

impl DistortionRefineProblem {
    pub fn new(
        intrinsics: CameraIntrinsics,
        poses: Vec<CameraPose>,
        model: Vec<Pt3>,
        views: Vec<Vec<Pt2>>,
    ) -> Result<Self> {
        ensure!(
            poses.len() == views.len(),
            "pose / view counts must match ({} vs {})",
            poses.len(),
            views.len()
        );
        ensure!(!model.is_empty(), "pattern model is empty");
        for (i, view) in views.iter().enumerate() {
            ensure!(
                view.len() == model.len(),
                "view {i} has {} points, pattern has {}",
                view.len(),
                model.len()
            );
        }
        Ok(Self {
            intrinsics,
            poses,
            model,
            views,
        })
    }
}

impl NllsProblem for DistortionRefineProblem {
    fn num_params(&self) -> usize {
        DISTORTION_DIM
    }

    fn num_residuals(&self) -> usize {
        self.views.len() * self.model.len()
    }

    fn residuals(&self, x: &DVector<Real>) -> DVector<Real> {
        let k = unpack_distortion(x, 0);
        let mut r = DVector::zeros(self.num_residuals());

        let mut row = 0;
        for (pose, view) in self.poses.iter().zip(self.views.iter()) {
            for (pw, obs) in self.model.iter().zip(view.iter()) {
                let proj = project_point(&self.intrinsics, pose, Some(&k), pw);
                r[row] = (obs - proj).norm();
                row += 1;
            }
        }
        r
    }
}

/// Refine the distortion coefficients against every view.
pub fn refine_distortion<B: NllsSolverBackend>(
    backend: &B,
    intrinsics: &CameraIntrinsics,
    poses: &[CameraPose],
    model: &[Pt3],
    views: &[Vec<Pt2>],
    k0: &RadialDistortion,
    opts: &SolveOptions,
) -> Result<(RadialDistortion, SolveReport)> {
    let problem = DistortionRefineProblem::new(
        *intrinsics,
        poses.to_vec(),
        model.to_vec(),
        views.to_vec(),
    )?;

    let mut x0 = DVector::zeros(DISTORTION_DIM);
    pack_distortion(k0, &mut x0, 0);

    let (x_opt, report) = backend.solve(&problem, x0, opts);
    Ok((unpack_distortion(&x_opt, 0), report))
}
