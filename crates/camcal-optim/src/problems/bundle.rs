//! Joint refinement of intrinsics, all per-view poses and distortion.

use anyhow::{ensure, Result};
use camcal_core::{
    project_point, CameraIntrinsics, CameraPose, Pt2, Pt3, RadialDistortion, Real,
};
use nalgebra::DVector;

use crate::params::{pack_bundle, unpack_bundle, BundleLayout};
use crate::traits::{NllsProblem, NllsSolverBackend, SolveOptions, SolveReport};

/// The full calibration bundle: five intrinsic parameters, twelve raw pose
/// entries per view and two distortion coefficients, optimized together over
/// every observation.
///
/// Pattern points sit on the `z = 0` plane, so the third rotation column of
/// each pose never enters a residual. The corresponding Jacobian columns are
/// zero and the trust-region damping absorbs the rank deficiency.
#[derive(Debug, Clone)]
pub struct BundleProblem {
    model: Vec<Pt3>,
    views: Vec<Vec<Pt2>>,
    layout: BundleLayout,
}

impl BundleProblem {
    pub fn new(model: Vec<Pt3>, views: Vec<Vec<Pt2>>) -> Result<Self> {
        ensure!(!model.is_empty(), "pattern model is empty");
        ensure!(!views.is_empty(), "no views to optimize over");
        for (i, view) in views.iter().enumerate() {
            ensure!(
                view.len() == model.len(),
                "view {i} has {} points, pattern has {}",
                view.len(),
                model.len()
            );
        }
        let layout = BundleLayout::new(views.len());
        Ok(Self {
            model,
            views,
            layout,
        })
    }

    pub fn layout(&self) -> BundleLayout {
        self.layout
    }
}

impl NllsProblem for BundleProblem {
    fn num_params(&self) -> usize {
        self.layout.dim()
    }

    fn num_residuals(&self) -> usize {
        self.views.len() * self.model.len()
    }

    fn residuals(&self, x: &DVector<Real>) -> DVector<Real> {
        let (a, poses, k) = unpack_bundle(x, self.views.len());
        let mut r = DVector::zeros(self.num_residuals());

        let mut row = 0;
        for (pose, view) in poses.iter().zip(self.views.iter()) {
            for (pw, obs) in self.model.iter().zip(view.iter()) {
                let proj = project_point(&a, pose, Some(&k), pw);
                r[row] = (obs - proj).norm();
                row += 1;
            }
        }
        r
    }
}

/// Outcome of the joint bundle stage.
#[derive(Debug, Clone)]
pub struct BundleSolution {
    pub intrinsics: CameraIntrinsics,
    pub poses: Vec<CameraPose>,
    pub distortion: RadialDistortion,
    pub report: SolveReport,
}

/// Jointly refine intrinsics, poses and distortion from their current
/// estimates.
pub fn optimize_bundle<B: NllsSolverBackend>(
    backend: &B,
    model: &[Pt3],
    views: &[Vec<Pt2>],
    a0: &CameraIntrinsics,
    poses0: &[CameraPose],
    k0: &RadialDistortion,
    opts: &SolveOptions,
) -> Result<BundleSolution> {
    ensure!(
        poses0.len() == views.len(),
        "initial pose count {} does not match view count {}",
        poses0.len(),
        views.len()
    );
    let problem = BundleProblem::new(model.to_vec(), views.to_vec())?;

    let x0 = pack_bundle(a0, poses0, k0);
    let (x_opt, report) = backend.solve(&problem, x0, opts);
    let (intrinsics, poses, distortion) = unpack_bundle(&x_opt, views.len());

    Ok(BundleSolution {
        intrinsics,
        poses,
        distortion,
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend_lm::LmBackend;
    use camcal_core::synthetic::{grid_points, project_views, tilted_poses};
    use camcal_core::{reprojection_rms, Vec3};

    fn bundle_rms(
        a: &CameraIntrinsics,
        poses: &[CameraPose],
        k: &RadialDistortion,
        model: &[Pt3],
        views: &[Vec<Pt2>],
    ) -> Real {
        let mean_sq = poses
            .iter()
            .zip(views.iter())
            .map(|(pose, view)| {
                let rms = reprojection_rms(a, pose, Some(k), model, view);
                rms * rms
            })
            .sum::<Real>()
            / views.len() as Real;
        mean_sq.sqrt()
    }

    #[test]
    fn bundle_recovers_perturbed_camera() {
        let a_gt = CameraIntrinsics {
            fx: 820.0,
            fy: 800.0,
            cx: 640.0,
            cy: 360.0,
            skew: 0.0,
        };
        let k_gt = RadialDistortion { k1: -0.08, k2: 0.015 };
        let model = grid_points(7, 5, 0.03);
        let poses_gt = tilted_poses(4, 0.12, 0.9, 0.05, Vec3::new(0.09, 0.06, 0.0));
        let views: Vec<Vec<Pt2>> = project_views(&a_gt, Some(&k_gt), &poses_gt, &model)
            .into_iter()
            .map(|v| v.points)
            .collect();

        // Perturbed initial estimates, as the linear stages would produce.
        let a0 = CameraIntrinsics {
            fx: a_gt.fx * 1.02,
            fy: a_gt.fy * 0.98,
            cx: a_gt.cx + 3.0,
            cy: a_gt.cy - 2.0,
            skew: 0.01,
        };
        let k0 = RadialDistortion { k1: -0.05, k2: 0.0 };

        let sol = optimize_bundle(
            &LmBackend,
            &model,
            &views,
            &a0,
            &poses_gt,
            &k0,
            &SolveOptions::default(),
        )
        .unwrap();

        let rms_before = bundle_rms(&a0, &poses_gt, &k0, &model, &views);
        let rms_after = bundle_rms(
            &sol.intrinsics,
            &sol.poses,
            &sol.distortion,
            &model,
            &views,
        );
        assert!(
            rms_after < rms_before,
            "bundle must improve the fit: {rms_after} vs {rms_before}"
        );
        assert!(rms_after < 1e-3, "rms after bundle: {rms_after}");
        assert!(sol.intrinsics.is_finite());
        assert!(sol.distortion.is_finite());
    }

    #[test]
    fn rejects_pose_view_count_mismatch() {
        let model = grid_points(3, 3, 0.05);
        let a = CameraIntrinsics {
            fx: 800.0,
            fy: 800.0,
            cx: 320.0,
            cy: 240.0,
            skew: 0.0,
        };
        let poses = tilted_poses(2, 0.1, 1.0, 0.0, Vec3::new(0.05, 0.05, 0.0));
        let views: Vec<Vec<Pt2>> = project_views(&a, None, &poses[..1], &model)
            .into_iter()
            .map(|v| v.points)
            .collect();

        assert!(optimize_bundle(
            &LmBackend,
            &model,
            &views,
            &a,
            &poses,
            &RadialDistortion::zero(),
            &SolveOptions::default(),
        )
        .is_err());
    }
}
