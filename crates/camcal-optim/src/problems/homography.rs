//! Nonlinear homography refinement.

use anyhow::{ensure, Result};
use camcal_core::{Mat3, Pt2, Real, Vec3};
use nalgebra::DVector;

use crate::params::{pack_homography, unpack_homography, HOMOGRAPHY_DIM};
use crate::traits::{NllsProblem, NllsSolverBackend, SolveOptions, SolveReport};

/// Third homogeneous coordinate below this skips the perspective divide
/// (residual stays bounded instead of blowing up mid-iteration).
const W_EPS: Real = 1e-12;

/// Refines a DLT homography by minimizing per-correspondence reprojection
/// distance over all nine matrix entries.
#[derive(Debug, Clone)]
pub struct HomographyRefineProblem {
    model: Vec<Pt2>,
    image: Vec<Pt2>,
}

impl HomographyRefineProblem {
    pub fn new(model: Vec<Pt2>, image: Vec<Pt2>) -> Result<Self> {
        ensure!(
            model.len() == image.len(),
            "model / image point counts must match ({} vs {})",
            model.len(),
            image.len()
        );
        ensure!(model.len() >= 4, "need at least 4 correspondences");
        Ok(Self { model, image })
    }
}

impl NllsProblem for HomographyRefineProblem {
    fn num_params(&self) -> usize {
        HOMOGRAPHY_DIM
    }

    fn num_residuals(&self) -> usize {
        self.model.len()
    }

    fn residuals(&self, x: &DVector<Real>) -> DVector<Real> {
        let h = unpack_homography(x);
        let mut r = DVector::zeros(self.num_residuals());

        for (i, (pw, pi)) in self.model.iter().zip(self.image.iter()).enumerate() {
            let q = h * Vec3::new(pw.x, pw.y, 1.0);
            let inv_w = if q.z.abs() > W_EPS { 1.0 / q.z } else { 1.0 };
            let dx = pi.x - q.x * inv_w;
            let dy = pi.y - q.y * inv_w;
            r[i] = (dx * dx + dy * dy).sqrt();
        }
        r
    }
}

/// Refine `h0` against the correspondences; the result is rescaled so
/// `H[2][2] = 1`.
pub fn refine_homography<B: NllsSolverBackend>(
    backend: &B,
    model: &[Pt2],
    image: &[Pt2],
    h0: &Mat3,
    opts: &SolveOptions,
) -> Result<(Mat3, SolveReport)> {
    let problem = HomographyRefineProblem::new(model.to_vec(), image.to_vec())?;
    let (x_opt, report) = backend.solve(&problem, pack_homography(h0), opts);

    let mut h = unpack_homography(&x_opt);
    let scale = h[(2, 2)];
    if scale.abs() > Real::EPSILON {
        h /= scale;
    }
    Ok((h, report))
}
