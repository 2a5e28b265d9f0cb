use camcal_core::Real;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::jacobian::forward_difference_jacobian;

/// Generic nonlinear least-squares problem over dense parameter and
/// residual vectors.
pub trait NllsProblem {
    /// Number of parameters in the optimization vector.
    fn num_params(&self) -> usize;
    /// Number of residual rows in the problem.
    fn num_residuals(&self) -> usize;

    /// Residual vector for the given parameters.
    fn residuals(&self, x: &DVector<Real>) -> DVector<Real>;

    /// Jacobian of the residuals; forward differences unless a problem
    /// overrides with an analytic form.
    fn jacobian(&self, x: &DVector<Real>) -> DMatrix<Real> {
        forward_difference_jacobian(&|p| self.residuals(p), x, self.num_residuals())
    }
}

/// Termination criteria for the backend solver.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SolveOptions {
    /// Iteration cap; the backend may interpret this as a
    /// function-evaluation budget (MINPACK convention).
    pub max_iters: usize,
    /// Relative tolerance on cost reduction.
    pub ftol: Real,
    /// Gradient orthogonality tolerance.
    pub gtol: Real,
    /// Relative tolerance on parameter updates.
    pub xtol: Real,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            max_iters: 200,
            ftol: 1e-10,
            gtol: 1e-10,
            xtol: 1e-10,
        }
    }
}

/// Outcome of one solver run.
///
/// `converged == false` means iteration exhaustion or a numerical stop; the
/// returned parameters are still the best ones found and remain usable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SolveReport {
    /// Residual-function evaluations consumed.
    pub iterations: usize,
    /// Final cost `0.5 · ‖r‖²`.
    pub final_cost: Real,
    /// True if a tolerance criterion was met.
    pub converged: bool,
}

/// Abstraction over the nonlinear least-squares solver implementation.
pub trait NllsSolverBackend {
    fn solve<P: NllsProblem>(
        &self,
        problem: &P,
        x0: DVector<Real>,
        opts: &SolveOptions,
    ) -> (DVector<Real>, SolveReport);
}
