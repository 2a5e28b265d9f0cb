//! Levenberg-Marquardt backend.
//!
//! Wraps the `levenberg-marquardt` crate (a MINPACK `lmdif`/`lmder` port)
//! behind [`NllsSolverBackend`] so every refinement stage shares one solver
//! and one set of termination options.

use camcal_core::Real;
use levenberg_marquardt::{LeastSquaresProblem, LevenbergMarquardt};
use nalgebra::{storage::Owned, DMatrix, DVector, Dyn};

use crate::traits::{NllsProblem, NllsSolverBackend, SolveOptions, SolveReport};

struct LmAdapter<'a, P: NllsProblem> {
    problem: &'a P,
    params: DVector<Real>,
}

impl<P: NllsProblem> LeastSquaresProblem<Real, Dyn, Dyn> for LmAdapter<'_, P> {
    type ResidualStorage = Owned<Real, Dyn>;
    type JacobianStorage = Owned<Real, Dyn, Dyn>;
    type ParameterStorage = Owned<Real, Dyn>;

    fn set_params(&mut self, x: &DVector<Real>) {
        self.params.clone_from(x);
    }

    fn params(&self) -> DVector<Real> {
        self.params.clone()
    }

    fn residuals(&self) -> Option<DVector<Real>> {
        let r = self.problem.residuals(&self.params);
        // Non-finite residuals abort the solve instead of corrupting it.
        if r.iter().all(|v| v.is_finite()) {
            Some(r)
        } else {
            None
        }
    }

    fn jacobian(&self) -> Option<DMatrix<Real>> {
        Some(self.problem.jacobian(&self.params))
    }
}

/// [`NllsSolverBackend`] backed by the `levenberg-marquardt` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct LmBackend;

impl NllsSolverBackend for LmBackend {
    fn solve<P: NllsProblem>(
        &self,
        problem: &P,
        x0: DVector<Real>,
        opts: &SolveOptions,
    ) -> (DVector<Real>, SolveReport) {
        let lm = LevenbergMarquardt::new()
            .with_ftol(opts.ftol)
            .with_xtol(opts.xtol)
            .with_gtol(opts.gtol)
            .with_patience(opts.max_iters.max(1));

        let adapter = LmAdapter {
            problem,
            params: x0,
        };

        let (adapter, report) = lm.minimize(adapter);
        let x_opt = adapter.params();
        log::debug!(
            "lm solve: {} evaluations, cost {:.3e}, success: {}",
            report.number_of_evaluations,
            report.objective_function,
            report.termination.was_successful()
        );

        (
            x_opt,
            SolveReport {
                iterations: report.number_of_evaluations,
                final_cost: report.objective_function,
                converged: report.termination.was_successful(),
            },
        )
    }
}
