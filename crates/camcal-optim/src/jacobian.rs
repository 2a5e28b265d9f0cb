//! Numerical Jacobian assembly.

use camcal_core::Real;
use nalgebra::{DMatrix, DVector};

/// Base perturbation for forward differences; scaled by parameter magnitude
/// so pixel-sized and coefficient-sized parameters get comparable relative
/// steps.
const BASE_STEP: Real = 1e-6;

/// Forward-difference Jacobian of a residual function at `x`.
pub fn forward_difference_jacobian<F>(f: &F, x: &DVector<Real>, num_residuals: usize) -> DMatrix<Real>
where
    F: Fn(&DVector<Real>) -> DVector<Real>,
{
    let n = x.len();
    let mut j = DMatrix::zeros(num_residuals, n);

    let base = f(x);
    debug_assert_eq!(base.len(), num_residuals);

    let mut x_pert = x.clone();
    for k in 0..n {
        let step = BASE_STEP * x[k].abs().max(1.0);
        x_pert[k] = x[k] + step;
        let r_plus = f(&x_pert);
        x_pert[k] = x[k];

        let col = (r_plus - &base) / step;
        j.set_column(k, &col);
    }

    j
}
