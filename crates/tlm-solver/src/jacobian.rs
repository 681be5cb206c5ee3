//! Finite difference Jacobians, for checking analytic ones.

use nalgebra::{DMatrix, DVector};

use crate::system::NewtonSystem;

fn eval<S: NewtonSystem + ?Sized>(system: &S, x: &DVector<f64>) -> DVector<f64> {
    let mut out = DVector::zeros(system.dimension());
    system.residual(x, &mut out);
    out
}

/// Forward differences: column j is `(f(x + h e_j) - f(x)) / h`.
pub fn finite_difference_jacobian<S: NewtonSystem + ?Sized>(
    system: &S,
    x: &DVector<f64>,
    epsilon: f64,
) -> DMatrix<f64> {
    let n = x.len();
    let f_x = eval(system, x);
    let mut jac = DMatrix::zeros(f_x.len(), n);

    for j in 0..n {
        let h = epsilon * x[j].abs().max(1.0);
        let mut xp = x.clone();
        xp[j] += h;
        let column = (eval(system, &xp) - &f_x) / h;
        jac.set_column(j, &column);
    }
    jac
}

/// Central differences, twice the evaluations of [`finite_difference_jacobian`].
pub fn central_difference_jacobian<S: NewtonSystem + ?Sized>(
    system: &S,
    x: &DVector<f64>,
    epsilon: f64,
) -> DMatrix<f64> {
    let n = x.len();
    let mut jac = DMatrix::zeros(system.dimension(), n);

    for j in 0..n {
        let h = epsilon * x[j].abs().max(1.0);
        let mut xp = x.clone();
        let mut xm = x.clone();
        xp[j] += h;
        xm[j] -= h;
        let column = (eval(system, &xp) - eval(system, &xm)) / (2.0 * h);
        jac.set_column(j, &column);
    }
    jac
}

/// Largest absolute entry of `analytic - central difference` at `x`.
pub fn max_jacobian_error<S: NewtonSystem + ?Sized>(
    system: &S,
    x: &DVector<f64>,
    epsilon: f64,
) -> f64 {
    let n = system.dimension();
    let mut analytic = DMatrix::zeros(n, n);
    system.jacobian(x, &mut analytic);
    let numeric = central_difference_jacobian(system, x, epsilon);
    (analytic - numeric).amax()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// f0 = x0^2 + x1 - 3, f1 = x0 * x1 - 2
    struct Pair;

    impl NewtonSystem for Pair {
        fn dimension(&self) -> usize {
            2
        }
        fn residual(&self, x: &DVector<f64>, out: &mut DVector<f64>) {
            out[0] = x[0] * x[0] + x[1] - 3.0;
            out[1] = x[0] * x[1] - 2.0;
        }
        fn jacobian(&self, x: &DVector<f64>, out: &mut DMatrix<f64>) {
            out[(0, 0)] = 2.0 * x[0];
            out[(0, 1)] = 1.0;
            out[(1, 0)] = x[1];
            out[(1, 1)] = x[0];
        }
    }

    #[test]
    fn forward_difference_close_to_analytic() {
        let x = DVector::from_vec(vec![1.5, 0.5]);
        let jac = finite_difference_jacobian(&Pair, &x, 1e-7);
        assert!((jac[(0, 0)] - 3.0).abs() < 1e-5);
        assert!((jac[(0, 1)] - 1.0).abs() < 1e-5);
        assert!((jac[(1, 0)] - 0.5).abs() < 1e-5);
        assert!((jac[(1, 1)] - 1.5).abs() < 1e-5);
    }

    #[test]
    fn analytic_jacobian_checks_out() {
        let x = DVector::from_vec(vec![-0.7, 2.3]);
        assert!(max_jacobian_error(&Pair, &x, 1e-6) < 1e-7);
    }
}
