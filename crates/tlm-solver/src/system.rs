//! The seam between a component's equations and the solver.

use nalgebra::{DMatrix, DVector};

/// A square nonlinear system `f(x) = 0` with an analytic Jacobian.
pub trait NewtonSystem {
    fn dimension(&self) -> usize;

    /// Write `f(x)` into `out`.
    fn residual(&self, x: &DVector<f64>, out: &mut DVector<f64>);

    /// Write `df/dx` at `x` into `out`.
    fn jacobian(&self, x: &DVector<f64>, out: &mut DMatrix<f64>);
}
