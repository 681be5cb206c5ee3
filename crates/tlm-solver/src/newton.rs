//! Fixed-iteration damped Newton-Raphson.

use nalgebra::{DMatrix, DVector};

use crate::error::{SolverError, SolverResult};
use crate::system::NewtonSystem;

const WEIGHTS: [f64; 4] = [1.0, 0.67, 0.5, 0.5];

/// Damping applied to the Newton step on 1-based iteration `iteration`.
pub fn iteration_weight(iteration: usize) -> f64 {
    iteration
        .checked_sub(1)
        .and_then(|i| WEIGHTS.get(i))
        .copied()
        .unwrap_or(0.5)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewtonOptions {
    pub iterations: usize,
}

impl Default for NewtonOptions {
    fn default() -> Self {
        Self { iterations: 2 }
    }
}

/// Residual norms observed by one [`EquationSystemSolver::solve`] call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewtonReport {
    pub initial_norm: f64,
    /// Norm of `f(x)` after each iteration.
    pub residual_norms: Vec<f64>,
}

impl NewtonReport {
    pub fn final_norm(&self) -> f64 {
        self.residual_norms
            .last()
            .copied()
            .unwrap_or(self.initial_norm)
    }
}

/// Solver for one `n`-dimensional system. The Jacobian, residual and step
/// buffers are owned and reused across calls; each iteration copies the
/// Jacobian once for its LU factorization.
#[derive(Debug, Clone)]
pub struct EquationSystemSolver {
    n: usize,
    options: NewtonOptions,
    jacobian: DMatrix<f64>,
    residual: DVector<f64>,
    delta: DVector<f64>,
}

impl EquationSystemSolver {
    pub fn new(n: usize, options: NewtonOptions) -> SolverResult<Self> {
        if n == 0 {
            return Err(SolverError::InvalidArg {
                what: "system dimension must be positive",
            });
        }
        Ok(Self {
            n,
            options,
            jacobian: DMatrix::zeros(n, n),
            residual: DVector::zeros(n),
            delta: DVector::zeros(n),
        })
    }

    pub fn dimension(&self) -> usize {
        self.n
    }

    pub fn options(&self) -> NewtonOptions {
        self.options
    }

    /// One damped step `x <- x - w(iteration) * J^-1 f`, `iteration` counted from 1.
    ///
    /// `delta` receives the undamped step; `jacobian` is left untouched.
    pub fn step(
        jacobian: &DMatrix<f64>,
        residual: &DVector<f64>,
        delta: &mut DVector<f64>,
        x: &mut DVector<f64>,
        iteration: usize,
    ) -> SolverResult<()> {
        delta.copy_from(residual);
        let solved = jacobian.clone().lu().solve_mut(delta);
        if !solved || delta.iter().any(|v| !v.is_finite()) {
            return Err(SolverError::Singular { iteration });
        }
        x.axpy(-iteration_weight(iteration), delta, 1.0);
        Ok(())
    }

    /// Run the configured number of iterations on `system`, starting from `x`.
    pub fn solve<S: NewtonSystem + ?Sized>(
        &mut self,
        system: &S,
        x: &mut DVector<f64>,
    ) -> SolverResult<NewtonReport> {
        if system.dimension() != self.n || x.len() != self.n {
            return Err(SolverError::DimensionMismatch {
                what: format!(
                    "solver {} / system {} / x {}",
                    self.n,
                    system.dimension(),
                    x.len()
                ),
            });
        }

        system.residual(x, &mut self.residual);
        let mut report = NewtonReport {
            initial_norm: self.residual.norm(),
            residual_norms: Vec::with_capacity(self.options.iterations),
        };

        for iteration in 1..=self.options.iterations {
            system.jacobian(x, &mut self.jacobian);
            Self::step(&self.jacobian, &self.residual, &mut self.delta, x, iteration)?;
            system.residual(x, &mut self.residual);
            report.residual_norms.push(self.residual.norm());
        }

        tracing::trace!(
            n = self.n,
            initial = report.initial_norm,
            last = report.final_norm(),
            "newton solve"
        );
        Ok(report)
    }
}
