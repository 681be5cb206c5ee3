//! tlm-solver: dense Newton-Raphson for the small implicit systems inside
//! resistive components.
//!
//! Each call runs a fixed number of damped iterations; there is no
//! convergence loop because the TLM delay keeps successive steps close.

pub mod error;
pub mod jacobian;
pub mod newton;
pub mod system;

pub use error::{SolverError, SolverResult};
pub use jacobian::{central_difference_jacobian, finite_difference_jacobian, max_jacobian_error};
pub use newton::{EquationSystemSolver, NewtonOptions, NewtonReport, iteration_weight};
pub use system::NewtonSystem;
