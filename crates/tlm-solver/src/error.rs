//! Error types for solver operations.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("Jacobian is singular at iteration {iteration}")]
    Singular { iteration: usize },

    #[error("Dimension mismatch: {what}")]
    DimensionMismatch { what: String },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },
}

pub type SolverResult<T> = Result<T, SolverError>;
