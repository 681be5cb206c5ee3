//! Error types for filter construction and state handling.

use thiserror::Error;

pub type FilterResult<T> = Result<T, FilterError>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FilterError {
    #[error("Invalid limits: min {min} must be below max {max}")]
    InvalidLimits { min: f64, max: f64 },

    #[error("Leading denominator coefficient is zero after discretization")]
    ZeroDenominator,

    #[error("Timestep must be positive, got {value}")]
    NonPositiveTimestep { value: f64 },

    #[error("Backup length must be at least one")]
    ZeroBackupLength,

    #[error("No backup {requested} steps back (holding {available})")]
    BackupOutOfRange { requested: usize, available: usize },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },
}
