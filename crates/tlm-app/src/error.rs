//! Error types for the tlm-app service layer.

use std::path::PathBuf;

/// Unified error for the CLI and the remote worker.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Model error: {0}")]
    Model(String),

    #[error("Failed to read model file: {path}")]
    ModelFileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown component type: {0}")]
    UnknownType(String),

    #[error("Build error in '{context}': {what}")]
    Build { context: String, what: String },

    #[error("Simulation error: {0}")]
    Simulation(String),

    #[error("Simulation aborted: {}", .0.join(", "))]
    Aborted(Vec<String>),

    #[error("Plugin error: {0}")]
    Plugin(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl From<tlm_model::ModelError> for AppError {
    fn from(err: tlm_model::ModelError) -> Self {
        match err {
            tlm_model::ModelError::Io(source) => AppError::Io(source),
            other => AppError::Model(other.to_string()),
        }
    }
}

impl From<tlm_system::SystemError> for AppError {
    fn from(err: tlm_system::SystemError) -> Self {
        AppError::Simulation(err.to_string())
    }
}

impl From<tlm_components::ComponentError> for AppError {
    fn from(err: tlm_components::ComponentError) -> Self {
        match err {
            tlm_components::ComponentError::Plugin { .. } => AppError::Plugin(err.to_string()),
            other => AppError::Simulation(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(err.to_string())
    }
}
