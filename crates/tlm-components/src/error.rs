//! Error types for component configuration and initialization.

use thiserror::Error;
use tlm_filters::FilterError;
use tlm_node::NodeError;
use tlm_solver::SolverError;

use crate::parameter::ParameterKind;

/// Errors raised while binding or initializing a component.
///
/// Nothing here is raised while simulating; a running component reports
/// problems through its context and the abort flag instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ComponentError {
    #[error("Unknown port: {name}")]
    UnknownPort { name: String },

    #[error("Port {name} is not connected")]
    Unconnected { name: String },

    #[error("Port {name} is a multi-port, use its node list")]
    MultiPort { name: String },

    #[error("Duplicate {what}: {name}")]
    Duplicate { what: &'static str, name: String },

    #[error("Unknown parameter: {name}")]
    UnknownParameter { name: String },

    #[error("Parameter {name} expects {expected}, got {found}")]
    ParameterType {
        name: String,
        expected: ParameterKind,
        found: ParameterKind,
    },

    #[error("Parameter {name} refers to unknown system parameter {target}")]
    Unresolved { name: String, target: String },

    #[error("Invalid value for parameter {name}: {what}")]
    InvalidParameter { name: String, what: &'static str },

    #[error("Node error: {0}")]
    Node(#[from] NodeError),

    #[error("Filter error: {0}")]
    Filter(#[from] FilterError),

    #[error("Solver error: {0}")]
    Solver(#[from] SolverError),

    #[error("Plugin {path}: {what}")]
    Plugin { path: String, what: String },

    #[error("Subsystem: {what}")]
    Subsystem { what: String },
}

pub type ComponentResult<T> = Result<T, ComponentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ComponentError::ParameterType {
            name: "Kc".into(),
            expected: ParameterKind::Real,
            found: ParameterKind::Text,
        };
        assert_eq!(err.to_string(), "Parameter Kc expects real, got text");
    }

    #[test]
    fn node_errors_convert() {
        let err: ComponentError = NodeError::SelfConnection.into();
        assert!(matches!(err, ComponentError::Node(_)));
    }
}
