//! Error types for building and running containing systems.

use thiserror::Error;
use tlm_components::ComponentError;
use tlm_node::NodeError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SystemError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Duplicate {what}: {name}")]
    Duplicate { what: &'static str, name: String },

    #[error("Invalid name: {name:?}")]
    InvalidName { name: String },

    #[error("Unknown component: {name}")]
    UnknownComponent { name: String },

    #[error("Component {component} has no port {port}")]
    UnknownPort { component: String, port: String },

    #[error("Malformed endpoint: {text:?}")]
    BadEndpoint { text: String },

    #[error("Unknown node type: {name}")]
    UnknownNodeType { name: String },

    #[error("{owner} has no parameter {name}")]
    UnknownParameter { owner: String, name: String },

    #[error("Algebraic loop between {}", components.join(", "))]
    AlgebraicLoop { components: Vec<String> },

    #[error("Subsystem {system} mixes storage and resistive components at its power ports")]
    MixedRoles { system: String },

    #[error("Model check failed for {system}")]
    ModelCheckFailed { system: String },

    #[error("Initialization of {component} failed: {source}")]
    InitializeFailed {
        component: String,
        #[source]
        source: ComponentError,
    },

    #[error("System {system} is not initialized")]
    NotInitialized { system: String },

    #[error("Node error: {0}")]
    Node(#[from] NodeError),

    #[error("Component error: {0}")]
    Component(#[from] ComponentError),
}

pub type SystemResult<T> = Result<T, SystemError>;

impl From<SystemError> for ComponentError {
    fn from(e: SystemError) -> Self {
        match e {
            SystemError::Component(inner) => inner,
            SystemError::InitializeFailed { source, .. } => source,
            other => ComponentError::Subsystem {
                what: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loop_lists_members() {
        let err = SystemError::AlgebraicLoop {
            components: vec!["gain".into(), "add".into()],
        };
        assert_eq!(err.to_string(), "Algebraic loop between gain, add");
    }

    #[test]
    fn converts_into_component_error() {
        let err: ComponentError = SystemError::NotInitialized { system: "sub".into() }.into();
        assert_eq!(
            err,
            ComponentError::Subsystem {
                what: "System sub is not initialized".into()
            }
        );
    }
}
