//! Connection and node-table errors.

use thiserror::Error;
use tlm_core::NodeId;

use crate::port::{PortKind, PortRef};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NodeError {
    #[error("Node type mismatch: {a} cannot connect to {b}")]
    NodeTypeMismatch { a: String, b: String },

    #[error("Port kinds {a:?} and {b:?} cannot be connected")]
    IncompatiblePorts { a: PortKind, b: PortKind },

    #[error("A port cannot be connected to itself")]
    SelfConnection,

    #[error("Port {port} is already connected")]
    AlreadyConnected { port: PortRef },

    #[error("Node {node} cannot take another {what}")]
    NodeFull { node: NodeId, what: &'static str },

    #[error("Ports {a} and {b} are not connected to each other")]
    NotConnected { a: PortRef, b: PortRef },

    #[error("Unknown node type: {name}")]
    UnknownNodeType { name: String },

    #[error("Node {node} does not exist")]
    UnknownNode { node: NodeId },

    #[error("Slot {slot} out of range for node {node} with {len} slots")]
    SlotOutOfRange { node: NodeId, slot: usize, len: usize },

    #[error("Node type {node_type} has no slot named {slot}")]
    UnknownSlot { node_type: String, slot: String },

    #[error("Topology inconsistent: {what}")]
    Inconsistent { what: String },
}

pub type NodeResult<T> = Result<T, NodeError>;
