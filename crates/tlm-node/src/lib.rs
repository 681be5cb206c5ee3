//! tlm-node: node and connection layer for tlmsim.
//!
//! Provides:
//! - Node types (named slot layouts) and a registry for them
//! - Port declarations and stable port references
//! - An editable connection topology that enforces TLM connection rules
//! - The frozen node table that components read and write while simulating
//!
//! # Example
//!
//! ```
//! use tlm_node::{Endpoint, NodeFactory, NodeTable, PortKind, PortOwner, PortRef, PortSpec, Topology};
//! use tlm_core::CompId;
//!
//! let out = PortSpec::new("out", PortKind::Write, "signal");
//! let input = PortSpec::new("in", PortKind::Read, "signal");
//! let a = PortRef::new(PortOwner::Component(CompId::from_index(0)), 0);
//! let b = PortRef::new(PortOwner::Component(CompId::from_index(1)), 0);
//!
//! let mut topology = Topology::new();
//! let node = topology.connect(Endpoint::new(a, &out), Endpoint::new(b, &input)).unwrap();
//!
//! let table = NodeTable::freeze(&topology, &NodeFactory::with_builtins()).unwrap();
//! assert_eq!(table.node_values(node).len(), 1);
//! ```

pub mod error;
pub mod factory;
pub mod junction;
pub mod node_type;
pub mod port;
pub mod table;
pub mod topology;
pub(crate) mod validate;

pub use error::{NodeError, NodeResult};
pub use factory::{NodeFactory, RegisterStatus};
pub use junction::JunctionBalance;
pub use node_type::{
    NodeType, SlotDescriptor, SlotKind, builtin_node_types, electric, hydraulic, mechanic,
    rotational, signal,
};
pub use port::{PortKind, PortOwner, PortRef, PortSpec, Requirement};
pub use table::{NodeTable, SlotRef};
pub use topology::{Attachment, Endpoint, NodeEntry, NodeIssue, Topology};
