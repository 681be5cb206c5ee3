//! Port declarations and stable references to them.

use core::fmt;

use tlm_core::{CompId, Real};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortKind {
    /// Bidirectional TLM connection.
    Power,
    /// Reads a node without writing to it.
    Read,
    /// Sole writer of a signal node.
    Write,
    /// Power port taking any number of connections, one node each.
    PowerMulti,
    /// Read port taking any number of connections, one node each.
    ReadMulti,
}

impl PortKind {
    pub fn is_multi(self) -> bool {
        matches!(self, PortKind::PowerMulti | PortKind::ReadMulti)
    }

    pub fn is_power(self) -> bool {
        matches!(self, PortKind::Power | PortKind::PowerMulti)
    }

    pub fn is_reader(self) -> bool {
        matches!(self, PortKind::Read | PortKind::ReadMulti)
    }

    /// How a containing system's own port looks from inside that system.
    pub fn mirrored(self) -> PortKind {
        match self {
            PortKind::Read | PortKind::ReadMulti => PortKind::Write,
            PortKind::Write => PortKind::Read,
            PortKind::Power | PortKind::PowerMulti => PortKind::Power,
        }
    }

    pub fn can_connect(self, other: PortKind) -> bool {
        use PortKind::*;
        matches!(
            (self, other),
            (Power, Power)
                | (Power, PowerMulti)
                | (PowerMulti, Power)
                | (Write, Read)
                | (Write, ReadMulti)
                | (Read, Write)
                | (ReadMulti, Write)
                | (Read, Power)
                | (Power, Read)
                | (ReadMulti, Power)
                | (Power, ReadMulti)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Required,
    Optional,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortSpec {
    pub name: String,
    pub kind: PortKind,
    pub node_type: String,
    pub requirement: Requirement,
    /// Value written into the placeholder node when an optional read port stays unconnected.
    pub default_value: Option<Real>,
    pub description: String,
}

impl PortSpec {
    pub fn new(name: impl Into<String>, kind: PortKind, node_type: impl Into<String>) -> Self {
        let requirement = match kind {
            PortKind::Power | PortKind::PowerMulti => Requirement::Required,
            _ => Requirement::Optional,
        };
        Self {
            name: name.into(),
            kind,
            node_type: node_type.into(),
            requirement,
            default_value: None,
            description: String::new(),
        }
    }

    pub fn required(mut self) -> Self {
        self.requirement = Requirement::Required;
        self
    }

    pub fn optional(mut self) -> Self {
        self.requirement = Requirement::Optional;
        self
    }

    pub fn with_default(mut self, value: Real) -> Self {
        self.default_value = Some(value);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn is_required(&self) -> bool {
        self.requirement == Requirement::Required
    }

    /// The same port as seen from inside the system that owns it.
    pub fn mirrored(&self) -> PortSpec {
        PortSpec {
            kind: self.kind.mirrored(),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PortOwner {
    /// The containing system's own boundary port.
    System,
    Component(CompId),
}

/// Port `port` (declaration index) of `owner`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PortRef {
    pub owner: PortOwner,
    pub port: usize,
}

impl PortRef {
    pub fn new(owner: PortOwner, port: usize) -> Self {
        Self { owner, port }
    }

    pub fn component(comp: CompId, port: usize) -> Self {
        Self::new(PortOwner::Component(comp), port)
    }

    pub fn system(port: usize) -> Self {
        Self::new(PortOwner::System, port)
    }
}

impl fmt::Display for PortRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.owner {
            PortOwner::System => write!(f, "system:{}", self.port),
            PortOwner::Component(c) => write!(f, "{}:{}", c, self.port),
        }
    }
}
