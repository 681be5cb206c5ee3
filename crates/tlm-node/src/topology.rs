//! Editable connection topology.
//!
//! Nodes live in an arena indexed by [`NodeId`]; ports reference them through
//! `bindings` and nodes list their attachments, so neither side holds a pointer
//! to the other. Ids stay stable while the topology is edited: removed nodes
//! leave an empty slot behind.

use std::collections::BTreeMap;

use tlm_core::NodeId;

use crate::error::{NodeError, NodeResult};
use crate::port::{PortKind, PortOwner, PortRef, PortSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attachment {
    pub port: PortRef,
    pub kind: PortKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeEntry {
    pub node_type: String,
    pub attachments: Vec<Attachment>,
}

impl NodeEntry {
    pub fn power_count(&self) -> usize {
        self.attachments.iter().filter(|a| a.kind.is_power()).count()
    }

    pub fn has_writer(&self) -> bool {
        self.attachments.iter().any(|a| a.kind == PortKind::Write)
    }

    pub fn kind_of(&self, port: PortRef) -> Option<PortKind> {
        self.attachments
            .iter()
            .find(|a| a.port == port)
            .map(|a| a.kind)
    }

    /// Owner of the write attachment, if any.
    pub fn writer(&self) -> Option<PortRef> {
        self.attachments
            .iter()
            .find(|a| a.kind == PortKind::Write)
            .map(|a| a.port)
    }
}

/// A port together with its declaration, as passed to [`Topology::connect`].
#[derive(Debug, Clone, Copy)]
pub struct Endpoint<'a> {
    pub port: PortRef,
    pub spec: &'a PortSpec,
}

impl<'a> Endpoint<'a> {
    pub fn new(port: PortRef, spec: &'a PortSpec) -> Self {
        Self { port, spec }
    }
}

/// Structural problem found by [`Topology::issues`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeIssue {
    /// A power node with only one power attachment.
    LonePowerPort { node: NodeId, port: PortRef },
}

#[derive(Debug, Clone, Default)]
pub struct Topology {
    nodes: Vec<Option<NodeEntry>>,
    bindings: BTreeMap<PortRef, Vec<NodeId>>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect two ports, creating a node or joining an existing one.
    pub fn connect(&mut self, a: Endpoint<'_>, b: Endpoint<'_>) -> NodeResult<NodeId> {
        if a.port == b.port {
            return Err(NodeError::SelfConnection);
        }
        if a.spec.node_type != b.spec.node_type {
            return Err(NodeError::NodeTypeMismatch {
                a: a.spec.node_type.clone(),
                b: b.spec.node_type.clone(),
            });
        }
        if !a.spec.kind.can_connect(b.spec.kind) {
            return Err(NodeError::IncompatiblePorts {
                a: a.spec.kind,
                b: b.spec.kind,
            });
        }
        if self.shared_node(a.port, b.port).is_some() {
            return Err(NodeError::AlreadyConnected { port: b.port });
        }

        let node = match (self.exclusive_node(&a), self.exclusive_node(&b)) {
            (Some(_), Some(_)) => {
                let moving = if a.spec.kind.is_reader() { a.port } else { b.port };
                return Err(NodeError::AlreadyConnected { port: moving });
            }
            (Some(node), None) => {
                self.check_can_join(node, b.spec.kind)?;
                self.attach(node, &b);
                node
            }
            (None, Some(node)) => {
                self.check_can_join(node, a.spec.kind)?;
                self.attach(node, &a);
                node
            }
            (None, None) => {
                let node = NodeId::from_index(self.nodes.len());
                self.nodes.push(Some(NodeEntry {
                    node_type: a.spec.node_type.clone(),
                    attachments: Vec::new(),
                }));
                self.attach(node, &a);
                self.attach(node, &b);
                node
            }
        };

        tracing::trace!(%node, a = %a.port, b = %b.port, "connected");
        Ok(node)
    }

    /// Remove the connection between two ports.
    ///
    /// A two-party node disappears; on a shared node only the reading side
    /// leaves, unless neither side reads, in which case the node is torn down.
    pub fn disconnect(&mut self, a: PortRef, b: PortRef) -> NodeResult<()> {
        let node = self
            .shared_node(a, b)
            .ok_or(NodeError::NotConnected { a, b })?;
        let entry = self.entry(node)?;
        if entry.attachments.len() <= 2 {
            self.remove_node(node);
            return Ok(());
        }

        let kind_a = entry.kind_of(a);
        let kind_b = entry.kind_of(b);
        match (kind_a, kind_b) {
            (_, Some(k)) if k.is_reader() => self.detach(node, b),
            (Some(k), _) if k.is_reader() => self.detach(node, a),
            _ => self.remove_node(node),
        }
        Ok(())
    }

    /// Drop every connection of `owner`, returning the nodes that were removed.
    pub fn detach_owner(&mut self, owner: PortOwner) -> Vec<NodeId> {
        let touched: Vec<NodeId> = self
            .live_nodes()
            .filter(|(_, e)| e.attachments.iter().any(|a| a.port.owner == owner))
            .map(|(id, _)| id)
            .collect();

        let mut removed = Vec::new();
        for node in touched {
            let Some(entry) = self.nodes[node.index()].as_ref() else {
                continue;
            };
            let (mine, others): (Vec<Attachment>, Vec<Attachment>) = entry
                .attachments
                .iter()
                .copied()
                .partition(|a| a.port.owner == owner);
            if mine.iter().all(|a| a.kind.is_reader()) && others.len() >= 2 {
                for attachment in mine {
                    self.detach(node, attachment.port);
                }
            } else {
                self.remove_node(node);
                removed.push(node);
            }
        }
        removed
    }

    pub fn nodes_of(&self, port: PortRef) -> &[NodeId] {
        self.bindings.get(&port).map_or(&[], Vec::as_slice)
    }

    pub fn is_connected(&self, port: PortRef) -> bool {
        !self.nodes_of(port).is_empty()
    }

    pub fn shared_node(&self, a: PortRef, b: PortRef) -> Option<NodeId> {
        let b_nodes = self.nodes_of(b);
        self.nodes_of(a).iter().copied().find(|n| b_nodes.contains(n))
    }

    pub fn node(&self, node: NodeId) -> Option<&NodeEntry> {
        self.nodes.get(node.index()).and_then(Option::as_ref)
    }

    /// Arena length, including removed slots.
    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }

    pub fn live_nodes(&self) -> impl Iterator<Item = (NodeId, &NodeEntry)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.as_ref().map(|e| (NodeId::from_index(i), e)))
    }

    pub(crate) fn slots(&self) -> &[Option<NodeEntry>] {
        &self.nodes
    }

    pub(crate) fn bindings(&self) -> &BTreeMap<PortRef, Vec<NodeId>> {
        &self.bindings
    }

    pub fn issues(&self) -> Vec<NodeIssue> {
        let mut issues = Vec::new();
        for (node, entry) in self.live_nodes() {
            if entry.power_count() == 1 {
                if let Some(a) = entry.attachments.iter().find(|a| a.kind.is_power()) {
                    issues.push(NodeIssue::LonePowerPort { node, port: a.port });
                }
            }
        }
        issues
    }

    fn entry(&self, node: NodeId) -> NodeResult<&NodeEntry> {
        self.node(node).ok_or(NodeError::UnknownNode { node })
    }

    /// Node a non-multi endpoint already owns; multi-ports never share theirs.
    fn exclusive_node(&self, endpoint: &Endpoint<'_>) -> Option<NodeId> {
        if endpoint.spec.kind.is_multi() {
            None
        } else {
            self.nodes_of(endpoint.port).first().copied()
        }
    }

    fn check_can_join(&self, node: NodeId, kind: PortKind) -> NodeResult<()> {
        let entry = self.entry(node)?;
        match kind {
            PortKind::Read | PortKind::ReadMulti => Ok(()),
            PortKind::Power | PortKind::PowerMulti if entry.power_count() < 2 => Ok(()),
            PortKind::Power | PortKind::PowerMulti => Err(NodeError::NodeFull {
                node,
                what: "power port",
            }),
            PortKind::Write if !entry.has_writer() && entry.power_count() == 0 => Ok(()),
            PortKind::Write => Err(NodeError::NodeFull {
                node,
                what: "writer",
            }),
        }
    }

    fn attach(&mut self, node: NodeId, endpoint: &Endpoint<'_>) {
        if let Some(Some(entry)) = self.nodes.get_mut(node.index()) {
            entry.attachments.push(Attachment {
                port: endpoint.port,
                kind: endpoint.spec.kind,
            });
            self.bindings.entry(endpoint.port).or_default().push(node);
        }
    }

    fn detach(&mut self, node: NodeId, port: PortRef) {
        if let Some(Some(entry)) = self.nodes.get_mut(node.index()) {
            entry.attachments.retain(|a| a.port != port);
        }
        self.unbind(port, node);
    }

    fn remove_node(&mut self, node: NodeId) {
        let Some(entry) = self.nodes.get_mut(node.index()).and_then(Option::take) else {
            return;
        };
        for attachment in entry.attachments {
            self.unbind(attachment.port, node);
        }
        tracing::trace!(%node, "node removed");
    }

    fn unbind(&mut self, port: PortRef, node: NodeId) {
        if let Some(nodes) = self.bindings.get_mut(&port) {
            nodes.retain(|n| *n != node);
            if nodes.is_empty() {
                self.bindings.remove(&port);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tlm_core::CompId;

    fn port(comp: usize, idx: usize) -> PortRef {
        PortRef::component(CompId::from_index(comp), idx)
    }

    fn power() -> PortSpec {
        PortSpec::new("P", PortKind::Power, "hydraulic")
    }

    #[test]
    fn power_pair_creates_one_node() {
        let mut topo = Topology::new();
        let (p, q) = (power(), power());
        let node = topo
            .connect(Endpoint::new(port(0, 0), &p), Endpoint::new(port(1, 0), &q))
            .unwrap();
        assert_eq!(topo.nodes_of(port(0, 0)), &[node]);
        assert_eq!(topo.node(node).unwrap().power_count(), 2);
        assert!(topo.issues().is_empty());
    }

    #[test]
    fn third_power_port_is_rejected() {
        let mut topo = Topology::new();
        let spec = power();
        topo.connect(
            Endpoint::new(port(0, 0), &spec),
            Endpoint::new(port(1, 0), &spec),
        )
        .unwrap();
        let err = topo
            .connect(
                Endpoint::new(port(2, 0), &spec),
                Endpoint::new(port(1, 0), &spec),
            )
            .unwrap_err();
        assert!(matches!(err, NodeError::NodeFull { .. }));
    }

    #[test]
    fn sensor_joins_power_node() {
        let mut topo = Topology::new();
        let p = power();
        let sensor = PortSpec::new("S", PortKind::Read, "hydraulic");
        let node = topo
            .connect(Endpoint::new(port(0, 0), &p), Endpoint::new(port(1, 0), &p))
            .unwrap();
        let joined = topo
            .connect(
                Endpoint::new(port(2, 0), &sensor),
                Endpoint::new(port(1, 0), &p),
            )
            .unwrap();
        assert_eq!(node, joined);

        topo.disconnect(port(2, 0), port(1, 0)).unwrap();
        assert!(!topo.is_connected(port(2, 0)));
        assert!(topo.is_connected(port(0, 0)));
    }

    #[test]
    fn multiport_gets_one_node_per_connection() {
        let mut topo = Topology::new();
        let multi = PortSpec::new("P", PortKind::PowerMulti, "hydraulic");
        let p = power();
        let n1 = topo
            .connect(
                Endpoint::new(port(0, 0), &multi),
                Endpoint::new(port(1, 0), &p),
            )
            .unwrap();
        let n2 = topo
            .connect(
                Endpoint::new(port(0, 0), &multi),
                Endpoint::new(port(2, 0), &p),
            )
            .unwrap();
        assert_ne!(n1, n2);
        assert_eq!(topo.nodes_of(port(0, 0)), &[n1, n2]);
    }

    #[test]
    fn type_mismatch_and_bad_pairing() {
        let mut topo = Topology::new();
        let h = power();
        let m = PortSpec::new("P", PortKind::Power, "mechanic");
        let w = PortSpec::new("out", PortKind::Write, "hydraulic");
        assert!(matches!(
            topo.connect(Endpoint::new(port(0, 0), &h), Endpoint::new(port(1, 0), &m)),
            Err(NodeError::NodeTypeMismatch { .. })
        ));
        assert!(matches!(
            topo.connect(Endpoint::new(port(0, 0), &h), Endpoint::new(port(1, 0), &w)),
            Err(NodeError::IncompatiblePorts { .. })
        ));
        assert_eq!(
            topo.connect(Endpoint::new(port(0, 0), &h), Endpoint::new(port(0, 0), &h)),
            Err(NodeError::SelfConnection)
        );
    }

    #[test]
    fn removing_writer_tears_down_signal_node() {
        let mut topo = Topology::new();
        let out = PortSpec::new("out", PortKind::Write, "signal");
        let input = PortSpec::new("in", PortKind::Read, "signal");
        let node = topo
            .connect(
                Endpoint::new(port(0, 0), &out),
                Endpoint::new(port(1, 0), &input),
            )
            .unwrap();
        topo.connect(
            Endpoint::new(port(0, 0), &out),
            Endpoint::new(port(2, 0), &input),
        )
        .unwrap();

        // a reader leaving keeps the node alive
        assert!(topo.detach_owner(PortOwner::Component(CompId::from_index(2))).is_empty());
        assert!(topo.node(node).is_some());

        let removed = topo.detach_owner(PortOwner::Component(CompId::from_index(0)));
        assert_eq!(removed, vec![node]);
        assert!(!topo.is_connected(port(1, 0)));
    }

    #[test]
    fn lone_power_port_is_reported() {
        let mut topo = Topology::new();
        let p = power();
        let sensor = PortSpec::new("S", PortKind::Read, "hydraulic");
        let node = topo
            .connect(
                Endpoint::new(port(0, 0), &p),
                Endpoint::new(port(1, 0), &sensor),
            )
            .unwrap();
        assert_eq!(
            topo.issues(),
            vec![NodeIssue::LonePowerPort {
                node,
                port: port(0, 0)
            }]
        );
    }
}
