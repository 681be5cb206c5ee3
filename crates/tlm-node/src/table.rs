//! Frozen node storage used while simulating.

use std::sync::Arc;

use tlm_core::{NodeId, Real};

use crate::error::{NodeError, NodeResult};
use crate::factory::NodeFactory;
use crate::node_type::NodeType;
use crate::topology::Topology;
use crate::validate;

/// Resolved location of one slot in a [`NodeTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotRef(u32);

impl SlotRef {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
struct NodeLayout {
    start: usize,
    node_type: Arc<NodeType>,
}

/// Contiguous slot storage for every node of one containing system.
///
/// Node ids match the [`Topology`] the table was frozen from; nodes created
/// afterwards with [`NodeTable::push_node`] are appended.
#[derive(Debug, Clone, Default)]
pub struct NodeTable {
    layouts: Vec<Option<NodeLayout>>,
    data: Vec<Real>,
}

impl NodeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn freeze(topology: &Topology, factory: &NodeFactory) -> NodeResult<Self> {
        validate::validate_bindings(topology)?;

        let mut table = Self::new();
        for entry in topology.slots() {
            match entry {
                Some(entry) => {
                    let node_type = factory.get(&entry.node_type).ok_or_else(|| {
                        NodeError::UnknownNodeType {
                            name: entry.node_type.clone(),
                        }
                    })?;
                    table.push_node(node_type);
                }
                None => table.layouts.push(None),
            }
        }
        Ok(table)
    }

    pub fn push_node(&mut self, node_type: Arc<NodeType>) -> NodeId {
        let id = NodeId::from_index(self.layouts.len());
        let start = self.data.len();
        self.data.extend(node_type.defaults());
        self.layouts.push(Some(NodeLayout { start, node_type }));
        id
    }

    fn layout(&self, node: NodeId) -> NodeResult<&NodeLayout> {
        self.layouts
            .get(node.index())
            .and_then(Option::as_ref)
            .ok_or(NodeError::UnknownNode { node })
    }

    pub fn slot(&self, node: NodeId, slot: usize) -> NodeResult<SlotRef> {
        let layout = self.layout(node)?;
        let len = layout.node_type.len();
        if slot >= len {
            return Err(NodeError::SlotOutOfRange { node, slot, len });
        }
        let index = u32::try_from(layout.start + slot).map_err(|_| NodeError::Inconsistent {
            what: "node table exceeds u32 slots".into(),
        })?;
        Ok(SlotRef(index))
    }

    pub fn slot_by_name(&self, node: NodeId, name: &str) -> NodeResult<SlotRef> {
        let layout = self.layout(node)?;
        let slot = layout
            .node_type
            .slot_index(name)
            .ok_or_else(|| NodeError::UnknownSlot {
                node_type: layout.node_type.name().to_owned(),
                slot: name.to_owned(),
            })?;
        self.slot(node, slot)
    }

    #[inline]
    pub fn get(&self, slot: SlotRef) -> Real {
        self.data[slot.index()]
    }

    #[inline]
    pub fn set(&mut self, slot: SlotRef, value: Real) {
        self.data[slot.index()] = value;
    }

    pub fn node_type(&self, node: NodeId) -> Option<&NodeType> {
        self.layout(node).ok().map(|l| l.node_type.as_ref())
    }

    pub fn node_values(&self, node: NodeId) -> &[Real] {
        match self.layout(node) {
            Ok(l) => &self.data[l.start..l.start + l.node_type.len()],
            Err(_) => &[],
        }
    }

    pub fn node_values_mut(&mut self, node: NodeId) -> &mut [Real] {
        match self.layouts.get(node.index()).and_then(Option::as_ref) {
            Some(l) => {
                let range = l.start..l.start + l.node_type.len();
                &mut self.data[range]
            }
            None => &mut [],
        }
    }

    /// Copy every slot of `src_node` in `src` onto `node`.
    pub fn copy_node_from(&mut self, node: NodeId, src: &NodeTable, src_node: NodeId) {
        let values = src.node_values(src_node);
        let dst = self.node_values_mut(node);
        let n = dst.len().min(values.len());
        dst[..n].copy_from_slice(&values[..n]);
    }

    pub fn reset_to_defaults(&mut self) {
        for layout in self.layouts.iter().flatten() {
            for (i, default) in layout.node_type.defaults().enumerate() {
                self.data[layout.start + i] = default;
            }
        }
    }

    /// Number of node ids, including removed ones.
    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &NodeType, &[Real])> {
        self.layouts.iter().enumerate().filter_map(|(i, l)| {
            l.as_ref().map(|l| {
                (
                    NodeId::from_index(i),
                    l.node_type.as_ref(),
                    &self.data[l.start..l.start + l.node_type.len()],
                )
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node_type::{hydraulic, signal};

    #[test]
    fn pushed_nodes_start_at_defaults() {
        let mut table = NodeTable::new();
        let h = table.push_node(Arc::new(hydraulic::node_type()));
        let s = table.push_node(Arc::new(signal::node_type()));

        let p = table.slot(h, hydraulic::PRESSURE).unwrap();
        assert_eq!(table.get(p), 1e5);
        assert_eq!(table.node_values(s), &[0.0]);

        table.set(p, 2e5);
        assert_eq!(table.slot_by_name(h, "Pressure").unwrap(), p);
        assert_eq!(table.get(p), 2e5);

        table.reset_to_defaults();
        assert_eq!(table.get(p), 1e5);
    }

    #[test]
    fn slot_bounds_are_checked() {
        let mut table = NodeTable::new();
        let s = table.push_node(Arc::new(signal::node_type()));
        assert!(matches!(
            table.slot(s, 1),
            Err(NodeError::SlotOutOfRange { len: 1, .. })
        ));
        assert!(matches!(
            table.slot_by_name(s, "Pressure"),
            Err(NodeError::UnknownSlot { .. })
        ));
        assert!(table.slot(NodeId::from_index(9), 0).is_err());
    }

    #[test]
    fn copy_between_tables() {
        let node_type = Arc::new(hydraulic::node_type());
        let mut outer = NodeTable::new();
        let mut inner = NodeTable::new();
        let a = outer.push_node(node_type.clone());
        let b = inner.push_node(node_type);

        let c = outer.slot(a, hydraulic::WAVE_VARIABLE).unwrap();
        outer.set(c, 3e6);
        inner.copy_node_from(b, &outer, a);
        assert_eq!(inner.node_values(b)[hydraulic::WAVE_VARIABLE], 3e6);
    }
}
