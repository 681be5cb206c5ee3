//! Flow/effort balance across the sub-nodes of a multi-port.

use tlm_core::{NodeId, Real, Tolerances, nearly_equal};

use crate::node_type::SlotKind;
use crate::table::NodeTable;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JunctionBalance {
    pub flow_sum: Real,
    pub effort_min: Real,
    pub effort_max: Real,
    pub branches: usize,
}

impl JunctionBalance {
    /// Returns `None` when `nodes` is empty or the node type has no effort/flow pair.
    pub fn measure(table: &NodeTable, nodes: &[NodeId]) -> Option<Self> {
        let first = *nodes.first()?;
        let node_type = table.node_type(first)?;
        let flow = node_type.first_of(SlotKind::Flow)?;
        let effort = node_type.first_of(SlotKind::Effort)?;

        let mut balance = JunctionBalance {
            flow_sum: 0.0,
            effort_min: Real::INFINITY,
            effort_max: Real::NEG_INFINITY,
            branches: 0,
        };
        for &node in nodes {
            let values = table.node_values(node);
            let (Some(q), Some(p)) = (values.get(flow), values.get(effort)) else {
                continue;
            };
            balance.flow_sum += q;
            balance.effort_min = balance.effort_min.min(*p);
            balance.effort_max = balance.effort_max.max(*p);
            balance.branches += 1;
        }
        (balance.branches > 0).then_some(balance)
    }

    pub fn effort_spread(&self) -> Real {
        self.effort_max - self.effort_min
    }

    pub fn is_compatible(&self, tol: Tolerances) -> bool {
        nearly_equal(self.effort_min, self.effort_max, tol)
    }
}
