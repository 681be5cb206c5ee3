//! Topology consistency checks run before freezing.

use std::collections::HashSet;

use crate::error::{NodeError, NodeResult};
use crate::topology::Topology;

/// Every binding points at a live node listing the port, and every attachment
/// is reachable through the bindings.
pub(crate) fn validate_bindings(topology: &Topology) -> NodeResult<()> {
    let mut seen = HashSet::new();

    for (port, nodes) in topology.bindings() {
        for &node in nodes {
            let entry = topology.node(node).ok_or_else(|| NodeError::Inconsistent {
                what: format!("port {port} bound to removed node {node}"),
            })?;
            if entry.kind_of(*port).is_none() {
                return Err(NodeError::Inconsistent {
                    what: format!("node {node} does not list port {port}"),
                });
            }
            if !seen.insert((*port, node)) {
                return Err(NodeError::Inconsistent {
                    what: format!("port {port} bound twice to node {node}"),
                });
            }
        }
        if nodes.len() > 1 {
            let kind = nodes
                .first()
                .and_then(|n| topology.node(*n))
                .and_then(|e| e.kind_of(*port));
            if !kind.is_some_and(|k| k.is_multi()) {
                return Err(NodeError::Inconsistent {
                    what: format!("single port {port} bound to {} nodes", nodes.len()),
                });
            }
        }
    }

    for (node, entry) in topology.live_nodes() {
        for attachment in &entry.attachments {
            if !seen.contains(&(attachment.port, node)) {
                return Err(NodeError::Inconsistent {
                    what: format!("attachment {} on node {node} has no binding", attachment.port),
                });
            }
        }
    }

    Ok(())
}
