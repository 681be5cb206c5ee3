//! Evaluation order of the children of one system.

use std::collections::BTreeMap;

use tlm_core::CompId;
use tlm_node::{PortOwner, Topology};

/// `(writer, reader)` pairs for every signal node shared by two children.
///
/// Power nodes contribute nothing: their read side runs in the signal pass
/// after both power components anyway. Boundary ports are not children.
pub(crate) fn signal_edges(topology: &Topology) -> Vec<(CompId, CompId)> {
    let mut edges = Vec::new();
    for (_, entry) in topology.live_nodes() {
        let Some(writer) = entry.writer() else {
            continue;
        };
        let PortOwner::Component(from) = writer.owner else {
            continue;
        };
        for attachment in &entry.attachments {
            if !attachment.kind.is_reader() {
                continue;
            }
            if let PortOwner::Component(to) = attachment.port.owner {
                if to != from {
                    edges.push((from, to));
                }
            }
        }
    }
    edges.sort();
    edges.dedup();
    edges
}

/// Kahn's algorithm that always takes the earliest ready member.
///
/// Returns the sorted prefix and, if a cycle blocks progress, the members
/// left over in their original order. Edges touching non-members are ignored.
pub(crate) fn stable_topological(
    members: &[CompId],
    edges: &[(CompId, CompId)],
) -> (Vec<CompId>, Vec<CompId>) {
    let position: BTreeMap<CompId, usize> = members
        .iter()
        .enumerate()
        .map(|(i, c)| (*c, i))
        .collect();
    let n = members.len();
    let mut indegree = vec![0usize; n];
    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (from, to) in edges {
        if let (Some(&a), Some(&b)) = (position.get(from), position.get(to)) {
            if a != b && !successors[a].contains(&b) {
                successors[a].push(b);
                indegree[b] += 1;
            }
        }
    }

    let mut placed = vec![false; n];
    let mut order = Vec::with_capacity(n);
    while let Some(next) = (0..n).find(|&i| !placed[i] && indegree[i] == 0) {
        placed[next] = true;
        order.push(members[next]);
        for &b in &successors[next] {
            indegree[b] -= 1;
        }
    }
    let blocked = members
        .iter()
        .zip(&placed)
        .filter(|(_, done)| !**done)
        .map(|(c, _)| *c)
        .collect();
    (order, blocked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tlm_node::{Endpoint, PortKind, PortRef, PortSpec};

    fn ids(raw: &[usize]) -> Vec<CompId> {
        raw.iter().copied().map(CompId::from_index).collect()
    }

    #[test]
    fn keeps_insertion_order_when_unconstrained() {
        let members = ids(&[0, 1, 2]);
        let (order, blocked) = stable_topological(&members, &[]);
        assert_eq!(order, members);
        assert!(blocked.is_empty());
    }

    #[test]
    fn readers_follow_writers() {
        let members = ids(&[0, 1, 2]);
        let edges = vec![(members[2], members[0]), (members[1], members[2])];
        let (order, blocked) = stable_topological(&members, &edges);
        assert_eq!(order, ids(&[1, 2, 0]));
        assert!(blocked.is_empty());
    }

    #[test]
    fn cycle_is_left_over() {
        let members = ids(&[0, 1, 2]);
        let edges = vec![(members[1], members[2]), (members[2], members[1])];
        let (order, blocked) = stable_topological(&members, &edges);
        assert_eq!(order, ids(&[0]));
        assert_eq!(blocked, ids(&[1, 2]));
    }

    #[test]
    fn edges_come_from_signal_writers() {
        let out = PortSpec::new("out", PortKind::Write, "signal");
        let input = PortSpec::new("in", PortKind::Read, "signal");
        let power = PortSpec::new("P1", PortKind::Power, "hydraulic");
        let sensor = PortSpec::new("P1", PortKind::Read, "hydraulic");
        let port = |c: usize| PortRef::component(CompId::from_index(c), 0);

        let mut topology = Topology::new();
        topology
            .connect(Endpoint::new(port(0), &out), Endpoint::new(port(1), &input))
            .unwrap();
        topology
            .connect(Endpoint::new(port(0), &out), Endpoint::new(port(2), &input))
            .unwrap();
        topology
            .connect(Endpoint::new(port(3), &power), Endpoint::new(port(4), &power))
            .unwrap();
        topology
            .connect(Endpoint::new(port(5), &sensor), Endpoint::new(port(3), &power))
            .unwrap();

        let edges = signal_edges(&topology);
        assert_eq!(
            edges,
            vec![
                (CompId::from_index(0), CompId::from_index(1)),
                (CompId::from_index(0), CompId::from_index(2)),
            ]
        );
    }
}
