//! Link recomputation from node positions.
//!
//! Connectivity is purely geometric: two nodes are linked when their
//! distance is within the larger of the two connection radii, which keeps
//! the relation symmetric even with per-node radii. The pass also produces
//! the diff that drives boundary replay and queue flushing.

use foors::{NodeId, NodeState};
use hashbrown::{HashMap, HashSet};
use log::trace;

/// What changed in one link pass.
#[derive(Debug, Clone, Default)]
pub struct LinkDiff {
    /// Neighbor sets as they were before the pass.
    pub prev_neighbors: HashMap<NodeId, HashSet<NodeId>>,
    /// Peers that appeared this pass, per node, ascending. Only nodes that
    /// gained at least one peer are present.
    pub new_peers: HashMap<NodeId, Vec<NodeId>>,
    /// Nodes whose neighbor set went from empty to non-empty, ascending.
    pub reconnected: Vec<NodeId>,
}

/// Recompute every node's neighbor set. Deterministic, O(n²).
pub fn rebuild_links(nodes: &mut HashMap<NodeId, NodeState>) -> LinkDiff {
    let mut ids: Vec<NodeId> = nodes.keys().copied().collect();
    ids.sort_unstable();

    let mut fresh: HashMap<NodeId, HashSet<NodeId>> =
        ids.iter().map(|&id| (id, HashSet::new())).collect();

    for (i, &a) in ids.iter().enumerate() {
        for &b in ids.iter().skip(i + 1) {
            let (na, nb) = (&nodes[&a], &nodes[&b]);
            let cutoff = na.connection_radius.max(nb.connection_radius);
            if distance(na.position, nb.position) <= cutoff {
                fresh.get_mut(&a).unwrap().insert(b);
                fresh.get_mut(&b).unwrap().insert(a);
            }
        }
    }

    let mut diff = LinkDiff::default();
    for &id in &ids {
        let node = nodes.get_mut(&id).unwrap();
        let current = fresh.remove(&id).unwrap();
        let prev = std::mem::replace(&mut node.neighbors, current);

        let mut gained: Vec<NodeId> = node
            .neighbors
            .iter()
            .copied()
            .filter(|p| !prev.contains(p))
            .collect();
        if !gained.is_empty() {
            gained.sort_unstable();
            trace!("{}: gained {} link(s)", id, gained.len());
            diff.new_peers.insert(id, gained);
        }
        if prev.is_empty() && !node.neighbors.is_empty() {
            diff.reconnected.push(id);
        }
        diff.prev_neighbors.insert(id, prev);
    }
    diff.reconnected.sort_unstable();
    diff
}

/// Undirected link list as canonical `(low, high)` pairs, ascending.
pub fn connections(nodes: &HashMap<NodeId, NodeState>) -> Vec<(NodeId, NodeId)> {
    let mut links = Vec::new();
    for node in nodes.values() {
        for &peer in &node.neighbors {
            if node.id < peer {
                links.push((node.id, peer));
            }
        }
    }
    links.sort_unstable();
    links
}

fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    (dx * dx + dy * dy).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use foors::NodeKind;

    fn world(specs: &[(u64, f64, f64, f64)]) -> HashMap<NodeId, NodeState> {
        specs
            .iter()
            .map(|&(id, x, y, radius)| {
                let id = NodeId::from_raw(id);
                (id, NodeState::new(id, NodeKind::Source, x, y, radius))
            })
            .collect()
    }

    fn neighbors(nodes: &HashMap<NodeId, NodeState>, id: u64) -> Vec<u64> {
        let mut peers: Vec<u64> = nodes[&NodeId::from_raw(id)]
            .neighbors
            .iter()
            .map(|p| p.as_raw())
            .collect();
        peers.sort_unstable();
        peers
    }

    #[test]
    fn test_links_within_radius() {
        let mut nodes = world(&[(1, 0.0, 0.0, 2.0), (2, 1.5, 0.0, 2.0), (3, 5.0, 0.0, 2.0)]);
        rebuild_links(&mut nodes);

        assert_eq!(neighbors(&nodes, 1), vec![2]);
        assert_eq!(neighbors(&nodes, 2), vec![1]);
        assert!(neighbors(&nodes, 3).is_empty());
    }

    #[test]
    fn test_boundary_distance_is_inclusive() {
        let mut nodes = world(&[(1, 0.0, 0.0, 2.0), (2, 2.0, 0.0, 2.0)]);
        rebuild_links(&mut nodes);
        assert_eq!(neighbors(&nodes, 1), vec![2]);
    }

    #[test]
    fn test_larger_radius_wins_symmetrically() {
        // 1 can reach 3 units; 2 cannot. The link exists for both anyway.
        let mut nodes = world(&[(1, 0.0, 0.0, 4.0), (2, 3.0, 0.0, 1.0)]);
        rebuild_links(&mut nodes);

        assert_eq!(neighbors(&nodes, 1), vec![2]);
        assert_eq!(neighbors(&nodes, 2), vec![1]);
    }

    #[test]
    fn test_diff_reports_new_peers() {
        let mut nodes = world(&[(1, 0.0, 0.0, 2.0), (2, 10.0, 0.0, 2.0)]);
        let diff = rebuild_links(&mut nodes);
        assert!(diff.new_peers.is_empty());
        assert!(diff.reconnected.is_empty());

        nodes.get_mut(&NodeId::from_raw(2)).unwrap().position = (1.0, 0.0);
        let diff = rebuild_links(&mut nodes);

        assert_eq!(
            diff.new_peers[&NodeId::from_raw(1)],
            vec![NodeId::from_raw(2)]
        );
        assert_eq!(
            diff.new_peers[&NodeId::from_raw(2)],
            vec![NodeId::from_raw(1)]
        );
        assert_eq!(
            diff.reconnected,
            vec![NodeId::from_raw(1), NodeId::from_raw(2)]
        );
    }

    #[test]
    fn test_reconnected_requires_prior_isolation() {
        let mut nodes = world(&[
            (1, 0.0, 0.0, 2.0),
            (2, 1.0, 0.0, 2.0),
            (3, 10.0, 0.0, 2.0),
        ]);
        rebuild_links(&mut nodes);

        // 3 moves next to 2: only 3 was isolated before.
        nodes.get_mut(&NodeId::from_raw(3)).unwrap().position = (2.5, 0.0);
        let diff = rebuild_links(&mut nodes);

        assert_eq!(diff.reconnected, vec![NodeId::from_raw(3)]);
        assert!(diff.new_peers.contains_key(&NodeId::from_raw(2)));
    }

    #[test]
    fn test_prev_neighbors_snapshot() {
        let mut nodes = world(&[(1, 0.0, 0.0, 2.0), (2, 1.0, 0.0, 2.0)]);
        rebuild_links(&mut nodes);

        nodes.get_mut(&NodeId::from_raw(2)).unwrap().position = (10.0, 0.0);
        let diff = rebuild_links(&mut nodes);

        assert!(diff.prev_neighbors[&NodeId::from_raw(1)].contains(&NodeId::from_raw(2)));
        assert!(nodes[&NodeId::from_raw(1)].neighbors.is_empty());
    }

    #[test]
    fn test_connections_canonical_pairs() {
        let mut nodes = world(&[(1, 0.0, 0.0, 2.0), (2, 1.0, 0.0, 2.0), (3, 2.0, 0.0, 2.0)]);
        rebuild_links(&mut nodes);

        let links = connections(&nodes);
        assert_eq!(
            links,
            vec![
                (NodeId::from_raw(1), NodeId::from_raw(2)),
                (NodeId::from_raw(1), NodeId::from_raw(3)),
                (NodeId::from_raw(2), NodeId::from_raw(3)),
            ]
        );
    }
}
