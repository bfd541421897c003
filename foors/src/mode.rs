//! Routing-mode classification.
//!
//! Runs after every routing pass. The mode decides how the target selector
//! behaves: intelligent nodes follow their tables, flooding and inactive
//! nodes broadcast, isolated nodes stay silent.

use hashbrown::HashMap;
use log::debug;

use crate::node::{NodeState, RouteCounts};
use crate::time::{Duration, Timestamp};
use crate::types::{FloodingReason, NodeId, RoutingMode};

/// Derive a node's mode from its route counts, link count and kind.
///
/// A lone sink with no routes at all stays intelligent: it has no
/// peer-sinks to target, which is not a routing failure.
pub fn classify(node: &NodeState, counts: RouteCounts) -> (RoutingMode, Option<FloodingReason>) {
    if node.neighbors.is_empty() {
        return (
            RoutingMode::NoConnections,
            Some(FloodingReason::NoConnections),
        );
    }
    if node.is_sink() && counts.active == 0 && counts.expired == 0 && counts.inactive == 0 {
        return (RoutingMode::Intelligent, None);
    }
    if counts.inactive > 0 {
        return (
            RoutingMode::Inactive,
            Some(FloodingReason::HasInactiveRoutes),
        );
    }
    if counts.active > 0 {
        return (RoutingMode::Intelligent, None);
    }
    if counts.expired > 0 {
        return (RoutingMode::Flooding, Some(FloodingReason::RoutesExpired));
    }
    (RoutingMode::Flooding, Some(FloodingReason::NoRoutes))
}

/// Reclassify every node, updating `last_state_change` only on transitions.
pub fn reclassify_all(
    nodes: &mut HashMap<NodeId, NodeState>,
    now: Timestamp,
    route_expiry: Duration,
) {
    for node in nodes.values_mut() {
        let counts = node.route_counts(now, route_expiry);
        let (mode, reason) = classify(node, counts);

        if mode != node.routing_state.mode {
            debug!(
                "{}: mode {} -> {}",
                node.id, node.routing_state.mode, mode
            );
            node.routing_state.last_state_change = now;
        }
        node.routing_state.mode = mode;
        node.routing_state.flooding_reason = reason;
        node.routing_state.counts = counts;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{NodeKind, RouteEntry};

    fn node(kind: NodeKind) -> NodeState {
        NodeState::new(NodeId::from_raw(1), kind, 0.0, 0.0, 2.0)
    }

    fn with_neighbor(mut n: NodeState) -> NodeState {
        n.neighbors.insert(NodeId::from_raw(99));
        n
    }

    fn counts(active: usize, expired: usize, inactive: usize) -> RouteCounts {
        RouteCounts {
            active,
            expired,
            inactive,
        }
    }

    #[test]
    fn test_isolated_node_has_no_connections() {
        let n = node(NodeKind::Source);
        assert_eq!(
            classify(&n, counts(3, 0, 0)),
            (
                RoutingMode::NoConnections,
                Some(FloodingReason::NoConnections)
            )
        );
    }

    #[test]
    fn test_lone_sink_stays_intelligent() {
        let n = with_neighbor(node(NodeKind::Sink));
        assert_eq!(classify(&n, counts(0, 0, 0)), (RoutingMode::Intelligent, None));
    }

    #[test]
    fn test_inactive_routes_win_over_active() {
        let n = with_neighbor(node(NodeKind::Source));
        assert_eq!(
            classify(&n, counts(2, 0, 1)),
            (
                RoutingMode::Inactive,
                Some(FloodingReason::HasInactiveRoutes)
            )
        );
    }

    #[test]
    fn test_active_routes_are_intelligent() {
        let n = with_neighbor(node(NodeKind::Source));
        assert_eq!(classify(&n, counts(1, 2, 0)), (RoutingMode::Intelligent, None));
    }

    #[test]
    fn test_expired_only_floods() {
        let n = with_neighbor(node(NodeKind::Source));
        assert_eq!(
            classify(&n, counts(0, 1, 0)),
            (RoutingMode::Flooding, Some(FloodingReason::RoutesExpired))
        );
    }

    #[test]
    fn test_routeless_source_floods() {
        let n = with_neighbor(node(NodeKind::Source));
        assert_eq!(
            classify(&n, counts(0, 0, 0)),
            (RoutingMode::Flooding, Some(FloodingReason::NoRoutes))
        );
    }

    #[test]
    fn test_sink_with_inactive_routes_is_inactive() {
        // The lone-sink exception applies only when all counts are zero.
        let n = with_neighbor(node(NodeKind::Sink));
        assert_eq!(
            classify(&n, counts(0, 0, 2)),
            (
                RoutingMode::Inactive,
                Some(FloodingReason::HasInactiveRoutes)
            )
        );
    }

    #[test]
    fn test_last_state_change_updates_only_on_transition() {
        let mut nodes: HashMap<NodeId, NodeState> = HashMap::new();
        let id = NodeId::from_raw(1);
        let mut n = node(NodeKind::Source);
        n.neighbors.insert(NodeId::from_raw(2));
        n.routing_table.insert(
            NodeId::from_raw(9),
            RouteEntry {
                next_hops: [(NodeId::from_raw(2), 2)].into_iter().collect(),
                last_update: Timestamp::ZERO,
            },
        );
        nodes.insert(id, n);

        let expiry = Duration::from_mins(5);

        // NoConnections -> Intelligent.
        reclassify_all(&mut nodes, Timestamp::from_secs(1), expiry);
        assert_eq!(nodes[&id].routing_state.mode, RoutingMode::Intelligent);
        assert_eq!(
            nodes[&id].routing_state.last_state_change,
            Timestamp::from_secs(1)
        );

        // Still intelligent: timestamp untouched.
        reclassify_all(&mut nodes, Timestamp::from_secs(2), expiry);
        assert_eq!(
            nodes[&id].routing_state.last_state_change,
            Timestamp::from_secs(1)
        );

        // Route ages past expiry: flooding, timestamp moves.
        reclassify_all(&mut nodes, Timestamp::from_secs(301), expiry);
        assert_eq!(nodes[&id].routing_state.mode, RoutingMode::Flooding);
        assert_eq!(
            nodes[&id].routing_state.flooding_reason,
            Some(FloodingReason::RoutesExpired)
        );
        assert_eq!(
            nodes[&id].routing_state.last_state_change,
            Timestamp::from_secs(301)
        );
    }
}
