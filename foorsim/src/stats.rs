//! Health and observability counters.

use foors::{Message, NodeId, NodeState, RoutingMode, TriageId};
use hashbrown::{HashMap, HashSet};

/// Cumulative message counters, maintained by the pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineMetrics {
    /// Messages emitted onto a link.
    pub messages_sent: u64,
    /// Arrivals processed.
    pub messages_delivered: u64,
    /// Messages lost in transit (endpoint removed mid-flight).
    pub messages_dropped: u64,
}

/// Point-in-time view of the model, handed to subscribers and `get_stats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub node_count: usize,
    pub link_count: usize,
    pub sink_count: usize,
    pub source_count: usize,
    /// Nodes per routing mode.
    pub intelligent_count: usize,
    pub flooding_count: usize,
    pub inactive_count: usize,
    pub no_connection_count: usize,
    /// Triages currently waiting for reconnection, across all queues.
    pub queued_triages: usize,
    pub in_flight_messages: usize,
    /// Distinct triages ever observed by any sink.
    pub sink_observed_triages: usize,
    pub messages_sent: u64,
    pub messages_delivered: u64,
    pub messages_dropped: u64,
}

/// Assemble a stats snapshot from the model's parts.
pub fn collect(
    nodes: &HashMap<NodeId, NodeState>,
    messages: &[Message],
    metrics: &EngineMetrics,
) -> EngineStats {
    let mut stats = EngineStats {
        node_count: nodes.len(),
        in_flight_messages: messages.iter().filter(|m| m.in_flight()).count(),
        messages_sent: metrics.messages_sent,
        messages_delivered: metrics.messages_delivered,
        messages_dropped: metrics.messages_dropped,
        ..EngineStats::default()
    };

    let mut link_ends = 0usize;
    let mut observed: HashSet<TriageId> = HashSet::new();

    for node in nodes.values() {
        link_ends += node.neighbors.len();
        stats.queued_triages += node.triage_queue.len();

        if node.is_sink() {
            stats.sink_count += 1;
            observed.extend(node.triage_store.iter().copied());
        } else {
            stats.source_count += 1;
        }

        match node.routing_state.mode {
            RoutingMode::Intelligent => stats.intelligent_count += 1,
            RoutingMode::Flooding => stats.flooding_count += 1,
            RoutingMode::Inactive => stats.inactive_count += 1,
            RoutingMode::NoConnections => stats.no_connection_count += 1,
        }
    }

    // Links are undirected; every link contributes two neighbor entries.
    stats.link_count = link_ends / 2;
    stats.sink_observed_triages = observed.len();
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use foors::NodeKind;

    #[test]
    fn test_collect_counts_world() {
        let mut nodes: HashMap<NodeId, NodeState> = HashMap::new();
        let a = NodeId::from_raw(1);
        let b = NodeId::from_raw(2);

        let mut source = NodeState::new(a, NodeKind::Source, 0.0, 0.0, 2.0);
        let mut sink = NodeState::new(b, NodeKind::Sink, 1.0, 0.0, 2.0);
        source.neighbors.insert(b);
        sink.neighbors.insert(a);
        sink.triage_store.insert(TriageId::from_raw(1));
        sink.triage_store.insert(TriageId::from_raw(2));
        source.triage_store.insert(TriageId::from_raw(1));
        nodes.insert(a, source);
        nodes.insert(b, sink);

        let metrics = EngineMetrics {
            messages_sent: 5,
            messages_delivered: 4,
            messages_dropped: 1,
        };
        let stats = collect(&nodes, &[], &metrics);

        assert_eq!(stats.node_count, 2);
        assert_eq!(stats.link_count, 1);
        assert_eq!(stats.sink_count, 1);
        assert_eq!(stats.source_count, 1);
        // Only the sink's store counts toward observation.
        assert_eq!(stats.sink_observed_triages, 2);
        assert_eq!(stats.messages_sent, 5);
        assert_eq!(stats.in_flight_messages, 0);
    }

    #[test]
    fn test_collect_mode_tallies() {
        let mut nodes: HashMap<NodeId, NodeState> = HashMap::new();
        for (raw, mode) in [
            (1, RoutingMode::Intelligent),
            (2, RoutingMode::Flooding),
            (3, RoutingMode::Flooding),
            (4, RoutingMode::NoConnections),
        ] {
            let id = NodeId::from_raw(raw);
            let mut n = NodeState::new(id, NodeKind::Source, 0.0, 0.0, 2.0);
            n.routing_state.mode = mode;
            nodes.insert(id, n);
        }

        let stats = collect(&nodes, &[], &EngineMetrics::default());
        assert_eq!(stats.intelligent_count, 1);
        assert_eq!(stats.flooding_count, 2);
        assert_eq!(stats.inactive_count, 0);
        assert_eq!(stats.no_connection_count, 1);
    }
}
