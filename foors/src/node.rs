//! Per-node mutable state.
//!
//! A node references its peers by id only; the owning model keeps all
//! nodes in one arena keyed by [`NodeId`]. Everything here is plain data
//! plus small bookkeeping helpers - the routing passes in [`crate::routes`],
//! [`crate::mode`] and [`crate::select`] do the actual work.

use hashbrown::{HashMap, HashSet};

use crate::time::{Duration, Timestamp};
use crate::types::{FloodingReason, NodeId, RoutingMode, Severity, SinkId, TriageId};

/// Display radius for newly created nodes. Rendering concern only.
pub const DEFAULT_NODE_RADIUS: f64 = 0.5;

/// Whether a node produces triages or collects them. Either way it
/// forwards for its peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Source,
    Sink,
}

/// A triage waiting for the node to regain connectivity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueuedTriage {
    pub triage_id: TriageId,
    pub severity: Severity,
    pub queued_at: Timestamp,
}

/// Active route toward one sink: every listed next-hop is a current
/// neighbor that is strictly closer to the sink, mapped to the total hop
/// count via that hop. Never empty while the entry exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    pub next_hops: HashMap<NodeId, u32>,
    pub last_update: Timestamp,
}

impl RouteEntry {
    /// An active route older than the expiry threshold counts as expired
    /// but is kept until the builder demotes or refreshes it.
    pub fn is_expired(&self, now: Timestamp, route_expiry: Duration) -> bool {
        now.saturating_sub(self.last_update) > route_expiry
    }
}

/// Snapshot of a demoted route, retained for a grace period in case the
/// sink returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InactiveRoute {
    pub next_hops: HashMap<NodeId, u32>,
    pub last_update: Timestamp,
    pub inactive_since: Timestamp,
}

/// Route tallies feeding the mode classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RouteCounts {
    pub active: usize,
    pub expired: usize,
    pub inactive: usize,
}

/// Current routing mode plus the evidence it was derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingState {
    pub mode: RoutingMode,
    pub flooding_reason: Option<FloodingReason>,
    pub counts: RouteCounts,
    /// Updated only on mode transitions.
    pub last_state_change: Timestamp,
}

impl Default for RoutingState {
    fn default() -> Self {
        Self {
            mode: RoutingMode::NoConnections,
            flooding_reason: Some(FloodingReason::NoConnections),
            counts: RouteCounts::default(),
            last_state_change: Timestamp::ZERO,
        }
    }
}

/// The central per-node aggregate.
#[derive(Debug, Clone)]
pub struct NodeState {
    pub id: NodeId,
    pub kind: NodeKind,
    pub position: (f64, f64),
    pub velocity: (f64, f64),
    /// Display radius; not used by routing.
    pub radius: f64,
    /// Link eligibility cutoff for this node.
    pub connection_radius: f64,
    /// Symmetric neighbor set, recomputed each tick.
    pub neighbors: HashSet<NodeId>,
    /// Every triage id this node has ever accepted.
    pub triage_store: HashSet<TriageId>,
    /// Triages awaiting reconnection, oldest first.
    pub triage_queue: Vec<QueuedTriage>,
    /// Suppression guard: sinks this node has already pushed a triage
    /// towards. Not a delivery record.
    pub sent_triages_to_sinks: HashMap<TriageId, HashSet<SinkId>>,
    pub routing_table: HashMap<SinkId, RouteEntry>,
    /// Key sets of `routing_table` and `inactive_routes` are disjoint.
    pub inactive_routes: HashMap<SinkId, InactiveRoute>,
    pub routing_state: RoutingState,
    /// Observability only.
    pub last_message_received_at: Option<Timestamp>,
}

impl NodeState {
    /// Create a node at rest at the given position.
    pub fn new(id: NodeId, kind: NodeKind, x: f64, y: f64, connection_radius: f64) -> Self {
        Self {
            id,
            kind,
            position: (x, y),
            velocity: (0.0, 0.0),
            radius: DEFAULT_NODE_RADIUS,
            connection_radius,
            neighbors: HashSet::new(),
            triage_store: HashSet::new(),
            triage_queue: Vec::new(),
            sent_triages_to_sinks: HashMap::new(),
            routing_table: HashMap::new(),
            inactive_routes: HashMap::new(),
            routing_state: RoutingState::default(),
            last_message_received_at: None,
        }
    }

    pub fn is_sink(&self) -> bool {
        self.kind == NodeKind::Sink
    }

    pub fn is_source(&self) -> bool {
        self.kind == NodeKind::Source
    }

    /// Tally routes against the expiry threshold.
    pub fn route_counts(&self, now: Timestamp, route_expiry: Duration) -> RouteCounts {
        let mut counts = RouteCounts {
            inactive: self.inactive_routes.len(),
            ..RouteCounts::default()
        };
        for entry in self.routing_table.values() {
            if entry.is_expired(now, route_expiry) {
                counts.expired += 1;
            } else {
                counts.active += 1;
            }
        }
        counts
    }

    /// The sinks a triage emitted here is being pushed towards: this node
    /// itself when it is a sink, plus every sink it has a routing-table
    /// entry for.
    pub fn targeted_sink_set(&self) -> HashSet<SinkId> {
        let mut sinks: HashSet<SinkId> = self.routing_table.keys().copied().collect();
        if self.is_sink() {
            sinks.insert(self.id);
        }
        sinks
    }

    /// Record that a triage has been pushed towards the given sinks.
    pub fn mark_sent_to_sinks<I>(&mut self, triage_id: TriageId, sinks: I)
    where
        I: IntoIterator<Item = SinkId>,
    {
        self.sent_triages_to_sinks
            .entry(triage_id)
            .or_default()
            .extend(sinks);
    }

    /// Whether every sink in `sinks` is already marked for `triage_id`.
    pub fn all_sinks_marked(&self, triage_id: TriageId, sinks: &HashSet<SinkId>) -> bool {
        match self.sent_triages_to_sinks.get(&triage_id) {
            Some(marked) => sinks.iter().all(|s| marked.contains(s)),
            None => sinks.is_empty(),
        }
    }

    /// Whether some sink in `sinks` is still unmarked for `triage_id`.
    pub fn any_sink_unmarked(&self, triage_id: TriageId, sinks: &HashSet<SinkId>) -> bool {
        !self.all_sinks_marked(triage_id, sinks)
    }

    /// Move the active route for `sink` into the inactive table. Returns
    /// false if no active route existed.
    pub fn demote_route(&mut self, sink: SinkId, now: Timestamp) -> bool {
        match self.routing_table.remove(&sink) {
            Some(entry) => {
                debug_assert!(!self.inactive_routes.contains_key(&sink));
                self.inactive_routes.insert(
                    sink,
                    InactiveRoute {
                        next_hops: entry.next_hops,
                        last_update: entry.last_update,
                        inactive_since: now,
                    },
                );
                true
            }
            None => false,
        }
    }
}
