//! Routing-table construction.
//!
//! Every pass runs one BFS per sink over the undirected neighbor graph and
//! rewrites each node's table for that sink: reachable nodes get the full
//! set of equal-depth next-hops (ties are intentional - they expose path
//! redundancy to the target selector), nodes that lost reachability have
//! their entry demoted to the inactive table, and inactive entries past the
//! grace period are deleted.

use std::collections::VecDeque;

use hashbrown::{HashMap, HashSet};
use log::{debug, trace};

use crate::node::{NodeState, RouteEntry};
use crate::time::{Duration, Timestamp};
use crate::types::{NodeId, SinkId};

/// What a rebuild pass observed, beyond the table rewrites themselves.
#[derive(Debug, Clone, Default)]
pub struct RebuildOutcome {
    /// `(observer, sink)` pairs where a sink node's routing table gained an
    /// entry for another sink it could not previously reach. Ordered by
    /// observer id, then sink id. Feeds new-sink replay.
    pub new_sink_routes: Vec<(SinkId, SinkId)>,
}

/// Rebuild every node's routing tables from the current neighbor sets.
pub fn rebuild_routing_tables(
    nodes: &mut HashMap<NodeId, NodeState>,
    now: Timestamp,
    inactive_route_timeout: Duration,
) -> RebuildOutcome {
    let mut ids: Vec<NodeId> = nodes.keys().copied().collect();
    ids.sort_unstable();

    // Adjacency snapshot, sorted for deterministic BFS order.
    let adjacency: HashMap<NodeId, Vec<NodeId>> = ids
        .iter()
        .map(|&id| {
            let mut peers: Vec<NodeId> = nodes[&id].neighbors.iter().copied().collect();
            peers.sort_unstable();
            (id, peers)
        })
        .collect();

    let sinks: Vec<SinkId> = ids
        .iter()
        .copied()
        .filter(|id| nodes[id].is_sink())
        .collect();
    let sink_set: HashSet<SinkId> = sinks.iter().copied().collect();

    // Routing-table keys per sink node before the pass, for new-sink
    // detection afterwards.
    let prior_sink_keys: HashMap<SinkId, HashSet<SinkId>> = sinks
        .iter()
        .map(|&s| (s, nodes[&s].routing_table.keys().copied().collect()))
        .collect();

    // Entries whose sink left the world (removed or demoted to source) go
    // inactive before BFS.
    for &id in &ids {
        let node = nodes.get_mut(&id).unwrap();
        let mut stale: Vec<SinkId> = node
            .routing_table
            .keys()
            .copied()
            .filter(|s| !sink_set.contains(s))
            .collect();
        stale.sort_unstable();
        for sink in stale {
            node.demote_route(sink, now);
            debug!("{}: route to vanished sink {} demoted", id, sink);
        }
    }

    for &sink in &sinks {
        let dist = bfs_distances(sink, &adjacency);

        for &id in &ids {
            if id == sink {
                continue;
            }
            match dist.get(&id) {
                Some(&d) => {
                    let next_hops: HashMap<NodeId, u32> = adjacency[&id]
                        .iter()
                        .filter(|p| dist.get(*p).is_some_and(|&pd| pd + 1 == d))
                        .map(|&p| (p, d))
                        .collect();
                    debug_assert!(!next_hops.is_empty(), "reachable node must have a next hop");

                    let node = nodes.get_mut(&id).unwrap();
                    if node.inactive_routes.remove(&sink).is_some() {
                        trace!("{}: sink {} reconnected, inactive entry cleared", id, sink);
                    }
                    node.routing_table.insert(
                        sink,
                        RouteEntry {
                            next_hops,
                            last_update: now,
                        },
                    );
                }
                None => {
                    let node = nodes.get_mut(&id).unwrap();
                    if node.demote_route(sink, now) {
                        debug!("{}: sink {} unreachable, route demoted", id, sink);
                    }
                }
            }
        }
    }

    // Inactive entries past the grace period are gone for good.
    for &id in &ids {
        let node = nodes.get_mut(&id).unwrap();
        let before = node.inactive_routes.len();
        node.inactive_routes
            .retain(|_, route| now.saturating_sub(route.inactive_since) <= inactive_route_timeout);
        let dropped = before - node.inactive_routes.len();
        if dropped > 0 {
            debug!("{}: {} inactive route(s) timed out", id, dropped);
        }
    }

    let mut outcome = RebuildOutcome::default();
    for &observer in &sinks {
        let before = &prior_sink_keys[&observer];
        let mut fresh: Vec<SinkId> = nodes[&observer]
            .routing_table
            .keys()
            .copied()
            .filter(|k| !before.contains(k))
            .collect();
        fresh.sort_unstable();
        for sink in fresh {
            debug!("sink {} can newly reach sink {}", observer, sink);
            outcome.new_sink_routes.push((observer, sink));
        }
    }
    outcome
}

/// Hop counts from `start` to every reachable node.
fn bfs_distances(start: NodeId, adjacency: &HashMap<NodeId, Vec<NodeId>>) -> HashMap<NodeId, u32> {
    let mut dist = HashMap::new();
    dist.insert(start, 0u32);

    let mut queue = VecDeque::new();
    queue.push_back(start);

    while let Some(current) = queue.pop_front() {
        let d = dist[&current];
        if let Some(peers) = adjacency.get(&current) {
            for &peer in peers {
                if !dist.contains_key(&peer) {
                    dist.insert(peer, d + 1);
                    queue.push_back(peer);
                }
            }
        }
    }

    dist
}
