//! Target selection for sends and forwards.
//!
//! The selector answers one question: given this node, which peers should
//! the next emission go to? Intelligent nodes run a greedy maximum-coverage
//! pick over their active routes, bounded by the severity fan-out cap.
//! Flooding and inactive nodes broadcast to everyone except the sender.
//! Exact ties break by ascending peer id so runs are reproducible.

use hashbrown::{HashMap, HashSet};
use log::trace;

use crate::node::NodeState;
use crate::time::{Duration, Timestamp};
use crate::types::{MessageKind, NodeId, RoutingMode, Severity, SinkId, NORMAL_FANOUT_CAP};

/// Choose the peers an emission from `node` should target.
///
/// `exclude` is the arrival peer on a forward, kept out to avoid immediate
/// echo. `load` reports the number of in-flight messages from `node` to a
/// peer and is only consulted to break coverage ties.
pub fn select_targets<F>(
    node: &NodeState,
    exclude: Option<NodeId>,
    kind: MessageKind,
    severity: Option<Severity>,
    now: Timestamp,
    route_expiry: Duration,
    load: F,
) -> Vec<NodeId>
where
    F: Fn(NodeId) -> usize,
{
    match node.routing_state.mode {
        RoutingMode::NoConnections => Vec::new(),
        RoutingMode::Flooding | RoutingMode::Inactive => {
            // The target sink may come back on any link, so controlled
            // flooding stands in for routing here.
            let mut targets: Vec<NodeId> = node
                .neighbors
                .iter()
                .copied()
                .filter(|&p| Some(p) != exclude)
                .collect();
            targets.sort_unstable();
            targets
        }
        RoutingMode::Intelligent => {
            intelligent_targets(node, exclude, fanout_cap(kind, severity), now, route_expiry, load)
        }
    }
}

/// Distinct next-hop cap for one emission.
fn fanout_cap(kind: MessageKind, severity: Option<Severity>) -> usize {
    match (kind, severity) {
        (MessageKind::Triage, Some(severity)) => severity.fanout_cap(),
        _ => NORMAL_FANOUT_CAP,
    }
}

fn intelligent_targets<F>(
    node: &NodeState,
    exclude: Option<NodeId>,
    cap: usize,
    now: Timestamp,
    route_expiry: Duration,
    load: F,
) -> Vec<NodeId>
where
    F: Fn(NodeId) -> usize,
{
    // Which sinks each peer opens a live path to.
    let mut coverage: HashMap<NodeId, HashSet<SinkId>> = HashMap::new();
    for (&sink, entry) in &node.routing_table {
        if entry.is_expired(now, route_expiry) {
            continue;
        }
        for &peer in entry.next_hops.keys() {
            if Some(peer) == exclude {
                continue;
            }
            debug_assert!(
                node.neighbors.contains(&peer),
                "next-hop {} of {} is not a neighbor",
                peer,
                node.id
            );
            coverage.entry(peer).or_default().insert(sink);
        }
    }

    let mut candidates: Vec<NodeId> = coverage.keys().copied().collect();
    candidates.sort_unstable();

    if candidates.is_empty() {
        trace!("{}: no intelligent candidates, dropping emission", node.id);
        return Vec::new();
    }
    if candidates.len() <= cap {
        return candidates;
    }

    // Greedy maximum marginal coverage; ties fall to the less loaded peer,
    // then to the lower id (candidates iterate in ascending order).
    let mut covered: HashSet<SinkId> = HashSet::new();
    let mut selected: Vec<NodeId> = Vec::new();
    let mut remaining = candidates.clone();

    while selected.len() < cap && !remaining.is_empty() {
        let mut best: Option<(usize, usize, usize)> = None; // (index, gain, load)
        for (index, &peer) in remaining.iter().enumerate() {
            let gain = coverage[&peer]
                .iter()
                .filter(|s| !covered.contains(*s))
                .count();
            if gain == 0 {
                continue;
            }
            let peer_load = load(peer);
            let better = match best {
                None => true,
                Some((_, best_gain, best_load)) => {
                    gain > best_gain || (gain == best_gain && peer_load < best_load)
                }
            };
            if better {
                best = Some((index, gain, peer_load));
            }
        }

        match best {
            Some((index, _, _)) => {
                let peer = remaining.remove(index);
                covered.extend(coverage[&peer].iter().copied());
                selected.push(peer);
            }
            None => break,
        }
    }

    if selected.is_empty() {
        // Degenerate coverage: fall back to the single least-loaded candidate.
        let fallback = candidates
            .into_iter()
            .min_by_key(|&p| (load(p), p))
            .expect("candidates checked non-empty");
        return vec![fallback];
    }

    selected.sort_unstable();
    selected
}
