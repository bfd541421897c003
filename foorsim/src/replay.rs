//! Boundary replay: catalog synchronization across fresh topology.
//!
//! Two triggers seed missing triages when subnets merge. A new link
//! replays a holder's stored triages to the peer (directly to sink peers,
//! selectively to router peers based on the sinks the peer can reach). A
//! newly reachable sink receives every triage a peer sink holds that it
//! lacks, pushed along routing-table next-hops rather than by flooding.

use foors::{MessageKind, NodeId, RebuildOutcome, Severity, SinkId, TriageId};
use hashbrown::HashSet;
use log::debug;

use crate::links::LinkDiff;
use crate::model::Model;

impl Model {
    /// Severity for a replayed triage. Every triage in any store was
    /// created through the model, so the catalog always has it.
    fn catalog_severity(&self, triage_id: TriageId) -> Option<Severity> {
        let severity = self.triage_catalog.get(&triage_id).copied();
        debug_assert!(severity.is_some(), "{} missing from catalog", triage_id);
        severity
    }

    /// Run new-link replay for every link formed this pass. Both directions
    /// are covered because each endpoint lists the other as a new peer.
    pub(crate) fn replay_new_links(&mut self, diff: &LinkDiff) {
        let mut holders: Vec<NodeId> = diff.new_peers.keys().copied().collect();
        holders.sort_unstable();
        for holder in holders {
            for &peer in &diff.new_peers[&holder] {
                self.replay_over_link(holder, peer);
            }
        }
    }

    fn replay_over_link(&mut self, holder: NodeId, peer: NodeId) {
        let Some(holder_node) = self.nodes.get(&holder) else {
            return;
        };
        if holder_node.triage_store.is_empty() {
            return;
        }
        let mut held: Vec<TriageId> = holder_node.triage_store.iter().copied().collect();
        held.sort_unstable();

        let Some(peer_node) = self.nodes.get(&peer) else {
            return;
        };

        if peer_node.is_sink() {
            // A sink peer gets everything it has not seen.
            let missing: Vec<TriageId> = held
                .into_iter()
                .filter(|t| !peer_node.triage_store.contains(t))
                .collect();
            if missing.is_empty() {
                return;
            }
            debug!(
                "{}: replaying {} triage(s) to new sink link {}",
                holder,
                missing.len(),
                peer
            );
            for triage_id in missing {
                let Some(severity) = self.catalog_severity(triage_id) else {
                    continue;
                };
                self.emit_message(holder, peer, MessageKind::Triage, Some(triage_id), Some(severity));
            }
        } else {
            // A router peer matters for the sinks it can reach. Replay any
            // triage not yet pushed toward one of those sinks, then mark
            // them all so this boundary is not re-seeded next tick.
            let reachable: HashSet<SinkId> = peer_node.routing_table.keys().copied().collect();
            if reachable.is_empty() {
                return;
            }
            let mut to_emit = Vec::new();
            let mut to_mark = Vec::new();
            for &triage_id in &held {
                if holder_node.any_sink_unmarked(triage_id, &reachable) {
                    if !peer_node.triage_store.contains(&triage_id) {
                        to_emit.push(triage_id);
                    }
                    to_mark.push(triage_id);
                }
            }
            if to_mark.is_empty() {
                return;
            }
            debug!(
                "{}: replaying {} triage(s) over new link to {} ({} sink(s) behind it)",
                holder,
                to_emit.len(),
                peer,
                reachable.len()
            );
            for &triage_id in &to_emit {
                let Some(severity) = self.catalog_severity(triage_id) else {
                    continue;
                };
                self.emit_message(holder, peer, MessageKind::Triage, Some(triage_id), Some(severity));
            }
            let node = self.nodes.get_mut(&holder).unwrap();
            for triage_id in to_mark {
                node.mark_sent_to_sinks(triage_id, reachable.iter().copied());
            }
        }
    }

    /// Run new-sink replay for every `(observer, sink)` pair the routing
    /// pass reported. The observer pushes its missing catalog toward the
    /// sink through its routing table, not by flooding.
    pub(crate) fn replay_new_sinks(&mut self, outcome: &RebuildOutcome) {
        for &(observer, sink) in &outcome.new_sink_routes {
            self.replay_to_new_sink(observer, sink);
        }
    }

    fn replay_to_new_sink(&mut self, observer: SinkId, sink: SinkId) {
        let (Some(observer_node), Some(sink_node)) =
            (self.nodes.get(&observer), self.nodes.get(&sink))
        else {
            return;
        };
        let Some(entry) = observer_node.routing_table.get(&sink) else {
            return;
        };
        let mut hops: Vec<NodeId> = entry.next_hops.keys().copied().collect();
        hops.sort_unstable();

        let mut candidates: Vec<TriageId> = observer_node
            .triage_store
            .iter()
            .copied()
            .filter(|t| !sink_node.triage_store.contains(t))
            .filter(|t| {
                observer_node
                    .sent_triages_to_sinks
                    .get(t)
                    .is_none_or(|marked| !marked.contains(&sink))
            })
            .collect();
        if candidates.is_empty() {
            return;
        }
        candidates.sort_unstable();

        debug!(
            "sink {}: replaying {} triage(s) toward newly reachable sink {}",
            observer,
            candidates.len(),
            sink
        );
        for triage_id in candidates {
            let Some(severity) = self.catalog_severity(triage_id) else {
                continue;
            };
            for &hop in &hops {
                self.emit_message(observer, hop, MessageKind::Triage, Some(triage_id), Some(severity));
            }
            self.nodes
                .get_mut(&observer)
                .unwrap()
                .mark_sent_to_sinks(triage_id, [sink]);
        }
    }
}
