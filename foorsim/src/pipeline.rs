//! Message creation, transit, arrival and forwarding.
//!
//! Two dedup disciplines coexist on arrival: a strict drop of known
//! triage ids under flooding/inactive (loop safety) versus a soft per-sink
//! suppression record under intelligent mode (multi-path within the
//! severity cap). The asymmetry is load-bearing; do not collapse it.

use foors::{
    select_targets, Error, Message, MessageKind, NodeId, QueuedTriage, RoutingMode, Severity,
    TriageId,
};
use log::{debug, trace};

use crate::model::Model;

impl Model {
    /// In-flight messages from `from` to `to`; the selector's load signal.
    pub(crate) fn load_between(&self, from: NodeId, to: NodeId) -> usize {
        self.messages
            .iter()
            .filter(|m| m.in_flight() && m.from == from && m.to == to)
            .count()
    }

    /// Run the target selector for a node in the current world.
    pub(crate) fn select_for(
        &self,
        node_id: NodeId,
        exclude: Option<NodeId>,
        kind: MessageKind,
        severity: Option<Severity>,
    ) -> Vec<NodeId> {
        let node = &self.nodes[&node_id];
        select_targets(
            node,
            exclude,
            kind,
            severity,
            self.now,
            self.config.route_expiry,
            |peer| self.load_between(node_id, peer),
        )
    }

    /// Put a fresh message on the link `from` → `to`.
    pub(crate) fn emit_message(
        &mut self,
        from: NodeId,
        to: NodeId,
        kind: MessageKind,
        triage_id: Option<TriageId>,
        severity: Option<Severity>,
    ) {
        debug_assert!(
            self.nodes
                .get(&from)
                .is_some_and(|n| n.neighbors.contains(&to)),
            "emission {} -> {} without a link",
            from,
            to
        );
        let message = Message {
            id: self.alloc_message_id(),
            from,
            to,
            progress: 0.0,
            speed: self.config.message_speed,
            created_at: self.now,
            kind,
            triage_id,
            severity,
        };
        trace!("{} -> {}: {:?} emitted", from, to, kind);
        self.metrics.messages_sent += 1;
        self.messages.push(message);
    }

    /// Originate a message at `from` without notifying listeners.
    pub(crate) fn do_send(
        &mut self,
        from: NodeId,
        kind: MessageKind,
        severity: Option<Severity>,
    ) -> Result<(), Error> {
        if !self.nodes.contains_key(&from) {
            return Err(Error::UnknownNode(from));
        }
        match kind {
            MessageKind::Triage => {
                let severity = severity.ok_or(Error::MissingSeverity)?;
                self.send_triage(from, severity);
            }
            MessageKind::Normal => {
                let targets = self.select_for(from, None, MessageKind::Normal, None);
                for &target in &targets {
                    self.emit_message(from, target, MessageKind::Normal, None, None);
                }
            }
        }
        Ok(())
    }

    fn send_triage(&mut self, from: NodeId, severity: Severity) {
        let triage_id = self.alloc_triage_id();
        self.triage_catalog.insert(triage_id, severity);

        {
            let node = self.nodes.get_mut(&from).unwrap();
            node.triage_store.insert(triage_id);
            if node.neighbors.is_empty() {
                debug!("{}: isolated, {} queued", from, triage_id);
                node.triage_queue.push(QueuedTriage {
                    triage_id,
                    severity,
                    queued_at: self.now,
                });
                return;
            }
        }

        let targets = self.select_for(from, None, MessageKind::Triage, Some(severity));
        if targets.is_empty() {
            return;
        }
        for &target in &targets {
            self.emit_message(from, target, MessageKind::Triage, Some(triage_id), Some(severity));
        }

        let targeted = self.nodes[&from].targeted_sink_set();
        self.nodes
            .get_mut(&from)
            .unwrap()
            .mark_sent_to_sinks(triage_id, targeted);
    }

    /// Advance transit and process arrivals. Messages emitted while
    /// handling arrivals join the list untouched and first move next tick,
    /// which bounds arrival processing within one tick.
    pub(crate) fn advance_messages(&mut self, delta_seconds: f64) {
        let in_transit = self.messages.len();
        let mut arrivals = Vec::new();

        for index in 0..in_transit {
            let message = &mut self.messages[index];
            if message.progress >= 1.0 {
                continue;
            }
            message.progress += message.speed * delta_seconds;
            if message.progress >= 1.0 {
                message.progress = 1.0;
                arrivals.push(index);
            }
        }

        // Insertion order doubles as arrival order for same-tick crossings.
        for index in arrivals {
            let message = self.messages[index].clone();
            self.deliver(message);
        }

        self.messages.retain(|m| m.in_flight());
    }

    fn deliver(&mut self, message: Message) {
        if !self.nodes.contains_key(&message.to) {
            self.metrics.messages_dropped += 1;
            return;
        }
        self.metrics.messages_delivered += 1;
        self.nodes
            .get_mut(&message.to)
            .unwrap()
            .last_message_received_at = Some(self.now);

        match (message.kind, message.triage_id, message.severity) {
            (MessageKind::Triage, Some(triage_id), Some(severity)) => {
                self.deliver_triage(&message, triage_id, severity);
            }
            (MessageKind::Normal, _, _) => self.deliver_normal(&message),
            _ => debug_assert!(false, "triage message without payload"),
        }
    }

    fn deliver_triage(&mut self, message: &Message, triage_id: TriageId, severity: Severity) {
        {
            let node = self.nodes.get_mut(&message.to).unwrap();

            // Strict loop guard: under flooding a known id must die here.
            if matches!(
                node.routing_state.mode,
                RoutingMode::Flooding | RoutingMode::Inactive
            ) && node.triage_store.contains(&triage_id)
            {
                trace!(
                    "{}: duplicate {} dropped under {}",
                    message.to,
                    triage_id,
                    node.routing_state.mode
                );
                return;
            }
            node.triage_store.insert(triage_id);

            if node.neighbors.is_empty() {
                debug!("{}: isolated on arrival, {} queued", message.to, triage_id);
                node.triage_queue.push(QueuedTriage {
                    triage_id,
                    severity,
                    queued_at: self.now,
                });
                return;
            }
        }

        let targets = self.select_for(
            message.to,
            Some(message.from),
            MessageKind::Triage,
            Some(severity),
        );

        let node = &self.nodes[&message.to];
        let targeted = node.targeted_sink_set();
        if node.routing_state.mode == RoutingMode::Intelligent
            && node.all_sinks_marked(triage_id, &targeted)
        {
            trace!(
                "{}: {} already pushed toward every reachable sink",
                message.to,
                triage_id
            );
            return;
        }
        if targets.is_empty() {
            trace!("{}: no forward target for {}", message.to, triage_id);
            return;
        }

        for &target in &targets {
            self.emit_message(
                message.to,
                target,
                MessageKind::Triage,
                Some(triage_id),
                Some(severity),
            );
        }
        self.nodes
            .get_mut(&message.to)
            .unwrap()
            .mark_sent_to_sinks(triage_id, targeted);
    }

    fn deliver_normal(&mut self, message: &Message) {
        let targets = self.select_for(message.to, Some(message.from), MessageKind::Normal, None);
        for &target in &targets {
            self.emit_message(message.to, target, MessageKind::Normal, None, None);
        }
    }

    /// Flush queued triages for every node that just regained a neighbor.
    ///
    /// The flush floods rather than consulting the selector: the tables may
    /// not reflect the brand-new topology yet. Queues are taken before any
    /// emission so the flush cannot recurse within one tick.
    pub(crate) fn flush_reconnected(&mut self, diff: &crate::links::LinkDiff) {
        for &id in &diff.reconnected {
            let (queued, peers) = {
                let node = self.nodes.get_mut(&id).unwrap();
                if node.triage_queue.is_empty() {
                    continue;
                }
                let queued = std::mem::take(&mut node.triage_queue);
                let mut peers: Vec<NodeId> = node.neighbors.iter().copied().collect();
                peers.sort_unstable();
                (queued, peers)
            };
            debug!(
                "{}: reconnected, flushing {} queued triage(s) to {} peer(s)",
                id,
                queued.len(),
                peers.len()
            );
            for entry in &queued {
                for &peer in &peers {
                    self.emit_message(
                        id,
                        peer,
                        MessageKind::Triage,
                        Some(entry.triage_id),
                        Some(entry.severity),
                    );
                }
            }
        }
    }
}
