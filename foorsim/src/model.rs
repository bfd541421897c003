//! The owning world model.
//!
//! All nodes, messages and listeners live here, in arena maps keyed by id.
//! Mutations happen inside `tick` or inside one of the externally-invoked
//! mutation methods; collaborators observe through the subscription hub and
//! the read-only accessors. One seeded RNG drives every random pick, so a
//! run is fully determined by its seed and its mutation sequence.

use foors::{
    mode, rebuild_routing_tables, Duration, EngineConfig, Error, Message, MessageKind, NodeId,
    NodeKind, NodeState, Severity, Timestamp, TriageId,
};
use hashbrown::HashMap;
use log::{debug, trace};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::hub::{Listener, SubscriberHub, Subscription};
use crate::links;
use crate::stats::{self, EngineMetrics, EngineStats};

/// Default RNG seed for models created without an explicit one.
pub const DEFAULT_SEED: u64 = 42;

/// The tick-driven simulation world.
pub struct Model {
    pub(crate) config: EngineConfig,
    pub(crate) now: Timestamp,
    pub(crate) nodes: HashMap<NodeId, NodeState>,
    /// In-flight messages in insertion order; arrival processing depends
    /// on this order for same-tick determinism.
    pub(crate) messages: Vec<Message>,
    /// Severity lookup for every triage ever created. Never pruned.
    pub(crate) triage_catalog: HashMap<TriageId, Severity>,
    next_node_id: u64,
    next_message_id: u64,
    next_triage_id: u64,
    auto_generate: bool,
    last_generated_at: Timestamp,
    rng: SmallRng,
    hub: SubscriberHub,
    pub(crate) metrics: EngineMetrics,
}

impl Default for Model {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Model {
    /// Create an empty model with the given configuration.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            now: Timestamp::ZERO,
            nodes: HashMap::new(),
            messages: Vec::new(),
            triage_catalog: HashMap::new(),
            next_node_id: 0,
            next_message_id: 0,
            next_triage_id: 0,
            auto_generate: false,
            last_generated_at: Timestamp::ZERO,
            rng: SmallRng::seed_from_u64(DEFAULT_SEED),
            hub: SubscriberHub::new(),
            metrics: EngineMetrics::default(),
        }
    }

    /// Reseed the RNG that drives auto-generation picks.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = SmallRng::seed_from_u64(seed);
        self
    }

    /// Current engine time.
    pub fn current_time(&self) -> Timestamp {
        self.now
    }

    /// Current configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // --- mutation API -----------------------------------------------------

    /// Place a node. Links, routes and boundary replay run synchronously,
    /// so a new sink is seeded by its peers before this call returns.
    pub fn add_node(&mut self, x: f64, y: f64, kind: NodeKind) -> NodeId {
        let id = NodeId::from_raw(self.next_node_id);
        self.next_node_id += 1;
        self.nodes.insert(
            id,
            NodeState::new(id, kind, x, y, self.config.connection_radius),
        );
        debug!("{}: added as {:?} at ({}, {})", id, kind, x, y);
        self.refresh_topology();
        self.notify();
        id
    }

    /// Remove a node. Unknown ids are silent no-ops.
    pub fn remove_node(&mut self, id: NodeId) {
        if self.nodes.remove(&id).is_none() {
            trace!("remove_node: unknown {}", id);
            return;
        }
        for node in self.nodes.values_mut() {
            node.neighbors.remove(&id);
        }
        // Messages to or from the node can no longer complete.
        let before = self.messages.len();
        self.messages.retain(|m| m.from != id && m.to != id);
        self.metrics.messages_dropped += (before - self.messages.len()) as u64;

        debug!("{}: removed", id);
        self.refresh_topology();
        self.notify();
    }

    /// Flip a node between source and sink. Promotion to sink triggers
    /// new-sink replay through the synchronous topology refresh.
    pub fn toggle_node_kind(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get_mut(&id) else {
            trace!("toggle_node_kind: unknown {}", id);
            return;
        };
        node.kind = match node.kind {
            NodeKind::Source => NodeKind::Sink,
            NodeKind::Sink => NodeKind::Source,
        };
        debug!("{}: now {:?}", id, node.kind);
        self.refresh_topology();
        self.notify();
    }

    /// Move a node. Connectivity reacts on the next tick.
    pub fn update_node_position(&mut self, id: NodeId, x: f64, y: f64) {
        let Some(node) = self.nodes.get_mut(&id) else {
            trace!("update_node_position: unknown {}", id);
            return;
        };
        node.position = (x, y);
        self.notify();
    }

    /// Change a node's velocity.
    pub fn update_node_velocity(&mut self, id: NodeId, vx: f64, vy: f64) {
        let Some(node) = self.nodes.get_mut(&id) else {
            trace!("update_node_velocity: unknown {}", id);
            return;
        };
        node.velocity = (vx, vy);
        self.notify();
    }

    /// Update the global connection radius and propagate it to every node.
    pub fn set_connection_radius(&mut self, radius: f64) {
        self.config.set_connection_radius(radius);
        let radius = self.config.connection_radius;
        for node in self.nodes.values_mut() {
            node.connection_radius = radius;
        }
        self.notify();
    }

    /// Update the inactive-route timeout (clamped to 1 s … 5 min).
    pub fn set_inactive_route_timeout(&mut self, ms: u64) {
        self.config
            .set_inactive_route_timeout(Duration::from_millis(ms));
        self.notify();
    }

    /// Update the auto-generation interval (clamped to 500 ms … 10 s).
    pub fn set_triage_generation_interval(&mut self, ms: u64) {
        self.config
            .set_generation_interval(Duration::from_millis(ms));
        self.notify();
    }

    /// Begin synthesizing triages on the configured interval.
    pub fn start_auto_generation(&mut self) {
        if !self.auto_generate {
            self.auto_generate = true;
            self.last_generated_at = self.now;
        }
        self.notify();
    }

    /// Stop synthesizing triages.
    pub fn stop_auto_generation(&mut self) {
        self.auto_generate = false;
        self.notify();
    }

    pub fn is_auto_generation_active(&self) -> bool {
        self.auto_generate
    }

    /// Originate a message at `from`. Triage sends allocate a fresh triage
    /// id; with no neighbors the triage is queued until reconnection.
    pub fn send_message(
        &mut self,
        from: NodeId,
        kind: MessageKind,
        severity: Option<Severity>,
    ) -> Result<(), Error> {
        self.do_send(from, kind, severity)?;
        self.notify();
        Ok(())
    }

    /// Clear nodes, messages and generators. Listeners and id counters
    /// survive; the clock restarts.
    pub fn reset(&mut self) {
        self.nodes.clear();
        self.messages.clear();
        self.triage_catalog.clear();
        self.auto_generate = false;
        self.last_generated_at = Timestamp::ZERO;
        self.now = Timestamp::ZERO;
        self.metrics = EngineMetrics::default();
        self.notify();
    }

    /// Advance the world by `delta_seconds`.
    pub fn tick(&mut self, delta_seconds: f64) {
        let delta_seconds = if delta_seconds.is_finite() && delta_seconds > 0.0 {
            delta_seconds
        } else {
            0.0
        };
        self.now += Duration::from_secs_f64(delta_seconds);

        self.apply_motion(delta_seconds);
        self.refresh_topology();
        self.maybe_auto_generate();
        self.advance_messages(delta_seconds);
        self.notify();
    }

    /// Register a listener; it fires at the end of every tick and after
    /// every completed mutation.
    pub fn subscribe(&mut self, listener: Listener) -> Subscription {
        self.hub.subscribe(listener)
    }

    /// Drop a listener. Returns false if the handle was already gone.
    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        self.hub.unsubscribe(subscription)
    }

    // --- read-only API ----------------------------------------------------

    pub fn get_node(&self, id: NodeId) -> Option<&NodeState> {
        self.nodes.get(&id)
    }

    /// All nodes, ascending by id.
    pub fn get_nodes(&self) -> Vec<&NodeState> {
        let mut nodes: Vec<&NodeState> = self.nodes.values().collect();
        nodes.sort_unstable_by_key(|n| n.id);
        nodes
    }

    /// In-flight messages in insertion order.
    pub fn get_messages(&self) -> &[Message] {
        &self.messages
    }

    /// Undirected links as canonical `(low, high)` pairs.
    pub fn get_connections(&self) -> Vec<(NodeId, NodeId)> {
        links::connections(&self.nodes)
    }

    pub fn get_stats(&self) -> EngineStats {
        stats::collect(&self.nodes, &self.messages, &self.metrics)
    }

    // --- tick phases ------------------------------------------------------

    fn apply_motion(&mut self, delta_seconds: f64) {
        if delta_seconds <= 0.0 {
            return;
        }
        for node in self.nodes.values_mut() {
            node.position.0 += node.velocity.0 * delta_seconds;
            node.position.1 += node.velocity.1 * delta_seconds;
        }
    }

    /// Links, routes, modes, then the boundary phase. Shared between the
    /// tick pipeline and the structural mutations.
    pub(crate) fn refresh_topology(&mut self) {
        let diff = links::rebuild_links(&mut self.nodes);
        let outcome =
            rebuild_routing_tables(&mut self.nodes, self.now, self.config.inactive_route_timeout);
        mode::reclassify_all(&mut self.nodes, self.now, self.config.route_expiry);

        self.flush_reconnected(&diff);
        self.replay_new_links(&diff);
        self.replay_new_sinks(&outcome);
    }

    fn maybe_auto_generate(&mut self) {
        if !self.auto_generate {
            return;
        }
        if self.now.saturating_sub(self.last_generated_at) < self.config.generation_interval {
            return;
        }

        let mut candidates: Vec<NodeId> = self
            .nodes
            .values()
            .filter(|n| n.is_source() && !n.neighbors.is_empty())
            .map(|n| n.id)
            .collect();
        if candidates.is_empty() {
            return;
        }
        candidates.sort_unstable();

        self.last_generated_at = self.now;
        let origin = candidates[self.rng.gen_range(0..candidates.len())];
        let severity = Severity::ALL[self.rng.gen_range(0..Severity::ALL.len())];
        debug!("auto-generating {} triage at {}", severity, origin);

        // The origin was just validated, so this cannot fail.
        let _ = self.do_send(origin, MessageKind::Triage, Some(severity));
    }

    fn notify(&mut self) {
        let stats = stats::collect(&self.nodes, &self.messages, &self.metrics);
        self.hub.notify(&stats);
    }

    // --- id allocation ----------------------------------------------------

    pub(crate) fn alloc_message_id(&mut self) -> foors::MessageId {
        let id = foors::MessageId::from_raw(self.next_message_id);
        self.next_message_id += 1;
        id
    }

    pub(crate) fn alloc_triage_id(&mut self) -> TriageId {
        let id = TriageId::from_raw(self.next_triage_id);
        self.next_triage_id += 1;
        id
    }
}

impl core::fmt::Debug for Model {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Model")
            .field("now", &self.now)
            .field("nodes", &self.nodes.len())
            .field("messages", &self.messages.len())
            .field("auto_generate", &self.auto_generate)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_model() {
        let model = Model::default();
        assert_eq!(model.current_time(), Timestamp::ZERO);
        assert!(model.get_nodes().is_empty());
        assert!(model.get_messages().is_empty());
    }

    #[test]
    fn test_add_node_assigns_fresh_ids() {
        let mut model = Model::default();
        let a = model.add_node(0.0, 0.0, NodeKind::Source);
        let b = model.add_node(1.0, 0.0, NodeKind::Sink);

        assert_ne!(a, b);
        assert_eq!(model.get_nodes().len(), 2);
        assert!(model.get_node(a).unwrap().is_source());
        assert!(model.get_node(b).unwrap().is_sink());
    }

    #[test]
    fn test_add_node_links_synchronously() {
        let mut model = Model::default();
        let a = model.add_node(0.0, 0.0, NodeKind::Source);
        let b = model.add_node(1.0, 0.0, NodeKind::Sink);

        assert!(model.get_node(a).unwrap().neighbors.contains(&b));
        assert_eq!(model.get_connections(), vec![(a, b)]);
        assert!(model
            .get_node(a)
            .unwrap()
            .routing_table
            .contains_key(&b));
    }

    #[test]
    fn test_remove_unknown_is_silent() {
        let mut model = Model::default();
        let notified = std::rc::Rc::new(std::cell::Cell::new(0u32));
        let seen = notified.clone();
        model.subscribe(Box::new(move |_| seen.set(seen.get() + 1)));

        model.remove_node(NodeId::from_raw(999));
        assert_eq!(notified.get(), 0);
    }

    #[test]
    fn test_remove_node_purges_world() {
        let mut model = Model::default();
        let a = model.add_node(0.0, 0.0, NodeKind::Source);
        let b = model.add_node(1.0, 0.0, NodeKind::Sink);
        model
            .send_message(a, MessageKind::Triage, Some(Severity::Red))
            .unwrap();
        assert_eq!(model.get_messages().len(), 1);

        model.remove_node(b);

        assert!(model.get_node(b).is_none());
        assert!(model.get_node(a).unwrap().neighbors.is_empty());
        assert!(model.get_messages().is_empty());
        assert_eq!(model.get_stats().messages_dropped, 1);
    }

    #[test]
    fn test_toggle_node_kind_flips() {
        let mut model = Model::default();
        let a = model.add_node(0.0, 0.0, NodeKind::Source);

        model.toggle_node_kind(a);
        assert!(model.get_node(a).unwrap().is_sink());
        model.toggle_node_kind(a);
        assert!(model.get_node(a).unwrap().is_source());
    }

    #[test]
    fn test_connection_radius_propagates() {
        let mut model = Model::default();
        let a = model.add_node(0.0, 0.0, NodeKind::Source);

        model.set_connection_radius(3.5);
        assert_eq!(model.config().connection_radius, 3.5);
        assert_eq!(model.get_node(a).unwrap().connection_radius, 3.5);
    }

    #[test]
    fn test_parameter_setters_clamp() {
        let mut model = Model::default();

        model.set_inactive_route_timeout(10);
        assert_eq!(
            model.config().inactive_route_timeout,
            Duration::from_secs(1)
        );

        model.set_triage_generation_interval(60_000);
        assert_eq!(model.config().generation_interval, Duration::from_secs(10));
    }

    #[test]
    fn test_setter_with_current_value_notifies_once() {
        let mut model = Model::default();
        let notified = std::rc::Rc::new(std::cell::Cell::new(0u32));
        let seen = notified.clone();
        model.subscribe(Box::new(move |_| seen.set(seen.get() + 1)));

        model.set_connection_radius(model.config().connection_radius);
        assert_eq!(notified.get(), 1);
    }

    #[test]
    fn test_tick_advances_clock_and_motion() {
        let mut model = Model::default();
        let a = model.add_node(0.0, 0.0, NodeKind::Source);
        model.update_node_velocity(a, 1.0, -2.0);

        model.tick(0.5);

        assert_eq!(model.current_time(), Timestamp::from_millis(500));
        let node = model.get_node(a).unwrap();
        assert_eq!(node.position, (0.5, -1.0));
    }

    #[test]
    fn test_tick_rejects_bad_delta() {
        let mut model = Model::default();
        model.tick(-1.0);
        model.tick(f64::NAN);
        assert_eq!(model.current_time(), Timestamp::ZERO);
    }

    #[test]
    fn test_send_message_unknown_node_errors_without_notify() {
        let mut model = Model::default();
        let notified = std::rc::Rc::new(std::cell::Cell::new(0u32));
        let seen = notified.clone();
        model.subscribe(Box::new(move |_| seen.set(seen.get() + 1)));

        let missing = NodeId::from_raw(404);
        assert_eq!(
            model.send_message(missing, MessageKind::Triage, Some(Severity::Red)),
            Err(Error::UnknownNode(missing))
        );
        assert_eq!(notified.get(), 0);
    }

    #[test]
    fn test_triage_send_requires_severity() {
        let mut model = Model::default();
        let a = model.add_node(0.0, 0.0, NodeKind::Source);
        assert_eq!(
            model.send_message(a, MessageKind::Triage, None),
            Err(Error::MissingSeverity)
        );
    }

    #[test]
    fn test_reset_clears_world_but_keeps_listeners() {
        let mut model = Model::default();
        let notified = std::rc::Rc::new(std::cell::Cell::new(0u32));
        let seen = notified.clone();
        model.subscribe(Box::new(move |_| seen.set(seen.get() + 1)));

        model.add_node(0.0, 0.0, NodeKind::Source);
        model.start_auto_generation();
        let before = notified.get();

        model.reset();

        assert!(model.get_nodes().is_empty());
        assert!(!model.is_auto_generation_active());
        assert_eq!(model.current_time(), Timestamp::ZERO);
        assert_eq!(notified.get(), before + 1);
    }

    #[test]
    fn test_auto_generation_produces_triages() {
        let mut model = Model::default().with_seed(7);
        model.add_node(0.0, 0.0, NodeKind::Source);
        model.add_node(1.0, 0.0, NodeKind::Sink);
        model.set_triage_generation_interval(1_000);
        model.start_auto_generation();

        // Two seconds of ticks crosses the interval at least once.
        for _ in 0..4 {
            model.tick(0.5);
        }

        assert!(model.get_stats().messages_sent > 0);
    }

    #[test]
    fn test_auto_generation_noop_without_eligible_source() {
        let mut model = Model::default();
        model.add_node(0.0, 0.0, NodeKind::Source); // isolated
        model.set_triage_generation_interval(1_000);
        model.start_auto_generation();

        for _ in 0..4 {
            model.tick(0.5);
        }

        assert_eq!(model.get_stats().messages_sent, 0);
        assert_eq!(model.get_stats().queued_triages, 0);
    }
}
