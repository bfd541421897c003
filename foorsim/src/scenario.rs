//! Scenario builder for setting up and running test worlds.

use foors::{Duration, EngineConfig, NodeId, NodeKind};

use crate::model::Model;

/// Builder for reproducible model fixtures: explicit node placement, a
/// fixed RNG seed, and config overrides.
pub struct ScenarioBuilder {
    seed: u64,
    config: EngineConfig,
    nodes: Vec<(f64, f64, NodeKind)>,
}

impl Default for ScenarioBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ScenarioBuilder {
    pub fn new() -> Self {
        Self {
            seed: 42,
            config: EngineConfig::default(),
            nodes: Vec::new(),
        }
    }

    /// Set the RNG seed for deterministic auto-generation.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Replace the whole configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Override the connection radius.
    pub fn with_connection_radius(mut self, radius: f64) -> Self {
        self.config.set_connection_radius(radius);
        self
    }

    /// Override the inactive-route timeout.
    pub fn with_inactive_route_timeout(mut self, timeout: Duration) -> Self {
        self.config.set_inactive_route_timeout(timeout);
        self
    }

    /// Override the message speed.
    pub fn with_message_speed(mut self, speed: f64) -> Self {
        self.config.set_message_speed(speed);
        self
    }

    /// Place a source node.
    pub fn source_at(mut self, x: f64, y: f64) -> Self {
        self.nodes.push((x, y, NodeKind::Source));
        self
    }

    /// Place a sink node.
    pub fn sink_at(mut self, x: f64, y: f64) -> Self {
        self.nodes.push((x, y, NodeKind::Sink));
        self
    }

    /// Build the model. Node ids come back in placement order.
    pub fn build(self) -> (Model, Vec<NodeId>) {
        let mut model = Model::new(self.config).with_seed(self.seed);
        let ids = self
            .nodes
            .into_iter()
            .map(|(x, y, kind)| model.add_node(x, y, kind))
            .collect();
        (model, ids)
    }
}

/// Step a model through `ticks` fixed-size deltas.
pub fn run_ticks(model: &mut Model, ticks: usize, delta_seconds: f64) {
    for _ in 0..ticks {
        model.tick(delta_seconds);
    }
}

/// Linear relay: `source - source - sink` with 1.5-unit spacing.
pub fn linear_relay() -> ScenarioBuilder {
    ScenarioBuilder::new()
        .source_at(0.0, 0.0)
        .source_at(1.5, 0.0)
        .sink_at(3.0, 0.0)
}

/// Diamond: one source fanning through two relays into a sink, with the
/// radius tightened so the diagonal shortcut stays out of range.
pub fn diamond() -> ScenarioBuilder {
    ScenarioBuilder::new()
        .with_connection_radius(1.6)
        .source_at(0.0, 0.0)
        .source_at(1.0, 1.0)
        .source_at(1.0, -1.0)
        .sink_at(2.0, 0.0)
}
