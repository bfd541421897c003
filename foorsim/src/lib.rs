//! foorsim - Tick-driven mesh engine for the foors routing core.
//!
//! This crate owns the world: nodes, links, and in-flight messages live in
//! a single [`Model`] driven by `tick(delta_seconds)`. Each tick advances
//! motion, recomputes link membership from positions, rebuilds routing
//! tables, reclassifies routing modes, replays state across freshly formed
//! links, optionally generates load, and advances messages toward arrival.
//!
//! # Features
//!
//! - **Deterministic ticks**: one seeded RNG, id-ordered tie-breaks, and
//!   insertion-ordered arrival processing
//! - **Severity-aware forwarding**: red triages fan out over up to three
//!   disjoint next-hops, green over one
//! - **Disruption tolerance**: isolated nodes queue triages and flood them
//!   on reconnection; lost routes degrade gracefully through an inactive
//!   grace period
//! - **Boundary replay**: bridging two subnets synchronizes their triage
//!   catalogs without re-flooding the world
//! - **Scenario builder**: explicit node placement for reproducible tests
//!
//! # Example
//!
//! ```
//! use foors::{MessageKind, NodeKind, Severity};
//! use foorsim::Model;
//!
//! let mut model = Model::default();
//! let field_unit = model.add_node(0.0, 0.0, NodeKind::Source);
//! let hospital = model.add_node(1.5, 0.0, NodeKind::Sink);
//!
//! model
//!     .send_message(field_unit, MessageKind::Triage, Some(Severity::Red))
//!     .unwrap();
//! model.tick(0.6);
//!
//! assert_eq!(model.get_node(hospital).unwrap().triage_store.len(), 1);
//! ```

pub mod hub;
pub mod links;
pub mod model;
mod pipeline;
mod replay;
pub mod scenario;
pub mod stats;

// Re-export main types
pub use foors::{
    Duration, EngineConfig, Error, FloodingReason, Message, MessageId, MessageKind, NodeId,
    NodeKind, NodeState, RoutingMode, Severity, SinkId, Timestamp, TriageId,
};
pub use hub::{Listener, SubscriberHub, Subscription};
pub use links::LinkDiff;
pub use model::Model;
pub use scenario::{diamond, linear_relay, run_ticks, ScenarioBuilder};
pub use stats::{EngineMetrics, EngineStats};
