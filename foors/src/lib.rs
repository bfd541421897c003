//! foors - Flood-Optimized Opportunistic Routing with Sink awareness.
//!
//! Routing core for intermittent short-range mesh networks where links are
//! scarce, brief, and costly. Nodes are triage *sources* or *sinks*; every
//! node routes for its peers, blending opportunistic flooding with
//! shortest-path forwarding over live per-sink routing tables.
//!
//! # Key Properties
//!
//! - Routing tables are rebuilt from scratch each pass: one BFS per sink,
//!   with equal-depth ties kept as redundant next-hops
//! - Lost routes are demoted to an inactive table and retained for a grace
//!   period before deletion
//! - Each node carries a routing mode (intelligent / flooding / inactive /
//!   no-connections) derived from its route counts
//! - Triage emissions fan out to at most `severity.fanout_cap()` next-hops,
//!   chosen by greedy sink-coverage with load tie-breaks
//!
//! This crate is pure logic over explicit state; the owning world model,
//! message transit and boundary replay live in the `foorsim` crate.
//!
//! # Module Structure
//!
//! - [`types`] - Identifiers, severity, modes, messages, errors
//! - [`time`] - Explicit millisecond timestamps and durations
//! - [`config`] - Runtime parameters with clamped setters
//! - [`node`] - The per-node state aggregate
//! - [`routes`] - BFS routing-table builder
//! - [`mode`] - Routing-mode classifier
//! - [`select`] - Severity-aware target selector

pub mod config;
pub mod mode;
pub mod node;
pub mod routes;
pub mod select;
pub mod time;
pub mod types;

// Re-export main types at crate root
pub use config::EngineConfig;
pub use node::{InactiveRoute, NodeKind, NodeState, QueuedTriage, RouteCounts, RouteEntry, RoutingState};
pub use routes::{rebuild_routing_tables, RebuildOutcome};
pub use select::select_targets;
pub use time::{Duration, Timestamp};
pub use types::{
    Error, FloodingReason, Message, MessageId, MessageKind, NodeId, RoutingMode, Severity, SinkId,
    TriageId,
};
