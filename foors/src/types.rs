//! Core identifier and message types for the FOORS+ routing engine.

use core::fmt;

use crate::time::Timestamp;

/// Opaque node identifier, stable for the life of the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u64);

impl NodeId {
    /// Create a node id from a raw value. Id allocation is owned by the
    /// model; this constructor exists for tests and external tooling.
    pub const fn from_raw(raw: u64) -> Self {
        NodeId(raw)
    }

    /// Get the raw id value.
    pub const fn as_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// A sink is addressed by its node id. Routing tables are keyed by this
/// alias to keep sink-specific signatures readable.
pub type SinkId = NodeId;

/// Opaque in-flight message identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MessageId(u64);

impl MessageId {
    pub const fn from_raw(raw: u64) -> Self {
        MessageId(raw)
    }

    pub const fn as_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m{}", self.0)
    }
}

/// Opaque triage identifier, globally unique across the model's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TriageId(u64);

impl TriageId {
    pub const fn from_raw(raw: u64) -> Self {
        TriageId(raw)
    }

    pub const fn as_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TriageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Triage severity. Ordering follows urgency: `Red` is highest, `Black`
/// lowest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Black,
    Green,
    Yellow,
    Red,
}

impl Severity {
    /// All severities, lowest urgency first. Used for uniform random picks.
    pub const ALL: [Severity; 4] = [
        Severity::Black,
        Severity::Green,
        Severity::Yellow,
        Severity::Red,
    ];

    /// Maximum number of distinct next-hops a triage of this severity may
    /// fan out to on a single send or forward.
    pub const fn fanout_cap(self) -> usize {
        match self {
            Severity::Red => 3,
            Severity::Yellow => 2,
            Severity::Green | Severity::Black => 1,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Black => "black",
            Severity::Green => "green",
            Severity::Yellow => "yellow",
            Severity::Red => "red",
        };
        f.write_str(name)
    }
}

/// Fan-out cap for non-triage messages.
pub const NORMAL_FANOUT_CAP: usize = 1;

/// Per-node routing behavior, reclassified after every routing pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoutingMode {
    /// Forwarding restricted to routing-table next-hops.
    Intelligent,
    /// Forwarding to all neighbors except the sender.
    Flooding,
    /// Recently lost all routes; floods while the grace period lasts.
    Inactive,
    /// No neighbors at all.
    NoConnections,
}

impl fmt::Display for RoutingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RoutingMode::Intelligent => "intelligent",
            RoutingMode::Flooding => "flooding",
            RoutingMode::Inactive => "inactive",
            RoutingMode::NoConnections => "no-connections",
        };
        f.write_str(name)
    }
}

/// Why a node is in a non-intelligent mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloodingReason {
    NoConnections,
    HasInactiveRoutes,
    RoutesExpired,
    NoRoutes,
}

impl fmt::Display for FloodingReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FloodingReason::NoConnections => "no-connections",
            FloodingReason::HasInactiveRoutes => "has-inactive-routes",
            FloodingReason::RoutesExpired => "routes-expired",
            FloodingReason::NoRoutes => "no-routes",
        };
        f.write_str(name)
    }
}

/// Kind of an in-flight message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Normal,
    Triage,
}

/// An in-flight message on a single link.
///
/// `from` and `to` are neighbors at creation time. Progress is monotone;
/// a message whose progress reaches 1 is delivered and removed within the
/// same tick.
#[derive(Debug, Clone)]
pub struct Message {
    pub id: MessageId,
    pub from: NodeId,
    pub to: NodeId,
    /// Transit progress in [0, 1].
    pub progress: f64,
    /// Progress rate per second.
    pub speed: f64,
    pub created_at: Timestamp,
    pub kind: MessageKind,
    /// Set when `kind` is `Triage`.
    pub triage_id: Option<TriageId>,
    /// Set when `kind` is `Triage`.
    pub severity: Option<Severity>,
}

impl Message {
    /// Whether this message is still in transit.
    pub fn in_flight(&self) -> bool {
        self.progress < 1.0
    }

    /// Whether this message carries a triage payload.
    pub fn is_triage(&self) -> bool {
        self.kind == MessageKind::Triage
    }
}

/// Error type for caller-facing operations.
///
/// Routine engine conditions (isolated sends, unreachable forwards,
/// flooding duplicates) never surface as errors; only API misuse does.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The referenced node does not exist in the model.
    #[error("unknown node {0}")]
    UnknownNode(NodeId),
    /// A triage send requires a severity.
    #[error("triage messages require a severity")]
    MissingSeverity,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Red > Severity::Yellow);
        assert!(Severity::Yellow > Severity::Green);
        assert!(Severity::Green > Severity::Black);
    }

    #[test]
    fn test_fanout_caps() {
        assert_eq!(Severity::Red.fanout_cap(), 3);
        assert_eq!(Severity::Yellow.fanout_cap(), 2);
        assert_eq!(Severity::Green.fanout_cap(), 1);
        assert_eq!(Severity::Black.fanout_cap(), 1);
        assert_eq!(NORMAL_FANOUT_CAP, 1);
    }

    #[test]
    fn test_id_display() {
        assert_eq!(NodeId::from_raw(7).to_string(), "n7");
        assert_eq!(MessageId::from_raw(3).to_string(), "m3");
        assert_eq!(TriageId::from_raw(12).to_string(), "t12");
    }

    #[test]
    fn test_mode_display() {
        assert_eq!(RoutingMode::NoConnections.to_string(), "no-connections");
        assert_eq!(FloodingReason::RoutesExpired.to_string(), "routes-expired");
    }

    #[test]
    fn test_message_in_flight() {
        let msg = Message {
            id: MessageId::from_raw(1),
            from: NodeId::from_raw(1),
            to: NodeId::from_raw(2),
            progress: 0.4,
            speed: 2.0,
            created_at: Timestamp::ZERO,
            kind: MessageKind::Normal,
            triage_id: None,
            severity: None,
        };
        assert!(msg.in_flight());
        assert!(!msg.is_triage());
    }
}
