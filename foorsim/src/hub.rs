//! Subscription hub for external collaborators.
//!
//! Renderers and panels register a listener and are called with a stats
//! snapshot at the end of every tick and after every completed mutation.
//! Deeper state is read back through the model's read-only API.

use crate::stats::EngineStats;

/// Listener callback. Receives the post-change stats snapshot.
pub type Listener = Box<dyn FnMut(&EngineStats)>;

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

/// Registered listeners, notified in subscription order.
#[derive(Default)]
pub struct SubscriberHub {
    listeners: Vec<(u64, Listener)>,
    next_id: u64,
}

impl SubscriberHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener and return its unsubscribe handle.
    pub fn subscribe(&mut self, listener: Listener) -> Subscription {
        let id = self.next_id;
        self.next_id += 1;
        self.listeners.push((id, listener));
        Subscription(id)
    }

    /// Remove a listener. Returns false if the handle was already gone.
    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(id, _)| *id != subscription.0);
        self.listeners.len() != before
    }

    /// Invoke every listener with the given snapshot.
    pub fn notify(&mut self, stats: &EngineStats) {
        for (_, listener) in &mut self.listeners {
            listener(stats);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl core::fmt::Debug for SubscriberHub {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SubscriberHub")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
