//! Runtime configuration for the routing engine.
//!
//! Every parameter is dynamically settable while the model runs. Setters
//! clamp to documented bounds instead of erroring, so external controls
//! (sliders, tests) can pass raw values.

use crate::time::Duration;

/// Lower bound for the inactive-route timeout.
pub const INACTIVE_TIMEOUT_MIN: Duration = Duration::from_secs(1);
/// Upper bound for the inactive-route timeout.
pub const INACTIVE_TIMEOUT_MAX: Duration = Duration::from_mins(5);

/// Lower bound for the auto-generation interval.
pub const GENERATION_INTERVAL_MIN: Duration = Duration::from_millis(500);
/// Upper bound for the auto-generation interval.
pub const GENERATION_INTERVAL_MAX: Duration = Duration::from_secs(10);

/// Smallest accepted connection radius and message speed.
const MIN_POSITIVE: f64 = 0.01;

/// Engine parameters. See the field docs for defaults and bounds.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Link eligibility cutoff applied to new nodes. Default 2.0.
    pub connection_radius: f64,
    /// Lifetime of demoted routes. Default 1 s, clamped to [1 s, 5 min].
    pub inactive_route_timeout: Duration,
    /// Age past which an active route counts as expired. Default 5 min.
    pub route_expiry: Duration,
    /// Message progress rate in units of full-link per second. Default 2.0.
    pub message_speed: f64,
    /// Auto-generation cadence. Default 3 s, clamped to [500 ms, 10 s].
    pub generation_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            connection_radius: 2.0,
            inactive_route_timeout: Duration::from_secs(1),
            route_expiry: Duration::from_mins(5),
            message_speed: 2.0,
            generation_interval: Duration::from_secs(3),
        }
    }
}

impl EngineConfig {
    /// Create a config with all defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the connection radius, builder style.
    pub fn with_connection_radius(mut self, radius: f64) -> Self {
        self.set_connection_radius(radius);
        self
    }

    /// Set the inactive-route timeout, builder style.
    pub fn with_inactive_route_timeout(mut self, timeout: Duration) -> Self {
        self.set_inactive_route_timeout(timeout);
        self
    }

    /// Set the route expiry threshold, builder style.
    pub fn with_route_expiry(mut self, expiry: Duration) -> Self {
        self.route_expiry = expiry;
        self
    }

    /// Set the message speed, builder style.
    pub fn with_message_speed(mut self, speed: f64) -> Self {
        self.set_message_speed(speed);
        self
    }

    /// Set the auto-generation interval, builder style.
    pub fn with_generation_interval(mut self, interval: Duration) -> Self {
        self.set_generation_interval(interval);
        self
    }

    /// Update the connection radius. Non-positive values clamp to a small
    /// positive floor.
    pub fn set_connection_radius(&mut self, radius: f64) {
        self.connection_radius = if radius.is_finite() {
            radius.max(MIN_POSITIVE)
        } else {
            MIN_POSITIVE
        };
    }

    /// Update the inactive-route timeout, clamped to [1 s, 5 min].
    pub fn set_inactive_route_timeout(&mut self, timeout: Duration) {
        self.inactive_route_timeout = timeout.clamp(INACTIVE_TIMEOUT_MIN, INACTIVE_TIMEOUT_MAX);
    }

    /// Update the message speed. Non-positive values clamp to a small
    /// positive floor.
    pub fn set_message_speed(&mut self, speed: f64) {
        self.message_speed = if speed.is_finite() {
            speed.max(MIN_POSITIVE)
        } else {
            MIN_POSITIVE
        };
    }

    /// Update the auto-generation interval, clamped to [500 ms, 10 s].
    pub fn set_generation_interval(&mut self, interval: Duration) {
        self.generation_interval =
            interval.clamp(GENERATION_INTERVAL_MIN, GENERATION_INTERVAL_MAX);
    }
}
