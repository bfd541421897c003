//! Time types for the routing engine.
//!
//! The engine never reads a platform clock. All time values are passed
//! explicitly and advance only when the owning model ticks, which keeps
//! every run deterministic and every timeout testable.

use core::ops::{Add, AddAssign, Sub};

/// Engine timestamp in milliseconds since model creation.
///
/// Wraps a u64 to enforce explicit unit conversions and prevent mixing
/// milliseconds with seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Zero timestamp (model creation).
    pub const ZERO: Timestamp = Timestamp(0);

    /// Create a timestamp from milliseconds.
    #[inline]
    pub const fn from_millis(ms: u64) -> Self {
        Timestamp(ms)
    }

    /// Create a timestamp from seconds.
    #[inline]
    pub const fn from_secs(secs: u64) -> Self {
        Timestamp(secs.saturating_mul(1000))
    }

    /// Get the timestamp as milliseconds.
    #[inline]
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Get the timestamp as seconds (truncated).
    #[inline]
    pub const fn as_secs(self) -> u64 {
        self.0 / 1000
    }

    /// Saturating addition of a duration.
    #[inline]
    pub const fn saturating_add(self, duration: Duration) -> Self {
        Timestamp(self.0.saturating_add(duration.0))
    }

    /// Saturating subtraction of another timestamp, returning a duration.
    #[inline]
    pub const fn saturating_sub(self, other: Timestamp) -> Duration {
        Duration(self.0.saturating_sub(other.0))
    }
}

impl Add<Duration> for Timestamp {
    type Output = Timestamp;

    #[inline]
    fn add(self, rhs: Duration) -> Timestamp {
        Timestamp(self.0 + rhs.0)
    }
}

impl AddAssign<Duration> for Timestamp {
    #[inline]
    fn add_assign(&mut self, rhs: Duration) {
        self.0 += rhs.0;
    }
}

impl Sub for Timestamp {
    type Output = Duration;

    #[inline]
    fn sub(self, rhs: Timestamp) -> Duration {
        Duration(self.0 - rhs.0)
    }
}

/// Duration in milliseconds.
///
/// Represents a time span, not a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Duration(u64);

impl Duration {
    /// Zero duration.
    pub const ZERO: Duration = Duration(0);

    /// Create a duration from milliseconds.
    #[inline]
    pub const fn from_millis(ms: u64) -> Self {
        Duration(ms)
    }

    /// Create a duration from seconds.
    #[inline]
    pub const fn from_secs(secs: u64) -> Self {
        Duration(secs.saturating_mul(1000))
    }

    /// Create a duration from minutes.
    #[inline]
    pub const fn from_mins(mins: u64) -> Self {
        Duration(mins.saturating_mul(60 * 1000))
    }

    /// Create a duration from fractional seconds, rounded to milliseconds.
    ///
    /// Negative and non-finite inputs collapse to zero.
    #[inline]
    pub fn from_secs_f64(secs: f64) -> Self {
        if !secs.is_finite() || secs <= 0.0 {
            return Duration::ZERO;
        }
        Duration((secs * 1000.0).round() as u64)
    }

    /// Get the duration as milliseconds.
    #[inline]
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Get the duration as seconds (truncated).
    #[inline]
    pub const fn as_secs(self) -> u64 {
        self.0 / 1000
    }

    /// Saturating addition.
    #[inline]
    pub const fn saturating_add(self, other: Duration) -> Self {
        Duration(self.0.saturating_add(other.0))
    }

    /// Saturating subtraction.
    #[inline]
    pub const fn saturating_sub(self, other: Duration) -> Self {
        Duration(self.0.saturating_sub(other.0))
    }

    /// Clamp into an inclusive range.
    #[inline]
    pub fn clamp(self, min: Duration, max: Duration) -> Self {
        Duration(self.0.clamp(min.0, max.0))
    }
}

impl Add for Duration {
    type Output = Duration;

    #[inline]
    fn add(self, rhs: Duration) -> Duration {
        Duration(self.0 + rhs.0)
    }
}

impl Sub for Duration {
    type Output = Duration;

    #[inline]
    fn sub(self, rhs: Duration) -> Duration {
        Duration(self.0 - rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_creation() {
        let t1 = Timestamp::from_millis(1500);
        assert_eq!(t1.as_millis(), 1500);
        assert_eq!(t1.as_secs(), 1);

        let t2 = Timestamp::from_secs(5);
        assert_eq!(t2.as_millis(), 5000);
    }

    #[test]
    fn test_duration_creation() {
        assert_eq!(Duration::from_millis(2500).as_secs(), 2);
        assert_eq!(Duration::from_secs(10).as_millis(), 10_000);
        assert_eq!(Duration::from_mins(5).as_millis(), 300_000);
    }

    #[test]
    fn test_duration_from_secs_f64() {
        assert_eq!(Duration::from_secs_f64(0.6).as_millis(), 600);
        assert_eq!(Duration::from_secs_f64(1.0 / 60.0).as_millis(), 17);
        assert_eq!(Duration::from_secs_f64(-1.0), Duration::ZERO);
        assert_eq!(Duration::from_secs_f64(f64::NAN), Duration::ZERO);
    }

    #[test]
    fn test_timestamp_arithmetic() {
        let t1 = Timestamp::from_secs(10);
        let d = Duration::from_secs(5);

        assert_eq!((t1 + d).as_secs(), 15);
        assert_eq!((Timestamp::from_secs(20) - t1).as_secs(), 10);
    }

    #[test]
    fn test_saturating_operations() {
        let t1 = Timestamp::from_secs(5);
        let t2 = Timestamp::from_secs(10);
        assert_eq!(t1.saturating_sub(t2), Duration::ZERO);
        assert_eq!(t2.saturating_sub(t1), Duration::from_secs(5));
    }

    #[test]
    fn test_duration_clamp() {
        let min = Duration::from_secs(1);
        let max = Duration::from_mins(5);
        assert_eq!(Duration::from_millis(10).clamp(min, max), min);
        assert_eq!(Duration::from_mins(10).clamp(min, max), max);
        assert_eq!(Duration::from_secs(30).clamp(min, max), Duration::from_secs(30));
    }
}
