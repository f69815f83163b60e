//! Time sources for edge timing
//!
//! Provides a clock abstraction so the edge timer can run against:
//! - A monotonic clock (default, immune to NTP/manual adjustment)
//! - The system wall clock
//! - A controllable mock clock for tests
//!
//! Every source reports milliseconds. Intervals are computed with saturating
//! subtraction, so a clock that steps backwards yields a zero interval rather
//! than wrapping.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Timestamp in milliseconds since epoch (or since clock creation for monotonic)
pub type Timestamp = u64;

/// Source of time for the system
///
/// ## Implementation Requirements
///
/// - `now()` must be callable from the edge-notification thread and the
///   publish thread at the same time
/// - Edge timestamps delivered by a GPIO capability must come from the same
///   source the node uses for its baseline, or the first interval is garbage
pub trait TimeSource: Send + Sync {
    /// Get current timestamp in milliseconds
    fn now(&self) -> Timestamp;

    /// Check if this source provides wall clock time (vs monotonic)
    ///
    /// Wall clock time can be adjusted and may go backwards; monotonic time
    /// only ever increases.
    fn is_wall_clock(&self) -> bool;

    /// Get precision in milliseconds
    fn precision_ms(&self) -> u32;
}

/// Monotonic clock backed by `std::time::Instant`
///
/// Starts at 0 on creation, always increases.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Create a clock whose zero is "now"
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicClock {
    fn now(&self) -> Timestamp {
        self.origin.elapsed().as_millis() as Timestamp
    }

    fn is_wall_clock(&self) -> bool {
        false
    }

    fn precision_ms(&self) -> u32 {
        1
    }
}

/// Wall clock time source (milliseconds since the Unix epoch)
#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn now(&self) -> Timestamp {
        use std::time::{SystemTime, UNIX_EPOCH};

        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as Timestamp
    }

    fn is_wall_clock(&self) -> bool {
        true
    }

    fn precision_ms(&self) -> u32 {
        1
    }
}

/// Controllable time source for testing
///
/// Clones share the same underlying counter, so a test can hand one clone to
/// the node and keep another to move time forward.
#[derive(Debug, Clone, Default)]
pub struct MockTimeSource {
    current: Arc<AtomicU64>,
}

impl MockTimeSource {
    /// Create a mock clock reading `start`
    pub fn new(start: Timestamp) -> Self {
        Self {
            current: Arc::new(AtomicU64::new(start)),
        }
    }

    /// Jump to an absolute timestamp (may go backwards)
    pub fn set(&self, timestamp: Timestamp) {
        self.current.store(timestamp, Ordering::SeqCst);
    }

    /// Move forward by `ms` and return the new time
    pub fn advance(&self, ms: u64) -> Timestamp {
        self.current.fetch_add(ms, Ordering::SeqCst) + ms
    }
}

impl TimeSource for MockTimeSource {
    fn now(&self) -> Timestamp {
        self.current.load(Ordering::SeqCst)
    }

    fn is_wall_clock(&self) -> bool {
        false
    }

    fn precision_ms(&self) -> u32 {
        1
    }
}

/// Milliseconds between two timestamps, clamped at zero
pub fn delta_ms(earlier: Timestamp, later: Timestamp) -> u64 {
    later.saturating_sub(earlier)
}
