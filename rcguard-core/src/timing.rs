//! Edge-to-edge interval measurement
//!
//! `EdgeTimer` owns the only mutable timing state in the system: the
//! timestamp of the last edge and the running average of the intervals
//! between edges.
//!
//! ## Running Average
//!
//! The average is a one-tap exponential filter with factor 0.5:
//!
//! ```text
//! average_1 = e_1                          (seed, average was 0)
//! average_i = (e_i + average_{i-1}) / 2    (integer division)
//! ```
//!
//! It keeps no sample history. The price is that it forgets quickly: a
//! single outlier moves the average halfway towards itself.
//!
//! ## Ownership
//!
//! A timer is moved into the edge listener and mutated only from the edge
//! callback. The hardware delivers edges serially, so no lock is needed.

use crate::constants::UNINITIALIZED_AVERAGE_MS;
use crate::time::{delta_ms, Timestamp};

/// Measures elapsed time between edges and smooths it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeTimer {
    /// Timestamp of the previous edge (or the setup baseline)
    last_edge: Timestamp,
    /// Smoothed interval; 0 until the first edge
    average_ms: u64,
}

impl EdgeTimer {
    /// Create a timer whose first interval is measured from `baseline`
    pub fn new(baseline: Timestamp) -> Self {
        Self {
            last_edge: baseline,
            average_ms: UNINITIALIZED_AVERAGE_MS,
        }
    }

    /// Record an edge at `now` and return the interval since the last one
    pub fn on_edge(&mut self, now: Timestamp) -> u64 {
        let elapsed = delta_ms(self.last_edge, now);
        self.last_edge = now;
        self.average_ms = next_average(self.average_ms, elapsed);
        elapsed
    }

    /// Current running average in milliseconds (0 = no edge yet)
    pub fn average_ms(&self) -> u64 {
        self.average_ms
    }

    /// Timestamp of the most recent edge or baseline
    pub fn last_edge(&self) -> Timestamp {
        self.last_edge
    }

    /// Whether at least one interval has seeded the average
    pub fn is_seeded(&self) -> bool {
        self.average_ms != UNINITIALIZED_AVERAGE_MS
    }
}

/// Fold one interval into the running average
///
/// A zero average is the "uninitialized" sentinel, so a zero-length first
/// interval leaves the timer unseeded and the next interval seeds it.
pub fn next_average(average: u64, elapsed: u64) -> u64 {
    if average == UNINITIALIZED_AVERAGE_MS {
        elapsed
    } else {
        // (a + b) / 2 without overflow for values near u64::MAX
        average / 2 + elapsed / 2 + (average % 2 + elapsed % 2) / 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_interval_seeds_average() {
        let mut timer = EdgeTimer::new(1000);
        assert!(!timer.is_seeded());

        let elapsed = timer.on_edge(1100);
        assert_eq!(elapsed, 100);
        assert_eq!(timer.average_ms(), 100);
        assert_eq!(timer.last_edge(), 1100);
        assert!(timer.is_seeded());
    }

    #[test]
    fn five_interval_sequence() {
        let intervals = [100u64, 102, 98, 200, 40];
        let mut timer = EdgeTimer::new(0);
        let mut now = 0;
        let mut expected = 0u64;

        for (i, &e) in intervals.iter().enumerate() {
            now += e;
            assert_eq!(timer.on_edge(now), e);
            expected = if i == 0 { e } else { (e + expected) / 2 };
            assert_eq!(timer.average_ms(), expected);
        }

        // 100, 101, 99, 149, 94
        assert_eq!(timer.average_ms(), 94);
    }

    #[test]
    fn clock_going_backwards_is_zero_interval() {
        let mut timer = EdgeTimer::new(5000);
        assert_eq!(timer.on_edge(4000), 0);
        assert_eq!(timer.last_edge(), 4000);
    }

    #[test]
    fn average_does_not_overflow() {
        assert_eq!(next_average(u64::MAX, u64::MAX), u64::MAX);
        assert_eq!(next_average(3, 4), 3);
        assert_eq!(next_average(99, 200), 149);
    }
}
