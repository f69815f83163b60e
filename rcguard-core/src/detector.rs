//! Threshold-based anomaly detection
//!
//! An interval is anomalous when it differs from the running average by
//! strictly more than the threshold. Equality is not an anomaly.

use crate::constants::DEFAULT_THRESHOLD_MS;

/// Stateless deviation check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnomalyDetector {
    threshold_ms: u64,
}

impl AnomalyDetector {
    /// Create a detector with a custom threshold
    pub const fn new(threshold_ms: u64) -> Self {
        Self { threshold_ms }
    }

    /// Allowed deviation in milliseconds
    pub const fn threshold_ms(&self) -> u64 {
        self.threshold_ms
    }

    /// Check one interval against the average
    pub fn is_anomalous(&self, elapsed: u64, average: u64) -> bool {
        is_anomalous(elapsed, average, self.threshold_ms)
    }
}

impl Default for AnomalyDetector {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD_MS)
    }
}

/// `|average - elapsed| > threshold_ms`
pub fn is_anomalous(elapsed: u64, average: u64, threshold_ms: u64) -> bool {
    average.abs_diff(elapsed) > threshold_ms
}
