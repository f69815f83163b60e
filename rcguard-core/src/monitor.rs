//! Edge callback: timing -> detection -> alert -> queue
//!
//! `EdgeMonitor` is the listener registered on the comparator input. Each
//! edge runs the whole fast path on the notifying thread:
//!
//! ```text
//! EdgeEvent
//!   → EdgeTimer::on_edge        elapsed, updated average
//!   → AnomalyDetector           |average - elapsed| > threshold ?
//!   → AlertComposer             WARN payload with annotation lines
//!   → EventQueue::put           blocks only while the queue is full
//!   → CircuitDriver::complete_cycle
//! ```
//!
//! The comparison uses the average *after* folding in the new interval, so
//! the seeding edge can never alert.
//!
//! A put cancelled by shutdown drops the payload without reporting it. The
//! timing sample behind it is stale by then, so there is nothing to retry.
//!
//! ## Timestamps
//!
//! With a clock attached (`with_clock`), each edge is stamped on arrival
//! from that clock, the same one the timer baseline came from. Without one,
//! the controller's `EdgeEvent::timestamp` is used as is.

use std::sync::Arc;

use crate::alert::{AlertComposer, AlertPayload};
use crate::cancel::CancelToken;
use crate::detector::AnomalyDetector;
use crate::driver::CircuitDriver;
use crate::gpio::{EdgeEvent, EdgeListener, OutputLine};
use crate::queue::EventQueue;
use crate::time::TimeSource;
use crate::timing::EdgeTimer;

/// What one edge did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeOutcome {
    /// Interval since the previous edge
    pub elapsed_ms: u64,
    /// Running average after this edge
    pub average_ms: u64,
    /// Deviation exceeded the threshold
    pub anomalous: bool,
    /// An alert made it into the queue
    pub enqueued: bool,
}

/// Listener that turns edges into queued alerts
pub struct EdgeMonitor<O> {
    timer: EdgeTimer,
    detector: AnomalyDetector,
    composer: AlertComposer,
    queue: Arc<EventQueue<AlertPayload>>,
    cancel: CancelToken,
    driver: Option<CircuitDriver<O>>,
    clock: Option<Arc<dyn TimeSource>>,
}

impl<O: OutputLine> EdgeMonitor<O> {
    /// Create a monitor feeding `queue`
    pub fn new(
        timer: EdgeTimer,
        detector: AnomalyDetector,
        composer: AlertComposer,
        queue: Arc<EventQueue<AlertPayload>>,
        cancel: CancelToken,
    ) -> Self {
        Self {
            timer,
            detector,
            composer,
            queue,
            cancel,
            driver: None,
            clock: None,
        }
    }

    /// Stamp edges from `clock` instead of trusting the event timestamp
    pub fn with_clock(mut self, clock: Arc<dyn TimeSource>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Re-arm this driver after every edge
    pub fn with_driver(mut self, driver: CircuitDriver<O>) -> Self {
        self.driver = Some(driver);
        self
    }

    /// Timing state
    pub fn timer(&self) -> &EdgeTimer {
        &self.timer
    }

    /// Run the fast path for one edge
    pub fn handle_edge(&mut self, event: EdgeEvent) -> EdgeOutcome {
        let now = match &self.clock {
            Some(clock) => clock.now(),
            None => event.timestamp,
        };
        let elapsed_ms = self.timer.on_edge(now);
        let average_ms = self.timer.average_ms();
        let anomalous = self.detector.is_anomalous(elapsed_ms, average_ms);
        let mut enqueued = false;

        if anomalous {
            log_info!(
                "--> GPIO PIN STATE CHANGE: {} = {} in {} ave:{}",
                event.pin,
                event.state,
                elapsed_ms,
                average_ms
            );
            let payload = self.composer.compose();
            match self.queue.put(payload, &self.cancel) {
                Ok(()) => enqueued = true,
                Err(_dropped) => {
                    log_debug!("alert dropped during shutdown: {}", _dropped);
                }
            }
        }

        if let Some(driver) = &self.driver {
            if let Err(_e) = driver.complete_cycle() {
                log_warn!("re-arm failed: {}", _e);
            }
        }

        EdgeOutcome {
            elapsed_ms,
            average_ms,
            anomalous,
            enqueued,
        }
    }
}

impl<O: OutputLine> EdgeListener for EdgeMonitor<O> {
    fn on_edge(&mut self, event: EdgeEvent) {
        self.handle_edge(event);
    }
}
