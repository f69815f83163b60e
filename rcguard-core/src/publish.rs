//! Publish loop: queue -> message bus
//!
//! ## State Machine
//!
//! ```text
//! Setup ──(setup hook ok)──> Running ──(cancel)──> Cancelled
//!   │                          │  ↺ take → publish → yield
//!   └──(setup hook err)────────┴──────────────────> Cancelled
//! ```
//!
//! - **Setup** runs once: the hook captures the timing baseline and arms the
//!   circuit.
//! - **Running** takes one payload at a time, hands it to the publisher, then
//!   sleeps briefly so the edge thread gets scheduled.
//! - **Cancelled** is terminal. A payload already taken is always published
//!   before the loop exits; payloads still queued are drained unpublished
//!   and counted in `LoopReport::discarded`.
//!
//! Publish failures are counted and logged, never retried. Delivery
//! guarantees belong to the bus.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use crate::alert::AlertPayload;
use crate::cancel::CancelToken;
use crate::constants::DEFAULT_PUBLISH_YIELD_MS;
use crate::errors::{RcError, RcResult};
use crate::queue::EventQueue;

/// Outbound bus capability
pub trait Publisher: Send {
    /// Send one alert; errors are reported, not retried
    fn publish(&mut self, payload: &AlertPayload) -> RcResult<()>;
}

impl<P: Publisher + ?Sized> Publisher for Box<P> {
    fn publish(&mut self, payload: &AlertPayload) -> RcResult<()> {
        (**self).publish(payload)
    }
}

/// Loop lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Waiting to run the setup hook
    Setup,
    /// Draining the queue
    Running,
    /// Stopped
    Cancelled,
}

/// Counters returned when the loop stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopReport {
    /// Payloads the publisher accepted
    pub published: u64,
    /// Payloads the publisher rejected
    pub failed: u64,
    /// Payloads still queued at cancellation, dropped unpublished
    pub discarded: u64,
}

/// Single-consumer loop forwarding alerts to a [`Publisher`]
pub struct PublishLoop<P> {
    queue: Arc<EventQueue<AlertPayload>>,
    publisher: P,
    cancel: CancelToken,
    yield_interval: Duration,
    state: LoopState,
    report: LoopReport,
}

impl<P: Publisher> PublishLoop<P> {
    /// Create a loop draining `queue` into `publisher`
    pub fn new(queue: Arc<EventQueue<AlertPayload>>, publisher: P, cancel: CancelToken) -> Self {
        Self {
            queue,
            publisher,
            cancel,
            yield_interval: Duration::from_millis(DEFAULT_PUBLISH_YIELD_MS),
            state: LoopState::Setup,
            report: LoopReport::default(),
        }
    }

    /// Pause after each publish (zero disables the pause)
    pub fn with_yield_interval(mut self, interval: Duration) -> Self {
        self.yield_interval = interval;
        self
    }

    /// Current state
    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Counters so far
    pub fn report(&self) -> LoopReport {
        self.report
    }

    /// Run with no setup work
    pub fn run(&mut self) -> RcResult<LoopReport> {
        self.run_with_setup(|| Ok(()))
    }

    /// Run `setup` once, then drain the queue until cancelled
    ///
    /// A failing setup moves straight to `Cancelled` and returns the error.
    pub fn run_with_setup<F>(&mut self, setup: F) -> RcResult<LoopReport>
    where
        F: FnOnce() -> RcResult<()>,
    {
        if self.state != LoopState::Setup {
            return Err(RcError::Setup("publish loop already ran".into()));
        }

        if let Err(e) = setup() {
            self.state = LoopState::Cancelled;
            return Err(e);
        }

        self.state = LoopState::Running;
        log_info!("publish loop running");

        while !self.cancel.is_cancelled() {
            if !self.step() {
                break;
            }
        }

        self.state = LoopState::Cancelled;
        self.report.discarded = self.queue.drain().count() as u64;
        log_info!(
            "publish loop cancelled: {} published, {} failed, {} discarded",
            self.report.published,
            self.report.failed,
            self.report.discarded
        );
        Ok(self.report)
    }

    /// One iteration: take, publish, yield. `false` once cancelled.
    fn step(&mut self) -> bool {
        let payload = match self.queue.take(&self.cancel) {
            Ok(payload) => payload,
            Err(_) => return false,
        };

        match self.publisher.publish(&payload) {
            Ok(()) => self.report.published += 1,
            Err(_e) => {
                self.report.failed += 1;
                log_warn!(
                    "{} status from {} not published: {}",
                    payload.level,
                    payload.name,
                    _e
                );
            }
        }

        if !self.yield_interval.is_zero() {
            thread::sleep(self.yield_interval);
        }
        true
    }
}

/// Publisher that records payloads in memory
///
/// Clones share the record, so tests can keep a clone for inspection.
#[derive(Debug, Clone, Default)]
pub struct MemoryPublisher {
    published: Arc<Mutex<Vec<AlertPayload>>>,
    fail: Arc<Mutex<bool>>,
}

impl MemoryPublisher {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent publishes fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        *lock(&self.fail) = failing;
    }

    /// Everything published so far, in order
    pub fn published(&self) -> Vec<AlertPayload> {
        lock(&self.published).clone()
    }

    /// Number of payloads published
    pub fn count(&self) -> usize {
        lock(&self.published).len()
    }
}

impl Publisher for MemoryPublisher {
    fn publish(&mut self, payload: &AlertPayload) -> RcResult<()> {
        if *lock(&self.fail) {
            return Err(RcError::Publish("memory publisher set to fail".into()));
        }
        lock(&self.published).push(payload.clone());
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
