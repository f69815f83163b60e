//! Node wiring: one RC circuit, one publish thread
//!
//! `RcTimeNode::start` builds the pieces from a [`NodeConfig`] and spawns the
//! publish thread. That thread runs setup first:
//!
//! 1. Load the alert lines (falling back, never failing)
//! 2. Capture the timing baseline from the node clock
//! 3. Provision the output high, attach the edge monitor, drive the output low
//!
//! `start` waits for setup to finish and returns its error if it failed, so
//! a returned [`NodeHandle`] always has an armed circuit behind it.
//!
//! The GPIO controller moves into the publish thread. Both lines stay
//! provisioned while the loop runs and are released once it exits. A failed
//! setup releases whatever it had provisioned before `start` returns.
//!
//! Edges are stamped with the node clock when the monitor sees them, so the
//! baseline and every interval share one origin whatever the controller
//! reports.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::alert::{AlertComposer, AlertLines, AlertPayload};
use crate::cancel::CancelToken;
use crate::config::NodeConfig;
use crate::detector::AnomalyDetector;
use crate::driver::{CircuitDriver, CircuitPins};
use crate::errors::{RcError, RcResult};
use crate::gpio::{EdgeListener, GpioController};
use crate::monitor::EdgeMonitor;
use crate::publish::{LoopReport, PublishLoop, Publisher};
use crate::queue::EventQueue;
use crate::time::{MonotonicClock, TimeSource};
use crate::timing::EdgeTimer;

/// Unstarted node
pub struct RcTimeNode<G, P> {
    config: NodeConfig,
    gpio: G,
    publisher: P,
    clock: Arc<dyn TimeSource>,
}

impl<G, P> RcTimeNode<G, P>
where
    G: GpioController + Send + 'static,
    P: Publisher + 'static,
{
    /// Create a node using the monotonic clock
    pub fn new(config: NodeConfig, gpio: G, publisher: P) -> Self {
        Self {
            config,
            gpio,
            publisher,
            clock: Arc::new(MonotonicClock::new()),
        }
    }

    /// Use a different clock for the baseline and for stamping edges
    pub fn with_clock(mut self, clock: Arc<dyn TimeSource>) -> Self {
        self.clock = clock;
        self
    }

    /// Validate config, spawn the publish thread, wait for setup
    pub fn start(self) -> RcResult<NodeHandle> {
        self.config.validate()?;

        let RcTimeNode {
            config,
            mut gpio,
            publisher,
            clock,
        } = self;

        let pins = config.circuit_pins()?;
        let queue = Arc::new(EventQueue::with_capacity(config.queue_capacity));
        let cancel = CancelToken::new();
        let (ready_tx, ready_rx) = mpsc::sync_channel::<RcResult<()>>(1);

        let thread = {
            let queue = Arc::clone(&queue);
            let cancel = cancel.clone();
            thread::Builder::new()
                .name(format!("{}-publish", config.node_name))
                .spawn(move || {
                    let mut publish_loop = PublishLoop::new(Arc::clone(&queue), publisher, cancel.clone())
                        .with_yield_interval(config.publish_yield());

                    let mut armed = false;
                    let result = publish_loop.run_with_setup(|| {
                        let outcome = arm_circuit(&config, &mut gpio, pins, clock, queue, cancel);
                        armed = outcome.is_ok();
                        // start() may have given up waiting; nothing to do then
                        let _ = ready_tx.send(outcome.clone());
                        outcome
                    });

                    if armed {
                        if let Err(_e) = pins.release(&mut gpio) {
                            log_warn!("{} could not release circuit lines: {}", config.node_name, _e);
                        }
                    }
                    result
                })
                .map_err(|e| RcError::Setup(e.to_string()))?
        };

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(NodeHandle {
                cancel,
                queue,
                thread,
            }),
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(RcError::Setup("publish thread exited before setup".into()))
            }
        }
    }
}

/// Setup phase body: alert lines, baseline, driver, listener
fn arm_circuit<G>(
    config: &NodeConfig,
    gpio: &mut G,
    pins: CircuitPins,
    clock: Arc<dyn TimeSource>,
    queue: Arc<EventQueue<AlertPayload>>,
    cancel: CancelToken,
) -> RcResult<()>
where
    G: GpioController,
{
    let lines = AlertLines::from_source(config.alert_file.as_deref(), &config.comment_delimiter);
    let composer = AlertComposer::new(lines).with_name(config.node_name.clone());
    let detector = AnomalyDetector::new(config.threshold_ms);
    let baseline = clock.now();

    if u64::from(clock.precision_ms()) > config.threshold_ms {
        log_warn!(
            "clock precision {} ms is coarser than the {} ms threshold",
            clock.precision_ms(),
            config.threshold_ms
        );
    }
    if clock.is_wall_clock() {
        log_warn!("{} times edges on the wall clock; adjustments skew intervals", config.node_name);
    }

    CircuitDriver::setup(gpio, pins, config.rearm, move |driver| {
        let monitor = EdgeMonitor::new(EdgeTimer::new(baseline), detector, composer, queue, cancel)
            .with_clock(clock)
            .with_driver(driver);
        Box::new(monitor) as Box<dyn EdgeListener>
    })?;

    log_info!(
        "{} armed at {} ms, threshold {} ms, publishing on {}",
        config.node_name,
        baseline,
        config.threshold_ms,
        config.status_topic
    );
    Ok(())
}

/// Running node
pub struct NodeHandle {
    cancel: CancelToken,
    queue: Arc<EventQueue<AlertPayload>>,
    thread: JoinHandle<RcResult<LoopReport>>,
}

impl NodeHandle {
    /// Alerts waiting to be published
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Cancel the loop and wait for it
    ///
    /// Alerts still queued at this point are discarded and counted in the
    /// report.
    pub fn shutdown(self) -> RcResult<LoopReport> {
        self.cancel.cancel();
        self.thread
            .join()
            .map_err(|_| RcError::Setup("publish thread panicked".into()))?
    }
}
