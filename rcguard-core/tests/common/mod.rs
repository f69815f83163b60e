//! Shared fixtures for integration tests
//!
//! `TestRig` bundles a simulated controller, a mock clock and an in-memory
//! publisher. The rig keeps shared clones of each so tests can drive edges
//! and inspect what the node published.

#![allow(dead_code)]

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use rcguard_core::{
    gpio::{PinState, SimulatedGpio, WiringPin},
    publish::MemoryPublisher,
    time::{MockTimeSource, TimeSource},
    NodeConfig, NodeHandle, RcResult, RcTimeNode,
};

/// Comparator input for the default config (cobbler 22)
pub const INPUT: WiringPin = WiringPin(3);
/// Charge line for the default config (cobbler 23)
pub const OUTPUT: WiringPin = WiringPin(4);

/// Simulated hardware around one node
pub struct TestRig {
    pub gpio: SimulatedGpio,
    pub clock: MockTimeSource,
    pub publisher: MemoryPublisher,
}

impl TestRig {
    pub fn new() -> Self {
        Self {
            gpio: SimulatedGpio::new(),
            clock: MockTimeSource::new(0),
            publisher: MemoryPublisher::new(),
        }
    }

    /// Start a node wired to this rig
    pub fn start(&self, config: NodeConfig) -> RcResult<NodeHandle> {
        let clock: Arc<dyn TimeSource> = Arc::new(self.clock.clone());
        RcTimeNode::new(config, self.gpio.clone(), self.publisher.clone())
            .with_clock(clock)
            .start()
    }

    /// Advance the clock to each timestamp and fire a comparator edge there
    pub fn edges_at(&self, timestamps: &[u64]) {
        for &t in timestamps {
            self.clock.set(t);
            assert!(
                self.gpio.fire_edge(INPUT, PinState::Low, t),
                "no listener on comparator input"
            );
        }
    }
}

/// Poll `condition` until it holds or `timeout` passes
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    condition()
}
