//! Charge/discharge cycle control
//!
//! ## Circuit
//!
//! Two lines are used so slow software switching does not skew the reading:
//!
//! ```text
//!   output (cobbler 23) ──R──┬── comparator ──> input (cobbler 22, pull-up)
//!                            C
//!                            ┴
//! ```
//!
//! Driving the output high charges the capacitor; driving it low lets it
//! discharge through R until the comparator trips and the input line
//! changes state. The time from "output low" to "input edge" is the RC
//! discharge interval.
//!
//! ## Cycle State Machine
//!
//! ```text
//! Idle ──setup──> Charging ──begin_discharge──> Discharging ──edge──> Measured
//!                    ^                              ^                    │
//!                    │ Pulse                        │ Implicit           │
//!                    └──────── rearm ───────────────┴────────────────────┘
//! ```
//!
//! - `RearmPolicy::Implicit`: the output is driven low once at setup. After
//!   each edge the driver simply returns to `Discharging`; the comparator
//!   and external circuitry decide when the next edge comes.
//! - `RearmPolicy::Pulse`: after each edge the output goes high then low,
//!   recharging the capacitor and starting a fresh discharge.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::gpio::{EdgeListener, GpioController, GpioResult, OutputLine, PinState, PullResistance, WiringPin};

/// Where the circuit is in its measurement cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    /// Lines not provisioned yet
    Idle,
    /// Output high, capacitor charging
    Charging,
    /// Output low, waiting for the comparator edge
    Discharging,
    /// Edge seen, re-arm pending
    Measured,
}

/// What to do with the output after each measured edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RearmPolicy {
    /// Leave the output low; the hardware re-triggers on its own
    #[default]
    Implicit,
    /// Drive the output high then low after every edge
    Pulse,
}

/// Input/output line pair of one RC circuit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitPins {
    /// Comparator input
    pub input: WiringPin,
    /// Charge/discharge output
    pub output: WiringPin,
}

impl CircuitPins {
    /// Release both lines, input first so no edge arrives mid-teardown
    ///
    /// Both releases are attempted; the first failure is returned.
    pub fn release<G: GpioController>(self, gpio: &mut G) -> GpioResult<()> {
        let input = gpio.release(self.input);
        let output = gpio.release(self.output);
        input.and(output)
    }
}

struct DriverState<O> {
    output: O,
    phase: CyclePhase,
    policy: RearmPolicy,
    cycles: u64,
}

/// Drives the output line through the measurement cycle
///
/// Cheap to clone; the edge listener keeps a clone to re-arm after each edge.
pub struct CircuitDriver<O> {
    state: Arc<Mutex<DriverState<O>>>,
}

impl<O> Clone for CircuitDriver<O> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<O: OutputLine> CircuitDriver<O> {
    /// Wrap an already provisioned output line
    ///
    /// The phase follows the line's current level: high means `Charging`,
    /// low means `Discharging`.
    pub fn new(output: O, policy: RearmPolicy) -> Self {
        let phase = if output.state().is_high() {
            CyclePhase::Charging
        } else {
            CyclePhase::Discharging
        };
        Self {
            state: Arc::new(Mutex::new(DriverState {
                output,
                phase,
                policy,
                cycles: 0,
            })),
        }
    }

    /// Provision both lines and start the first discharge
    ///
    /// `make_listener` receives a clone of the driver so the edge listener
    /// can call [`CircuitDriver::complete_cycle`].
    ///
    /// Order matters: output high (charging), then the input listener, then
    /// output low. Registering the listener before the discharge starts means
    /// the first edge cannot be missed.
    ///
    /// On failure every line this call provisioned is released again.
    pub fn setup<G, F>(
        gpio: &mut G,
        pins: CircuitPins,
        policy: RearmPolicy,
        make_listener: F,
    ) -> GpioResult<Self>
    where
        G: GpioController<Output = O>,
        F: FnOnce(CircuitDriver<O>) -> Box<dyn EdgeListener>,
    {
        let output = gpio.provision_output(pins.output, PinState::High)?;
        let driver = Self::new(output, policy);

        if let Err(e) = gpio.provision_input(pins.input, PullResistance::PullUp, make_listener(driver.clone())) {
            release_after_failure(gpio.release(pins.output));
            return Err(e);
        }
        if let Err(e) = driver.begin_discharge() {
            release_after_failure(pins.release(gpio));
            return Err(e);
        }

        log_info!(
            "circuit armed: input {} output {} rearm {:?}",
            pins.input,
            pins.output,
            policy
        );
        Ok(driver)
    }

    /// Drive the output low and wait for the comparator
    pub fn begin_discharge(&self) -> GpioResult<()> {
        let mut state = self.lock();
        state.output.set_state(PinState::Low)?;
        state.phase = CyclePhase::Discharging;
        Ok(())
    }

    /// Record a measured edge and re-arm per policy
    ///
    /// Returns the number of completed cycles.
    pub fn complete_cycle(&self) -> GpioResult<u64> {
        let mut state = self.lock();
        state.phase = CyclePhase::Measured;
        state.cycles += 1;

        match state.policy {
            RearmPolicy::Implicit => {
                state.phase = CyclePhase::Discharging;
            }
            RearmPolicy::Pulse => {
                state.output.set_state(PinState::High)?;
                state.phase = CyclePhase::Charging;
                state.output.set_state(PinState::Low)?;
                state.phase = CyclePhase::Discharging;
            }
        }

        Ok(state.cycles)
    }

    /// Current phase
    pub fn phase(&self) -> CyclePhase {
        self.lock().phase
    }

    fn lock(&self) -> MutexGuard<'_, DriverState<O>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn release_after_failure(result: GpioResult<()>) {
    if let Err(_e) = result {
        log_warn!("release after failed setup: {}", _e);
    }
}
