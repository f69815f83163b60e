//! In-memory GPIO for tests and bench runs
//!
//! `SimulatedGpio` behaves like a platform controller without hardware:
//!
//! 1. **Unit Testing**: fire edges at chosen timestamps
//! 2. **Replay**: feed recorded edge timestamps back through the monitor
//! 3. **Inspection**: every output write is logged with its pin and level
//!
//! Clones share state, so a test can hand one clone to the node and keep
//! another to inject edges and inspect writes.
//!
//! ```rust
//! use rcguard_core::gpio::{
//!     EdgeEvent, GpioController, PinState, PullResistance, SimulatedGpio, WiringPin,
//! };
//!
//! let mut gpio = SimulatedGpio::new();
//! let board = gpio.clone();
//!
//! gpio.provision_input(WiringPin(3), PullResistance::PullUp, Box::new(|event: EdgeEvent| {
//!     println!("edge at {}", event.timestamp);
//! })).unwrap();
//!
//! assert!(board.fire_edge(WiringPin(3), PinState::Low, 1000));
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{
    EdgeEvent, EdgeListener, GpioController, GpioError, GpioResult, OutputLine, PinState,
    PullResistance, WiringPin,
};
use crate::time::Timestamp;

#[derive(Default)]
struct SimState {
    inputs: HashMap<WiringPin, InputSlot>,
    outputs: HashMap<WiringPin, PinState>,
    writes: Vec<(WiringPin, PinState)>,
    failing_outputs: Vec<WiringPin>,
}

struct InputSlot {
    pull: PullResistance,
    /// Taken out while the listener runs so it may touch outputs
    listener: Option<Box<dyn EdgeListener>>,
}

/// Simulated GPIO controller
#[derive(Clone, Default)]
pub struct SimulatedGpio {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedGpio {
    /// Create an empty controller
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write to `pin` fail with a hardware fault
    pub fn fail_writes_on(&self, pin: WiringPin) {
        self.lock().failing_outputs.push(pin);
    }

    /// Deliver an edge to the listener on `pin`
    ///
    /// Runs the listener on the calling thread and returns `false` when no
    /// listener is registered for the pin.
    pub fn fire_edge(&self, pin: WiringPin, state: PinState, timestamp: Timestamp) -> bool {
        let listener = self
            .lock()
            .inputs
            .get_mut(&pin)
            .and_then(|slot| slot.listener.take());

        let Some(mut listener) = listener else {
            return false;
        };

        listener.on_edge(EdgeEvent { pin, state, timestamp });

        if let Some(slot) = self.lock().inputs.get_mut(&pin) {
            slot.listener = Some(listener);
        }
        true
    }

    /// Whether `pin` has an input listener
    pub fn has_listener(&self, pin: WiringPin) -> bool {
        self.lock()
            .inputs
            .get(&pin)
            .map_or(false, |slot| slot.listener.is_some())
    }

    /// Pull setting an input was provisioned with
    pub fn input_pull(&self, pin: WiringPin) -> Option<PullResistance> {
        self.lock().inputs.get(&pin).map(|slot| slot.pull)
    }

    /// Current level of an output
    pub fn output_state(&self, pin: WiringPin) -> Option<PinState> {
        self.lock().outputs.get(&pin).copied()
    }

    /// Every level written to any output, in order (provisioning included)
    pub fn writes(&self) -> Vec<(WiringPin, PinState)> {
        self.lock().writes.clone()
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl GpioController for SimulatedGpio {
    type Output = SimulatedOutput;

    fn provision_input(
        &mut self,
        pin: WiringPin,
        pull: PullResistance,
        listener: Box<dyn EdgeListener>,
    ) -> GpioResult<()> {
        let mut state = self.lock();
        if state.inputs.contains_key(&pin) || state.outputs.contains_key(&pin) {
            return Err(GpioError::AlreadyProvisioned { pin });
        }
        state.inputs.insert(
            pin,
            InputSlot {
                pull,
                listener: Some(listener),
            },
        );
        Ok(())
    }

    fn provision_output(&mut self, pin: WiringPin, initial: PinState) -> GpioResult<SimulatedOutput> {
        let mut state = self.lock();
        if state.inputs.contains_key(&pin) || state.outputs.contains_key(&pin) {
            return Err(GpioError::AlreadyProvisioned { pin });
        }
        state.outputs.insert(pin, initial);
        state.writes.push((pin, initial));
        Ok(SimulatedOutput {
            pin,
            level: initial,
            gpio: self.clone(),
        })
    }

    fn release(&mut self, pin: WiringPin) -> GpioResult<()> {
        let slot = {
            let mut state = self.lock();
            state.outputs.remove(&pin);
            state.inputs.remove(&pin)
        };
        // listener may own an output handle; drop it with the lock released
        drop(slot);
        Ok(())
    }
}

/// Output handle from [`SimulatedGpio`]
pub struct SimulatedOutput {
    pin: WiringPin,
    level: PinState,
    gpio: SimulatedGpio,
}

impl OutputLine for SimulatedOutput {
    fn set_state(&mut self, level: PinState) -> GpioResult<()> {
        let mut state = self.gpio.lock();
        if state.failing_outputs.contains(&self.pin) {
            return Err(GpioError::Hardware {
                pin: self.pin,
                reason: "simulated write failure".into(),
            });
        }
        let Some(current) = state.outputs.get_mut(&self.pin) else {
            return Err(GpioError::Hardware {
                pin: self.pin,
                reason: "line released".into(),
            });
        };
        *current = level;
        state.writes.push((self.pin, level));
        self.level = level;
        Ok(())
    }

    fn state(&self) -> PinState {
        self.level
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[test]
    fn edges_reach_listener() {
        let mut gpio = SimulatedGpio::new();
        let seen = Arc::new(AtomicU64::new(0));
        let sink = Arc::clone(&seen);

        gpio.provision_input(
            WiringPin(3),
            PullResistance::PullUp,
            Box::new(move |event: EdgeEvent| sink.store(event.timestamp, Ordering::SeqCst)),
        )
        .unwrap();

        assert!(gpio.fire_edge(WiringPin(3), PinState::Low, 1234));
        assert_eq!(seen.load(Ordering::SeqCst), 1234);
        assert!(!gpio.fire_edge(WiringPin(9), PinState::Low, 1));
        assert_eq!(gpio.input_pull(WiringPin(3)), Some(PullResistance::PullUp));
    }

    #[test]
    fn output_writes_are_recorded() {
        let mut gpio = SimulatedGpio::new();
        let mut out = gpio.provision_output(WiringPin(4), PinState::High).unwrap();
        out.set_state(PinState::Low).unwrap();

        assert_eq!(out.state(), PinState::Low);
        assert_eq!(gpio.output_state(WiringPin(4)), Some(PinState::Low));
        assert_eq!(
            gpio.writes(),
            vec![(WiringPin(4), PinState::High), (WiringPin(4), PinState::Low)]
        );
    }

    #[test]
    fn double_provision_fails() {
        let mut gpio = SimulatedGpio::new();
        gpio.provision_output(WiringPin(4), PinState::High).unwrap();
        assert!(matches!(
            gpio.provision_output(WiringPin(4), PinState::Low),
            Err(GpioError::AlreadyProvisioned { .. })
        ));
    }

    #[test]
    fn released_pins_go_quiet() {
        let mut gpio = SimulatedGpio::new();
        let mut out = gpio.provision_output(WiringPin(4), PinState::High).unwrap();
        gpio.provision_input(WiringPin(3), PullResistance::PullUp, Box::new(|_event: EdgeEvent| {}))
            .unwrap();

        gpio.release(WiringPin(3)).unwrap();
        gpio.release(WiringPin(4)).unwrap();
        gpio.release(WiringPin(9)).unwrap();

        assert!(!gpio.has_listener(WiringPin(3)));
        assert!(!gpio.fire_edge(WiringPin(3), PinState::Low, 10));
        assert_eq!(gpio.output_state(WiringPin(4)), None);
        assert!(out.set_state(PinState::Low).is_err());
        assert_eq!(gpio.output_state(WiringPin(4)), None);
        // pins can be provisioned again
        assert!(gpio.provision_output(WiringPin(3), PinState::Low).is_ok());
    }

    #[test]
    fn listener_may_drive_outputs() {
        let mut gpio = SimulatedGpio::new();
        let mut out = gpio.provision_output(WiringPin(4), PinState::High).unwrap();

        gpio.provision_input(
            WiringPin(3),
            PullResistance::PullUp,
            Box::new(move |_event: EdgeEvent| {
                out.set_state(PinState::Low).unwrap();
            }),
        )
        .unwrap();

        assert!(gpio.fire_edge(WiringPin(3), PinState::Low, 5));
        assert_eq!(gpio.output_state(WiringPin(4)), Some(PinState::Low));
    }
}
