//! GPIO capability consumed by the circuit driver
//!
//! The monitor never touches hardware directly. It needs three things from
//! the platform, expressed as traits here:
//!
//! 1. Provision an input line (with pull resistor) and get called back on
//!    every edge: [`GpioController::provision_input`] + [`EdgeListener`]
//! 2. Provision an output line in a known initial state:
//!    [`GpioController::provision_output`]
//! 3. Drive that output afterwards: [`OutputLine::set_state`]
//! 4. Give both lines back on shutdown or failed setup:
//!    [`GpioController::release`]
//!
//! Pins are named by their cobbler (breakout board) number and translated
//! through a fixed table to the platform's WiringPi numbering; see [`pins`].
//!
//! ## Callback Contract
//!
//! Edge listeners run in whatever context the platform delivers edges from,
//! possibly an interrupt-service thread. They must return quickly. The only
//! blocking step allowed is the bounded queue hand-off.

pub mod pins;
pub mod sim;

use core::fmt;

use thiserror_no_std::Error;

use crate::time::Timestamp;

pub use pins::{cobbler_to_wiring, CobblerPin, WiringPin};
pub use sim::SimulatedGpio;

/// Result type for GPIO operations
pub type GpioResult<T> = Result<T, GpioError>;

/// GPIO provisioning and write failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GpioError {
    /// Cobbler pin has no entry in the pin table
    #[error("Cobbler pin {pin} has no platform mapping")]
    UnmappedPin {
        /// Cobbler pin number
        pin: u8,
    },

    /// Pin was already provisioned by this controller
    #[error("Pin {pin} already provisioned")]
    AlreadyProvisioned {
        /// Platform pin
        pin: WiringPin,
    },

    /// Platform reported a failure
    #[error("Hardware fault on pin {pin}: {reason}")]
    Hardware {
        /// Platform pin
        pin: WiringPin,
        /// Platform message
        reason: String,
    },
}

/// Logical level of a digital line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PinState {
    /// Logic 0
    Low,
    /// Logic 1
    High,
}

impl PinState {
    /// True for `High`
    pub const fn is_high(self) -> bool {
        matches!(self, PinState::High)
    }
}

impl fmt::Display for PinState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PinState::Low => "LOW",
            PinState::High => "HIGH",
        })
    }
}

/// Internal pull resistor setting for inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullResistance {
    /// Floating input
    Off,
    /// Pulled to logic 1
    PullUp,
    /// Pulled to logic 0
    PullDown,
}

/// One transition of an input line
///
/// Created by the platform, consumed once by the edge listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeEvent {
    /// Line that changed
    pub pin: WiringPin,
    /// Level after the change
    pub state: PinState,
    /// When the change was seen (same clock as the node baseline)
    pub timestamp: Timestamp,
}

/// Receives edge notifications for a provisioned input
pub trait EdgeListener: Send {
    /// Called once per edge, serially
    fn on_edge(&mut self, event: EdgeEvent);
}

impl<F> EdgeListener for F
where
    F: FnMut(EdgeEvent) + Send,
{
    fn on_edge(&mut self, event: EdgeEvent) {
        self(event)
    }
}

/// A provisioned output line
pub trait OutputLine: Send {
    /// Drive the line
    fn set_state(&mut self, state: PinState) -> GpioResult<()>;

    /// Last level written
    fn state(&self) -> PinState;
}

/// Platform GPIO provider
pub trait GpioController {
    /// Handle type for provisioned outputs
    type Output: OutputLine + 'static;

    /// Provision an input line and register its edge listener
    fn provision_input(
        &mut self,
        pin: WiringPin,
        pull: PullResistance,
        listener: Box<dyn EdgeListener>,
    ) -> GpioResult<()>;

    /// Provision an output line driven to `initial`
    fn provision_output(&mut self, pin: WiringPin, initial: PinState) -> GpioResult<Self::Output>;

    /// Hand a provisioned line back to the platform
    ///
    /// An input stops delivering edges and its listener is dropped. Releasing
    /// a pin that is not provisioned does nothing.
    fn release(&mut self, pin: WiringPin) -> GpioResult<()>;
}
