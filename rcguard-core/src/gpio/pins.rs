//! Cobbler -> WiringPi pin table
//!
//! The breakout board labels pins by their BCM number; the GPIO library
//! addresses them by WiringPi number. The table is fixed configuration data,
//! built once on first use and never mutated.
//!
//! ```text
//! cobbler:   17  18  22  23  24  25   4
//! wiringpi:   0   1   3   4   5   6   7
//! ```

use core::fmt;
use std::collections::HashMap;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

use super::{GpioError, GpioResult};

/// Pin number as printed on the cobbler breakout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CobblerPin(pub u8);

/// Pin number in WiringPi numbering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WiringPin(pub u8);

impl fmt::Display for CobblerPin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cobbler {}", self.0)
    }
}

impl fmt::Display for WiringPin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GPIO {:02}", self.0)
    }
}

lazy_static! {
    static ref COBBLER_TO_WIRING: HashMap<CobblerPin, WiringPin> = {
        let mut m = HashMap::new();
        m.insert(CobblerPin(18), WiringPin(1));
        m.insert(CobblerPin(23), WiringPin(4));
        m.insert(CobblerPin(24), WiringPin(5));
        m.insert(CobblerPin(25), WiringPin(6));
        m.insert(CobblerPin(4), WiringPin(7));
        m.insert(CobblerPin(17), WiringPin(0));
        m.insert(CobblerPin(22), WiringPin(3));
        m
    };
}

/// Translate a cobbler pin to its WiringPi number
pub fn cobbler_to_wiring(pin: CobblerPin) -> GpioResult<WiringPin> {
    COBBLER_TO_WIRING
        .get(&pin)
        .copied()
        .ok_or(GpioError::UnmappedPin { pin: pin.0 })
}

/// Every cobbler pin the table knows, ascending
pub fn mapped_pins() -> Vec<CobblerPin> {
    let mut pins: Vec<_> = COBBLER_TO_WIRING.keys().copied().collect();
    pins.sort();
    pins
}
