//! Node configuration
//!
//! Everything has a default that reproduces the stock circuit: comparator
//! on cobbler 22, charge line on cobbler 23, 25 ms threshold, 1024-slot
//! queue, alerts on `robocore/status`.
//!
//! Two ways to override:
//!
//! - Startup remappings in the `__name:=value` form, e.g.
//!   `__alertfile:=/etc/rcguard/alert.txt`
//! - A JSON file with any subset of the fields
//!
//! ```rust
//! use rcguard_core::NodeConfig;
//!
//! let config = NodeConfig::from_remappings(["__alertfile:=/tmp/alert.txt", "other"]);
//! assert_eq!(config.alert_file.as_deref(), Some(std::path::Path::new("/tmp/alert.txt")));
//! assert_eq!(config.threshold_ms, 25);
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::constants::{
    ALERT_FILE_REMAP, DEFAULT_COMMENT_DELIMITER, DEFAULT_INPUT_PIN, DEFAULT_NODE_NAME,
    DEFAULT_OUTPUT_PIN, DEFAULT_PUBLISH_YIELD_MS, DEFAULT_QUEUE_CAPACITY, DEFAULT_STATUS_TOPIC,
    DEFAULT_THRESHOLD_MS, NODE_NAME_REMAP,
};
use crate::driver::{CircuitPins, RearmPolicy};
use crate::errors::{RcError, RcResult};
use crate::gpio::pins::mapped_pins;
use crate::gpio::{cobbler_to_wiring, CobblerPin};

/// Runtime configuration for one RC timing node
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Node name, used as the alert `name`
    pub node_name: String,
    /// Bus channel for alerts
    pub status_topic: String,
    /// Comparator input (cobbler numbering)
    pub input_pin: CobblerPin,
    /// Charge/discharge output (cobbler numbering)
    pub output_pin: CobblerPin,
    /// Allowed deviation from the running average
    pub threshold_ms: u64,
    /// Hand-off queue capacity
    pub queue_capacity: usize,
    /// Alert annotation file; `None` uses the default line
    pub alert_file: Option<PathBuf>,
    /// Prefix marking comment lines in the alert file
    pub comment_delimiter: String,
    /// Pause after each publish
    pub publish_yield_ms: u64,
    /// Output handling after each measured edge
    pub rearm: RearmPolicy,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node_name: DEFAULT_NODE_NAME.to_string(),
            status_topic: DEFAULT_STATUS_TOPIC.to_string(),
            input_pin: CobblerPin(DEFAULT_INPUT_PIN),
            output_pin: CobblerPin(DEFAULT_OUTPUT_PIN),
            threshold_ms: DEFAULT_THRESHOLD_MS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            alert_file: None,
            comment_delimiter: DEFAULT_COMMENT_DELIMITER.to_string(),
            publish_yield_ms: DEFAULT_PUBLISH_YIELD_MS,
            rearm: RearmPolicy::default(),
        }
    }
}

impl NodeConfig {
    /// Defaults overridden by `__name:=value` startup arguments
    ///
    /// Recognized: `__alertfile`, `__name`. Anything else is ignored.
    pub fn from_remappings<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut config = Self::default();
        for arg in args {
            let Some((key, value)) = parse_remapping(arg.as_ref()) else {
                continue;
            };
            match key {
                ALERT_FILE_REMAP => config.alert_file = Some(PathBuf::from(value)),
                NODE_NAME_REMAP => config.node_name = value.to_string(),
                _ => {}
            }
        }
        config
    }

    /// Load from a JSON file; missing fields keep their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> RcResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| RcError::InvalidConfig {
            field: "config_file",
            reason: format!("{}: {}", path.display(), e),
        })?;
        Self::from_json_str(&text)
    }

    /// Parse from JSON text
    pub fn from_json_str(text: &str) -> RcResult<Self> {
        serde_json::from_str(text).map_err(|e| RcError::InvalidConfig {
            field: "config_file",
            reason: e.to_string(),
        })
    }

    /// Reject configurations the node cannot run with
    pub fn validate(&self) -> RcResult<()> {
        if self.queue_capacity == 0 {
            return Err(invalid("queue_capacity", "must be at least 1"));
        }
        if self.comment_delimiter.is_empty() {
            return Err(invalid("comment_delimiter", "must not be empty"));
        }
        if self.input_pin == self.output_pin {
            return Err(invalid("output_pin", "must differ from input_pin"));
        }
        for (field, pin) in [("input_pin", self.input_pin), ("output_pin", self.output_pin)] {
            if cobbler_to_wiring(pin).is_err() {
                let known: Vec<String> = mapped_pins().iter().map(|p| p.0.to_string()).collect();
                return Err(RcError::InvalidConfig {
                    field,
                    reason: format!("{} has no mapping, expected one of {}", pin, known.join(", ")),
                });
            }
        }
        Ok(())
    }

    /// Input/output pins translated to platform numbering
    pub fn circuit_pins(&self) -> RcResult<CircuitPins> {
        Ok(CircuitPins {
            input: cobbler_to_wiring(self.input_pin)?,
            output: cobbler_to_wiring(self.output_pin)?,
        })
    }

    /// Publish pause as a `Duration`
    pub fn publish_yield(&self) -> Duration {
        Duration::from_millis(self.publish_yield_ms)
    }
}

fn invalid(field: &'static str, reason: &str) -> RcError {
    RcError::InvalidConfig {
        field,
        reason: reason.to_string(),
    }
}

/// Split `__key:=value`; `None` for anything else
fn parse_remapping(arg: &str) -> Option<(&str, &str)> {
    if !arg.starts_with("__") {
        return None;
    }
    arg.split_once(":=")
}
