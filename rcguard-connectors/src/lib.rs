//! Message Bus Connectors for RcGuard Status Alerts
//!
//! ## Overview
//!
//! The core crate hands every anomaly alert to a `Publisher`. This crate
//! supplies the bus side of that seam:
//!
//! ```text
//! PublishLoop ──AlertPayload──> BusPublisher ──JSON bytes──> Connector ──> broker
//! ```
//!
//! - [`Connector`] moves raw bytes onto a topic. It knows nothing about alerts.
//! - [`BusPublisher`] serializes an `AlertPayload` into the status message
//!   (`name`, `level`, `message`, `values[{key, value}]`) and sends it on the
//!   configured status topic.
//!
//! ## Connectors
//!
//! | Connector         | Feature | Use                                  |
//! |-------------------|---------|--------------------------------------|
//! | `MqttConnector`   | `mqtt`  | Deployed nodes talking to a broker   |
//! | `MemoryConnector` | always  | Tests and dry runs                   |
//!
//! Delivery is fire-and-forget. A connector reports a failed send, the
//! publish loop counts it, nothing is retried here. Reconnection is the
//! connector's own business.
//!
//! ## Example Usage
//!
//! ```rust
//! use rcguard_connectors::{BusPublisher, MemoryConnector};
//! use rcguard_core::{AlertComposer, AlertLines, Publisher};
//!
//! let bus = MemoryConnector::new();
//! let mut publisher = BusPublisher::new(bus.clone(), "robocore/status");
//!
//! let alert = AlertComposer::new(AlertLines::fallback()).compose();
//! publisher.publish(&alert).unwrap();
//!
//! assert_eq!(bus.messages()[0].topic, "robocore/status");
//! ```

pub mod bus;
pub mod memory;

#[cfg(feature = "mqtt")]
pub mod mqtt;

// Re-export common types
pub use bus::BusPublisher;
pub use memory::{MemoryConnector, SentMessage};

#[cfg(feature = "mqtt")]
pub use mqtt::{MqttConfig, MqttConnector, MqttError, QoS};

use thiserror::Error;

/// Common connector errors
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("Not connected")]
    NotConnected,

    #[error("Protocol error: {0}")]
    ProtocolError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Trait for all bus connectors
pub trait Connector {
    type Error;

    /// Send one message on `topic`
    fn send(&mut self, topic: &str, data: &[u8]) -> Result<(), Self::Error>;

    /// Check if connected
    fn is_connected(&self) -> bool;

    /// Get connection statistics
    fn stats(&self) -> ConnectionStats {
        ConnectionStats::default()
    }
}

/// Connection statistics common to all connectors
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConnectionStats {
    /// Total messages sent successfully
    pub messages_sent: u64,
    /// Total messages failed to send
    pub messages_failed: u64,
    /// Total bytes sent
    pub bytes_sent: u64,
    /// Number of reconnections
    pub reconnections: u32,
    /// Last error message
    pub last_error: Option<String>,
}

impl ConnectionStats {
    pub(crate) fn record_sent(&mut self, bytes: usize) {
        self.messages_sent += 1;
        self.bytes_sent += bytes as u64;
    }

    pub(crate) fn record_failure(&mut self, error: impl ToString) {
        self.messages_failed += 1;
        self.last_error = Some(error.to_string());
    }
}
