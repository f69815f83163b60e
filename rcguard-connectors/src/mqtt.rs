//! MQTT connector for RcGuard
//!
//! Built on the synchronous `rumqttc` client. `MqttConnector::connect`
//! spawns one thread that drives the connection event loop; `send` only
//! enqueues a publish request and never waits for the broker.
//!
//! ## Connection Handling
//!
//! ```text
//! connect() ──> [event thread] ──ConnAck──> connected
//!                    │  ↑
//!               error│  │retry after reconnect_delay
//!                    ↓  │
//!               disconnected
//! ```
//!
//! Requests enqueued while disconnected are flushed once the broker accepts
//! the connection again. A full request queue fails the send immediately.
//!
//! ```rust,no_run
//! use rcguard_connectors::{BusPublisher, MqttConfig, MqttConnector, QoS};
//!
//! let config = MqttConfig::from_address("broker.local:1883")?
//!     .client_id("gpiotrigger")
//!     .keep_alive_secs(30)
//!     .qos(QoS::AtLeastOnce);
//!
//! let publisher = BusPublisher::new(MqttConnector::connect(config)?, "robocore/status");
//! # Ok::<(), rcguard_connectors::MqttError>(())
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use rumqttc::{Client, ConnectReturnCode, Connection, Event, MqttOptions, Packet};
use thiserror::Error;

use crate::{ConnectionStats, Connector, ConnectorError};

pub use rumqttc::QoS;

/// MQTT-specific errors
#[derive(Debug, Error)]
pub enum MqttError {
    /// Client rejected the request (queue full or event loop gone)
    #[error("Client error: {0}")]
    Client(#[from] rumqttc::ClientError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<MqttError> for ConnectorError {
    fn from(err: MqttError) -> Self {
        match err {
            MqttError::Client(e) => ConnectorError::ProtocolError(e.to_string()),
            MqttError::Config(reason) => ConnectorError::ConfigError(reason),
        }
    }
}

/// Broker connection settings
#[derive(Debug, Clone)]
pub struct MqttConfig {
    /// Broker host name or address
    pub host: String,
    /// Broker port
    pub port: u16,
    /// Client identifier presented to the broker
    pub client_id: String,
    /// Keep-alive interval
    pub keep_alive: Duration,
    /// QoS for every publish
    pub qos: QoS,
    /// Ask the broker to retain the last status message
    pub retain: bool,
    /// Optional username/password
    pub credentials: Option<(String, String)>,
    /// Publish requests buffered while the link is down
    pub request_capacity: usize,
    /// Pause between reconnect attempts
    pub reconnect_delay: Duration,
}

impl MqttConfig {
    /// Default port for plain MQTT
    pub const DEFAULT_PORT: u16 = 1883;

    /// Create new configuration for `host` on the default port
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: Self::DEFAULT_PORT,
            client_id: rcguard_core::constants::DEFAULT_NODE_NAME.to_string(),
            keep_alive: Duration::from_secs(60),
            qos: QoS::AtMostOnce,
            retain: false,
            credentials: None,
            request_capacity: 64,
            reconnect_delay: Duration::from_secs(1),
        }
    }

    /// Parse `host` or `host:port`
    pub fn from_address(address: &str) -> Result<Self, MqttError> {
        match address.rsplit_once(':') {
            None => Ok(Self::new(address)),
            Some((host, port)) => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| MqttError::Config(format!("invalid port in '{}'", address)))?;
                Ok(Self::new(host).port(port))
            }
        }
    }

    /// Set broker port
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set client identifier
    pub fn client_id(mut self, id: impl Into<String>) -> Self {
        self.client_id = id.into();
        self
    }

    /// Set keep-alive interval in seconds
    pub fn keep_alive_secs(mut self, secs: u64) -> Self {
        self.keep_alive = Duration::from_secs(secs);
        self
    }

    /// Set QoS for every publish
    pub fn qos(mut self, qos: QoS) -> Self {
        self.qos = qos;
        self
    }

    /// Set the retain flag on status messages
    pub fn retain(mut self, retain: bool) -> Self {
        self.retain = retain;
        self
    }

    /// Authenticate with username and password
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some((username.into(), password.into()));
        self
    }

    /// Set how many publish requests may wait while the link is down
    pub fn request_capacity(mut self, capacity: usize) -> Self {
        self.request_capacity = capacity;
        self
    }

    /// Set pause between reconnect attempts
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Reject settings the client cannot run with
    pub fn validate(&self) -> Result<(), MqttError> {
        if self.host.is_empty() {
            return Err(MqttError::Config("host must not be empty".into()));
        }
        if self.port == 0 {
            return Err(MqttError::Config("port must not be 0".into()));
        }
        if self.client_id.is_empty() {
            return Err(MqttError::Config("client_id must not be empty".into()));
        }
        if self.request_capacity == 0 {
            return Err(MqttError::Config("request_capacity must be at least 1".into()));
        }
        // rumqttc rejects keep-alive below one second
        if self.keep_alive < Duration::from_secs(1) {
            return Err(MqttError::Config("keep_alive must be at least 1s".into()));
        }
        Ok(())
    }

    fn options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(&self.client_id, &self.host, self.port);
        options.set_keep_alive(self.keep_alive);
        if let Some((username, password)) = &self.credentials {
            options.set_credentials(username, password);
        }
        options
    }
}

/// State shared with the event thread
#[derive(Default)]
struct LinkState {
    connected: AtomicBool,
    stop: AtomicBool,
    stats: Mutex<ConnectionStats>,
}

impl LinkState {
    fn stats(&self) -> MutexGuard<'_, ConnectionStats> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// MQTT connector
pub struct MqttConnector {
    client: Client,
    config: MqttConfig,
    link: Arc<LinkState>,
}

impl MqttConnector {
    /// Start the client and its event thread
    ///
    /// Returns before the broker answers; check [`Connector::is_connected`].
    pub fn connect(config: MqttConfig) -> Result<Self, MqttError> {
        config.validate()?;

        let (client, connection) = Client::new(config.options(), config.request_capacity);
        let link = Arc::new(LinkState::default());

        {
            let link = Arc::clone(&link);
            let delay = config.reconnect_delay;
            thread::Builder::new()
                .name(format!("mqtt-{}", config.client_id))
                .spawn(move || drive_connection(connection, link, delay))
                .map_err(|e| MqttError::Config(e.to_string()))?;
        }

        log::info!(
            "mqtt client {} connecting to {}:{}",
            config.client_id,
            config.host,
            config.port
        );
        Ok(Self { client, config, link })
    }

    /// Settings this connector was built with
    pub fn config(&self) -> &MqttConfig {
        &self.config
    }
}

impl Drop for MqttConnector {
    fn drop(&mut self) {
        self.link.stop.store(true, Ordering::SeqCst);
        // event thread exits on its next notification
        let _ = self.client.try_disconnect();
    }
}

impl Connector for MqttConnector {
    type Error = MqttError;

    fn send(&mut self, topic: &str, data: &[u8]) -> Result<(), Self::Error> {
        match self
            .client
            .try_publish(topic, self.config.qos, self.config.retain, data.to_vec())
        {
            Ok(()) => {
                self.link.stats().record_sent(data.len());
                Ok(())
            }
            Err(e) => {
                self.link.stats().record_failure(&e);
                Err(e.into())
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.link.connected.load(Ordering::SeqCst)
    }

    fn stats(&self) -> ConnectionStats {
        self.link.stats().clone()
    }
}

/// Event thread body: track link state until the connector is dropped
fn drive_connection(mut connection: Connection, link: Arc<LinkState>, reconnect_delay: Duration) {
    for notification in connection.iter() {
        if link.stop.load(Ordering::SeqCst) {
            break;
        }

        match notification {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                let accepted = ack.code == ConnectReturnCode::Success;
                link.connected.store(accepted, Ordering::SeqCst);
                if accepted {
                    log::info!("mqtt connected");
                } else {
                    log::warn!("mqtt connection refused: {:?}", ack.code);
                }
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                link.connected.store(false, Ordering::SeqCst);
                log::warn!("mqtt broker closed the session");
            }
            Ok(_) => {}
            Err(e) => {
                if link.connected.swap(false, Ordering::SeqCst) {
                    log::warn!("mqtt connection lost: {}", e);
                } else {
                    log::debug!("mqtt connect attempt failed: {}", e);
                }
                {
                    let mut stats = link.stats();
                    stats.reconnections += 1;
                    stats.last_error = Some(e.to_string());
                }
                thread::sleep(reconnect_delay);
            }
        }
    }
    link.connected.store(false, Ordering::SeqCst);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = MqttConfig::new("localhost");
        assert_eq!(config.port, 1883);
        assert_eq!(config.client_id, "gpiotrigger");
        assert_eq!(config.qos, QoS::AtMostOnce);
        assert!(!config.retain);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_builder() {
        let config = MqttConfig::new("broker")
            .port(8883)
            .client_id("tank-1")
            .keep_alive_secs(15)
            .qos(QoS::AtLeastOnce)
            .retain(true)
            .credentials("robot", "secret");

        assert_eq!(config.port, 8883);
        assert_eq!(config.client_id, "tank-1");
        assert_eq!(config.keep_alive, Duration::from_secs(15));
        assert_eq!(config.qos, QoS::AtLeastOnce);
        assert!(config.retain);
        assert_eq!(config.credentials, Some(("robot".into(), "secret".into())));
    }

    #[test]
    fn address_parsing() {
        let config = MqttConfig::from_address("broker.local:1884").unwrap();
        assert_eq!(config.host, "broker.local");
        assert_eq!(config.port, 1884);

        let config = MqttConfig::from_address("broker.local").unwrap();
        assert_eq!(config.port, MqttConfig::DEFAULT_PORT);

        assert!(matches!(
            MqttConfig::from_address("broker.local:http"),
            Err(MqttError::Config(_))
        ));
    }

    #[test]
    fn validation_rejects_bad_settings() {
        assert!(MqttConfig::new("").validate().is_err());
        assert!(MqttConfig::new("h").client_id("").validate().is_err());
        assert!(MqttConfig::new("h").request_capacity(0).validate().is_err());
        assert!(MqttConfig::new("h").keep_alive_secs(0).validate().is_err());
        assert!(MqttConfig::new("h").port(0).validate().is_err());
    }

    #[test]
    fn config_error_maps_to_connector_error() {
        let err: ConnectorError = MqttError::Config("bad".into()).into();
        assert!(matches!(err, ConnectorError::ConfigError(ref r) if r == "bad"));
    }
}
