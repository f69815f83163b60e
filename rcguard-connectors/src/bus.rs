//! Alert -> status message adapter

use std::fmt::Display;

use rcguard_core::{AlertPayload, NodeConfig, Publisher, RcError, RcResult};

use crate::Connector;

/// Publishes alerts as JSON status messages through a [`Connector`]
pub struct BusPublisher<C> {
    connector: C,
    topic: String,
}

impl<C: Connector> BusPublisher<C> {
    /// Publish on an explicit topic
    pub fn new(connector: C, topic: impl Into<String>) -> Self {
        Self {
            connector,
            topic: topic.into(),
        }
    }

    /// Publish on the node's configured status topic
    pub fn for_node(connector: C, config: &NodeConfig) -> Self {
        Self::new(connector, config.status_topic.clone())
    }

    /// Status topic
    pub fn topic(&self) -> &str {
        &self.topic
    }
}

impl<C> Publisher for BusPublisher<C>
where
    C: Connector + Send,
    C::Error: Display,
{
    fn publish(&mut self, payload: &AlertPayload) -> RcResult<()> {
        let bytes = serde_json::to_vec(payload).map_err(|e| RcError::Publish(e.to_string()))?;
        log::debug!("publishing {} bytes on {}", bytes.len(), self.topic);

        self.connector
            .send(&self.topic, &bytes)
            .map_err(|e| RcError::Publish(format!("{}: {}", self.topic, e)))
    }
}
