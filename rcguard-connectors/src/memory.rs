//! In-memory connector
//!
//! Records every message instead of sending it. Clones share the record and
//! the connection flag, so a test can give one clone to the node and keep
//! another to inspect traffic or simulate a dropped link.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{ConnectionStats, Connector, ConnectorError};

/// One recorded message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    /// Topic it was sent on
    pub topic: String,
    /// Raw bytes
    pub payload: Vec<u8>,
}

#[derive(Debug, Default)]
struct Record {
    messages: Vec<SentMessage>,
    stats: ConnectionStats,
}

/// Connector that keeps messages in memory
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    record: Arc<Mutex<Record>>,
    connected: Arc<AtomicBool>,
}

impl MemoryConnector {
    /// Create a connected, empty connector
    pub fn new() -> Self {
        Self {
            record: Arc::new(Mutex::new(Record::default())),
            connected: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Simulate link loss or recovery
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Messages sent so far, oldest first
    pub fn messages(&self) -> Vec<SentMessage> {
        self.lock().messages.clone()
    }

    /// Messages sent on one topic
    pub fn messages_on(&self, topic: &str) -> Vec<SentMessage> {
        self.lock()
            .messages
            .iter()
            .filter(|m| m.topic == topic)
            .cloned()
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, Record> {
        self.record.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl Connector for MemoryConnector {
    type Error = ConnectorError;

    fn send(&mut self, topic: &str, data: &[u8]) -> Result<(), Self::Error> {
        let mut record = self.lock();
        if !self.is_connected() {
            record.stats.record_failure(ConnectorError::NotConnected);
            return Err(ConnectorError::NotConnected);
        }

        record.messages.push(SentMessage {
            topic: topic.to_string(),
            payload: data.to_vec(),
        });
        record.stats.record_sent(data.len());
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn stats(&self) -> ConnectionStats {
        self.lock().stats.clone()
    }
}
