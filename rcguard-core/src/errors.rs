//! Error Types for the RC Timing Monitor
//!
//! ## Error Categories
//!
//! Failures fall into a handful of groups, and most of them never leave the
//! component that sees them:
//!
//! ### Recovered locally
//! - `AlertSource`: the alert file is missing or unreadable. The caller swaps
//!   in a single fallback line and carries on.
//!
//! ### Startup failures
//! - `InvalidConfig`: a configuration value makes no sense (zero capacity,
//!   input and output on the same pin, ...)
//! - `Gpio`: a line could not be provisioned
//! - `Setup`: the publish thread could not finish its setup phase
//!
//! ### Runtime
//! - `Publish`: the bus refused a message. Logged and counted by the publish
//!   loop, never retried.
//!
//! Cancellation is not an error at this level. It is a clean stop signal, reported
//! through `TakeError`/`PutError` in the queue module and swallowed there.
//!
//! ```rust
//! use rcguard_core::{RcError, NodeConfig};
//!
//! let mut config = NodeConfig::default();
//! config.queue_capacity = 0;
//!
//! match config.validate() {
//!     Err(RcError::InvalidConfig { field, .. }) => assert_eq!(field, "queue_capacity"),
//!     other => panic!("unexpected: {:?}", other),
//! }
//! ```

use thiserror_no_std::Error;

use crate::gpio::GpioError;

/// Result type for monitor operations
pub type RcResult<T> = Result<T, RcError>;

/// Errors raised by the timing monitor
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RcError {
    /// Alert source file could not be read
    #[error("Cannot load alert source {path}: {reason}")]
    AlertSource {
        /// Path that was attempted
        path: String,
        /// Underlying I/O failure
        reason: String,
    },

    /// A configuration value is out of bounds
    #[error("Invalid configuration for {field}: {reason}")]
    InvalidConfig {
        /// Offending field name
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },

    /// GPIO provisioning or write failed
    #[error("GPIO failure: {0}")]
    Gpio(#[from] GpioError),

    /// The message bus rejected a payload
    #[error("Publish failed: {0}")]
    Publish(String),

    /// The publish thread could not complete setup
    #[error("Setup failed: {0}")]
    Setup(String),
}
