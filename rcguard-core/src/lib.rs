//! Core timing engine for RcGuard
//!
//! Watches an RC discharge circuit through two GPIO lines and raises a
//! status alert whenever one discharge interval strays too far from the
//! running average.
//!
//! Key constraints:
//! - The edge callback must stay fast; the only blocking step is the
//!   bounded hand-off to the publish loop
//! - Timing state has a single owner (the edge listener), so it needs no lock
//! - Publishing is fire-and-forget from the core's point of view
//!
//! ```no_run
//! use rcguard_core::{NodeConfig, RcTimeNode, gpio::SimulatedGpio, publish::MemoryPublisher};
//!
//! let gpio = SimulatedGpio::new();
//! let publisher = MemoryPublisher::new();
//!
//! let handle = RcTimeNode::new(NodeConfig::default(), gpio, publisher)
//!     .start()
//!     .expect("setup failed");
//!
//! // ... edges arrive, alerts flow to the publisher ...
//!
//! let report = handle.shutdown().expect("publish loop panicked");
//! println!("published {} alerts", report.published);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

// Macros for optional logging
#[cfg(feature = "log")]
macro_rules! log_debug {
    ($($arg:tt)*) => { log::debug!($($arg)*) };
}

#[cfg(not(feature = "log"))]
macro_rules! log_debug {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "log")]
macro_rules! log_info {
    ($($arg:tt)*) => { log::info!($($arg)*) };
}

#[cfg(not(feature = "log"))]
macro_rules! log_info {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "log")]
macro_rules! log_warn {
    ($($arg:tt)*) => { log::warn!($($arg)*) };
}

#[cfg(not(feature = "log"))]
macro_rules! log_warn {
    ($($arg:tt)*) => {};
}

pub mod alert;
pub mod cancel;
pub mod config;
pub mod constants;
pub mod detector;
pub mod driver;
pub mod errors;
pub mod gpio;
pub mod monitor;
pub mod node;
pub mod publish;
pub mod queue;
pub mod time;
pub mod timing;

// Public API
pub use alert::{AlertComposer, AlertLines, AlertPayload, KeyValue, Severity};
pub use cancel::CancelToken;
pub use config::NodeConfig;
pub use detector::AnomalyDetector;
pub use driver::{CircuitDriver, CyclePhase, RearmPolicy};
pub use errors::{RcError, RcResult};
pub use monitor::{EdgeMonitor, EdgeOutcome};
pub use node::{NodeHandle, RcTimeNode};
pub use publish::{LoopReport, LoopState, PublishLoop, Publisher};
pub use queue::EventQueue;
pub use timing::EdgeTimer;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
