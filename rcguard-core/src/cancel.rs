//! Cooperative cancellation
//!
//! A `CancelToken` is a shared flag. Blocking queue operations poll it while
//! they wait, and the publish loop checks it between iterations. Nothing is
//! interrupted mid-operation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cancellation flag; clones observe the same state
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token in the "running" state
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation (idempotent)
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Has cancellation been requested
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}
