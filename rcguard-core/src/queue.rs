//! Bounded Blocking Queue for the Edge -> Publisher Hand-off
//!
//! ## Overview
//!
//! The edge callback produces alerts, the publish loop consumes them. This
//! queue sits between the two and is the only synchronization point in the
//! system:
//!
//! ```text
//! Edge callback (producer)              Publish loop (consumer)
//!        ↓                                      ↓
//!   put() ──────→  [ P1 | P2 | P3 | ... ]  ────→ take()
//!        ↓                                      ↓
//!  blocks when full                      blocks when empty
//! ```
//!
//! ## Backpressure
//!
//! Capacity is fixed at construction. A full queue blocks the producer
//! until the consumer frees a slot. Edges arrive far less often than the
//! loop drains, so in practice this almost never waits.
//!
//! ## Cancellation
//!
//! Both blocking operations take a `CancelToken` and re-check it every
//! `CANCEL_POLL_INTERVAL_MS` while waiting. A cancelled `put` hands the item
//! back in `PutError::Cancelled`; the caller decides whether to drop it. A
//! cancelled `take` returns `TakeError::Cancelled` without removing anything.
//!
//! ## Ordering
//!
//! Strict FIFO. No priorities, no coalescing. Safe for any number of
//! producers and consumers.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use thiserror_no_std::Error;

use crate::cancel::CancelToken;
use crate::constants::{CANCEL_POLL_INTERVAL_MS, DEFAULT_QUEUE_CAPACITY};

/// Failed `put`; the item is handed back
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PutError<T> {
    /// Cancelled while waiting for a free slot
    #[error("put cancelled while queue was full")]
    Cancelled(T),
    /// Queue full (non-blocking `try_put` only)
    #[error("queue full")]
    Full(T),
}

impl<T> PutError<T> {
    /// Recover the rejected item
    pub fn into_inner(self) -> T {
        match self {
            PutError::Cancelled(item) | PutError::Full(item) => item,
        }
    }
}

/// Failed `take`
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TakeError {
    /// Cancelled while waiting for an item
    #[error("take cancelled while queue was empty")]
    Cancelled,
}

/// Queue statistics
///
/// Track queue health without taking the queue lock
#[derive(Debug, Default)]
pub struct QueueStats {
    /// Total items accepted
    pub pushed: AtomicU32,
    /// Total items handed to consumers
    pub popped: AtomicU32,
    /// Items rejected (cancelled or full)
    pub dropped: AtomicU32,
    /// Maximum queue depth seen
    pub max_depth: AtomicU32,
}

impl QueueStats {
    /// Update max depth if current is higher
    fn update_max_depth(&self, current: u32) {
        let mut max = self.max_depth.load(Ordering::Relaxed);
        while current > max {
            match self.max_depth.compare_exchange_weak(
                max,
                current,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(actual) => max = actual,
            }
        }
    }
}

/// Bounded FIFO with blocking, cancellable `put`/`take`
///
/// ## Example Usage
///
/// ```rust
/// use std::sync::Arc;
/// use rcguard_core::{CancelToken, EventQueue};
///
/// let queue = Arc::new(EventQueue::with_capacity(16));
/// let cancel = CancelToken::new();
///
/// // Producer (edge callback)
/// queue.put("alert", &cancel).unwrap();
///
/// // Consumer (publish loop)
/// assert_eq!(queue.take(&cancel), Ok("alert"));
/// ```
#[derive(Debug)]
pub struct EventQueue<T> {
    items: Mutex<VecDeque<T>>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: usize,
    stats: QueueStats,
}

impl<T> EventQueue<T> {
    /// Create a queue holding at most `capacity` items
    ///
    /// A capacity of zero is bumped to one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity.min(DEFAULT_QUEUE_CAPACITY))),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity,
            stats: QueueStats::default(),
        }
    }

    /// Fixed capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append `item`, blocking while the queue is full
    pub fn put(&self, item: T, cancel: &CancelToken) -> Result<(), PutError<T>> {
        let mut items = self.lock();

        while items.len() >= self.capacity {
            if cancel.is_cancelled() {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                return Err(PutError::Cancelled(item));
            }
            items = self
                .not_full
                .wait_timeout(items, poll_interval())
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }

        self.push_locked(&mut items, item);
        Ok(())
    }

    /// Append `item` without waiting
    pub fn try_put(&self, item: T) -> Result<(), PutError<T>> {
        let mut items = self.lock();

        if items.len() >= self.capacity {
            self.stats.dropped.fetch_add(1, Ordering::Relaxed);
            return Err(PutError::Full(item));
        }

        self.push_locked(&mut items, item);
        Ok(())
    }

    /// Remove the oldest item, blocking while the queue is empty
    pub fn take(&self, cancel: &CancelToken) -> Result<T, TakeError> {
        let mut items = self.lock();

        loop {
            if cancel.is_cancelled() {
                return Err(TakeError::Cancelled);
            }
            if let Some(item) = items.pop_front() {
                drop(items);
                self.stats.popped.fetch_add(1, Ordering::Relaxed);
                self.not_full.notify_one();
                return Ok(item);
            }
            items = self
                .not_empty
                .wait_timeout(items, poll_interval())
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Remove the oldest item without waiting
    pub fn try_take(&self) -> Option<T> {
        let item = self.lock().pop_front();
        if item.is_some() {
            self.stats.popped.fetch_add(1, Ordering::Relaxed);
            self.not_full.notify_one();
        }
        item
    }

    /// Get current queue length
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Check if queue is empty
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Check if queue is full
    pub fn is_full(&self) -> bool {
        self.lock().len() >= self.capacity
    }

    /// Get queue statistics
    pub fn stats(&self) -> &QueueStats {
        &self.stats
    }

    /// Drain all queued items without blocking
    pub fn drain(&self) -> QueueDrain<'_, T> {
        QueueDrain { queue: self }
    }

    fn push_locked(&self, items: &mut VecDeque<T>, item: T) {
        items.push_back(item);
        self.stats.pushed.fetch_add(1, Ordering::Relaxed);
        self.stats.update_max_depth(items.len() as u32);
        self.not_empty.notify_one();
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Default for EventQueue<T> {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_QUEUE_CAPACITY)
    }
}

fn poll_interval() -> Duration {
    Duration::from_millis(CANCEL_POLL_INTERVAL_MS)
}

/// Queue iterator for draining all items
pub struct QueueDrain<'a, T> {
    queue: &'a EventQueue<T>,
}

impl<'a, T> Iterator for QueueDrain<'a, T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.queue.try_take()
    }
}
