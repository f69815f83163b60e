//! Blocking behaviour of the edge -> publisher queue across threads

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use common::wait_until;
use rcguard_core::{
    queue::{PutError, TakeError},
    CancelToken, EventQueue,
};

#[test]
fn full_queue_blocks_producer_until_take() {
    let queue = Arc::new(EventQueue::with_capacity(1));
    let cancel = CancelToken::new();
    queue.put(1u32, &cancel).unwrap();

    let producer = {
        let queue = Arc::clone(&queue);
        let cancel = cancel.clone();
        thread::spawn(move || queue.put(2u32, &cancel))
    };

    thread::sleep(Duration::from_millis(30));
    assert!(!producer.is_finished());
    assert_eq!(queue.len(), 1);

    assert_eq!(queue.take(&cancel), Ok(1));
    assert_eq!(producer.join().unwrap(), Ok(()));
    assert_eq!(queue.take(&cancel), Ok(2));
}

#[test]
fn empty_queue_blocks_consumer_until_put() {
    let queue: Arc<EventQueue<&str>> = Arc::new(EventQueue::with_capacity(4));
    let cancel = CancelToken::new();

    let consumer = {
        let queue = Arc::clone(&queue);
        let cancel = cancel.clone();
        thread::spawn(move || queue.take(&cancel))
    };

    thread::sleep(Duration::from_millis(20));
    assert!(!consumer.is_finished());

    queue.put("edge", &cancel).unwrap();
    assert_eq!(consumer.join().unwrap(), Ok("edge"));
}

#[test]
fn cancel_releases_blocked_consumer() {
    let queue: Arc<EventQueue<u8>> = Arc::new(EventQueue::with_capacity(4));
    let cancel = CancelToken::new();

    let consumer = {
        let queue = Arc::clone(&queue);
        let cancel = cancel.clone();
        thread::spawn(move || queue.take(&cancel))
    };

    thread::sleep(Duration::from_millis(10));
    let cancelled_at = Instant::now();
    cancel.cancel();

    assert_eq!(consumer.join().unwrap(), Err(TakeError::Cancelled));
    assert!(cancelled_at.elapsed() < Duration::from_millis(500));
}

#[test]
fn cancel_releases_blocked_producer_with_item() {
    let queue = Arc::new(EventQueue::with_capacity(1));
    let cancel = CancelToken::new();
    queue.put("first", &cancel).unwrap();

    let producer = {
        let queue = Arc::clone(&queue);
        let cancel = cancel.clone();
        thread::spawn(move || queue.put("second", &cancel))
    };

    thread::sleep(Duration::from_millis(10));
    cancel.cancel();

    assert_eq!(producer.join().unwrap(), Err(PutError::Cancelled("second")));
    assert_eq!(queue.stats().dropped.load(Ordering::Relaxed), 1);
    assert_eq!(queue.try_take(), Some("first"));
}

#[test]
fn many_producers_single_consumer_loses_nothing() {
    let queue = Arc::new(EventQueue::with_capacity(3));
    let cancel = CancelToken::new();

    let producers: Vec<_> = (0..4u32)
        .map(|p| {
            let queue = Arc::clone(&queue);
            let cancel = cancel.clone();
            thread::spawn(move || {
                for i in 0..25u32 {
                    queue.put(p * 100 + i, &cancel).unwrap();
                }
            })
        })
        .collect();

    let mut received = Vec::new();
    assert!(wait_until(Duration::from_secs(5), || {
        while let Some(item) = queue.try_take() {
            received.push(item);
        }
        received.len() == 100
    }));

    for producer in producers {
        producer.join().unwrap();
    }

    // per-producer order survives interleaving
    for p in 0..4u32 {
        let mine: Vec<_> = received.iter().copied().filter(|v| v / 100 == p).collect();
        let expected: Vec<_> = (0..25).map(|i| p * 100 + i).collect();
        assert_eq!(mine, expected);
    }
    assert!(queue.stats().max_depth.load(Ordering::Relaxed) <= 3);
}
