//! Tests for the bounded overflow queue.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use parking_lot::Mutex;

use crate::{OverflowQueue, UnderflowError};

#[test]
fn capacity_is_reported() {
    let queue = OverflowQueue::<&str>::new(10);
    assert_eq!(queue.capacity(), 10);
}

#[test]
fn enqueue_dequeue_roundtrip() {
    let evicted = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&evicted);
    let queue = OverflowQueue::with_eviction(10, move |_: &str| {
        flag.store(true, Ordering::SeqCst);
    });

    queue.enqueue("hello");
    assert!(!evicted.load(Ordering::SeqCst), "no eviction under capacity");
    assert_eq!(queue.dequeue(), Ok("hello"));
}

#[test]
fn dequeue_empty_underflows() {
    let queue = OverflowQueue::<u32>::new(10);
    assert_eq!(queue.dequeue(), Err(UnderflowError));
}

#[test]
fn overflow_evicts_oldest() {
    let evicted = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&evicted);
    let queue = OverflowQueue::with_eviction(1, move |item: &str| {
        sink.lock().push(item);
    });

    queue.enqueue("hello");
    assert!(evicted.lock().is_empty());

    queue.enqueue("world");
    assert_eq!(*evicted.lock(), vec!["hello"]);
    assert_eq!(queue.dequeue(), Ok("world"));
}

#[test]
fn overflow_eviction_count_and_order() {
    // N enqueues into a capacity-C queue force exactly N - C evictions,
    // oldest first, and a final drain yields the last C items in order.
    const CAPACITY: usize = 3;
    const TOTAL: usize = 10;

    let evicted = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&evicted);
    let queue = OverflowQueue::with_eviction(CAPACITY, move |item: usize| {
        sink.lock().push(item);
    });

    for i in 0..TOTAL {
        queue.enqueue(i);
    }

    let evicted = evicted.lock();
    assert_eq!(*evicted, (0..TOTAL - CAPACITY).collect::<Vec<_>>());

    let mut drained = Vec::new();
    while let Ok(item) = queue.dequeue() {
        drained.push(item);
    }
    assert_eq!(drained, (TOTAL - CAPACITY..TOTAL).collect::<Vec<_>>());
}

#[test]
fn len_empty_full_transitions() {
    let queue = OverflowQueue::new(2);

    assert!(queue.is_empty());
    assert!(!queue.is_full());
    assert_eq!(queue.len(), 0);

    queue.enqueue(1);
    assert!(!queue.is_empty());
    assert_eq!(queue.len(), 1);

    queue.enqueue(2);
    assert!(queue.is_full());
    assert_eq!(queue.len(), 2);

    queue.dequeue().unwrap();
    assert!(!queue.is_full());
    assert_eq!(queue.len(), 1);

    queue.dequeue().unwrap();
    assert!(queue.is_empty());
}

#[test]
fn concurrent_producers_keep_per_producer_order() {
    const PRODUCERS: usize = 10;
    const PER_PRODUCER: usize = 1000;

    let evicted = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&evicted);
    // Sized so nothing is evicted: order checks below need every item.
    let queue = Arc::new(OverflowQueue::with_eviction(
        PRODUCERS * PER_PRODUCER,
        move |_: (usize, usize)| {
            flag.store(true, Ordering::SeqCst);
        },
    ));

    let handles: Vec<_> = (0..PRODUCERS)
        .map(|producer| {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                for seq in 0..PER_PRODUCER {
                    queue.enqueue((producer, seq));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert!(queue.is_full());
    assert!(!evicted.load(Ordering::SeqCst), "no eviction expected");

    let mut next_seq = [0usize; PRODUCERS];
    while let Ok((producer, seq)) = queue.dequeue() {
        assert_eq!(
            next_seq[producer], seq,
            "items from one producer must stay in submission order"
        );
        next_seq[producer] += 1;
    }
    assert!(next_seq.iter().all(|&n| n == PER_PRODUCER));
}
