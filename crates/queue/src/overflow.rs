//! Thread-safe bounded queue that evicts the oldest item on overflow.

use parking_lot::Mutex;
use thiserror::Error;

use crate::ring::Ring;

/// Error returned by [`OverflowQueue::dequeue`] when the queue is empty.
///
/// Underflow is an expected condition for a drain loop ("nothing left to
/// do"), not a failure of the queue itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("dequeue from an empty queue")]
pub struct UnderflowError;

type EvictFn<T> = Box<dyn Fn(T) + Send + Sync>;

/// A thread-safe, fixed-capacity FIFO queue.
///
/// [`enqueue`](Self::enqueue) never blocks and never fails: when the queue
/// is full, the oldest item is forcibly removed to make room and the
/// eviction callback (if any) is invoked with it. The callback is a pure
/// notification; it cannot veto the eviction.
///
/// Any number of threads may enqueue and dequeue concurrently. A single
/// internal lock serializes access, so the time spent holding it is a few
/// pointer moves per operation.
///
/// The eviction callback runs on the enqueueing thread while the queue's
/// lock is held; it must not call back into the queue.
pub struct OverflowQueue<T> {
    ring: Mutex<Ring<T>>,
    on_evict: Option<EvictFn<T>>,
}

impl<T> OverflowQueue<T> {
    /// Create a queue with room for `capacity` items and no eviction
    /// callback.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        Self {
            ring: Mutex::new(Ring::new(capacity)),
            on_evict: None,
        }
    }

    /// Create a queue that reports forced evictions to `on_evict`.
    pub fn with_eviction(capacity: usize, on_evict: impl Fn(T) + Send + Sync + 'static) -> Self {
        Self {
            ring: Mutex::new(Ring::new(capacity)),
            on_evict: Some(Box::new(on_evict)),
        }
    }

    /// Append an item, evicting the oldest one first if the queue is full.
    pub fn enqueue(&self, item: T) {
        let mut ring = self.ring.lock();
        let mut item = item;
        loop {
            match ring.try_push(item) {
                Ok(()) => return,
                Err(back) => {
                    item = back;
                    // Full: force out the oldest item and retry. Eviction
                    // frees exactly one slot, so the retry succeeds unless
                    // the ring somehow emptied, in which case the push
                    // succeeds directly.
                    if let Some(evicted) = ring.pop() {
                        if let Some(on_evict) = &self.on_evict {
                            on_evict(evicted);
                        }
                    }
                }
            }
        }
    }

    /// Remove and return the oldest item.
    pub fn dequeue(&self) -> Result<T, UnderflowError> {
        self.ring.lock().pop().ok_or(UnderflowError)
    }

    pub fn len(&self) -> usize {
        self.ring.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.lock().is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.ring.lock().is_full()
    }

    pub fn capacity(&self) -> usize {
        self.ring.lock().capacity()
    }
}

impl<T> std::fmt::Debug for OverflowQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ring = self.ring.lock();
        f.debug_struct("OverflowQueue")
            .field("len", &ring.len())
            .field("capacity", &ring.capacity())
            .field("has_eviction_callback", &self.on_evict.is_some())
            .finish()
    }
}

#[cfg(test)]
#[path = "overflow_test.rs"]
mod overflow_test;
