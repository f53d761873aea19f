//! Bounded "seen recently" set with reference-counted membership.

use std::collections::HashMap;
use std::hash::Hash;

use parking_lot::Mutex;

use crate::ring::Ring;

/// A set that remembers the last `capacity` keys added to it.
///
/// Every [`add`](Self::add) enqueues the key into a fixed-capacity ring;
/// once the ring is full, each add pushes out the oldest enqueued
/// occurrence. A key is a member while at least one of its occurrences is
/// still in the ring, so repeated adds of a hot key keep it present while
/// one-off keys age out.
///
/// The membership map and the ring are guarded by a single lock: the
/// decrement caused by an eviction and the increment performed by the add
/// that triggered it are one atomic step, never a lost update.
///
/// Useful for suppressing duplicate work, e.g. "warn about this once
/// until it falls out of the recent window".
pub struct QueuedSet<K> {
    inner: Mutex<Inner<K>>,
}

struct Inner<K> {
    ring: Ring<K>,
    /// Key -> number of live occurrences in the ring. An entry exists iff
    /// its count is > 0.
    counts: HashMap<K, usize>,
}

impl<K: Eq + Hash + Clone> QueuedSet<K> {
    /// Create a set that tracks the `capacity` most recently added keys.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                ring: Ring::new(capacity),
                counts: HashMap::new(),
            }),
        }
    }

    /// Add a key, returning `true` iff it was not already present.
    pub fn add(&self, key: K) -> bool {
        let mut inner = self.inner.lock();
        let Inner { ring, counts } = &mut *inner;

        let was_absent = counts.get(&key).is_none_or(|count| *count == 0);

        let mut pending = key.clone();
        loop {
            match ring.try_push(pending) {
                Ok(()) => break,
                Err(back) => {
                    pending = back;
                    if let Some(evicted) = ring.pop() {
                        Self::forget_occurrence(counts, evicted);
                    }
                }
            }
        }

        *counts.entry(key).or_insert(0) += 1;
        was_absent
    }

    /// Whether the key is currently a member.
    pub fn contains(&self, key: &K) -> bool {
        self.inner
            .lock()
            .counts
            .get(key)
            .is_some_and(|count| *count > 0)
    }

    /// Number of distinct keys currently present.
    pub fn len(&self) -> usize {
        self.inner.lock().counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().counts.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().ring.capacity()
    }

    /// Drop one occurrence of an evicted key, removing the membership
    /// entry when it was the last one.
    fn forget_occurrence(counts: &mut HashMap<K, usize>, key: K) {
        match counts.get_mut(&key) {
            Some(count) if *count > 1 => *count -= 1,
            Some(_) => {
                counts.remove(&key);
            }
            None => {}
        }
    }
}

impl<K> std::fmt::Debug for QueuedSet<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("QueuedSet")
            .field("distinct_keys", &inner.counts.len())
            .field("occupancy", &inner.ring.len())
            .field("capacity", &inner.ring.capacity())
            .finish()
    }
}

#[cfg(test)]
#[path = "queued_set_test.rs"]
mod queued_set_test;
