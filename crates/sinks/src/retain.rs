//! Level filter that retains sub-threshold records for later replay.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use timber_core::{Level, Record, Sink, SinkError};
use timber_queue::OverflowQueue;

/// Category used for records that carry no context or no category key.
const UNCATEGORIZED: &str = "";

/// A level filter that remembers what it filtered out.
///
/// Records at or above the threshold pass straight through to the inner
/// sink. Every record, regardless of level, is also retained in a
/// bounded per-category buffer, keyed by a context value. When something
/// goes wrong, [`append_retained`](Self::append_retained) replays the
/// buffered history for a category through the inner sink, so the
/// operator gets the detailed lead-up to an error without paying for
/// verbose logging in the steady state.
///
/// Retention buffers are [`OverflowQueue`]s: a category holds at most
/// `capacity_per_category` records and older ones are silently evicted.
pub struct RetainingLevelFilterSink {
    inner: Arc<dyn Sink>,
    level: RwLock<Level>,
    retention: RwLock<bool>,
    /// Context key whose value selects the retention category.
    category_key: String,
    retainer: Retainer,
}

impl RetainingLevelFilterSink {
    pub fn new(
        category_key: impl Into<String>,
        capacity_per_category: usize,
        level: Level,
        inner: Arc<dyn Sink>,
    ) -> Self {
        Self {
            inner,
            level: RwLock::new(level),
            retention: RwLock::new(true),
            category_key: category_key.into(),
            retainer: Retainer::new(capacity_per_category),
        }
    }

    pub fn level(&self) -> Level {
        *self.level.read()
    }

    pub fn set_level(&self, level: Level) {
        *self.level.write() = level;
    }

    /// Whether records are currently being retained.
    pub fn retention(&self) -> bool {
        *self.retention.read()
    }

    pub fn set_retention(&self, retention: bool) {
        *self.retention.write() = retention;
    }

    /// Replay everything retained for `category` through the inner sink,
    /// draining the buffer. Errors from individual appends are collected.
    pub fn append_retained(&self, category: &str) -> Vec<SinkError> {
        self.retainer.replay(category, self.inner.as_ref())
    }

    /// Discard everything retained for `category`.
    pub fn clear_retained(&self, category: &str) {
        self.retainer.clear(category);
    }

    fn category_of(&self, record: &Record) -> String {
        record
            .context
            .as_ref()
            .and_then(|ctx| ctx.get(&self.category_key))
            .unwrap_or(UNCATEGORIZED)
            .to_string()
    }
}

impl Sink for RetainingLevelFilterSink {
    fn append(&self, record: &Record) -> Result<(), SinkError> {
        if self.retention() {
            self.retainer.retain(self.category_of(record), record.clone());
        }

        if record.level < self.level() {
            return Ok(());
        }
        self.inner.append(record)
    }

    fn flush(&self) -> Result<(), SinkError> {
        self.inner.flush()
    }
}

/// Thread-safe map from category to a bounded queue of retained records.
struct Retainer {
    queues: Mutex<HashMap<String, Arc<OverflowQueue<Record>>>>,
    capacity_per_category: usize,
}

impl Retainer {
    fn new(capacity_per_category: usize) -> Self {
        Self {
            queues: Mutex::new(HashMap::new()),
            capacity_per_category: capacity_per_category.max(1),
        }
    }

    fn retain(&self, category: String, record: Record) {
        let queue = {
            let mut queues = self.queues.lock();
            Arc::clone(
                queues
                    .entry(category)
                    .or_insert_with(|| Arc::new(OverflowQueue::new(self.capacity_per_category))),
            )
        };
        queue.enqueue(record);
    }

    fn replay(&self, category: &str, sink: &dyn Sink) -> Vec<SinkError> {
        let Some(queue) = self.queues.lock().get(category).map(Arc::clone) else {
            return Vec::new();
        };

        let mut errors = Vec::new();
        while let Ok(record) = queue.dequeue() {
            if let Err(err) = sink.append(&record) {
                errors.push(err);
            }
        }
        errors
    }

    fn clear(&self, category: &str) {
        self.queues.lock().remove(category);
    }
}

#[cfg(test)]
#[path = "retain_test.rs"]
mod retain_test;
