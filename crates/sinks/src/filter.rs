//! Filtering wrappers: predicate gates and recent-duplicate suppression.

use std::sync::Arc;

use timber_core::{Level, Record, Sink, SinkError};
use timber_queue::QueuedSet;

type Predicate = Box<dyn Fn(&Record) -> bool + Send + Sync>;

/// Passes a record to the inner sink only when a predicate allows it.
///
/// The common case is a level threshold:
///
/// ```
/// use std::sync::Arc;
/// use timber_core::{Level, Record, Sink};
/// use timber_sinks::{FilterSink, MemorySink};
///
/// let inner = MemorySink::new();
/// let filtered = FilterSink::level(Level::Warn, Arc::new(inner.clone()));
///
/// filtered.append(&Record::new("t", Level::Info, "quiet")).unwrap();
/// filtered.append(&Record::new("t", Level::Error, "loud")).unwrap();
///
/// assert!(!inner.contents().contains("quiet"));
/// assert!(inner.contents().contains("loud"));
/// ```
pub struct FilterSink {
    inner: Arc<dyn Sink>,
    predicate: Predicate,
}

impl FilterSink {
    pub fn new(
        predicate: impl Fn(&Record) -> bool + Send + Sync + 'static,
        inner: Arc<dyn Sink>,
    ) -> Self {
        Self {
            inner,
            predicate: Box::new(predicate),
        }
    }

    /// Gate on a minimum level.
    pub fn level(threshold: Level, inner: Arc<dyn Sink>) -> Self {
        Self::new(move |record| record.level >= threshold, inner)
    }
}

impl Sink for FilterSink {
    fn append(&self, record: &Record) -> Result<(), SinkError> {
        if !(self.predicate)(record) {
            return Ok(());
        }
        self.inner.append(record)
    }

    fn flush(&self) -> Result<(), SinkError> {
        self.inner.flush()
    }
}

type KeyFn = Box<dyn Fn(&Record) -> String + Send + Sync>;

/// Suppresses records whose key was seen among the last `window` appends.
///
/// Backed by a [`QueuedSet`], so memory stays bounded: once a key's
/// occurrences all age out of the window, the next matching record passes
/// through again. The default key is `component + message`, which
/// collapses repeated identical complaints while letting distinct
/// messages through.
pub struct SuppressingSink {
    inner: Arc<dyn Sink>,
    seen: QueuedSet<String>,
    key_fn: KeyFn,
}

impl SuppressingSink {
    /// Suppress repeats within a sliding window of `window` appends.
    ///
    /// # Panics
    ///
    /// Panics if `window` is zero.
    pub fn new(window: usize, inner: Arc<dyn Sink>) -> Self {
        Self {
            inner,
            seen: QueuedSet::new(window),
            key_fn: Box::new(|record| format!("{}\u{0}{}", record.component, record.message)),
        }
    }

    /// Use a custom key extractor instead of component + message.
    #[must_use]
    pub fn with_key_fn(
        mut self,
        key_fn: impl Fn(&Record) -> String + Send + Sync + 'static,
    ) -> Self {
        self.key_fn = Box::new(key_fn);
        self
    }
}

impl Sink for SuppressingSink {
    fn append(&self, record: &Record) -> Result<(), SinkError> {
        if !self.seen.add((self.key_fn)(record)) {
            return Ok(());
        }
        self.inner.append(record)
    }

    fn flush(&self) -> Result<(), SinkError> {
        self.inner.flush()
    }
}

#[cfg(test)]
#[path = "filter_test.rs"]
mod filter_test;
