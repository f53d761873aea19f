//! The sink capability.

use crate::{Record, SinkError};

/// A destination that accepts formatted log records and can flush them to
/// stable storage.
///
/// Sinks compose: filtering and retention wrappers hold an inner
/// `Arc<dyn Sink>`, and the async drain worker wraps any sink to move its
/// I/O off the producing thread. Implementations must be safe to call
/// from multiple threads; sinks that mutate state serialize internally.
pub trait Sink: Send + Sync {
    /// Deliver one record.
    ///
    /// Ordering: calls made sequentially by one thread are delivered in
    /// that order. No ordering is promised across threads.
    fn append(&self, record: &Record) -> Result<(), SinkError>;

    /// Flush any buffered records to stable storage. When this returns
    /// `Ok`, every record from a completed `append` on this thread is
    /// durable.
    fn flush(&self) -> Result<(), SinkError>;
}

impl<S: Sink + ?Sized> Sink for std::sync::Arc<S> {
    fn append(&self, record: &Record) -> Result<(), SinkError> {
        (**self).append(record)
    }

    fn flush(&self) -> Result<(), SinkError> {
        (**self).flush()
    }
}

/// Callback for errors that cannot be returned to the producer, e.g. a
/// write failure discovered by the async worker long after the producing
/// call returned.
pub type ErrorHandler = Box<dyn Fn(&SinkError) + Send + Sync>;
