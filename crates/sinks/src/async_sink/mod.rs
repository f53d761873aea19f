//! Asynchronous delivery: a drain worker thread in front of any sink.
//!
//! # Architecture
//!
//! ```text
//! [producers] --submit--> [OverflowQueue<Record>] --> [worker thread] --> [inner sink]
//!                  \                                       ^
//!                   `--doorbell / flush requests ----------'
//! ```
//!
//! Producers never perform I/O: `submit` pushes into a bounded overflow
//! queue and rings a coalescing doorbell. A single dedicated worker
//! thread owns the inner sink exclusively, so the sink sees strictly
//! single-threaded traffic and needs no per-operation locking of its own.
//!
//! `flush` is the one blocking operation: the caller posts a one-shot
//! reply channel into a control queue and loops until the worker answers
//! `true`, which it only does from the settled state (queue observed
//! empty, sink flushed or never written). That loop is what turns a
//! fully asynchronous write path into a deterministic "everything before
//! this point is durable" barrier.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender, bounded, select};

use timber_core::{ErrorHandler, Level, Record, Sink, SinkError};
use timber_queue::{OverflowQueue, UnderflowError};

use crate::util::WarnThrottle;

/// Component name stamped on records the async sink generates itself.
const INTERNAL_COMPONENT: &str = "async-sink";

/// One-shot reply channel posted by a `flush` caller.
type FlushReply = Sender<bool>;

/// Counters for the async delivery path.
///
/// All counters are updated with relaxed ordering; read them through
/// [`snapshot`](Self::snapshot) for a coherent-enough view.
#[derive(Debug, Default)]
pub struct AsyncSinkMetrics {
    /// Records accepted by `submit`.
    pub submitted: AtomicU64,

    /// Records handed to the inner sink.
    pub written: AtomicU64,

    /// Records evicted from a full submission queue before the worker
    /// could drain them.
    pub dropped: AtomicU64,

    /// Synthetic queue-full warnings injected into the stream.
    pub queue_full_warnings: AtomicU64,

    /// Append errors reported by the inner sink.
    pub write_errors: AtomicU64,

    /// Flush operations performed against the inner sink.
    pub flushes: AtomicU64,
}

impl AsyncSinkMetrics {
    pub const fn new() -> Self {
        Self {
            submitted: AtomicU64::new(0),
            written: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            queue_full_warnings: AtomicU64::new(0),
            write_errors: AtomicU64::new(0),
            flushes: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> AsyncSinkMetricsSnapshot {
        AsyncSinkMetricsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            written: self.written.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            queue_full_warnings: self.queue_full_warnings.load(Ordering::Relaxed),
            write_errors: self.write_errors.load(Ordering::Relaxed),
            flushes: self.flushes.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of [`AsyncSinkMetrics`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AsyncSinkMetricsSnapshot {
    pub submitted: u64,
    pub written: u64,
    pub dropped: u64,
    pub queue_full_warnings: u64,
    pub write_errors: u64,
    pub flushes: u64,
}

/// Wraps a sink, moving all of its I/O onto a dedicated worker thread.
///
/// `append`/`submit` never block the caller: under sustained overload the
/// submission queue evicts its oldest records, and a synthetic WARN
/// record is woven into the stream so the loss is visible in the log
/// itself rather than silent.
///
/// Errors discovered by the worker are funneled to the error handler
/// registered at construction; by the time a write fails, the producing
/// call has long returned.
///
/// Dropping the `AsyncSink` disconnects the control channels; the worker
/// drains whatever is still queued, flushes the inner sink, and exits.
/// The drop blocks until that handoff completes.
pub struct AsyncSink {
    queue: Arc<OverflowQueue<Record>>,
    capacity: usize,
    metrics: Arc<AsyncSinkMetrics>,
    /// Channels and thread handle, taken on drop.
    worker: Option<Worker>,
}

struct Worker {
    doorbell: Sender<()>,
    flush_requests: Sender<FlushReply>,
    handle: JoinHandle<()>,
}

impl AsyncSink {
    /// Wrap `inner`, queueing up to `capacity` records between producers
    /// and the worker.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero or the worker thread cannot be
    /// spawned.
    pub fn new(inner: Box<dyn Sink>, capacity: usize) -> Self {
        Self::build(inner, capacity, None)
    }

    /// Like [`new`](Self::new), with a handler for errors the worker
    /// encounters while appending or flushing.
    pub fn with_error_handler(
        inner: Box<dyn Sink>,
        capacity: usize,
        on_error: ErrorHandler,
    ) -> Self {
        Self::build(inner, capacity, Some(on_error))
    }

    fn build(inner: Box<dyn Sink>, capacity: usize, on_error: Option<ErrorHandler>) -> Self {
        let metrics = Arc::new(AsyncSinkMetrics::new());
        let throttle = Arc::new(WarnThrottle::default());

        let queue = {
            let metrics = Arc::clone(&metrics);
            let throttle = Arc::clone(&throttle);
            Arc::new(OverflowQueue::with_eviction(
                capacity,
                move |_dropped: Record| {
                    metrics.dropped.fetch_add(1, Ordering::Relaxed);
                    throttle.emit(|suppressed| {
                        tracing::warn!(
                            suppressed,
                            "submission queue overflowed; evicted oldest record"
                        );
                    });
                },
            ))
        };

        // Capacity 1 makes the doorbell coalescing: many submits, one wake.
        let (doorbell_tx, doorbell_rx) = bounded(1);
        let (flush_tx, flush_rx) = bounded::<FlushReply>(0);

        let handle = {
            let queue = Arc::clone(&queue);
            let metrics = Arc::clone(&metrics);
            std::thread::Builder::new()
                .name("timber-async-sink".into())
                .spawn(move || {
                    DrainWorker {
                        queue,
                        doorbell: doorbell_rx,
                        flush_requests: flush_rx,
                        sink: inner,
                        on_error,
                        metrics,
                        throttle,
                    }
                    .run();
                })
                .expect("failed to spawn async sink worker thread")
        };

        Self {
            queue,
            capacity,
            metrics,
            worker: Some(Worker {
                doorbell: doorbell_tx,
                flush_requests: flush_tx,
                handle,
            }),
        }
    }

    /// Hand a record to the worker without blocking.
    ///
    /// If the submission queue is full, a synthetic warning record is
    /// enqueued ahead of this one so operators can see the queue was
    /// undersized. The warning is best-effort: under extreme pressure it
    /// may itself be evicted before the worker drains it.
    pub fn submit(&self, record: Record) {
        if self.queue.is_full() {
            self.metrics
                .queue_full_warnings
                .fetch_add(1, Ordering::Relaxed);
            self.queue.enqueue(self.full_warning_record());
        }
        self.queue.enqueue(record);
        self.metrics.submitted.fetch_add(1, Ordering::Relaxed);

        if let Some(worker) = &self.worker {
            // A pending token already guarantees a wake-up.
            let _ = worker.doorbell.try_send(());
        }
    }

    pub fn metrics(&self) -> &AsyncSinkMetrics {
        &self.metrics
    }

    pub fn queue_capacity(&self) -> usize {
        self.capacity
    }

    /// Number of records currently waiting for the worker.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    fn full_warning_record(&self) -> Record {
        Record::without_caller(
            INTERNAL_COMPONENT,
            Level::Warn,
            format!(
                "submission queue is full (capacity {}); consider raising the capacity",
                self.capacity
            ),
        )
    }
}

impl Sink for AsyncSink {
    fn append(&self, record: &Record) -> Result<(), SinkError> {
        self.submit(record.clone());
        Ok(())
    }

    /// Block until everything submitted before this call has been handed
    /// to the inner sink and the sink has been flushed.
    ///
    /// The caller re-posts its reply channel for as long as the worker
    /// answers `false` (records raced in while the reply was being
    /// computed). There is no timeout: a worker stalled on a failing disk
    /// stalls `flush` with it.
    fn flush(&self) -> Result<(), SinkError> {
        let Some(worker) = &self.worker else {
            return Err(SinkError::WorkerStopped);
        };

        let (reply_tx, reply_rx) = bounded(1);
        loop {
            if worker.flush_requests.send(reply_tx.clone()).is_err() {
                return Err(SinkError::WorkerStopped);
            }
            match reply_rx.recv() {
                Ok(true) => return Ok(()),
                Ok(false) => continue,
                Err(_) => return Err(SinkError::WorkerStopped),
            }
        }
    }
}

impl Drop for AsyncSink {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            // Disconnect both channels; the worker drains and exits.
            drop(worker.doorbell);
            drop(worker.flush_requests);
            if worker.handle.join().is_err() {
                tracing::error!("async sink worker panicked during shutdown");
            }
        }
    }
}

/// State owned by the worker thread.
struct DrainWorker {
    queue: Arc<OverflowQueue<Record>>,
    doorbell: Receiver<()>,
    flush_requests: Receiver<FlushReply>,
    sink: Box<dyn Sink>,
    on_error: Option<ErrorHandler>,
    metrics: Arc<AsyncSinkMetrics>,
    throttle: Arc<WarnThrottle>,
}

impl DrainWorker {
    /// Two states: draining (records were written since the last flush)
    /// and idle. The worker only answers flush requests while idle, which
    /// is what lets a `true` reply double as "everything is durable".
    fn run(mut self) {
        // Local handles keep the select! borrows away from `self`.
        let doorbell = self.doorbell.clone();
        let flush_requests = self.flush_requests.clone();

        let mut needs_flush = false;
        loop {
            if needs_flush {
                match self.queue.dequeue() {
                    Ok(record) => self.write(&record),
                    Err(UnderflowError) => {
                        // Drained: settle into idle with a flushed sink.
                        self.flush_sink();
                        needs_flush = false;
                    }
                }
            } else {
                select! {
                    recv(doorbell) -> wake => match wake {
                        Ok(()) => {
                            if let Ok(record) = self.queue.dequeue() {
                                self.write(&record);
                                needs_flush = true;
                            }
                        }
                        Err(_) => break,
                    },
                    recv(flush_requests) -> request => match request {
                        Ok(reply) => {
                            // Reachable only while idle, so an empty queue
                            // means everything submitted before the request
                            // was written and flushed.
                            let _ = reply.try_send(self.queue.is_empty());
                        }
                        Err(_) => break,
                    },
                }
            }
        }

        // Handle dropped: drain what remains and flush once more.
        while let Ok(record) = self.queue.dequeue() {
            self.write(&record);
        }
        self.flush_sink();
    }

    fn write(&mut self, record: &Record) {
        match self.sink.append(record) {
            Ok(()) => {
                self.metrics.written.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => {
                self.metrics.write_errors.fetch_add(1, Ordering::Relaxed);
                self.throttle.emit(|suppressed| {
                    tracing::error!(error = %err, suppressed, "append to inner sink failed");
                });
                if let Some(on_error) = &self.on_error {
                    on_error(&err);
                }
            }
        }
    }

    fn flush_sink(&mut self) {
        self.metrics.flushes.fetch_add(1, Ordering::Relaxed);
        if let Err(err) = self.sink.flush() {
            self.throttle.emit(|suppressed| {
                tracing::error!(error = %err, suppressed, "flush of inner sink failed");
            });
            if let Some(on_error) = &self.on_error {
                on_error(&err);
            }
        }
    }
}
