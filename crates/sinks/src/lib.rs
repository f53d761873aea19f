//! Timber - Sinks
//!
//! Output sinks for the timber logging workspace, from trivial console
//! writers to the rotating-file machinery that gives the library its
//! durability guarantees.
//!
//! # Architecture
//!
//! ```text
//! [producer threads] --Record--> [AsyncSink] --queue--> [worker thread]
//!                                                            |
//!                                                            v
//!                                                    [RollingFileSink]
//!                                                            |
//!                                       rotate / compress / prune
//! ```
//!
//! Producers only ever touch non-blocking submission paths; a single
//! worker thread owns the destination sink and performs all blocking
//! I/O. The rolling file sink can also be used directly (synchronously),
//! in which case an internal lock serializes its operations.
//!
//! # Available Sinks
//!
//! | Sink | Purpose |
//! |------|---------|
//! | [`RollingFileSink`] | Size/time-rotated files with retention and gzip |
//! | [`AsyncSink`] | Wraps any sink, moving its I/O to a drain worker thread |
//! | [`StdoutSink`] / [`StderrSink`] | Console output |
//! | [`MemorySink`] | In-memory capture, mainly for tests |
//! | [`NullSink`] | Discards everything |
//! | [`FilterSink`] | Predicate / level-threshold gate in front of a sink |
//! | [`SuppressingSink`] | Drops records whose key was seen recently |
//! | [`RetainingLevelFilterSink`] | Level gate that retains sub-threshold records for later replay |

mod async_sink;
mod console;
mod filter;
mod retain;
mod rolling;
mod util;

pub use async_sink::{AsyncSink, AsyncSinkMetrics, AsyncSinkMetricsSnapshot};
pub use console::{MemorySink, NullSink, StderrSink, StdoutSink};
pub use filter::{FilterSink, SuppressingSink};
pub use retain::RetainingLevelFilterSink;
pub use rolling::{HeaderFn, MAX_ROTATE_SERIAL, RollingFileConfig, RollingFileSink};
