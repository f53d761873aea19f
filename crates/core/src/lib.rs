//! Timber - Core
//!
//! Shared vocabulary for the timber logging workspace: the record type,
//! severity levels, the `Sink` capability that every destination
//! implements, and a thin `Logger` facade for fanning records out to a
//! set of sinks.
//!
//! # Architecture
//!
//! ```text
//! [Logger] --Record--> [Sink] (console, file, async wrapper, ...)
//! ```
//!
//! The interesting machinery (bounded queueing, the drain worker, file
//! rotation) lives in the `timber-queue` and `timber-sinks` crates.
//! This crate deliberately stays small so sinks can be written against a
//! stable, dependency-light base.
//!
//! # Example
//!
//! ```
//! use timber_core::{Level, Record};
//!
//! let record = Record::new("server", Level::Info, "listening on :8080");
//! let line = record.format();
//! assert!(line.contains("[server.info]"));
//! assert!(line.ends_with('\n'));
//! ```

mod context;
mod error;
mod level;
mod logger;
mod record;
mod sink;

pub use context::Context;
pub use error::SinkError;
pub use level::{Level, UnknownLevelError};
pub use logger::{Logger, TurboFilter};
pub use record::{
    Formatter, Record, format_record, format_record_with_offset, strip_directories,
    truncate_message,
};
pub use sink::{ErrorHandler, Sink};
