//! Logger facade: stamps records and fans them out to sinks.

use std::panic::Location;
use std::sync::Arc;

use chrono::Local;

use crate::record::{strip_directories, truncate_message};
use crate::{Context, Level, Record, Sink, SinkError};

/// Cheap pre-filter consulted before a record is even built. Returning
/// `false` drops the message without formatting or sink traffic.
pub type TurboFilter = fn(Level, &str) -> bool;

/// Fans records out to a set of sinks.
///
/// The logger is intentionally thin: it stamps each message with the
/// component name, a timestamp, and the caller's source location, applies
/// optional truncation, and hands the record to every configured sink.
/// Level filtering, retention, and durability are sink concerns.
///
/// Append errors from individual sinks are collected and returned rather
/// than short-circuiting, so one failing sink does not starve the others.
///
/// # Example
///
/// ```no_run
/// # use std::sync::Arc;
/// # use timber_core::{Logger, Sink};
/// # fn with(sink: Arc<dyn Sink>) {
/// let logger = Logger::new("server").with_sink(sink);
/// logger.info("listening on :8080");
/// logger.flush();
/// # }
/// ```
pub struct Logger {
    component: String,
    sinks: Vec<Arc<dyn Sink>>,
    /// Parent directories of the call-site file to keep; 0 keeps only
    /// the file name.
    keep_dirs: usize,
    max_message_len: Option<usize>,
    filters: Vec<TurboFilter>,
}

impl Logger {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            sinks: Vec::new(),
            keep_dirs: 0,
            max_message_len: None,
            filters: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn Sink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Keep this many parent directories when rendering call-site paths.
    #[must_use]
    pub fn with_keep_dirs(mut self, keep_dirs: usize) -> Self {
        self.keep_dirs = keep_dirs;
        self
    }

    /// Truncate messages longer than `limit` bytes (see
    /// [`truncate_message`]).
    #[must_use]
    pub fn with_max_message_len(mut self, limit: usize) -> Self {
        self.max_message_len = Some(limit);
        self
    }

    #[must_use]
    pub fn with_filter(mut self, filter: TurboFilter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    /// Log a message, returning any sink errors.
    #[track_caller]
    pub fn log(&self, level: Level, message: impl AsRef<str>) -> Vec<SinkError> {
        self.dispatch(level, message.as_ref(), None)
    }

    /// Log a message with an attached context bag.
    #[track_caller]
    pub fn log_with_context(
        &self,
        level: Level,
        message: impl AsRef<str>,
        context: Context,
    ) -> Vec<SinkError> {
        self.dispatch(level, message.as_ref(), Some(context))
    }

    #[track_caller]
    pub fn trace(&self, message: impl AsRef<str>) -> Vec<SinkError> {
        self.dispatch(Level::Trace, message.as_ref(), None)
    }

    #[track_caller]
    pub fn debug(&self, message: impl AsRef<str>) -> Vec<SinkError> {
        self.dispatch(Level::Debug, message.as_ref(), None)
    }

    #[track_caller]
    pub fn info(&self, message: impl AsRef<str>) -> Vec<SinkError> {
        self.dispatch(Level::Info, message.as_ref(), None)
    }

    #[track_caller]
    pub fn warn(&self, message: impl AsRef<str>) -> Vec<SinkError> {
        self.dispatch(Level::Warn, message.as_ref(), None)
    }

    #[track_caller]
    pub fn error(&self, message: impl AsRef<str>) -> Vec<SinkError> {
        self.dispatch(Level::Error, message.as_ref(), None)
    }

    /// Flush every sink, collecting errors.
    pub fn flush(&self) -> Vec<SinkError> {
        self.sinks.iter().filter_map(|s| s.flush().err()).collect()
    }

    #[track_caller]
    fn dispatch(&self, level: Level, message: &str, context: Option<Context>) -> Vec<SinkError> {
        for filter in &self.filters {
            if !filter(level, message) {
                return Vec::new();
            }
        }

        let caller = Location::caller();
        let message = match self.max_message_len {
            Some(limit) => truncate_message(message, limit),
            None => message.to_string(),
        };

        let record = Record {
            component: self.component.clone(),
            level,
            file: strip_directories(caller.file(), self.keep_dirs).to_string(),
            line: caller.line(),
            timestamp: Local::now(),
            message,
            context,
        };

        self.sinks
            .iter()
            .filter_map(|sink| sink.append(&record).err())
            .collect()
    }
}

#[cfg(test)]
#[path = "logger_test.rs"]
mod logger_test;
