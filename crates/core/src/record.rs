//! The log record and its textual renderings.

use std::panic::Location;

use chrono::{DateTime, Local};

use crate::{Context, Level};

/// A single log record.
///
/// Records are immutable once built: producers construct them, hand them
/// to a sink, and never see them again. Sinks treat the record opaquely:
/// they call a [`Formatter`] (usually [`Record::format`]) and write the
/// resulting bytes, caring only about the formatted length.
#[derive(Debug, Clone)]
pub struct Record {
    /// Subsystem that produced the record, e.g. `"storage"`.
    pub component: String,
    pub level: Level,
    /// Source file of the call site; empty for synthetic records.
    pub file: String,
    pub line: u32,
    pub timestamp: DateTime<Local>,
    pub message: String,
    pub context: Option<Context>,
}

impl Record {
    /// Build a record stamped with the caller's source location.
    #[track_caller]
    pub fn new(component: impl Into<String>, level: Level, message: impl Into<String>) -> Self {
        let caller = Location::caller();
        Self {
            component: component.into(),
            level,
            file: caller.file().to_string(),
            line: caller.line(),
            timestamp: Local::now(),
            message: message.into(),
            context: None,
        }
    }

    /// Build a record with no source location, for machinery-generated
    /// records (file headers, overflow warnings).
    pub fn without_caller(
        component: impl Into<String>,
        level: Level,
        message: impl Into<String>,
    ) -> Self {
        Self {
            component: component.into(),
            level,
            file: String::new(),
            line: 0,
            timestamp: Local::now(),
            message: message.into(),
            context: None,
        }
    }

    #[must_use]
    pub fn with_context(mut self, context: Context) -> Self {
        self.context = Some(context);
        self
    }

    /// Render with the default formatter.
    pub fn format(&self) -> String {
        format_record(self)
    }
}

/// Renders a record to its on-disk line. Passed explicitly in sink
/// configuration; there is no process-global format setting.
pub type Formatter = fn(&Record) -> String;

/// Default line format:
///
/// ```text
/// [2025/08/07 14:03:05.123] [server.info] [src/main.rs:42] listening
/// ```
pub fn format_record(record: &Record) -> String {
    format!(
        "[{}] [{}.{}] [{}:{}] {}\n",
        record.timestamp.format("%Y/%m/%d %H:%M:%S%.3f"),
        record.component,
        record.level,
        record.file,
        record.line,
        record.message,
    )
}

/// Like [`format_record`] but with an ISO-8601 timestamp carrying the
/// local UTC offset, for logs that travel across timezones.
pub fn format_record_with_offset(record: &Record) -> String {
    format!(
        "[{}] [{}.{}] [{}:{}] {}\n",
        record.timestamp.format("%Y-%m-%dT%H:%M:%S%.3f%z"),
        record.component,
        record.level,
        record.file,
        record.line,
        record.message,
    )
}

/// Messages shorter than this are never truncated, no matter the
/// configured limit.
pub const MIN_TRUNCATION_LIMIT: usize = 100;

/// Truncate an over-long message, keeping the head and a tail snippet.
///
/// Limits below [`MIN_TRUNCATION_LIMIT`] are ignored. The result keeps
/// the first `limit` bytes and the last ~100 bytes, joined by an ellipsis
/// and annotated with the original and allowed sizes in KB.
pub fn truncate_message(message: &str, limit: usize) -> String {
    let len = message.len();
    if limit < MIN_TRUNCATION_LIMIT || len <= limit + 4 {
        return message.to_string();
    }

    let head_end = floor_char_boundary(message, limit);
    let tail_start = ceil_char_boundary(message, len + 3 - MIN_TRUNCATION_LIMIT);
    format!(
        "{}...{} (warning: log line attempted ({:.1}k) over max size ({:.1}k), printing beginning and end)",
        &message[..head_end],
        &message[tail_start..],
        len as f64 / 1024.0,
        limit as f64 / 1024.0,
    )
}

/// Drop leading directories from a path, keeping the file name and up to
/// `keep` of its parent directories.
pub fn strip_directories(path: &str, keep: usize) -> &str {
    let Some(mut cutoff) = path.rfind('/') else {
        return path;
    };
    for _ in 0..keep {
        match path[..cutoff].rfind('/') {
            Some(idx) => cutoff = idx,
            None => break,
        }
    }
    &path[cutoff + 1..]
}

fn floor_char_boundary(s: &str, mut index: usize) -> usize {
    while index > 0 && !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn ceil_char_boundary(s: &str, mut index: usize) -> usize {
    while index < s.len() && !s.is_char_boundary(index) {
        index += 1;
    }
    index
}

#[cfg(test)]
#[path = "record_test.rs"]
mod record_test;
