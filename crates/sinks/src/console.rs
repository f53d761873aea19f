//! Console, memory, and null sinks.

use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;

use timber_core::{Formatter, Record, Sink, SinkError, format_record};

/// Writes formatted records to standard output.
pub struct StdoutSink {
    formatter: Formatter,
}

impl StdoutSink {
    pub fn new() -> Self {
        Self {
            formatter: format_record,
        }
    }

    #[must_use]
    pub fn with_formatter(mut self, formatter: Formatter) -> Self {
        self.formatter = formatter;
        self
    }
}

impl Default for StdoutSink {
    fn default() -> Self {
        Self::new()
    }
}

impl Sink for StdoutSink {
    fn append(&self, record: &Record) -> Result<(), SinkError> {
        let line = (self.formatter)(record);
        let mut out = std::io::stdout().lock();
        out.write_all(line.as_bytes())?;
        Ok(())
    }

    fn flush(&self) -> Result<(), SinkError> {
        std::io::stdout().lock().flush()?;
        Ok(())
    }
}

/// Writes formatted records to standard error.
pub struct StderrSink {
    formatter: Formatter,
}

impl StderrSink {
    pub fn new() -> Self {
        Self {
            formatter: format_record,
        }
    }

    #[must_use]
    pub fn with_formatter(mut self, formatter: Formatter) -> Self {
        self.formatter = formatter;
        self
    }
}

impl Default for StderrSink {
    fn default() -> Self {
        Self::new()
    }
}

impl Sink for StderrSink {
    fn append(&self, record: &Record) -> Result<(), SinkError> {
        let line = (self.formatter)(record);
        let mut out = std::io::stderr().lock();
        out.write_all(line.as_bytes())?;
        Ok(())
    }

    fn flush(&self) -> Result<(), SinkError> {
        std::io::stderr().lock().flush()?;
        Ok(())
    }
}

/// Discards every record. Useful for benchmarking the pipeline without
/// I/O and for wiring up components whose output nobody wants.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl NullSink {
    pub fn new() -> Self {
        Self
    }
}

impl Sink for NullSink {
    fn append(&self, _record: &Record) -> Result<(), SinkError> {
        Ok(())
    }

    fn flush(&self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Captures formatted records in an in-memory buffer.
///
/// Clones share the same buffer, so a test can keep a handle to the
/// buffer while the sink itself is consumed by a wrapper:
///
/// ```
/// use timber_core::{Level, Record, Sink};
/// use timber_sinks::MemorySink;
///
/// let sink = MemorySink::new();
/// let view = sink.clone();
/// sink.append(&Record::new("t", Level::Info, "hi")).unwrap();
/// assert!(view.contents().contains("hi"));
/// ```
#[derive(Clone)]
pub struct MemorySink {
    formatter: Formatter,
    buffer: Arc<Mutex<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self {
            formatter: format_record,
            buffer: Arc::new(Mutex::new(String::new())),
        }
    }

    #[must_use]
    pub fn with_formatter(mut self, formatter: Formatter) -> Self {
        self.formatter = formatter;
        self
    }

    /// Everything appended so far.
    pub fn contents(&self) -> String {
        self.buffer.lock().clone()
    }

    pub fn clear(&self) {
        self.buffer.lock().clear();
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl Sink for MemorySink {
    fn append(&self, record: &Record) -> Result<(), SinkError> {
        self.buffer.lock().push_str(&(self.formatter)(record));
        Ok(())
    }

    fn flush(&self) -> Result<(), SinkError> {
        Ok(())
    }
}
