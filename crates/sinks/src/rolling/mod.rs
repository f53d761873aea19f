//! Rotating file sink.
//!
//! Owns one open log file and rotates it out under a timestamped name
//! when it grows past a size limit or lives past an age limit. Retired
//! files can be gzip-compressed and are pruned oldest-first beyond a
//! retention count. The moment a file began counting toward the age
//! limit is persisted beside it, so restarts do not reset the clock.
//!
//! # Filesystem layout
//!
//! ```text
//! app.log                          active file
//! app.log.2025-08-07T14-03-05     rotated
//! app.log.2025-08-07T14-03-05-1   rotated, same-second collision
//! app.log.2025-08-06T09-12-44.gz  rotated and compressed
//! .timber-state-app.log            rotation epoch sidecar
//! ```
//!
//! # Concurrency
//!
//! All operations serialize on one internal lock, so the sink can be
//! driven directly from several threads. The intended high-throughput
//! setup wraps it in an `AsyncSink`, in which case only the drain worker
//! ever touches it.

mod rotated;
mod state;

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use chrono::Local;
use flate2::{Compression, GzBuilder};
use parking_lot::Mutex;

use timber_core::{Formatter, Level, Record, Sink, SinkError, format_record};

use rotated::{RotatedLog, list_rotated, rotated_name};
use state::RotationState;

/// Upper bound on the same-second collision serial search. Exhausting it
/// fails the rotation rather than looping forever.
pub const MAX_ROTATE_SERIAL: u64 = 1_000_000_000;

/// Produces the lines re-emitted at the top of every new log file.
pub type HeaderFn = Arc<dyn Fn() -> Vec<String> + Send + Sync>;

/// Configuration for [`RollingFileSink`].
///
/// Triggers and retention are opt-in: the default configuration never
/// rotates, never prunes, and never compresses.
#[derive(Clone)]
pub struct RollingFileConfig {
    /// Path of the active log file.
    pub path: PathBuf,

    /// Rotate once the file grows past this many bytes. `None` disables
    /// the size trigger.
    pub max_file_size: Option<u64>,

    /// Rotate once the file has been accumulating for this long. `None`
    /// disables the time trigger.
    pub max_duration: Option<Duration>,

    /// Keep at most this many rotated files, deleting oldest first.
    /// `None` keeps everything.
    pub max_rotated_logs: Option<usize>,

    /// If the log file already exists at construction, rotate it away
    /// before accepting writes instead of appending to it.
    pub rotate_if_exists: bool,

    /// Gzip rotated files, keeping this many of the newest ones
    /// uncompressed. `None` disables compression.
    pub compression: Option<usize>,

    /// Renders records to bytes.
    pub formatter: Formatter,

    /// Lines written at the top of every new log file. Header bytes do
    /// not count toward the size trigger, so a header larger than
    /// `max_file_size` cannot cause a rotation loop.
    pub header: Option<HeaderFn>,
}

impl RollingFileConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_file_size: None,
            max_duration: None,
            max_rotated_logs: None,
            rotate_if_exists: false,
            compression: None,
            formatter: format_record,
            header: None,
        }
    }

    #[must_use]
    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = Some(bytes);
        self
    }

    #[must_use]
    pub fn with_max_duration(mut self, age: Duration) -> Self {
        self.max_duration = Some(age);
        self
    }

    #[must_use]
    pub fn with_max_rotated_logs(mut self, count: usize) -> Self {
        self.max_rotated_logs = Some(count);
        self
    }

    #[must_use]
    pub fn with_rotate_if_exists(mut self) -> Self {
        self.rotate_if_exists = true;
        self
    }

    /// Enable gzip compression of rotated files, keeping the
    /// `max_uncompressed` newest rotated files as plain text.
    #[must_use]
    pub fn with_compression(mut self, max_uncompressed: usize) -> Self {
        self.compression = Some(max_uncompressed);
        self
    }

    #[must_use]
    pub fn with_formatter(mut self, formatter: Formatter) -> Self {
        self.formatter = formatter;
        self
    }

    #[must_use]
    pub fn with_header(mut self, header: impl Fn() -> Vec<String> + Send + Sync + 'static) -> Self {
        self.header = Some(Arc::new(header));
        self
    }
}

impl std::fmt::Debug for RollingFileConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RollingFileConfig")
            .field("path", &self.path)
            .field("max_file_size", &self.max_file_size)
            .field("max_duration", &self.max_duration)
            .field("max_rotated_logs", &self.max_rotated_logs)
            .field("rotate_if_exists", &self.rotate_if_exists)
            .field("compression", &self.compression)
            .field("has_header", &self.header.is_some())
            .finish()
    }
}

/// Mutable half of the sink, guarded by one lock.
struct Active {
    /// `None` after a failed rotation or a close; appends then surface
    /// [`SinkError::NoFile`] until `reopen` or `rotate` succeeds.
    file: Option<File>,

    /// Bytes written since the last rotation, header lines excluded.
    file_size: u64,

    state: RotationState,
}

/// File sink with size- and age-triggered rotation.
///
/// See the [module docs](self) for the on-disk layout. Construction
/// policy: an existing file is either rotated away immediately
/// (`rotate_if_exists`) or appended to, recovering the size counter from
/// the file's length and the rotation epoch from the sidecar.
pub struct RollingFileSink {
    config: RollingFileConfig,
    /// Absolute form of `config.path`; rotated names derive from it.
    path: PathBuf,
    state_path: PathBuf,
    active: Mutex<Active>,
}

impl RollingFileSink {
    /// Open (or create) the log file and recover rotation state.
    pub fn open(config: RollingFileConfig) -> Result<Self, SinkError> {
        let path = std::path::absolute(&config.path).map_err(|err| SinkError::Open {
            path: config.path.clone(),
            source: err,
        })?;
        let state_path = RotationState::sidecar_path(&path);

        let sink = Self {
            config,
            path,
            state_path,
            active: Mutex::new(Active {
                file: None,
                file_size: 0,
                state: RotationState::stamped_now(),
            }),
        };

        let existing = fs::metadata(&sink.path).ok();
        if existing.is_some() && sink.config.rotate_if_exists {
            // A minor housekeeping failure still leaves a usable sink.
            match sink.rotate() {
                Ok(()) | Err(SinkError::Rotation(_)) => return Ok(sink),
                Err(err) => return Err(err),
            }
        }

        let file = File::options()
            .append(true)
            .create(true)
            .open(&sink.path)
            .map_err(|err| SinkError::Open {
                path: sink.path.clone(),
                source: err,
            })?;

        {
            let mut active = sink.active.lock();
            active.file = Some(file);
            active.file_size = existing.map(|meta| meta.len()).unwrap_or(0);

            // A surviving sidecar carries the true epoch; trust it so a
            // restart does not reset the rotation clock.
            if RotationState::exists(&sink.state_path)? {
                active.state = RotationState::load(&sink.state_path)?;
            } else {
                sink.stamp_epoch(&mut active)?;
            }

            sink.write_header(&mut active)?;
        }

        Ok(sink)
    }

    /// Absolute path of the active log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rotate now, regardless of triggers. Useful for operator-driven
    /// rotation, e.g. on SIGHUP.
    pub fn rotate(&self) -> Result<(), SinkError> {
        let mut active = self.active.lock();
        self.rotate_locked(&mut active)
    }

    /// Pick up a log file that was rotated externally: flush and close
    /// the current handle (which may point at a renamed file), then open
    /// or create a fresh file at the original path.
    pub fn reopen(&self) -> Result<(), SinkError> {
        let mut active = self.active.lock();

        if let Some(file) = active.file.take() {
            file.sync_all().map_err(|err| SinkError::Sync {
                path: self.path.clone(),
                source: err,
            })?;
        }

        active.file_size = match fs::metadata(&self.path) {
            Ok(meta) => meta.len(),
            Err(_) => 0,
        };

        let file = File::options()
            .append(true)
            .create(true)
            .open(&self.path)
            .map_err(|err| SinkError::Open {
                path: self.path.clone(),
                source: err,
            })?;
        active.file = Some(file);

        self.write_header(&mut active)?;
        self.stamp_epoch(&mut active)?;

        if let Err(err) = self.prune_rotated() {
            tracing::warn!(path = %self.path.display(), error = %err, "pruning after reopen failed");
        }
        Ok(())
    }

    /// Sync pending bytes to stable storage and release the handle.
    pub fn close(&self) -> Result<(), SinkError> {
        let mut active = self.active.lock();
        if let Some(file) = active.file.take() {
            file.sync_all().map_err(|err| SinkError::Sync {
                path: self.path.clone(),
                source: err,
            })?;
        }
        Ok(())
    }

    fn rotate_locked(&self, active: &mut Active) -> Result<(), SinkError> {
        // Resolve the target name before touching the handle, so an
        // exhausted serial search leaves the sink exactly as it was.
        let rotated_to = self.free_rotated_name()?;

        if let Some(file) = active.file.take() {
            file.sync_all().map_err(|err| SinkError::Close {
                path: self.path.clone(),
                source: err,
            })?;
        }
        active.file_size = 0;

        fs::rename(&self.path, &rotated_to).map_err(|err| SinkError::Rename {
            from: self.path.clone(),
            to: rotated_to.clone(),
            source: err,
        })?;

        let file = File::create(&self.path).map_err(|err| SinkError::Open {
            path: self.path.clone(),
            source: err,
        })?;
        active.file = Some(file);

        self.write_header(active)?;
        self.stamp_epoch(active)?;

        tracing::info!(
            path = %self.path.display(),
            rotated_to = %rotated_to.display(),
            "log file rotated"
        );

        // Housekeeping failures are reported but the rotation itself has
        // succeeded; the sink stays writable.
        let mut minor: Option<SinkError> = None;
        if let Some(max_uncompressed) = self.config.compression {
            if let Err(err) = self.compress_excess(max_uncompressed) {
                tracing::warn!(path = %self.path.display(), error = %err, "compressing rotated logs failed");
                minor.get_or_insert(err);
            }
        }
        if let Err(err) = self.prune_rotated() {
            tracing::warn!(path = %self.path.display(), error = %err, "pruning rotated logs failed");
            minor.get_or_insert(err);
        }

        match minor {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// First free timestamped name for the active file, resolving
    /// same-second collisions with an incrementing serial.
    fn free_rotated_name(&self) -> Result<PathBuf, SinkError> {
        let now = Local::now();
        for serial in 0..=MAX_ROTATE_SERIAL {
            let candidate = rotated_name(&self.path, now, serial);
            if fs::symlink_metadata(&candidate).is_err() {
                return Ok(candidate);
            }
        }
        Err(SinkError::SerialsExhausted {
            path: self.path.clone(),
            max: MAX_ROTATE_SERIAL,
        })
    }

    /// Write one record without size accounting, returning the formatted
    /// length.
    fn append_unsized(&self, active: &mut Active, record: &Record) -> Result<u64, SinkError> {
        let Some(file) = active.file.as_mut() else {
            return Err(SinkError::NoFile);
        };
        let line = (self.config.formatter)(record);
        file.write_all(line.as_bytes())
            .map_err(|err| SinkError::Write {
                path: self.path.clone(),
                source: err,
            })?;
        Ok(line.len() as u64)
    }

    /// Re-emit the configured header lines. Header bytes are excluded
    /// from the size counter to rule out a rotation loop when the header
    /// alone exceeds `max_file_size`.
    fn write_header(&self, active: &mut Active) -> Result<(), SinkError> {
        if let Some(header) = &self.config.header {
            for line in header() {
                let record = Record::without_caller("header", Level::Info, line);
                self.append_unsized(active, &record)?;
            }
        }
        Ok(())
    }

    fn stamp_epoch(&self, active: &mut Active) -> Result<(), SinkError> {
        let state = RotationState::stamped_now();
        state.store(&self.state_path)?;
        active.state = state;
        Ok(())
    }

    fn should_rotate(&self, active: &Active) -> bool {
        if let Some(max_size) = self.config.max_file_size {
            if active.file_size > max_size {
                return true;
            }
        }
        if let Some(max_age) = self.config.max_duration {
            let elapsed = Local::now().signed_duration_since(active.state.log_start_time);
            if let Ok(max_age) = chrono::Duration::from_std(max_age) {
                if elapsed > max_age {
                    return true;
                }
            }
        }
        false
    }

    /// Delete rotated files beyond the retention count, oldest first.
    fn prune_rotated(&self) -> Result<(), SinkError> {
        let Some(max_rotated) = self.config.max_rotated_logs else {
            return Ok(());
        };

        let mut rotated = list_rotated(&self.path)
            .map_err(|err| SinkError::Rotation(format!("listing rotated logs: {err}")))?;
        if rotated.len() <= max_rotated {
            return Ok(());
        }

        rotated.sort();
        let excess = rotated.len() - max_rotated;
        for log in &rotated[..excess] {
            fs::remove_file(&log.path).map_err(|err| {
                SinkError::Rotation(format!("removing {}: {err}", log.path.display()))
            })?;
        }
        Ok(())
    }

    /// Gzip the oldest uncompressed rotated files down to the configured
    /// uncompressed-retention count.
    fn compress_excess(&self, max_uncompressed: usize) -> Result<(), SinkError> {
        let rotated = list_rotated(&self.path)
            .map_err(|err| SinkError::Rotation(format!("listing rotated logs: {err}")))?;

        let mut uncompressed: Vec<RotatedLog> =
            rotated.into_iter().filter(|log| !log.compressed).collect();
        if uncompressed.len() <= max_uncompressed {
            return Ok(());
        }

        uncompressed.sort();
        let excess = uncompressed.len() - max_uncompressed;
        for log in &uncompressed[..excess] {
            compress_log_file(&log.path).map_err(|err| {
                SinkError::Rotation(format!("compressing {}: {err}", log.path.display()))
            })?;
        }
        Ok(())
    }
}

impl Sink for RollingFileSink {
    /// Write one record and rotate if either trigger fires. Firing
    /// either trigger resets both: the size counter restarts at zero and
    /// a fresh epoch is stamped.
    fn append(&self, record: &Record) -> Result<(), SinkError> {
        let mut active = self.active.lock();

        let written = self.append_unsized(&mut active, record)?;
        active.file_size += written;

        if self.should_rotate(&active) {
            return self.rotate_locked(&mut active);
        }
        Ok(())
    }

    /// Sync written bytes to stable storage. A closed or faulted sink
    /// has nothing pending, so this is a no-op for it.
    fn flush(&self) -> Result<(), SinkError> {
        let active = self.active.lock();
        if let Some(file) = active.file.as_ref() {
            file.sync_all().map_err(|err| SinkError::Sync {
                path: self.path.clone(),
                source: err,
            })?;
        }
        Ok(())
    }
}

/// Replace a log file with a gzipped copy carrying the same modification
/// time. The original is removed only after the compressed copy is fully
/// on disk.
fn compress_log_file(path: &Path) -> io::Result<()> {
    let mut source = File::open(path)?;
    let mtime = source.metadata()?.modified()?;
    let mtime_secs = mtime
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0);

    let gz_path = PathBuf::from(format!("{}.gz", path.display()));
    let target = File::create(&gz_path)?;
    let mut encoder = GzBuilder::new()
        .mtime(mtime_secs)
        .write(target, Compression::default());

    io::copy(&mut source, &mut encoder)?;

    let target = encoder.finish()?;
    target.sync_all()?;
    target.set_modified(mtime)?;
    drop(target);

    fs::remove_file(path)?;
    Ok(())
}

#[cfg(test)]
#[path = "rolling_test.rs"]
mod rolling_test;
