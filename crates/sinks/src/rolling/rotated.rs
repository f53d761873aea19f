//! Rotated-file naming: generating collision-free names and parsing them
//! back for retention housekeeping.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDateTime};

/// Timestamp layout embedded in rotated filenames. Colons are avoided so
/// names stay legal on every filesystem.
pub(crate) const FILENAME_TIMESTAMP: &str = "%Y-%m-%dT%H-%M-%S";

/// A rotated log file found on disk, identified by the timestamp (and
/// same-second serial) embedded in its name.
///
/// Ordering is `(time, serial)` ascending, i.e. oldest first, which is
/// the order in which retention removes and compression retires files.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct RotatedLog {
    pub time: NaiveDateTime,
    pub serial: u64,
    pub path: PathBuf,
    pub compressed: bool,
}

impl RotatedLog {
    /// Parse a candidate path, returning `None` when the name does not
    /// carry a rotation timestamp. Compressed files (`.gz` suffix) parse
    /// like their uncompressed originals so they participate in
    /// retention accounting.
    pub(crate) fn parse(path: PathBuf) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        let (stem, compressed) = match name.strip_suffix(".gz") {
            Some(stem) => (stem, true),
            None => (name, false),
        };

        // The rotation suffix is everything after the final dot:
        // "<timestamp>" or "<timestamp>-<serial>".
        let (_, suffix) = stem.rsplit_once('.')?;
        if suffix.len() < FILENAME_TIMESTAMP_LEN {
            return None;
        }
        let (timestamp, rest) = suffix.split_at(FILENAME_TIMESTAMP_LEN);
        let time = NaiveDateTime::parse_from_str(timestamp, FILENAME_TIMESTAMP).ok()?;

        let serial = if rest.is_empty() {
            0
        } else {
            rest.strip_prefix('-')?.parse().ok()?
        };

        Some(Self {
            time,
            serial,
            path,
            compressed,
        })
    }
}

/// Rendered length of [`FILENAME_TIMESTAMP`], e.g. `2025-08-07T14-03-05`.
const FILENAME_TIMESTAMP_LEN: usize = 19;

/// Name a log file is rotated to: `<base>.<timestamp>`, with `-<serial>`
/// appended for same-second collisions (serial 0 means no suffix).
pub(crate) fn rotated_name(base: &Path, time: DateTime<Local>, serial: u64) -> PathBuf {
    let mut name = format!("{}.{}", base.display(), time.format(FILENAME_TIMESTAMP));
    if serial > 0 {
        name.push_str(&format!("-{serial}"));
    }
    PathBuf::from(name)
}

/// Every rotated file belonging to `base` in its directory, unsorted.
pub(crate) fn list_rotated(base: &Path) -> std::io::Result<Vec<RotatedLog>> {
    let dir = base.parent().unwrap_or_else(|| Path::new("."));
    let Some(base_name) = base.file_name().map(|n| n.to_string_lossy().into_owned()) else {
        return Ok(Vec::new());
    };
    let prefix = format!("{base_name}.");

    let mut rotated = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        if !name.to_string_lossy().starts_with(&prefix) {
            continue;
        }
        if let Some(log) = RotatedLog::parse(entry.path()) {
            rotated.push(log);
        }
    }
    Ok(rotated)
}
