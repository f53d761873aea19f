//! Error taxonomy shared by every sink.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by sinks.
///
/// The file-path variants come from the rolling file sink's rotation
/// machinery; console sinks mostly produce [`SinkError::Io`]. Callers that
/// only care whether a write landed can treat the enum opaquely, while
/// operational tooling can match on the rotation-specific variants.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to close {}: {source}", .path.display())]
    Close {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to rename {} to {}: {source}", .from.display(), .to.display())]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write to {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to sync {}: {source}", .path.display())]
    Sync {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to stat {}: {source}", .path.display())]
    Stat {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to encode rotation state to {}: {source}", .path.display())]
    EncodeState {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to decode rotation state from {}: {source}", .path.display())]
    DecodeState {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The sink has no usable file handle, e.g. after a failed rotation.
    /// Appends keep returning this until a `reopen` or `rotate` succeeds.
    #[error("no log file to write to")]
    NoFile,

    /// The collision-serial search space for rotated filenames ran out.
    #[error("rotation serial numbers exhausted for {} (max {max})", .path.display())]
    SerialsExhausted { path: PathBuf, max: u64 },

    /// Housekeeping during rotation (pruning or compressing retired
    /// files) failed. The rotation itself completed and the sink remains
    /// writable.
    #[error("minor error while rotating logs: {0}")]
    Rotation(String),

    /// The async drain worker is no longer running.
    #[error("sink worker has stopped")]
    WorkerStopped,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl SinkError {
    /// Whether this error left the sink unable to accept appends.
    pub fn is_fatal_for_sink(&self) -> bool {
        matches!(
            self,
            SinkError::NoFile | SinkError::SerialsExhausted { .. } | SinkError::WorkerStopped
        )
    }
}
