//! Durable rotation state.
//!
//! A tiny JSON object stored beside the active log file so that
//! duration-based rotation survives process restarts: without it, every
//! restart would reset the rotation clock and a frequently-restarted
//! process would never rotate on time.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

use timber_core::SinkError;

/// Prefix marking the sidecar as internal; combined with the log file's
/// own name it also keeps the file hidden on unix-likes.
const SIDECAR_PREFIX: &str = ".timber-state-";

/// State serialized to the sidecar file.
///
/// The schema must stay forward compatible: fields added later should
/// carry `#[serde(default)]` so older sidecars still read, and existing
/// fields must not change type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct RotationState {
    /// When the active log file started accumulating toward a
    /// duration-based rotation.
    #[serde(rename = "logStartTime", default = "unix_epoch")]
    pub log_start_time: DateTime<Local>,
}

fn unix_epoch() -> DateTime<Local> {
    DateTime::<Utc>::UNIX_EPOCH.with_timezone(&Local)
}

impl RotationState {
    /// Fresh state with the epoch starting now.
    pub(crate) fn stamped_now() -> Self {
        Self {
            log_start_time: Local::now(),
        }
    }

    /// Sidecar path for a given log path: same directory, prefixed name.
    pub(crate) fn sidecar_path(log_path: &Path) -> PathBuf {
        let file_name = log_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let sidecar = format!("{SIDECAR_PREFIX}{file_name}");
        match log_path.parent() {
            Some(dir) => dir.join(sidecar),
            None => PathBuf::from(sidecar),
        }
    }

    pub(crate) fn exists(path: &Path) -> Result<bool, SinkError> {
        match std::fs::metadata(path) {
            Ok(_) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(SinkError::Stat {
                path: path.to_path_buf(),
                source: err,
            }),
        }
    }

    pub(crate) fn load(path: &Path) -> Result<Self, SinkError> {
        let file = File::open(path).map_err(|err| SinkError::Open {
            path: path.to_path_buf(),
            source: err,
        })?;
        serde_json::from_reader(file).map_err(|err| SinkError::DecodeState {
            path: path.to_path_buf(),
            source: err,
        })
    }

    pub(crate) fn store(&self, path: &Path) -> Result<(), SinkError> {
        let file = File::create(path).map_err(|err| SinkError::Open {
            path: path.to_path_buf(),
            source: err,
        })?;
        serde_json::to_writer(file, self).map_err(|err| SinkError::EncodeState {
            path: path.to_path_buf(),
            source: err,
        })
    }
}
