//! Tests for the rolling file sink.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::thread::sleep;
use std::time::Duration;

use tempfile::TempDir;

use timber_core::{Level, Record, Sink, SinkError};

use super::rotated::RotatedLog;
use crate::{RollingFileConfig, RollingFileSink};

fn record(message: &str) -> Record {
    Record::new("roll-test", Level::Warn, message)
}

fn config(dir: &TempDir) -> RollingFileConfig {
    RollingFileConfig::new(dir.path().join("app.log"))
}

/// Log files in the directory: the active file plus rotated ones, with
/// the state sidecar excluded.
fn log_files(dir: &TempDir) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| {
            !path
                .file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with('.')
        })
        .collect();
    files.sort();
    files
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}

fn read_gz(path: &Path) -> String {
    let mut decoder = flate2::read::GzDecoder::new(fs::File::open(path).unwrap());
    let mut contents = String::new();
    decoder.read_to_string(&mut contents).unwrap();
    contents
}

#[test]
fn append_and_flush_land_on_disk() {
    let dir = TempDir::new().unwrap();
    let sink = RollingFileSink::open(config(&dir).with_max_file_size(1000)).unwrap();

    sink.append(&record("this is a log message")).unwrap();
    sink.flush().unwrap();

    assert!(read(sink.path()).contains("this is a log message"));
}

#[test]
fn no_rotation_under_threshold() {
    let dir = TempDir::new().unwrap();
    let sink = RollingFileSink::open(config(&dir).with_max_file_size(1000)).unwrap();

    sink.append(&record("well under the threshold")).unwrap();
    sink.flush().unwrap();

    assert_eq!(log_files(&dir).len(), 1);
}

#[test]
fn no_rotation_when_triggers_disabled() {
    let dir = TempDir::new().unwrap();
    let sink = RollingFileSink::open(config(&dir)).unwrap();

    sink.append(&record(&"x".repeat(100_000))).unwrap();
    sink.flush().unwrap();

    assert_eq!(log_files(&dir).len(), 1);
}

#[test]
fn size_trigger_rotates_once() {
    let dir = TempDir::new().unwrap();
    let sink = RollingFileSink::open(config(&dir).with_max_file_size(10)).unwrap();

    sink.append(&record("this is more than 10 characters")).unwrap();
    sink.flush().unwrap();

    let files = log_files(&dir);
    assert_eq!(files.len(), 2, "active plus exactly one rotated file");

    // The triggering record went into the file that was rotated away;
    // the fresh active file starts empty.
    assert_eq!(read(sink.path()), "");
    let rotated: Vec<_> = files.iter().filter(|p| *p != sink.path()).collect();
    assert!(read(rotated[0]).contains("more than 10 characters"));
    assert!(
        RotatedLog::parse(rotated[0].clone()).is_some(),
        "rotated name must carry the timestamp pattern"
    );
}

#[test]
fn pruning_keeps_newest_rotated_files() {
    let dir = TempDir::new().unwrap();
    let sink = RollingFileSink::open(
        config(&dir)
            .with_max_file_size(10)
            .with_max_rotated_logs(2),
    )
    .unwrap();

    sink.append(&record("first rotation trigger message")).unwrap();
    assert_eq!(log_files(&dir).len(), 2);

    sink.append(&record("second rotation trigger message")).unwrap();
    assert_eq!(log_files(&dir).len(), 3);

    sink.append(&record("third rotation trigger message")).unwrap();
    assert_eq!(
        log_files(&dir).len(),
        3,
        "two rotated files plus the active one"
    );
    assert!(sink.path().exists(), "the active file is never pruned");
}

#[test]
fn rotate_if_exists_rotates_at_construction() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.log");
    fs::write(&path, "leftover from a previous run\n").unwrap();

    let sink = RollingFileSink::open(
        RollingFileConfig::new(&path)
            .with_max_file_size(1000)
            .with_rotate_if_exists(),
    )
    .unwrap();
    sink.flush().unwrap();

    let files = log_files(&dir);
    assert_eq!(files.len(), 2);
    assert_eq!(read(sink.path()), "", "old contents were rotated away");
}

#[test]
fn append_to_existing_file_recovers_size() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.log");
    fs::write(&path, "x".repeat(90)).unwrap();

    // 90 bytes already on disk; the next append pushes past 100.
    let sink = RollingFileSink::open(
        RollingFileConfig::new(&path).with_max_file_size(100),
    )
    .unwrap();
    sink.append(&record("tip it over the limit")).unwrap();

    assert_eq!(log_files(&dir).len(), 2);
}

#[test]
fn manual_rotation() {
    let dir = TempDir::new().unwrap();
    let sink = RollingFileSink::open(config(&dir)).unwrap();

    sink.append(&record("before the operator stepped in")).unwrap();
    sink.rotate().unwrap();

    assert_eq!(log_files(&dir).len(), 2);
    assert_eq!(read(sink.path()), "");

    sink.append(&record("after rotation")).unwrap();
    assert!(read(sink.path()).contains("after rotation"));
}

#[test]
fn duration_epoch_survives_restart() {
    let dir = TempDir::new().unwrap();
    let make_config = || config(&dir).with_max_duration(Duration::from_millis(400));

    let sink = RollingFileSink::open(make_config()).unwrap();
    sink.append(&record("written young")).unwrap();
    assert_eq!(log_files(&dir).len(), 1, "file is younger than the limit");
    sink.close().unwrap();
    drop(sink);

    // The rotation clock keeps running while the process is "down".
    sleep(Duration::from_millis(450));

    let sink = RollingFileSink::open(make_config()).unwrap();
    sink.append(&record("written after restart")).unwrap();
    assert_eq!(
        log_files(&dir).len(),
        2,
        "persisted epoch triggers exactly one rotation"
    );

    sink.append(&record("fresh epoch")).unwrap();
    assert_eq!(log_files(&dir).len(), 2, "no second rotation");
}

#[test]
fn same_second_rotations_get_serials() {
    let dir = TempDir::new().unwrap();
    let sink = RollingFileSink::open(config(&dir)).unwrap();

    sink.append(&record("one")).unwrap();
    sink.rotate().unwrap();
    sink.rotate().unwrap();
    sink.rotate().unwrap();

    let files = log_files(&dir);
    assert_eq!(files.len(), 4);

    let serials: Vec<u64> = files
        .iter()
        .filter(|path| **path != sink.path())
        .filter_map(|path| RotatedLog::parse(path.clone()))
        .map(|log| log.serial)
        .collect();
    assert_eq!(serials.len(), 3, "every rotated name parses");
    assert!(
        serials.iter().any(|&serial| serial > 0),
        "three rotations in the same instant need collision serials: {serials:?}"
    );
}

#[test]
fn header_is_rewritten_but_not_counted() {
    let dir = TempDir::new().unwrap();
    let banner = "#".repeat(600);
    let sink = RollingFileSink::open(
        config(&dir)
            .with_max_file_size(400)
            .with_header(move || vec![banner.clone(), "# fields: ts level msg".into()]),
    )
    .unwrap();

    // The header alone is bigger than the size limit; if it counted, this
    // short append would already rotate.
    sink.append(&record("short")).unwrap();
    assert_eq!(log_files(&dir).len(), 1);
    assert!(read(sink.path()).starts_with("["));
    assert!(read(sink.path()).contains("# fields"));

    // Push the record bytes themselves past the limit: exactly one
    // rotation, and the fresh file gets the header again.
    sink.append(&record(&"y".repeat(400))).unwrap();
    assert_eq!(log_files(&dir).len(), 2);
    assert!(read(sink.path()).contains("# fields"));
    assert!(!read(sink.path()).contains("yyy"));
}

#[test]
fn custom_formatter_is_used() {
    let dir = TempDir::new().unwrap();
    let sink = RollingFileSink::open(
        config(&dir).with_formatter(|record| format!("CUSTOM {}\n", record.message)),
    )
    .unwrap();

    sink.append(&record("payload")).unwrap();
    assert_eq!(read(sink.path()), "CUSTOM payload\n");
}

#[test]
fn reopen_picks_up_external_rotation() {
    let dir = TempDir::new().unwrap();
    let sink = RollingFileSink::open(config(&dir)).unwrap();

    sink.append(&record("before the daemon renamed us")).unwrap();

    // An external log rotator renames the file out from under the sink.
    let moved = dir.path().join("app.log.moved");
    fs::rename(sink.path(), &moved).unwrap();

    // The open handle still points at the renamed inode.
    sink.append(&record("written to the renamed file")).unwrap();
    sink.reopen().unwrap();
    sink.append(&record("written to the fresh file")).unwrap();
    sink.flush().unwrap();

    let old = read(&moved);
    assert!(old.contains("before the daemon renamed us"));
    assert!(old.contains("written to the renamed file"));

    let fresh = read(sink.path());
    assert!(fresh.contains("written to the fresh file"));
    assert!(!fresh.contains("renamed file"));
}

#[test]
fn compression_replaces_rotated_files() {
    let dir = TempDir::new().unwrap();
    let sink = RollingFileSink::open(config(&dir).with_compression(0)).unwrap();

    sink.append(&record("squeeze me")).unwrap();
    sink.rotate().unwrap();

    let files = log_files(&dir);
    assert_eq!(files.len(), 2);
    let gz: Vec<_> = files
        .iter()
        .filter(|p| p.to_string_lossy().ends_with(".gz"))
        .collect();
    assert_eq!(gz.len(), 1, "the rotated file was compressed: {files:?}");
    assert!(read_gz(gz[0]).contains("squeeze me"));
}

#[test]
fn compression_keeps_newest_uncompressed() {
    let dir = TempDir::new().unwrap();
    let sink = RollingFileSink::open(config(&dir).with_compression(1)).unwrap();

    sink.append(&record("older")).unwrap();
    sink.rotate().unwrap();
    sink.append(&record("newer")).unwrap();
    sink.rotate().unwrap();

    let files = log_files(&dir);
    assert_eq!(files.len(), 3);

    let gz: Vec<_> = files
        .iter()
        .filter(|p| p.to_string_lossy().ends_with(".gz"))
        .collect();
    assert_eq!(gz.len(), 1, "only the oldest rotated file is compressed");
    assert!(read_gz(gz[0]).contains("older"));
}

#[test]
fn pruning_counts_compressed_files() {
    let dir = TempDir::new().unwrap();
    let sink = RollingFileSink::open(
        config(&dir)
            .with_compression(0)
            .with_max_rotated_logs(1),
    )
    .unwrap();

    sink.append(&record("first")).unwrap();
    sink.rotate().unwrap();
    sink.append(&record("second")).unwrap();
    sink.rotate().unwrap();

    let files = log_files(&dir);
    assert_eq!(
        files.len(),
        2,
        "one retained (compressed) rotated file plus the active one: {files:?}"
    );
    let gz: Vec<_> = files
        .iter()
        .filter(|p| p.to_string_lossy().ends_with(".gz"))
        .collect();
    assert_eq!(gz.len(), 1);
    assert!(read_gz(gz[0]).contains("second"), "the older file was pruned");
}

#[test]
fn compressed_copy_inherits_modification_time() {
    let dir = TempDir::new().unwrap();

    // First sink rotates without compression, leaving a plain rotated
    // file behind.
    let sink = RollingFileSink::open(config(&dir)).unwrap();
    sink.append(&record("timestamped")).unwrap();
    sink.rotate().unwrap();
    sink.close().unwrap();
    drop(sink);

    let rotated = log_files(&dir)
        .into_iter()
        .find(|p| RotatedLog::parse(p.clone()).is_some())
        .unwrap();
    let original_mtime = fs::metadata(&rotated).unwrap().modified().unwrap();

    // A second sink with compression enabled retires it on next rotation.
    let sink = RollingFileSink::open(config(&dir).with_compression(0)).unwrap();
    sink.rotate().unwrap();

    let gz = PathBuf::from(format!("{}.gz", rotated.display()));
    assert!(gz.exists());
    assert!(!rotated.exists(), "original removed after compression");
    assert_eq!(
        fs::metadata(&gz).unwrap().modified().unwrap(),
        original_mtime
    );
}

#[test]
fn closed_sink_reports_no_file() {
    let dir = TempDir::new().unwrap();
    let sink = RollingFileSink::open(config(&dir)).unwrap();

    sink.close().unwrap();
    let err = sink.append(&record("too late")).unwrap_err();
    assert!(matches!(err, SinkError::NoFile), "got: {err}");

    // Flush on a closed sink has nothing pending and succeeds.
    sink.flush().unwrap();

    // Reopen restores service.
    sink.reopen().unwrap();
    sink.append(&record("back in business")).unwrap();
    assert!(read(sink.path()).contains("back in business"));
}
