use chrono::{TimeDelta, Utc};
use filevault_erase::{erase, EraseConfig, EraseError, SecureEraser};
use pretty_assertions::assert_eq;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fs::{self, File};
use tempfile::TempDir;

fn write_file(dir: &TempDir, name: &str, contents: &[u8]) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn erase_removes_file() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "secret.txt", b"attack at dawn");

    let report = erase(&path, 3).unwrap();

    assert!(!path.exists());
    assert_eq!(report.path, path);
    assert_eq!(report.bytes, 14);
    assert_eq!(report.passes.len(), 3);
    assert_eq!(
        report.passes.iter().map(|p| p.pass).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
}

#[test]
fn pass_hashes_differ_from_original_and_each_other() {
    let dir = TempDir::new().unwrap();
    let original = vec![0x42u8; 4096];
    let path = write_file(&dir, "secret.bin", &original);
    let original_hash = hex::encode(Sha256::digest(&original));

    let report = erase(&path, 5).unwrap();

    let hashes: Vec<String> = report
        .passes
        .iter()
        .map(|p| p.sha256.clone().unwrap())
        .collect();
    assert_eq!(hashes.len(), 5);
    assert!(hashes.iter().all(|h| h.len() == 64));
    assert!(!hashes.contains(&original_hash));
    assert_eq!(hashes.iter().collect::<HashSet<_>>().len(), 5);
}

#[test]
fn timestamps_fall_in_lookback_window() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "a.txt", b"data");
    let before = Utc::now();

    let report = SecureEraser::new(EraseConfig {
        lookback_days: 3,
        ..EraseConfig::with_passes(4)
    })
    .unwrap()
    .erase(&path)
    .unwrap();

    let after = Utc::now();
    for pass in &report.passes {
        assert!(pass.timestamp <= after);
        // Second resolution on the offset; allow the sub-second slack.
        assert!(pass.timestamp >= before - TimeDelta::days(3) - TimeDelta::seconds(1));
    }
}

#[test]
fn file_larger_than_block_is_fully_overwritten() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "big.bin", &vec![7u8; 10_000]);

    let report = SecureEraser::new(EraseConfig {
        block_size: 1024,
        ..EraseConfig::with_passes(2)
    })
    .unwrap()
    .erase(&path)
    .unwrap();

    assert_eq!(report.bytes, 10_000);
    assert!(!path.exists());
}

#[test]
fn verification_can_be_disabled() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "a.txt", b"data");

    let report = SecureEraser::new(EraseConfig {
        verify: false,
        ..EraseConfig::with_passes(2)
    })
    .unwrap()
    .erase(&path)
    .unwrap();

    assert!(report.passes.iter().all(|p| p.sha256.is_none()));
    assert!(!path.exists());
}

#[test]
fn empty_file_is_removed() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "empty", b"");

    let report = erase(&path, 1).unwrap();
    assert_eq!(report.bytes, 0);
    assert!(!path.exists());
}

#[test]
fn locked_file_is_left_untouched() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "held.txt", b"still here");

    let holder = File::open(&path).unwrap();
    holder.lock().unwrap();

    let err = erase(&path, 1).unwrap_err();
    assert!(matches!(err, EraseError::Locked(_)));
    assert_eq!(fs::read(&path).unwrap(), b"still here");

    holder.unlock().unwrap();
    erase(&path, 1).unwrap();
    assert!(!path.exists());
}

#[test]
fn zero_passes_is_config_error() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "a.txt", b"data");

    assert!(matches!(erase(&path, 0), Err(EraseError::InvalidConfig(_))));
    assert!(path.exists());
}

#[test]
fn directory_is_not_a_file() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(
        erase(dir.path(), 1),
        Err(EraseError::NotAFile(_))
    ));
}

#[test]
fn missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let err = erase(&dir.path().join("nope"), 1).unwrap_err();
    match err {
        EraseError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
        other => panic!("expected Io, got {other:?}"),
    }
}

#[test]
fn error_display() {
    assert_eq!(
        EraseError::InvalidConfig("x".into()).to_string(),
        "invalid erase configuration: x"
    );
}
