//! Shared fixtures for filesystem tests.
#![allow(dead_code)]

use filevault::RsaCertificate;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub fn cert() -> &'static RsaCertificate {
    static CERT: OnceLock<RsaCertificate> = OnceLock::new();
    CERT.get_or_init(|| RsaCertificate::generate(1024).unwrap())
}

pub fn other_cert() -> &'static RsaCertificate {
    static CERT: OnceLock<RsaCertificate> = OnceLock::new();
    CERT.get_or_init(|| RsaCertificate::generate(1024).unwrap())
}

/// Writes the shared key pair as PEM files; returns (private, public).
pub fn write_key_files(dir: &Path) -> (PathBuf, PathBuf) {
    let private = dir.join("recipient.key.pem");
    let public = dir.join("recipient.pub.pem");
    std::fs::write(&private, cert().private_key_pem().unwrap().as_bytes()).unwrap();
    std::fs::write(&public, cert().public_key_pem().unwrap()).unwrap();
    (private, public)
}

pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i.wrapping_mul(131) ^ (i >> 9)) as u8).collect()
}

/// Names of everything in `dir`, sorted.
pub fn dir_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
