//! Shared fixtures. RSA key generation dominates test time, so each test
//! binary generates its keys once.

#![allow(dead_code)]

use filevault_crypto::RsaCertificate;
use std::sync::OnceLock;

pub fn cert_2048() -> &'static RsaCertificate {
    static CERT: OnceLock<RsaCertificate> = OnceLock::new();
    CERT.get_or_init(|| RsaCertificate::generate(2048).unwrap())
}

pub fn cert_1024() -> &'static RsaCertificate {
    static CERT: OnceLock<RsaCertificate> = OnceLock::new();
    CERT.get_or_init(|| RsaCertificate::generate(1024).unwrap())
}

/// A second, unrelated key pair.
pub fn other_cert_1024() -> &'static RsaCertificate {
    static CERT: OnceLock<RsaCertificate> = OnceLock::new();
    CERT.get_or_init(|| RsaCertificate::generate(1024).unwrap())
}

/// Deterministic, non-repeating test payload.
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i.wrapping_mul(31) ^ (i >> 8)) as u8).collect()
}
