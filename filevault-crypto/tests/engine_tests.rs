mod support;

use filevault_crypto::cipher::derive_nonce;
use filevault_crypto::{
    decode, transport, AesKeySize, AesMode, CancelToken, Certificate, CipherMode, ContainerHeader,
    CryptoError, EngineConfig, HybridEngine, Method, OperationState,
};
use pretty_assertions::assert_eq;
use std::collections::HashSet;
use support::{cert_1024, cert_2048, other_cert_1024, payload};

const ALL_HYBRID: [Method; 6] = [
    Method::Hybrid { key_size: AesKeySize::Aes128, mode: AesMode::Cbc },
    Method::Hybrid { key_size: AesKeySize::Aes192, mode: AesMode::Cbc },
    Method::Hybrid { key_size: AesKeySize::Aes256, mode: AesMode::Cbc },
    Method::Hybrid { key_size: AesKeySize::Aes128, mode: AesMode::Gcm },
    Method::Hybrid { key_size: AesKeySize::Aes192, mode: AesMode::Gcm },
    Method::Hybrid { key_size: AesKeySize::Aes256, mode: AesMode::Gcm },
];

fn small_chunk_engine() -> HybridEngine {
    HybridEngine::new(EngineConfig {
        chunk_size: 64,
        ..EngineConfig::default()
    })
    .unwrap()
}

/// Ciphertext region (after the header) of a hybrid container.
fn body_offset(container: &[u8]) -> usize {
    let (header, _) = decode(container).unwrap();
    header.encoded_len()
}

// ── Round trips ──

#[test]
fn hybrid_round_trip_every_method() {
    let engine = small_chunk_engine();
    let cert = cert_1024();
    for method in ALL_HYBRID {
        for len in [0usize, 1, 64, 100, 1000] {
            let data = payload(len);
            let container = engine.protect_bytes(method, cert, &data).unwrap();
            assert_eq!(container[0], method.cipher_mode().mode_byte());
            let recovered = engine.unprotect_bytes(cert, &container).unwrap();
            assert_eq!(recovered, data, "{method:?} len {len}");
        }
    }
}

#[test]
fn rsa_only_round_trip() {
    let engine = HybridEngine::default();
    let cert = cert_1024();
    for len in [0usize, 1, 62, 63, 500] {
        let data = payload(len);
        let container = engine.protect_bytes(Method::RsaOnly, cert, &data).unwrap();
        assert_eq!(container[0], 0x02);
        assert_eq!(engine.unprotect_bytes(cert, &container).unwrap(), data);
    }
}

#[test]
fn summary_reports_mode_and_final_state() {
    let engine = HybridEngine::default();
    let cert = cert_1024();
    let method = Method::Hybrid { key_size: AesKeySize::Aes192, mode: AesMode::Cbc };

    let mut container = Vec::new();
    let summary = engine
        .protect(method, cert, &mut &b"summary"[..], &mut container, &CancelToken::new())
        .unwrap();
    assert_eq!(summary.cipher_mode, CipherMode::CbcHybrid);
    assert_eq!(summary.key_size, Some(AesKeySize::Aes192));
    assert_eq!(summary.stats.plaintext_bytes, 7);
    assert_eq!(summary.final_state, OperationState::Done);

    let mut out = Vec::new();
    let summary = engine
        .unprotect(cert, &mut container.as_slice(), &mut out, &CancelToken::new())
        .unwrap();
    assert_eq!(summary.cipher_mode, CipherMode::CbcHybrid);
    assert_eq!(summary.key_size, Some(AesKeySize::Aes192));
    assert_eq!(out, b"summary");
}

#[test]
fn each_protect_uses_fresh_key_and_nonce() {
    let engine = HybridEngine::default();
    let cert = cert_1024();
    let data = payload(32);

    let a = engine.protect_bytes(Method::default(), cert, &data).unwrap();
    let b = engine.protect_bytes(Method::default(), cert, &data).unwrap();
    let (ContainerHeader::Hybrid { iv: iv_a, .. }, body_a) = decode(&a).unwrap() else {
        panic!("expected hybrid header");
    };
    let (ContainerHeader::Hybrid { iv: iv_b, .. }, body_b) = decode(&b).unwrap() else {
        panic!("expected hybrid header");
    };
    assert_ne!(iv_a, iv_b);
    assert_ne!(body_a, body_b);
}

// ── Tamper detection ──

#[test]
fn every_gcm_ciphertext_and_tag_byte_is_authenticated() {
    let engine = HybridEngine::default();
    let cert = cert_1024();
    let container = engine.protect_bytes(Method::default(), cert, &payload(48)).unwrap();

    // Skip the 4-byte record length; flip every ciphertext and tag byte.
    let start = body_offset(&container) + 4;
    for i in start..container.len() {
        let mut tampered = container.clone();
        tampered[i] ^= 0x01;
        match engine.unprotect_bytes(cert, &tampered) {
            Err(CryptoError::Crypto) => {}
            other => panic!("byte {i}: expected Crypto error, got {other:?}"),
        }
    }
}

#[test]
fn tampered_gcm_stream_emits_no_plaintext_for_failed_chunk() {
    let engine = small_chunk_engine();
    let cert = cert_1024();
    let container = engine.protect_bytes(Method::default(), cert, &payload(64)).unwrap();

    let mut tampered = container.clone();
    let last = tampered.len() - 1;
    tampered[last] ^= 0x80;

    let mut out = Vec::new();
    let err = engine
        .unprotect(cert, &mut tampered.as_slice(), &mut out, &CancelToken::new())
        .unwrap_err();
    assert!(matches!(err, CryptoError::Crypto));
    assert!(out.is_empty());
}

#[test]
fn crypto_errors_do_not_distinguish_padding_from_tag() {
    let engine = HybridEngine::default();
    let cert = cert_1024();

    let mut gcm = engine.protect_bytes(Method::default(), cert, b"gcm").unwrap();
    let last = gcm.len() - 1;
    gcm[last] ^= 1;
    let gcm_err = engine.unprotect_bytes(cert, &gcm).unwrap_err();

    let cbc_method = Method::Hybrid { key_size: AesKeySize::Aes256, mode: AesMode::Cbc };
    let mut cbc = engine.protect_bytes(cbc_method, cert, b"cbc").unwrap();
    cbc.truncate(cbc.len() - 1);
    let cbc_err = engine.unprotect_bytes(cert, &cbc).unwrap_err();

    assert_eq!(gcm_err.to_string(), cbc_err.to_string());
}

// ── Wrong key ──

#[test]
fn wrong_certificate_never_decrypts() {
    let engine = HybridEngine::default();
    let data = payload(300);
    for method in ALL_HYBRID.into_iter().chain([Method::RsaOnly]) {
        let container = engine.protect_bytes(method, cert_1024(), &data).unwrap();
        match engine.unprotect_bytes(other_cert_1024(), &container) {
            Err(CryptoError::Certificate(_)) | Err(CryptoError::Crypto) => {}
            other => panic!("{method:?}: expected rejection, got {other:?}"),
        }
    }
}

#[test]
fn public_only_certificate_cannot_unprotect() {
    let engine = HybridEngine::default();
    let public = cert_1024().public_only();
    let container = engine.protect_bytes(Method::default(), &public, b"data").unwrap();

    let err = engine.unprotect_bytes(&public, &container).unwrap_err();
    assert!(matches!(err, CryptoError::Certificate(_)));
    assert_eq!(engine.unprotect_bytes(cert_1024(), &container).unwrap(), b"data");
}

#[test]
fn unwrapped_key_with_bad_length_is_certificate_error() {
    let engine = HybridEngine::default();
    let cert = cert_1024();
    let header = ContainerHeader::Hybrid {
        mode: AesMode::Gcm,
        wrapped_key: cert.encrypt(&[0u8; 20]).unwrap(),
        iv: vec![0u8; 12],
    };
    let container = filevault_crypto::encode(&header, &[]);
    assert!(matches!(
        engine.unprotect_bytes(cert, &container),
        Err(CryptoError::Certificate(_))
    ));
}

// ── Format ──

#[test]
fn malformed_containers_are_format_errors() {
    let engine = HybridEngine::default();
    let cert = cert_1024();
    for bytes in [&[][..], &[0x07][..], &[0x01, 0xFF, 0xFF, 0x00, 0x00][..], &[0x00, 1, 0, 0][..]] {
        match engine.unprotect_bytes(cert, bytes) {
            Err(CryptoError::Format(_)) => {}
            other => panic!("{bytes:?}: expected Format, got {other:?}"),
        }
    }
}

// ── Nonce uniqueness ──

#[test]
fn gcm_chunks_never_share_a_nonce() {
    let engine = small_chunk_engine();
    let cert = cert_1024();
    let container = engine.protect_bytes(Method::default(), cert, &payload(64 * 40 + 7)).unwrap();

    let (ContainerHeader::Hybrid { iv, .. }, mut body) = decode(&container).unwrap() else {
        panic!("expected hybrid header");
    };
    let base: [u8; 12] = iv.as_slice().try_into().unwrap();

    let mut chunks = 0u32;
    while !body.is_empty() {
        let len = u32::from_le_bytes(body[..4].try_into().unwrap()) as usize;
        body = &body[4 + len + 16..];
        chunks += 1;
    }
    assert_eq!(chunks, 41);

    let nonces: HashSet<[u8; 12]> = (0..chunks).map(|i| derive_nonce(&base, i)).collect();
    assert_eq!(nonces.len(), chunks as usize);
    assert!(nonces.contains(&base));
}

// ── Cancellation ──

#[test]
fn cancelled_protect_returns_cancelled() {
    let engine = HybridEngine::default();
    let cancel = CancelToken::new();
    cancel.cancel();
    let mut out = Vec::new();
    let err = engine
        .protect(Method::default(), cert_1024(), &mut &b"x"[..], &mut out, &cancel)
        .unwrap_err();
    assert!(matches!(err, CryptoError::Cancelled));
}

// ── Capacity ──

#[test]
fn rsa_only_input_cap_is_enforced() {
    let engine = HybridEngine::new(EngineConfig {
        rsa_only_max_input: 100,
        ..EngineConfig::default()
    })
    .unwrap();
    let err = engine
        .protect_bytes(Method::RsaOnly, cert_1024(), &payload(101))
        .unwrap_err();
    assert!(matches!(err, CryptoError::Capacity { limit: 100, .. }));
}

// ── Scenarios ──

#[test]
fn scenario_five_mib_gcm_256_base64() {
    let engine = HybridEngine::default();
    let cert = cert_2048();
    let data = payload(5 * 1024 * 1024);
    let method = Method::Hybrid { key_size: AesKeySize::Aes256, mode: AesMode::Gcm };

    let container = engine.protect_bytes(method, cert, &data).unwrap();
    let text = transport::encode(&container);

    let decoded = transport::decode(&text).unwrap();
    assert_eq!(decoded[0], 0x01);
    assert_eq!(decoded, container);

    let recovered = engine.unprotect_bytes(cert, &decoded).unwrap();
    assert!(recovered == data, "5 MiB round trip differs");
}

#[test]
fn scenario_rsa_only_fifty_byte_secret() {
    let engine = HybridEngine::default();
    let cert = cert_2048();
    let secret = payload(50);

    let mut container = Vec::new();
    let summary = engine
        .protect(Method::RsaOnly, cert, &mut secret.as_slice(), &mut container, &CancelToken::new())
        .unwrap();
    assert_eq!(summary.stats.chunks, 1);
    assert_eq!(container.len(), 1 + 4 + 256);
    assert_eq!(&container[1..5], &256u32.to_le_bytes());

    assert_eq!(engine.unprotect_bytes(cert, &container).unwrap(), secret);
}

// Property-based tests
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn hybrid_always_roundtrips(
            data in proptest::collection::vec(any::<u8>(), 0..600),
            method_index in 0usize..6,
        ) {
            let engine = small_chunk_engine();
            let method = ALL_HYBRID[method_index];
            let container = engine.protect_bytes(method, cert_1024(), &data).unwrap();
            prop_assert_eq!(engine.unprotect_bytes(cert_1024(), &container).unwrap(), data);
        }

        #[test]
        fn base64_is_idempotent(container in proptest::collection::vec(any::<u8>(), 0..512)) {
            let text = transport::encode(&container);
            prop_assert_eq!(transport::decode(&text).unwrap(), container);
        }
    }
}
