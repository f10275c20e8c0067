//! Hybrid container encryption for filevault.
//!
//! Protects byte streams for a single recipient certificate using:
//! - RSA-OAEP (SHA-256) to wrap an ephemeral AES key
//! - AES-CBC (PKCS7) or chunked AES-GCM for the payload
//! - RSA-OAEP alone for small payloads
//!
//! # Container
//!
//! A container starts with a mode byte that decides how the rest is parsed:
//!
//! | Mode | Layout |
//! |------|--------|
//! | `0x00` | CBC: wrapped key length, wrapped key, 16-byte IV, ciphertext |
//! | `0x01` | GCM: wrapped key length, wrapped key, 12-byte nonce, chunk records |
//! | `0x02` | RSA-only: length-prefixed RSA blocks |
//!
//! Every container gets a fresh AES key and IV/nonce. GCM chunks are sealed
//! under per-chunk nonces derived from the base nonce, so large files never
//! reuse a (key, nonce) pair.
//!
//! Containers can optionally be carried as Base64 text, see [`transport`].

pub mod cancel;
pub mod certificate;
pub mod cipher;
pub mod container;
pub mod engine;
mod error;
pub mod key;
pub mod random;
pub mod rsa_only;
mod stream;
pub mod transport;

pub use cancel::CancelToken;
pub use certificate::{max_oaep_payload, Certificate, RsaCertificate, OAEP_HASH_LEN};
pub use container::{decode, encode, ContainerHeader};
pub use engine::{EngineConfig, HybridEngine, OperationState, OperationSummary};
pub use error::{CryptoError, CryptoResult};
pub use key::{AesKeySize, AesMode, CipherMode, KeyMaterial, Method};
pub use stream::{StreamStats, DEFAULT_CHUNK_SIZE, MAX_CHUNK_SIZE};
