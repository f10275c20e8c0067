//! Symmetric cipher engine: streamed AES-CBC and chunked AES-GCM.

pub mod cbc;
pub mod gcm;

pub use self::cbc::BLOCK_SIZE;
pub use self::gcm::derive_nonce;
