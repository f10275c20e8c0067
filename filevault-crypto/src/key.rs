//! Algorithm selection and ephemeral key material.

use crate::error::{CryptoError, CryptoResult};
use crate::random::{random_array, random_secret};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// CBC initialization vector length.
pub const CBC_IV_SIZE: usize = 16;

/// GCM nonce length.
pub const GCM_NONCE_SIZE: usize = 12;

/// GCM authentication tag length.
pub const GCM_TAG_SIZE: usize = 16;

/// AES key length.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AesKeySize {
    Aes128,
    Aes192,
    #[default]
    Aes256,
}

impl AesKeySize {
    pub fn key_len(self) -> usize {
        match self {
            AesKeySize::Aes128 => 16,
            AesKeySize::Aes192 => 24,
            AesKeySize::Aes256 => 32,
        }
    }

    pub fn bits(self) -> u16 {
        (self.key_len() * 8) as u16
    }

    /// Maps a bit count (128/192/256) to a key size.
    pub fn from_bits(bits: u16) -> CryptoResult<Self> {
        match bits {
            128 => Ok(AesKeySize::Aes128),
            192 => Ok(AesKeySize::Aes192),
            256 => Ok(AesKeySize::Aes256),
            other => Err(CryptoError::Format(format!("unsupported AES key size: {other}"))),
        }
    }

    /// Infers the key size from an unwrapped key.
    pub fn from_key_len(len: usize) -> Option<Self> {
        match len {
            16 => Some(AesKeySize::Aes128),
            24 => Some(AesKeySize::Aes192),
            32 => Some(AesKeySize::Aes256),
            _ => None,
        }
    }
}

/// Symmetric cipher mode for hybrid containers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AesMode {
    Cbc,
    #[default]
    Gcm,
}

impl AesMode {
    /// Length of the IV (CBC) or base nonce (GCM).
    pub fn iv_len(self) -> usize {
        match self {
            AesMode::Cbc => CBC_IV_SIZE,
            AesMode::Gcm => GCM_NONCE_SIZE,
        }
    }
}

/// How a payload is protected.
///
/// AES parameters only exist for the hybrid method, so an RSA-only request
/// cannot carry a key size or mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Hybrid { key_size: AesKeySize, mode: AesMode },
    RsaOnly,
}

impl Default for Method {
    fn default() -> Self {
        Method::Hybrid {
            key_size: AesKeySize::default(),
            mode: AesMode::default(),
        }
    }
}

impl Method {
    pub fn cipher_mode(self) -> CipherMode {
        match self {
            Method::Hybrid {
                mode: AesMode::Cbc, ..
            } => CipherMode::CbcHybrid,
            Method::Hybrid {
                mode: AesMode::Gcm, ..
            } => CipherMode::GcmHybrid,
            Method::RsaOnly => CipherMode::RsaOnly,
        }
    }
}

/// Container layout selector, stored as the leading mode byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CipherMode {
    CbcHybrid,
    GcmHybrid,
    RsaOnly,
}

impl CipherMode {
    pub fn mode_byte(self) -> u8 {
        match self {
            CipherMode::CbcHybrid => 0x00,
            CipherMode::GcmHybrid => 0x01,
            CipherMode::RsaOnly => 0x02,
        }
    }

    /// The AES mode for hybrid layouts, `None` for RSA-only.
    pub fn aes_mode(self) -> Option<AesMode> {
        match self {
            CipherMode::CbcHybrid => Some(AesMode::Cbc),
            CipherMode::GcmHybrid => Some(AesMode::Gcm),
            CipherMode::RsaOnly => None,
        }
    }
}

impl TryFrom<u8> for CipherMode {
    type Error = CryptoError;

    fn try_from(byte: u8) -> CryptoResult<Self> {
        match byte {
            0x00 => Ok(CipherMode::CbcHybrid),
            0x01 => Ok(CipherMode::GcmHybrid),
            0x02 => Ok(CipherMode::RsaOnly),
            other => Err(CryptoError::Format(format!("unknown mode byte 0x{other:02x}"))),
        }
    }
}

/// Ephemeral AES key and IV/nonce for a single operation.
///
/// Wiped on drop, so every exit path (success, error, cancellation, panic
/// unwinding) clears it. `Debug` never prints the bytes.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct KeyMaterial {
    key: Vec<u8>,
    iv: Vec<u8>,
}

impl KeyMaterial {
    /// Generates a fresh key and IV/nonce.
    pub fn generate(key_size: AesKeySize, mode: AesMode) -> Self {
        let key = random_secret(key_size.key_len());
        let iv = match mode {
            AesMode::Cbc => random_array::<CBC_IV_SIZE>().to_vec(),
            AesMode::Gcm => random_array::<GCM_NONCE_SIZE>().to_vec(),
        };
        Self {
            key: key.to_vec(),
            iv,
        }
    }

    /// Rebuilds key material from an unwrapped key and the container IV.
    pub fn from_parts(key: &[u8], iv: &[u8]) -> Self {
        Self {
            key: key.to_vec(),
            iv: iv.to_vec(),
        }
    }

    pub fn key(&self) -> &[u8] {
        &self.key
    }

    pub fn iv(&self) -> &[u8] {
        &self.iv
    }

    pub fn key_size(&self) -> Option<AesKeySize> {
        AesKeySize::from_key_len(self.key.len())
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("key", &"[REDACTED]")
            .field("iv_len", &self.iv.len())
            .finish()
    }
}
