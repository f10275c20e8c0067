//! OS-backed random source for keys, IVs and nonces.

use rand::RngCore;
use zeroize::Zeroizing;

/// Fills `buf` from the operating system CSPRNG.
pub fn fill_random(buf: &mut [u8]) {
    rand::rngs::OsRng.fill_bytes(buf);
}

/// Returns a fresh random array, e.g. an IV or nonce.
pub fn random_array<const N: usize>() -> [u8; N] {
    let mut out = [0u8; N];
    fill_random(&mut out);
    out
}

/// Returns `len` random bytes that are wiped on drop.
pub fn random_secret(len: usize) -> Zeroizing<Vec<u8>> {
    let mut out = Zeroizing::new(vec![0u8; len]);
    fill_random(&mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consecutive_arrays_differ() {
        let a: [u8; 16] = random_array();
        let b: [u8; 16] = random_array();
        assert_ne!(a, b);
    }

    #[test]
    fn secret_has_requested_length() {
        assert_eq!(random_secret(24).len(), 24);
    }
}
