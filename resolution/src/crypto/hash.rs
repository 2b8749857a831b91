//! # Hash Primitives
//!
//! Two functions, both returning fixed 32-byte arrays, plus "multi" variants
//! that stream several slices into one hasher so callers folding
//! `parent || H(label)` never allocate a concatenation buffer.
//!
//! Note that keccak-256 is *not* SHA3-256: Ethereum froze the pre-standard
//! Keccak padding, and `sha3::Keccak256` is the variant that matches it.

use sha2::Sha256;
use sha3::{Digest, Keccak256};

/// Keccak-256 digest as used by Ethereum.
///
/// # Example
///
/// ```
/// use resolution::crypto::keccak256;
///
/// let selector = &keccak256(b"transfer(address,uint256)")[..4];
/// assert_eq!(selector, [0xa9, 0x05, 0x9c, 0xbb]);
/// ```
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    keccak256_multi(&[data])
}

/// Keccak-256 over several slices fed back to back.
pub fn keccak256_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    for part in parts {
        hasher.update(part);
    }
    let mut output = [0u8; 32];
    output.copy_from_slice(&hasher.finalize());
    output
}

/// SHA-256 digest.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    sha256_multi(&[data])
}

/// SHA-256 over several slices fed back to back.
pub fn sha256_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    let mut output = [0u8; 32];
    output.copy_from_slice(&hasher.finalize());
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_known_vector() {
        // SHA-256 of the empty string.
        let expected =
            hex::decode("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855")
                .unwrap();
        assert_eq!(sha256(b"").as_slice(), expected.as_slice());
    }

    #[test]
    fn test_keccak256_known_vector() {
        // Keccak-256 of the empty string, which differs from SHA3-256("").
        let expected =
            hex::decode("c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470")
                .unwrap();
        assert_eq!(keccak256(b"").as_slice(), expected.as_slice());
    }

    #[test]
    fn test_multi_matches_concatenation() {
        assert_eq!(
            keccak256_multi(&[b"hello", b" world"]),
            keccak256(b"hello world")
        );
        assert_eq!(sha256_multi(&[b"hello", b" world"]), sha256(b"hello world"));
    }

    #[test]
    fn test_families_differ() {
        assert_ne!(keccak256(b"crypto"), sha256(b"crypto"));
    }
}
