//! # Namehash
//!
//! Registries index domains by a 32-byte node, derived by folding labels from
//! the TLD inward:
//!
//! ```text
//! hash("")              = 0x00..00
//! hash(label "." rest)  = H(hash(rest) || H(label))
//! childhash(parent, l)  = H(parent || H(l))
//! ```
//!
//! The Ethereum registries use keccak-256 for `H`, the Zilliqa registry uses
//! SHA-256. Everything else about the fold is identical, so it is written
//! once and parameterized by [`NamehashFamily`].
//!
//! A node can be presented as `0x` hex or as a decimal integer (ERC-721
//! registries call it the token id). Both are views of the same bytes.

use std::fmt;
use std::str::FromStr;

use super::hash::{keccak256, keccak256_multi, sha256, sha256_multi};
use crate::error::ResolutionError;

/// A 32-byte registry node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Namehash(pub [u8; 32]);

impl Namehash {
    /// Hash of the root (empty) domain.
    pub const ROOT: Namehash = Namehash([0u8; 32]);

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// `0x`-prefixed lowercase big-endian hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Base-10 rendering of the node read as a big-endian unsigned integer.
    pub fn to_decimal(&self) -> String {
        let mut digits = Vec::with_capacity(78);
        let mut value = self.0;
        while value.iter().any(|&b| b != 0) {
            let mut remainder: u32 = 0;
            for byte in value.iter_mut() {
                let acc = (remainder << 8) | u32::from(*byte);
                *byte = (acc / 10) as u8;
                remainder = acc % 10;
            }
            digits.push(b'0' + remainder as u8);
        }
        if digits.is_empty() {
            return "0".to_string();
        }
        digits.reverse();
        String::from_utf8(digits).unwrap_or_default()
    }

    /// Parses a base-10 token id. Fails on overflow past 256 bits.
    pub fn from_decimal(s: &str) -> Result<Self, ResolutionError> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ResolutionError::InvalidNamehash(s.to_string()));
        }
        let mut value = [0u8; 32];
        for digit in s.bytes().map(|b| u32::from(b - b'0')) {
            let mut carry = digit;
            for byte in value.iter_mut().rev() {
                let acc = u32::from(*byte) * 10 + carry;
                *byte = (acc & 0xff) as u8;
                carry = acc >> 8;
            }
            if carry != 0 {
                return Err(ResolutionError::InvalidNamehash(s.to_string()));
            }
        }
        Ok(Namehash(value))
    }

    /// Parses `0x`-prefixed hex (exactly 64 digits).
    pub fn from_hex(s: &str) -> Result<Self, ResolutionError> {
        let body = s
            .strip_prefix("0x")
            .ok_or_else(|| ResolutionError::InvalidNamehash(s.to_string()))?;
        if body.len() != 64 {
            return Err(ResolutionError::InvalidNamehash(s.to_string()));
        }
        let bytes =
            hex::decode(body).map_err(|_| ResolutionError::InvalidNamehash(s.to_string()))?;
        let mut out = [0u8; 32];
        out.copy_from_slice(&bytes);
        Ok(Namehash(out))
    }
}

impl FromStr for Namehash {
    type Err = ResolutionError;

    /// Accepts either presentation: `0x` hex or a decimal token id.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.starts_with("0x") {
            Self::from_hex(s)
        } else {
            Self::from_decimal(s)
        }
    }
}

impl fmt::Display for Namehash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<[u8; 32]> for Namehash {
    fn from(bytes: [u8; 32]) -> Self {
        Namehash(bytes)
    }
}

/// Which hash function drives the fold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamehashFamily {
    /// keccak-256, used by UNS and CNS.
    Ethereum,
    /// SHA-256, used by ZNS.
    Zilliqa,
}

impl NamehashFamily {
    fn label_hash(self, label: &str) -> [u8; 32] {
        match self {
            Self::Ethereum => keccak256(label.as_bytes()),
            Self::Zilliqa => sha256(label.as_bytes()),
        }
    }

    fn combine(self, parent: &[u8; 32], label_hash: &[u8; 32]) -> [u8; 32] {
        match self {
            Self::Ethereum => keccak256_multi(&[parent, label_hash]),
            Self::Zilliqa => sha256_multi(&[parent, label_hash]),
        }
    }

    /// Namehash of a dotted domain, folded from the TLD down. The empty
    /// string is the root.
    pub fn hash(self, domain: &str) -> Namehash {
        if domain.is_empty() {
            return Namehash::ROOT;
        }
        domain
            .rsplit('.')
            .fold(Namehash::ROOT, |parent, label| self.childhash(&parent, label))
    }

    /// Extends `parent` by one label.
    pub fn childhash(self, parent: &Namehash, label: &str) -> Namehash {
        Namehash(self.combine(&parent.0, &self.label_hash(label)))
    }
}

/// keccak-256 namehash.
pub fn eth_namehash(domain: &str) -> Namehash {
    NamehashFamily::Ethereum.hash(domain)
}

/// SHA-256 namehash.
pub fn zns_namehash(domain: &str) -> Namehash {
    NamehashFamily::Zilliqa.hash(domain)
}
