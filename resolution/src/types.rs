//! Core value types shared by every naming service.
//!
//! These are plain values: no interior mutability, no handles back into a
//! service. They cross the public API boundary and serialize to JSON for the
//! command-line front end.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::crypto::keccak256;
use crate::error::CodecError;

/// Record key to value. Absence of a key means "not set".
pub type RecordMap = BTreeMap<String, String>;

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// A 20-byte account or contract address.
///
/// Parsing accepts any letter case. Display renders the EIP-55 mixed-case
/// checksum form, which is what wallets and explorers show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The zero address. Registries use it to mean "unset".
    pub const ZERO: Address = Address([0u8; 20]);

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// `None` for the zero address. Keeps "unset" out of result types.
    pub fn non_zero(self) -> Option<Address> {
        if self.is_zero() {
            None
        } else {
            Some(self)
        }
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Lowercase `0x`-prefixed hex, used on the wire.
    pub fn to_lower_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// EIP-55 checksum encoding: a hex digit is uppercased when the matching
    /// nibble of `keccak256(lowercase_hex)` is 8 or higher.
    pub fn to_checksum(&self) -> String {
        let lower = hex::encode(self.0);
        let digest = keccak256(lower.as_bytes());
        let mut out = String::with_capacity(42);
        out.push_str("0x");
        for (i, ch) in lower.chars().enumerate() {
            let byte = digest[i / 2];
            let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };
            if ch.is_ascii_alphabetic() && nibble >= 8 {
                out.push(ch.to_ascii_uppercase());
            } else {
                out.push(ch);
            }
        }
        out
    }
}

impl FromStr for Address {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        if body.len() != 40 {
            return Err(CodecError::InvalidAddress(s.to_string()));
        }
        let bytes = hex::decode(body).map_err(|_| CodecError::InvalidAddress(s.to_string()))?;
        let mut out = [0u8; 20];
        out.copy_from_slice(&bytes);
        Ok(Address(out))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_checksum())
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_checksum())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Layer
// ---------------------------------------------------------------------------

/// Which physical chain answered a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Layer {
    Layer1,
    Layer2,
    /// Single-layer backends (CNS, ZNS).
    NotApplicable,
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Layer1 => write!(f, "L1"),
            Self::Layer2 => write!(f, "L2"),
            Self::NotApplicable => write!(f, "n/a"),
        }
    }
}

// ---------------------------------------------------------------------------
// NamingServiceName
// ---------------------------------------------------------------------------

/// The registries this crate knows how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NamingServiceName {
    /// Current two-layer Ethereum/Polygon registry.
    #[serde(rename = "UNS")]
    Uns,
    /// Legacy Ethereum registry.
    #[serde(rename = "CNS")]
    Cns,
    /// Zilliqa registry.
    #[serde(rename = "ZNS")]
    Zns,
}

impl fmt::Display for NamingServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uns => write!(f, "UNS"),
            Self::Cns => write!(f, "CNS"),
            Self::Zns => write!(f, "ZNS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Resolution results
// ---------------------------------------------------------------------------

/// One lookup's worth of registry state for a domain.
///
/// `owner == None` means unregistered. `resolver == None` with an owner means
/// registered but unconfigured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionRecord {
    pub owner: Option<Address>,
    pub resolver: Option<Address>,
    pub records: RecordMap,
    pub source: Layer,
}

impl ResolutionRecord {
    /// An all-empty answer, i.e. "nobody owns this".
    pub fn unowned(source: Layer) -> Self {
        Self {
            owner: None,
            resolver: None,
            records: RecordMap::new(),
            source,
        }
    }

    pub fn is_owned(&self) -> bool {
        self.owner.is_some()
    }
}

/// Where a domain's data physically lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub registry_address: Address,
    pub resolver_address: Option<Address>,
    pub network_id: u64,
    pub blockchain: String,
    pub owner_address: Address,
    pub blockchain_provider_url: Option<String>,
}

/// Presentation of a namehash: both variants render the same 32 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NamehashFormat {
    #[default]
    Hex,
    Decimal,
}
