//! ABI parameter types and the dynamically typed values that flow through
//! the codec.

use std::fmt;

use crate::crypto::Namehash;
use crate::error::CodecError;
use crate::types::Address;

/// One 32-byte ABI word.
pub type Word = [u8; 32];

// ---------------------------------------------------------------------------
// ParamType
// ---------------------------------------------------------------------------

/// The subset of Solidity types the registries' read interfaces use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamType {
    Address,
    Bool,
    /// `uintN`, N in bits (8..=256, multiple of 8).
    Uint(usize),
    /// `bytesN`, N in bytes (1..=32).
    FixedBytes(usize),
    Bytes,
    String,
    /// `T[]`
    Array(Box<ParamType>),
}

impl ParamType {
    /// Parses a Solidity type string such as `uint256`, `bytes4` or
    /// `string[][]`.
    pub fn parse(s: &str) -> Result<Self, CodecError> {
        let invalid = |reason: &str| CodecError::InvalidFragment {
            fragment: s.to_string(),
            reason: reason.to_string(),
        };

        if let Some(inner) = s.strip_suffix("[]") {
            return Ok(ParamType::Array(Box::new(ParamType::parse(inner)?)));
        }

        match s {
            "address" => return Ok(ParamType::Address),
            "bool" => return Ok(ParamType::Bool),
            "string" => return Ok(ParamType::String),
            "bytes" => return Ok(ParamType::Bytes),
            "uint" => return Ok(ParamType::Uint(256)),
            _ => {}
        }

        if let Some(bits) = s.strip_prefix("uint") {
            let bits: usize = bits.parse().map_err(|_| invalid("bad uint width"))?;
            if bits == 0 || bits > 256 || bits % 8 != 0 {
                return Err(invalid("uint width must be a multiple of 8 up to 256"));
            }
            return Ok(ParamType::Uint(bits));
        }

        if let Some(len) = s.strip_prefix("bytes") {
            let len: usize = len.parse().map_err(|_| invalid("bad bytes length"))?;
            if len == 0 || len > 32 {
                return Err(invalid("bytesN length must be 1..=32"));
            }
            return Ok(ParamType::FixedBytes(len));
        }

        Err(invalid("unsupported type"))
    }

    /// Whether the value lives in the tail (behind an offset) rather than
    /// inline in the head.
    pub fn is_dynamic(&self) -> bool {
        matches!(
            self,
            ParamType::Bytes | ParamType::String | ParamType::Array(_)
        )
    }
}

impl fmt::Display for ParamType {
    /// Canonical spelling used inside function and event signatures.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::Address => write!(f, "address"),
            ParamType::Bool => write!(f, "bool"),
            ParamType::Uint(bits) => write!(f, "uint{}", bits),
            ParamType::FixedBytes(len) => write!(f, "bytes{}", len),
            ParamType::Bytes => write!(f, "bytes"),
            ParamType::String => write!(f, "string"),
            ParamType::Array(inner) => write!(f, "{}[]", inner),
        }
    }
}

// ---------------------------------------------------------------------------
// Token
// ---------------------------------------------------------------------------

/// A decoded (or to-be-encoded) ABI value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Address(Address),
    Bool(bool),
    /// Big-endian unsigned integer, any declared width.
    Uint(Word),
    FixedBytes(Vec<u8>),
    Bytes(Vec<u8>),
    String(String),
    Array(Vec<Token>),
}

impl Token {
    pub fn uint(value: u64) -> Token {
        let mut word = [0u8; 32];
        word[24..].copy_from_slice(&value.to_be_bytes());
        Token::Uint(word)
    }

    pub fn string(value: impl Into<String>) -> Token {
        Token::String(value.into())
    }

    pub fn string_array<S: AsRef<str>>(values: &[S]) -> Token {
        Token::Array(
            values
                .iter()
                .map(|v| Token::String(v.as_ref().to_string()))
                .collect(),
        )
    }

    pub fn uint_array(values: &[Namehash]) -> Token {
        Token::Array(values.iter().map(|v| Token::from(*v)).collect())
    }

    pub fn as_address(&self) -> Option<Address> {
        match self {
            Token::Address(a) => Some(*a),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Token::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_uint(&self) -> Option<&Word> {
        match self {
            Token::Uint(w) => Some(w),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Token::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Token::Bytes(b) | Token::FixedBytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Token]> {
        match self {
            Token::Array(items) => Some(items),
            _ => None,
        }
    }

    /// A homogeneous `string[]`, or `None` on any shape mismatch.
    pub fn to_string_vec(&self) -> Option<Vec<String>> {
        self.as_array()?
            .iter()
            .map(|t| t.as_str().map(str::to_string))
            .collect()
    }

    /// A homogeneous `address[]`, or `None` on any shape mismatch.
    pub fn to_address_vec(&self) -> Option<Vec<Address>> {
        self.as_array()?.iter().map(Token::as_address).collect()
    }
}

impl From<Namehash> for Token {
    fn from(node: Namehash) -> Self {
        Token::Uint(node.0)
    }
}

impl From<Address> for Token {
    fn from(address: Address) -> Self {
        Token::Address(address)
    }
}
