//! ABI encoding (head/tail layout).
//!
//! Static values occupy one word in the head. Dynamic values put an offset in
//! the head, measured from the start of the enclosing sequence, and their
//! body in the tail:
//!
//! - `address`, `uintN`, `bool`: left-padded to 32 bytes.
//! - `bytesN`: right-padded to 32 bytes.
//! - `bytes`, `string`: length word, then the data right-padded to a word
//!   boundary.
//! - `T[]`: length word, then the elements encoded as a sequence.

use super::types::{ParamType, Token, Word};
use crate::error::CodecError;

/// Encodes `tokens` as a sequence of `types` (no selector).
pub fn encode(types: &[ParamType], tokens: &[Token]) -> Result<Vec<u8>, CodecError> {
    if types.len() != tokens.len() {
        return Err(mismatch(format!(
            "expected {} values, got {}",
            types.len(),
            tokens.len()
        )));
    }

    let head_len = 32 * types.len();
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for (kind, token) in types.iter().zip(tokens) {
        if kind.is_dynamic() {
            head.extend_from_slice(&usize_word(head_len + tail.len()));
            tail.extend_from_slice(&encode_dynamic(kind, token)?);
        } else {
            head.extend_from_slice(&encode_static(kind, token)?);
        }
    }

    head.extend_from_slice(&tail);
    Ok(head)
}

fn mismatch(reason: String) -> CodecError {
    CodecError::ArgumentMismatch {
        method: String::new(),
        reason,
    }
}

pub(crate) fn usize_word(value: usize) -> Word {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&(value as u64).to_be_bytes());
    word
}

/// Right-pads `data` to a multiple of 32 bytes.
fn padded(data: &[u8]) -> Vec<u8> {
    let mut out = data.to_vec();
    let rem = out.len() % 32;
    if rem != 0 {
        out.resize(out.len() + 32 - rem, 0);
    }
    out
}

pub(crate) fn encode_static(kind: &ParamType, token: &Token) -> Result<Word, CodecError> {
    let mut word = [0u8; 32];
    match (kind, token) {
        (ParamType::Address, Token::Address(addr)) => {
            word[12..].copy_from_slice(addr.as_bytes());
        }
        (ParamType::Bool, Token::Bool(b)) => {
            word[31] = u8::from(*b);
        }
        (ParamType::Uint(bits), Token::Uint(value)) => {
            let unused = 32 - bits / 8;
            if value[..unused].iter().any(|&b| b != 0) {
                return Err(mismatch(format!("value does not fit in uint{}", bits)));
            }
            word = *value;
        }
        (ParamType::FixedBytes(len), Token::FixedBytes(bytes)) => {
            if bytes.len() != *len {
                return Err(mismatch(format!(
                    "bytes{} needs exactly {} bytes, got {}",
                    len,
                    len,
                    bytes.len()
                )));
            }
            word[..*len].copy_from_slice(bytes);
        }
        _ => {
            return Err(mismatch(format!("{:?} is not a {}", token, kind)));
        }
    }
    Ok(word)
}

fn encode_dynamic(kind: &ParamType, token: &Token) -> Result<Vec<u8>, CodecError> {
    match (kind, token) {
        (ParamType::Bytes, Token::Bytes(bytes)) => Ok(length_prefixed(bytes)),
        (ParamType::String, Token::String(s)) => Ok(length_prefixed(s.as_bytes())),
        (ParamType::Array(inner), Token::Array(items)) => {
            let kinds = vec![(**inner).clone(); items.len()];
            let mut out = usize_word(items.len()).to_vec();
            out.extend_from_slice(&encode(&kinds, items)?);
            Ok(out)
        }
        _ => Err(mismatch(format!("{:?} is not a {}", token, kind))),
    }
}

fn length_prefixed(data: &[u8]) -> Vec<u8> {
    let mut out = usize_word(data.len()).to_vec();
    out.extend_from_slice(&padded(data));
    out
}
