//! ABI decoding with strict bounds and padding checks.
//!
//! Nothing here trusts an offset or a length: every read is bounds-checked,
//! array lengths are capped by the remaining data, and padding bits must be
//! zero. Offsets may not make the decoder revisit the same bytes: the total
//! consumed is capped at the reply length, which is exactly what a canonical
//! encoding consumes. Anything that does not fit the declared shape is a
//! [`CodecError::Decode`].

use super::types::{ParamType, Token, Word};
use crate::error::CodecError;
use crate::types::Address;

/// Decodes a sequence of `types` from `data`.
pub fn decode(types: &[ParamType], data: &[u8]) -> Result<Vec<Token>, CodecError> {
    Decoder {
        data,
        budget: data.len(),
    }
    .sequence(types, 0)
}

fn err(reason: impl Into<String>) -> CodecError {
    CodecError::decode("abi", reason)
}

struct Decoder<'a> {
    data: &'a [u8],
    /// Bytes still allowed to be consumed.
    budget: usize,
}

impl Decoder<'_> {
    fn charge(&mut self, bytes: usize) -> Result<(), CodecError> {
        self.budget = self
            .budget
            .checked_sub(bytes)
            .ok_or_else(|| err("offsets overlap: reply reuses its own data"))?;
        Ok(())
    }

    fn word(&mut self, at: usize) -> Result<Word, CodecError> {
        let end = at
            .checked_add(32)
            .ok_or_else(|| err("offset overflow"))?;
        let slice = self
            .data
            .get(at..end)
            .ok_or_else(|| err(format!("reply too short: need {} bytes, have {}", end, self.data.len())))?;
        self.charge(32)?;
        let mut word = [0u8; 32];
        word.copy_from_slice(slice);
        Ok(word)
    }

    /// Reads a word holding an offset or length; must fit comfortably in usize.
    fn usize_at(&mut self, at: usize) -> Result<usize, CodecError> {
        let word = self.word(at)?;
        if word[..24].iter().any(|&b| b != 0) {
            return Err(err("offset or length out of range"));
        }
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&word[24..]);
        let value = u64::from_be_bytes(buf);
        usize::try_from(value).map_err(|_| err("offset or length out of range"))
    }

    fn sequence(&mut self, types: &[ParamType], base: usize) -> Result<Vec<Token>, CodecError> {
        let mut out = Vec::with_capacity(types.len());
        for (i, kind) in types.iter().enumerate() {
            let head = base + 32 * i;
            if kind.is_dynamic() {
                let offset = self.usize_at(head)?;
                let at = base
                    .checked_add(offset)
                    .ok_or_else(|| err("offset overflow"))?;
                out.push(self.dynamic(kind, at)?);
            } else {
                let word = self.word(head)?;
                out.push(decode_static(kind, &word)?);
            }
        }
        Ok(out)
    }

    fn dynamic(&mut self, kind: &ParamType, at: usize) -> Result<Token, CodecError> {
        let len = self.usize_at(at)?;
        let body = at + 32;
        match kind {
            ParamType::Bytes | ParamType::String => {
                let end = body
                    .checked_add(len)
                    .ok_or_else(|| err("length overflow"))?;
                let bytes = self
                    .data
                    .get(body..end)
                    .ok_or_else(|| err("byte string runs past end of reply"))?
                    .to_vec();
                self.charge(len)?;
                if matches!(kind, ParamType::String) {
                    String::from_utf8(bytes)
                        .map(Token::String)
                        .map_err(|_| err("string is not valid utf-8"))
                } else {
                    Ok(Token::Bytes(bytes))
                }
            }
            ParamType::Array(inner) => {
                // Each element needs at least one head word.
                let remaining = self.data.len().saturating_sub(body);
                if len > remaining / 32 || len > self.budget / 32 {
                    return Err(err("array length exceeds reply size"));
                }
                let kinds = vec![(**inner).clone(); len];
                Ok(Token::Array(self.sequence(&kinds, body)?))
            }
            other => Err(err(format!("{} is not a dynamic type", other))),
        }
    }
}

fn decode_static(kind: &ParamType, word: &Word) -> Result<Token, CodecError> {
    match kind {
        ParamType::Address => {
            if word[..12].iter().any(|&b| b != 0) {
                return Err(err("address has non-zero padding"));
            }
            let mut addr = [0u8; 20];
            addr.copy_from_slice(&word[12..]);
            Ok(Token::Address(Address(addr)))
        }
        ParamType::Bool => {
            if word[..31].iter().any(|&b| b != 0) || word[31] > 1 {
                return Err(err("bool out of range"));
            }
            Ok(Token::Bool(word[31] == 1))
        }
        ParamType::Uint(bits) => {
            let unused = 32 - bits / 8;
            if word[..unused].iter().any(|&b| b != 0) {
                return Err(err(format!("value overflows uint{}", bits)));
            }
            Ok(Token::Uint(*word))
        }
        ParamType::FixedBytes(len) => {
            if word[*len..].iter().any(|&b| b != 0) {
                return Err(err(format!("bytes{} has non-zero padding", len)));
            }
            Ok(Token::FixedBytes(word[..*len].to_vec()))
        }
        other => Err(err(format!("{} is not a static type", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::encode::encode;

    #[test]
    fn test_decodes_what_encode_produces_for_registry_shapes() {
        let types = vec![
            ParamType::Address,
            ParamType::Address,
            ParamType::parse("string[]").unwrap(),
        ];
        let resolver: Address = "0x95AE1515367aa64C462c71e87157771165B1287A".parse().unwrap();
        let owner: Address = "0x499dD6D875787869670900a2130223D85d4F6Aa7".parse().unwrap();
        let tokens = vec![
            Token::Address(resolver),
            Token::Address(owner),
            Token::string_array(&["0xe7474D07fD2FA286e7e0aa23cd107F8379085037", ""]),
        ];
        let data = encode(&types, &tokens).unwrap();
        assert_eq!(decode(&types, &data).unwrap(), tokens);
    }

    #[test]
    fn test_rejects_truncated_reply() {
        let data = hex::decode("0000000000000000000000000000000000000000000000000000000000000001")
            .unwrap();
        assert!(decode(&[ParamType::Bool, ParamType::Bool], &data).is_err());
    }

    #[test]
    fn test_rejects_dirty_address_padding() {
        let data = hex::decode("ff0000000000000000000000000000000000000000000000000000000000000001")
            .unwrap();
        assert!(decode(&[ParamType::Address], &data).is_err());
    }

    #[test]
    fn test_rejects_bool_out_of_range() {
        let data = hex::decode("0000000000000000000000000000000000000000000000000000000000000002")
            .unwrap();
        assert!(decode(&[ParamType::Bool], &data).is_err());
    }

    #[test]
    fn test_rejects_offset_past_end() {
        let data = hex::decode("00000000000000000000000000000000000000000000000000000000000000ff")
            .unwrap();
        assert!(decode(&[ParamType::String], &data).is_err());
    }

    #[test]
    fn test_rejects_huge_array_length() {
        let data = hex::decode(
            [
                "0000000000000000000000000000000000000000000000000000000000000020",
                "00000000000000000000000000000000000000000000000000000000ffffffff",
            ]
            .concat(),
        )
        .unwrap();
        assert!(decode(&[ParamType::parse("uint256[]").unwrap()], &data).is_err());
    }

    #[test]
    fn test_rejects_invalid_utf8() {
        let data = hex::decode(
            [
                "0000000000000000000000000000000000000000000000000000000000000020",
                "0000000000000000000000000000000000000000000000000000000000000002",
                "ffff000000000000000000000000000000000000000000000000000000000000",
            ]
            .concat(),
        )
        .unwrap();
        assert!(decode(&[ParamType::String], &data).is_err());
    }

    #[test]
    fn test_decodes_fixed_bytes() {
        let data = hex::decode("6eabca0d00000000000000000000000000000000000000000000000000000000")
            .unwrap();
        assert_eq!(
            decode(&[ParamType::FixedBytes(4)], &data).unwrap(),
            vec![Token::FixedBytes(vec![0x6e, 0xab, 0xca, 0x0d])]
        );
    }

    #[test]
    fn test_rejects_elements_sharing_one_tail() {
        // string[] of three elements whose offsets all point at the same
        // 64-byte string.
        let word = |n: usize| format!("{:064x}", n);
        let data = hex::decode(
            [
                word(0x20),
                word(3),
                word(0x60),
                word(0x60),
                word(0x60),
                word(64),
                "41".repeat(64),
            ]
            .concat(),
        )
        .unwrap();
        assert!(decode(&[ParamType::parse("string[]").unwrap()], &data).is_err());
    }

    #[test]
    fn test_canonical_nested_arrays_fit_the_budget() {
        let kind = ParamType::parse("string[]").unwrap();
        let types = vec![ParamType::Array(Box::new(kind)), ParamType::Bytes];
        let tokens = vec![
            Token::Array(vec![
                Token::string_array(&["crypto.ETH.address", ""]),
                Token::string_array::<&str>(&[]),
                Token::string_array(&["x".repeat(70)]),
            ]),
            Token::Bytes(vec![0xab; 33]),
        ];
        let data = encode(&types, &tokens).unwrap();
        assert_eq!(decode(&types, &data).unwrap(), tokens);
    }
}
