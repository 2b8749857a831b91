//! Contract descriptors built from human-readable ABI fragments.
//!
//! Each naming service declares its contracts as a short list of Solidity
//! signatures, e.g.
//!
//! ```text
//! function getData(string[] keys, uint256 tokenId) view returns (address, address, string[])
//! event NewKey(uint256 indexed tokenId, string indexed keyIndex, string key)
//! ```
//!
//! and parses them once at construction. After that the descriptor is
//! immutable and shared by reference.

use std::collections::BTreeMap;

use super::decode::decode;
use super::encode::encode;
use super::types::{ParamType, Token};
use crate::crypto::keccak256;
use crate::error::CodecError;

/// A named, typed parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub kind: ParamType,
    /// Only meaningful for event inputs.
    pub indexed: bool,
}

/// A callable contract method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub name: String,
    pub inputs: Vec<Param>,
    pub outputs: Vec<Param>,
}

impl Function {
    /// Canonical signature, e.g. `getData(string[],uint256)`.
    pub fn signature(&self) -> String {
        canonical_signature(&self.name, &self.inputs)
    }

    /// First four bytes of `keccak256(signature)`.
    pub fn selector(&self) -> [u8; 4] {
        let hash = keccak256(self.signature().as_bytes());
        [hash[0], hash[1], hash[2], hash[3]]
    }

    /// Selector followed by the ABI-encoded arguments.
    pub fn encode_input(&self, args: &[Token]) -> Result<Vec<u8>, CodecError> {
        if args.len() != self.inputs.len() {
            return Err(CodecError::ArgumentMismatch {
                method: self.name.clone(),
                reason: format!("expected {} arguments, got {}", self.inputs.len(), args.len()),
            });
        }
        let kinds: Vec<ParamType> = self.inputs.iter().map(|p| p.kind.clone()).collect();
        let body = encode(&kinds, args).map_err(|e| match e {
            CodecError::ArgumentMismatch { reason, .. } => CodecError::ArgumentMismatch {
                method: self.name.clone(),
                reason,
            },
            other => other,
        })?;
        let mut out = Vec::with_capacity(4 + body.len());
        out.extend_from_slice(&self.selector());
        out.extend_from_slice(&body);
        Ok(out)
    }

    /// Decodes return data. Callers handle the empty-reply case before this.
    pub fn decode_output(&self, data: &[u8]) -> Result<Vec<Token>, CodecError> {
        let kinds: Vec<ParamType> = self.outputs.iter().map(|p| p.kind.clone()).collect();
        decode(&kinds, data).map_err(|e| match e {
            CodecError::Decode { reason, .. } => CodecError::decode(self.signature(), reason),
            other => other,
        })
    }
}

/// A contract event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub name: String,
    pub inputs: Vec<Param>,
}

impl Event {
    pub fn signature(&self) -> String {
        canonical_signature(&self.name, &self.inputs)
    }

    /// topic0: `keccak256(signature)`.
    pub fn topic(&self) -> [u8; 32] {
        keccak256(self.signature().as_bytes())
    }

    pub fn indexed_inputs(&self) -> impl Iterator<Item = &Param> {
        self.inputs.iter().filter(|p| p.indexed)
    }

    /// Decodes the non-indexed inputs carried in a log's `data` field.
    pub fn decode_data(&self, data: &[u8]) -> Result<Vec<Token>, CodecError> {
        let kinds: Vec<ParamType> = self
            .inputs
            .iter()
            .filter(|p| !p.indexed)
            .map(|p| p.kind.clone())
            .collect();
        if kinds.is_empty() {
            return Ok(Vec::new());
        }
        decode(&kinds, data).map_err(|e| match e {
            CodecError::Decode { reason, .. } => CodecError::decode(self.signature(), reason),
            other => other,
        })
    }
}

fn canonical_signature(name: &str, params: &[Param]) -> String {
    let types: Vec<String> = params.iter().map(|p| p.kind.to_string()).collect();
    format!("{}({})", name, types.join(","))
}

// ---------------------------------------------------------------------------
// ContractDescriptor
// ---------------------------------------------------------------------------

/// The typed interface of one contract.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContractDescriptor {
    functions: BTreeMap<String, Function>,
    events: BTreeMap<String, Event>,
}

impl ContractDescriptor {
    /// Parses `function ...` and `event ...` fragments. Overloads are not
    /// supported: a repeated name is an error.
    pub fn parse(fragments: &[&str]) -> Result<Self, CodecError> {
        let mut descriptor = ContractDescriptor::default();
        for fragment in fragments {
            let fragment = fragment.trim();
            if let Some(rest) = fragment.strip_prefix("function ") {
                let function = parse_function(fragment, rest)?;
                if descriptor.functions.contains_key(&function.name) {
                    return Err(invalid(fragment, "duplicate function name"));
                }
                descriptor.functions.insert(function.name.clone(), function);
            } else if let Some(rest) = fragment.strip_prefix("event ") {
                let event = parse_event(fragment, rest)?;
                if descriptor.events.contains_key(&event.name) {
                    return Err(invalid(fragment, "duplicate event name"));
                }
                descriptor.events.insert(event.name.clone(), event);
            } else {
                return Err(invalid(fragment, "expected `function` or `event`"));
            }
        }
        Ok(descriptor)
    }

    pub fn function(&self, name: &str) -> Result<&Function, CodecError> {
        self.functions
            .get(name)
            .ok_or_else(|| CodecError::UnknownFunction(name.to_string()))
    }

    pub fn event(&self, name: &str) -> Result<&Event, CodecError> {
        self.events
            .get(name)
            .ok_or_else(|| CodecError::UnknownEvent(name.to_string()))
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }
}

fn invalid(fragment: &str, reason: &str) -> CodecError {
    CodecError::InvalidFragment {
        fragment: fragment.to_string(),
        reason: reason.to_string(),
    }
}

/// Splits `name(params) tail` into its three parts.
fn split_call<'a>(fragment: &str, s: &'a str) -> Result<(&'a str, &'a str, &'a str), CodecError> {
    let open = s.find('(').ok_or_else(|| invalid(fragment, "missing `(`"))?;
    let close = s[open..]
        .find(')')
        .map(|i| open + i)
        .ok_or_else(|| invalid(fragment, "missing `)`"))?;
    let name = s[..open].trim();
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(invalid(fragment, "bad name"));
    }
    Ok((name, &s[open + 1..close], &s[close + 1..]))
}

fn parse_params(fragment: &str, list: &str, allow_indexed: bool) -> Result<Vec<Param>, CodecError> {
    if list.trim().is_empty() {
        return Ok(Vec::new());
    }
    list.split(',')
        .map(|raw| {
            let mut words = raw.split_whitespace();
            let kind = words.next().ok_or_else(|| invalid(fragment, "empty parameter"))?;
            let kind = ParamType::parse(kind)?;
            let mut indexed = false;
            let mut name = String::new();
            for word in words {
                match word {
                    "indexed" if allow_indexed => indexed = true,
                    "memory" | "calldata" => {}
                    other if name.is_empty() => name = other.to_string(),
                    _ => return Err(invalid(fragment, "unexpected token in parameter")),
                }
            }
            Ok(Param {
                name,
                kind,
                indexed,
            })
        })
        .collect()
}

fn parse_function(fragment: &str, rest: &str) -> Result<Function, CodecError> {
    let (name, inputs, tail) = split_call(fragment, rest)?;
    let outputs = match tail.find("returns") {
        Some(at) => {
            let list = tail[at + "returns".len()..]
                .trim()
                .strip_prefix('(')
                .and_then(|r| r.strip_suffix(')'))
                .ok_or_else(|| invalid(fragment, "malformed returns clause"))?;
            parse_params(fragment, list, false)?
        }
        None => Vec::new(),
    };
    Ok(Function {
        name: name.to_string(),
        inputs: parse_params(fragment, inputs, false)?,
        outputs,
    })
}

fn parse_event(fragment: &str, rest: &str) -> Result<Event, CodecError> {
    let (name, inputs, _) = split_call(fragment, rest)?;
    Ok(Event {
        name: name.to_string(),
        inputs: parse_params(fragment, inputs, true)?,
    })
}
