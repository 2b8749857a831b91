//! # Contract Client
//!
//! Binds a [`ContractDescriptor`] to an address and a [`Provider`] and offers
//! the three read primitives every naming service is built from:
//!
//! - [`ContractClient::call`]: one `eth_call`, decoded against the method's
//!   declared outputs.
//! - [`ContractClient::multicall`]: several calls in as few round trips as
//!   the contract allows, results in request order.
//! - [`ContractClient::fetch_logs`]: `eth_getLogs` filtered by event topic and
//!   indexed arguments, in transport order.
//!
//! Decoding is strict. A reply that does not fit the declared shape is a
//! [`CodecError`], never a default value. The one exception is the empty
//! reply (`0x`), which contracts return for uninitialized storage and which
//! decodes to an empty token list.

use std::sync::Arc;

use futures::future::join_all;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, trace};

use crate::abi::encode::encode_static;
use crate::abi::{ContractDescriptor, Function, ParamType, Token, Word};
use crate::crypto::keccak256;
use crate::error::{CodecError, ResolutionError, Result};
use crate::transport::{BlockTag, Provider, RpcMethod};
use crate::types::Address;

/// Name of the batching entry point, `multicall(bytes[]) returns (bytes[])`.
const MULTICALL: &str = "multicall";

/// A decoded event log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventLog {
    pub block_number: u64,
    pub log_index: u64,
    pub transaction_hash: Option<String>,
    /// Raw topics; `topics[0]` is the event signature hash.
    pub topics: Vec<Word>,
    /// Decoded non-indexed inputs.
    pub values: Vec<Token>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLog {
    block_number: Option<String>,
    log_index: Option<String>,
    transaction_hash: Option<String>,
    #[serde(default)]
    topics: Vec<String>,
    #[serde(default)]
    data: String,
}

/// A contract reachable through a provider.
#[derive(Debug, Clone)]
pub struct ContractClient {
    provider: Arc<dyn Provider>,
    address: Address,
    descriptor: Arc<ContractDescriptor>,
}

impl ContractClient {
    pub fn new(provider: Arc<dyn Provider>, address: Address, descriptor: Arc<ContractDescriptor>) -> Self {
        Self {
            provider,
            address,
            descriptor,
        }
    }

    /// The same provider and descriptor pointed at another address. Used for
    /// resolver contracts discovered at runtime.
    pub fn with_address(&self, address: Address) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            address,
            descriptor: Arc::clone(&self.descriptor),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    pub fn descriptor(&self) -> &ContractDescriptor {
        &self.descriptor
    }

    // -----------------------------------------------------------------------
    // call
    // -----------------------------------------------------------------------

    /// Encodes `args` for `method`, issues one `eth_call` at `latest`, and
    /// decodes the reply.
    pub async fn call(&self, method: &str, args: &[Token]) -> Result<Vec<Token>> {
        let function = self.descriptor.function(method)?;
        let data = function.encode_input(args)?;
        let reply = self.raw_call(method, &data).await?;
        decode_reply(function, &reply).map_err(ResolutionError::from)
    }

    async fn raw_call(&self, method: &str, data: &[u8]) -> Result<Vec<u8>> {
        debug!(contract = %self.address, method, "eth_call");
        let params = json!([
            { "to": self.address.to_lower_hex(), "data": to_hex(data) },
            BlockTag::Latest,
        ]);
        let value = self
            .provider
            .request(RpcMethod::EthCall.as_str(), params)
            .await?;
        let reply = value.as_str().ok_or_else(|| self.malformed("eth_call result is not a string"))?;
        trace!(contract = %self.address, method, reply, "eth_call reply");
        from_hex(reply).map_err(ResolutionError::from)
    }

    // -----------------------------------------------------------------------
    // multicall
    // -----------------------------------------------------------------------

    /// Runs several calls and returns one `Result` per call, in request order.
    ///
    /// Contracts exposing `multicall(bytes[])` get a single aggregated
    /// `eth_call`; anything else gets one `eth_call` per entry, dispatched
    /// concurrently. The outer `Err` is reserved for the aggregated round
    /// trip itself failing.
    pub async fn multicall(&self, calls: &[(&str, Vec<Token>)]) -> Result<Vec<Result<Vec<Token>>>> {
        if calls.is_empty() {
            return Ok(Vec::new());
        }
        if !self.descriptor.has_function(MULTICALL) {
            let pending = calls.iter().map(|(method, args)| self.call(method, args));
            return Ok(join_all(pending).await);
        }

        // Encode each sub-call separately so a bad argument list only costs
        // its own slot.
        let prepared: Vec<std::result::Result<(&Function, Vec<u8>), CodecError>> = calls
            .iter()
            .map(|(method, args)| -> std::result::Result<_, CodecError> {
                let function = self.descriptor.function(method)?;
                Ok((function, function.encode_input(args)?))
            })
            .collect();

        let batch: Vec<Token> = prepared
            .iter()
            .filter_map(|p| p.as_ref().ok())
            .map(|(_, data)| Token::Bytes(data.clone()))
            .collect();

        let mut blobs = if batch.is_empty() {
            Vec::new()
        } else {
            let reply = self.call(MULTICALL, &[Token::Array(batch.clone())]).await?;
            let blobs: Vec<Vec<u8>> = reply
                .first()
                .and_then(Token::as_array)
                .map(|items| items.iter().filter_map(|t| t.as_bytes().map(<[u8]>::to_vec)).collect())
                .unwrap_or_default();
            if blobs.len() != batch.len() {
                return Err(CodecError::decode(
                    MULTICALL,
                    format!("expected {} results, got {}", batch.len(), blobs.len()),
                )
                .into());
            }
            blobs
        }
        .into_iter();

        Ok(prepared
            .into_iter()
            .map(|entry| match entry {
                Ok((function, _)) => {
                    let blob = blobs.next().unwrap_or_default();
                    decode_reply(function, &blob).map_err(ResolutionError::from)
                }
                Err(e) => Err(e.into()),
            })
            .collect())
    }

    // -----------------------------------------------------------------------
    // fetch_logs
    // -----------------------------------------------------------------------

    /// Fetches `event` logs emitted by this contract from `from_block` to
    /// `latest`, filtered by the leading indexed arguments in `indexed`.
    ///
    /// Logs are returned exactly as the node orders them (block, then log
    /// index). Nothing is sorted or deduplicated here.
    pub async fn fetch_logs(&self, event: &str, indexed: &[Token], from_block: BlockTag) -> Result<Vec<EventLog>> {
        let event = self.descriptor.event(event)?;
        let indexed_params: Vec<_> = event.indexed_inputs().collect();
        if indexed.len() > indexed_params.len() {
            return Err(CodecError::ArgumentMismatch {
                method: event.name.clone(),
                reason: format!(
                    "event has {} indexed inputs, got {} filter values",
                    indexed_params.len(),
                    indexed.len()
                ),
            }
            .into());
        }

        let mut topics = vec![to_hex(&event.topic())];
        for (param, token) in indexed_params.iter().zip(indexed) {
            topics.push(to_hex(&topic_word(&param.kind, token).map_err(|reason| {
                CodecError::ArgumentMismatch {
                    method: event.name.clone(),
                    reason,
                }
            })?));
        }

        debug!(contract = %self.address, event = %event.name, from = %from_block, "eth_getLogs");
        let params = json!([{
            "address": self.address.to_lower_hex(),
            "fromBlock": from_block,
            "toBlock": BlockTag::Latest,
            "topics": topics,
        }]);
        let value = self
            .provider
            .request(RpcMethod::EthGetLogs.as_str(), params)
            .await?;
        let raw: Vec<RawLog> = serde_json::from_value(value)
            .map_err(|e| self.malformed(format!("eth_getLogs result: {}", e)))?;
        trace!(contract = %self.address, event = %event.name, count = raw.len(), "logs fetched");

        raw.into_iter()
            .map(|log| -> Result<EventLog> {
                let topics = log
                    .topics
                    .iter()
                    .map(|t| -> std::result::Result<Word, CodecError> {
                        from_hex(t)?
                            .try_into()
                            .map_err(|_| CodecError::decode("log topic", "topic is not 32 bytes"))
                    })
                    .collect::<std::result::Result<Vec<Word>, CodecError>>()?;
                Ok(EventLog {
                    block_number: parse_quantity(log.block_number.as_deref())?,
                    log_index: parse_quantity(log.log_index.as_deref())?,
                    transaction_hash: log.transaction_hash,
                    topics,
                    values: event.decode_data(&from_hex(&log.data)?)?,
                })
            })
            .collect()
    }

    fn malformed(&self, message: impl Into<String>) -> ResolutionError {
        ResolutionError::ServiceProviderError {
            provider: self.provider.name().to_string(),
            code: None,
            message: message.into(),
        }
    }
}

fn decode_reply(function: &Function, reply: &[u8]) -> std::result::Result<Vec<Token>, CodecError> {
    if reply.is_empty() {
        return Ok(Vec::new());
    }
    function.decode_output(reply)
}

/// Indexed static values are stored as their ABI word; strings and bytes as
/// the keccak-256 of their contents.
fn topic_word(kind: &ParamType, token: &Token) -> std::result::Result<Word, String> {
    match (kind, token) {
        (ParamType::String, Token::String(s)) => Ok(keccak256(s.as_bytes())),
        (ParamType::Bytes, Token::Bytes(b)) => Ok(keccak256(b)),
        (ParamType::Array(_), _) => Err("indexed array filters are not supported".to_string()),
        _ if !kind.is_dynamic() => encode_static(kind, token).map_err(|e| e.to_string()),
        _ => Err(format!("cannot filter {} by {:?}", kind, token)),
    }
}

fn to_hex(data: &[u8]) -> String {
    format!("0x{}", hex::encode(data))
}

fn from_hex(s: &str) -> std::result::Result<Vec<u8>, CodecError> {
    let body = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(body).map_err(|_| CodecError::InvalidHex(s.to_string()))
}

fn parse_quantity(s: Option<&str>) -> std::result::Result<u64, CodecError> {
    let s = s.ok_or_else(|| CodecError::decode("log", "missing block number or log index"))?;
    let body = s.strip_prefix("0x").unwrap_or(s);
    u64::from_str_radix(body, 16).map_err(|_| CodecError::InvalidHex(s.to_string()))
}
