//! # JSON-RPC Envelope
//!
//! Wire types for JSON-RPC 2.0 as spoken by Ethereum-style nodes and by the
//! Zilliqa API. The envelope is identical on both chains; only the method
//! names differ.
//!
//! | Method                      | Chain    | Used for                         |
//! |-----------------------------|----------|----------------------------------|
//! | `eth_call`                  | Ethereum | read-only contract calls         |
//! | `eth_getLogs`               | Ethereum | record-key and URI event replay  |
//! | `net_version`               | Ethereum | network id for locations         |
//! | `GetSmartContractSubState`  | Zilliqa  | registry / resolver map lookups  |

use serde::{Deserialize, Serialize};

use crate::error::ResolutionError;

// ---------------------------------------------------------------------------
// Methods
// ---------------------------------------------------------------------------

/// Remote methods the engine issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RpcMethod {
    #[serde(rename = "eth_call")]
    EthCall,
    #[serde(rename = "eth_getLogs")]
    EthGetLogs,
    #[serde(rename = "net_version")]
    NetVersion,
    #[serde(rename = "GetSmartContractSubState")]
    GetSmartContractSubState,
}

impl RpcMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EthCall => "eth_call",
            Self::EthGetLogs => "eth_getLogs",
            Self::NetVersion => "net_version",
            Self::GetSmartContractSubState => "GetSmartContractSubState",
        }
    }
}

// ---------------------------------------------------------------------------
// Request / Response
// ---------------------------------------------------------------------------

/// A JSON-RPC 2.0 request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    /// Always "2.0".
    pub jsonrpc: String,
    pub id: serde_json::Value,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

impl RpcRequest {
    pub fn new(id: serde_json::Value, method: impl Into<String>, params: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            method: method.into(),
            params,
        }
    }
}

/// A JSON-RPC 2.0 response.
///
/// Exactly one of `result` or `error` should be set. A node that sends
/// neither is treated as a provider error, not as an empty result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: serde_json::Value,
    #[serde(
        default,
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

/// Zilliqa answers `"result": null` for missing map entries. Plain
/// `Option<Value>` would fold that into "absent", so an explicit null is
/// kept as `Some(Value::Null)`.
fn present_value<'de, D>(deserializer: D) -> Result<Option<serde_json::Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    serde_json::Value::deserialize(deserializer).map(Some)
}

impl RpcResponse {
    pub fn success(id: serde_json::Value, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: serde_json::Value, error: RpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }

    /// Unwraps the envelope. `provider` labels any resulting error.
    pub fn into_result(self, provider: &str) -> Result<serde_json::Value, ResolutionError> {
        match (self.result, self.error) {
            (_, Some(error)) => Err(error.into_resolution_error(provider)),
            (Some(result), None) => Ok(result),
            (None, None) => Err(ResolutionError::ServiceProviderError {
                provider: provider.to_string(),
                code: None,
                message: "response carries neither result nor error".to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// JSON-RPC error object.
///
/// Codes worth knowing:
/// - `3`: execution reverted (geth and most hosted nodes)
/// - `-32000`: generic server error, often "execution reverted" too
/// - `-32005`: request limit exceeded
/// - `-32602`: invalid params
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RpcError {
    /// A contract revert as geth reports it.
    pub fn execution_reverted(reason: impl Into<String>) -> Self {
        Self {
            code: 3,
            message: format!("execution reverted: {}", reason.into()),
            data: None,
        }
    }

    /// Hosted-node rate limiting.
    pub fn limit_exceeded() -> Self {
        Self {
            code: -32005,
            message: "request limit exceeded".to_string(),
            data: None,
        }
    }

    pub fn into_resolution_error(self, provider: &str) -> ResolutionError {
        ResolutionError::ServiceProviderError {
            provider: provider.to_string(),
            code: Some(self.code),
            message: self.message,
        }
    }
}
