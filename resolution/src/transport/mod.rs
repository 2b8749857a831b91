//! # Transport
//!
//! The engine never opens sockets itself. It is handed one [`Provider`] per
//! network layer, and every remote read goes through its single
//! `request(method, params)` operation. Host applications can inject their
//! own wallet or node connection by implementing the trait; the crate ships
//! two implementations:
//!
//! - [`HttpProvider`]: JSON-RPC 2.0 over HTTP(S) via `reqwest`.
//! - [`MockProvider`]: scripted in-memory replies for tests and fixtures.
//!
//! Timeouts, retries and cancellation are the provider's business. The
//! engine's only expectation is that a request eventually settles with a
//! value or an error.

pub mod http;
pub mod mock;
pub mod rpc;

use std::fmt;

use async_trait::async_trait;
use serde::{Serialize, Serializer};

use crate::error::Result;

pub use http::HttpProvider;
pub use mock::MockProvider;
pub use rpc::{RpcError, RpcMethod, RpcRequest, RpcResponse};

/// A JSON-RPC capability bound to one network.
#[async_trait]
pub trait Provider: Send + Sync + fmt::Debug {
    /// Issues `method` with `params` and returns the unwrapped `result`.
    async fn request(&self, method: &str, params: serde_json::Value) -> Result<serde_json::Value>;

    /// Label used in error messages and logs.
    fn name(&self) -> &str {
        "provider"
    }

    /// Endpoint URL, when the provider has one worth reporting.
    fn url(&self) -> Option<&str> {
        None
    }
}

/// Block selector for `eth_getLogs` and `eth_call`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockTag {
    Earliest,
    #[default]
    Latest,
    Number(u64),
}

impl fmt::Display for BlockTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Earliest => write!(f, "earliest"),
            Self::Latest => write!(f, "latest"),
            Self::Number(n) => write!(f, "0x{:x}", n),
        }
    }
}

impl Serialize for BlockTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
