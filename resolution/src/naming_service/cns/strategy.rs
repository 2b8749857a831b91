//! Reader strategy detection for the legacy registry.
//!
//! `Unknown → {ProxyReader, DirectRegistry}`, decided once per instance.
//! Allow-listed addresses skip the probe. Everything else is asked
//! `supportsInterface(DATA_READER_INTERFACE_ID)`; old registries revert on
//! that call, which means `DirectRegistry`. A transport failure is not an
//! answer, so it propagates and leaves the cache empty for the next caller.

use std::future::Future;

use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::abi::Token;
use crate::config::DATA_READER_INTERFACE_ID;
use crate::contract::ContractClient;
use crate::error::{ResolutionError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderStrategy {
    /// One `getData` call answers owner, resolver and records.
    ProxyReader,
    /// `ownerOf` + `resolverOf` on the registry, then `getMany` on the
    /// resolver.
    DirectRegistry,
}

/// The once-resolved decision.
///
/// Concurrent first lookups wait on a single probe. A failed probe stores
/// nothing, so the next lookup probes again.
#[derive(Debug, Default)]
pub struct StrategyCache {
    decision: OnceCell<ReaderStrategy>,
}

impl StrategyCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<ReaderStrategy> {
        self.decision.get().copied()
    }

    /// Returns the cached decision or runs `probe` to make one.
    pub async fn resolve<F, Fut>(&self, probe: F) -> Result<ReaderStrategy>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ReaderStrategy>>,
    {
        self.decision.get_or_try_init(probe).await.copied()
    }
}

/// Decides the strategy for the contract behind `reader`.
pub async fn detect(reader: &ContractClient, allow_listed: bool) -> Result<ReaderStrategy> {
    if allow_listed {
        debug!(contract = %reader.address(), "allow-listed proxy reader");
        return Ok(ReaderStrategy::ProxyReader);
    }
    let probe = reader
        .call(
            "supportsInterface",
            &[Token::FixedBytes(DATA_READER_INTERFACE_ID.to_vec())],
        )
        .await;
    match probe {
        Ok(tokens) => {
            let supported = tokens.first().and_then(Token::as_bool).unwrap_or(false);
            debug!(contract = %reader.address(), supported, "data reader probe");
            Ok(if supported {
                ReaderStrategy::ProxyReader
            } else {
                ReaderStrategy::DirectRegistry
            })
        }
        Err(e) if e.is_revert() || matches!(e, ResolutionError::Codec(_)) => {
            warn!(contract = %reader.address(), error = %e, "probe failed, using direct registry");
            Ok(ReaderStrategy::DirectRegistry)
        }
        Err(e) => Err(e),
    }
}
