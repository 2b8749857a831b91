//! # Naming Services
//!
//! One trait, three independent backends:
//!
//! | Service | Chain(s)          | Read path                                      |
//! |---------|-------------------|------------------------------------------------|
//! | `Uns`   | Ethereum + Polygon| ProxyReader on both layers, merged             |
//! | `Cns`   | Ethereum          | ProxyReader or registry + resolver, detected   |
//! | `Zns`   | Zilliqa           | contract sub-state of registry and resolver    |
//!
//! The backends share no internals. What they do share is the vocabulary in
//! this module: how a decoded owner/resolver pair turns into domain errors,
//! and how record keys are rediscovered from resolver events.

pub mod cns;
pub mod contracts;
pub mod uns;
pub mod zns;

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use async_trait::async_trait;

use crate::abi::{Token, Word};
use crate::contract::ContractClient;
use crate::crypto::Namehash;
use crate::domain::address_key;
use crate::error::{CodecError, ResolutionError, Result};
use crate::transport::{BlockTag, Provider, RpcMethod};
use crate::types::{Address, Location, NamingServiceName, RecordMap, ResolutionRecord};

pub use cns::Cns;
pub use uns::Uns;
pub use zns::Zns;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// The capability contract every backend honors.
///
/// Domains passed in are already normalized by the caller.
#[async_trait]
pub trait NamingService: Send + Sync + fmt::Debug {
    fn name(&self) -> NamingServiceName;

    /// The backend's namehash family applied to `domain`.
    fn namehash(&self, domain: &str) -> Namehash;

    fn childhash(&self, parent: &Namehash, label: &str) -> Namehash;

    /// Whether this backend is responsible for `domain`. May be remote.
    async fn is_supported_domain(&self, domain: &str) -> Result<bool>;

    /// Owner, resolver and the requested records in one lookup. Never an
    /// error for unregistered domains: those come back unowned.
    async fn data(&self, domain: &str, keys: &[String]) -> Result<ResolutionRecord>;

    async fn owner(&self, domain: &str) -> Result<Address> {
        let data = self.data(domain, &[]).await?;
        require_owner(domain, &data)
    }

    async fn resolver(&self, domain: &str) -> Result<Address> {
        let data = self.data(domain, &[]).await?;
        require_resolver(domain, &data)
    }

    async fn record(&self, domain: &str, key: &str) -> Result<String> {
        let records = self.records(domain, &[key.to_string()]).await?;
        pick_record(domain, &records, key)
    }

    /// The subset of `keys` that are set. Unset keys are absent.
    async fn records(&self, domain: &str, keys: &[String]) -> Result<RecordMap> {
        let data = self.data(domain, keys).await?;
        require_resolver(domain, &data)?;
        Ok(data.records)
    }

    /// Every record the resolver holds.
    async fn all_records(&self, domain: &str) -> Result<RecordMap>;

    async fn resolve_address(&self, domain: &str, ticker: &str) -> Result<String> {
        self.record(domain, &address_key(ticker)).await
    }

    async fn is_registered(&self, domain: &str) -> Result<bool> {
        Ok(self.data(domain, &[]).await?.is_owned())
    }

    /// Contract holding the domain's ownership record.
    async fn registry_address(&self, domain: &str) -> Result<Address>;

    /// One entry per input domain; `None` for unregistered ones.
    async fn locations(&self, domains: &[String]) -> Result<BTreeMap<String, Option<Location>>>;

    async fn token_uri(&self, _domain: &str) -> Result<String> {
        Err(ResolutionError::unsupported_method("token_uri", self.name()))
    }

    /// Recovers the domain name behind a namehash.
    async fn unhash(&self, _hash: &Namehash) -> Result<String> {
        Err(ResolutionError::unsupported_method("unhash", self.name()))
    }

    /// The primary domain an address has set for itself, if any.
    async fn reverse(&self, _address: &Address) -> Result<Option<String>> {
        Err(ResolutionError::unsupported_method("reverse", self.name()))
    }
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

pub(crate) fn require_owner(domain: &str, data: &ResolutionRecord) -> Result<Address> {
    data.owner.ok_or_else(|| ResolutionError::UnregisteredDomain {
        domain: domain.to_string(),
    })
}

pub(crate) fn require_resolver(domain: &str, data: &ResolutionRecord) -> Result<Address> {
    require_owner(domain, data)?;
    data.resolver
        .ok_or_else(|| ResolutionError::UnspecifiedResolver {
            domain: domain.to_string(),
        })
}

pub(crate) fn pick_record(domain: &str, records: &RecordMap, key: &str) -> Result<String> {
    records
        .get(key)
        .cloned()
        .ok_or_else(|| ResolutionError::RecordNotFound {
            domain: domain.to_string(),
            key: key.to_string(),
        })
}

/// Pairs keys with values, dropping empty values.
pub(crate) fn zip_records<K, V>(keys: K, values: V) -> RecordMap
where
    K: IntoIterator,
    K::Item: Into<String>,
    V: IntoIterator<Item = String>,
{
    keys.into_iter()
        .map(Into::into)
        .zip(values)
        .filter(|(_, value)| !value.is_empty())
        .collect()
}

/// Builds a record from a decoded `(resolver, owner, values[])` reply. An
/// empty reply means nothing is stored for the token.
pub(crate) fn record_from_data_reply(
    tokens: &[Token],
    keys: &[String],
    source: crate::types::Layer,
) -> Result<ResolutionRecord> {
    if tokens.is_empty() {
        return Ok(ResolutionRecord::unowned(source));
    }
    let shape = || CodecError::decode("getData", "unexpected reply shape");
    let resolver = tokens.first().and_then(Token::as_address).ok_or_else(shape)?;
    let owner = tokens.get(1).and_then(Token::as_address).ok_or_else(shape)?;
    let values = tokens.get(2).and_then(Token::to_string_vec).ok_or_else(shape)?;
    Ok(ResolutionRecord {
        owner: owner.non_zero(),
        resolver: resolver.non_zero(),
        records: zip_records(keys.iter().cloned(), values),
        source,
    })
}

/// The chain id, from configuration when known, otherwise `net_version`.
pub(crate) async fn network_id(provider: &dyn Provider, configured: Option<u64>) -> Result<u64> {
    if let Some(id) = configured {
        return Ok(id);
    }
    let value = provider
        .request(RpcMethod::NetVersion.as_str(), serde_json::json!([]))
        .await?;
    value
        .as_str()
        .and_then(|s| s.parse().ok())
        .or_else(|| value.as_u64())
        .ok_or_else(|| ResolutionError::ServiceProviderError {
            provider: provider.name().to_string(),
            code: None,
            message: format!("unexpected net_version reply: {}", value),
        })
}

/// A record key seen in `NewKey` events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DiscoveredKey {
    /// `keccak256(key)`, the indexed `keyIndex` topic.
    pub hash: Word,
    pub key: Option<String>,
}

/// Replays resolver events to learn which keys a token has ever set.
///
/// The newest `ResetRecords` marks the block records were last cleared;
/// `NewKey` events are replayed from there (or from `start_block`). Keys are
/// returned in first-seen order without duplicates.
pub(crate) async fn discover_keys(
    resolver: &ContractClient,
    node: &Namehash,
    start_block: u64,
) -> Result<Vec<DiscoveredKey>> {
    let start = if start_block == 0 {
        BlockTag::Earliest
    } else {
        BlockTag::Number(start_block)
    };
    let resets = resolver
        .fetch_logs("ResetRecords", &[Token::from(*node)], start)
        .await?;
    let from = resets
        .last()
        .map(|log| BlockTag::Number(log.block_number))
        .unwrap_or(start);

    let logs = resolver
        .fetch_logs("NewKey", &[Token::from(*node)], from)
        .await?;
    let mut seen = HashSet::new();
    let mut keys = Vec::new();
    for log in logs {
        let hash = *log
            .topics
            .get(2)
            .ok_or_else(|| CodecError::decode("NewKey", "missing keyIndex topic"))?;
        if seen.insert(hash) {
            keys.push(DiscoveredKey {
                hash,
                key: log.values.first().and_then(Token::as_str).map(str::to_string),
            });
        }
    }
    Ok(keys)
}
