//! One UNS layer: a ProxyReader (plus the registry for event replay) on a
//! single chain. Every method here answers for its own layer only; merging
//! is [`super::layered`]'s job.

use std::sync::Arc;

use tracing::debug;

use crate::abi::Token;
use crate::config::{self, contract_address, require_source, UnsLayerConfig};
use crate::contract::ContractClient;
use crate::crypto::{eth_namehash, Namehash};
use crate::error::{CodecError, ConfigurationError, Result};
use crate::naming_service::contracts::Descriptors;
use crate::naming_service::{discover_keys, network_id, record_from_data_reply, DiscoveredKey};
use crate::transport::{BlockTag, Provider};
use crate::types::{Address, Layer, Location, NamingServiceName, RecordMap, ResolutionRecord};

#[derive(Debug, Clone)]
pub struct UnsLayer {
    layer: Layer,
    proxy_reader: ContractClient,
    registry: ContractClient,
    resolver: ContractClient,
    start_block: u64,
    chain_id: Option<u64>,
    blockchain: String,
    provider_url: Option<String>,
}

impl UnsLayer {
    pub fn new(
        layer: Layer,
        config: &UnsLayerConfig,
        descriptors: &Descriptors,
    ) -> std::result::Result<Self, ConfigurationError> {
        let service = NamingServiceName::Uns;
        let source = require_source(service, &config.network, config.source.as_ref())?;
        let known = config::network(&config.network);

        let proxy_address = contract_address(
            service,
            &config.network,
            config.proxy_reader_address.as_deref(),
            known.map(|n| n.uns_proxy_reader),
        )?;
        // The registry only matters for reverse lookups; without one, they
        // are replayed against the ProxyReader address and find nothing.
        let registry_address = match (config.registry_address.as_deref(), known) {
            (None, None) => proxy_address,
            (raw, _) => contract_address(service, &config.network, raw, known.map(|n| n.uns_registry))?,
        };

        let provider: Arc<dyn Provider> = source.connect(&format!("UNS {} ({})", layer, config.network))?;
        let proxy_reader = ContractClient::new(
            Arc::clone(&provider),
            proxy_address,
            Arc::clone(&descriptors.proxy_reader),
        );
        let registry = ContractClient::new(
            Arc::clone(&provider),
            registry_address,
            Arc::clone(&descriptors.registry),
        );
        let resolver = ContractClient::new(provider, registry_address, Arc::clone(&descriptors.resolver));

        Ok(Self {
            layer,
            proxy_reader,
            registry,
            resolver,
            start_block: config
                .start_block
                .or_else(|| known.map(|n| n.uns_start_block))
                .unwrap_or(0),
            chain_id: config.chain_id.or_else(|| known.map(|n| n.chain_id)),
            blockchain: known
                .map(|n| n.blockchain.to_string())
                .unwrap_or_else(|| config.network.to_ascii_uppercase()),
            provider_url: source.url(),
        })
    }

    pub fn layer(&self) -> Layer {
        self.layer
    }

    pub fn proxy_reader_address(&self) -> Address {
        self.proxy_reader.address()
    }

    /// `getData(keys, tokenId)`.
    pub async fn data(&self, node: &Namehash, keys: &[String]) -> Result<ResolutionRecord> {
        debug!(layer = %self.layer, node = %node, keys = keys.len(), "uns getData");
        let tokens = self
            .proxy_reader
            .call("getData", &[Token::string_array(keys), Token::from(*node)])
            .await?;
        record_from_data_reply(&tokens, keys, self.layer)
    }

    /// `ownerOfForMany(tokenIds)`, `None` for unowned tokens.
    pub async fn owners(&self, nodes: &[Namehash]) -> Result<Vec<Option<Address>>> {
        if nodes.is_empty() {
            return Ok(Vec::new());
        }
        let tokens = self
            .proxy_reader
            .call("ownerOfForMany", &[Token::uint_array(nodes)])
            .await?;
        if tokens.is_empty() {
            return Ok(vec![None; nodes.len()]);
        }
        let owners = tokens
            .first()
            .and_then(Token::to_address_vec)
            .filter(|owners| owners.len() == nodes.len())
            .ok_or_else(|| CodecError::decode("ownerOfForMany", "unexpected reply shape"))?;
        Ok(owners.into_iter().map(Address::non_zero).collect())
    }

    /// `exists(tokenId)`, used for TLD support checks.
    pub async fn exists(&self, node: &Namehash) -> Result<bool> {
        let tokens = self.proxy_reader.call("exists", &[Token::from(*node)]).await?;
        Ok(tokens.first().and_then(Token::as_bool).unwrap_or(false))
    }

    /// `registryOf(tokenId)`. Zero for tokens this layer does not know.
    pub async fn registry_of(&self, node: &Namehash) -> Result<Address> {
        let tokens = self.proxy_reader.call("registryOf", &[Token::from(*node)]).await?;
        Ok(tokens.first().and_then(Token::as_address).unwrap_or(Address::ZERO))
    }

    /// `tokenURI(tokenId)`. A revert (nonexistent token) is an empty string.
    pub async fn token_uri(&self, node: &Namehash) -> Result<String> {
        match self.proxy_reader.call("tokenURI", &[Token::from(*node)]).await {
            Ok(tokens) => Ok(tokens
                .first()
                .and_then(Token::as_str)
                .unwrap_or_default()
                .to_string()),
            Err(e) if e.is_revert() => Ok(String::new()),
            Err(e) => Err(e),
        }
    }

    /// `reverseOf(address)`. `None` when no reverse record is set.
    pub async fn reverse_of(&self, address: &Address) -> Result<Option<Namehash>> {
        let tokens = self.proxy_reader.call("reverseOf", &[Token::from(*address)]).await?;
        Ok(tokens
            .first()
            .and_then(Token::as_uint)
            .map(|word| Namehash(*word))
            .filter(|node| *node != Namehash::ROOT))
    }

    /// Finds the name minted for `node` by replaying `NewURI` and checking
    /// the hash of each candidate.
    pub async fn unhash(&self, node: &Namehash) -> Result<Option<String>> {
        let logs = self
            .registry
            .fetch_logs("NewURI", &[Token::from(*node)], self.from_block())
            .await?;
        Ok(logs
            .iter()
            .filter_map(|log| log.values.first().and_then(Token::as_str))
            .find(|uri| eth_namehash(uri) == *node)
            .map(str::to_string))
    }

    /// Every record of `node` held by `resolver` on this layer. Keys come
    /// from `NewKey` events; `fallback_keys` is used when there are none.
    pub async fn all_records(
        &self,
        node: &Namehash,
        resolver: Address,
        fallback_keys: &[String],
    ) -> Result<RecordMap> {
        let discovered = discover_keys(&self.resolver.with_address(resolver), node, self.start_block).await?;
        let keys = keys_or_fallback(discovered, fallback_keys);
        Ok(self.data(node, &keys).await?.records)
    }

    /// Location data for a batch of nodes, `None` for the ones this layer
    /// does not own. One aggregated round trip.
    pub async fn locations(&self, nodes: &[Namehash]) -> Result<Vec<Option<Location>>> {
        if nodes.is_empty() {
            return Ok(Vec::new());
        }
        let token_ids = Token::uint_array(nodes);
        let mut calls = vec![("getDataForMany", vec![Token::string_array::<&str>(&[]), token_ids])];
        calls.extend(nodes.iter().map(|node| ("registryOf", vec![Token::from(*node)])));

        let network_id = self.network_id().await?;
        let mut results = self.proxy_reader.multicall(&calls).await?.into_iter();

        let many = results
            .next()
            .ok_or_else(|| CodecError::decode("getDataForMany", "missing result"))??;
        let shape = || CodecError::decode("getDataForMany", "unexpected reply shape");
        let (resolvers, owners) = if many.is_empty() {
            (vec![Address::ZERO; nodes.len()], vec![Address::ZERO; nodes.len()])
        } else {
            (
                many.first().and_then(Token::to_address_vec).ok_or_else(shape)?,
                many.get(1).and_then(Token::to_address_vec).ok_or_else(shape)?,
            )
        };
        if resolvers.len() != nodes.len() || owners.len() != nodes.len() {
            return Err(shape().into());
        }

        let mut out = Vec::with_capacity(nodes.len());
        for ((owner, resolver), registry) in owners.into_iter().zip(resolvers).zip(results) {
            let registry = registry?
                .first()
                .and_then(Token::as_address)
                .unwrap_or(Address::ZERO);
            out.push(owner.non_zero().map(|owner_address| Location {
                registry_address: registry,
                resolver_address: resolver.non_zero(),
                network_id,
                blockchain: self.blockchain.clone(),
                owner_address,
                blockchain_provider_url: self.provider_url.clone(),
            }));
        }
        Ok(out)
    }

    /// Chain id from the network table, or `net_version` for custom networks.
    pub async fn network_id(&self) -> Result<u64> {
        network_id(self.proxy_reader.provider().as_ref(), self.chain_id).await
    }

    fn from_block(&self) -> BlockTag {
        if self.start_block == 0 {
            BlockTag::Earliest
        } else {
            BlockTag::Number(self.start_block)
        }
    }
}

/// Key strings from `NewKey` events, or `fallback` when none of them carried
/// a readable key.
fn keys_or_fallback(discovered: Vec<DiscoveredKey>, fallback: &[String]) -> Vec<String> {
    let keys: Vec<String> = discovered.into_iter().filter_map(|k| k.key).collect();
    if keys.is_empty() {
        fallback.to_vec()
    } else {
        keys
    }
}
