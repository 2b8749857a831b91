//! # CNS
//!
//! The legacy Ethereum registry. Depending on the deployment, the configured
//! address is either a ProxyReader (one call per lookup) or the bare
//! registry, which only knows owners and resolvers and leaves records to a
//! separate resolver contract. Which one it is gets decided on first use by
//! [`strategy`] and never re-checked.
//!
//! Some early resolvers predate multi-currency records: they answer the
//! native coin and nothing else, and cannot enumerate their keys.

pub mod strategy;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::debug;

use crate::abi::Token;
use crate::config::{self, contract_address, require_source, CnsConfig, NetworkConfig};
use crate::contract::ContractClient;
use crate::crypto::{Namehash, NamehashFamily};
use crate::domain::{address_key, is_valid_hyphenated_domain, standard_keys, tld};
use crate::error::{CodecError, ConfigurationError, ResolutionError, Result};
use crate::naming_service::contracts::Descriptors;
use crate::naming_service::{
    discover_keys, network_id, pick_record, record_from_data_reply, require_owner, require_resolver,
    zip_records, NamingService,
};
use crate::transport::Provider;
use crate::types::{Address, Layer, Location, NamingServiceName, RecordMap, ResolutionRecord};

use self::strategy::{detect, ReaderStrategy, StrategyCache};

/// The only currency legacy resolvers can answer.
const NATIVE_TICKER: &str = "ETH";

#[derive(Debug)]
pub struct Cns {
    tlds: Vec<String>,
    /// The configured address, seen through the ProxyReader interface.
    reader: ContractClient,
    /// The configured address, seen through the registry interface.
    registry: ContractClient,
    /// Resolver interface; re-pointed per lookup.
    resolver: ContractClient,
    strategy: StrategyCache,
    allow_listed: bool,
    /// Built-in table entry, absent on custom networks.
    network: Option<&'static NetworkConfig>,
    start_block: u64,
    provider_url: Option<String>,
}

impl Cns {
    pub fn new(config: &CnsConfig) -> std::result::Result<Self, ConfigurationError> {
        let service = NamingServiceName::Cns;
        let source = require_source(service, &config.network, config.source.as_ref())?;
        let known = config::network(&config.network);
        let address = contract_address(
            service,
            &config.network,
            config.registry_address.as_deref(),
            known.and_then(|n| n.cns_registry),
        )?;

        let descriptors = Descriptors::load()?;
        let provider: Arc<dyn Provider> = source.connect(&format!("CNS ({})", config.network))?;
        let reader = ContractClient::new(Arc::clone(&provider), address, descriptors.proxy_reader);
        let registry = ContractClient::new(Arc::clone(&provider), address, descriptors.registry);
        let resolver = ContractClient::new(provider, Address::ZERO, descriptors.resolver);

        Ok(Self {
            tlds: config.tlds.iter().map(|t| t.to_ascii_lowercase()).collect(),
            reader,
            registry,
            resolver,
            strategy: StrategyCache::new(),
            allow_listed: known.map(|n| n.is_proxy_reader(&address)).unwrap_or(false),
            network: known,
            start_block: config
                .event_start_block
                .or_else(|| known.map(|n| n.cns_start_block))
                .unwrap_or(0),
            provider_url: source.url(),
        })
    }

    /// The reader strategy, probing on first use.
    pub async fn reader_strategy(&self) -> Result<ReaderStrategy> {
        self.strategy
            .resolve(|| detect(&self.reader, self.allow_listed))
            .await
    }

    pub fn contract_address(&self) -> Address {
        self.registry.address()
    }

    pub fn is_legacy_resolver(&self, resolver: &Address) -> bool {
        self.network
            .map(|n| n.is_legacy_resolver(resolver))
            .unwrap_or(false)
    }

    async fn lookup(&self, node: &Namehash, keys: &[String]) -> Result<ResolutionRecord> {
        match self.reader_strategy().await? {
            ReaderStrategy::ProxyReader => {
                let tokens = self
                    .reader
                    .call("getData", &[Token::string_array(keys), Token::from(*node)])
                    .await?;
                record_from_data_reply(&tokens, keys, Layer::NotApplicable)
            }
            ReaderStrategy::DirectRegistry => self.direct_lookup(node, keys).await,
        }
    }

    /// Registry for owner and resolver, then the resolver for records.
    async fn direct_lookup(&self, node: &Namehash, keys: &[String]) -> Result<ResolutionRecord> {
        let token = Token::from(*node);
        let mut results = self
            .registry
            .multicall(&[("ownerOf", vec![token.clone()]), ("resolverOf", vec![token])])
            .await?
            .into_iter();
        let owner = address_or_zero(results.next())?;
        let resolver = address_or_zero(results.next())?;

        let mut record = ResolutionRecord {
            owner: owner.non_zero(),
            resolver: resolver.non_zero(),
            records: RecordMap::new(),
            source: Layer::NotApplicable,
        };
        if let (Some(_), Some(resolver), false) = (record.owner, record.resolver, keys.is_empty()) {
            let tokens = self
                .resolver
                .with_address(resolver)
                .call("getMany", &[Token::string_array(keys), Token::from(*node)])
                .await?;
            let values = match tokens.first() {
                None => Vec::new(),
                Some(values) => values
                    .to_string_vec()
                    .ok_or_else(|| CodecError::decode("getMany", "unexpected reply shape"))?,
            };
            record.records = zip_records(keys.iter().cloned(), values);
        }
        Ok(record)
    }

    async fn location(&self, domain: &str) -> Result<Option<Location>> {
        let data = self.data(domain, &[]).await?;
        let Some(owner_address) = data.owner else {
            return Ok(None);
        };
        let chain_id = self.network.map(|n| n.chain_id);
        Ok(Some(Location {
            registry_address: self.registry_address(domain).await?,
            resolver_address: data.resolver,
            network_id: network_id(self.registry.provider().as_ref(), chain_id).await?,
            blockchain: NATIVE_TICKER.to_string(),
            owner_address,
            blockchain_provider_url: self.provider_url.clone(),
        }))
    }
}

/// `ownerOf` / `resolverOf` revert for tokens the registry never minted.
fn address_or_zero(result: Option<Result<Vec<Token>>>) -> Result<Address> {
    match result {
        Some(Ok(tokens)) => Ok(tokens.first().and_then(Token::as_address).unwrap_or(Address::ZERO)),
        Some(Err(e)) if e.is_revert() => Ok(Address::ZERO),
        Some(Err(e)) => Err(e),
        None => Err(CodecError::decode("registry", "missing multicall result").into()),
    }
}

#[async_trait]
impl NamingService for Cns {
    fn name(&self) -> NamingServiceName {
        NamingServiceName::Cns
    }

    fn namehash(&self, domain: &str) -> Namehash {
        NamehashFamily::Ethereum.hash(domain)
    }

    fn childhash(&self, parent: &Namehash, label: &str) -> Namehash {
        NamehashFamily::Ethereum.childhash(parent, label)
    }

    async fn is_supported_domain(&self, domain: &str) -> Result<bool> {
        Ok(is_valid_hyphenated_domain(domain) && self.tlds.iter().any(|t| t == tld(domain)))
    }

    async fn data(&self, domain: &str, keys: &[String]) -> Result<ResolutionRecord> {
        let record = self.lookup(&self.namehash(domain), keys).await?;
        debug!(domain, owned = record.is_owned(), "cns data");
        Ok(record)
    }

    async fn resolve_address(&self, domain: &str, ticker: &str) -> Result<String> {
        let key = address_key(ticker);
        let data = self.data(domain, std::slice::from_ref(&key)).await?;
        let resolver = require_resolver(domain, &data)?;
        if self.is_legacy_resolver(&resolver) && !ticker.eq_ignore_ascii_case(NATIVE_TICKER) {
            return Err(ResolutionError::IncorrectResolverInterface {
                domain: domain.to_string(),
                resolver,
                method: format!("resolve_address({})", ticker.to_ascii_uppercase()),
            });
        }
        pick_record(domain, &data.records, &key)
    }

    async fn all_records(&self, domain: &str) -> Result<RecordMap> {
        let node = self.namehash(domain);
        let data = self.lookup(&node, &[]).await?;
        let resolver = require_resolver(domain, &data)?;

        if self.is_legacy_resolver(&resolver) {
            return Ok(self.lookup(&node, &standard_keys()).await?.records);
        }

        let resolver_client = self.resolver.with_address(resolver);
        let discovered = discover_keys(&resolver_client, &node, self.start_block).await?;
        if discovered.is_empty() {
            debug!(domain, "no NewKey events, using standard keys");
            return Ok(self.lookup(&node, &standard_keys()).await?.records);
        }

        let hashes = Token::Array(discovered.iter().map(|k| Token::Uint(k.hash)).collect());
        let tokens = resolver_client
            .call("getManyByHash", &[hashes, Token::from(node)])
            .await?;
        if tokens.is_empty() {
            return Ok(RecordMap::new());
        }
        let shape = || CodecError::decode("getManyByHash", "unexpected reply shape");
        let keys = tokens.first().and_then(Token::to_string_vec).ok_or_else(shape)?;
        let values = tokens.get(1).and_then(Token::to_string_vec).ok_or_else(shape)?;
        Ok(zip_records(keys, values))
    }

    async fn registry_address(&self, domain: &str) -> Result<Address> {
        let node = self.namehash(domain);
        match self.reader_strategy().await? {
            ReaderStrategy::ProxyReader => {
                let tokens = self.reader.call("registryOf", &[Token::from(node)]).await?;
                tokens
                    .first()
                    .and_then(Token::as_address)
                    .and_then(Address::non_zero)
                    .ok_or_else(|| ResolutionError::UnregisteredDomain {
                        domain: domain.to_string(),
                    })
            }
            ReaderStrategy::DirectRegistry => {
                require_owner(domain, &self.direct_lookup(&node, &[]).await?)?;
                Ok(self.registry.address())
            }
        }
    }

    async fn locations(&self, domains: &[String]) -> Result<BTreeMap<String, Option<Location>>> {
        let found = join_all(domains.iter().map(|d| self.location(d))).await;
        domains
            .iter()
            .cloned()
            .zip(found)
            .map(|(domain, location)| location.map(|l| (domain, l)))
            .collect()
    }

    async fn token_uri(&self, domain: &str) -> Result<String> {
        let node = Token::from(self.namehash(domain));
        let call = match self.reader_strategy().await? {
            ReaderStrategy::ProxyReader => self.reader.call("tokenURI", &[node]).await,
            ReaderStrategy::DirectRegistry => self.registry.call("tokenURI", &[node]).await,
        };
        let unregistered = || ResolutionError::UnregisteredDomain {
            domain: domain.to_string(),
        };
        match call {
            Ok(tokens) => tokens
                .first()
                .and_then(Token::as_str)
                .filter(|uri| !uri.is_empty())
                .map(str::to_string)
                .ok_or_else(unregistered),
            Err(e) if e.is_revert() => Err(unregistered()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::{encode, ParamType};
    use crate::config::ProviderSource;
    use crate::crypto::{eth_namehash, keccak256};
    use crate::transport::MockProvider;

    const REGISTRY: &str = "0x00000000000000000000000000000000000000c0";
    const LEGACY_RESOLVER: &str = "0xa1cac442be6673c49f8e74ffc7c4fd746f3cbd0d";

    fn addr(s: &str) -> Address {
        s.parse().unwrap()
    }

    fn resolver_addr() -> Address {
        addr("0x00000000000000000000000000000000000000d0")
    }

    fn owner_addr() -> Address {
        addr("0x00000000000000000000000000000000000000e0")
    }

    fn cns(mock: &Arc<MockProvider>) -> Cns {
        let provider: Arc<dyn Provider> = mock.clone();
        let config = CnsConfig::new("mainnet", ProviderSource::Provider(provider)).registry(REGISTRY);
        Cns::new(&config).unwrap()
    }

    fn selector(fragments: &Arc<crate::abi::ContractDescriptor>, name: &str) -> [u8; 4] {
        fragments.function(name).unwrap().selector()
    }

    fn address_reply(a: Address) -> Vec<u8> {
        encode(&[ParamType::Address], &[Token::Address(a)]).unwrap()
    }

    fn strings_reply(values: &[&str]) -> Vec<u8> {
        encode(&[ParamType::parse("string[]").unwrap()], &[Token::string_array(values)]).unwrap()
    }

    fn revert() -> ResolutionError {
        ResolutionError::ServiceProviderError {
            provider: "mock".to_string(),
            code: Some(3),
            message: "execution reverted".to_string(),
        }
    }

    /// A direct registry: the probe reverts, owner and resolver are set.
    fn direct_registry(mock: &MockProvider, resolver: Address) {
        let d = Descriptors::load().unwrap();
        mock.on_call_error(addr(REGISTRY), selector(&d.proxy_reader, "supportsInterface"), revert());
        mock.on_call(addr(REGISTRY), selector(&d.registry, "ownerOf"), address_reply(owner_addr()));
        mock.on_call(addr(REGISTRY), selector(&d.registry, "resolverOf"), address_reply(resolver));
    }

    #[tokio::test]
    async fn test_supported_tlds_are_local() {
        let mock = Arc::new(MockProvider::new("mock"));
        let cns = cns(&mock);
        assert!(cns.is_supported_domain("brad.crypto").await.unwrap());
        assert!(!cns.is_supported_domain("brad.zil").await.unwrap());
        assert!(!cns.is_supported_domain("brad-.crypto").await.unwrap());
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn test_direct_registry_path() {
        let mock = Arc::new(MockProvider::new("mock"));
        let cns = cns(&mock);
        direct_registry(&mock, resolver_addr());
        let d = Descriptors::load().unwrap();
        mock.on_call(resolver_addr(), selector(&d.resolver, "getMany"), strings_reply(&["0xabc"]));

        let eth = cns.resolve_address("brad.crypto", "eth").await.unwrap();
        assert_eq!(eth, "0xabc");
        assert_eq!(cns.owner("brad.crypto").await.unwrap(), owner_addr());
        assert_eq!(cns.reader_strategy().await.unwrap(), ReaderStrategy::DirectRegistry);
    }

    #[tokio::test]
    async fn test_probe_is_issued_once() {
        let mock = Arc::new(MockProvider::new("mock"));
        let cns = cns(&mock);
        direct_registry(&mock, resolver_addr());
        for _ in 0..3 {
            cns.owner("brad.crypto").await.unwrap();
        }
        let probe = selector(&Descriptors::load().unwrap().proxy_reader, "supportsInterface");
        assert_eq!(mock.call_count(addr(REGISTRY), probe), 1);
    }

    #[tokio::test]
    async fn test_concurrent_lookups_send_one_supports_interface_call() {
        let mock = Arc::new(MockProvider::new("mock"));
        let cns = cns(&mock);
        direct_registry(&mock, resolver_addr());
        let strategies = join_all((0..6).map(|_| cns.reader_strategy())).await;
        assert!(strategies
            .into_iter()
            .all(|s| s.unwrap() == ReaderStrategy::DirectRegistry));
        let probe = selector(&Descriptors::load().unwrap().proxy_reader, "supportsInterface");
        assert_eq!(mock.call_count(addr(REGISTRY), probe), 1);
    }

    #[tokio::test]
    async fn test_unknown_token_revert_is_unregistered() {
        let mock = Arc::new(MockProvider::new("mock"));
        let cns = cns(&mock);
        let d = Descriptors::load().unwrap();
        mock.on_call_error(addr(REGISTRY), selector(&d.proxy_reader, "supportsInterface"), revert());
        mock.on_call_error(addr(REGISTRY), selector(&d.registry, "ownerOf"), revert());
        mock.on_call_error(addr(REGISTRY), selector(&d.registry, "resolverOf"), revert());
        assert!(!cns.is_registered("nope.crypto").await.unwrap());
        assert!(matches!(
            cns.owner("nope.crypto").await,
            Err(ResolutionError::UnregisteredDomain { .. })
        ));
    }

    #[test]
    fn test_legacy_resolvers_come_from_the_network_table() {
        let mock = Arc::new(MockProvider::new("mock"));
        assert!(cns(&mock).is_legacy_resolver(&addr(LEGACY_RESOLVER)));
        assert!(!cns(&mock).is_legacy_resolver(&resolver_addr()));

        let provider: Arc<dyn Provider> = mock.clone();
        let custom = Cns::new(&CnsConfig::new("local", ProviderSource::Provider(provider)).registry(REGISTRY)).unwrap();
        assert!(!custom.is_legacy_resolver(&addr(LEGACY_RESOLVER)));
    }

    #[tokio::test]
    async fn test_legacy_resolver_rejects_other_currencies() {
        let mock = Arc::new(MockProvider::new("mock"));
        let cns = cns(&mock);
        direct_registry(&mock, addr(LEGACY_RESOLVER));
        let d = Descriptors::load().unwrap();
        mock.on_call(addr(LEGACY_RESOLVER), selector(&d.resolver, "getMany"), strings_reply(&[""]));
        assert!(matches!(
            cns.resolve_address("brad.crypto", "BTC").await,
            Err(ResolutionError::IncorrectResolverInterface { .. })
        ));
    }

    #[tokio::test]
    async fn test_all_records_replays_new_key_events() {
        let mock = Arc::new(MockProvider::new("mock"));
        let cns = cns(&mock);
        direct_registry(&mock, resolver_addr());
        let d = Descriptors::load().unwrap();
        let node = eth_namehash("brad.crypto");
        let reset = d.resolver.event("ResetRecords").unwrap().topic();
        let new_key = d.resolver.event("NewKey").unwrap().topic();
        let eth_key = keccak256(b"crypto.ETH.address");
        let btc_key = keccak256(b"crypto.BTC.address");
        let key_data = |k: &str| encode(&[ParamType::String], &[Token::string(k)]).unwrap();

        mock.on_logs(
            resolver_addr(),
            reset,
            vec![MockProvider::log_entry(500, 1, &[reset, node.0], &[])],
        );
        mock.on_logs(
            resolver_addr(),
            new_key,
            vec![
                MockProvider::log_entry(501, 0, &[new_key, node.0, eth_key], &key_data("crypto.ETH.address")),
                MockProvider::log_entry(502, 0, &[new_key, node.0, btc_key], &key_data("crypto.BTC.address")),
                MockProvider::log_entry(503, 0, &[new_key, node.0, eth_key], &key_data("crypto.ETH.address")),
            ],
        );
        mock.on_call(
            resolver_addr(),
            selector(&d.resolver, "getManyByHash"),
            encode(
                &[ParamType::parse("string[]").unwrap(), ParamType::parse("string[]").unwrap()],
                &[
                    Token::string_array(&["crypto.ETH.address", "crypto.BTC.address"]),
                    Token::string_array(&["0xeth", ""]),
                ],
            )
            .unwrap(),
        );

        let records = cns.all_records("brad.crypto").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records["crypto.ETH.address"], "0xeth");

        // NewKey replay starts at the reset block.
        let requests = mock.requests();
        let new_key_request = requests
            .iter()
            .filter(|(m, _)| m == "eth_getLogs")
            .find(|(_, p)| p[0]["topics"][0] == serde_json::json!(format!("0x{}", hex::encode(new_key))))
            .unwrap();
        assert_eq!(new_key_request.1[0]["fromBlock"], serde_json::json!("0x1f4"));

        // Two distinct hashes, in first-seen order.
        let by_hash = requests
            .iter()
            .find(|(m, p)| {
                m == "eth_call"
                    && p[0]["data"]
                        .as_str()
                        .unwrap()
                        .starts_with(&format!("0x{}", hex::encode(selector(&d.resolver, "getManyByHash"))))
            })
            .unwrap();
        let data = hex::decode(by_hash.1[0]["data"].as_str().unwrap().trim_start_matches("0x")).unwrap();
        let args = d.resolver.function("getManyByHash").unwrap().inputs.clone();
        let kinds: Vec<ParamType> = args.into_iter().map(|p| p.kind).collect();
        let decoded = crate::abi::decode(&kinds, &data[4..]).unwrap();
        assert_eq!(
            decoded[0],
            Token::Array(vec![Token::Uint(eth_key), Token::Uint(btc_key)])
        );
    }

    #[tokio::test]
    async fn test_all_records_without_events_uses_standard_keys() {
        let mock = Arc::new(MockProvider::new("mock"));
        let cns = cns(&mock);
        direct_registry(&mock, resolver_addr());
        let d = Descriptors::load().unwrap();
        mock.on_logs(resolver_addr(), d.resolver.event("ResetRecords").unwrap().topic(), vec![]);
        mock.on_logs(resolver_addr(), d.resolver.event("NewKey").unwrap().topic(), vec![]);
        let mut values = vec![""; standard_keys().len()];
        values[1] = "0xeth";
        mock.on_call(resolver_addr(), selector(&d.resolver, "getMany"), strings_reply(&values));

        let records = cns.all_records("brad.crypto").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records["crypto.ETH.address"], "0xeth");
    }

    #[tokio::test]
    async fn test_all_records_log_failure_propagates() {
        let mock = Arc::new(MockProvider::new("mock"));
        let cns = cns(&mock);
        direct_registry(&mock, resolver_addr());
        let d = Descriptors::load().unwrap();
        mock.on_logs_error(
            resolver_addr(),
            d.resolver.event("ResetRecords").unwrap().topic(),
            ResolutionError::ServiceProviderError {
                provider: "mock".to_string(),
                code: Some(-32005),
                message: "query returned more than 10000 results".to_string(),
            },
        );
        assert!(cns.all_records("brad.crypto").await.is_err());
    }

    #[tokio::test]
    async fn test_proxy_reader_path() {
        let mock = Arc::new(MockProvider::new("mock"));
        let cns = cns(&mock);
        let d = Descriptors::load().unwrap();
        mock.on_call(
            addr(REGISTRY),
            selector(&d.proxy_reader, "supportsInterface"),
            encode(&[ParamType::Bool], &[Token::Bool(true)]).unwrap(),
        );
        mock.on_call(
            addr(REGISTRY),
            selector(&d.proxy_reader, "getData"),
            encode(
                &[ParamType::Address, ParamType::Address, ParamType::parse("string[]").unwrap()],
                &[
                    Token::Address(resolver_addr()),
                    Token::Address(owner_addr()),
                    Token::string_array(&["bob@example.com"]),
                ],
            )
            .unwrap(),
        );
        assert_eq!(
            cns.record("brad.crypto", "whois.email.value").await.unwrap(),
            "bob@example.com"
        );
        assert_eq!(cns.reader_strategy().await.unwrap(), ReaderStrategy::ProxyReader);
        assert_eq!(mock.request_count("eth_call"), 2);
    }
}
