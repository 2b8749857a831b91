//! # UNS
//!
//! The current registry lives on two chains at once. Names can be minted on
//! Ethereum (L1) or bridged to Polygon (L2), so every lookup runs on both
//! layers concurrently and the answers are merged by [`layered`].
//!
//! Supported TLDs are not a static list: a domain is UNS's if its TLD token
//! `exists` on either layer.

pub mod layer;
pub mod layered;

use std::collections::BTreeMap;

use async_trait::async_trait;
use tracing::debug;

use crate::config::UnsConfig;
use crate::crypto::{Namehash, NamehashFamily};
use crate::domain::{is_valid_hyphenated_domain, standard_keys, tld};
use crate::error::{ConfigurationError, ResolutionError, Result};
use crate::naming_service::contracts::Descriptors;
use crate::naming_service::{require_resolver, NamingService};
use crate::types::{Address, Layer, Location, NamingServiceName, RecordMap, ResolutionRecord};

use self::layer::UnsLayer;
use self::layered::{
    merge_each, merge_exists, merge_option, merge_records, merge_registry_address, merge_token_uri,
};

/// The two-layer UNS reader.
#[derive(Debug, Clone)]
pub struct Uns {
    layer1: UnsLayer,
    layer2: UnsLayer,
}

impl Uns {
    pub fn new(config: &UnsConfig) -> std::result::Result<Self, ConfigurationError> {
        let descriptors = Descriptors::load()?;
        Ok(Self {
            layer1: UnsLayer::new(Layer::Layer1, &config.layer1, &descriptors)?,
            layer2: UnsLayer::new(Layer::Layer2, &config.layer2, &descriptors)?,
        })
    }

    pub fn layer1(&self) -> &UnsLayer {
        &self.layer1
    }

    pub fn layer2(&self) -> &UnsLayer {
        &self.layer2
    }

    /// Owners of many domains at once, `None` for unowned ones. Both layers
    /// answer with one `ownerOfForMany` call each.
    pub async fn owners(&self, domains: &[String]) -> Result<Vec<Option<Address>>> {
        let nodes: Vec<Namehash> = domains.iter().map(|d| self.namehash(d)).collect();
        let (l1, l2) = tokio::join!(self.layer1.owners(&nodes), self.layer2.owners(&nodes));
        merge_each(&l1, &l2, domains.len())
    }

    async fn merged_data(&self, node: &Namehash, keys: &[String]) -> Result<ResolutionRecord> {
        let (l1, l2) = tokio::join!(self.layer1.data(node, keys), self.layer2.data(node, keys));
        merge_records(l1, l2)
    }

    fn layer(&self, layer: Layer) -> &UnsLayer {
        match layer {
            Layer::Layer2 => &self.layer2,
            _ => &self.layer1,
        }
    }
}

#[async_trait]
impl NamingService for Uns {
    fn name(&self) -> NamingServiceName {
        NamingServiceName::Uns
    }

    fn namehash(&self, domain: &str) -> Namehash {
        NamehashFamily::Ethereum.hash(domain)
    }

    fn childhash(&self, parent: &Namehash, label: &str) -> Namehash {
        NamehashFamily::Ethereum.childhash(parent, label)
    }

    async fn is_supported_domain(&self, domain: &str) -> Result<bool> {
        if !is_valid_hyphenated_domain(domain) {
            return Ok(false);
        }
        let node = self.namehash(tld(domain));
        let (l1, l2) = tokio::join!(self.layer1.exists(&node), self.layer2.exists(&node));
        merge_exists(l1, l2)
    }

    async fn data(&self, domain: &str, keys: &[String]) -> Result<ResolutionRecord> {
        let record = self.merged_data(&self.namehash(domain), keys).await?;
        debug!(domain, layer = %record.source, owned = record.is_owned(), "uns data");
        Ok(record)
    }

    async fn all_records(&self, domain: &str) -> Result<RecordMap> {
        let node = self.namehash(domain);
        let data = self.merged_data(&node, &[]).await?;
        let resolver = require_resolver(domain, &data)?;
        self.layer(data.source)
            .all_records(&node, resolver, &standard_keys())
            .await
    }

    async fn registry_address(&self, domain: &str) -> Result<Address> {
        let node = self.namehash(domain);
        let (l1, l2) = tokio::join!(self.layer1.registry_of(&node), self.layer2.registry_of(&node));
        let (address, _) = merge_registry_address(l1, l2)?;
        address
            .non_zero()
            .ok_or_else(|| ResolutionError::UnregisteredDomain {
                domain: domain.to_string(),
            })
    }

    async fn locations(&self, domains: &[String]) -> Result<BTreeMap<String, Option<Location>>> {
        let nodes: Vec<Namehash> = domains.iter().map(|d| self.namehash(d)).collect();
        let (l1, l2) = tokio::join!(self.layer1.locations(&nodes), self.layer2.locations(&nodes));
        let merged = merge_each(&l1, &l2, domains.len())?;
        Ok(domains.iter().cloned().zip(merged).collect())
    }

    async fn token_uri(&self, domain: &str) -> Result<String> {
        let node = self.namehash(domain);
        let (l1, l2) = tokio::join!(self.layer1.token_uri(&node), self.layer2.token_uri(&node));
        let uri = merge_token_uri(l1, l2)?;
        if uri.is_empty() {
            return Err(ResolutionError::UnregisteredDomain {
                domain: domain.to_string(),
            });
        }
        Ok(uri)
    }

    async fn unhash(&self, hash: &Namehash) -> Result<String> {
        let (l1, l2) = tokio::join!(self.layer1.unhash(hash), self.layer2.unhash(hash));
        merge_option(l1, l2)?.ok_or_else(|| ResolutionError::UnregisteredDomain {
            domain: hash.to_hex(),
        })
    }

    async fn reverse(&self, address: &Address) -> Result<Option<String>> {
        let (l1, l2) = tokio::join!(self.layer1.reverse_of(address), self.layer2.reverse_of(address));
        match merge_option(l1, l2)? {
            Some(node) => self.unhash(&node).await.map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::abi::{encode, ParamType, Token};
    use crate::config::{ProviderSource, UnsLayerConfig};
    use crate::crypto::{eth_namehash, keccak256};
    use crate::transport::{MockProvider, Provider};

    struct Fixture {
        uns: Uns,
        l1: Arc<MockProvider>,
        l2: Arc<MockProvider>,
        descriptors: Descriptors,
    }

    fn fixture() -> Fixture {
        let l1 = Arc::new(MockProvider::new("l1"));
        let l2 = Arc::new(MockProvider::new("l2"));
        let p1: Arc<dyn Provider> = l1.clone();
        let p2: Arc<dyn Provider> = l2.clone();
        let config = UnsConfig {
            layer1: UnsLayerConfig::new("mainnet", ProviderSource::Provider(p1)),
            layer2: UnsLayerConfig::new("polygon-mainnet", ProviderSource::Provider(p2)),
        };
        Fixture {
            uns: Uns::new(&config).unwrap(),
            l1,
            l2,
            descriptors: Descriptors::load().unwrap(),
        }
    }

    fn addr(last: u8) -> Address {
        let mut bytes = [0u8; 20];
        bytes[19] = last;
        Address(bytes)
    }

    fn bool_reply(value: bool) -> Vec<u8> {
        encode(&[ParamType::Bool], &[Token::Bool(value)]).unwrap()
    }

    fn data_reply(resolver: Address, owner: Address, values: &[&str]) -> Vec<u8> {
        encode(
            &[ParamType::Address, ParamType::Address, ParamType::parse("string[]").unwrap()],
            &[
                Token::Address(resolver),
                Token::Address(owner),
                Token::string_array(values),
            ],
        )
        .unwrap()
    }

    fn string_data(value: &str) -> Vec<u8> {
        encode(&[ParamType::String], &[Token::string(value)]).unwrap()
    }

    fn registry(s: &str) -> Address {
        s.parse().unwrap()
    }

    const L1_REGISTRY: &str = "0x049aba7510f45BA5b64ea9E658E342F904DB358D";
    const L2_REGISTRY: &str = "0xa9a6A3626993D487d2Dbda3173cf58cA1a9D9e9f";

    impl Fixture {
        fn selector(&self, function: &str) -> [u8; 4] {
            self.descriptors.proxy_reader.function(function).unwrap().selector()
        }

        /// Scripts `getData` on both layers; an empty reply means unowned.
        fn get_data(&self, layer1: Vec<u8>, layer2: Vec<u8>) {
            let get_data = self.selector("getData");
            self.l1.on_call(self.uns.layer1().proxy_reader_address(), get_data, layer1);
            self.l2.on_call(self.uns.layer2().proxy_reader_address(), get_data, layer2);
        }

        fn reverse_of(&self, layer1: Namehash, layer2: Namehash) {
            let reverse_of = self.selector("reverseOf");
            let reply = |node: Namehash| encode(&[ParamType::Uint(256)], &[Token::from(node)]).unwrap();
            self.l1.on_call(self.uns.layer1().proxy_reader_address(), reverse_of, reply(layer1));
            self.l2.on_call(self.uns.layer2().proxy_reader_address(), reverse_of, reply(layer2));
        }
    }

    #[tokio::test]
    async fn test_tld_support_is_remote() {
        let f = fixture();
        let exists = f.descriptors.proxy_reader.function("exists").unwrap().selector();
        f.l1.on_call(f.uns.layer1().proxy_reader_address(), exists, bool_reply(false));
        f.l2.on_call(f.uns.layer2().proxy_reader_address(), exists, bool_reply(true));
        assert!(f.uns.is_supported_domain("brad.wallet").await.unwrap());
        assert!(!f.uns.is_supported_domain("-brad.wallet").await.unwrap());
    }

    #[tokio::test]
    async fn test_registry_address_unregistered_after_translation() {
        let f = fixture();
        let registry_of = f.descriptors.proxy_reader.function("registryOf").unwrap().selector();
        f.l1.on_call_error(
            f.uns.layer1().proxy_reader_address(),
            registry_of,
            ResolutionError::ServiceProviderError {
                provider: "l1".to_string(),
                code: Some(3),
                message: "execution reverted".to_string(),
            },
        );
        f.l2.on_call(
            f.uns.layer2().proxy_reader_address(),
            registry_of,
            encode(&[ParamType::Address], &[Token::Address(Address::ZERO)]).unwrap(),
        );
        assert!(matches!(
            f.uns.registry_address("nope.crypto").await,
            Err(ResolutionError::UnregisteredDomain { .. })
        ));
    }

    #[tokio::test]
    async fn test_unhash_verifies_candidates() {
        let f = fixture();
        let node = eth_namehash("brad.crypto");
        let topic = f.descriptors.registry.event("NewURI").unwrap().topic();
        let data = |uri: &str| encode(&[ParamType::String], &[Token::string(uri)]).unwrap();
        let registry = |s: &str| s.parse::<Address>().unwrap();
        f.l1.on_logs(
            registry("0x049aba7510f45BA5b64ea9E658E342F904DB358D"),
            topic,
            vec![
                MockProvider::log_entry(1, 0, &[topic, node.0], &data("spoof.crypto")),
                MockProvider::log_entry(2, 0, &[topic, node.0], &data("brad.crypto")),
            ],
        );
        f.l2.on_logs(registry("0xa9a6A3626993D487d2Dbda3173cf58cA1a9D9e9f"), topic, vec![]);
        assert_eq!(f.uns.unhash(&node).await.unwrap(), "brad.crypto");
    }

    #[tokio::test]
    async fn test_owners_prefers_layer2() {
        let f = fixture();
        let owner_of_many = f.descriptors.proxy_reader.function("ownerOfForMany").unwrap().selector();
        let reply = |owners: Vec<Address>| {
            encode(
                &[ParamType::parse("address[]").unwrap()],
                &[Token::Array(owners.into_iter().map(Token::Address).collect())],
            )
            .unwrap()
        };
        f.l1.on_call(f.uns.layer1().proxy_reader_address(), owner_of_many, reply(vec![addr(1), addr(2)]));
        f.l2.on_call(f.uns.layer2().proxy_reader_address(), owner_of_many, reply(vec![Address::ZERO, addr(3)]));
        let owners = f
            .uns
            .owners(&["a.crypto".to_string(), "b.crypto".to_string()])
            .await
            .unwrap();
        assert_eq!(owners, vec![Some(addr(1)), Some(addr(3))]);
    }

    #[tokio::test]
    async fn test_layer2_owner_with_empty_layer1() {
        let f = fixture();
        f.get_data(Vec::new(), data_reply(addr(7), addr(3), &["0xl2"]));

        let keys = vec!["crypto.ETH.address".to_string()];
        let record = f.uns.data("brad.crypto", &keys).await.unwrap();
        assert_eq!(record.source, Layer::Layer2);
        assert_eq!(record.owner, Some(addr(3)));
        assert_eq!(record.resolver, Some(addr(7)));
        assert_eq!(record.records.get("crypto.ETH.address").map(String::as_str), Some("0xl2"));
        assert_eq!(f.uns.resolve_address("brad.crypto", "ETH").await.unwrap(), "0xl2");
        assert_eq!(f.l1.call_count(f.uns.layer1().proxy_reader_address(), f.selector("getData")), 2);
    }

    #[tokio::test]
    async fn test_all_records_replays_keys_on_winning_layer() {
        let f = fixture();
        let resolver = addr(7);
        let node = eth_namehash("brad.crypto");
        let reset = f.descriptors.resolver.event("ResetRecords").unwrap().topic();
        let new_key = f.descriptors.resolver.event("NewKey").unwrap().topic();
        let key_log = |block: u64, key: &str| {
            MockProvider::log_entry(block, 0, &[new_key, node.0, keccak256(key.as_bytes())], &string_data(key))
        };

        f.get_data(Vec::new(), data_reply(resolver, addr(3), &["0xabc", "bc1q"]));
        f.l2.on_logs(resolver, reset, vec![]);
        f.l2.on_logs(
            resolver,
            new_key,
            vec![
                key_log(19_400_000, "crypto.ETH.address"),
                key_log(19_400_001, "crypto.BTC.address"),
                key_log(19_400_002, "crypto.ETH.address"),
            ],
        );

        let records = f.uns.all_records("brad.crypto").await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records["crypto.ETH.address"], "0xabc");
        assert_eq!(records["crypto.BTC.address"], "bc1q");
        assert_eq!(f.l1.request_count("eth_getLogs"), 0);
        assert_eq!(f.l2.request_count("eth_getLogs"), 2);
    }

    #[tokio::test]
    async fn test_all_records_without_new_key_events_uses_standard_keys() {
        let f = fixture();
        let resolver = addr(7);
        let keys = standard_keys();
        let mut values = vec![""; keys.len()];
        values[0] = "0xabc";
        f.get_data(data_reply(resolver, addr(3), &values), Vec::new());
        f.l1.on_logs(resolver, f.descriptors.resolver.event("ResetRecords").unwrap().topic(), vec![]);
        f.l1.on_logs(resolver, f.descriptors.resolver.event("NewKey").unwrap().topic(), vec![]);

        let records = f.uns.all_records("brad.crypto").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[&keys[0]], "0xabc");
        assert_eq!(f.l2.request_count("eth_getLogs"), 0);
    }

    #[tokio::test]
    async fn test_all_records_requires_a_resolver() {
        let f = fixture();
        f.get_data(Vec::new(), data_reply(Address::ZERO, addr(3), &[]));
        assert!(matches!(
            f.uns.all_records("brad.crypto").await,
            Err(ResolutionError::UnspecifiedResolver { .. })
        ));
    }

    #[tokio::test]
    async fn test_reverse_unhashes_across_layers() {
        let f = fixture();
        let node = eth_namehash("brad.crypto");
        let new_uri = f.descriptors.registry.event("NewURI").unwrap().topic();
        f.reverse_of(Namehash::ROOT, node);
        // Minted on L1, bridged to L2 afterwards.
        f.l1.on_logs(
            registry(L1_REGISTRY),
            new_uri,
            vec![MockProvider::log_entry(12_800_000, 3, &[new_uri, node.0], &string_data("brad.crypto"))],
        );
        f.l2.on_logs(registry(L2_REGISTRY), new_uri, vec![]);

        assert_eq!(
            f.uns.reverse(&addr(3)).await.unwrap().as_deref(),
            Some("brad.crypto")
        );
    }

    #[tokio::test]
    async fn test_reverse_without_record_is_none() {
        let f = fixture();
        f.reverse_of(Namehash::ROOT, Namehash::ROOT);
        assert_eq!(f.uns.reverse(&addr(3)).await.unwrap(), None);
        assert_eq!(f.l1.request_count("eth_getLogs"), 0);
        assert_eq!(f.l2.request_count("eth_getLogs"), 0);
    }
}
