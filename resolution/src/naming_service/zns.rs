//! # ZNS
//!
//! The Zilliqa registry has no ABI. Contract state is read directly with
//! `GetSmartContractSubState`: the registry's `records` map holds an
//! `(owner, resolver)` pair per node, and each resolver keeps its own
//! `records` map of key/value strings.
//!
//! Names hash with the SHA-256 namehash family.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::{self, contract_address, require_source, ZnsConfig, ZNS_TLD};
use crate::crypto::{Namehash, NamehashFamily};
use crate::domain::{is_valid_domain, tld};
use crate::error::{ConfigurationError, ResolutionError, Result};
use crate::naming_service::{network_id, require_resolver, NamingService};
use crate::transport::{Provider, RpcMethod};
use crate::types::{Address, Layer, Location, NamingServiceName, RecordMap, ResolutionRecord};

const BLOCKCHAIN: &str = "ZIL";

#[derive(Debug, Clone)]
pub struct Zns {
    provider: Arc<dyn Provider>,
    registry: Address,
    chain_id: Option<u64>,
    provider_url: Option<String>,
}

impl Zns {
    pub fn new(config: &ZnsConfig) -> std::result::Result<Self, ConfigurationError> {
        let service = NamingServiceName::Zns;
        let source = require_source(service, &config.network, config.source.as_ref())?;
        let known = config::zilliqa_network(&config.network);
        let registry = contract_address(
            service,
            &config.network,
            config.registry_address.as_deref(),
            known.map(|n| n.registry),
        )?;
        Ok(Self {
            provider: source.connect(&format!("ZNS ({})", config.network))?,
            registry,
            chain_id: known.map(|n| n.chain_id),
            provider_url: source.url(),
        })
    }

    pub fn registry(&self) -> Address {
        self.registry
    }

    /// `GetSmartContractSubState(contract, "records", indices)`.
    async fn sub_state(&self, contract: &Address, indices: Value) -> Result<Value> {
        let params = json!([
            contract.to_lower_hex().trim_start_matches("0x"),
            "records",
            indices
        ]);
        debug!(contract = %contract, "zns sub-state");
        self.provider
            .request(RpcMethod::GetSmartContractSubState.as_str(), params)
            .await
    }

    /// The registry's `(owner, resolver)` pair for `node`.
    async fn registry_entry(&self, node: &Namehash) -> Result<(Option<Address>, Option<Address>)> {
        let reply = self.sub_state(&self.registry, json!([node.to_hex()])).await?;
        let Some(entry) = reply.get("records").and_then(|r| r.get(node.to_hex())) else {
            return Ok((None, None));
        };
        let arguments = entry
            .get("arguments")
            .and_then(Value::as_array)
            .ok_or_else(|| self.malformed("registry record without arguments"))?;
        let parse = |i: usize| -> Result<Option<Address>> {
            match arguments.get(i).and_then(Value::as_str) {
                None => Ok(None),
                Some(raw) => raw
                    .parse::<Address>()
                    .map(Address::non_zero)
                    .map_err(|_| self.malformed(&format!("invalid address `{}`", raw))),
            }
        };
        Ok((parse(0)?, parse(1)?))
    }

    /// Every non-empty record a resolver holds.
    async fn resolver_records(&self, resolver: &Address) -> Result<RecordMap> {
        let reply = self.sub_state(resolver, json!([])).await?;
        let Some(records) = reply.get("records").and_then(Value::as_object) else {
            return Ok(RecordMap::new());
        };
        Ok(records
            .iter()
            .filter_map(|(key, value)| value.as_str().map(|v| (key.clone(), v.to_string())))
            .filter(|(_, value)| !value.is_empty())
            .collect())
    }

    fn malformed(&self, reason: &str) -> ResolutionError {
        ResolutionError::ServiceProviderError {
            provider: self.provider.name().to_string(),
            code: None,
            message: format!("malformed sub-state reply: {}", reason),
        }
    }

    async fn location(&self, domain: &str) -> Result<Option<Location>> {
        let (owner, resolver) = self.registry_entry(&self.namehash(domain)).await?;
        let Some(owner_address) = owner else {
            return Ok(None);
        };
        Ok(Some(Location {
            registry_address: self.registry,
            resolver_address: resolver,
            network_id: network_id(self.provider.as_ref(), self.chain_id).await?,
            blockchain: BLOCKCHAIN.to_string(),
            owner_address,
            blockchain_provider_url: self.provider_url.clone(),
        }))
    }
}

#[async_trait]
impl NamingService for Zns {
    fn name(&self) -> NamingServiceName {
        NamingServiceName::Zns
    }

    fn namehash(&self, domain: &str) -> Namehash {
        NamehashFamily::Zilliqa.hash(domain)
    }

    fn childhash(&self, parent: &Namehash, label: &str) -> Namehash {
        NamehashFamily::Zilliqa.childhash(parent, label)
    }

    async fn is_supported_domain(&self, domain: &str) -> Result<bool> {
        Ok(tld(domain) == ZNS_TLD && is_valid_domain(domain))
    }

    async fn data(&self, domain: &str, keys: &[String]) -> Result<ResolutionRecord> {
        let (owner, resolver) = self.registry_entry(&self.namehash(domain)).await?;
        let mut record = ResolutionRecord {
            owner,
            resolver,
            records: RecordMap::new(),
            source: Layer::NotApplicable,
        };
        if let (Some(_), Some(resolver), false) = (owner, resolver, keys.is_empty()) {
            let mut all = self.resolver_records(&resolver).await?;
            record.records = keys
                .iter()
                .filter_map(|k| all.remove_entry(k))
                .collect();
        }
        debug!(domain, owned = record.is_owned(), "zns data");
        Ok(record)
    }

    async fn all_records(&self, domain: &str) -> Result<RecordMap> {
        let data = self.data(domain, &[]).await?;
        let resolver = require_resolver(domain, &data)?;
        self.resolver_records(&resolver).await
    }

    async fn registry_address(&self, domain: &str) -> Result<Address> {
        let (owner, _) = self.registry_entry(&self.namehash(domain)).await?;
        match owner {
            Some(_) => Ok(self.registry),
            None => Err(ResolutionError::UnregisteredDomain {
                domain: domain.to_string(),
            }),
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
}
