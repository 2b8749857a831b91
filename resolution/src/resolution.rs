//! # Resolution
//!
//! The public entry point. A [`Resolution`] owns an ordered list of naming
//! services and routes every domain to the first one that claims it:
//!
//! ```text
//! CNS (static TLD list) → ZNS (`.zil`) → custom services → UNS (remote TLD check)
//! ```
//!
//! UNS goes last because deciding whether it supports a TLD costs a round
//! trip per layer.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{CnsConfig, UnsConfig, ZnsConfig, DEFAULT_REQUEST_TIMEOUT};
use crate::crypto::Namehash;
use crate::domain::{
    is_valid_domain, multichain_address_key, normalize, EMAIL_KEY, IPFS_HASH_KEY,
    LEGACY_IPFS_HASH_KEY, LEGACY_REDIRECT_URL_KEY, REDIRECT_URL_KEY,
};
use crate::error::{ConfigurationError, ResolutionError, Result};
use crate::naming_service::{Cns, NamingService, Uns, Zns};
use crate::types::{Address, Location, NamehashFormat, NamingServiceName, RecordMap};

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Collects service configurations; [`ResolutionBuilder::build`] validates
/// all of them up front.
#[derive(Debug, Default)]
pub struct ResolutionBuilder {
    uns: Option<UnsConfig>,
    cns: Option<CnsConfig>,
    zns: Option<ZnsConfig>,
    custom: Vec<Arc<dyn NamingService>>,
}

impl ResolutionBuilder {
    pub fn uns(mut self, config: UnsConfig) -> Self {
        self.uns = Some(config);
        self
    }

    pub fn cns(mut self, config: CnsConfig) -> Self {
        self.cns = Some(config);
        self
    }

    pub fn zns(mut self, config: ZnsConfig) -> Self {
        self.zns = Some(config);
        self
    }

    /// Adds a host-provided backend, consulted after CNS and ZNS.
    pub fn service(mut self, service: Arc<dyn NamingService>) -> Self {
        self.custom.push(service);
        self
    }

    pub fn build(self) -> std::result::Result<Resolution, ConfigurationError> {
        let mut services: Vec<Arc<dyn NamingService>> = Vec::new();
        if let Some(config) = &self.cns {
            services.push(Arc::new(Cns::new(config)?));
        }
        if let Some(config) = &self.zns {
            services.push(Arc::new(Zns::new(config)?));
        }
        services.extend(self.custom);

        let uns = match &self.uns {
            Some(config) => Some(Arc::new(Uns::new(config)?)),
            None => None,
        };
        if let Some(uns) = &uns {
            services.push(Arc::clone(uns) as Arc<dyn NamingService>);
        }
        if services.is_empty() {
            return Err(ConfigurationError::NoServices);
        }

        let http = reqwest::Client::builder()
            .timeout(DEFAULT_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ConfigurationError::Transport(e.to_string()))?;
        Ok(Resolution { services, uns, http })
    }
}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

/// The JSON document behind a token URI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenMetadata {
    pub name: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub external_url: Option<String>,
    pub attributes: Vec<serde_json::Value>,
    /// Fields not modelled above.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Facade
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Resolution {
    services: Vec<Arc<dyn NamingService>>,
    uns: Option<Arc<Uns>>,
    http: reqwest::Client,
}

impl Resolution {
    pub fn builder() -> ResolutionBuilder {
        ResolutionBuilder::default()
    }

    /// UNS on Ethereum + Polygon mainnet and ZNS on Zilliqa mainnet.
    pub fn mainnet(
        ethereum_url: impl Into<String>,
        polygon_url: impl Into<String>,
        zilliqa_url: impl Into<String>,
    ) -> std::result::Result<Self, ConfigurationError> {
        Self::builder()
            .uns(UnsConfig::mainnet(ethereum_url, polygon_url))
            .zns(ZnsConfig::mainnet(zilliqa_url))
            .build()
    }

    /// The configured services in dispatch order.
    pub fn services(&self) -> impl Iterator<Item = NamingServiceName> + '_ {
        self.services.iter().map(|s| s.name())
    }

    async fn dispatch(&self, domain: &str) -> Result<(&dyn NamingService, String)> {
        let domain = normalize(domain);
        if is_valid_domain(&domain) {
            for service in &self.services {
                if service.is_supported_domain(&domain).await? {
                    debug!(domain = %domain, service = %service.name(), "dispatch");
                    return Ok((service.as_ref(), domain));
                }
            }
        }
        Err(ResolutionError::UnsupportedDomain { domain })
    }

    fn service(&self, name: NamingServiceName, method: &str) -> Result<&dyn NamingService> {
        self.services
            .iter()
            .find(|s| s.name() == name)
            .map(|s| s.as_ref())
            .ok_or_else(|| ResolutionError::unsupported_method(method, name))
    }

    // -- Records ------------------------------------------------------------

    /// The `crypto.<TICKER>.address` record.
    pub async fn resolve_address(&self, domain: &str, ticker: &str) -> Result<String> {
        check_ticker(ticker)?;
        let (service, domain) = self.dispatch(domain).await?;
        service.resolve_address(&domain, ticker).await
    }

    /// A token address on a specific chain, e.g. `USDT` on `ERC20`.
    pub async fn multichain_address(&self, domain: &str, ticker: &str, chain: &str) -> Result<String> {
        check_ticker(ticker)?;
        check_ticker(chain)?;
        self.record(domain, &multichain_address_key(ticker, chain)).await
    }

    pub async fn record(&self, domain: &str, key: &str) -> Result<String> {
        let (service, domain) = self.dispatch(domain).await?;
        service.record(&domain, key).await
    }

    pub async fn records(&self, domain: &str, keys: &[String]) -> Result<RecordMap> {
        let (service, domain) = self.dispatch(domain).await?;
        service.records(&domain, keys).await
    }

    pub async fn all_records(&self, domain: &str) -> Result<RecordMap> {
        let (service, domain) = self.dispatch(domain).await?;
        service.all_records(&domain).await
    }

    pub async fn email(&self, domain: &str) -> Result<String> {
        self.record(domain, EMAIL_KEY).await
    }

    pub async fn ipfs_hash(&self, domain: &str) -> Result<String> {
        self.record_with_fallback(domain, IPFS_HASH_KEY, LEGACY_IPFS_HASH_KEY).await
    }

    pub async fn http_url(&self, domain: &str) -> Result<String> {
        self.record_with_fallback(domain, REDIRECT_URL_KEY, LEGACY_REDIRECT_URL_KEY)
            .await
    }

    /// Reads both keys in one lookup and prefers `key`.
    async fn record_with_fallback(&self, domain: &str, key: &str, legacy: &str) -> Result<String> {
        let (service, domain) = self.dispatch(domain).await?;
        let mut records = service
            .records(&domain, &[key.to_string(), legacy.to_string()])
            .await?;
        records
            .remove(key)
            .or_else(|| records.remove(legacy))
            .ok_or_else(|| ResolutionError::RecordNotFound {
                domain,
                key: key.to_string(),
            })
    }

    // -- Ownership ----------------------------------------------------------

    pub async fn owner(&self, domain: &str) -> Result<Address> {
        let (service, domain) = self.dispatch(domain).await?;
        service.owner(&domain).await
    }

    pub async fn resolver(&self, domain: &str) -> Result<Address> {
        let (service, domain) = self.dispatch(domain).await?;
        service.resolver(&domain).await
    }

    pub async fn is_registered(&self, domain: &str) -> Result<bool> {
        let (service, domain) = self.dispatch(domain).await?;
        service.is_registered(&domain).await
    }

    /// Supported by some service and not yet registered.
    pub async fn is_available(&self, domain: &str) -> Result<bool> {
        match self.dispatch(domain).await {
            Ok((service, domain)) => Ok(!service.is_registered(&domain).await?),
            Err(ResolutionError::UnsupportedDomain { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn is_supported_domain(&self, domain: &str) -> Result<bool> {
        match self.dispatch(domain).await {
            Ok(_) => Ok(true),
            Err(ResolutionError::UnsupportedDomain { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Which service a domain routes to.
    pub async fn service_name(&self, domain: &str) -> Result<NamingServiceName> {
        Ok(self.dispatch(domain).await?.0.name())
    }

    /// Owners of many UNS domains in one round trip per layer. Unowned
    /// domains map to `None`.
    pub async fn batch_owners(&self, domains: &[String]) -> Result<BTreeMap<String, Option<Address>>> {
        let uns = self
            .uns
            .as_ref()
            .ok_or_else(|| ResolutionError::unsupported_method("batch_owners", NamingServiceName::Uns))?;
        let domains: Vec<String> = domains.iter().map(|d| normalize(d)).collect();
        let owners = uns.owners(&domains).await?;
        Ok(domains.into_iter().zip(owners).collect())
    }

    pub async fn registry_address(&self, domain: &str) -> Result<Address> {
        let (service, domain) = self.dispatch(domain).await?;
        service.registry_address(&domain).await
    }

    /// Locations for a mixed batch. Domains are grouped by service and each
    /// group is answered in one call; an unsupported domain fails the batch.
    pub async fn locations(&self, domains: &[String]) -> Result<BTreeMap<String, Option<Location>>> {
        let mut groups: Vec<(&dyn NamingService, Vec<String>)> = Vec::new();
        for domain in domains {
            let (service, domain) = self.dispatch(domain).await?;
            match groups.iter().position(|(s, _)| s.name() == service.name()) {
                Some(i) => groups[i].1.push(domain),
                None => groups.push((service, vec![domain])),
            }
        }
        let answers = join_all(groups.iter().map(|(service, group)| service.locations(group))).await;
        let mut merged = BTreeMap::new();
        for answer in answers {
            merged.extend(answer?);
        }
        Ok(merged)
    }

    // -- Hashing ------------------------------------------------------------

    pub async fn namehash(&self, domain: &str, format: NamehashFormat) -> Result<String> {
        let (service, domain) = self.dispatch(domain).await?;
        Ok(render(&service.namehash(&domain), format))
    }

    /// Extends a hex or decimal `parent` hash by one label using `service`'s
    /// hash family.
    pub fn childhash(
        &self,
        parent: &str,
        label: &str,
        service: NamingServiceName,
        format: NamehashFormat,
    ) -> Result<String> {
        let parent: Namehash = parent.parse()?;
        let service = self.service(service, "childhash")?;
        Ok(render(&service.childhash(&parent, &normalize(label)), format))
    }

    /// Recovers a domain from its hex or decimal namehash.
    pub async fn unhash(&self, hash: &str, service: NamingServiceName) -> Result<String> {
        let hash: Namehash = hash.parse()?;
        self.service(service, "unhash")?.unhash(&hash).await
    }

    /// The primary domain `address` has set on UNS.
    pub async fn reverse(&self, address: &str) -> Result<Option<String>> {
        let address: Address = address.parse().map_err(ResolutionError::Codec)?;
        self.service(NamingServiceName::Uns, "reverse")?
            .reverse(&address)
            .await
    }

    // -- Metadata -----------------------------------------------------------

    pub async fn token_uri(&self, domain: &str) -> Result<String> {
        let (service, domain) = self.dispatch(domain).await?;
        service.token_uri(&domain).await
    }

    /// Fetches and parses the JSON document behind [`Self::token_uri`].
    pub async fn token_uri_metadata(&self, domain: &str) -> Result<TokenMetadata> {
        let uri = self.token_uri(domain).await?;
        let failed = |reason: String| ResolutionError::MetadataEndpointError {
            uri: uri.clone(),
            reason,
        };
        debug!(uri = %uri, "fetching token metadata");
        let response = self
            .http
            .get(&uri)
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;
        if !response.status().is_success() {
            return Err(failed(format!("HTTP {}", response.status())));
        }
        response
            .json::<TokenMetadata>()
            .await
            .map_err(|e| failed(e.to_string()))
    }
}

/// Tickers and chain names become part of a record key, so only plain
/// alphanumerics are accepted.
fn check_ticker(ticker: &str) -> Result<()> {
    if ticker.is_empty() || !ticker.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err(ResolutionError::UnsupportedCurrency {
            ticker: ticker.to_string(),
        });
    }
    Ok(())
}

fn render(hash: &Namehash, format: NamehashFormat) -> String {
    match format {
        NamehashFormat::Hex => hash.to_hex(),
        NamehashFormat::Decimal => hash.to_decimal(),
    }
}
