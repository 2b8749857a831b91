//! # Networks & Service Configuration
//!
//! Every contract address, chain id and allow-list the engine ships with
//! lives here, in immutable tables. Naming services receive their
//! configuration explicitly at construction; nothing is looked up from
//! global mutable state at call time.
//!
//! The built-in addresses cover the public deployments. Anything else (a
//! testnet, a local fork, a private deployment) needs explicit contract
//! overrides, and forgetting them is a [`ConfigurationError`] at build time.

use std::sync::Arc;
use std::time::Duration;

use crate::error::ConfigurationError;
use crate::transport::{HttpProvider, Provider};
use crate::types::{Address, NamingServiceName};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Per-request timeout for [`HttpProvider`].
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// ERC-165 interface id of the consolidated data reader
/// (`getData`, `getDataForMany`, `ownerOfForMany`).
pub const DATA_READER_INTERFACE_ID: [u8; 4] = [0x6e, 0xab, 0xca, 0x0d];

/// TLDs served by the legacy registry unless configured otherwise.
pub const DEFAULT_CNS_TLDS: &[&str] = &["crypto"];

/// Zilliqa registry TLD.
pub const ZNS_TLD: &str = "zil";

pub const MAINNET_CHAIN_ID: u64 = 1;
pub const POLYGON_CHAIN_ID: u64 = 137;
pub const ZILLIQA_MAINNET_CHAIN_ID: u64 = 1;
pub const ZILLIQA_TESTNET_CHAIN_ID: u64 = 333;

// ---------------------------------------------------------------------------
// Ethereum-style network table
// ---------------------------------------------------------------------------

/// Built-in deployment data for one EVM network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    pub name: &'static str,
    pub chain_id: u64,
    /// Blockchain ticker reported in locations (`ETH`, `MATIC`).
    pub blockchain: &'static str,
    /// Current UNS ProxyReader.
    pub uns_proxy_reader: &'static str,
    /// UNS registry (emits `NewURI`).
    pub uns_registry: &'static str,
    pub uns_start_block: u64,
    /// Legacy CNS registry, when the network has one.
    pub cns_registry: Option<&'static str>,
    pub cns_start_block: u64,
    /// Addresses known to implement the data reader interface. A CNS
    /// contract on this list skips the capability probe.
    pub proxy_readers: &'static [&'static str],
    /// Resolvers predating `getMany`-by-hash and multi-currency lookups.
    pub legacy_resolvers: &'static [&'static str],
}

pub const NETWORKS: &[NetworkConfig] = &[
    NetworkConfig {
        name: "mainnet",
        chain_id: MAINNET_CHAIN_ID,
        blockchain: "ETH",
        uns_proxy_reader: "0x578853aa776Eef10CeE6c4dd2B5862bdcE767A8B",
        uns_registry: "0x049aba7510f45BA5b64ea9E658E342F904DB358D",
        uns_start_block: 12_779_230,
        cns_registry: Some("0xD1E5b0FF1287aA9f9A268759062E4Ab08b9Dacbe"),
        cns_start_block: 9_082_251,
        proxy_readers: &[
            "0x578853aa776Eef10CeE6c4dd2B5862bdcE767A8B",
            "0x58034A288D2E56B661c9056A0C27273E5460B63c",
            "0x7ea9Ee21077F84339eDa9C80048ec6db678642B1",
        ],
        legacy_resolvers: &[
            "0xa1cac442be6673c49f8e74ffc7c4fd746f3cbd0d",
            "0x878bc2f3f717766ab69c0a5f9a6144931e61aed3",
        ],
    },
    NetworkConfig {
        name: "polygon-mainnet",
        chain_id: POLYGON_CHAIN_ID,
        blockchain: "MATIC",
        uns_proxy_reader: "0x91EDd8708062bd4233f4Dd0FCE15A7cb4d500091",
        uns_registry: "0xa9a6A3626993D487d2Dbda3173cf58cA1a9D9e9f",
        uns_start_block: 19_345_077,
        cns_registry: None,
        cns_start_block: 0,
        proxy_readers: &[
            "0x91EDd8708062bd4233f4Dd0FCE15A7cb4d500091",
            "0x423F2531bd5d3C3D4EF7C318c2D1d9BEDE67c680",
        ],
        legacy_resolvers: &[],
    },
];

/// Looks up a built-in EVM network by name.
pub fn network(name: &str) -> Option<&'static NetworkConfig> {
    NETWORKS.iter().find(|n| n.name == name)
}

impl NetworkConfig {
    pub fn is_proxy_reader(&self, address: &Address) -> bool {
        contains_address(self.proxy_readers, address)
    }

    pub fn is_legacy_resolver(&self, address: &Address) -> bool {
        contains_address(self.legacy_resolvers, address)
    }
}

fn contains_address(list: &[&str], address: &Address) -> bool {
    list.iter()
        .filter_map(|s| s.parse::<Address>().ok())
        .any(|a| a == *address)
}

// ---------------------------------------------------------------------------
// Zilliqa network table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZilliqaNetworkConfig {
    pub name: &'static str,
    pub chain_id: u64,
    pub registry: &'static str,
}

pub const ZILLIQA_NETWORKS: &[ZilliqaNetworkConfig] = &[
    ZilliqaNetworkConfig {
        name: "mainnet",
        chain_id: ZILLIQA_MAINNET_CHAIN_ID,
        registry: "0x9611c53be6d1b32058b2747bdececed7e1216793",
    },
    ZilliqaNetworkConfig {
        name: "testnet",
        chain_id: ZILLIQA_TESTNET_CHAIN_ID,
        registry: "0xb925add1d5eaf13f40efd43451bf97a22ab3d727",
    },
];

pub fn zilliqa_network(name: &str) -> Option<&'static ZilliqaNetworkConfig> {
    ZILLIQA_NETWORKS.iter().find(|n| n.name == name)
}

// ---------------------------------------------------------------------------
// Provider source
// ---------------------------------------------------------------------------

/// How a service reaches its chain: a URL the crate will talk JSON-RPC to,
/// or a provider the host application already has.
#[derive(Debug, Clone)]
pub enum ProviderSource {
    Url(String),
    Provider(Arc<dyn Provider>),
}

impl ProviderSource {
    pub(crate) fn connect(&self, label: &str) -> Result<Arc<dyn Provider>, ConfigurationError> {
        match self {
            Self::Url(url) => Ok(Arc::new(HttpProvider::new(url, label)?)),
            Self::Provider(provider) => Ok(Arc::clone(provider)),
        }
    }

    /// The URL to report in locations.
    pub(crate) fn url(&self) -> Option<String> {
        match self {
            Self::Url(url) => Some(url.clone()),
            Self::Provider(provider) => provider.url().map(str::to_string),
        }
    }
}

impl From<Arc<dyn Provider>> for ProviderSource {
    fn from(provider: Arc<dyn Provider>) -> Self {
        Self::Provider(provider)
    }
}

/// Checks the fields every service needs and returns the provider source.
pub(crate) fn require_source<'a>(
    service: NamingServiceName,
    network: &str,
    source: Option<&'a ProviderSource>,
) -> Result<&'a ProviderSource, ConfigurationError> {
    if network.trim().is_empty() {
        return Err(ConfigurationError::MissingNetwork { service });
    }
    source.ok_or_else(|| ConfigurationError::MissingProvider {
        service,
        network: network.to_string(),
    })
}

/// Parses an override if present, otherwise falls back to the built-in
/// default. Neither means the network is unsupported.
pub(crate) fn contract_address(
    service: NamingServiceName,
    network: &str,
    override_address: Option<&str>,
    default: Option<&str>,
) -> Result<Address, ConfigurationError> {
    let raw = override_address
        .or(default)
        .ok_or_else(|| ConfigurationError::UnsupportedNetwork {
            service,
            network: network.to_string(),
        })?;
    raw.parse()
        .map_err(|_| ConfigurationError::InvalidContractAddress {
            service,
            address: raw.to_string(),
        })
}

// ---------------------------------------------------------------------------
// Per-service configuration
// ---------------------------------------------------------------------------

/// One UNS layer.
#[derive(Debug, Clone, Default)]
pub struct UnsLayerConfig {
    pub network: String,
    pub source: Option<ProviderSource>,
    /// Required on networks outside [`NETWORKS`].
    pub proxy_reader_address: Option<String>,
    /// Registry emitting `NewURI`; only used by reverse lookups.
    pub registry_address: Option<String>,
    pub start_block: Option<u64>,
    /// Required on networks outside [`NETWORKS`] for locations; otherwise
    /// asked of the node via `net_version`.
    pub chain_id: Option<u64>,
}

impl UnsLayerConfig {
    pub fn new(network: impl Into<String>, source: ProviderSource) -> Self {
        Self {
            network: network.into(),
            source: Some(source),
            ..Self::default()
        }
    }

    pub fn with_url(network: impl Into<String>, url: impl Into<String>) -> Self {
        Self::new(network, ProviderSource::Url(url.into()))
    }

    pub fn with_provider(network: impl Into<String>, provider: Arc<dyn Provider>) -> Self {
        Self::new(network, ProviderSource::Provider(provider))
    }

    pub fn proxy_reader(mut self, address: impl Into<String>) -> Self {
        self.proxy_reader_address = Some(address.into());
        self
    }

    pub fn registry(mut self, address: impl Into<String>) -> Self {
        self.registry_address = Some(address.into());
        self
    }
}

/// The current two-layer registry.
#[derive(Debug, Clone, Default)]
pub struct UnsConfig {
    pub layer1: UnsLayerConfig,
    pub layer2: UnsLayerConfig,
}

impl UnsConfig {
    /// Ethereum mainnet + Polygon mainnet.
    pub fn mainnet(layer1_url: impl Into<String>, layer2_url: impl Into<String>) -> Self {
        Self {
            layer1: UnsLayerConfig::with_url("mainnet", layer1_url),
            layer2: UnsLayerConfig::with_url("polygon-mainnet", layer2_url),
        }
    }
}

/// The legacy Ethereum registry.
#[derive(Debug, Clone)]
pub struct CnsConfig {
    pub network: String,
    pub source: Option<ProviderSource>,
    /// Registry or ProxyReader address; required outside [`NETWORKS`].
    pub registry_address: Option<String>,
    /// First block to replay resolver events from.
    pub event_start_block: Option<u64>,
    pub tlds: Vec<String>,
}

impl Default for CnsConfig {
    fn default() -> Self {
        Self {
            network: String::new(),
            source: None,
            registry_address: None,
            event_start_block: None,
            tlds: DEFAULT_CNS_TLDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl CnsConfig {
    pub fn new(network: impl Into<String>, source: ProviderSource) -> Self {
        Self {
            network: network.into(),
            source: Some(source),
            ..Self::default()
        }
    }

    pub fn registry(mut self, address: impl Into<String>) -> Self {
        self.registry_address = Some(address.into());
        self
    }
}

/// The Zilliqa registry.
#[derive(Debug, Clone, Default)]
pub struct ZnsConfig {
    pub network: String,
    pub source: Option<ProviderSource>,
    pub registry_address: Option<String>,
}

impl ZnsConfig {
    pub fn new(network: impl Into<String>, source: ProviderSource) -> Self {
        Self {
            network: network.into(),
            source: Some(source),
            registry_address: None,
        }
    }

    pub fn mainnet(url: impl Into<String>) -> Self {
        Self::new("mainnet", ProviderSource::Url(url.into()))
    }
}
