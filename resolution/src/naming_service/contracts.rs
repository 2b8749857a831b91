//! Read interfaces of the registry contracts, as human-readable fragments.
//!
//! Only the view functions and events the engine actually uses are listed.

use std::sync::Arc;

use crate::abi::ContractDescriptor;
use crate::error::ConfigurationError;

/// Consolidated reader in front of the UNS registries (and newer CNS
/// deployments).
pub const PROXY_READER: &[&str] = &[
    "function getData(string[] keys, uint256 tokenId) view returns (address resolver, address owner, string[] values)",
    "function getDataForMany(string[] keys, uint256[] tokenIds) view returns (address[] resolvers, address[] owners, string[][] values)",
    "function ownerOfForMany(uint256[] tokenIds) view returns (address[] owners)",
    "function registryOf(uint256 tokenId) view returns (address)",
    "function exists(uint256 tokenId) view returns (bool)",
    "function tokenURI(uint256 tokenId) view returns (string)",
    "function reverseOf(address addr) view returns (uint256)",
    "function supportsInterface(bytes4 interfaceId) view returns (bool)",
    "function multicall(bytes[] data) returns (bytes[] results)",
];

/// ERC-721 registry. UNS registries also act as their own resolver.
pub const REGISTRY: &[&str] = &[
    "function ownerOf(uint256 tokenId) view returns (address)",
    "function resolverOf(uint256 tokenId) view returns (address)",
    "function tokenURI(uint256 tokenId) view returns (string)",
    "event NewURI(uint256 indexed tokenId, string uri)",
];

/// Record storage. Legacy CNS resolvers implement `getMany` only.
pub const RESOLVER: &[&str] = &[
    "function getMany(string[] keys, uint256 tokenId) view returns (string[])",
    "function getManyByHash(uint256[] keyHashes, uint256 tokenId) view returns (string[] keys, string[] values)",
    "event NewKey(uint256 indexed tokenId, string indexed keyIndex, string key)",
    "event ResetRecords(uint256 indexed tokenId)",
];

/// The parsed descriptors, shared by every client of a service.
#[derive(Debug, Clone)]
pub struct Descriptors {
    pub proxy_reader: Arc<ContractDescriptor>,
    pub registry: Arc<ContractDescriptor>,
    pub resolver: Arc<ContractDescriptor>,
}

impl Descriptors {
    pub fn load() -> Result<Self, ConfigurationError> {
        Ok(Self {
            proxy_reader: Arc::new(ContractDescriptor::parse(PROXY_READER)?),
            registry: Arc::new(ContractDescriptor::parse(REGISTRY)?),
            resolver: Arc::new(ContractDescriptor::parse(RESOLVER)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragments_parse() {
        let d = Descriptors::load().unwrap();
        assert!(d.proxy_reader.has_function("multicall"));
        assert!(!d.registry.has_function("multicall"));
        assert!(!d.proxy_reader.has_function("getMany"));
        assert!(d.resolver.event("NewKey").is_ok());
    }

    #[test]
    fn test_well_known_selectors() {
        let d = Descriptors::load().unwrap();
        let selector = |desc: &ContractDescriptor, name: &str| {
            hex::encode(desc.function(name).unwrap().selector())
        };
        assert_eq!(selector(&d.registry, "ownerOf"), "6352211e");
        assert_eq!(selector(&d.registry, "tokenURI"), "c87b56dd");
        assert_eq!(selector(&d.proxy_reader, "supportsInterface"), "01ffc9a7");
        assert_eq!(selector(&d.proxy_reader, "multicall"), "ac9650d8");
    }
}
