//! # Hashing for Naming Registries
//!
//! Every identifier a registry indexes by comes out of this module:
//!
//! - **keccak-256** for the Ethereum registries (namehash, function
//!   selectors, event topics, EIP-55 checksums).
//! - **SHA-256** for the Zilliqa registry's namehash.
//!
//! Both are thin wrappers around the RustCrypto implementations. The
//! namehash fold itself is generic over the two and lives in [`namehash`].

pub mod hash;
pub mod namehash;

pub use hash::{keccak256, sha256};
pub use namehash::{eth_namehash, zns_namehash, Namehash, NamehashFamily};
