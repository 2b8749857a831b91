// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Resolution: Blockchain Domain Names
//!
//! Turns names like `brad.crypto` or `brad.zil` into owners, resolvers and
//! records by reading whichever on-chain registry backs them. Callers never
//! need to know which chain that is.
//!
//! ## Architecture
//!
//! - **resolution**: The facade. Normalizes a domain and routes it to the
//!   first naming service that claims it.
//! - **naming_service**: UNS (Ethereum + Polygon, merged), CNS (legacy
//!   Ethereum, reader detected at runtime) and ZNS (Zilliqa).
//! - **contract**: `call`, `multicall` and `fetch_logs` over a descriptor.
//! - **abi**: Solidity ABI encoding and decoding for the read interfaces.
//! - **crypto**: keccak-256 / SHA-256 and the namehash folds built on them.
//! - **transport**: The one-method JSON-RPC `Provider` seam, over HTTP or
//!   scripted for tests.
//! - **config**: Built-in deployments and per-service configuration.
//!
//! ## Example
//!
//! ```no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use resolution::Resolution;
//!
//! let resolution = Resolution::mainnet(
//!     "https://mainnet.infura.io/v3/<key>",
//!     "https://polygon-mainnet.infura.io/v3/<key>",
//!     "https://api.zilliqa.com",
//! )?;
//! let eth = resolution.resolve_address("brad.crypto", "ETH").await?;
//! println!("{eth}");
//! # Ok(())
//! # }
//! ```
//!
//! Nothing is cached across calls except CNS's reader-strategy decision.
//! There are no write operations.

pub mod abi;
pub mod config;
pub mod contract;
pub mod crypto;
pub mod domain;
pub mod error;
pub mod naming_service;
pub mod resolution;
pub mod transport;
pub mod types;

pub use config::{CnsConfig, ProviderSource, UnsConfig, UnsLayerConfig, ZnsConfig};
pub use contract::{ContractClient, EventLog};
pub use crypto::{Namehash, NamehashFamily};
pub use error::{CodecError, ConfigurationError, ResolutionError, Result};
pub use naming_service::{Cns, NamingService, Uns, Zns};
pub use resolution::{Resolution, ResolutionBuilder, TokenMetadata};
pub use transport::{BlockTag, HttpProvider, MockProvider, Provider};
pub use types::{Address, Layer, Location, NamehashFormat, NamingServiceName, RecordMap, ResolutionRecord};
