//! # CLI Interface
//!
//! Argument structure for the `resolution` binary, via `clap` derive. One
//! subcommand per public lookup; endpoints come from flags or the
//! environment.

use clap::{Args, Parser, Subcommand, ValueEnum};

use resolution::{NamehashFormat, NamingServiceName};

use crate::logging::LogFormat;

/// Resolve blockchain domain names from the command line.
///
/// Prints every answer as JSON on stdout. Logs go to stderr.
#[derive(Parser, Debug)]
#[command(
    name = "resolution",
    about = "Blockchain domain name resolution (UNS, CNS, ZNS)",
    version,
    propagate_version = true
)]
pub struct ResolutionCli {
    #[command(flatten)]
    pub endpoints: Endpoints,

    /// Default log level when `RUST_LOG` is not set.
    #[arg(long, global = true, env = "RESOLUTION_LOG", default_value = "warn")]
    pub log_level: String,

    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// JSON-RPC endpoints. A registry is only configured when its endpoint is.
#[derive(Args, Debug)]
pub struct Endpoints {
    /// Ethereum mainnet RPC (UNS layer 1, and CNS with `--cns`).
    #[arg(long, global = true, env = "RESOLUTION_ETHEREUM_URL")]
    pub ethereum_url: Option<String>,

    /// Polygon mainnet RPC (UNS layer 2).
    #[arg(long, global = true, env = "RESOLUTION_POLYGON_URL")]
    pub polygon_url: Option<String>,

    /// Zilliqa mainnet API.
    #[arg(long, global = true, env = "RESOLUTION_ZILLIQA_URL")]
    pub zilliqa_url: Option<String>,

    /// Also read the legacy CNS registry on Ethereum.
    #[arg(long, global = true)]
    pub cns: bool,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Currency address, e.g. `address brad.crypto ETH`.
    Address { domain: String, ticker: String },
    /// Token address on a given chain, e.g. `multichain brad.crypto USDT ERC20`.
    Multichain {
        domain: String,
        ticker: String,
        chain: String,
    },
    /// A single record by key.
    Record { domain: String, key: String },
    /// Several records by key.
    Records {
        domain: String,
        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// Every record the resolver holds.
    AllRecords { domain: String },
    Email { domain: String },
    IpfsHash { domain: String },
    HttpUrl { domain: String },
    Owner { domain: String },
    Resolver { domain: String },
    /// Owners of many UNS domains in one round trip per layer.
    Owners {
        #[arg(required = true)]
        domains: Vec<String>,
    },
    IsRegistered { domain: String },
    IsAvailable { domain: String },
    /// Which naming service a domain routes to.
    Service { domain: String },
    RegistryAddress { domain: String },
    Locations {
        #[arg(required = true)]
        domains: Vec<String>,
    },
    Namehash {
        domain: String,
        #[command(flatten)]
        format: FormatArg,
    },
    /// Extend a parent hash by one label.
    Childhash {
        parent: String,
        label: String,
        #[arg(long, value_enum, default_value_t = ServiceArg::Uns)]
        service: ServiceArg,
        #[command(flatten)]
        format: FormatArg,
    },
    /// Recover a domain from its namehash (UNS only).
    Unhash {
        hash: String,
        #[arg(long, value_enum, default_value_t = ServiceArg::Uns)]
        service: ServiceArg,
    },
    /// Primary domain of an address (UNS only).
    Reverse { address: String },
    TokenUri { domain: String },
    /// Fetch the metadata document behind the token URI.
    Metadata { domain: String },
}

#[derive(Args, Debug, Clone, Copy)]
pub struct FormatArg {
    /// Print the hash as a decimal token id instead of hex.
    #[arg(long)]
    pub decimal: bool,
}

impl From<FormatArg> for NamehashFormat {
    fn from(arg: FormatArg) -> Self {
        if arg.decimal {
            NamehashFormat::Decimal
        } else {
            NamehashFormat::Hex
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ServiceArg {
    Uns,
    Cns,
    Zns,
}

impl From<ServiceArg> for NamingServiceName {
    fn from(arg: ServiceArg) -> Self {
        match arg {
            ServiceArg::Uns => NamingServiceName::Uns,
            ServiceArg::Cns => NamingServiceName::Cns,
            ServiceArg::Zns => NamingServiceName::Zns,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_verify_cli_structure() {
        ResolutionCli::command().debug_assert();
    }

    #[test]
    fn test_parses_address_lookup() {
        let cli = ResolutionCli::parse_from([
            "resolution",
            "--ethereum-url",
            "https://eth.example",
            "address",
            "brad.crypto",
            "ETH",
        ]);
        assert_eq!(cli.endpoints.ethereum_url.as_deref(), Some("https://eth.example"));
        assert!(matches!(cli.command, Commands::Address { ref ticker, .. } if ticker == "ETH"));
    }

    #[test]
    fn test_childhash_defaults_to_uns_hex() {
        let cli = ResolutionCli::parse_from(["resolution", "childhash", "0x00", "crypto"]);
        match cli.command {
            Commands::Childhash { service, format, .. } => {
                assert_eq!(service, ServiceArg::Uns);
                assert_eq!(NamehashFormat::from(format), NamehashFormat::Hex);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
