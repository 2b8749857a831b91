// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Resolution CLI
//!
//! Entry point for the `resolution` binary. Parses CLI arguments, initializes
//! logging, builds a [`Resolution`] from whichever endpoints were supplied,
//! runs one lookup and prints the answer as JSON.
//!
//! ```text
//! resolution --ethereum-url $ETH --polygon-url $POLYGON address brad.crypto ETH
//! ```

mod cli;
mod logging;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;

use resolution::{CnsConfig, ProviderSource, Resolution, UnsConfig, ZnsConfig};

use cli::{Commands, Endpoints, ResolutionCli};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = ResolutionCli::parse();
    logging::init_logging(&cli.log_level, cli.log_format);

    let resolution = build_resolution(&cli.endpoints)?;
    run(&resolution, cli.command).await
}

/// Configures each registry whose endpoint is present.
fn build_resolution(endpoints: &Endpoints) -> Result<Resolution> {
    let mut builder = Resolution::builder();
    match (&endpoints.ethereum_url, &endpoints.polygon_url) {
        (Some(ethereum), Some(polygon)) => {
            builder = builder.uns(UnsConfig::mainnet(ethereum.clone(), polygon.clone()));
        }
        (Some(_), None) | (None, Some(_)) => {
            tracing::warn!("UNS needs both --ethereum-url and --polygon-url; skipping it");
        }
        (None, None) => {}
    }
    if endpoints.cns {
        let ethereum = endpoints
            .ethereum_url
            .clone()
            .context("--cns requires --ethereum-url")?;
        builder = builder.cns(CnsConfig::new("mainnet", ProviderSource::Url(ethereum)));
    }
    if let Some(zilliqa) = &endpoints.zilliqa_url {
        builder = builder.zns(ZnsConfig::mainnet(zilliqa.clone()));
    }

    let resolution = builder
        .build()
        .context("failed to configure naming services (is any endpoint set?)")?;
    tracing::info!(services = ?resolution.services().collect::<Vec<_>>(), "resolution ready");
    Ok(resolution)
}

async fn run(r: &Resolution, command: Commands) -> Result<()> {
    match command {
        Commands::Address { domain, ticker } => print(r.resolve_address(&domain, &ticker).await?),
        Commands::Multichain {
            domain,
            ticker,
            chain,
        } => print(r.multichain_address(&domain, &ticker, &chain).await?),
        Commands::Record { domain, key } => print(r.record(&domain, &key).await?),
        Commands::Records { domain, keys } => print(r.records(&domain, &keys).await?),
        Commands::AllRecords { domain } => print(r.all_records(&domain).await?),
        Commands::Email { domain } => print(r.email(&domain).await?),
        Commands::IpfsHash { domain } => print(r.ipfs_hash(&domain).await?),
        Commands::HttpUrl { domain } => print(r.http_url(&domain).await?),
        Commands::Owner { domain } => print(r.owner(&domain).await?),
        Commands::Resolver { domain } => print(r.resolver(&domain).await?),
        Commands::Owners { domains } => print(r.batch_owners(&domains).await?),
        Commands::IsRegistered { domain } => print(r.is_registered(&domain).await?),
        Commands::IsAvailable { domain } => print(r.is_available(&domain).await?),
        Commands::Service { domain } => print(r.service_name(&domain).await?),
        Commands::RegistryAddress { domain } => print(r.registry_address(&domain).await?),
        Commands::Locations { domains } => print(r.locations(&domains).await?),
        Commands::Namehash { domain, format } => print(r.namehash(&domain, format.into()).await?),
        Commands::Childhash {
            parent,
            label,
            service,
            format,
        } => print(r.childhash(&parent, &label, service.into(), format.into())?),
        Commands::Unhash { hash, service } => print(r.unhash(&hash, service.into()).await?),
        Commands::Reverse { address } => print(r.reverse(&address).await?),
        Commands::TokenUri { domain } => print(r.token_uri(&domain).await?),
        Commands::Metadata { domain } => print(r.token_uri_metadata(&domain).await?),
    }
}

fn print<T: Serialize>(value: T) -> Result<()> {
    let json = serde_json::to_string_pretty(&value).context("failed to serialize answer")?;
    println!("{}", json);
    Ok(())
}
