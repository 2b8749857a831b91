//! Error types for the resolution engine.
//!
//! Two disjoint taxonomies live here:
//!
//! - [`ConfigurationError`]: detected while building a naming service. A
//!   misconfigured service never gets constructed, so nothing is deferred to
//!   the first lookup.
//! - [`ResolutionError`]: detected per call. Domain-semantic failures
//!   (unregistered, no resolver, missing record) are derived locally from
//!   decoded zero values; transport and codec failures are surfaced verbatim.
//!
//! [`CodecError`] is the ABI layer's own error and converts into both.

use thiserror::Error;

use crate::types::{Address, NamingServiceName};

/// Convenience alias used by every fallible lookup in the crate.
pub type Result<T> = std::result::Result<T, ResolutionError>;

// ---------------------------------------------------------------------------
// Codec
// ---------------------------------------------------------------------------

/// Failures while parsing ABI fragments, encoding arguments, or decoding a
/// contract reply against its declared shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// A human-readable ABI fragment or type string could not be parsed.
    #[error("invalid abi fragment `{fragment}`: {reason}")]
    InvalidFragment { fragment: String, reason: String },

    /// The descriptor has no function with this name.
    #[error("unknown function: {0}")]
    UnknownFunction(String),

    /// The descriptor has no event with this name.
    #[error("unknown event: {0}")]
    UnknownEvent(String),

    /// An argument does not fit the declared parameter type.
    #[error("argument mismatch for {method}: {reason}")]
    ArgumentMismatch { method: String, reason: String },

    /// The reply bytes do not match the declared output types.
    #[error("decode failed for {context}: {reason}")]
    Decode { context: String, reason: String },

    /// A hex string could not be decoded.
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    /// An address string is not `0x` followed by 40 hex digits.
    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

impl CodecError {
    pub(crate) fn decode(context: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Decode {
            context: context.into(),
            reason: reason.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Errors raised while constructing a naming service or the resolution facade.
#[derive(Debug, Clone, Error)]
pub enum ConfigurationError {
    /// No network name was supplied.
    #[error("{service}: network is not specified")]
    MissingNetwork { service: NamingServiceName },

    /// Neither a URL nor a provider was supplied for a layer.
    #[error("{service}: no url or provider configured for network `{network}`")]
    MissingProvider {
        service: NamingServiceName,
        network: String,
    },

    /// The network has no built-in contract table and no override was given.
    #[error("{service}: unsupported network `{network}` (a contract address override is required)")]
    UnsupportedNetwork {
        service: NamingServiceName,
        network: String,
    },

    /// A contract address override is malformed.
    #[error("{service}: invalid contract address `{address}`")]
    InvalidContractAddress {
        service: NamingServiceName,
        address: String,
    },

    /// A provider URL could not be parsed.
    #[error("invalid provider url `{0}`")]
    InvalidUrl(String),

    /// The HTTP transport could not be initialized.
    #[error("transport initialization failed: {0}")]
    Transport(String),

    /// A built-in contract descriptor failed to parse.
    #[error("contract descriptor error: {0}")]
    Descriptor(#[from] CodecError),

    /// The facade was built with no naming services at all.
    #[error("no naming services configured")]
    NoServices,
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Every public lookup either returns a value or exactly one of these.
#[derive(Debug, Clone, Error)]
pub enum ResolutionError {
    /// No configured backend accepts the domain, or it fails a syntax check.
    #[error("domain {domain} is not supported")]
    UnsupportedDomain { domain: String },

    /// The domain has no owner.
    #[error("domain {domain} is not registered")]
    UnregisteredDomain { domain: String },

    /// The domain is owned but has no resolver configured.
    #[error("domain {domain} is not configured: resolver is not set")]
    UnspecifiedResolver { domain: String },

    /// The resolver holds no value for the key.
    #[error("no {key} record found for {domain}")]
    RecordNotFound { domain: String, key: String },

    /// The ticker cannot be resolved by this backend.
    #[error("{ticker} is not supported")]
    UnsupportedCurrency { ticker: String },

    /// The operation is not meaningful for this backend.
    #[error("method {method} is not supported by {service}")]
    UnsupportedMethod {
        method: String,
        service: NamingServiceName,
    },

    /// A legacy resolver was asked for something it cannot answer.
    #[error("resolver {resolver} of {domain} does not support {method}")]
    IncorrectResolverInterface {
        domain: String,
        resolver: Address,
        method: String,
    },

    /// The transport could not reach the backend at all.
    #[error("{service} is down: {reason}")]
    NamingServiceDown { service: String, reason: String },

    /// The backend answered with a JSON-RPC error, a malformed envelope, or a
    /// rate-limit response.
    #[error("provider error from {provider}: {message}")]
    ServiceProviderError {
        provider: String,
        code: Option<i64>,
        message: String,
    },

    /// Off-chain metadata behind a token URI could not be fetched.
    #[error("metadata endpoint {uri} failed: {reason}")]
    MetadataEndpointError { uri: String, reason: String },

    /// A namehash string is not a 32-byte hex or decimal value.
    #[error("invalid namehash: {0}")]
    InvalidNamehash(String),

    /// The reply did not match the contract's declared shape.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl ResolutionError {
    /// Whether this error is the remote contract reverting, as opposed to the
    /// transport failing. JSON-RPC nodes report reverts either with code `3`
    /// or with an "execution reverted" message under a generic server code.
    pub fn is_revert(&self) -> bool {
        match self {
            Self::ServiceProviderError { code, message, .. } => {
                *code == Some(3) || message.to_ascii_lowercase().contains("revert")
            }
            _ => false,
        }
    }

    pub(crate) fn unsupported_method(method: &str, service: NamingServiceName) -> Self {
        Self::UnsupportedMethod {
            method: method.to_string(),
            service,
        }
    }
}
