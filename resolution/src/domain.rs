//! Domain string handling: normalization, syntax checks, and the well-known
//! record keys that the public API maps onto.

/// Trim surrounding whitespace and lowercase. Every entry point runs domains
/// through this before hashing.
pub fn normalize(domain: &str) -> String {
    domain.trim().to_ascii_lowercase()
}

/// Base syntax shared by all registries: non-empty, `[a-z0-9.-]` only, and no
/// empty labels.
pub fn is_valid_domain(domain: &str) -> bool {
    !domain.is_empty()
        && domain
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'.' || b == b'-')
        && domain.split('.').all(|label| !label.is_empty())
}

/// Stricter syntax used by the Ethereum registries, which refuse labels that
/// start or end with a hyphen.
pub fn is_valid_hyphenated_domain(domain: &str) -> bool {
    is_valid_domain(domain)
        && domain
            .split('.')
            .all(|label| !label.starts_with('-') && !label.ends_with('-'))
}

/// The last label, or the whole string when there is no dot.
pub fn tld(domain: &str) -> &str {
    domain.rsplit('.').next().unwrap_or(domain)
}

// ---------------------------------------------------------------------------
// Record keys
// ---------------------------------------------------------------------------

/// `crypto.<TICKER>.address`
pub fn address_key(ticker: &str) -> String {
    format!("crypto.{}.address", ticker.to_ascii_uppercase())
}

/// `crypto.<TICKER>.version.<CHAIN>.address`
pub fn multichain_address_key(ticker: &str, chain: &str) -> String {
    format!(
        "crypto.{}.version.{}.address",
        ticker.to_ascii_uppercase(),
        chain.to_ascii_uppercase()
    )
}

pub const EMAIL_KEY: &str = "whois.email.value";
pub const IPFS_HASH_KEY: &str = "dweb.ipfs.hash";
pub const LEGACY_IPFS_HASH_KEY: &str = "ipfs.html.value";
pub const REDIRECT_URL_KEY: &str = "browser.redirect_url";
pub const LEGACY_REDIRECT_URL_KEY: &str = "ipfs.redirect_domain.value";

/// Keys queried when a resolver cannot enumerate its own records.
pub const STANDARD_KEYS: &[&str] = &[
    "crypto.BTC.address",
    "crypto.ETH.address",
    "crypto.XRP.address",
    "crypto.ZIL.address",
    "crypto.LTC.address",
    "crypto.ETC.address",
    "crypto.EQL.address",
    "crypto.LINK.address",
    "crypto.USDC.address",
    "crypto.BAT.address",
    "crypto.REP.address",
    "crypto.ZRX.address",
    "crypto.DAI.address",
    "crypto.BCH.address",
    "crypto.XMR.address",
    "crypto.DASH.address",
    "crypto.NEO.address",
    "crypto.DOGE.address",
    "crypto.ZEC.address",
    "crypto.ADA.address",
    "crypto.EOS.address",
    "crypto.XLM.address",
    "crypto.BNB.address",
    "crypto.BTG.address",
    "crypto.NANO.address",
    "crypto.WAVES.address",
    "crypto.KMD.address",
    "crypto.AE.address",
    "crypto.RSK.address",
    "crypto.QTUM.address",
    "crypto.VET.address",
    "crypto.KIN.address",
    "crypto.ATOM.address",
    "crypto.MATIC.address",
    "crypto.TRX.address",
    "crypto.SOL.address",
    "whois.email.value",
    "whois.for_sale.value",
    "dweb.ipfs.hash",
    "ipfs.html.value",
    "browser.redirect_url",
    "ipfs.redirect_domain.value",
    "gundb.username.value",
    "gundb.public_key.value",
];

/// [`STANDARD_KEYS`] as owned strings, ready to pass to a lookup.
pub fn standard_keys() -> Vec<String> {
    STANDARD_KEYS.iter().map(|k| k.to_string()).collect()
}
