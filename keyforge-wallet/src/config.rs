//! Runtime configuration read from the environment

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::provider::{ProviderConfig, DEFAULT_TIMEOUT_SECS};

pub const SOLANA_RPC_URL: &str = "SOLANA_RPC_URL";
pub const ETHEREUM_RPC_URL: &str = "ETHEREUM_RPC_URL";
pub const RPC_TIMEOUT_SECS: &str = "KEYFORGE_RPC_TIMEOUT_SECS";
pub const CONFIRM_TIMEOUT_SECS: &str = "KEYFORGE_CONFIRM_TIMEOUT_SECS";
pub const AIRDROP_SETTLE_MS: &str = "KEYFORGE_AIRDROP_SETTLE_MS";
pub const FEE_BUFFER_LAMPORTS: &str = "KEYFORGE_FEE_BUFFER_LAMPORTS";
pub const STATE_DIR: &str = "KEYFORGE_STATE_DIR";

/// 0.001 SOL
pub const DEFAULT_FEE_BUFFER_LAMPORTS: u64 = 1_000_000;
pub const DEFAULT_CONFIRM_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_AIRDROP_SETTLE_MS: u64 = 2_000;
pub const DEFAULT_STATE_DIR: &str = "./.keyforge";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub solana_rpc_url: String,
    pub ethereum_rpc_url: String,
    pub rpc_timeout_secs: u64,
    pub confirm_timeout_secs: u64,
    pub airdrop_settle_ms: u64,
    pub fee_buffer_lamports: u64,
    pub state_dir: PathBuf,
}

impl Config {
    /// Load from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load through an arbitrary key lookup; both RPC URLs are required
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| Error::Config(format!("{} must be set", key)))
        };
        let numeric = |key: &str, default: u64| -> Result<u64> {
            match lookup(key) {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .map_err(|e| Error::Config(format!("{} is not a number ({}): {}", key, raw, e))),
                None => Ok(default),
            }
        };

        let config = Self {
            solana_rpc_url: required(SOLANA_RPC_URL)?,
            ethereum_rpc_url: required(ETHEREUM_RPC_URL)?,
            rpc_timeout_secs: numeric(RPC_TIMEOUT_SECS, DEFAULT_TIMEOUT_SECS)?,
            confirm_timeout_secs: numeric(CONFIRM_TIMEOUT_SECS, DEFAULT_CONFIRM_TIMEOUT_SECS)?,
            airdrop_settle_ms: numeric(AIRDROP_SETTLE_MS, DEFAULT_AIRDROP_SETTLE_MS)?,
            fee_buffer_lamports: numeric(FEE_BUFFER_LAMPORTS, DEFAULT_FEE_BUFFER_LAMPORTS)?,
            state_dir: lookup(STATE_DIR).map(PathBuf::from).unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR)),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for (key, url) in [(SOLANA_RPC_URL, &self.solana_rpc_url), (ETHEREUM_RPC_URL, &self.ethereum_rpc_url)] {
            if !validate_url(url) {
                return Err(Error::Config(format!("{} is not a valid http(s) URL: {}", key, url)));
            }
        }
        if self.rpc_timeout_secs == 0 || self.confirm_timeout_secs == 0 {
            return Err(Error::Config("Timeouts must be greater than zero".to_string()));
        }
        Ok(())
    }

    pub fn solana_provider(&self) -> ProviderConfig {
        ProviderConfig { url: self.solana_rpc_url.clone(), timeout: Some(self.rpc_timeout_secs) }
    }

    pub fn ethereum_provider(&self) -> ProviderConfig {
        ProviderConfig { url: self.ethereum_rpc_url.clone(), timeout: Some(self.rpc_timeout_secs) }
    }

    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_secs(self.confirm_timeout_secs)
    }

    pub fn airdrop_settle_delay(&self) -> Duration {
        Duration::from_millis(self.airdrop_settle_ms)
    }
}

/// Accept only absolute http/https URLs with a host
pub fn validate_url(url: &str) -> bool {
    match url::Url::parse(url) {
        Ok(parsed) => {
            let scheme = parsed.scheme();
            (scheme == "http" || scheme == "https") && parsed.host().is_some()
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[
            (SOLANA_RPC_URL, "https://api.devnet.solana.com"),
            (ETHEREUM_RPC_URL, "http://localhost:8545"),
        ]))
        .unwrap();

        assert_eq!(config.rpc_timeout_secs, 30);
        assert_eq!(config.confirm_timeout(), Duration::from_secs(60));
        assert_eq!(config.airdrop_settle_delay(), Duration::from_millis(2000));
        assert_eq!(config.fee_buffer_lamports, 1_000_000);
        assert_eq!(config.state_dir, PathBuf::from("./.keyforge"));
        assert_eq!(config.solana_provider().url, "https://api.devnet.solana.com");
        assert_eq!(config.ethereum_provider().timeout, Some(30));
    }

    #[test]
    fn test_missing_endpoint_is_fatal() {
        let err = Config::from_lookup(lookup(&[(SOLANA_RPC_URL, "https://api.devnet.solana.com")])).unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains(ETHEREUM_RPC_URL)));

        let err = Config::from_lookup(lookup(&[(SOLANA_RPC_URL, " "), (ETHEREUM_RPC_URL, "http://localhost:8545")]))
            .unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains(SOLANA_RPC_URL)));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(Config::from_lookup(lookup(&[
            (SOLANA_RPC_URL, "ftp://server.com"),
            (ETHEREUM_RPC_URL, "http://localhost:8545"),
        ]))
        .is_err());

        assert!(Config::from_lookup(lookup(&[
            (SOLANA_RPC_URL, "http://localhost:8899"),
            (ETHEREUM_RPC_URL, "http://localhost:8545"),
            (RPC_TIMEOUT_SECS, "soon"),
        ]))
        .is_err());
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("https://rpc.example.com"));
        assert!(validate_url("http://localhost:8545"));
        assert!(!validate_url(""));
        assert!(!validate_url("not a url"));
        assert!(!validate_url("file:///etc/passwd"));
    }
}
