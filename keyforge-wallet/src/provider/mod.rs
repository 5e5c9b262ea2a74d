//! Chain RPC providers
//!
//! Each chain gets its own provider over a shared JSON-RPC client. The
//! [`ChainGateway`] trait is the narrow surface the sync coordinator needs;
//! [`RpcGateway`] dispatches it to the right provider by chain.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::crypto::keys::Chain;
use crate::error::Result;

pub mod client;
pub mod ethereum;
pub mod solana;
pub mod units;

pub use client::JsonRpcClient;
pub use ethereum::EthereumProvider;
pub use solana::{OwnedTokenAccount, SolanaProvider};
pub use units::*;

/// Default transport timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Provider configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider URL
    pub url: String,
    /// Timeout in seconds
    pub timeout: Option<u64>,
}

impl ProviderConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), timeout: None }
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS)
    }
}

/// Balance and activity reads used to keep wallets in sync
///
/// Amounts are in the chain's native unit. Transport failures surface as
/// `Error::Network`, malformed or rejected responses as `Error::Protocol`.
#[async_trait]
pub trait ChainGateway: Send + Sync {
    async fn get_balance(&self, chain: Chain, address: &str) -> Result<f64>;

    async fn get_transaction_count(&self, chain: Chain, address: &str) -> Result<u64>;
}

/// [`ChainGateway`] backed by one JSON-RPC endpoint per chain
#[derive(Debug, Clone)]
pub struct RpcGateway {
    solana: Arc<SolanaProvider>,
    ethereum: Arc<EthereumProvider>,
}

impl RpcGateway {
    pub fn new(solana: &ProviderConfig, ethereum: &ProviderConfig) -> Result<Self> {
        Ok(Self {
            solana: Arc::new(SolanaProvider::new(solana)?),
            ethereum: Arc::new(EthereumProvider::new(ethereum)?),
        })
    }

    /// Shared Solana provider, also used by the token surface
    pub fn solana(&self) -> Arc<SolanaProvider> {
        Arc::clone(&self.solana)
    }
}

#[async_trait]
impl ChainGateway for RpcGateway {
    async fn get_balance(&self, chain: Chain, address: &str) -> Result<f64> {
        match chain {
            Chain::Solana => self.solana.get_balance(address).await,
            Chain::Ethereum => self.ethereum.get_balance(address).await,
        }
    }

    async fn get_transaction_count(&self, chain: Chain, address: &str) -> Result<u64> {
        match chain {
            Chain::Solana => self.solana.get_transaction_count(address).await,
            Chain::Ethereum => self.ethereum.get_transaction_count(address).await,
        }
    }
}
