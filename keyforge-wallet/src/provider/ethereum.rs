//! Ethereum JSON-RPC provider

use serde_json::json;
use tracing::instrument;

use crate::error::Result;
use super::client::{JsonRpcClient, RpcCall};
use super::units::{parse_hex_quantity, wei_to_eth};
use super::ProviderConfig;

/// Ethereum provider
#[derive(Debug)]
pub struct EthereumProvider {
    client: JsonRpcClient,
}

impl EthereumProvider {
    /// Create a new Ethereum provider
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        Ok(Self { client: JsonRpcClient::new(config)? })
    }

    /// Balance in wei at the latest block
    #[instrument(skip(self))]
    pub async fn get_balance_wei(&self, address: &str) -> Result<u128> {
        let (method, params) = balance_request(address);
        let quantity: String = self.client.call(method, params).await?;
        parse_hex_quantity(&quantity)
    }

    /// Balance in ETH
    pub async fn get_balance(&self, address: &str) -> Result<f64> {
        Ok(wei_to_eth(self.get_balance_wei(address).await?))
    }

    /// Account nonce, i.e. number of transactions sent
    #[instrument(skip(self))]
    pub async fn get_transaction_count(&self, address: &str) -> Result<u64> {
        let (method, params) = transaction_count_request(address);
        let quantity: String = self.client.call(method, params).await?;
        let count = parse_hex_quantity(&quantity)?;
        u64::try_from(count).map_err(|_| crate::Error::Protocol(format!("Transaction count out of range: {}", quantity)))
    }
}

pub fn balance_request(address: &str) -> RpcCall {
    ("eth_getBalance", json!([address, "latest"]))
}

pub fn transaction_count_request(address: &str) -> RpcCall {
    ("eth_getTransactionCount", json!([address, "latest"]))
}
