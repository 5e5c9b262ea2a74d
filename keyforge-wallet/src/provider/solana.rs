//! Solana JSON-RPC provider

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, instrument};

use crate::error::{Error, Result};
use super::client::{decode_result, JsonRpcClient, RpcCall};
use super::units::lamports_to_sol;
use super::ProviderConfig;

/// Commitment level used for reads and confirmations
pub const COMMITMENT: &str = "confirmed";

/// Upper bound the node accepts for `getSignaturesForAddress`
pub const SIGNATURE_PAGE_LIMIT: usize = 1000;

const CONFIRMATION_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Deserialize)]
struct WithContext<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignatureStatus {
    #[serde(default)]
    err: Option<Value>,
    #[serde(default)]
    confirmation_status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LatestBlockhash {
    blockhash: String,
}

#[derive(Debug, Deserialize)]
struct KeyedAccount {
    pubkey: String,
    account: ParsedAccount,
}

#[derive(Debug, Deserialize)]
struct ParsedAccount {
    data: ParsedData,
}

#[derive(Debug, Deserialize)]
struct ParsedData {
    parsed: ParsedInfo,
}

#[derive(Debug, Deserialize)]
struct ParsedInfo {
    info: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenAccountInfo {
    mint: String,
    token_amount: TokenAmount,
}

#[derive(Debug, Deserialize)]
struct TokenAmount {
    amount: String,
    decimals: u8,
}

#[derive(Debug, Deserialize)]
struct MintInfo {
    decimals: u8,
}

/// A token account owned by a wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnedTokenAccount {
    pub mint: String,
    pub token_account: String,
    /// Balance in base units
    pub raw_balance: u64,
    pub decimals: u8,
}

/// Solana provider
#[derive(Debug)]
pub struct SolanaProvider {
    client: JsonRpcClient,
}

impl SolanaProvider {
    /// Create a new Solana provider
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        Ok(Self { client: JsonRpcClient::new(config)? })
    }

    /// Endpoint this provider talks to
    pub fn url(&self) -> &str {
        self.client.url()
    }

    /// Balance in lamports
    #[instrument(skip(self))]
    pub async fn get_balance_lamports(&self, address: &str) -> Result<u64> {
        let (method, params) = balance_request(address);
        let balance: WithContext<u64> = self.client.call(method, params).await?;
        Ok(balance.value)
    }

    /// Balance in SOL
    pub async fn get_balance(&self, address: &str) -> Result<f64> {
        Ok(lamports_to_sol(self.get_balance_lamports(address).await?))
    }

    /// Number of signatures involving the address, capped at one page
    #[instrument(skip(self))]
    pub async fn get_transaction_count(&self, address: &str) -> Result<u64> {
        let (method, params) = signatures_request(address);
        let signatures: Vec<Value> = self.client.call(method, params).await?;
        Ok(signatures.len() as u64)
    }

    /// Rent-exemption minimum for an account of `data_len` bytes
    pub async fn get_minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64> {
        self.client.call("getMinimumBalanceForRentExemption", json!([data_len])).await
    }

    /// Ask the faucet for `lamports`; node rejections are `Funding` errors
    #[instrument(skip(self))]
    pub async fn request_airdrop(&self, address: &str, lamports: u64) -> Result<String> {
        match self
            .client
            .send("requestAirdrop", json!([address, lamports, { "commitment": COMMITMENT }]))
            .await?
        {
            Ok(result) => decode_result("requestAirdrop", result),
            Err(e) => Err(Error::Funding(format!("Airdrop rejected ({}): {}", e.code, e.message))),
        }
    }

    /// Poll until `signature` reaches the confirmed commitment level
    ///
    /// A failed transaction or an elapsed `timeout` yields `Error::Funding`.
    #[instrument(skip(self))]
    pub async fn wait_for_confirmation(&self, signature: &str, timeout: Duration) -> Result<()> {
        tokio::time::timeout(timeout, self.poll_confirmation(signature))
            .await
            .map_err(|_| {
                Error::Funding(format!("Transaction {} not confirmed within {}s", signature, timeout.as_secs()))
            })?
    }

    async fn poll_confirmation(&self, signature: &str) -> Result<()> {
        loop {
            let statuses: WithContext<Vec<Option<SignatureStatus>>> = self
                .client
                .call("getSignatureStatuses", json!([[signature]]))
                .await?;

            if let Some(Some(status)) = statuses.value.into_iter().next() {
                if let Some(err) = status.err {
                    return Err(Error::Funding(format!("Transaction {} failed: {}", signature, err)));
                }
                if is_confirmed(status.confirmation_status.as_deref()) {
                    return Ok(());
                }
            }
            debug!(signature, "Waiting for confirmation");
            tokio::time::sleep(CONFIRMATION_POLL_INTERVAL).await;
        }
    }

    pub async fn get_latest_blockhash(&self) -> Result<String> {
        let latest: WithContext<LatestBlockhash> = self
            .client
            .call("getLatestBlockhash", json!([{ "commitment": COMMITMENT }]))
            .await?;
        Ok(latest.value.blockhash)
    }

    /// Submit a base64-encoded signed transaction, returning its signature
    ///
    /// Preflight simulation errors come back as `Protocol` errors carrying the
    /// node's message.
    #[instrument(skip(self, encoded))]
    pub async fn send_transaction(&self, encoded: &str) -> Result<String> {
        self.client
            .call(
                "sendTransaction",
                json!([encoded, { "encoding": "base64", "preflightCommitment": COMMITMENT }]),
            )
            .await
    }

    /// Whether an account exists at `address`
    pub async fn account_exists(&self, address: &str) -> Result<bool> {
        let account: WithContext<Option<Value>> = self
            .client
            .call("getAccountInfo", json!([address, { "encoding": "base64", "commitment": COMMITMENT }]))
            .await?;
        Ok(account.value.is_some())
    }

    /// Decimals of an SPL mint
    pub async fn get_mint_decimals(&self, mint: &str) -> Result<u8> {
        let account: WithContext<Option<ParsedAccount>> = self
            .client
            .call("getAccountInfo", json!([mint, { "encoding": "jsonParsed", "commitment": COMMITMENT }]))
            .await?;
        let account = account.value.ok_or_else(|| Error::Protocol(format!("Mint {} not found", mint)))?;
        let info: MintInfo = decode_result("getAccountInfo", account.data.parsed.info)?;
        Ok(info.decimals)
    }

    /// Accounts of token program `program_id` owned by `owner` with a nonzero balance
    #[instrument(skip(self))]
    pub async fn get_owned_token_accounts(&self, owner: &str, program_id: &str) -> Result<Vec<OwnedTokenAccount>> {
        let (method, params) = owned_token_accounts_request(owner, program_id);
        let accounts: WithContext<Vec<KeyedAccount>> = self.client.call(method, params).await?;
        parse_owned_token_accounts(accounts.value)
    }
}

pub fn balance_request(address: &str) -> RpcCall {
    ("getBalance", json!([address, { "commitment": COMMITMENT }]))
}

pub fn signatures_request(address: &str) -> RpcCall {
    ("getSignaturesForAddress", json!([address, { "limit": SIGNATURE_PAGE_LIMIT }]))
}

pub fn owned_token_accounts_request(owner: &str, program_id: &str) -> RpcCall {
    (
        "getTokenAccountsByOwner",
        json!([owner, { "programId": program_id }, { "encoding": "jsonParsed", "commitment": COMMITMENT }]),
    )
}

fn is_confirmed(level: Option<&str>) -> bool {
    matches!(level, Some("confirmed") | Some("finalized"))
}

fn parse_owned_token_accounts(accounts: Vec<KeyedAccount>) -> Result<Vec<OwnedTokenAccount>> {
    let mut owned = Vec::with_capacity(accounts.len());
    for keyed in accounts {
        let info: TokenAccountInfo = decode_result("getTokenAccountsByOwner", keyed.account.data.parsed.info)?;
        let raw_balance = info
            .token_amount
            .amount
            .parse::<u64>()
            .map_err(|e| Error::Protocol(format!("Invalid token amount {}: {}", info.token_amount.amount, e)))?;
        if raw_balance == 0 {
            continue;
        }
        owned.push(OwnedTokenAccount {
            mint: info.mint,
            token_account: keyed.pubkey,
            raw_balance,
            decimals: info.token_amount.decimals,
        });
    }
    Ok(owned)
}
