//! SPL token issuance, airdrops and token portfolio
//!
//! The on-chain side lives behind [`TokenGateway`], implemented by the
//! `keyforge-solana` crate with the SPL instruction builders. Everything in
//! this module only sequences those calls and records their results in the
//! shared wallet state.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::keys::KeyPair;
use crate::error::Result;
use crate::provider::OwnedTokenAccount;

mod airdrop;
mod portfolio;
mod workflow;

pub use airdrop::*;
pub use portfolio::*;
pub use workflow::*;

/// Size of an SPL mint account in bytes
pub const MINT_ACCOUNT_LEN: usize = 82;

/// Size of an SPL token account in bytes
pub const TOKEN_ACCOUNT_LEN: usize = 165;

/// Highest decimals value accepted for a new mint
pub const MAX_DECIMALS: u8 = 18;

/// A mint created by this wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRecord {
    pub mint_address: String,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    /// Circulating supply in base units
    pub supply: u64,
    pub freeze_authority: Option<String>,
    pub mint_authority: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A nonzero token holding of one wallet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserTokenBalance {
    pub mint_address: String,
    pub token_account: String,
    pub raw_balance: u64,
    pub decimals: u8,
    pub name: Option<String>,
    pub symbol: Option<String>,
}

impl UserTokenBalance {
    /// Balance scaled by the mint's decimals
    pub fn ui_amount(&self) -> f64 {
        self.raw_balance as f64 / 10f64.powi(self.decimals as i32)
    }
}

impl From<OwnedTokenAccount> for UserTokenBalance {
    fn from(account: OwnedTokenAccount) -> Self {
        Self {
            mint_address: account.mint,
            token_account: account.token_account,
            raw_balance: account.raw_balance,
            decimals: account.decimals,
            name: None,
            symbol: None,
        }
    }
}

/// Input of a token-creation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTokenParams {
    /// Wallet paying for and owning the mint
    pub wallet_id: String,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    /// Whole tokens minted to the payer right after creation
    pub initial_supply: u64,
    /// Record the payer as freeze authority
    pub freeze_authority: bool,
    /// Record the payer as mint authority
    pub mint_authority: bool,
}

/// Lifecycle of the most recent faucet request
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum AirdropStatus {
    #[default]
    Idle,
    Pending { wallet_id: String },
    Fulfilled { wallet_id: String, signature: String, balance: f64 },
    Rejected { wallet_id: String, reason: String },
}

/// On-chain token program surface
///
/// Mutating calls sign with `payer`, submit, and return only once the
/// transaction is confirmed. Addresses are base58 strings.
#[async_trait]
pub trait TokenGateway: Send + Sync {
    async fn minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64>;

    async fn balance_lamports(&self, address: &str) -> Result<u64>;

    /// Submit a faucet request and return its signature without waiting
    async fn request_airdrop(&self, address: &str, lamports: u64) -> Result<String>;

    /// Wait for `signature` to reach confirmed commitment; `Error::Funding` on timeout
    async fn wait_for_confirmation(&self, signature: &str, timeout: Duration) -> Result<()>;

    /// Create and initialize a new mint with `payer` as mint authority; returns the mint address
    async fn create_mint(&self, payer: &KeyPair, decimals: u8, freeze_authority: bool) -> Result<String>;

    /// Associated token account of `owner` for `mint`, created when missing
    async fn get_or_create_associated_account(&self, payer: &KeyPair, mint: &str, owner: &str) -> Result<String>;

    /// Mint `amount` base units into `account`; returns the signature
    async fn mint_to(&self, payer: &KeyPair, mint: &str, account: &str, amount: u64) -> Result<String>;

    async fn mint_decimals(&self, mint: &str) -> Result<u8>;

    /// Token accounts of `owner` holding a nonzero balance
    async fn owned_token_accounts(&self, owner: &str) -> Result<Vec<OwnedTokenAccount>>;
}
