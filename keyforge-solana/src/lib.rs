//! Solana token program support for Keyforge Wallet
//!
//! This crate implements [`TokenGateway`] with the SPL token and associated
//! token account instruction builders. Transactions are signed locally with
//! the wallet's derived keypair and submitted through the core JSON-RPC
//! [`SolanaProvider`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use solana_sdk::{
    instruction::Instruction,
    program_pack::Pack,
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    signer::signers::Signers,
    system_instruction,
};
use spl_associated_token_account::{get_associated_token_address, instruction::create_associated_token_account_idempotent};
use spl_token::{instruction as token_instruction, state::Mint};
use tracing::{debug, info, instrument};

use keyforge_wallet::crypto::keys::KeyPair;
use keyforge_wallet::error::{Error, Result};
use keyforge_wallet::provider::{OwnedTokenAccount, SolanaProvider};
use keyforge_wallet::token::TokenGateway;

pub mod transaction;

use transaction::{build_signed_transaction, encode_transaction, parse_blockhash, parse_pubkey, to_signer};

/// [`TokenGateway`] over a Solana JSON-RPC endpoint
pub struct SplTokenGateway {
    provider: Arc<SolanaProvider>,
    confirm_timeout: Duration,
}

impl SplTokenGateway {
    pub fn new(provider: Arc<SolanaProvider>, confirm_timeout: Duration) -> Self {
        Self { provider, confirm_timeout }
    }

    /// Sign, submit and confirm `instructions`; returns the signature
    async fn submit<S: Signers + Sync>(&self, instructions: &[Instruction], payer: &Pubkey, signers: &S) -> Result<String> {
        let blockhash = parse_blockhash(&self.provider.get_latest_blockhash().await?)?;
        let transaction = build_signed_transaction(instructions, payer, signers, blockhash)?;
        let encoded = encode_transaction(&transaction)?;

        let signature = self.provider.send_transaction(&encoded).await?;
        debug!(%signature, "Transaction submitted");
        self.provider.wait_for_confirmation(&signature, self.confirm_timeout).await?;
        Ok(signature)
    }
}

#[async_trait]
impl TokenGateway for SplTokenGateway {
    async fn minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64> {
        self.provider.get_minimum_balance_for_rent_exemption(data_len).await
    }

    async fn balance_lamports(&self, address: &str) -> Result<u64> {
        self.provider.get_balance_lamports(address).await
    }

    async fn request_airdrop(&self, address: &str, lamports: u64) -> Result<String> {
        parse_pubkey(address)?;
        self.provider.request_airdrop(address, lamports).await
    }

    async fn wait_for_confirmation(&self, signature: &str, timeout: Duration) -> Result<()> {
        self.provider.wait_for_confirmation(signature, timeout).await
    }

    #[instrument(skip(self, payer))]
    async fn create_mint(&self, payer: &KeyPair, decimals: u8, freeze_authority: bool) -> Result<String> {
        let payer = to_signer(payer)?;
        let mint = Keypair::new();
        let rent = self.provider.get_minimum_balance_for_rent_exemption(Mint::LEN).await?;

        let freeze_authority = freeze_authority.then(|| payer.pubkey());
        let instructions = [
            system_instruction::create_account(&payer.pubkey(), &mint.pubkey(), rent, Mint::LEN as u64, &spl_token::id()),
            token_instruction::initialize_mint(
                &spl_token::id(),
                &mint.pubkey(),
                &payer.pubkey(),
                freeze_authority.as_ref(),
                decimals,
            )
            .map_err(|e| Error::Protocol(format!("Failed to build initialize_mint: {}", e)))?,
        ];

        let signature = self.submit(&instructions, &payer.pubkey(), &[&payer, &mint]).await?;
        info!(mint = %mint.pubkey(), %signature, "Mint created");
        Ok(mint.pubkey().to_string())
    }

    #[instrument(skip(self, payer))]
    async fn get_or_create_associated_account(&self, payer: &KeyPair, mint: &str, owner: &str) -> Result<String> {
        let payer = to_signer(payer)?;
        let mint = parse_pubkey(mint)?;
        let owner = parse_pubkey(owner)?;
        let account = get_associated_token_address(&owner, &mint);

        if !self.provider.account_exists(&account.to_string()).await? {
            let instruction =
                create_associated_token_account_idempotent(&payer.pubkey(), &owner, &mint, &spl_token::id());
            self.submit(&[instruction], &payer.pubkey(), &[&payer]).await?;
            info!(%account, "Associated token account created");
        }
        Ok(account.to_string())
    }

    #[instrument(skip(self, payer))]
    async fn mint_to(&self, payer: &KeyPair, mint: &str, account: &str, amount: u64) -> Result<String> {
        let payer = to_signer(payer)?;
        let instruction = token_instruction::mint_to(
            &spl_token::id(),
            &parse_pubkey(mint)?,
            &parse_pubkey(account)?,
            &payer.pubkey(),
            &[],
            amount,
        )
        .map_err(|e| Error::Protocol(format!("Failed to build mint_to: {}", e)))?;

        self.submit(&[instruction], &payer.pubkey(), &[&payer]).await
    }

    async fn mint_decimals(&self, mint: &str) -> Result<u8> {
        parse_pubkey(mint)?;
        self.provider.get_mint_decimals(mint).await
    }

    async fn owned_token_accounts(&self, owner: &str) -> Result<Vec<OwnedTokenAccount>> {
        parse_pubkey(owner)?;
        self.provider.get_owned_token_accounts(owner, &spl_token::id().to_string()).await
    }
}
