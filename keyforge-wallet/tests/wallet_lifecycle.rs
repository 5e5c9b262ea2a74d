//! End-to-end tests of state, sync and token issuance against in-process gateways

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tempfile::tempdir;

use keyforge_wallet::account::SyncStatus;
use keyforge_wallet::crypto::keys::{Chain, KeyPair};
use keyforge_wallet::provider::{ChainGateway, OwnedTokenAccount};
use keyforge_wallet::store::{FileStore, KeyValueStore};
use keyforge_wallet::token::{CreateTokenParams, TokenGateway, TokenPortfolio, WorkflowStage};
use keyforge_wallet::{Error, Result, StateHandle, TokenWorkflowEngine, WalletSyncCoordinator};

const MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

/// A tiny in-memory ledger standing in for both RPC endpoints
#[derive(Default)]
struct Ledger {
    lamports: Mutex<HashMap<String, u64>>,
    tokens: Mutex<HashMap<(String, String), u64>>,
    next_mint: Mutex<u32>,
}

#[async_trait]
impl ChainGateway for Ledger {
    async fn get_balance(&self, chain: Chain, address: &str) -> Result<f64> {
        match chain {
            Chain::Solana => Ok(*self.lamports.lock().get(address).unwrap_or(&0) as f64 / 1e9),
            Chain::Ethereum => Err(Error::Network("ethereum endpoint unreachable".to_string())),
        }
    }

    async fn get_transaction_count(&self, _chain: Chain, _address: &str) -> Result<u64> {
        Ok(2)
    }
}

#[async_trait]
impl TokenGateway for Ledger {
    async fn minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64> {
        Ok((data_len as u64 + 128) * 6_960)
    }

    async fn balance_lamports(&self, address: &str) -> Result<u64> {
        Ok(*self.lamports.lock().get(address).unwrap_or(&0))
    }

    async fn request_airdrop(&self, address: &str, lamports: u64) -> Result<String> {
        *self.lamports.lock().entry(address.to_string()).or_default() += lamports;
        Ok(format!("airdrop-{}", address))
    }

    async fn wait_for_confirmation(&self, _signature: &str, _timeout: Duration) -> Result<()> {
        Ok(())
    }

    async fn create_mint(&self, _payer: &KeyPair, _decimals: u8, _freeze_authority: bool) -> Result<String> {
        let mut next = self.next_mint.lock();
        *next += 1;
        Ok(format!("Mint{}", *next))
    }

    async fn get_or_create_associated_account(&self, _payer: &KeyPair, mint: &str, owner: &str) -> Result<String> {
        Ok(format!("{}:{}", owner, mint))
    }

    async fn mint_to(&self, _payer: &KeyPair, mint: &str, account: &str, amount: u64) -> Result<String> {
        let owner = account.split(':').next().unwrap_or_default().to_string();
        *self.tokens.lock().entry((owner, mint.to_string())).or_default() += amount;
        Ok(format!("mint-to-{}", amount))
    }

    async fn mint_decimals(&self, _mint: &str) -> Result<u8> {
        Ok(6)
    }

    async fn owned_token_accounts(&self, owner: &str) -> Result<Vec<OwnedTokenAccount>> {
        let mut accounts: Vec<OwnedTokenAccount> = self
            .tokens
            .lock()
            .iter()
            .filter(|((holder, _), amount)| holder == owner && **amount > 0)
            .map(|((holder, mint), amount)| OwnedTokenAccount {
                mint: mint.clone(),
                token_account: format!("{}:{}", holder, mint),
                raw_balance: *amount,
                decimals: 6,
            })
            .collect();
        accounts.sort_by(|a, b| a.mint.cmp(&b.mint));
        Ok(accounts)
    }
}

#[tokio::test]
async fn test_wallets_sync_and_survive_restart() {
    let dir = tempdir().unwrap();
    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(dir.path()).unwrap());
    let ledger = Arc::new(Ledger::default());

    let state = StateHandle::open(Arc::clone(&store)).unwrap();
    state.import_mnemonic(MNEMONIC).unwrap();
    let sol = state.create_wallet(Chain::Solana).unwrap();
    let eth = state.create_wallet(Chain::Ethereum).unwrap();
    ledger.lamports.lock().insert(sol.public_identifier().to_string(), 1_500_000_000);

    let sync = WalletSyncCoordinator::new(state.clone(), ledger.clone());
    let outcomes = sync.refresh_pending().await;
    assert_eq!(outcomes.len(), 2);

    let sol_synced = state.wallet(sol.id()).unwrap();
    assert_eq!(sol_synced.balance, 1.5);
    assert_eq!(sol_synced.sync_status, SyncStatus::Idle);

    let eth_synced = state.wallet(eth.id()).unwrap();
    assert_eq!(eth_synced.balance, 0.0);
    assert_eq!(eth_synced.transaction_count, 2);
    assert!(matches!(eth_synced.sync_status, SyncStatus::Error(_)));

    drop(state);
    let restored = StateHandle::open(store).unwrap();
    assert_eq!(restored.wallet(sol.id()).unwrap().balance, 1.5);
    let eth_restored = &restored.wallets(Chain::Ethereum)[0];
    assert_eq!(eth_restored.public_identifier(), eth.public_identifier());
    assert_eq!(eth_restored.private_key(), eth.private_key());
}

#[tokio::test]
async fn test_issue_token_and_read_portfolio() {
    let ledger = Arc::new(Ledger::default());
    let state = StateHandle::in_memory();
    state.import_mnemonic(MNEMONIC).unwrap();
    let payer = state.create_wallet(Chain::Solana).unwrap();

    let engine = TokenWorkflowEngine::new(state.clone(), ledger.clone());
    let params = CreateTokenParams {
        wallet_id: payer.id().to_string(),
        name: "Test Token".to_string(),
        symbol: "TT".to_string(),
        decimals: 6,
        initial_supply: 1000,
        freeze_authority: false,
        mint_authority: true,
    };

    // Unfunded payer is stopped before anything is created
    let run = engine.create_token(&params).await;
    assert!(matches!(run.outcome(), Err(Error::InsufficientFunds { available: 0, .. })));
    assert_eq!(*ledger.next_mint.lock(), 0);

    ledger.request_airdrop(payer.public_identifier(), 1_000_000_000).await.unwrap();
    let run = engine.create_token(&params).await;
    assert_eq!(run.final_stage(), &WorkflowStage::Done);
    let record = run.into_result().unwrap();
    assert_eq!(record.supply, 1_000_000_000);

    let portfolio = TokenPortfolio::new(state.clone(), ledger.clone());
    let balances = portfolio.refresh_token_balances(payer.id()).await.unwrap();
    assert_eq!(balances.len(), 1);
    assert_eq!(balances[0].mint_address, record.mint_address);
    assert_eq!(balances[0].name.as_deref(), Some("Test Token"));
    assert_eq!(balances[0].ui_amount(), 1000.0);
}
