//! Token creation state machine
//!
//! `Validating → FundingCheck → MintCreation → (AccountCreation → Minting)? → Done`,
//! with `Failed` reachable from every stage. Nothing is rolled back: a failure
//! after `MintCreation` leaves the mint on-chain, and the failure reason says so.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::account::Wallet;
use crate::config::DEFAULT_FEE_BUFFER_LAMPORTS;
use crate::crypto::keys::{Chain, KeyPair};
use crate::error::{Error, Result};
use crate::provider::to_base_units;
use crate::state::StateHandle;
use super::{CreateTokenParams, TokenGateway, TokenRecord, MAX_DECIMALS, MINT_ACCOUNT_LEN, TOKEN_ACCOUNT_LEN};

const AIRDROP_HINT: &str = "Insufficient SOL balance for transaction fees. Please request an airdrop first.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkflowStage {
    Validating,
    FundingCheck,
    MintCreation,
    AccountCreation,
    Minting,
    Done,
    Failed(String),
}

impl WorkflowStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowStage::Done | WorkflowStage::Failed(_))
    }

    fn name(&self) -> &'static str {
        match self {
            WorkflowStage::Validating => "Validating",
            WorkflowStage::FundingCheck => "FundingCheck",
            WorkflowStage::MintCreation => "MintCreation",
            WorkflowStage::AccountCreation => "AccountCreation",
            WorkflowStage::Minting => "Minting",
            WorkflowStage::Done => "Done",
            WorkflowStage::Failed(_) => "Failed",
        }
    }
}

impl fmt::Display for WorkflowStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowStage::Failed(reason) => write!(f, "Failed({})", reason),
            other => f.write_str(other.name()),
        }
    }
}

/// Stages visited by one run, and how it ended
#[derive(Debug, Clone)]
pub struct WorkflowRun {
    stages: Vec<WorkflowStage>,
    outcome: Result<TokenRecord>,
}

impl WorkflowRun {
    pub fn stages(&self) -> &[WorkflowStage] {
        &self.stages
    }

    pub fn final_stage(&self) -> &WorkflowStage {
        // A run always records at least `Validating` and a terminal stage
        self.stages.last().unwrap_or(&WorkflowStage::Validating)
    }

    pub fn outcome(&self) -> &Result<TokenRecord> {
        &self.outcome
    }

    pub fn into_result(self) -> Result<TokenRecord> {
        self.outcome
    }
}

/// Lamports a payer needs before any on-chain step is attempted
///
/// Returns the required total, or `InsufficientFunds` when `available` is short.
pub fn check_funding(available: u64, mint_rent: u64, account_rent: u64, fee_buffer: u64) -> Result<u64> {
    let required = mint_rent.saturating_add(account_rent).saturating_add(fee_buffer);
    if available < required {
        return Err(Error::InsufficientFunds { required, available });
    }
    Ok(required)
}

/// Result of minting more of an existing token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintReceipt {
    pub signature: String,
    pub mint_address: String,
    pub token_account: String,
    /// Amount minted in base units
    pub amount: u64,
}

pub struct TokenWorkflowEngine {
    state: StateHandle,
    gateway: Arc<dyn TokenGateway>,
    fee_buffer_lamports: u64,
}

impl TokenWorkflowEngine {
    pub fn new(state: StateHandle, gateway: Arc<dyn TokenGateway>) -> Self {
        Self { state, gateway, fee_buffer_lamports: DEFAULT_FEE_BUFFER_LAMPORTS }
    }

    pub fn with_fee_buffer(mut self, lamports: u64) -> Self {
        self.fee_buffer_lamports = lamports;
        self
    }

    /// Run the whole creation workflow; a successful record is appended to state
    #[instrument(skip(self, params), fields(wallet_id = %params.wallet_id, symbol = %params.symbol))]
    pub async fn create_token(&self, params: &CreateTokenParams) -> WorkflowRun {
        let mut stages = vec![WorkflowStage::Validating];
        let outcome = self.run(params, &mut stages).await;

        match &outcome {
            Ok(record) => {
                stages.push(WorkflowStage::Done);
                info!(mint = %record.mint_address, supply = record.supply, "Token created");
                if let Err(e) = self.state.mutate(|s| s.tokens.push(record.clone())) {
                    warn!(error = %e, "Token record kept in memory only");
                }
            }
            Err(e) => {
                warn!(stage = %stages.last().map(|s| s.name()).unwrap_or("Validating"), error = %e, "Token workflow failed");
                stages.push(WorkflowStage::Failed(e.to_string()));
            }
        }
        WorkflowRun { stages, outcome }
    }

    async fn run(&self, params: &CreateTokenParams, stages: &mut Vec<WorkflowStage>) -> Result<TokenRecord> {
        let (wallet, payer) = self.validate(params)?;
        let supply = to_base_units(params.initial_supply, params.decimals)?;
        let payer_address = wallet.public_identifier().to_string();

        stages.push(WorkflowStage::FundingCheck);
        let mint_rent = self.gateway.minimum_balance_for_rent_exemption(MINT_ACCOUNT_LEN).await?;
        let account_rent = if supply > 0 {
            self.gateway.minimum_balance_for_rent_exemption(TOKEN_ACCOUNT_LEN).await?
        } else {
            0
        };
        let available = self.gateway.balance_lamports(&payer_address).await?;
        check_funding(available, mint_rent, account_rent, self.fee_buffer_lamports)?;

        stages.push(WorkflowStage::MintCreation);
        let mint = self
            .gateway
            .create_mint(&payer, params.decimals, params.freeze_authority)
            .await
            .map_err(|e| {
                failure(
                    WorkflowStage::MintCreation,
                    format!("{}; the mint may have been created on-chain, confirmation unknown", describe(&e)),
                )
            })?;

        if supply > 0 {
            let partial = |stage: WorkflowStage, e: Error| {
                failure(stage, format!("{}; mint {} exists with zero circulating supply", describe(&e), mint))
            };

            stages.push(WorkflowStage::AccountCreation);
            let account = self
                .gateway
                .get_or_create_associated_account(&payer, &mint, &payer_address)
                .await
                .map_err(|e| partial(WorkflowStage::AccountCreation, e))?;

            stages.push(WorkflowStage::Minting);
            self.gateway
                .mint_to(&payer, &mint, &account, supply)
                .await
                .map_err(|e| partial(WorkflowStage::Minting, e))?;
        }

        Ok(TokenRecord {
            mint_address: mint,
            name: params.name.trim().to_string(),
            symbol: params.symbol.trim().to_string(),
            decimals: params.decimals,
            supply,
            freeze_authority: params.freeze_authority.then(|| payer_address.clone()),
            mint_authority: params.mint_authority.then(|| payer_address.clone()),
            created_at: Utc::now(),
        })
    }

    fn validate(&self, params: &CreateTokenParams) -> Result<(Wallet, KeyPair)> {
        if params.name.trim().is_empty() {
            return Err(Error::Validation("Token name is required".to_string()));
        }
        if params.symbol.trim().is_empty() {
            return Err(Error::Validation("Token symbol is required".to_string()));
        }
        if params.decimals > MAX_DECIMALS {
            return Err(Error::Validation(format!("Decimals must be between 0 and {}", MAX_DECIMALS)));
        }
        self.solana_signer(&params.wallet_id)
    }

    /// Mint `amount` whole tokens of an existing mint to `recipient` (the payer by default)
    #[instrument(skip(self))]
    pub async fn mint_additional(
        &self,
        wallet_id: &str,
        mint: &str,
        amount: u64,
        recipient: Option<&str>,
    ) -> Result<MintReceipt> {
        if amount == 0 {
            return Err(Error::Validation("Amount must be greater than zero".to_string()));
        }
        let (wallet, payer) = self.solana_signer(wallet_id)?;
        let recipient = recipient.unwrap_or(wallet.public_identifier());

        let decimals = self.gateway.mint_decimals(mint).await?;
        let base_units = to_base_units(amount, decimals)?;
        let account = self.gateway.get_or_create_associated_account(&payer, mint, recipient).await?;
        let signature = self.gateway.mint_to(&payer, mint, &account, base_units).await?;

        self.state.mutate(|s| {
            if let Some(record) = s.tokens.iter_mut().find(|t| t.mint_address == mint) {
                record.supply = record.supply.saturating_add(base_units);
            }
        })?;
        info!(mint, amount = base_units, recipient, "Minted additional tokens");

        Ok(MintReceipt {
            signature,
            mint_address: mint.to_string(),
            token_account: account,
            amount: base_units,
        })
    }

    fn solana_signer(&self, wallet_id: &str) -> Result<(Wallet, KeyPair)> {
        let wallet = self
            .state
            .wallet(wallet_id)
            .ok_or_else(|| Error::Validation(format!("Unknown wallet: {}", wallet_id)))?;
        if wallet.chain() != Chain::Solana {
            return Err(Error::Validation(format!("Wallet {} is not a Solana wallet", wallet_id)));
        }
        let key_pair = wallet.key_pair()?;
        Ok((wallet, key_pair))
    }
}

fn failure(stage: WorkflowStage, reason: String) -> Error {
    Error::TokenWorkflow { stage: stage.name().to_string(), reason }
}

/// Node rejections caused by an underfunded payer get an airdrop hint
fn describe(e: &Error) -> String {
    let message = e.to_string();
    if message.contains("Simulation failed") || message.to_lowercase().contains("insufficient funds") {
        format!("{} ({})", AIRDROP_HINT, message)
    } else {
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use crate::provider::OwnedTokenAccount;

    const PHRASE: &str =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    struct MockTokenGateway {
        balance: u64,
        fail_at: Option<&'static str>,
        calls: Mutex<Vec<String>>,
    }

    impl MockTokenGateway {
        fn new(balance: u64) -> Self {
            Self { balance, fail_at: None, calls: Mutex::new(Vec::new()) }
        }

        fn failing_at(mut self, call: &'static str) -> Self {
            self.fail_at = Some(call);
            self
        }

        fn record(&self, call: &str) -> Result<()> {
            self.calls.lock().push(call.to_string());
            if self.fail_at == Some(call) {
                return Err(Error::Protocol(format!("{}: Transaction simulation failed: Simulation failed", call)));
            }
            Ok(())
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl TokenGateway for MockTokenGateway {
        async fn minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64> {
            self.record("rent")?;
            Ok(match data_len {
                MINT_ACCOUNT_LEN => 1_400_000,
                TOKEN_ACCOUNT_LEN => 2_000_000,
                other => panic!("unexpected account size {}", other),
            })
        }

        async fn balance_lamports(&self, _address: &str) -> Result<u64> {
            self.record("balance")?;
            Ok(self.balance)
        }

        async fn request_airdrop(&self, _address: &str, _lamports: u64) -> Result<String> {
            self.record("airdrop")?;
            Ok("AirdropSig".to_string())
        }

        async fn wait_for_confirmation(&self, _signature: &str, _timeout: Duration) -> Result<()> {
            self.record("confirm")
        }

        async fn create_mint(&self, _payer: &KeyPair, _decimals: u8, _freeze_authority: bool) -> Result<String> {
            self.record("create_mint")?;
            Ok("MintAddr111".to_string())
        }

        async fn get_or_create_associated_account(&self, _payer: &KeyPair, _mint: &str, owner: &str) -> Result<String> {
            self.record("ata")?;
            Ok(format!("ata-{}", owner))
        }

        async fn mint_to(&self, _payer: &KeyPair, _mint: &str, _account: &str, amount: u64) -> Result<String> {
            self.record("mint_to")?;
            Ok(format!("MintSig-{}", amount))
        }

        async fn mint_decimals(&self, _mint: &str) -> Result<u8> {
            self.record("decimals")?;
            Ok(6)
        }

        async fn owned_token_accounts(&self, _owner: &str) -> Result<Vec<OwnedTokenAccount>> {
            self.record("owned")?;
            Ok(Vec::new())
        }
    }

    fn setup(gateway: MockTokenGateway) -> (StateHandle, Arc<MockTokenGateway>, TokenWorkflowEngine, Wallet) {
        let state = StateHandle::in_memory();
        state.import_mnemonic(PHRASE).unwrap();
        let wallet = state.create_wallet(Chain::Solana).unwrap();
        let gateway = Arc::new(gateway);
        let engine = TokenWorkflowEngine::new(state.clone(), gateway.clone());
        (state, gateway, engine, wallet)
    }

    fn params(wallet: &Wallet) -> CreateTokenParams {
        CreateTokenParams {
            wallet_id: wallet.id().to_string(),
            name: "Test Token".to_string(),
            symbol: "TT".to_string(),
            decimals: 6,
            initial_supply: 1000,
            freeze_authority: false,
            mint_authority: true,
        }
    }

    #[test]
    fn test_funding_check_boundaries() {
        let err = check_funding(3_000_000, 1_400_000, 2_000_000, 1_000_000).unwrap_err();
        assert_eq!(err, Error::InsufficientFunds { required: 4_400_000, available: 3_000_000 });
        assert_eq!(err.shortfall(), 1_400_000);

        assert_eq!(check_funding(5_000_000, 1_400_000, 2_000_000, 1_000_000).unwrap(), 4_400_000);
        assert_eq!(check_funding(4_400_000, 1_400_000, 2_000_000, 1_000_000).unwrap(), 4_400_000);
    }

    #[tokio::test]
    async fn test_create_token_end_to_end() {
        let (state, gateway, engine, wallet) = setup(MockTokenGateway::new(5_000_000));
        let run = engine.create_token(&params(&wallet)).await;

        assert_eq!(
            run.stages(),
            &[
                WorkflowStage::Validating,
                WorkflowStage::FundingCheck,
                WorkflowStage::MintCreation,
                WorkflowStage::AccountCreation,
                WorkflowStage::Minting,
                WorkflowStage::Done,
            ]
        );
        let (last, visited) = run.stages().split_last().unwrap();
        assert!(last.is_terminal());
        assert!(visited.iter().all(|stage| !stage.is_terminal()));

        let record = run.into_result().unwrap();
        assert_eq!(record.supply, 1_000_000_000);
        assert_eq!(record.supply.to_string(), "1000000000");
        assert_eq!(record.mint_authority.as_deref(), Some(wallet.public_identifier()));
        assert_eq!(record.freeze_authority, None);
        assert_eq!(state.tokens(), vec![record]);
        assert!(gateway.calls().contains(&"mint_to".to_string()));
    }

    #[tokio::test]
    async fn test_insufficient_funds_stops_before_mint() {
        let (state, gateway, engine, wallet) = setup(MockTokenGateway::new(3_000_000));
        let run = engine.create_token(&params(&wallet)).await;

        assert!(matches!(run.final_stage(), WorkflowStage::Failed(_)));
        assert!(run.final_stage().is_terminal());
        assert_eq!(run.stages().iter().filter(|stage| stage.is_terminal()).count(), 1);
        assert_eq!(
            run.outcome().as_ref().unwrap_err(),
            &Error::InsufficientFunds { required: 4_400_000, available: 3_000_000 }
        );
        assert!(!gateway.calls().contains(&"create_mint".to_string()));
        assert!(state.tokens().is_empty());
    }

    #[tokio::test]
    async fn test_zero_supply_skips_account_and_minting() {
        // Only mint rent and the fee buffer are required
        let (_, gateway, engine, wallet) = setup(MockTokenGateway::new(2_400_000));
        let mut params = params(&wallet);
        params.initial_supply = 0;
        params.freeze_authority = true;
        params.mint_authority = false;

        let run = engine.create_token(&params).await;
        assert_eq!(run.stages().len(), 4);
        let record = run.into_result().unwrap();
        assert_eq!(record.supply, 0);
        assert_eq!(record.freeze_authority.as_deref(), Some(wallet.public_identifier()));
        assert_eq!(record.mint_authority, None);
        assert_eq!(gateway.calls(), vec!["rent", "balance", "create_mint"]);
    }

    #[tokio::test]
    async fn test_validation_makes_no_network_calls() {
        let (_, gateway, engine, wallet) = setup(MockTokenGateway::new(5_000_000));

        let mut bad = params(&wallet);
        bad.name = "  ".to_string();
        assert!(matches!(engine.create_token(&bad).await.into_result(), Err(Error::Validation(_))));

        let mut bad = params(&wallet);
        bad.decimals = 19;
        assert!(matches!(engine.create_token(&bad).await.into_result(), Err(Error::Validation(_))));

        let mut bad = params(&wallet);
        bad.wallet_id = "solana-9-9-9".to_string();
        assert!(matches!(engine.create_token(&bad).await.into_result(), Err(Error::Validation(_))));

        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_minting_failure_reports_partial_mint() {
        let (state, _, engine, wallet) = setup(MockTokenGateway::new(5_000_000).failing_at("mint_to"));
        let run = engine.create_token(&params(&wallet)).await;

        match run.outcome() {
            Err(Error::TokenWorkflow { stage, reason }) => {
                assert_eq!(stage, "Minting");
                assert!(reason.contains("MintAddr111 exists with zero circulating supply"));
                assert!(reason.contains("request an airdrop"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(state.tokens().is_empty());
    }

    #[tokio::test]
    async fn test_mint_creation_failure_is_ambiguous() {
        let (_, gateway, engine, wallet) = setup(MockTokenGateway::new(5_000_000).failing_at("create_mint"));
        let run = engine.create_token(&params(&wallet)).await;

        assert!(matches!(
            run.outcome(),
            Err(Error::TokenWorkflow { stage, reason }) if stage == "MintCreation" && reason.contains("may have been created")
        ));
        assert!(!gateway.calls().contains(&"ata".to_string()));
    }

    #[tokio::test]
    async fn test_mint_additional_increments_supply() {
        let (state, _, engine, wallet) = setup(MockTokenGateway::new(5_000_000));
        let record = engine.create_token(&params(&wallet)).await.into_result().unwrap();

        let receipt = engine.mint_additional(wallet.id(), &record.mint_address, 500, Some("Recipient1")).await.unwrap();
        assert_eq!(receipt.amount, 500_000_000);
        assert_eq!(receipt.token_account, "ata-Recipient1");
        assert_eq!(state.tokens()[0].supply, 1_500_000_000);

        assert!(matches!(
            engine.mint_additional(wallet.id(), &record.mint_address, 0, None).await,
            Err(Error::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_ethereum_wallet_cannot_issue_tokens() {
        let (state, _, engine, _) = setup(MockTokenGateway::new(5_000_000));
        let eth = state.create_wallet(Chain::Ethereum).unwrap();
        assert!(matches!(engine.create_token(&params(&eth)).await.into_result(), Err(Error::Validation(_))));
    }
}
