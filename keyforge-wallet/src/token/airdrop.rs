//! Test-network faucet requests

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

use crate::config::{DEFAULT_AIRDROP_SETTLE_MS, DEFAULT_CONFIRM_TIMEOUT_SECS};
use crate::crypto::keys::Chain;
use crate::error::{Error, Result};
use crate::provider::{lamports_to_sol, sol_to_lamports};
use crate::state::StateHandle;
use crate::sync::WalletSyncCoordinator;
use super::{AirdropStatus, TokenGateway};

/// A confirmed airdrop
#[derive(Debug)]
pub struct AirdropReceipt {
    pub signature: String,
    /// Payer balance in SOL read right after confirmation
    pub balance: f64,
    /// Delayed wallet refresh, when a coordinator is attached
    pub refresh: Option<JoinHandle<()>>,
}

pub struct AirdropService {
    state: StateHandle,
    gateway: Arc<dyn TokenGateway>,
    sync: Option<WalletSyncCoordinator>,
    confirm_timeout: Duration,
    settle_delay: Duration,
}

impl AirdropService {
    pub fn new(state: StateHandle, gateway: Arc<dyn TokenGateway>) -> Self {
        Self {
            state,
            gateway,
            sync: None,
            confirm_timeout: Duration::from_secs(DEFAULT_CONFIRM_TIMEOUT_SECS),
            settle_delay: Duration::from_millis(DEFAULT_AIRDROP_SETTLE_MS),
        }
    }

    /// Refresh the funded wallet through `sync` once the settle delay has passed
    pub fn with_sync(mut self, sync: WalletSyncCoordinator) -> Self {
        self.sync = Some(sync);
        self
    }

    pub fn with_timeouts(mut self, confirm_timeout: Duration, settle_delay: Duration) -> Self {
        self.confirm_timeout = confirm_timeout;
        self.settle_delay = settle_delay;
        self
    }

    /// Request `amount_sol` from the faucet for a Solana wallet and wait for confirmation
    ///
    /// The request moves through `Pending` to `Fulfilled` or `Rejected` in the
    /// stored [`AirdropStatus`].
    #[instrument(skip(self))]
    pub async fn request_test_funds(&self, wallet_id: &str, amount_sol: f64) -> Result<AirdropReceipt> {
        let wallet = self
            .state
            .wallet(wallet_id)
            .ok_or_else(|| Error::Validation(format!("Unknown wallet: {}", wallet_id)))?;
        if wallet.chain() != Chain::Solana {
            return Err(Error::Validation(format!("Airdrops are only available for Solana wallets, not {}", wallet_id)));
        }
        let lamports = sol_to_lamports(amount_sol)?;
        if lamports == 0 {
            return Err(Error::Validation("Airdrop amount must be greater than zero".to_string()));
        }

        self.record(AirdropStatus::Pending { wallet_id: wallet_id.to_string() });
        let address = wallet.public_identifier();

        let result = async {
            let signature = self.gateway.request_airdrop(address, lamports).await?;
            self.gateway.wait_for_confirmation(&signature, self.confirm_timeout).await?;
            let balance = lamports_to_sol(self.gateway.balance_lamports(address).await?);
            Ok::<_, Error>((signature, balance))
        }
        .await;

        match result {
            Ok((signature, balance)) => {
                info!(wallet_id, %signature, balance, "Airdrop confirmed");
                self.record(AirdropStatus::Fulfilled {
                    wallet_id: wallet_id.to_string(),
                    signature: signature.clone(),
                    balance,
                });
                let refresh = self.sync.as_ref().map(|sync| self.schedule_refresh(sync.clone(), wallet_id));
                Ok(AirdropReceipt { signature, balance, refresh })
            }
            Err(e) => {
                warn!(wallet_id, error = %e, "Airdrop failed");
                self.record(AirdropStatus::Rejected { wallet_id: wallet_id.to_string(), reason: e.to_string() });
                Err(e)
            }
        }
    }

    fn schedule_refresh(&self, sync: WalletSyncCoordinator, wallet_id: &str) -> JoinHandle<()> {
        let delay = self.settle_delay;
        let wallet_id = wallet_id.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = sync.refresh_wallet(&wallet_id).await {
                warn!(wallet_id = %wallet_id, error = %e, "Post-airdrop refresh skipped");
            }
        })
    }

    fn record(&self, status: AirdropStatus) {
        if let Err(e) = self.state.mutate(|s| s.airdrop = status) {
            warn!(error = %e, "Airdrop status not persisted");
        }
    }
}
