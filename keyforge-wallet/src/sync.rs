//! Balance and transaction-count synchronization
//!
//! Each refresh issues one balance read and one transaction-count read for a
//! wallet, concurrently, and writes each result back the moment it arrives.
//! The two reads are independent: either may fail without affecting the
//! other. Overlapping refreshes of the same wallet are not ordered against
//! each other, so whichever read completes last determines the stored value.

use std::sync::Arc;

use futures::future::join_all;
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

use crate::account::{SyncStatus, WalletRegistry};
use crate::crypto::keys::Chain;
use crate::error::{Error, Result};
use crate::provider::ChainGateway;
use crate::state::StateHandle;

/// What one refresh observed, whether or not it could be applied
#[derive(Debug, Clone, PartialEq)]
pub struct SyncOutcome {
    pub wallet_id: String,
    pub balance: Result<f64>,
    pub transaction_count: Result<u64>,
}

impl SyncOutcome {
    pub fn is_complete(&self) -> bool {
        self.balance.is_ok() && self.transaction_count.is_ok()
    }
}

#[derive(Clone)]
pub struct WalletSyncCoordinator {
    state: StateHandle,
    gateway: Arc<dyn ChainGateway>,
}

impl WalletSyncCoordinator {
    pub fn new(state: StateHandle, gateway: Arc<dyn ChainGateway>) -> Self {
        Self { state, gateway }
    }

    /// Refresh a single wallet
    ///
    /// Fails only when `wallet_id` is unknown at the start. Results arriving
    /// after the wallet has been cleared by a reset are dropped.
    #[instrument(skip(self))]
    pub async fn refresh_wallet(&self, wallet_id: &str) -> Result<SyncOutcome> {
        let (chain, address) = self
            .state
            .read(|s| s.registry.get(wallet_id).map(|w| (w.chain(), w.public_identifier().to_string())))
            .ok_or_else(|| Error::Validation(format!("Unknown wallet: {}", wallet_id)))?;

        self.apply(|r| r.mark_sync_status(wallet_id, SyncStatus::Loading));

        let (balance, transaction_count) = tokio::join!(
            self.sync_balance(wallet_id, chain, &address),
            self.sync_transaction_count(wallet_id, chain, &address),
        );

        Ok(SyncOutcome { wallet_id: wallet_id.to_string(), balance, transaction_count })
    }

    /// Refresh every wallet still marked `Loading`, all in parallel
    pub async fn refresh_pending(&self) -> Vec<SyncOutcome> {
        let ids = self.state.read(|s| {
            s.registry
                .all()
                .filter(|w| w.sync_status.is_loading())
                .map(|w| w.id().to_string())
                .collect::<Vec<_>>()
        });
        self.refresh_many(ids).await
    }

    /// Refresh every wallet of `chain`, or of both chains when `None`
    pub async fn refresh_all(&self, chain: Option<Chain>) -> Vec<SyncOutcome> {
        let ids = self.state.read(|s| {
            s.registry
                .all()
                .filter(|w| chain.map_or(true, |c| w.chain() == c))
                .map(|w| w.id().to_string())
                .collect::<Vec<_>>()
        });
        self.refresh_many(ids).await
    }

    /// Fire-and-forget refresh on the runtime
    pub fn spawn_refresh(&self, wallet_id: String) -> JoinHandle<()> {
        let coordinator = self.clone();
        tokio::spawn(async move {
            if let Err(e) = coordinator.refresh_wallet(&wallet_id).await {
                debug!(wallet_id = %wallet_id, error = %e, "Background refresh skipped");
            }
        })
    }

    async fn refresh_many(&self, ids: Vec<String>) -> Vec<SyncOutcome> {
        let outcomes = join_all(ids.iter().map(|id| self.refresh_wallet(id))).await;
        outcomes.into_iter().filter_map(|o| o.ok()).collect()
    }

    async fn sync_balance(&self, wallet_id: &str, chain: Chain, address: &str) -> Result<f64> {
        let result = self.gateway.get_balance(chain, address).await;
        match &result {
            Ok(balance) => self.apply(|r| {
                r.update_balance(wallet_id, *balance);
                r.mark_sync_status(wallet_id, SyncStatus::Idle);
                r.touch(wallet_id)
            }),
            Err(e) => {
                warn!(wallet_id, chain = %chain, error = %e, "Balance fetch failed");
                self.apply(|r| {
                    r.mark_sync_status(wallet_id, SyncStatus::Error(e.to_string()));
                    r.touch(wallet_id)
                })
            }
        }
        result
    }

    async fn sync_transaction_count(&self, wallet_id: &str, chain: Chain, address: &str) -> Result<u64> {
        let result = self.gateway.get_transaction_count(chain, address).await;
        match &result {
            Ok(count) => self.apply(|r| {
                r.update_transaction_count(wallet_id, *count);
                r.touch(wallet_id)
            }),
            Err(e) => {
                warn!(wallet_id, chain = %chain, error = %e, "Transaction count fetch failed");
            }
        }
        result
    }

    fn apply(&self, patch: impl FnOnce(&mut WalletRegistry) -> bool) {
        match self.state.mutate(|s| patch(&mut s.registry)) {
            Ok(true) => {}
            Ok(false) => debug!("Sync result for a cleared wallet dropped"),
            Err(e) => warn!(error = %e, "Sync result applied but not persisted"),
        }
    }
}
