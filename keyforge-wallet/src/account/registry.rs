//! Ordered per-chain collection of derived wallets

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::crypto::keys::{derive, Chain};
use crate::crypto::mnemonic::Seed;
use crate::error::Result;
use super::wallet::{SyncStatus, Wallet};

/// Which registries a reset clears
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetScope {
    Chain(Chain),
    All,
}

impl ResetScope {
    fn covers(&self, chain: Chain) -> bool {
        match self {
            ResetScope::Chain(scoped) => *scoped == chain,
            ResetScope::All => true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChainWallets {
    wallets: Vec<Wallet>,
    next_index: u32,
    /// Bumped on every reset so ids never repeat within a session
    epoch: u32,
}

/// Wallets per chain, in creation order
///
/// Existing wallets are never renumbered; they are only patched by id or
/// dropped wholesale by [`WalletRegistry::reset`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WalletRegistry {
    chains: BTreeMap<Chain, ChainWallets>,
}

impl WalletRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive and store the next wallet for `chain`
    ///
    /// The index is consumed only when derivation succeeds.
    pub fn create_next(&mut self, chain: Chain, seed: &Seed) -> Result<Wallet> {
        let entry = self.chains.entry(chain).or_default();
        let index = entry.next_index;

        let key_pair = derive(seed.as_bytes(), chain, index)?;
        let id = format!("{}-{}-{}-{}", chain.tag(), entry.epoch, index, Utc::now().timestamp_millis());
        let wallet = Wallet::from_key_pair(id, index, &key_pair)?;

        entry.wallets.push(wallet.clone());
        entry.next_index += 1;

        debug!(chain = %chain, index, wallet_id = %wallet.id(), "Wallet created");
        Ok(wallet)
    }

    /// Wallets of one chain in index order
    pub fn wallets(&self, chain: Chain) -> &[Wallet] {
        self.chains.get(&chain).map(|c| c.wallets.as_slice()).unwrap_or(&[])
    }

    pub fn all(&self) -> impl Iterator<Item = &Wallet> {
        self.chains.values().flat_map(|c| c.wallets.iter())
    }

    pub fn get(&self, id: &str) -> Option<&Wallet> {
        self.all().find(|w| w.id() == id)
    }

    pub fn find_by_identifier(&self, chain: Chain, identifier: &str) -> Option<&Wallet> {
        self.wallets(chain).iter().find(|w| w.public_identifier() == identifier)
    }

    /// Next index `create_next` would assign for `chain`
    pub fn next_index(&self, chain: Chain) -> u32 {
        self.chains.get(&chain).map(|c| c.next_index).unwrap_or(0)
    }

    /// Set the native balance; returns `false` when the id no longer exists
    pub fn update_balance(&mut self, id: &str, balance: f64) -> bool {
        self.patch(id, |w| w.balance = balance.max(0.0))
    }

    pub fn update_transaction_count(&mut self, id: &str, count: u64) -> bool {
        self.patch(id, |w| w.transaction_count = count)
    }

    pub fn mark_sync_status(&mut self, id: &str, status: SyncStatus) -> bool {
        self.patch(id, |w| w.sync_status = status)
    }

    pub fn touch(&mut self, id: &str) -> bool {
        self.patch(id, |w| w.last_updated = Utc::now())
    }

    /// Clear wallets and index counters for `scope`
    pub fn reset(&mut self, scope: ResetScope) {
        for chain in Chain::ALL {
            if scope.covers(chain) {
                let entry = self.chains.entry(chain).or_default();
                entry.wallets.clear();
                entry.next_index = 0;
                entry.epoch += 1;
            }
        }
    }

    fn patch(&mut self, id: &str, apply: impl FnOnce(&mut Wallet)) -> bool {
        match self.chains.values_mut().flat_map(|c| c.wallets.iter_mut()).find(|w| w.id() == id) {
            Some(wallet) => {
                apply(wallet);
                true
            }
            None => {
                debug!(wallet_id = %id, "Update for unknown wallet dropped");
                false
            }
        }
    }
}
