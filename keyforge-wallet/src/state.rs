//! Application state shared by every component
//!
//! [`StateHandle`] owns the current mnemonic, the wallet registry and the
//! token records. It is cloned into whichever component needs it; every
//! mutation is applied under a short write lock and then persisted to the
//! durable store before the lock is released. No lock is ever held across
//! an `.await`.
//!
//! Persisting is synchronous file I/O under the write lock, so concurrent
//! refreshes serialize on the store and each write briefly occupies a
//! runtime worker. A single writer at a time is the intended model; a
//! store with expensive writes should be wrapped rather than awaited here.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::account::{ResetScope, Wallet, WalletRegistry};
use crate::crypto::keys::Chain;
use crate::crypto::mnemonic::{MnemonicPhrase, MnemonicStrength, Seed};
use crate::error::{Error, Result};
use crate::store::{KeyValueStore, MemoryStore, STATE_KEY};
use crate::token::{AirdropStatus, TokenRecord, UserTokenBalance};

/// Everything that survives a restart
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletState {
    #[serde(default)]
    pub mnemonic: Option<MnemonicPhrase>,
    #[serde(default)]
    pub registry: WalletRegistry,
    #[serde(default)]
    pub tokens: Vec<TokenRecord>,
    #[serde(default)]
    pub token_balances: Vec<UserTokenBalance>,
    #[serde(default)]
    pub airdrop: AirdropStatus,
}

impl WalletState {
    pub fn token(&self, mint: &str) -> Option<&TokenRecord> {
        self.tokens.iter().find(|t| t.mint_address == mint)
    }

    fn start_epoch(&mut self, mnemonic: Option<MnemonicPhrase>) {
        self.mnemonic = mnemonic;
        self.registry.reset(ResetScope::All);
        self.token_balances.clear();
        self.airdrop = AirdropStatus::Idle;
    }
}

struct Inner {
    state: RwLock<WalletState>,
    store: Arc<dyn KeyValueStore>,
}

/// Cheaply cloneable handle to the application state
#[derive(Clone)]
pub struct StateHandle {
    inner: Arc<Inner>,
}

impl StateHandle {
    /// Rehydrate from `store`, starting empty when nothing was saved yet
    pub fn open(store: Arc<dyn KeyValueStore>) -> Result<Self> {
        let state = match store.load(STATE_KEY)? {
            Some(blob) => serde_json::from_str(&blob)
                .map_err(|e| Error::Storage(format!("Stored state is unreadable: {}", e)))?,
            None => WalletState::default(),
        };
        Ok(Self {
            inner: Arc::new(Inner { state: RwLock::new(state), store }),
        })
    }

    /// Fresh state backed by a [`MemoryStore`]
    pub fn in_memory() -> Self {
        Self {
            inner: Arc::new(Inner {
                state: RwLock::new(WalletState::default()),
                store: Arc::new(MemoryStore::new()),
            }),
        }
    }

    /// Run `f` against a read-locked view
    pub fn read<R>(&self, f: impl FnOnce(&WalletState) -> R) -> R {
        f(&self.inner.state.read())
    }

    /// Apply `f` under the write lock, then persist the whole state
    ///
    /// The mutation stays applied in memory even if persisting fails.
    pub fn mutate<R>(&self, f: impl FnOnce(&mut WalletState) -> R) -> Result<R> {
        let mut state = self.inner.state.write();
        let result = f(&mut state);
        self.persist(&state)?;
        Ok(result)
    }

    fn persist(&self, state: &WalletState) -> Result<()> {
        let blob = serde_json::to_string(state)?;
        self.inner.store.save(STATE_KEY, &blob).map_err(|e| {
            warn!(error = %e, "Failed to persist wallet state");
            e
        })
    }

    pub fn snapshot(&self) -> WalletState {
        self.read(|s| s.clone())
    }

    pub fn mnemonic(&self) -> Option<MnemonicPhrase> {
        self.read(|s| s.mnemonic.clone())
    }

    /// Replace the mnemonic with a freshly generated one and clear both registries
    pub fn generate_mnemonic(&self, strength: MnemonicStrength) -> Result<MnemonicPhrase> {
        let phrase = MnemonicPhrase::generate(strength)?;
        self.mutate(|s| s.start_epoch(Some(phrase.clone())))?;
        info!(words = phrase.word_count(), "Generated new mnemonic");
        Ok(phrase)
    }

    /// Adopt an existing phrase as the current mnemonic
    pub fn import_mnemonic(&self, phrase: &str) -> Result<MnemonicPhrase> {
        let phrase = MnemonicPhrase::parse(phrase)?;
        self.mutate(|s| s.start_epoch(Some(phrase.clone())))?;
        info!(words = phrase.word_count(), "Imported mnemonic");
        Ok(phrase)
    }

    /// Forget the mnemonic and every derived wallet; token records are kept
    pub fn reset(&self) -> Result<()> {
        self.mutate(|s| s.start_epoch(None))?;
        info!("Wallet state reset");
        Ok(())
    }

    /// Clear wallets for one chain or both, keeping the mnemonic
    pub fn reset_wallets(&self, scope: ResetScope) -> Result<()> {
        self.mutate(|s| s.registry.reset(scope))
    }

    /// Seed of the current mnemonic
    pub fn seed(&self) -> Result<Seed> {
        current_seed(&self.inner.state.read())
    }

    /// Derive the next wallet for `chain`
    ///
    /// Index allocation and derivation happen under one write lock, so
    /// concurrent callers never share an index.
    pub fn create_wallet(&self, chain: Chain) -> Result<Wallet> {
        let mut state = self.inner.state.write();
        let seed = current_seed(&state)?;
        let wallet = state.registry.create_next(chain, &seed)?;
        self.persist(&state)?;
        info!(chain = %chain, index = wallet.index(), address = %wallet.public_identifier(), "Wallet added");
        Ok(wallet)
    }

    pub fn wallet(&self, id: &str) -> Option<Wallet> {
        self.read(|s| s.registry.get(id).cloned())
    }

    pub fn wallets(&self, chain: Chain) -> Vec<Wallet> {
        self.read(|s| s.registry.wallets(chain).to_vec())
    }

    pub fn tokens(&self) -> Vec<TokenRecord> {
        self.read(|s| s.tokens.clone())
    }
}

fn current_seed(state: &WalletState) -> Result<Seed> {
    state
        .mnemonic
        .as_ref()
        .ok_or_else(|| Error::Derivation("No mnemonic has been generated".to_string()))?
        .to_seed()
}
