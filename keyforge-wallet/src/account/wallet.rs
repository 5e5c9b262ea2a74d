//! Wallet implementation

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::keys::{Chain, KeyPair};
use crate::error::Result;

/// Health of a wallet's balance synchronization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "message", rename_all = "lowercase")]
pub enum SyncStatus {
    Idle,
    Loading,
    /// Last balance fetch failed; a later refresh may still succeed
    Error(String),
}

impl SyncStatus {
    pub fn is_loading(&self) -> bool {
        matches!(self, SyncStatus::Loading)
    }
}

/// A derived account on one chain
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    /// Unique for the wallet's lifetime
    id: String,
    chain: Chain,
    index: u32,
    /// Base58 public key (Solana) or checksummed `0x` address (Ethereum)
    public_identifier: String,
    /// Hex secret: 64-byte keypair (Solana) or `0x` 32-byte key (Ethereum)
    private_key: String,
    /// Balance in the chain's native unit
    pub balance: f64,
    pub transaction_count: u64,
    pub sync_status: SyncStatus,
    pub last_updated: DateTime<Utc>,
}

impl Wallet {
    /// Create a wallet from a freshly derived key pair; it starts out `Loading`
    pub(crate) fn from_key_pair(id: String, index: u32, key_pair: &KeyPair) -> Result<Self> {
        Ok(Self {
            id,
            chain: key_pair.chain(),
            index,
            public_identifier: key_pair.public_identifier()?,
            private_key: key_pair.private_key_hex(),
            balance: 0.0,
            transaction_count: 0,
            sync_status: SyncStatus::Loading,
            last_updated: Utc::now(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn chain(&self) -> Chain {
        self.chain
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn public_identifier(&self) -> &str {
        &self.public_identifier
    }

    /// Hex-encoded secret key material
    pub fn private_key(&self) -> &str {
        &self.private_key
    }

    /// Rebuild the signing key pair from the stored secret
    pub fn key_pair(&self) -> Result<KeyPair> {
        KeyPair::from_private_key_hex(self.chain, &self.private_key)
    }
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("id", &self.id)
            .field("chain", &self.chain)
            .field("index", &self.index)
            .field("public_identifier", &self.public_identifier)
            .field("balance", &self.balance)
            .field("transaction_count", &self.transaction_count)
            .field("sync_status", &self.sync_status)
            .field("last_updated", &self.last_updated)
            .finish_non_exhaustive()
    }
}
