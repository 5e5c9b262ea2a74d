//! Keyforge Wallet - HD wallet core for Solana and Ethereum
//!
//! This library derives Solana (Ed25519) and Ethereum (secp256k1) accounts
//! from a single BIP39 mnemonic, keeps their balances and transaction counts
//! in sync over JSON-RPC, and drives SPL token issuance and faucet requests
//! on a test network.

pub mod error;
pub mod crypto;
pub mod account;
pub mod provider;
pub mod config;
pub mod store;
pub mod state;
pub mod sync;
pub mod token;

// Re-export commonly used types for convenience
pub use error::{Error, Result};
pub use config::Config;
pub use state::{StateHandle, WalletState};
pub use sync::WalletSyncCoordinator;
pub use token::TokenWorkflowEngine;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
