//! Error types for the keyforge-wallet library

use thiserror::Error;

/// Custom error type for keyforge-wallet operations
///
/// Every payload is plain data so an error can be recorded on the entity it
/// affected (a wallet's sync status, a workflow's failure) and cloned out again.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Derivation error: {0}")]
    Derivation(String),

    #[error("Mnemonic error: {0}")]
    Mnemonic(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Insufficient funds: required {required} lamports but have {available} lamports")]
    InsufficientFunds { required: u64, available: u64 },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Funding error: {0}")]
    Funding(String),

    #[error("Token workflow failed during {stage}: {reason}")]
    TokenWorkflow { stage: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Transient failures that the caller may re-invoke unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Network(_))
    }

    /// Lamports missing for an `InsufficientFunds` failure, zero otherwise.
    pub fn shortfall(&self) -> u64 {
        match self {
            Error::InsufficientFunds { required, available } => required.saturating_sub(*available),
            _ => 0,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Network(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

/// Result type for keyforge-wallet operations
pub type Result<T> = std::result::Result<T, Error>;
