//! Key derivation and management
//!
//! This module derives chain-specific key pairs from a BIP39 seed along each
//! chain's BIP44 account path.

pub mod ethereum;
pub mod solana;
mod derivation;

pub use derivation::*;
