//! Common key derivation functionality

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// First hardened child index
pub const HARDENED_OFFSET: u32 = 0x8000_0000;

/// Supported chains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    /// Solana (Ed25519)
    Solana,
    /// Ethereum and EVM compatible chains (secp256k1)
    Ethereum,
}

impl Chain {
    pub const ALL: [Chain; 2] = [Chain::Solana, Chain::Ethereum];

    /// SLIP-44 coin type
    pub fn coin_type(&self) -> u32 {
        match self {
            Chain::Solana => 501,
            Chain::Ethereum => 60,
        }
    }

    /// Account derivation path for `index`
    ///
    /// Both chains use `m/44'/{coin}'/{index}'/0'`.
    pub fn derivation_path(&self, index: u32) -> String {
        format!("m/44'/{}'/{}'/0'", self.coin_type(), index)
    }

    /// Lowercase tag used in wallet ids
    pub fn tag(&self) -> &'static str {
        match self {
            Chain::Solana => "solana",
            Chain::Ethereum => "ethereum",
        }
    }

    /// Ticker of the native unit
    pub fn native_symbol(&self) -> &'static str {
        match self {
            Chain::Solana => "SOL",
            Chain::Ethereum => "ETH",
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Chain {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "solana" | "sol" => Ok(Chain::Solana),
            "ethereum" | "eth" => Ok(Chain::Ethereum),
            other => Err(Error::Validation(format!("Unknown chain: {}", other))),
        }
    }
}

/// Parse a BIP-32 derivation path into child indices
pub fn parse_derivation_path(path: &str) -> Result<Vec<u32>> {
    if !path.starts_with("m/") {
        return Err(Error::Derivation(format!("Invalid derivation path: {}", path)));
    }

    let components = path.trim_start_matches("m/").split('/');
    let mut result = Vec::new();

    for component in components {
        if component.is_empty() {
            continue;
        }

        let hardened = component.ends_with('\'');
        let index = component
            .trim_end_matches('\'')
            .parse::<u32>()
            .ok()
            .filter(|index| *index < HARDENED_OFFSET)
            .ok_or_else(|| Error::Derivation(format!("Invalid derivation path component: {}", component)))?;

        result.push(if hardened { HARDENED_OFFSET + index } else { index });
    }

    Ok(result)
}

/// A key pair for a specific chain
///
/// `secret` is the chain's native secret encoding: the 64-byte
/// secret||public keypair for Solana, the 32-byte private key for Ethereum.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyPair {
    chain: Chain,
    secret: Vec<u8>,
    public: Vec<u8>,
}

impl KeyPair {
    pub(crate) fn new(chain: Chain, secret: Vec<u8>, public: Vec<u8>) -> Self {
        Self { chain, secret, public }
    }

    pub fn chain(&self) -> Chain {
        self.chain
    }

    /// Raw secret key bytes
    pub fn secret_bytes(&self) -> &[u8] {
        &self.secret
    }

    /// Raw public key bytes (32-byte Ed25519 key, or 65-byte uncompressed secp256k1 key)
    pub fn public_bytes(&self) -> &[u8] {
        &self.public
    }

    /// Address / public identifier in the chain's encoding
    pub fn public_identifier(&self) -> Result<String> {
        match self.chain {
            Chain::Solana => super::solana::public_key_to_address(&self.public),
            Chain::Ethereum => super::ethereum::public_key_to_address(&self.public),
        }
    }

    /// Hex encoding of the secret, as stored on the wallet
    pub fn private_key_hex(&self) -> String {
        match self.chain {
            Chain::Solana => hex::encode(&self.secret),
            Chain::Ethereum => format!("0x{}", hex::encode(&self.secret)),
        }
    }

    /// Rebuild a key pair from its stored hex secret
    pub fn from_private_key_hex(chain: Chain, encoded: &str) -> Result<Self> {
        let bytes = hex::decode(encoded.trim_start_matches("0x"))
            .map_err(|e| Error::Derivation(format!("Invalid private key encoding: {}", e)))?;
        match chain {
            Chain::Solana => super::solana::key_pair_from_secret(&bytes),
            Chain::Ethereum => super::ethereum::key_pair_from_secret(&bytes),
        }
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("chain", &self.chain)
            .field("public", &hex::encode(&self.public))
            .finish_non_exhaustive()
    }
}

/// Derive the account key pair at `index` for `chain`
///
/// Pure: the same seed, chain and index always produce the same key pair.
pub fn derive(seed: &[u8], chain: Chain, index: u32) -> Result<KeyPair> {
    if index >= HARDENED_OFFSET {
        return Err(Error::Derivation(format!("Account index out of range: {}", index)));
    }
    derive_key_pair(seed, chain, &chain.derivation_path(index))
}

/// Derive a key pair from a seed for a specific chain along an explicit path
pub fn derive_key_pair(seed: &[u8], chain: Chain, path: &str) -> Result<KeyPair> {
    if seed.is_empty() {
        return Err(Error::Derivation("Seed is empty; generate or import a mnemonic first".to_string()));
    }
    match chain {
        Chain::Solana => super::solana::derive_solana_key_pair(seed, path),
        Chain::Ethereum => super::ethereum::derive_ethereum_key_pair(seed, path),
    }
}
