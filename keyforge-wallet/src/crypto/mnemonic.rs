//! Mnemonic phrase generation and seed conversion

use std::fmt;

use bip39::Mnemonic;
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Length of a BIP39 seed in bytes
pub const SEED_LEN: usize = 64;

/// Supported mnemonic strengths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MnemonicStrength {
    /// 12 words (128 bits)
    #[default]
    Words12,
    /// 24 words (256 bits)
    Words24,
}

impl MnemonicStrength {
    /// Get entropy length in bytes
    fn entropy_bytes(&self) -> usize {
        match self {
            Self::Words12 => 16, // 128 bits = 16 bytes
            Self::Words24 => 32, // 256 bits = 32 bytes
        }
    }
}

/// A validated BIP39 phrase.
///
/// Immutable once created; a new epoch replaces it wholesale.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MnemonicPhrase(String);

impl MnemonicPhrase {
    /// Generate a fresh phrase from OS entropy
    pub fn generate(strength: MnemonicStrength) -> Result<Self> {
        generate_mnemonic(strength).map(Self)
    }

    /// Parse and normalize an existing phrase
    pub fn parse(phrase: &str) -> Result<Self> {
        let mnemonic = Mnemonic::parse_normalized(phrase.trim())
            .map_err(|e| Error::Mnemonic(e.to_string()))?;
        Ok(Self(mnemonic.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn word_count(&self) -> usize {
        self.0.split_whitespace().count()
    }

    /// Convert the phrase to its 64-byte seed (empty passphrase)
    pub fn to_seed(&self) -> Result<Seed> {
        let bytes = mnemonic_to_seed(&self.0, None)?;
        Seed::from_slice(&bytes)
    }
}

impl fmt::Debug for MnemonicPhrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MnemonicPhrase({} words)", self.word_count())
    }
}

/// BIP39 seed, recomputed from the mnemonic for every derivation
#[derive(Clone, PartialEq, Eq)]
pub struct Seed([u8; SEED_LEN]);

impl Seed {
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let array: [u8; SEED_LEN] = bytes
            .try_into()
            .map_err(|_| Error::Derivation(format!("Seed must be {} bytes, got {}", SEED_LEN, bytes.len())))?;
        Ok(Self(array))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Seed(..)")
    }
}

/// Generate a new random mnemonic phrase with the specified strength
pub fn generate_mnemonic(strength: MnemonicStrength) -> Result<String> {
    let mut entropy = vec![0u8; strength.entropy_bytes()];
    OsRng.fill_bytes(&mut entropy);

    let mnemonic = Mnemonic::from_entropy(&entropy)
        .map_err(|e| Error::Mnemonic(e.to_string()))?;

    Ok(mnemonic.to_string())
}

/// Validate a mnemonic phrase
pub fn validate_mnemonic(phrase: &str) -> Result<bool> {
    match Mnemonic::parse_normalized(phrase) {
        Ok(_) => Ok(true),
        Err(e) => Err(Error::Mnemonic(e.to_string())),
    }
}

/// Generate a seed from a mnemonic phrase and optional passphrase
pub fn mnemonic_to_seed(phrase: &str, passphrase: Option<&str>) -> Result<Vec<u8>> {
    let mnemonic = Mnemonic::parse_normalized(phrase)
        .map_err(|e| Error::Mnemonic(e.to_string()))?;

    let seed = mnemonic.to_seed(passphrase.unwrap_or(""));
    Ok(seed.to_vec())
}
