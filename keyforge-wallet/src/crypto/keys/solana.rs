//! Solana key derivation

use ed25519_dalek::{PublicKey as Ed25519PublicKey, SecretKey};
use hmac::{Hmac, Mac};
use sha2::Sha512;

use crate::error::{Error, Result};
use super::derivation::{parse_derivation_path, Chain, KeyPair, HARDENED_OFFSET};

/// Derive a Solana key pair from a seed and derivation path (SLIP-0010, Ed25519)
pub fn derive_solana_key_pair(seed: &[u8], path: &str) -> Result<KeyPair> {
    // Parse the derivation path
    let path_components = parse_derivation_path(path)?;

    // Derive the master key
    let (mut secret_key, mut chain_code) = derive_master_key(seed)?;

    // Derive the child keys
    for component in path_components {
        (secret_key, chain_code) = derive_child_key(secret_key, chain_code, component)?;
    }

    // The derived 32 bytes seed the Ed25519 signing key
    key_pair_from_seed(&secret_key)
}

/// Build the 64-byte secret||public key pair from a 32-byte Ed25519 seed
fn key_pair_from_seed(seed: &[u8; 32]) -> Result<KeyPair> {
    let secret = SecretKey::from_bytes(seed)
        .map_err(|e| Error::Derivation(format!("Invalid Ed25519 seed: {}", e)))?;
    let public = Ed25519PublicKey::from(&secret);

    let mut keypair = Vec::with_capacity(64);
    keypair.extend_from_slice(secret.as_bytes());
    keypair.extend_from_slice(public.as_bytes());

    Ok(KeyPair::new(Chain::Solana, keypair, public.to_bytes().to_vec()))
}

/// Rebuild a key pair from a stored 64-byte secret key
pub(crate) fn key_pair_from_secret(bytes: &[u8]) -> Result<KeyPair> {
    if bytes.len() != 64 {
        return Err(Error::Derivation(format!("Solana secret key must be 64 bytes, got {}", bytes.len())));
    }
    let mut seed = [0u8; 32];
    seed.copy_from_slice(&bytes[..32]);
    let key_pair = key_pair_from_seed(&seed)?;

    if key_pair.public_bytes() != &bytes[32..] {
        return Err(Error::Derivation("Solana secret key does not match its public half".to_string()));
    }
    Ok(key_pair)
}

/// Derive the master key from a seed
fn derive_master_key(seed: &[u8]) -> Result<([u8; 32], [u8; 32])> {
    let mut hmac = Hmac::<Sha512>::new_from_slice(b"ed25519 seed")
        .map_err(|_| Error::Derivation("HMAC error".to_string()))?;

    hmac.update(seed);
    let result = hmac.finalize().into_bytes();

    let mut secret_key = [0u8; 32];
    let mut chain_code = [0u8; 32];

    secret_key.copy_from_slice(&result[0..32]);
    chain_code.copy_from_slice(&result[32..64]);

    Ok((secret_key, chain_code))
}

/// Derive a child key from a parent key
///
/// SLIP-0010 defines only hardened children for Ed25519.
fn derive_child_key(parent_key: [u8; 32], parent_chain_code: [u8; 32], index: u32) -> Result<([u8; 32], [u8; 32])> {
    if index < HARDENED_OFFSET {
        return Err(Error::Derivation(format!("Ed25519 derivation requires hardened indices, got {}", index)));
    }

    let mut data = Vec::with_capacity(37);
    data.push(0);
    data.extend_from_slice(&parent_key);
    data.extend_from_slice(&index.to_be_bytes());

    // Calculate HMAC-SHA512
    let mut hmac = Hmac::<Sha512>::new_from_slice(&parent_chain_code)
        .map_err(|_| Error::Derivation("HMAC error".to_string()))?;

    hmac.update(&data);
    let result = hmac.finalize().into_bytes();

    let mut child_key = [0u8; 32];
    let mut child_chain_code = [0u8; 32];

    child_key.copy_from_slice(&result[0..32]);
    child_chain_code.copy_from_slice(&result[32..64]);

    Ok((child_key, child_chain_code))
}

/// Get the Solana address from a public key
pub fn public_key_to_address(public_key: &[u8]) -> Result<String> {
    // The public key should be 32 bytes
    if public_key.len() != 32 {
        return Err(Error::Derivation("Invalid Solana public key length".to_string()));
    }

    // Encode the public key as base58
    Ok(bs58::encode(public_key).into_string())
}
