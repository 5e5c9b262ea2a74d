//! Ethereum key derivation

use hmac::{Hmac, Mac};
use secp256k1::{PublicKey as Secp256k1PublicKey, Scalar, Secp256k1, SecretKey};
use sha2::Sha512;

use crate::error::{Error, Result};
use super::derivation::{parse_derivation_path, Chain, KeyPair, HARDENED_OFFSET};

/// Derive an Ethereum key pair from a seed and derivation path (BIP-32, secp256k1)
pub fn derive_ethereum_key_pair(seed: &[u8], path: &str) -> Result<KeyPair> {
    // Parse the derivation path
    let path_components = parse_derivation_path(path)?;

    // Derive the master key
    let (mut secret_key, mut chain_code) = derive_master_key(seed)?;

    // Derive the child keys
    for component in path_components {
        (secret_key, chain_code) = derive_child_key(secret_key, chain_code, component)?;
    }

    key_pair_from_secret(&secret_key)
}

/// Rebuild a key pair from a raw 32-byte private key
pub(crate) fn key_pair_from_secret(bytes: &[u8]) -> Result<KeyPair> {
    let secp = Secp256k1::new();
    let secret_key = SecretKey::from_slice(bytes)
        .map_err(|e| Error::Derivation(format!("Invalid secret key: {}", e)))?;
    let public_key = Secp256k1PublicKey::from_secret_key(&secp, &secret_key);

    Ok(KeyPair::new(
        Chain::Ethereum,
        secret_key.secret_bytes().to_vec(),
        public_key.serialize_uncompressed().to_vec(),
    ))
}

/// Derive the master key from a seed
fn derive_master_key(seed: &[u8]) -> Result<([u8; 32], [u8; 32])> {
    let mut hmac = Hmac::<Sha512>::new_from_slice(b"Bitcoin seed")
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
fn derive_child_key(parent_key: [u8; 32], parent_chain_code: [u8; 32], index: u32) -> Result<([u8; 32], [u8; 32])> {
    let secp = Secp256k1::new();
    let parent_secret_key = SecretKey::from_slice(&parent_key)
        .map_err(|e| Error::Derivation(format!("Invalid parent key: {}", e)))?;

    let mut data = Vec::with_capacity(37);

    if index >= HARDENED_OFFSET {
        // Hardened derivation
        data.push(0);
        data.extend_from_slice(&parent_key);
    } else {
        // Normal derivation
        let parent_public_key = Secp256k1PublicKey::from_secret_key(&secp, &parent_secret_key);
        data.extend_from_slice(&parent_public_key.serialize());
    }

    // Append the index
    data.extend_from_slice(&index.to_be_bytes());

    // Calculate HMAC-SHA512
    let mut hmac = Hmac::<Sha512>::new_from_slice(&parent_chain_code)
        .map_err(|_| Error::Derivation("HMAC error".to_string()))?;

    hmac.update(&data);
    let result = hmac.finalize().into_bytes();

    let mut child_chain_code = [0u8; 32];
    child_chain_code.copy_from_slice(&result[32..64]);

    // Add the parent key to the child key (mod n)
    let child_secret_key = SecretKey::from_slice(&result[0..32])
        .map_err(|e| Error::Derivation(format!("Invalid child key: {}", e)))?;

    let child_secret_key = child_secret_key
        .add_tweak(&Scalar::from(parent_secret_key))
        .map_err(|e| Error::Derivation(format!("Key addition error: {}", e)))?;

    Ok((child_secret_key.secret_bytes(), child_chain_code))
}

/// Get the EIP-55 checksummed Ethereum address from an uncompressed public key
pub fn public_key_to_address(public_key: &[u8]) -> Result<String> {
    // The public key should be in uncompressed format (65 bytes)
    if public_key.len() != 65 {
        return Err(Error::Derivation("Invalid Ethereum public key length".to_string()));
    }

    // Skip the first byte (0x04) and hash the rest
    let key_hash = keccak256(&public_key[1..]);

    // Take the last 20 bytes of the hash
    Ok(to_checksum_address(&key_hash[12..]))
}

/// EIP-55 mixed-case encoding of a 20-byte address
pub fn to_checksum_address(address: &[u8]) -> String {
    let lower = hex::encode(address);
    let hash = keccak256(lower.as_bytes());

    let checksummed: String = lower
        .chars()
        .enumerate()
        .map(|(i, c)| {
            let nibble = (hash[i / 2] >> if i % 2 == 0 { 4 } else { 0 }) & 0x0f;
            if c.is_ascii_alphabetic() && nibble >= 8 {
                c.to_ascii_uppercase()
            } else {
                c
            }
        })
        .collect();

    format!("0x{}", checksummed)
}

/// Calculate the Keccak-256 hash of data
fn keccak256(data: &[u8]) -> [u8; 32] {
    use sha3::{Digest, Keccak256};
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}
