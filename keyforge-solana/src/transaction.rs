//! Local transaction assembly and signing

use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use solana_sdk::{
    hash::Hash,
    instruction::Instruction,
    pubkey::Pubkey,
    signature::Keypair,
    signer::signers::Signers,
    transaction::Transaction,
};

use keyforge_wallet::crypto::keys::{Chain, KeyPair};
use keyforge_wallet::error::{Error, Result};

/// Convert a derived Solana key pair into a signing keypair
pub fn to_signer(key_pair: &KeyPair) -> Result<Keypair> {
    if key_pair.chain() != Chain::Solana {
        return Err(Error::Validation(format!("{} key cannot sign Solana transactions", key_pair.chain())));
    }
    Keypair::from_bytes(key_pair.secret_bytes())
        .map_err(|e| Error::Derivation(format!("Invalid Solana keypair: {}", e)))
}

pub fn parse_pubkey(address: &str) -> Result<Pubkey> {
    Pubkey::from_str(address).map_err(|e| Error::Validation(format!("Invalid Solana address {}: {}", address, e)))
}

pub fn parse_blockhash(blockhash: &str) -> Result<Hash> {
    Hash::from_str(blockhash).map_err(|e| Error::Protocol(format!("Invalid blockhash {}: {}", blockhash, e)))
}

/// Build a transaction paid for by `payer` and sign it with every keypair in `signers`
pub fn build_signed_transaction<S: Signers>(
    instructions: &[Instruction],
    payer: &Pubkey,
    signers: &S,
    blockhash: Hash,
) -> Result<Transaction> {
    let mut transaction = Transaction::new_with_payer(instructions, Some(payer));
    transaction
        .try_sign(signers, blockhash)
        .map_err(|e| Error::Protocol(format!("Failed to sign transaction: {}", e)))?;
    Ok(transaction)
}

/// Wire encoding accepted by `sendTransaction` with `encoding: base64`
pub fn encode_transaction(transaction: &Transaction) -> Result<String> {
    let serialized = bincode::serialize(transaction)
        .map_err(|e| Error::Serialization(format!("Failed to serialize transaction: {}", e)))?;
    Ok(STANDARD.encode(serialized))
}
