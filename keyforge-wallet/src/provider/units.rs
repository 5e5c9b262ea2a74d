//! Native unit conversions

use crate::error::{Error, Result};

/// Lamports per SOL
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Wei per ETH
pub const WEI_PER_ETH: u128 = 1_000_000_000_000_000_000;

pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}

/// Convert a SOL amount to lamports, rejecting negative or non-finite input
pub fn sol_to_lamports(sol: f64) -> Result<u64> {
    if !sol.is_finite() || sol < 0.0 {
        return Err(Error::Validation(format!("Invalid SOL amount: {}", sol)));
    }
    let lamports = (sol * LAMPORTS_PER_SOL as f64).round();
    if lamports > u64::MAX as f64 {
        return Err(Error::Validation(format!("SOL amount too large: {}", sol)));
    }
    Ok(lamports as u64)
}

pub fn wei_to_eth(wei: u128) -> f64 {
    wei as f64 / WEI_PER_ETH as f64
}

/// Parse an Ethereum JSON-RPC hex quantity such as `0x1bc16d674ec80000`
pub fn parse_hex_quantity(quantity: &str) -> Result<u128> {
    let digits = quantity
        .strip_prefix("0x")
        .or_else(|| quantity.strip_prefix("0X"))
        .ok_or_else(|| Error::Protocol(format!("Quantity is not 0x-prefixed: {}", quantity)))?;
    if digits.is_empty() {
        return Err(Error::Protocol("Empty hex quantity".to_string()));
    }
    u128::from_str_radix(digits, 16)
        .map_err(|e| Error::Protocol(format!("Invalid hex quantity {}: {}", quantity, e)))
}

/// `amount × 10^decimals` in base units
pub fn to_base_units(amount: u64, decimals: u8) -> Result<u64> {
    10u64
        .checked_pow(decimals as u32)
        .and_then(|scale| amount.checked_mul(scale))
        .ok_or_else(|| Error::Validation(format!("{} with {} decimals overflows a u64 amount", amount, decimals)))
}
