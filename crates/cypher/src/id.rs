//! Deterministic transaction keys.
//!
//! key = keccak256(abi.encode(origin, protocol, dst, counter)), rendered as `0x` + 64 lowercase
//! hex chars. The contract computes the same value and quotes it in TransactionAccepted and
//! TransactionDenied, so creation and terminal events meet on this key.

use alloy::primitives::{Address, U256};
use alloy::sol_types::SolValue;
use sha3::{Digest, Keccak256};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodeError {
    #[error("invalid {field} address {value:?}: {reason}")]
    InvalidAddress {
        field: &'static str,
        value: String,
        reason: String,
    },
}

/// ABI encoding of the `(address, address, address, uint256)` tuple.
pub fn encode_key_tuple(origin: Address, protocol: Address, dst: Address, counter: U256) -> Vec<u8> {
    (origin, protocol, dst, counter).abi_encode()
}

/// Typed key derivation.
pub fn transaction_key_for(origin: Address, protocol: Address, dst: Address, counter: U256) -> String {
    let encoded = encode_key_tuple(origin, protocol, dst, counter);
    let digest = Keccak256::digest(&encoded);
    format!("0x{}", hex::encode(digest))
}

/// Canonical form of a key supplied by a caller: trimmed, lowercase, `0x`-prefixed.
pub fn normalize_key(key: &str) -> String {
    let key = key.trim().to_ascii_lowercase();
    match key.strip_prefix("0x") {
        Some(_) => key,
        None => format!("0x{}", key),
    }
}

/// Key derivation from external address strings. Fails if any address is malformed.
pub fn transaction_key(
    origin: &str,
    protocol: &str,
    dst: &str,
    counter: U256,
) -> Result<String, EncodeError> {
    let origin = parse_address("origin", origin)?;
    let protocol = parse_address("protocol", protocol)?;
    let dst = parse_address("dst", dst)?;
    Ok(transaction_key_for(origin, protocol, dst, counter))
}

fn parse_address(field: &'static str, value: &str) -> Result<Address, EncodeError> {
    let trimmed = value.trim();
    let hex_part = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    // Keys are case-insensitive.
    Address::from_str(&format!("0x{}", hex_part.to_ascii_lowercase())).map_err(|e| {
        EncodeError::InvalidAddress {
            field,
            value: value.to_string(),
            reason: e.to_string(),
        }
    })
}
