//! Account identity: address normalization and find-or-create.

use crate::entity::Account;
use crate::store::{EntityStore, StoreError};
use alloy::primitives::Address;

/// Canonical account key: trimmed, lowercase, `0x`-prefixed hex.
pub fn normalize_address(address: &str) -> String {
    let s = address.trim().to_ascii_lowercase();
    match s.strip_prefix("0x") {
        Some(_) => s,
        None => format!("0x{}", s),
    }
}

/// Lowercase `0x` hex rendering of a 20-byte address.
pub fn address_key(address: &Address) -> String {
    format!("0x{}", hex::encode(address))
}

/// Returns the Account for `address`, creating and persisting it on first sight.
pub fn resolve<S: EntityStore>(store: &mut S, address: &str) -> Result<Account, StoreError> {
    let id = normalize_address(address);
    if let Some(account) = store.load::<Account>(&id)? {
        return Ok(account);
    }
    let account = Account::new(id);
    store.save(&account)?;
    tracing::debug!(account = %account.id, "account created");
    Ok(account)
}
