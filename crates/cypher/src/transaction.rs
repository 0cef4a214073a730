//! EscrowTransaction projection: creation on AmountStopped, then one terminal status.
//!
//! Creation requires a shell record stored under the escrow contract address. The shell
//! is a gate only: each AmountStopped writes a new record with storage key
//! `{escrow}-{block}-{log_index}` and records the correlation key in a [TransactionKey]
//! index entry. TransactionAccepted / TransactionDenied quote the correlation key and
//! reach the record through that index. Every lookup miss is a skip.
//!
//! Creation writes the index entry before the record. If a save fails, the index may point at
//! a record that does not exist yet, which lookups treat as a miss; the projector does not
//! advance its cursor, and applying the same log again completes both writes.

use crate::abi::{AmountStopped, EventContext, TransactionAccepted, TransactionDenied};
use crate::entity::{EscrowTransaction, TransactionKey, TransactionStatus};
use crate::id::{normalize_key, transaction_key_for};
use crate::identity::{address_key, resolve};
use crate::projector::{Outcome, ProjectionError, SkipReason};
use crate::store::{EntityStore, StoreError};
use alloy::primitives::{Address, B256};

/// Store the shell record for `escrow` unless one already exists.
pub fn seed_shell<S: EntityStore>(
    store: &mut S,
    escrow: &Address,
) -> Result<EscrowTransaction, StoreError> {
    let id = address_key(escrow);
    if let Some(shell) = store.load::<EscrowTransaction>(&id)? {
        return Ok(shell);
    }
    let shell = EscrowTransaction::shell(id);
    store.save(&shell)?;
    Ok(shell)
}

/// Look up a transaction by its correlation key.
pub fn find_by_key<S: EntityStore>(
    store: &S,
    key: &str,
) -> Result<Option<EscrowTransaction>, StoreError> {
    let Some(entry) = store.load::<TransactionKey>(&normalize_key(key))? else {
        return Ok(None);
    };
    store.load::<EscrowTransaction>(&entry.transaction)
}

pub fn handle_amount_stopped<S: EntityStore>(
    store: &mut S,
    ctx: &EventContext,
    ev: &AmountStopped,
) -> Result<Outcome, ProjectionError> {
    let escrow = address_key(&ctx.address);
    if store.load::<EscrowTransaction>(&escrow)?.is_none() {
        tracing::debug!(%escrow, "AmountStopped without shell record, skipping");
        return Ok(Outcome::Skipped(SkipReason::MissingShell));
    }

    let key = transaction_key_for(ev.origin, ev.protocol, ev.dst, ev.counter);
    let origin = resolve(store, &address_key(&ev.origin))?;
    let dst = resolve(store, &address_key(&ev.dst))?;

    let tx = EscrowTransaction {
        id: format!("{}-{}-{}", escrow, ctx.block_number, ctx.log_index),
        key: Some(key.clone()),
        escrow: Some(escrow),
        origin: Some(origin.id),
        dst: Some(dst.id),
        protocol: Some(address_key(&ev.protocol)),
        token: Some(address_key(&ev.tokenContract)),
        amount: Some(ev.amount),
        counter: Some(ev.counter),
        status: Some(TransactionStatus::Pending),
    };

    match store.load::<TransactionKey>(&key)? {
        Some(previous) if previous.transaction != tx.id => {
            tracing::warn!(%key, previous = %previous.transaction, "correlation key reassigned");
        }
        _ => {}
    }
    store.save(&TransactionKey {
        id: key.clone(),
        transaction: tx.id.clone(),
    })?;
    store.save(&tx)?;
    tracing::info!(id = %tx.id, %key, "escrow transaction pending");
    Ok(Outcome::Applied)
}

pub fn handle_transaction_accepted<S: EntityStore>(
    store: &mut S,
    _ctx: &EventContext,
    ev: &TransactionAccepted,
) -> Result<Outcome, ProjectionError> {
    set_terminal_status(store, &ev.key, TransactionStatus::Accepted)
}

pub fn handle_transaction_denied<S: EntityStore>(
    store: &mut S,
    _ctx: &EventContext,
    ev: &TransactionDenied,
) -> Result<Outcome, ProjectionError> {
    set_terminal_status(store, &ev.key, TransactionStatus::Denied)
}

// Not guarded: a second terminal event overwrites the first.
fn set_terminal_status<S: EntityStore>(
    store: &mut S,
    key: &B256,
    status: TransactionStatus,
) -> Result<Outcome, ProjectionError> {
    let key = format!("0x{}", hex::encode(key));
    let Some(entry) = store.load::<TransactionKey>(&key)? else {
        tracing::debug!(%key, ?status, "terminal event for unknown key, skipping");
        return Ok(Outcome::Skipped(SkipReason::MissingTransaction));
    };
    let Some(mut tx) = store.load::<EscrowTransaction>(&entry.transaction)? else {
        tracing::debug!(%key, id = %entry.transaction, "indexed transaction missing, skipping");
        return Ok(Outcome::Skipped(SkipReason::MissingTransaction));
    };
    if let Some(previous) = tx.status.filter(|s| s.is_terminal()) {
        tracing::warn!(id = %tx.id, ?previous, ?status, "terminal status overwritten");
    }
    tx.status = Some(status);
    store.save(&tx)?;
    tracing::info!(id = %tx.id, ?status, "escrow transaction settled");
    Ok(Outcome::Applied)
}
