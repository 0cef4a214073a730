//! Projector: applies observed CypherEscrow logs to the entity store, one at a time, in order.
//!
//! Dispatches each [ObservedLog] to its handler in [crate::escrow] or [crate::transaction].
//! The projector keeps a [Cursor] of the last applied `(block_number, log_index)`; logs at or
//! before it are skipped so a redelivered log never appends twice. Lookup misses are
//! [Outcome::Skipped]; only store failures are errors, and a failing log does not advance
//! the cursor, so the same log can be applied again.

use crate::abi::{EscrowEvent, ObservedLog};
use crate::cursor::Cursor;
use crate::escrow::{handle_address_added_to_whitelist, handle_oracle_added, handle_time_limit_set};
use crate::store::{EntityStore, StoreError};
use crate::transaction::{
    handle_amount_stopped, handle_transaction_accepted, handle_transaction_denied,
};
use thiserror::Error;

/// Why a log was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// TimeLimitSet / AddressAddedToWhitelist before any OracleAdded.
    MissingEscrow,
    /// AmountStopped with no shell record under the escrow address.
    MissingShell,
    /// Terminal event whose key does not resolve to a transaction.
    MissingTransaction,
    /// Log at or before the cursor.
    AlreadyApplied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    Skipped(SkipReason),
}

/// Fatal for the log being applied. Addresses arrive already decoded, so key derivation
/// cannot fail here; malformed logs are rejected by [crate::abi::decode_log].
#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("entity store: {0}")]
    Store(#[from] StoreError),
}

/// Aggregate result of [Projector::apply_all].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProjectionStats {
    pub applied: usize,
    pub skipped: usize,
}

/// Owns the entity store and applies logs to it.
pub struct Projector<S> {
    store: S,
    cursor: Cursor,
}

impl<S: EntityStore> Projector<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursor: Cursor::default(),
        }
    }

    /// Resume after a known position; logs at or before it are skipped.
    pub fn with_cursor(store: S, cursor: Cursor) -> Self {
        Self { store, cursor }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Mutable store access for collaborators that own other entities (shell records, protocols).
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Apply one log.
    pub fn apply(&mut self, log: &ObservedLog) -> Result<Outcome, ProjectionError> {
        let ctx = &log.context;
        if !self.cursor.is_ahead(ctx.block_number, ctx.log_index) {
            tracing::debug!(
                block = ctx.block_number,
                log_index = ctx.log_index,
                event = log.event.name(),
                "log already applied, skipping"
            );
            return Ok(Outcome::Skipped(SkipReason::AlreadyApplied));
        }
        let store = &mut self.store;
        let outcome = match &log.event {
            EscrowEvent::AmountStopped(ev) => handle_amount_stopped(store, ctx, ev)?,
            EscrowEvent::TransactionAccepted(ev) => handle_transaction_accepted(store, ctx, ev)?,
            EscrowEvent::TransactionDenied(ev) => handle_transaction_denied(store, ctx, ev)?,
            EscrowEvent::OracleAdded(ev) => handle_oracle_added(store, ctx, ev)?,
            EscrowEvent::TimeLimitSet(ev) => handle_time_limit_set(store, ctx, ev)?,
            EscrowEvent::AddressAddedToWhitelist(ev) => {
                handle_address_added_to_whitelist(store, ctx, ev)?
            }
        };
        self.cursor.advance(ctx.block_number, ctx.log_index);
        Ok(outcome)
    }

    /// Apply logs in the given order. Stops at the first error.
    pub fn apply_all<'a, I>(&mut self, logs: I) -> Result<ProjectionStats, ProjectionError>
    where
        I: IntoIterator<Item = &'a ObservedLog>,
    {
        let mut stats = ProjectionStats::default();
        for log in logs {
            match self.apply(log) {
                Ok(Outcome::Applied) => stats.applied += 1,
                Ok(Outcome::Skipped(_)) => stats.skipped += 1,
                Err(e) => {
                    tracing::warn!(
                        reason = %e,
                        block = log.context.block_number,
                        log_index = log.context.log_index,
                        "projection failed"
                    );
                    return Err(e);
                }
            }
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::{AmountStopped, EventContext, OracleAdded, TimeLimitSet};
    use crate::entity::{Entity, EntityKind, Escrow};
    use crate::id::transaction_key_for;
    use crate::identity::address_key;
    use crate::store::MemoryStore;
    use crate::transaction::{find_by_key, seed_shell};
    use alloy::primitives::{Address, B256, U256};

    /// MemoryStore whose saves of one entity kind fail while `failing` is set.
    struct FlakyStore {
        inner: MemoryStore,
        fail_kind: EntityKind,
        failing: bool,
    }

    impl FlakyStore {
        fn new(fail_kind: EntityKind) -> Self {
            Self {
                inner: MemoryStore::new(),
                fail_kind,
                failing: false,
            }
        }
    }

    impl EntityStore for FlakyStore {
        fn load<E: Entity>(&self, key: &str) -> Result<Option<E>, StoreError> {
            self.inner.load(key)
        }

        fn save<E: Entity>(&mut self, entity: &E) -> Result<(), StoreError> {
            if self.failing && E::KIND == self.fail_kind {
                return Err(StoreError::Serialize {
                    kind: E::KIND,
                    key: entity.key().to_string(),
                    source: <serde_json::Error as serde::ser::Error>::custom("store offline"),
                });
            }
            self.inner.save(entity)
        }
    }

    fn stopped_log(block: u64, index: u64) -> ObservedLog {
        ObservedLog {
            context: EventContext {
                address: Address::with_last_byte(0xE),
                block_number: block,
                log_index: index,
                tx_hash: B256::ZERO,
            },
            event: EscrowEvent::AmountStopped(AmountStopped {
                origin: Address::with_last_byte(0xA),
                protocol: Address::with_last_byte(0xB),
                dst: Address::with_last_byte(0xC),
                tokenContract: Address::with_last_byte(0xD),
                amount: U256::from(100),
                counter: U256::from(1),
            }),
        }
    }

    fn stopped_key() -> String {
        transaction_key_for(
            Address::with_last_byte(0xA),
            Address::with_last_byte(0xB),
            Address::with_last_byte(0xC),
            U256::from(1),
        )
    }

    fn log(block: u64, index: u64, event: EscrowEvent) -> ObservedLog {
        ObservedLog {
            context: EventContext {
                address: Address::with_last_byte(9),
                block_number: block,
                log_index: index,
                tx_hash: B256::ZERO,
            },
            event,
        }
    }

    fn oracle(b: u8) -> EscrowEvent {
        EscrowEvent::OracleAdded(OracleAdded {
            oracle: Address::with_last_byte(b),
        })
    }

    #[test]
    fn redelivered_log_is_skipped() {
        let mut p = Projector::new(MemoryStore::new());
        let l = log(1, 0, oracle(1));
        assert_eq!(p.apply(&l).unwrap(), Outcome::Applied);
        assert_eq!(p.apply(&l).unwrap(), Outcome::Skipped(SkipReason::AlreadyApplied));
        let escrow: Escrow = p.store().load(&address_key(&Address::with_last_byte(9))).unwrap().unwrap();
        assert_eq!(escrow.oracles.len(), 1);
    }

    #[test]
    fn distinct_logs_with_same_oracle_append_twice() {
        let mut p = Projector::new(MemoryStore::new());
        let stats = p.apply_all(&[log(1, 0, oracle(1)), log(1, 1, oracle(1))]).unwrap();
        assert_eq!(stats, ProjectionStats { applied: 2, skipped: 0 });
        let escrow: Escrow = p.store().load(&address_key(&Address::with_last_byte(9))).unwrap().unwrap();
        assert_eq!(escrow.oracles.len(), 2);
    }

    #[test]
    fn skipped_logs_still_advance_cursor() {
        let mut p = Projector::new(MemoryStore::new());
        let tl = log(
            3,
            0,
            EscrowEvent::TimeLimitSet(TimeLimitSet {
                timeLimit: U256::from(5),
            }),
        );
        assert_eq!(p.apply(&tl).unwrap(), Outcome::Skipped(SkipReason::MissingEscrow));
        assert_eq!(p.cursor().last_applied(), Some((3, 0)));
        assert!(p.store().is_empty());
    }

    #[test]
    fn resume_from_cursor() {
        let mut p = Projector::with_cursor(MemoryStore::new(), Cursor::new(5, 0));
        let stats = p.apply_all(&[log(4, 0, oracle(1)), log(5, 0, oracle(1)), log(5, 1, oracle(2))]).unwrap();
        assert_eq!(stats, ProjectionStats { applied: 1, skipped: 2 });
        let store = p.into_store();
        let escrow: Escrow = store.load(&address_key(&Address::with_last_byte(9))).unwrap().unwrap();
        assert_eq!(escrow.oracles, vec![address_key(&Address::with_last_byte(2))]);
    }

    #[test]
    fn store_failure_stops_batch_without_advancing() {
        let mut store = FlakyStore::new(EntityKind::EscrowTransaction);
        seed_shell(&mut store, &Address::with_last_byte(0xE)).unwrap();
        store.failing = true;
        let mut p = Projector::new(store);

        let batch = [stopped_log(2, 0), log(3, 0, oracle(1))];
        let err = p.apply_all(&batch).unwrap_err();
        assert!(matches!(err, ProjectionError::Store(_)));
        assert_eq!(p.cursor().last_applied(), None);
        // The OracleAdded after the failing log was never applied.
        let escrow: Option<Escrow> = p.store().load(&address_key(&Address::with_last_byte(9))).unwrap();
        assert!(escrow.is_none());
        // Index entry is written but its record is not, so terminal lookups miss.
        assert!(find_by_key(p.store(), &stopped_key()).unwrap().is_none());
    }

    #[test]
    fn retrying_failed_log_completes_creation() {
        for fail_kind in [EntityKind::TransactionKey, EntityKind::EscrowTransaction] {
            let mut store = FlakyStore::new(fail_kind);
            seed_shell(&mut store, &Address::with_last_byte(0xE)).unwrap();
            store.failing = true;
            let mut p = Projector::new(store);

            assert!(p.apply(&stopped_log(2, 0)).is_err());
            assert_eq!(p.cursor().last_applied(), None);

            p.store_mut().failing = false;
            assert_eq!(p.apply(&stopped_log(2, 0)).unwrap(), Outcome::Applied);
            assert_eq!(p.cursor().last_applied(), Some((2, 0)));

            let tx = find_by_key(p.store(), &stopped_key()).unwrap().unwrap();
            assert_eq!(tx.id, format!("{}-2-0", address_key(&Address::with_last_byte(0xE))));
            let inner = &p.store().inner;
            assert_eq!(inner.count(EntityKind::EscrowTransaction), 2);
            assert_eq!(inner.count(EntityKind::TransactionKey), 1);
            assert_eq!(inner.count(EntityKind::Account), 2);
        }
    }
}
