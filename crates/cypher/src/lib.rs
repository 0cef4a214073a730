//! Off-chain Cypher escrow projection: materializes CypherEscrow events into read-model entities.
//!
//! - **Projector**: applies observed logs strictly in `(block_number, log_index)` order,
//!   dispatching to the escrow and transaction handlers; lookup misses are skips, not errors.
//! - **Escrow / transaction handlers**: oracle list, whitelist and time limit per escrow;
//!   PENDING -> ACCEPTED | DENIED per transfer, correlated by a deterministic key
//!   (keccak256 of the ABI-encoded origin, protocol, dst, counter).
//! - **HttpLogSource**: eth_getLogs reader that feeds the projector (no finality handling).

pub mod abi;
pub mod config;
pub mod cursor;
pub mod entity;
pub mod escrow;
pub mod id;
pub mod identity;
pub mod projector;
pub mod source;
pub mod store;
pub mod transaction;

pub use abi::{decode_log, EscrowEvent, EventContext, ObservedLog};
pub use config::SourceConfig;
pub use cursor::Cursor;
pub use entity::{
    Account, Entity, EntityKind, Escrow, EscrowTransaction, Protocol, TransactionKey,
    TransactionStatus,
};
pub use id::{normalize_key, transaction_key, transaction_key_for, EncodeError};
pub use identity::{normalize_address, resolve};
pub use projector::{Outcome, ProjectionError, ProjectionStats, Projector, SkipReason};
pub use source::{HttpLogSource, SourceError};
pub use store::{EntityStore, MemoryStore, StoreError};
pub use transaction::{find_by_key, seed_shell};
