//! Read-model entities materialized from CypherEscrow events.
//!
//! Every entity is identified by an opaque string key, unique within its [EntityKind].
//! Addresses are stored as lowercase `0x`-prefixed hex; big integers as [U256].

use alloy::primitives::U256;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Entity table discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Account,
    Escrow,
    Protocol,
    EscrowTransaction,
    TransactionKey,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Account => "Account",
            EntityKind::Escrow => "Escrow",
            EntityKind::Protocol => "Protocol",
            EntityKind::EscrowTransaction => "EscrowTransaction",
            EntityKind::TransactionKey => "TransactionKey",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record the [EntityStore](crate::store::EntityStore) can load and save.
pub trait Entity: Serialize + DeserializeOwned {
    const KIND: EntityKind;

    /// Storage key, unique within [Self::KIND].
    fn key(&self) -> &str;
}

/// An external account, keyed by its normalized address. Never updated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
}

impl Account {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl Entity for Account {
    const KIND: EntityKind = EntityKind::Account;

    fn key(&self) -> &str {
        &self.id
    }
}

/// Per-contract escrow configuration, keyed by the escrow contract address.
///
/// `oracles` and `whitelist` are append-only and may hold the same address more than once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Escrow {
    pub id: String,
    pub oracles: Vec<String>,
    pub whitelist: Vec<String>,
    pub time_limit: Option<U256>,
}

impl Escrow {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }
}

impl Entity for Escrow {
    const KIND: EntityKind = EntityKind::Escrow;

    fn key(&self) -> &str {
        &self.id
    }
}

/// Protocol record. Created and maintained outside the projection; referenced by key only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Protocol {
    pub id: String,
}

impl Entity for Protocol {
    const KIND: EntityKind = EntityKind::Protocol;

    fn key(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Pending,
    Accepted,
    Denied,
}

impl TransactionStatus {
    /// ACCEPTED and DENIED are terminal.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }
}

/// One attempted transfer through an escrow contract.
///
/// `id` is the storage key, assigned once when the record is written. `key` is the
/// correlation key (hash of origin, protocol, dst and counter) that the contract later
/// quotes in TransactionAccepted / TransactionDenied. A shell record carries only `id`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowTransaction {
    pub id: String,
    pub key: Option<String>,
    pub escrow: Option<String>,
    pub origin: Option<String>,
    pub dst: Option<String>,
    pub protocol: Option<String>,
    pub token: Option<String>,
    pub amount: Option<U256>,
    pub counter: Option<U256>,
    pub status: Option<TransactionStatus>,
}

impl EscrowTransaction {
    /// Minimal record that the creation phase expects to find under the escrow address.
    pub fn shell(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }
}

impl Entity for EscrowTransaction {
    const KIND: EntityKind = EntityKind::EscrowTransaction;

    fn key(&self) -> &str {
        &self.id
    }
}

/// Secondary index entry: correlation key -> EscrowTransaction storage key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionKey {
    pub id: String,
    pub transaction: String,
}

impl Entity for TransactionKey {
    const KIND: EntityKind = EntityKind::TransactionKey;

    fn key(&self) -> &str {
        &self.id
    }
}
