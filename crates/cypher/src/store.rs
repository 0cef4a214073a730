//! Entity store boundary: typed load/save of entities by key.
//!
//! The projection only ever reads one entity, mutates it, and saves it back.
//! [MemoryStore] keeps every entity as a JSON value per `(kind, key)`, which is also the
//! shape handed to the query layer via [MemoryStore::snapshot].

use crate::entity::{Entity, EntityKind};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("serialize {kind} {key}: {source}")]
    Serialize {
        kind: EntityKind,
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("deserialize {kind} {key}: {source}")]
    Deserialize {
        kind: EntityKind,
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Load/save access to entity tables.
pub trait EntityStore {
    /// Load the entity of type `E` stored under `key`, if any.
    fn load<E: Entity>(&self, key: &str) -> Result<Option<E>, StoreError>;

    /// Insert or replace `entity` under its own key.
    fn save<E: Entity>(&mut self, entity: &E) -> Result<(), StoreError>;
}

/// In-memory entity store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryStore {
    tables: BTreeMap<(EntityKind, String), Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entities across all tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Number of stored entities of one kind.
    pub fn count(&self, kind: EntityKind) -> usize {
        self.tables.keys().filter(|(k, _)| *k == kind).count()
    }

    /// JSON view of every table: `{ "<Kind>": { "<key>": <entity>, ... }, ... }`.
    pub fn snapshot(&self) -> Value {
        let mut out = Map::new();
        for ((kind, key), value) in &self.tables {
            let table = out
                .entry(kind.as_str())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(rows) = table {
                rows.insert(key.clone(), value.clone());
            }
        }
        Value::Object(out)
    }
}

impl EntityStore for MemoryStore {
    fn load<E: Entity>(&self, key: &str) -> Result<Option<E>, StoreError> {
        let Some(value) = self.tables.get(&(E::KIND, key.to_string())) else {
            return Ok(None);
        };
        serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|source| StoreError::Deserialize {
                kind: E::KIND,
                key: key.to_string(),
                source,
            })
    }

    fn save<E: Entity>(&mut self, entity: &E) -> Result<(), StoreError> {
        let key = entity.key().to_string();
        let value = serde_json::to_value(entity).map_err(|source| StoreError::Serialize {
            kind: E::KIND,
            key: key.clone(),
            source,
        })?;
        self.tables.insert((E::KIND, key), value);
        Ok(())
    }
}
