//! Persistence backends for audit and tracker records.
//!
//! The core only needs one capability from a store: [`Persist::persist`],
//! an upsert keyed on the entity's identity. Entities without an id are
//! inserted and receive one; entities with an id are updated in place.
//!
//! Two backends ship with the crate:
//! - [`sqlite::SqliteStore`]: sqlx-backed relational store
//! - [`memory::MemoryStore`]: in-process vectors for embedding and tests

use async_trait::async_trait;

pub mod memory;
pub mod sqlite;

/// Errors from a persistence backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Payload could not be encoded or decoded as JSON.
    #[error("payload encoding error: {0}")]
    Encode(#[from] serde_json::Error),

    /// An update targeted a row that does not exist.
    #[error("{table} row {id} not found")]
    NotFound {
        /// Table or collection name.
        table: &'static str,
        /// Identity that was looked up.
        id: i64,
    },

    /// A stored column held a value the entity cannot represent.
    #[error("invalid value for {field}: {value}")]
    InvalidValue {
        /// Column name.
        field: &'static str,
        /// Raw stored value.
        value: String,
    },

    /// In-process store lock was poisoned.
    #[error("store lock poisoned: {0}")]
    Lock(String),
}

/// Durable write of a single entity.
///
/// Implementations must be `Send + Sync` so one store can back many
/// concurrent request handlers.
#[async_trait]
pub trait Persist<E: Send>: Send + Sync {
    /// Insert or update `entity`, assigning its id on first write.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write fails.
    async fn persist(&self, entity: &mut E) -> Result<(), StoreError>;
}
