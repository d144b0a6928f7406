pub mod pg;

#[cfg(test)]
pub mod mem;

pub use pg::PgStore;

use crate::schema::{NewRecord, Record};

/// Connection lifecycle of a store backend. `Error` is transient: the next
/// operation that reaches the database clears it back to `Connected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
    Error = 3,
}

impl ConnectionState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => ConnectionState::Disconnected,
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Connected,
            _ => ConnectionState::Error,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing connection is not established. Operations fail fast with
    /// this instead of queueing or blocking.
    #[error("store connection is not ready")]
    Unavailable,
    /// A read or write failed at the store.
    #[error("persistence failure: {0}")]
    Persistence(String),
}

/// Durable collection of activity [`Record`]s. Records are created and read,
/// never mutated or deleted; the store exclusively owns the collection.
#[async_trait::async_trait]
pub trait ActivityStore: Send + Sync {
    /// Persist a new record, assigning its id and defaulting the timestamp
    /// to insertion time when the input carries none.
    async fn insert(&self, new: NewRecord) -> Result<Record, StoreError>;

    /// All persisted records, in store order. An empty collection is a valid
    /// non-error result.
    async fn find_all(&self) -> Result<Vec<Record>, StoreError>;

    /// The record with the greatest timestamp, or `None` on an empty
    /// collection. Ties break by store-native ordering.
    async fn find_most_recent(&self) -> Result<Option<Record>, StoreError>;

    fn state(&self) -> ConnectionState;

    /// Release the connection. Best-effort with respect to in-flight
    /// operations; afterwards the store reports `Disconnected`.
    async fn close(&self);
}
