use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single persisted activity observation. Field names on the wire are
/// camelCase to match the stored document layout.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub ip_address: String,
    pub activity: String,
    pub code: i32,
}

/// Validated, defaulted input for an insert. Built by the create handler;
/// nothing unvalidated reaches the store. `ip_address` always comes from the
/// transport-layer peer, never from the request payload.
#[derive(Debug, Clone)]
pub struct NewRecord {
    pub ip_address: String,
    pub activity: String,
    pub code: i32,
    /// Defaults to insertion time when `None`.
    pub timestamp: Option<DateTime<Utc>>,
}
