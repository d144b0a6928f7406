use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use uuid::Uuid;

use super::{ActivityStore, ConnectionState, StoreError};
use crate::schema::{NewRecord, Record};

/// In-memory [`ActivityStore`] for route tests, with switches to simulate an
/// unavailable connection and persistence failures.
pub struct MemStore {
    records: Mutex<Vec<Record>>,
    ready: AtomicBool,
    failing: AtomicBool,
}

impl MemStore {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            ready: AtomicBool::new(true),
            failing: AtomicBool::new(false),
        }
    }

    pub fn disconnected() -> Self {
        let store = Self::new();
        store.ready.store(false, Ordering::Release);
        store
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Release);
    }

    fn check(&self) -> Result<(), StoreError> {
        if !self.ready.load(Ordering::Acquire) {
            return Err(StoreError::Unavailable);
        }
        if self.failing.load(Ordering::Acquire) {
            return Err(StoreError::Persistence("simulated failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ActivityStore for MemStore {
    async fn insert(&self, new: NewRecord) -> Result<Record, StoreError> {
        self.check()?;
        let record = Record {
            id: Uuid::new_v4(),
            timestamp: new.timestamp.unwrap_or_else(Utc::now),
            ip_address: new.ip_address,
            activity: new.activity,
            code: new.code,
        };
        self.records.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn find_all(&self) -> Result<Vec<Record>, StoreError> {
        self.check()?;
        Ok(self.records.lock().unwrap().clone())
    }

    async fn find_most_recent(&self) -> Result<Option<Record>, StoreError> {
        self.check()?;
        let records = self.records.lock().unwrap();
        Ok(records.iter().max_by_key(|r| r.timestamp).cloned())
    }

    fn state(&self) -> ConnectionState {
        if self.ready.load(Ordering::Acquire) {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    async fn close(&self) {
        self.ready.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn new_record(activity: &str, code: i32) -> NewRecord {
        NewRecord {
            ip_address: "192.0.2.1".to_string(),
            activity: activity.to_string(),
            code,
            timestamp: None,
        }
    }

    #[tokio::test]
    async fn insert_assigns_id_and_timestamp() {
        let store = MemStore::new();
        let record = store.insert(new_record("login", 7)).await.unwrap();
        assert_eq!(record.activity, "login");
        assert_eq!(record.code, 7);

        let again = store.insert(new_record("logout", 8)).await.unwrap();
        assert_ne!(record.id, again.id);
    }

    #[tokio::test]
    async fn most_recent_follows_timestamps_not_insert_order() {
        let store = MemStore::new();
        let now = Utc::now();

        let mut newer = new_record("second", 2);
        newer.timestamp = Some(now);
        let mut older = new_record("first", 1);
        older.timestamp = Some(now - Duration::minutes(5));

        // inserted newest-first on purpose
        store.insert(newer).await.unwrap();
        store.insert(older).await.unwrap();

        let found = store.find_most_recent().await.unwrap().unwrap();
        assert_eq!(found.activity, "second");
    }

    #[tokio::test]
    async fn empty_store_has_no_most_recent() {
        let store = MemStore::new();
        assert!(store.find_most_recent().await.unwrap().is_none());
        assert!(store.find_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn closed_store_fails_fast() {
        let store = MemStore::new();
        store.close().await;
        assert_eq!(store.state(), ConnectionState::Disconnected);
        assert!(matches!(store.find_all().await, Err(StoreError::Unavailable)));
    }
}
