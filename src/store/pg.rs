use std::sync::atomic::{AtomicU8, Ordering};

use chrono::Utc;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tokio::sync::OnceCell;
use uuid::Uuid;

use super::{ActivityStore, ConnectionState, StoreError};
use crate::schema::{NewRecord, Record};

// The original store created its collection implicitly on first write, so the
// table is bootstrapped at connect time. This is startup DDL, not migration
// tooling.
const BOOTSTRAP_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS activities (
    id uuid PRIMARY KEY,
    "timestamp" timestamptz NOT NULL DEFAULT now(),
    ip_address text NOT NULL,
    activity text NOT NULL DEFAULT '',
    code int NOT NULL DEFAULT 0
)
"#;

/// PostgreSQL-backed [`ActivityStore`]. Starts `Disconnected`; the composition
/// root owns the lifecycle via [`PgStore::connect`] and [`ActivityStore::close`].
pub struct PgStore {
    pool: OnceCell<PgPool>,
    state: AtomicU8,
}

impl PgStore {
    pub fn new() -> Self {
        Self {
            pool: OnceCell::new(),
            state: AtomicU8::new(ConnectionState::Disconnected as u8),
        }
    }

    pub async fn connect(&self, database_url: &str) -> Result<(), StoreError> {
        self.set_state(ConnectionState::Connecting);

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(|e| {
                self.set_state(ConnectionState::Disconnected);
                StoreError::Persistence(e.to_string())
            })?;

        sqlx::query(BOOTSTRAP_DDL).execute(&pool).await.map_err(|e| {
            self.set_state(ConnectionState::Disconnected);
            StoreError::Persistence(e.to_string())
        })?;

        self.pool.set(pool).map_err(|_| StoreError::Unavailable)?;
        self.set_state(ConnectionState::Connected);
        tracing::info!("activity store connected");
        Ok(())
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Fail fast before the connection is established; after a transient
    /// error the pool is still handed out so the next operation can recover.
    fn ready_pool(&self) -> Result<&PgPool, StoreError> {
        match self.state() {
            ConnectionState::Connected | ConnectionState::Error => {
                self.pool.get().ok_or(StoreError::Unavailable)
            }
            ConnectionState::Disconnected | ConnectionState::Connecting => {
                Err(StoreError::Unavailable)
            }
        }
    }

    fn operation_failed(&self, e: sqlx::Error) -> StoreError {
        if matches!(
            e,
            sqlx::Error::Io(_) | sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut
        ) {
            self.set_state(ConnectionState::Error);
            tracing::warn!(error = %e, "store connection error");
        }
        StoreError::Persistence(e.to_string())
    }

    fn operation_succeeded(&self) {
        let _ = self.state.compare_exchange(
            ConnectionState::Error as u8,
            ConnectionState::Connected as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }
}

impl Default for PgStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ActivityStore for PgStore {
    async fn insert(&self, new: NewRecord) -> Result<Record, StoreError> {
        let pool = self.ready_pool()?;
        let timestamp = new.timestamp.unwrap_or_else(Utc::now);

        let record = sqlx::query_as::<_, Record>(
            r#"
            INSERT INTO activities (id, "timestamp", ip_address, activity, code)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, "timestamp", ip_address, activity, code
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(timestamp)
        .bind(&new.ip_address)
        .bind(&new.activity)
        .bind(new.code)
        .fetch_one(pool)
        .await
        .map_err(|e| self.operation_failed(e))?;

        self.operation_succeeded();
        Ok(record)
    }

    async fn find_all(&self) -> Result<Vec<Record>, StoreError> {
        let pool = self.ready_pool()?;

        let records = sqlx::query_as::<_, Record>(
            r#"SELECT id, "timestamp", ip_address, activity, code FROM activities"#,
        )
        .fetch_all(pool)
        .await
        .map_err(|e| self.operation_failed(e))?;

        self.operation_succeeded();
        Ok(records)
    }

    async fn find_most_recent(&self) -> Result<Option<Record>, StoreError> {
        let pool = self.ready_pool()?;

        let record = sqlx::query_as::<_, Record>(
            r#"
            SELECT id, "timestamp", ip_address, activity, code
            FROM activities
            ORDER BY "timestamp" DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(pool)
        .await
        .map_err(|e| self.operation_failed(e))?;

        self.operation_succeeded();
        Ok(record)
    }

    fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    async fn close(&self) {
        if let Some(pool) = self.pool.get() {
            pool.close().await;
        }
        self.set_state(ConnectionState::Disconnected);
        tracing::info!("activity store connection closed");
    }
}
