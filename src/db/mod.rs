use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use uuid::Uuid;

use crate::error::QueueError;
use crate::models::QueueEntry;

pub mod memory;
pub mod queries;

/// Initialize PostgreSQL connection pool
pub async fn init_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .min_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(database_url)
        .await
}

/// Run database migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| sqlx::Error::Migrate(Box::new(e)))
}

/// Disposition of a history row. Leaving is never recorded as a no-show;
/// a left row keeps its last live status under the `Left` disposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Active,
    Left,
}

/// One row of an atomic history write.
#[derive(Debug, Clone)]
pub struct HistoryRow {
    pub entry: QueueEntry,
    pub disposition: Disposition,
}

impl HistoryRow {
    pub fn active(entry: QueueEntry) -> Self {
        Self {
            entry,
            disposition: Disposition::Active,
        }
    }

    pub fn left(entry: QueueEntry) -> Self {
        Self {
            entry,
            disposition: Disposition::Left,
        }
    }
}

/// Durable write-ahead history for queue entries.
///
/// Every state transition is recorded here before the corresponding event
/// is fanned out; a failure aborts the transition entirely, so no partial
/// state is ever observable. Rows are never deleted, only excluded from
/// the active set once terminal or left.
#[async_trait]
pub trait QueueHistory: Send + Sync {
    /// Persist every row touched by one queue mutation, atomically:
    /// either all rows become durable or none do.
    async fn record(&self, rows: &[HistoryRow]) -> Result<(), QueueError>;

    /// Load all non-terminal, non-left entries, for rebuilding in-memory
    /// queues at startup.
    async fn load_active(&self) -> Result<Vec<QueueEntry>, QueueError>;

    /// Stamp a terminal entry as reviewed. Returns `false` if the entry
    /// does not exist, is not terminal, is already reviewed, or belongs
    /// to a different user.
    async fn mark_review_submitted(
        &self,
        entry_id: Uuid,
        user_id: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, QueueError>;
}
