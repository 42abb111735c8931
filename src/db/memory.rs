//! In-memory `QueueHistory` for tests and local development.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::db::{Disposition, HistoryRow, QueueHistory};
use crate::error::QueueError;
use crate::models::QueueEntry;

/// HashMap-backed history. `fail_next_write` lets tests assert that a
/// persistence failure aborts a transition without committing anything.
#[derive(Default)]
pub struct InMemoryHistory {
    rows: Mutex<HashMap<Uuid, (QueueEntry, Disposition)>>,
    fail_next_write: AtomicBool,
}

impl InMemoryHistory {
    /// Make the next write fail with a transient persistence error.
    pub fn fail_next_write(&self) {
        self.fail_next_write.store(true, Ordering::SeqCst);
    }

    pub fn row(&self, entry_id: Uuid) -> Option<QueueEntry> {
        self.rows
            .lock()
            .unwrap()
            .get(&entry_id)
            .map(|(e, _)| e.clone())
    }

    pub fn left(&self, entry_id: Uuid) -> bool {
        self.rows
            .lock()
            .unwrap()
            .get(&entry_id)
            .is_some_and(|(_, d)| *d == Disposition::Left)
    }

    fn check_fault(&self) -> Result<(), QueueError> {
        if self.fail_next_write.swap(false, Ordering::SeqCst) {
            return Err(QueueError::Persistence(sqlx::Error::PoolClosed));
        }
        Ok(())
    }
}

#[async_trait]
impl QueueHistory for InMemoryHistory {
    async fn record(&self, batch: &[HistoryRow]) -> Result<(), QueueError> {
        // The fault fires before anything lands, matching the all-or-
        // nothing contract of the Postgres transaction.
        self.check_fault()?;
        let mut rows = self.rows.lock().unwrap();
        for row in batch {
            rows.insert(row.entry.id, (row.entry.clone(), row.disposition));
        }
        Ok(())
    }

    async fn load_active(&self) -> Result<Vec<QueueEntry>, QueueError> {
        let rows = self.rows.lock().unwrap();
        let mut active: Vec<QueueEntry> = rows
            .values()
            .filter(|(e, d)| *d == Disposition::Active && !e.status.is_terminal())
            .map(|(e, _)| e.clone())
            .collect();
        active.sort_by_key(|e| e.joined_at);
        Ok(active)
    }

    async fn mark_review_submitted(
        &self,
        entry_id: Uuid,
        user_id: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, QueueError> {
        let mut rows = self.rows.lock().unwrap();
        match rows.get_mut(&entry_id) {
            Some((entry, _))
                if entry.user_id == user_id
                    && entry.status.is_terminal()
                    && entry.review_submitted_at.is_none() =>
            {
                entry.review_submitted_at = Some(at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
