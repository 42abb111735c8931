use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::db::{Disposition, HistoryRow, QueueHistory};
use crate::error::QueueError;
use crate::models::{CheckIn, QueueEntry, QueueStatus, SelectedService, VerificationReason};

/// Postgres implementation of the write-ahead queue history.
pub struct PgQueueHistory {
    pool: PgPool,
}

impl PgQueueHistory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn upsert(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    entry: &QueueEntry,
    disposition: Disposition,
) -> Result<(), QueueError> {
    let services = serde_json::to_value(&entry.services)
        .map_err(|e| QueueError::InvalidRequest(e.to_string()))?;
    let check_in = entry
        .check_in
        .as_ref()
        .map(serde_json::to_value)
        .transpose()
        .map_err(|e| QueueError::InvalidRequest(e.to_string()))?;
    let disposition = match disposition {
        Disposition::Active => "active",
        Disposition::Left => "left",
    };

    sqlx::query(
        r#"
        INSERT INTO queue_entries (
            id, salon_id, user_id, services, total_price_cents,
            total_duration_minutes, position, status, disposition,
            joined_at, notified_at, check_in, verification_reason,
            service_started_at, completed_at, estimated_wait_minutes,
            generation, review_submitted_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                $14, $15, $16, $17, $18, NOW())
        ON CONFLICT (id) DO UPDATE SET
            position = EXCLUDED.position,
            status = EXCLUDED.status,
            disposition = EXCLUDED.disposition,
            notified_at = EXCLUDED.notified_at,
            check_in = EXCLUDED.check_in,
            verification_reason = EXCLUDED.verification_reason,
            service_started_at = EXCLUDED.service_started_at,
            completed_at = EXCLUDED.completed_at,
            estimated_wait_minutes = EXCLUDED.estimated_wait_minutes,
            generation = EXCLUDED.generation,
            updated_at = NOW()
        "#,
    )
    .bind(entry.id)
    .bind(entry.salon_id)
    .bind(&entry.user_id)
    .bind(services)
    .bind(entry.total_price_cents)
    .bind(entry.total_duration_minutes)
    .bind(entry.position.map(|p| p as i32))
    .bind(entry.status.to_string())
    .bind(disposition)
    .bind(entry.joined_at)
    .bind(entry.notified_at)
    .bind(check_in)
    .bind(entry.verification_reason.map(|r| r.to_string()))
    .bind(entry.service_started_at)
    .bind(entry.completed_at)
    .bind(entry.estimated_wait_minutes)
    .bind(entry.generation as i64)
    .bind(entry.review_submitted_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

fn row_to_entry(row: &PgRow) -> Result<QueueEntry, QueueError> {
    let status_text: String = row.try_get("status")?;
    let status = QueueStatus::from_str(&status_text)
        .map_err(|_| QueueError::InvalidRequest(format!("unknown status '{status_text}'")))?;

    let reason: Option<String> = row.try_get("verification_reason")?;
    let verification_reason = reason
        .as_deref()
        .map(VerificationReason::from_str)
        .transpose()
        .map_err(|_| QueueError::InvalidRequest("unknown verification reason".into()))?;

    let services: serde_json::Value = row.try_get("services")?;
    let services: Vec<SelectedService> = serde_json::from_value(services)
        .map_err(|e| QueueError::InvalidRequest(e.to_string()))?;

    let check_in: Option<serde_json::Value> = row.try_get("check_in")?;
    let check_in: Option<CheckIn> = check_in
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| QueueError::InvalidRequest(e.to_string()))?;

    let position: Option<i32> = row.try_get("position")?;
    let generation: i64 = row.try_get("generation")?;

    Ok(QueueEntry {
        id: row.try_get("id")?,
        salon_id: row.try_get("salon_id")?,
        user_id: row.try_get("user_id")?,
        services,
        total_price_cents: row.try_get("total_price_cents")?,
        total_duration_minutes: row.try_get("total_duration_minutes")?,
        position: position.map(|p| p as u32),
        status,
        joined_at: row.try_get("joined_at")?,
        notified_at: row.try_get("notified_at")?,
        check_in,
        verification_reason,
        service_started_at: row.try_get("service_started_at")?,
        completed_at: row.try_get("completed_at")?,
        estimated_wait_minutes: row.try_get("estimated_wait_minutes")?,
        generation: generation as u64,
        review_submitted_at: row.try_get("review_submitted_at")?,
    })
}

#[async_trait]
impl QueueHistory for PgQueueHistory {
    async fn record(&self, rows: &[HistoryRow]) -> Result<(), QueueError> {
        if rows.is_empty() {
            return Ok(());
        }
        // One transaction per mutation: a failure rolls back every row,
        // never leaving the history half-written.
        let mut tx = self.pool.begin().await?;
        for row in rows {
            upsert(&mut tx, &row.entry, row.disposition).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn load_active(&self) -> Result<Vec<QueueEntry>, QueueError> {
        let rows = sqlx::query(
            r#"
            SELECT id, salon_id, user_id, services, total_price_cents,
                   total_duration_minutes, position, status, joined_at,
                   notified_at, check_in, verification_reason,
                   service_started_at, completed_at, estimated_wait_minutes,
                   generation, review_submitted_at
            FROM queue_entries
            WHERE disposition = 'active'
              AND status NOT IN ('completed', 'no_show')
            ORDER BY salon_id, joined_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_entry).collect()
    }

    async fn mark_review_submitted(
        &self,
        entry_id: Uuid,
        user_id: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, QueueError> {
        let result = sqlx::query(
            r#"
            UPDATE queue_entries
            SET review_submitted_at = $3, updated_at = NOW()
            WHERE id = $1
              AND user_id = $2
              AND status IN ('completed', 'no_show')
              AND review_submitted_at IS NULL
            "#,
        )
        .bind(entry_id)
        .bind(user_id)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
