use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use vesper_core::domain::{Batch, BatchStatus};
use vesper_core::ids::BatchId;

use crate::error::{Result, StorageError};

#[derive(Clone)]
pub struct BatchRepo {
    pool: PgPool,
}

impl BatchRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The unique `accumulating` batch for `user`, if one exists.
    pub async fn accumulating_for_user(&self, username: &str) -> Result<Option<Batch>> {
        let row = sqlx::query(
            "SELECT * FROM batches WHERE username = $1 AND status = 'accumulating'",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(row_to_batch))
    }

    pub async fn create(&self, username: &str, segment_time: DateTime<Utc>) -> Result<Batch> {
        let id = BatchId::new();
        // The partial unique index on (username) WHERE status='accumulating'
        // is the final backstop against a concurrent create racing this one;
        // `get_or_create_batch` callers should treat a unique-violation here
        // as "someone else opened the batch, re-read and use theirs."
        let row = sqlx::query(
            r#"
            INSERT INTO batches (id, username, first_segment_time, last_segment_time, status)
            VALUES ($1, $2, $3, $3, 'accumulating')
            RETURNING *
            "#,
        )
        .bind(id.0)
        .bind(username)
        .bind(segment_time)
        .fetch_one(&self.pool)
        .await?;
        Ok(row_to_batch(row))
    }

    pub async fn add_segment(
        &self,
        batch_id: BatchId,
        speech_duration: f64,
        segment_time: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE batches SET
                segment_count = segment_count + 1,
                total_speech_duration = total_speech_duration + $2,
                last_segment_time = $3
            WHERE id = $1
            "#,
        )
        .bind(batch_id.0)
        .bind(speech_duration)
        .bind(segment_time)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Batches older than `timeout_seconds`, still `accumulating`.
    pub async fn ready_for_processing(&self, timeout_seconds: i64) -> Result<Vec<Batch>> {
        let rows = sqlx::query(
            "SELECT * FROM batches WHERE status = 'accumulating' AND first_segment_time <= now() - make_interval(secs => $1)",
        )
        .bind(timeout_seconds as f64)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(row_to_batch).collect())
    }

    /// Atomic `accumulating -> processing` compare-and-flip; returns `None`
    /// if another worker already claimed it (spec.md §4.2 scheduling).
    pub async fn try_mark_processing(&self, batch_id: BatchId) -> Result<Option<Batch>> {
        let row = sqlx::query(
            "UPDATE batches SET status = 'processing' WHERE id = $1 AND status = 'accumulating' RETURNING *",
        )
        .bind(batch_id.0)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(row_to_batch))
    }

    pub async fn mark_completed(&self, batch_id: BatchId) -> Result<()> {
        sqlx::query("UPDATE batches SET status = 'completed', processed_at = now() WHERE id = $1")
            .bind(batch_id.0)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn mark_failed(&self, batch_id: BatchId) -> Result<()> {
        sqlx::query("UPDATE batches SET status = 'failed', processed_at = now() WHERE id = $1")
            .bind(batch_id.0)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn get(&self, batch_id: BatchId) -> Result<Batch> {
        let row = sqlx::query("SELECT * FROM batches WHERE id = $1")
            .bind(batch_id.0)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StorageError::Core(vesper_core::VesperError::Invariant(format!("missing batch {batch_id}"))))?;
        Ok(row_to_batch(row))
    }
}

fn row_to_batch(row: sqlx::postgres::PgRow) -> Batch {
    let status_str: String = row.get("status");
    Batch {
        id: BatchId::from_uuid(row.get("id")),
        username: row.get("username"),
        first_segment_time: row.get("first_segment_time"),
        last_segment_time: row.get("last_segment_time"),
        segment_count: row.get("segment_count"),
        total_speech_duration: row.get("total_speech_duration"),
        status: status_str.parse().unwrap_or(BatchStatus::Accumulating),
        processed_at: row.get("processed_at"),
    }
}
