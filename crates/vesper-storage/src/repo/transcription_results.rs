use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use vesper_core::domain::{AnalysisStatus, TranscriptionResult};
use vesper_core::ids::{BatchId, TranscriptionResultId};

use crate::error::Result;

#[derive(Clone)]
pub struct TranscriptionResultRepo {
    pool: PgPool,
}

impl TranscriptionResultRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn insert(
        &self,
        username: &str,
        batch_id: BatchId,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        transcription_text: &str,
        confidence: f64,
        language: &str,
        sentiment: Option<serde_json::Value>,
        topics: Option<serde_json::Value>,
        intents: Option<serde_json::Value>,
        segment_count: i32,
        raw_vendor_response: Option<serde_json::Value>,
    ) -> Result<TranscriptionResult> {
        let id = TranscriptionResultId::new();
        let row = sqlx::query(
            r#"
            INSERT INTO transcription_results
                (id, username, batch_id, start_time, end_time, transcription_text,
                 confidence, language, sentiment, topics, intents, segment_count,
                 raw_vendor_response, analysis_status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, 'pending')
            RETURNING *
            "#,
        )
        .bind(id.0)
        .bind(username)
        .bind(batch_id.0)
        .bind(start_time)
        .bind(end_time)
        .bind(transcription_text)
        .bind(confidence)
        .bind(language)
        .bind(sentiment)
        .bind(topics)
        .bind(intents)
        .bind(segment_count)
        .bind(raw_vendor_response)
        .fetch_one(&self.pool)
        .await?;
        Ok(row_to_result(row))
    }

    /// Pending transcripts ordered by user then start-time, up to `limit` —
    /// the grouping input for the analyzer cycle (spec.md §4.3 step 1).
    pub async fn pending_ordered(&self, limit: i64) -> Result<Vec<TranscriptionResult>> {
        let rows = sqlx::query(
            "SELECT * FROM transcription_results WHERE analysis_status = 'pending' ORDER BY username, start_time LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(row_to_result).collect())
    }

    pub async fn mark_status(&self, ids: &[TranscriptionResultId], status: AnalysisStatus) -> Result<()> {
        let raw: Vec<uuid::Uuid> = ids.iter().map(|i| i.0).collect();
        let analyzed_at: Option<DateTime<Utc>> = matches!(status, AnalysisStatus::Completed).then(Utc::now);
        sqlx::query("UPDATE transcription_results SET analysis_status = $2, analyzed_at = COALESCE($3, analyzed_at) WHERE id = ANY($1)")
            .bind(&raw)
            .bind(status.to_string())
            .bind(analyzed_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Conditional flip used to prevent duplicate work by parallel analyzer
    /// workers (spec.md §4.3 step 2): only rows still `pending` are claimed.
    pub async fn try_claim_processing(&self, ids: &[TranscriptionResultId]) -> Result<Vec<TranscriptionResultId>> {
        let raw: Vec<uuid::Uuid> = ids.iter().map(|i| i.0).collect();
        let rows = sqlx::query(
            "UPDATE transcription_results SET analysis_status = 'processing' WHERE id = ANY($1) AND analysis_status = 'pending' RETURNING id",
        )
        .bind(&raw)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|r| TranscriptionResultId::from_uuid(r.get("id"))).collect())
    }

    pub async fn paginated(
        &self,
        username: &str,
        page: i64,
        page_size: i64,
        start_date: Option<DateTime<Utc>>,
        end_date: Option<DateTime<Utc>>,
    ) -> Result<Vec<TranscriptionResult>> {
        let offset = (page.max(1) - 1) * page_size;
        let rows = sqlx::query(
            r#"
            SELECT * FROM transcription_results
            WHERE username = $1
              AND ($2::timestamptz IS NULL OR start_time >= $2)
              AND ($3::timestamptz IS NULL OR start_time <= $3)
            ORDER BY start_time DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(username)
        .bind(start_date)
        .bind(end_date)
        .bind(page_size)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(row_to_result).collect())
    }
}

fn row_to_result(row: sqlx::postgres::PgRow) -> TranscriptionResult {
    let status_str: String = row.get("analysis_status");
    TranscriptionResult {
        id: TranscriptionResultId::from_uuid(row.get("id")),
        username: row.get("username"),
        batch_id: BatchId::from_uuid(row.get("batch_id")),
        start_time: row.get("start_time"),
        end_time: row.get("end_time"),
        transcription_text: row.get("transcription_text"),
        confidence: row.get("confidence"),
        language: row.get("language"),
        sentiment: row.get("sentiment"),
        topics: row.get("topics"),
        intents: row.get("intents"),
        segment_count: row.get("segment_count"),
        raw_vendor_response: row.get("raw_vendor_response"),
        analysis_status: status_str.parse().unwrap_or(AnalysisStatus::Pending),
        analyzed_at: row.get("analyzed_at"),
    }
}
