use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use vesper_core::domain::{AudioFile, AudioFileStatus, SpeechInterval};
use vesper_core::ids::{AudioFileId, BatchId};

use crate::error::Result;

#[derive(Clone)]
pub struct AudioFileRepo {
    pool: PgPool,
}

impl AudioFileRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Idempotence point for at-least-once queue delivery (spec.md §4.1 step 2):
    /// callers check this before inserting, and treat an existing row as success.
    pub async fn find_by_bucket_key(&self, bucket: &str, object_key: &str) -> Result<Option<AudioFile>> {
        let row = sqlx::query(
            "SELECT * FROM audio_files WHERE bucket = $1 AND object_key = $2",
        )
        .bind(bucket)
        .bind(object_key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(row_to_audio_file))
    }

    pub async fn insert_uploaded(
        &self,
        username: &str,
        bucket: &str,
        object_key: &str,
        captured_at: DateTime<Utc>,
        uploaded_at: DateTime<Utc>,
        content_size: i64,
        format: &str,
        timezone_offset_minutes: i32,
    ) -> Result<AudioFile> {
        let id = AudioFileId::new();
        let row = sqlx::query(
            r#"
            INSERT INTO audio_files
                (id, username, bucket, object_key, captured_at, uploaded_at,
                 content_size, format, status, timezone_offset_minutes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'uploaded', $9)
            ON CONFLICT (bucket, object_key) DO UPDATE SET bucket = EXCLUDED.bucket
            RETURNING *
            "#,
        )
        .bind(id.0)
        .bind(username)
        .bind(bucket)
        .bind(object_key)
        .bind(captured_at)
        .bind(uploaded_at)
        .bind(content_size)
        .bind(format)
        .bind(timezone_offset_minutes)
        .fetch_one(&self.pool)
        .await?;

        Ok(row_to_audio_file(row))
    }

    pub async fn mark_vad_complete(
        &self,
        id: AudioFileId,
        speech_intervals: &[SpeechInterval],
        segment_count: i32,
        total_speech_duration: f64,
        speech_ratio: f64,
        total_duration: f64,
        status: AudioFileStatus,
    ) -> Result<()> {
        let intervals_json = serde_json::to_value(speech_intervals)?;
        sqlx::query(
            r#"
            UPDATE audio_files SET
                status = $2,
                speech_intervals = $3,
                segment_count = $4,
                total_speech_duration = $5,
                speech_ratio = $6,
                total_duration = $7,
                vad_processed_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .bind(status.to_string())
        .bind(intervals_json)
        .bind(segment_count)
        .bind(total_speech_duration)
        .bind(speech_ratio)
        .bind(total_duration)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn mark_vad_failed(&self, id: AudioFileId, message: &str) -> Result<()> {
        sqlx::query(
            "UPDATE audio_files SET status = 'vad_failed', vad_error = $2, vad_processed_at = now() WHERE id = $1",
        )
        .bind(id.0)
        .bind(message)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn attach_to_batch(&self, id: AudioFileId, batch_id: BatchId) -> Result<()> {
        sqlx::query("UPDATE audio_files SET batch_id = $2 WHERE id = $1")
            .bind(id.0)
            .bind(batch_id.0)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn mark_transcribed(&self, ids: &[AudioFileId]) -> Result<()> {
        let raw: Vec<uuid::Uuid> = ids.iter().map(|i| i.0).collect();
        sqlx::query("UPDATE audio_files SET status = 'transcribed' WHERE id = ANY($1)")
            .bind(&raw)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn by_batch_ordered(&self, batch_id: BatchId) -> Result<Vec<AudioFile>> {
        let rows = sqlx::query("SELECT * FROM audio_files WHERE batch_id = $1 ORDER BY uploaded_at")
            .bind(batch_id.0)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(row_to_audio_file).collect())
    }
}

fn row_to_audio_file(row: sqlx::postgres::PgRow) -> AudioFile {
    let status_str: String = row.get("status");
    let intervals_json: serde_json::Value = row.get("speech_intervals");
    let speech_intervals: Vec<SpeechInterval> = serde_json::from_value(intervals_json).unwrap_or_default();
    let batch_id: Option<uuid::Uuid> = row.get("batch_id");

    AudioFile {
        id: AudioFileId::from_uuid(row.get("id")),
        username: row.get("username"),
        bucket: row.get("bucket"),
        object_key: row.get("object_key"),
        captured_at: row.get("captured_at"),
        uploaded_at: row.get("uploaded_at"),
        content_size: row.get("content_size"),
        format: row.get("format"),
        status: status_str.parse().unwrap_or(AudioFileStatus::Uploaded),
        batch_id: batch_id.map(BatchId::from_uuid),
        timezone_offset_minutes: row.get("timezone_offset_minutes"),
        speech_intervals,
        segment_count: row.get("segment_count"),
        total_speech_duration: row.get("total_speech_duration"),
        speech_ratio: row.get("speech_ratio"),
        total_duration: row.get("total_duration"),
        vad_processed_at: row.get("vad_processed_at"),
        vad_error: row.get("vad_error"),
    }
}
