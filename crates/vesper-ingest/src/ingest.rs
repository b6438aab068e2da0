//! Per-message processing: the idempotence point for at-least-once queue
//! delivery, VAD dispatch, and batch attachment. Grounded in spec.md §4.1.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Semaphore;
use vesper_core::domain::AudioFileStatus;
use vesper_storage::repo::AudioFileRepo;
use vesper_storage::ObjectStore;

use crate::batch_manager::BatchManager;
use crate::error::Result;
use crate::metadata::{derive_captured_at, derive_timezone_offset_minutes};
use crate::queue::parse_native_audio_key;
use crate::vad::{detect_speech, VadParams};

pub struct IngestWorker {
    pub audio_files: AudioFileRepo,
    pub batches: Arc<BatchManager>,
    pub object_store: Arc<dyn ObjectStore>,
    pub vad_params: VadParams,
    pub vad_semaphore: Arc<Semaphore>,
}

/// Outcome of processing one queue message, used to decide whether the
/// message may be deleted.
pub enum ProcessOutcome {
    /// Row committed (freshly or idempotently) — message should be deleted.
    Committed,
    /// Not an object-creation event, or key shape unrecognized — deleted
    /// without further processing (spec.md §4.1 step 1).
    Discarded,
}

impl IngestWorker {
    /// Processes one notification for `bucket`/`key`/`size`/`upload_time`.
    /// `is_object_created` and key-shape validation are expected to have
    /// been done by the caller (poll loop or reconciliation sweep) so both
    /// entry points share this one idempotent core.
    pub async fn process_notification(
        &self,
        bucket: &str,
        key: &str,
        size: i64,
        upload_time: chrono::DateTime<Utc>,
    ) -> Result<ProcessOutcome> {
        let (username, _filename) = match parse_native_audio_key(key) {
            Ok(parts) => parts,
            Err(e) => {
                tracing::warn!(key, "discarding message with unrecognized key shape: {e}");
                return Ok(ProcessOutcome::Discarded);
            }
        };

        if self.audio_files.find_by_bucket_key(bucket, key).await?.is_some() {
            // Idempotence point (spec.md §4.1 step 2): treat as success.
            return Ok(ProcessOutcome::Committed);
        }

        let metadata = self.object_store.get_object_metadata(key).await?;
        let captured_at = derive_captured_at(&metadata, upload_time);
        let timezone_offset_minutes = derive_timezone_offset_minutes(&metadata);
        let format = key.rsplit('.').next().unwrap_or("wav").to_string();

        let file = self
            .audio_files
            .insert_uploaded(
                &username,
                bucket,
                key,
                captured_at,
                upload_time,
                size,
                &format,
                timezone_offset_minutes,
            )
            .await?;

        let handles = VadTaskHandles {
            audio_files: self.audio_files.clone(),
            batches: self.batches.clone(),
            object_store: self.object_store.clone(),
            vad_params: self.vad_params,
            vad_semaphore: self.vad_semaphore.clone(),
        };
        let object_key = key.to_string();
        let file_id = file.id;
        tokio::spawn(async move {
            let _permit = match handles.vad_semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return,
            };
            if let Err(e) = handles.run(file, &object_key).await {
                tracing::error!(error = %e, file_id = %file_id, "vad task failed");
            }
        });

        Ok(ProcessOutcome::Committed)
    }
}

#[derive(Clone)]
struct VadTaskHandles {
    audio_files: AudioFileRepo,
    batches: Arc<BatchManager>,
    object_store: Arc<dyn ObjectStore>,
    vad_params: VadParams,
    vad_semaphore: Arc<Semaphore>,
}

impl VadTaskHandles {
    /// Detached VAD processing, spec.md §4.1 step 3: download, run VAD,
    /// update the row, attach to batch on success.
    async fn run(&self, file: vesper_core::domain::AudioFile, object_key: &str) -> Result<()> {
        let file_id = file.id;

        let bytes = match self.object_store.get_object(object_key).await {
            Ok(b) => b,
            Err(e) => {
                self.audio_files.mark_vad_failed(file_id, &e.to_string()).await?;
                return Ok(());
            }
        };

        let samples = match decode_wav_mono_i16(&bytes) {
            Ok(s) => s,
            Err(e) => {
                self.audio_files.mark_vad_failed(file_id, &e).await?;
                return Ok(());
            }
        };

        let result = detect_speech(&samples, &self.vad_params);

        if result.intervals.is_empty() {
            self.audio_files
                .mark_vad_complete(file_id, &[], 0, 0.0, 0.0, result.total_duration_seconds, AudioFileStatus::NoSpeech)
                .await?;
            return Ok(());
        }

        let speech_duration = result.total_speech_duration();
        let speech_ratio = result.speech_ratio();
        self.audio_files
            .mark_vad_complete(
                file_id,
                &result.intervals,
                result.intervals.len() as i32,
                speech_duration,
                speech_ratio,
                result.total_duration_seconds,
                AudioFileStatus::VadComplete,
            )
            .await?;

        let batch = self.batches.get_or_create_batch(&file.username, file.captured_at).await?;
        self.audio_files.attach_to_batch(file_id, batch.id).await?;
        self.batches.add_segment_to_batch(&batch, &file, speech_duration).await?;

        Ok(())
    }
}

fn decode_wav_mono_i16(bytes: &[u8]) -> std::result::Result<Vec<i16>, String> {
    let cursor = std::io::Cursor::new(bytes);
    let mut reader = hound::WavReader::new(cursor).map_err(|e| format!("wav decode failed: {e}"))?;
    let samples: std::result::Result<Vec<i16>, _> = reader.samples::<i16>().collect();
    samples.map_err(|e| format!("wav sample read failed: {e}"))
}
