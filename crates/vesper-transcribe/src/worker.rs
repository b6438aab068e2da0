//! Batch-monitor loop and per-batch pipeline (spec.md §4.2): concatenate a
//! batch's speech intervals, run both vendors against the same audio,
//! merge, and persist exactly one TranscriptionResult per batch that
//! contained meaningful speech.

use std::sync::Arc;

use chrono::Duration as ChronoDuration;
use tokio::sync::{watch, Semaphore};
use tokio::time::{interval, Duration};

use vesper_core::domain::{AudioFileStatus, Batch};
use vesper_core::ids::BatchId;
use vesper_storage::repo::{AudioFileRepo, BatchRepo, TranscriptionResultRepo};
use vesper_storage::ObjectStore;

use crate::audio::{concatenate_speech, encode_wav};
use crate::error::Result;
use crate::merge::{merge, Word};
use crate::vendor::{DiarizationClient, TranscriptionClient};

#[derive(Debug, Clone, Copy)]
pub struct BatchWorkerConfig {
    pub monitor_interval_seconds: u64,
    pub timeout_seconds: i64,
    pub max_concurrent: usize,
    pub signed_url_ttl_seconds: u64,
}

pub struct BatchWorker {
    audio_files: AudioFileRepo,
    batches: BatchRepo,
    transcripts: TranscriptionResultRepo,
    object_store: Arc<dyn ObjectStore>,
    transcription_client: Arc<TranscriptionClient>,
    diarization_client: Arc<DiarizationClient>,
    config: BatchWorkerConfig,
    semaphore: Arc<Semaphore>,
}

impl BatchWorker {
    pub fn new(
        audio_files: AudioFileRepo,
        batches: BatchRepo,
        transcripts: TranscriptionResultRepo,
        object_store: Arc<dyn ObjectStore>,
        transcription_client: Arc<TranscriptionClient>,
        diarization_client: Arc<DiarizationClient>,
        config: BatchWorkerConfig,
    ) -> Arc<Self> {
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent));
        Arc::new(Self {
            audio_files,
            batches,
            transcripts,
            object_store,
            transcription_client,
            diarization_client,
            config,
            semaphore,
        })
    }

    /// Ticks every `monitor_interval_seconds`, claiming and dispatching
    /// timed-out batches as independent bounded tasks (spec.md §4.2
    /// "Scheduling").
    pub async fn run_monitor_loop(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut tick = interval(Duration::from_secs(self.config.monitor_interval_seconds));
        loop {
            tokio::select! {
                _ = tick.tick() => {
                    if let Err(e) = self.dispatch_ready_batches().await {
                        tracing::error!(error = %e, "failed to list batches ready for processing");
                    }
                }
                _ = shutdown.changed() => {
                    return;
                }
            }
            if *shutdown.borrow() {
                return;
            }
        }
    }

    async fn dispatch_ready_batches(self: &Arc<Self>) -> Result<()> {
        let ready = self.batches.ready_for_processing(self.config.timeout_seconds).await?;
        for batch in ready {
            let Some(claimed) = self.batches.try_mark_processing(batch.id).await? else {
                continue;
            };
            let worker = self.clone();
            tokio::spawn(async move {
                let _permit = match worker.semaphore.clone().acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return,
                };
                worker.process_batch(claimed).await;
            });
        }
        Ok(())
    }

    /// Processes one already-claimed (`processing`) batch end to end,
    /// cleaning up the scratch object on every exit path and marking the
    /// batch `failed` on exception (spec.md §4.2 steps 1-8).
    async fn process_batch(&self, batch: Batch) {
        let batch_id = batch.id;
        match self.run_pipeline(&batch).await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!(error = %e, batch_id = %batch_id, "batch transcription pipeline failed");
                if let Err(e) = self.batches.mark_failed(batch_id).await {
                    tracing::error!(error = %e, batch_id = %batch_id, "failed to mark batch failed");
                }
            }
        }
    }

    async fn run_pipeline(&self, batch: &Batch) -> Result<()> {
        let files = self.audio_files.by_batch_ordered(batch.id).await?;

        let Some(concatenated) = concatenate_speech(self.object_store.as_ref(), &files).await? else {
            tracing::info!(batch_id = %batch.id, "no file in batch survived download, marking completed with no transcript");
            self.batches.mark_completed(batch.id).await?;
            return Ok(());
        };

        let scratch_key = format!("scratch/{}.wav", batch.id);
        let wav_bytes = encode_wav(&concatenated.samples, concatenated.sample_rate)?;
        self.object_store.put_object(&scratch_key, wav_bytes.clone(), "audio/wav").await?;

        let result = self.transcribe_and_merge(batch, &files, &scratch_key, wav_bytes).await;

        // Cleanup happens regardless of outcome (spec.md §4.2 step 8).
        if let Err(e) = self.object_store.delete_object(&scratch_key).await {
            tracing::warn!(error = %e, key = %scratch_key, "failed to delete scratch object");
        }

        let merged = result?;

        let file_ids: Vec<_> = files.iter().map(|f| f.id).collect();

        let Some((text, confidence, language, sentiment, topics, intents, raw)) = merged else {
            // Empty merged text: files are still marked transcribed so they
            // are not re-processed, but no TranscriptionResult is written
            // (spec.md §4.2 step 6).
            self.audio_files.mark_transcribed(&file_ids).await?;
            self.batches.mark_completed(batch.id).await?;
            return Ok(());
        };

        let start_time = batch.first_segment_time;
        let last_duration = files
            .last()
            .and_then(|f| f.total_duration)
            .map(|d| ChronoDuration::milliseconds((d * 1000.0) as i64))
            .unwrap_or_default();
        let end_time = batch.last_segment_time + last_duration;

        self.transcripts
            .insert(
                &batch.username,
                batch.id,
                start_time,
                end_time,
                &text,
                confidence,
                &language,
                sentiment,
                topics,
                intents,
                files.len() as i32,
                Some(raw),
            )
            .await?;

        self.audio_files.mark_transcribed(&file_ids).await?;
        self.batches.mark_completed(batch.id).await?;
        Ok(())
    }

    #[allow(clippy::type_complexity)]
    async fn transcribe_and_merge(
        &self,
        batch: &Batch,
        files: &[vesper_core::domain::AudioFile],
        scratch_key: &str,
        wav_bytes: Vec<u8>,
    ) -> Result<
        Option<(
            String,
            f64,
            String,
            Option<serde_json::Value>,
            Option<serde_json::Value>,
            Option<serde_json::Value>,
            serde_json::Value,
        )>,
    > {
        let signed_url = self
            .object_store
            .presigned_get_url(scratch_key, Duration::from_secs(self.config.signed_url_ttl_seconds))
            .await?;

        let transcription = self.transcription_client.transcribe(wav_bytes).await?;
        // Both transient vendor/network errors and semantic job failures
        // (`failed`/`canceled`) propagate as a batch failure here (spec.md
        // §7) — single-speaker output is only for the *successful* case
        // where diarization legitimately returns zero segments (§4.2 step 5),
        // which `merge` already handles given an empty segment list.
        let segments = self.diarization_client.diarize(&signed_url).await?;

        let words: Vec<Word> = transcription.words;
        let base_time = batch.first_segment_time;
        let timezone_offset_minutes = files.first().map(|f| f.timezone_offset_minutes).unwrap_or(0);

        let text = merge(&segments, &words, base_time, timezone_offset_minutes);
        if text.trim().chars().count() <= 1 {
            return Ok(None);
        }

        Ok(Some((
            text,
            transcription.confidence,
            transcription.language,
            transcription.sentiment,
            transcription.topics,
            transcription.intents,
            transcription.raw,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_fields_round_trip() {
        let cfg = BatchWorkerConfig {
            monitor_interval_seconds: 10,
            timeout_seconds: 300,
            max_concurrent: 4,
            signed_url_ttl_seconds: 3600,
        };
        assert_eq!(cfg.max_concurrent, 4);
        assert_eq!(cfg.signed_url_ttl_seconds, 3600);
    }
}
