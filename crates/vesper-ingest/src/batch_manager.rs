//! Groups time-adjacent audio segments into batches for C3 to transcribe as
//! one unit. Exact semantics grounded in the original batch manager: a
//! single `accumulating` batch per user, gap-based batch creation, and
//! timeout-based readiness.

use chrono::{DateTime, Utc};
use vesper_core::domain::{AudioFile, Batch};
use vesper_core::ids::BatchId;
use vesper_storage::repo::BatchRepo;

use crate::error::Result;

#[derive(Debug, Clone, Copy)]
pub struct BatchManagerConfig {
    pub max_gap_seconds: i64,
    pub timeout_seconds: i64,
}

impl Default for BatchManagerConfig {
    fn default() -> Self {
        // BATCH_MAX_GAP_SECONDS / BATCH_TIMEOUT_SECONDS env overrides are
        // read by the caller into this config at startup; both default to
        // 300s (five minutes), matching the source.
        Self {
            max_gap_seconds: 300,
            timeout_seconds: 300,
        }
    }
}

pub struct BatchManager {
    repo: BatchRepo,
    config: BatchManagerConfig,
}

impl BatchManager {
    pub fn new(repo: BatchRepo, config: BatchManagerConfig) -> Self {
        Self { repo, config }
    }

    /// Returns the active batch for `username`, creating one if none is open
    /// or if the gap since the last segment exceeds `max_gap_seconds`.
    pub async fn get_or_create_batch(&self, username: &str, segment_time: DateTime<Utc>) -> Result<Batch> {
        if let Some(active) = self.repo.accumulating_for_user(username).await? {
            let gap = segment_time.signed_duration_since(active.last_segment_time);
            if gap.num_seconds() > self.config.max_gap_seconds {
                tracing::info!(
                    user = username,
                    gap_s = gap.num_seconds(),
                    max_gap_s = self.config.max_gap_seconds,
                    "gap exceeds max_gap, opening new batch"
                );
                return Ok(self.repo.create(username, segment_time).await?);
            }
            return Ok(active);
        }

        tracing::info!(user = username, "no open batch, creating first batch");
        Ok(self.repo.create(username, segment_time).await?)
    }

    pub async fn add_segment_to_batch(&self, batch: &Batch, file: &AudioFile, speech_duration: f64) -> Result<()> {
        self.repo
            .add_segment(batch.id, speech_duration, file.captured_at)
            .await?;
        Ok(())
    }

    pub async fn batches_ready_for_processing(&self) -> Result<Vec<Batch>> {
        Ok(self.repo.ready_for_processing(self.config.timeout_seconds).await?)
    }

    pub async fn try_mark_processing(&self, batch_id: BatchId) -> Result<Option<Batch>> {
        Ok(self.repo.try_mark_processing(batch_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_spec_defaults() {
        let cfg = BatchManagerConfig::default();
        assert_eq!(cfg.max_gap_seconds, 300);
        assert_eq!(cfg.timeout_seconds, 300);
    }
}
