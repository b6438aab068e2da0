//! Daily reflection pass (SPEC_FULL.md §3, supplementary feature pulled
//! from `analyze_actions.py`'s reflection step and `pgsql_daily_reflections.py`'s
//! storage shape): once a user's completed events for a UTC day have
//! stabilized — none touched within `T_reflection_delay` — summarize that
//! day into a `DailyReflection` using the same LLM client C4 uses.

use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};

use vesper_core::domain::{DailyReflection, EventStatus};
use vesper_storage::repo::{DailyReflectionRepo, EventRepo};

use crate::error::Result;
use crate::llm::AnalyzerLlmClient;
use crate::prompts::PromptLibrary;

#[derive(Debug, Clone, Copy)]
pub struct ReflectionConfig {
    pub interval_seconds: u64,
    pub reflection_delay_seconds: i64,
}

pub struct ReflectionWorker {
    events: EventRepo,
    reflections: DailyReflectionRepo,
    llm: Arc<AnalyzerLlmClient>,
    prompts: Arc<PromptLibrary>,
    config: ReflectionConfig,
}

impl ReflectionWorker {
    pub fn new(
        events: EventRepo,
        reflections: DailyReflectionRepo,
        llm: Arc<AnalyzerLlmClient>,
        prompts: Arc<PromptLibrary>,
        config: ReflectionConfig,
    ) -> Self {
        Self { events, reflections, llm, prompts, config }
    }

    /// Writes one `DailyReflection` per stabilized (user, day) pair that
    /// doesn't already have one. Returns the number written.
    pub async fn run_cycle(&self) -> Result<usize> {
        let days = self.events.stabilized_days(self.config.reflection_delay_seconds).await?;
        let mut written = 0;

        for (username, local_date) in days {
            let start = local_date.and_hms_opt(0, 0, 0).unwrap().and_utc();
            let end = start + ChronoDuration::days(1) - ChronoDuration::milliseconds(1);

            let completed: Vec<_> = self
                .events
                .by_range(&username, start, end)
                .await?
                .into_iter()
                .filter(|e| e.event_status == EventStatus::Completed)
                .collect();
            if completed.is_empty() {
                continue;
            }

            let events_summary = completed
                .iter()
                .map(|e| format!("- {} ({}): {}", e.title, e.activity_type, e.summary))
                .collect::<Vec<_>>()
                .join("\n");
            let prompt = self.prompts.reflection(&events_summary);
            let output = self.llm.reflect(&prompt).await;

            self.reflections
                .upsert(&DailyReflection {
                    username,
                    local_date,
                    gratitude: output.gratitude,
                    challenges: output.challenges,
                    learning: output.learning,
                    connections: output.connections,
                    looking_forward: output.looking_forward,
                    created_at: Utc::now(),
                })
                .await?;
            written += 1;
        }

        Ok(written)
    }
}

/// Wakes every `interval_seconds` and runs one reflection cycle.
pub async fn run_reflection_loop(worker: Arc<ReflectionWorker>, interval_seconds: u64, mut shutdown: tokio::sync::watch::Receiver<bool>) {
    let mut tick = tokio::time::interval(std::time::Duration::from_secs(interval_seconds));
    loop {
        tokio::select! {
            _ = tick.tick() => {
                match worker.run_cycle().await {
                    Ok(written) => tracing::info!(written, "reflection cycle complete"),
                    Err(e) => tracing::error!(error = %e, "reflection cycle failed"),
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_fields_round_trip() {
        let cfg = ReflectionConfig { interval_seconds: 300, reflection_delay_seconds: 3600 };
        assert_eq!(cfg.interval_seconds, 300);
        assert_eq!(cfg.reflection_delay_seconds, 3600);
    }
}
