//! The incremental event analyzer (spec.md §4.3): turns raw event groups
//! into continue/complete/create transitions against a user's ongoing
//! events, driven by the three structured-output LLM calls.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use vesper_core::domain::{ActivityType, AnalysisStatus, Event, EventStatus};
use vesper_core::time::local_date_of_utc;
use vesper_storage::repo::{EventRepo, TranscriptionResultRepo};

use crate::error::Result;
use crate::grouping::{group_chunks, group_into_raw_events, RawGroup};
use crate::llm::AnalyzerLlmClient;
use crate::prompts::PromptLibrary;
use crate::transcript::parse_time_marked_chunks;

pub struct AnalyzerConfig {
    pub event_gap_seconds: i64,
    pub max_transcripts_per_cycle: i64,
}

pub struct CycleSummary {
    pub groups_processed: usize,
    pub events_created: usize,
    pub events_updated: usize,
}

pub struct IncrementalAnalyzeOutcome {
    pub new_events_count: usize,
    pub updated_events_count: usize,
    pub total_events_count: i64,
}

pub struct IncrementalAnalyzer {
    events: EventRepo,
    transcripts: TranscriptionResultRepo,
    llm: Arc<AnalyzerLlmClient>,
    prompts: Arc<PromptLibrary>,
    config: AnalyzerConfig,
}

impl IncrementalAnalyzer {
    pub fn new(
        events: EventRepo,
        transcripts: TranscriptionResultRepo,
        llm: Arc<AnalyzerLlmClient>,
        prompts: Arc<PromptLibrary>,
        config: AnalyzerConfig,
    ) -> Self {
        Self { events, transcripts, llm, prompts, config }
    }

    /// One periodic cycle (spec.md §4.3 steps 1-2): claim up to
    /// `max_transcripts_per_cycle` pending transcripts, group by
    /// `(user, local_date)`, and process each group independently.
    pub async fn run_cycle(&self) -> Result<CycleSummary> {
        let pending = self.transcripts.pending_ordered(self.config.max_transcripts_per_cycle).await?;

        let mut by_group: HashMap<(String, chrono::NaiveDate), Vec<vesper_core::domain::TranscriptionResult>> = HashMap::new();
        for t in pending {
            let key = (t.username.clone(), local_date_of_utc(t.start_time));
            by_group.entry(key).or_default().push(t);
        }

        let mut summary = CycleSummary { groups_processed: 0, events_created: 0, events_updated: 0 };

        for ((username, _date), transcripts) in by_group {
            match self.process_stored_group(&username, transcripts).await {
                Ok((created, updated)) => {
                    summary.groups_processed += 1;
                    summary.events_created += created;
                    summary.events_updated += updated;
                }
                Err(e) => {
                    tracing::error!(error = %e, user = %username, "analyzer group failed");
                }
            }
        }

        Ok(summary)
    }

    async fn process_stored_group(
        &self,
        username: &str,
        transcripts: Vec<vesper_core::domain::TranscriptionResult>,
    ) -> Result<(usize, usize)> {
        let ids: Vec<_> = transcripts.iter().map(|t| t.id).collect();
        let claimed = self.transcripts.try_claim_processing(&ids).await?;
        if claimed.is_empty() {
            // Another worker already claimed this group this cycle.
            return Ok((0, 0));
        }
        let claimed_set: std::collections::HashSet<_> = claimed.iter().copied().collect();
        let mut ordered: Vec<_> = transcripts.into_iter().filter(|t| claimed_set.contains(&t.id)).collect();
        ordered.sort_by_key(|t| t.start_time);

        let raw_groups = group_into_raw_events(&ordered, self.config.event_gap_seconds);

        let result = self.run_state_machine(username, &raw_groups).await;

        match &result {
            Ok(_) => self.transcripts.mark_status(&claimed, AnalysisStatus::Completed).await?,
            Err(_) => self.transcripts.mark_status(&claimed, AnalysisStatus::Failed).await?,
        }

        let (created, updated) = result?;
        Ok((created, updated))
    }

    /// Processes one user's already-built raw groups against their ongoing
    /// events (spec.md §4.3 steps 5-7). Shared by the periodic cycle and the
    /// immediate single-transcript endpoint.
    async fn run_state_machine(&self, username: &str, raw_groups: &[RawGroup]) -> Result<(usize, usize)> {
        let mut ongoing = self.events.ongoing_for_user(username).await?;
        let mut touched: Vec<Event> = Vec::new();
        let mut created = 0usize;
        let mut updated = 0usize;

        for group in raw_groups {
            let continue_idx = ongoing
                .iter()
                .position(|e| (group.start_time - e.end_timestamp).num_seconds() <= self.config.event_gap_seconds);

            if let Some(idx) = continue_idx {
                let mut event = ongoing.remove(idx);
                let prompt = self.prompts.continue_ongoing(&event.title, &event.summary, &event.story, &group.text);
                let out = self.llm.ongoing(&prompt).await;

                event.title = out.event_title;
                event.summary = out.event_summary.clone();
                event.story = out.event_story;
                event.end_timestamp = group.end_time;
                event.last_processed_at = Utc::now();
                event.one_sentence_summary = out.event_summary;
                event.time_range = vesper_core::domain::format_time_range(event.start_timestamp, event.end_timestamp);
                event.duration_minutes = vesper_core::domain::duration_minutes(event.start_timestamp, event.end_timestamp);

                updated += 1;
                touched.push(event.clone());
                ongoing.push(event);
            } else {
                let mut still_ongoing = Vec::new();
                for mut event in ongoing.drain(..) {
                    let gap = (group.start_time - event.end_timestamp).num_seconds();
                    if gap > self.config.event_gap_seconds {
                        let prompt = self.prompts.complete_event(&event.title, &event.summary, &event.story, "");
                        let out = self.llm.completed(&prompt).await;

                        event.title = out.event_title;
                        event.summary = out.event_summary.clone();
                        event.story = out.event_story;
                        event.location = out.location;
                        event.people_involved = out.people_involved;
                        event.activity_type = parse_activity_type(&out.activity_type);
                        event.interaction_dynamic = out.interaction_dynamic;
                        event.inferred_impact = out.inferred_impact;
                        event.topic_labels = out.topic_labels;
                        event.mood_labels = out.mood_labels;
                        event.action_item = out.action_item;
                        event.mood_score = out.mood_score as f64;
                        event.stress_level = out.stress_level as f64;
                        event.energy_level = out.energy_level as f64;
                        event.last_processed_at = Utc::now();
                        event.one_sentence_summary = out.event_summary;
                        event.event_status = EventStatus::Completed;

                        touched.push(event);
                    } else {
                        still_ongoing.push(event);
                    }
                }
                ongoing = still_ongoing;

                let prompt = self.prompts.new_ongoing(&group.text);
                let out = self.llm.ongoing(&prompt).await;
                let new_event =
                    Event::new_ongoing(username, out.event_title, out.event_summary, out.event_story, group.start_time, group.end_time);

                created += 1;
                touched.push(new_event.clone());
                ongoing.push(new_event);
            }
        }

        for event in &touched {
            self.events.upsert(event).await?;
        }

        Ok((created, updated))
    }

    /// The immediate single-transcript entry point (spec.md §4.3,
    /// `POST /action/analyze/incremental/v1/`). `time_stamp` selects which
    /// transcript to analyze at the HTTP layer; it plays no part in local
    /// date bucketing (SPEC_FULL.md Open Question (i)).
    pub async fn analyze_freeform(&self, username: &str, new_transcript: &str) -> Result<IncrementalAnalyzeOutcome> {
        let chunks = parse_time_marked_chunks(new_transcript);
        if chunks.is_empty() {
            let total = self.events.count_for_user(username).await?;
            return Ok(IncrementalAnalyzeOutcome { new_events_count: 0, updated_events_count: 0, total_events_count: total });
        }

        let raw_groups = group_chunks(&chunks, self.config.event_gap_seconds);
        let (created, updated) = self.run_state_machine(username, &raw_groups).await?;
        let total = self.events.count_for_user(username).await?;

        Ok(IncrementalAnalyzeOutcome { new_events_count: created, updated_events_count: updated, total_events_count: total })
    }
}

fn parse_activity_type(s: &str) -> ActivityType {
    match s {
        "work" => ActivityType::Work,
        "exercise" => ActivityType::Exercise,
        "social" => ActivityType::Social,
        "learning" => ActivityType::Learning,
        "self_care" => ActivityType::SelfCare,
        "chores" => ActivityType::Chores,
        "commute" => ActivityType::Commute,
        "meal" => ActivityType::Meal,
        "leisure" => ActivityType::Leisure,
        _ => ActivityType::Unknown,
    }
}
