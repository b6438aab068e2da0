//! Plain domain types shared by every crate. No storage dependency here —
//! `vesper-storage` maps these to and from rows; nobody else needs to know
//! that.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::{AudioFileId, BatchId, EventId, MentalStateScoreId, TranscriptionResultId, UserId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub password_hash: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Ephemeral per-user session info, stored in the key/value tier with a
/// rolling 7-day expiration. `context:{user}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserContext {
    pub username: String,
    pub timezone: String,
    pub locale: String,
    pub last_updated: DateTime<Utc>,
}

impl UserContext {
    pub const TTL_SECONDS: u64 = 7 * 24 * 3600;

    pub fn default_for(username: &str) -> Self {
        Self {
            username: username.to_string(),
            timezone: "UTC".to_string(),
            locale: "en-US".to_string(),
            last_updated: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioFileStatus {
    Uploaded,
    VadComplete,
    NoSpeech,
    VadFailed,
    Transcribed,
}

impl fmt::Display for AudioFileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AudioFileStatus::Uploaded => "uploaded",
            AudioFileStatus::VadComplete => "vad_complete",
            AudioFileStatus::NoSpeech => "no_speech",
            AudioFileStatus::VadFailed => "vad_failed",
            AudioFileStatus::Transcribed => "transcribed",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for AudioFileStatus {
    type Err = crate::VesperError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "uploaded" => AudioFileStatus::Uploaded,
            "vad_complete" => AudioFileStatus::VadComplete,
            "no_speech" => AudioFileStatus::NoSpeech,
            "vad_failed" => AudioFileStatus::VadFailed,
            "transcribed" => AudioFileStatus::Transcribed,
            other => {
                return Err(crate::VesperError::Invariant(format!(
                    "unknown audio file status: {other}"
                )))
            }
        })
    }
}

/// A `[start_seconds, end_seconds]` span of detected speech within one file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SpeechInterval {
    pub start_seconds: f64,
    pub end_seconds: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioFile {
    pub id: AudioFileId,
    pub username: String,
    pub bucket: String,
    pub object_key: String,
    pub captured_at: DateTime<Utc>,
    pub uploaded_at: DateTime<Utc>,
    pub content_size: i64,
    pub format: String,
    pub status: AudioFileStatus,
    pub batch_id: Option<BatchId>,
    pub timezone_offset_minutes: i32,

    pub speech_intervals: Vec<SpeechInterval>,
    pub segment_count: Option<i32>,
    pub total_speech_duration: Option<f64>,
    pub speech_ratio: Option<f64>,
    pub total_duration: Option<f64>,
    pub vad_processed_at: Option<DateTime<Utc>>,
    pub vad_error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Accumulating,
    Processing,
    Completed,
    Failed,
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BatchStatus::Accumulating => "accumulating",
            BatchStatus::Processing => "processing",
            BatchStatus::Completed => "completed",
            BatchStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for BatchStatus {
    type Err = crate::VesperError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "accumulating" => BatchStatus::Accumulating,
            "processing" => BatchStatus::Processing,
            "completed" => BatchStatus::Completed,
            "failed" => BatchStatus::Failed,
            other => {
                return Err(crate::VesperError::Invariant(format!(
                    "unknown batch status: {other}"
                )))
            }
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub id: BatchId,
    pub username: String,
    pub first_segment_time: DateTime<Utc>,
    pub last_segment_time: DateTime<Utc>,
    pub segment_count: i32,
    pub total_speech_duration: f64,
    pub status: BatchStatus,
    pub processed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AnalysisStatus::Pending => "pending",
            AnalysisStatus::Processing => "processing",
            AnalysisStatus::Completed => "completed",
            AnalysisStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for AnalysisStatus {
    type Err = crate::VesperError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "pending" => AnalysisStatus::Pending,
            "processing" => AnalysisStatus::Processing,
            "completed" => AnalysisStatus::Completed,
            "failed" => AnalysisStatus::Failed,
            other => {
                return Err(crate::VesperError::Invariant(format!(
                    "unknown analysis status: {other}"
                )))
            }
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionResult {
    pub id: TranscriptionResultId,
    pub username: String,
    pub batch_id: BatchId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub transcription_text: String,
    pub confidence: f64,
    pub language: String,
    pub sentiment: Option<serde_json::Value>,
    pub topics: Option<serde_json::Value>,
    pub intents: Option<serde_json::Value>,
    pub segment_count: i32,
    pub raw_vendor_response: Option<serde_json::Value>,
    pub analysis_status: AnalysisStatus,
    pub analyzed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Ongoing,
    Completed,
    Dropped,
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventStatus::Ongoing => "ongoing",
            EventStatus::Completed => "completed",
            EventStatus::Dropped => "dropped",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for EventStatus {
    type Err = crate::VesperError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "ongoing" => EventStatus::Ongoing,
            "completed" => EventStatus::Completed,
            "dropped" => EventStatus::Dropped,
            other => {
                return Err(crate::VesperError::Invariant(format!(
                    "unknown event status: {other}"
                )))
            }
        })
    }
}

/// Closed set of activity types, per spec.md §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Work,
    Exercise,
    Social,
    Learning,
    SelfCare,
    Chores,
    Commute,
    Meal,
    Leisure,
    Unknown,
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActivityType::Work => "work",
            ActivityType::Exercise => "exercise",
            ActivityType::Social => "social",
            ActivityType::Learning => "learning",
            ActivityType::SelfCare => "self_care",
            ActivityType::Chores => "chores",
            ActivityType::Commute => "commute",
            ActivityType::Meal => "meal",
            ActivityType::Leisure => "leisure",
            ActivityType::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub username: String,
    pub event_status: EventStatus,

    pub start_timestamp: DateTime<Utc>,
    pub end_timestamp: DateTime<Utc>,
    pub last_processed_at: DateTime<Utc>,
    pub time_range: String,
    pub duration_minutes: i64,

    pub title: String,
    pub summary: String,
    pub story: String,

    pub location: String,
    pub activity_type: ActivityType,
    pub interaction_dynamic: String,
    pub inferred_impact: String,
    pub topic_labels: Vec<String>,
    pub mood_labels: Vec<String>,
    pub people_involved: Vec<String>,
    pub one_sentence_summary: String,
    pub action_item: String,

    pub mood_score: f64,
    pub stress_level: f64,
    pub energy_level: f64,
}

impl Event {
    /// Defaults applied to a fresh ongoing event, per spec.md §4.3 step 6.
    pub fn new_ongoing(username: &str, title: String, summary: String, story: String, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        let now = Utc::now();
        Self {
            id: EventId::new(),
            username: username.to_string(),
            event_status: EventStatus::Ongoing,
            start_timestamp: start,
            end_timestamp: end,
            last_processed_at: now,
            time_range: format_time_range(start, end),
            duration_minutes: duration_minutes(start, end),
            title,
            summary,
            story,
            location: String::new(),
            activity_type: ActivityType::Unknown,
            interaction_dynamic: String::new(),
            inferred_impact: String::new(),
            topic_labels: Vec::new(),
            mood_labels: vec!["neutral".to_string()],
            people_involved: Vec::new(),
            one_sentence_summary: String::new(),
            action_item: String::new(),
            mood_score: 7.0,
            stress_level: 5.0,
            energy_level: 7.0,
        }
    }
}

pub fn format_time_range(start: DateTime<Utc>, end: DateTime<Utc>) -> String {
    format!("{}-{}", start.format("%H:%M:%S"), end.format("%H:%M:%S"))
}

pub fn duration_minutes(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    (end - start).num_seconds().max(0) / 60
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MentalStateSource {
    Event,
    Interpolated,
    Baseline,
}

impl fmt::Display for MentalStateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MentalStateSource::Event => "event",
            MentalStateSource::Interpolated => "interpolated",
            MentalStateSource::Baseline => "baseline",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MentalStateScore {
    pub id: MentalStateScoreId,
    pub username: String,
    pub timestamp: DateTime<Utc>,
    pub energy: f64,
    pub stress: f64,
    pub confidence: f64,
    pub data_source: MentalStateSource,
    pub event_id: Option<EventId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyReflection {
    pub username: String,
    pub local_date: chrono::NaiveDate,
    pub gratitude: Vec<String>,
    pub challenges: Vec<String>,
    pub learning: Vec<String>,
    pub connections: Vec<String>,
    pub looking_forward: Vec<String>,
    pub created_at: DateTime<Utc>,
}
