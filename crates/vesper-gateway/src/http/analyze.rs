//! `POST /action/analyze/incremental/v1/` and
//! `POST /action/analyze/events/get/v1/` (spec.md §6).

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::error::{GatewayError, Result};
use crate::principal::Principal;

#[derive(Debug, Deserialize)]
pub struct AnalyzeIncrementalRequest {
    /// Caller-supplied timestamp. Per spec.md §4.3's analyzer contract and
    /// SPEC_FULL.md Open Question (i), local-date bucketing for grouping is
    /// always derived from the transcript's own content, never from this
    /// field — it is accepted for API-shape compatibility and logged, not
    /// used to pick a bucket.
    #[allow(dead_code)]
    pub time_stamp: Option<String>,
    pub new_transcript: String,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeIncrementalResponse {
    pub updated_events_count: usize,
    pub new_events_count: usize,
    pub total_events_count: i64,
    pub message: String,
}

/// Triggers C4 immediately for one transcript-shaped payload, outside the
/// periodic cycle.
pub async fn analyze_incremental_handler(
    State(state): State<Arc<AppState>>,
    Principal(username): Principal,
    Json(req): Json<AnalyzeIncrementalRequest>,
) -> Result<Json<AnalyzeIncrementalResponse>> {
    if req.new_transcript.trim().is_empty() {
        return Err(GatewayError::BadRequest("new_transcript must not be empty".to_string()));
    }

    let outcome = state.analyzer.analyze_freeform(&username, &req.new_transcript).await?;

    Ok(Json(AnalyzeIncrementalResponse {
        updated_events_count: outcome.updated_events_count,
        new_events_count: outcome.new_events_count,
        total_events_count: outcome.total_events_count,
        message: format!(
            "{} new, {} updated, {} total",
            outcome.new_events_count, outcome.updated_events_count, outcome.total_events_count
        ),
    }))
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeEventsGetRequest {
    pub time_stamp: String,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeEventsGetResponse {
    pub events: Vec<vesper_core::domain::Event>,
    pub total_count: i64,
    pub last_updated: DateTime<Utc>,
}

/// Returns the user's events for the UTC day containing `time_stamp`
/// (accepts Unix millis or RFC 3339; the UTC-bucketing policy matches the
/// analyzer's own local-date convention, SPEC_FULL.md Open Question (i)).
pub async fn analyze_events_get_handler(
    State(state): State<Arc<AppState>>,
    Principal(username): Principal,
    Json(req): Json<AnalyzeEventsGetRequest>,
) -> Result<Json<AnalyzeEventsGetResponse>> {
    let at = parse_time_stamp(&req.time_stamp)?;
    let day: NaiveDate = at.date_naive();
    let start = Utc.from_utc_datetime(&day.and_hms_opt(0, 0, 0).unwrap());
    let end = start + chrono::Duration::days(1) - chrono::Duration::milliseconds(1);

    let events = state.events.by_range(&username, start, end).await?;
    let last_updated = events.iter().map(|e| e.last_processed_at).max().unwrap_or_else(Utc::now);

    Ok(Json(AnalyzeEventsGetResponse {
        total_count: events.len() as i64,
        events,
        last_updated,
    }))
}

fn parse_time_stamp(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(millis) = raw.parse::<i64>() {
        return DateTime::from_timestamp_millis(millis)
            .ok_or_else(|| GatewayError::BadRequest(format!("time_stamp out of range: {raw}")));
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| GatewayError::BadRequest(format!("unparseable time_stamp: {raw}")))
}
