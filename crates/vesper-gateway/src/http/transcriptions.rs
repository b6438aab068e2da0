//! `GET /api/v1/transcriptions?page&page_size&start_date&end_date` (spec.md §6).

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::error::{GatewayError, Result};
use crate::principal::Principal;

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 200;

#[derive(Debug, Deserialize)]
pub struct ListTranscriptionsQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListTranscriptionsResponse {
    pub transcriptions: Vec<vesper_core::domain::TranscriptionResult>,
    pub page: i64,
    pub page_size: i64,
}

pub async fn list_transcriptions_handler(
    State(state): State<Arc<AppState>>,
    Principal(username): Principal,
    Query(params): Query<ListTranscriptionsQuery>,
) -> Result<Json<ListTranscriptionsResponse>> {
    let page = params.page.unwrap_or(1).max(1);
    let page_size = params.page_size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let start_date = params.start_date.as_deref().map(parse_date).transpose()?;
    let end_date = params.end_date.as_deref().map(parse_date).transpose()?;

    let transcriptions = state
        .transcripts
        .paginated(&username, page, page_size, start_date, end_date)
        .await?;

    Ok(Json(ListTranscriptionsResponse { transcriptions, page, page_size }))
}

fn parse_date(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|d| DateTime::<Utc>::from_naive_utc_and_offset(d.and_hms_opt(0, 0, 0).unwrap(), Utc))
        .map_err(|_| GatewayError::BadRequest(format!("unparseable date: {raw}")))
}
