//! `GET /action/get_events_by_date/v1/?date=YYYY-MM-DD&timezone=IANA`
//! (spec.md §6): day-filtered events in the user's timezone.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use chrono::{NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::error::{GatewayError, Result};
use crate::principal::Principal;

#[derive(Debug, Deserialize)]
pub struct GetEventsByDateQuery {
    pub date: String,
    pub timezone: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GetEventsByDateResponse {
    pub events: Vec<vesper_core::domain::Event>,
    pub total_count: i64,
    pub date: String,
    pub timezone: String,
}

pub async fn get_events_by_date_handler(
    State(state): State<Arc<AppState>>,
    Principal(username): Principal,
    Query(params): Query<GetEventsByDateQuery>,
) -> Result<Json<GetEventsByDateResponse>> {
    let date = NaiveDate::parse_from_str(&params.date, "%Y-%m-%d")
        .map_err(|_| GatewayError::BadRequest(format!("unparseable date: {}", params.date)))?;

    let tz_name = match params.timezone {
        Some(tz) => tz,
        None => state
            .kv
            .get_user_context(&username)
            .await?
            .map(|ctx| ctx.timezone)
            .unwrap_or_else(|| "UTC".to_string()),
    };
    let tz = vesper_core::time::parse_timezone(&tz_name).map_err(|_| GatewayError::BadRequest(format!("unparseable timezone: {tz_name}")))?;

    let local_start = tz
        .from_local_datetime(&date.and_hms_opt(0, 0, 0).unwrap())
        .single()
        .ok_or_else(|| GatewayError::BadRequest(format!("ambiguous local midnight for {date} in {tz_name}")))?;
    let local_end = local_start + chrono::Duration::days(1) - chrono::Duration::milliseconds(1);

    let events = state
        .events
        .by_range(&username, local_start.with_timezone(&chrono::Utc), local_end.with_timezone(&chrono::Utc))
        .await?;

    Ok(Json(GetEventsByDateResponse {
        total_count: events.len() as i64,
        events,
        date: params.date,
        timezone: tz_name,
    }))
}
