//! `GET /api/insights/mental-state?date=YYYY-MM-DD&timezone=IANA` (spec.md §6).

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::app::AppState;
use crate::error::{GatewayError, Result};
use crate::principal::Principal;

#[derive(Debug, Deserialize)]
pub struct MentalStateQuery {
    /// Accepted for API-shape compatibility; C5 is an on-demand "as of now"
    /// calculator (spec.md §4.4), so `date` only gates input validation here
    /// rather than shifting the computed window.
    pub date: Option<String>,
    pub timezone: Option<String>,
}

pub async fn mental_state_handler(
    State(state): State<Arc<AppState>>,
    Principal(username): Principal,
    Query(params): Query<MentalStateQuery>,
) -> Result<Json<vesper_mentalstate::MentalStateInsights>> {
    if let Some(date) = &params.date {
        chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|_| GatewayError::BadRequest(format!("unparseable date: {date}")))?;
    }

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

    let insights = state.mental_state.insights(&username, tz).await?;
    Ok(Json(insights))
}
