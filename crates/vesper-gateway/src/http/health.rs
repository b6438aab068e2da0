use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::app::AppState;

/// `GET /healthz` — liveness probe. Does not touch the database; background
/// workers are either running or the process would already be dead.
pub async fn healthz_handler(State(_state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// `GET /readyz` — readiness probe: pings Postgres and Redis so a load
/// balancer can hold off routing traffic until both stores answer.
pub async fn readyz_handler(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    let pg_ok = sqlx::query("SELECT 1").fetch_one(&state.pg_pool).await.is_ok();

    let redis_ok = match state.redis_pool.get().await {
        Ok(mut conn) => {
            let pong: Result<String, _> = deadpool_redis::redis::cmd("PING").query_async(&mut conn).await;
            pong.is_ok()
        }
        Err(_) => false,
    };

    if pg_ok && redis_ok {
        (StatusCode::OK, Json(json!({ "status": "ok", "postgres": pg_ok, "redis": redis_ok })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "unavailable", "postgres": pg_ok, "redis": redis_ok })),
        )
    }
}
