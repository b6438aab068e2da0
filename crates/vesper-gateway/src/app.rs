use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::sync::watch;

use vesper_analyzer::IncrementalAnalyzer;
use vesper_core::config::VesperConfig;
use vesper_mentalstate::MentalStateCalculator;
use vesper_storage::repo::{EventRepo, TranscriptionResultRepo, UserRepo};
use vesper_storage::KvStore;

/// Central shared state — passed as `Arc<AppState>` to every Axum handler.
/// Background workers (C2/C3/C4) are constructed and spawned in `main.rs`
/// against the same repositories but are not reachable through `AppState`;
/// only the read/trigger surface in spec.md §6 runs through the gateway.
/// `pg_pool`/`redis_pool` are raw handles kept alongside the repo wrappers
/// solely so `/readyz` can ping both stores directly.
pub struct AppState {
    pub config: VesperConfig,
    pub users: UserRepo,
    pub events: EventRepo,
    pub transcripts: TranscriptionResultRepo,
    pub kv: KvStore,
    pub pg_pool: sqlx::PgPool,
    pub redis_pool: deadpool_redis::Pool,
    pub analyzer: Arc<IncrementalAnalyzer>,
    pub mental_state: MentalStateCalculator,
    pub shutdown: watch::Sender<bool>,
}

/// Assembles the HTTP surface the core assumes (spec.md §6). Routing, CORS,
/// and request/response envelope conventions beyond this are the excluded
/// presentation layer's concern — this is the minimum the core itself serves.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(crate::http::health::healthz_handler))
        .route("/readyz", get(crate::http::health::readyz_handler))
        .route(
            "/action/analyze/incremental/v1/",
            post(crate::http::analyze::analyze_incremental_handler),
        )
        .route(
            "/action/analyze/events/get/v1/",
            post(crate::http::analyze::analyze_events_get_handler),
        )
        .route(
            "/action/get_events_by_date/v1/",
            get(crate::http::events::get_events_by_date_handler),
        )
        .route(
            "/api/insights/mental-state",
            get(crate::http::insights::mental_state_handler),
        )
        .route(
            "/api/v1/transcriptions",
            get(crate::http::transcriptions::list_transcriptions_handler),
        )
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(tower_http::cors::CorsLayer::permissive())
}
