//! Maps every crate's error type into the HTTP surface's `{"error": "..."}`
//! envelope (spec.md §7): internal failures become 5xx, invariant-violation
//! lookups (missing user) become 404, and unparseable date/timezone input on
//! the C5 endpoint becomes 400.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Storage(#[from] vesper_storage::StorageError),

    #[error(transparent)]
    Analyzer(#[from] vesper_analyzer::AnalyzerError),

    #[error(transparent)]
    MentalState(#[from] vesper_mentalstate::MentalStateError),

    #[error(transparent)]
    Core(#[from] vesper_core::VesperError),

    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("user not found: {0}")]
    UserNotFound(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            GatewayError::Storage(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.code()),
            GatewayError::Analyzer(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.code()),
            GatewayError::MentalState(vesper_mentalstate::MentalStateError::InvalidTimezone(_)) => {
                (StatusCode::BAD_REQUEST, "invalid_timezone")
            }
            GatewayError::MentalState(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.code()),
            GatewayError::Core(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.code()),
            GatewayError::Unauthenticated(_) => (StatusCode::UNAUTHORIZED, "unauthenticated"),
            GatewayError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            GatewayError::UserNotFound(_) => (StatusCode::NOT_FOUND, "user_not_found"),
        };

        tracing::error!(error = %self, code, "request failed");
        (status, Json(ErrorBody { error: self.to_string(), code })).into_response()
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
