use thiserror::Error;

/// Shared error surface for invariant and lookup failures that every crate
/// in the workspace can hit (missing user, malformed id, bad timezone).
#[derive(Debug, Error)]
pub enum VesperError {
    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("invalid id: {0}")]
    InvalidId(String),

    #[error("invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("invariant violated: {0}")]
    Invariant(String),
}

impl VesperError {
    /// Short machine-readable code, stable across refactors, suitable for
    /// log fields and HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            VesperError::UserNotFound(_) => "user_not_found",
            VesperError::InvalidId(_) => "invalid_id",
            VesperError::InvalidTimezone(_) => "invalid_timezone",
            VesperError::Invariant(_) => "invariant_violation",
        }
    }
}
