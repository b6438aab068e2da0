use thiserror::Error;

#[derive(Debug, Error)]
pub enum MentalStateError {
    #[error(transparent)]
    Storage(#[from] vesper_storage::StorageError),

    #[error("invalid timezone: {0}")]
    InvalidTimezone(String),
}

impl MentalStateError {
    pub fn code(&self) -> &'static str {
        match self {
            MentalStateError::Storage(e) => e.code(),
            MentalStateError::InvalidTimezone(_) => "invalid_timezone",
        }
    }
}

impl From<vesper_core::VesperError> for MentalStateError {
    fn from(e: vesper_core::VesperError) -> Self {
        match e {
            vesper_core::VesperError::InvalidTimezone(tz) => MentalStateError::InvalidTimezone(tz),
            other => MentalStateError::InvalidTimezone(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, MentalStateError>;
