use thiserror::Error;

#[derive(Debug, Error)]
pub enum TranscribeError {
    #[error(transparent)]
    Storage(#[from] vesper_storage::StorageError),

    #[error("vendor request failed: {0}")]
    Vendor(String),

    #[error("vendor rate limited, retry after {0}s")]
    RateLimited(u64),

    #[error("diarization job failed")]
    DiarizationFailed,

    #[error("diarization poll timed out")]
    DiarizationTimedOut,

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("audio decode error: {0}")]
    AudioDecode(String),
}

impl TranscribeError {
    pub fn code(&self) -> &'static str {
        match self {
            TranscribeError::Storage(e) => e.code(),
            TranscribeError::Vendor(_) => "vendor_error",
            TranscribeError::RateLimited(_) => "vendor_rate_limited",
            TranscribeError::DiarizationFailed => "diarization_failed",
            TranscribeError::DiarizationTimedOut => "diarization_timed_out",
            TranscribeError::Http(_) => "http_error",
            TranscribeError::AudioDecode(_) => "audio_decode_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, TranscribeError>;
