use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Storage(#[from] vesper_storage::StorageError),

    #[error("queue error: {0}")]
    Queue(String),

    #[error("vad processing failed: {0}")]
    Vad(String),

    #[error("unrecognized object key shape: {0}")]
    BadKeyShape(String),
}

impl IngestError {
    pub fn code(&self) -> &'static str {
        match self {
            IngestError::Storage(e) => e.code(),
            IngestError::Queue(_) => "queue_error",
            IngestError::Vad(_) => "vad_error",
            IngestError::BadKeyShape(_) => "bad_key_shape",
        }
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
