use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error(transparent)]
    Storage(#[from] vesper_storage::StorageError),

    #[error("llm request failed: {0}")]
    Llm(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("prompt template not found: {0}")]
    MissingPrompt(String),

    #[error("prompt template io error: {0}")]
    PromptIo(#[from] std::io::Error),
}

impl AnalyzerError {
    pub fn code(&self) -> &'static str {
        match self {
            AnalyzerError::Storage(e) => e.code(),
            AnalyzerError::Llm(_) => "llm_error",
            AnalyzerError::Http(_) => "http_error",
            AnalyzerError::MissingPrompt(_) => "missing_prompt",
            AnalyzerError::PromptIo(_) => "prompt_io_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalyzerError>;
