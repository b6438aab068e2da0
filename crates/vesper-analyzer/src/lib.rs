pub mod analyzer;
pub mod error;
pub mod grouping;
pub mod llm;
pub mod prompts;
pub mod reflection;
pub mod transcript;
pub mod worker;

pub use analyzer::{AnalyzerConfig, IncrementalAnalyzeOutcome, IncrementalAnalyzer};
pub use error::{AnalyzerError, Result};
pub use llm::AnalyzerLlmClient;
pub use prompts::PromptLibrary;
pub use reflection::{ReflectionConfig, ReflectionWorker};
