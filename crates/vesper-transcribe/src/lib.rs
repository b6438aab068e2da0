pub mod audio;
pub mod error;
pub mod merge;
pub mod vendor;
pub mod worker;

pub use error::{Result, TranscribeError};
pub use worker::{BatchWorker, BatchWorkerConfig};
