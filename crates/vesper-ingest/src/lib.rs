pub mod batch_manager;
pub mod error;
pub mod ingest;
pub mod metadata;
pub mod queue;
pub mod reconciliation;
pub mod vad;
pub mod worker;

pub use batch_manager::{BatchManager, BatchManagerConfig};
pub use error::{IngestError, Result};
pub use ingest::{IngestWorker, ProcessOutcome};
pub use reconciliation::Reconciler;
