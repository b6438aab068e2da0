pub mod error;
pub mod kv;
pub mod object_store;
pub mod pool;
pub mod repo;

pub use error::{Result, StorageError};
pub use kv::KvStore;
pub use object_store::{ObjectStore, ObjectSummary, S3ObjectStore};
