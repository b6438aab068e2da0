use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("redis pool error: {0}")]
    RedisPool(#[from] deadpool_redis::PoolError),

    #[error("redis error: {0}")]
    Redis(#[from] deadpool_redis::redis::RedisError),

    #[error("object store error: {0}")]
    ObjectStore(String),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error(transparent)]
    Core(#[from] vesper_core::VesperError),
}

impl StorageError {
    pub fn code(&self) -> &'static str {
        match self {
            StorageError::Database(_) => "database_error",
            StorageError::RedisPool(_) => "redis_pool_error",
            StorageError::Redis(_) => "redis_error",
            StorageError::ObjectStore(_) => "object_store_error",
            StorageError::Serde(_) => "serde_error",
            StorageError::Core(e) => e.code(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;
