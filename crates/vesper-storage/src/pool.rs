use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::error::Result;

pub async fn connect_postgres(url: &str, max_connections: u32) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| {
        tracing::error!(error = %e, "migration failed");
        sqlx::Error::Migrate(Box::new(e))
    })?;
    Ok(pool)
}

pub fn connect_redis(url: &str) -> Result<deadpool_redis::Pool> {
    let cfg = deadpool_redis::Config::from_url(url);
    let pool = cfg
        .create_pool(Some(deadpool_redis::Runtime::Tokio1))
        .map_err(|e| crate::error::StorageError::ObjectStore(format!("redis pool build failed: {e}")))?;
    Ok(pool)
}
