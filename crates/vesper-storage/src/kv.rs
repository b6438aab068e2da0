use deadpool_redis::{redis::AsyncCommands, Pool};
use vesper_core::domain::UserContext;

use crate::error::Result;

/// Key/value tier: UserContext, pending upload-transcript staging, and an
/// optional session cache. Keys follow the original system's convention so
/// operators reading Redis directly recognize the shape.
#[derive(Clone)]
pub struct KvStore {
    pool: Pool,
}

impl KvStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    fn context_key(username: &str) -> String {
        format!("context:{username}")
    }

    pub async fn get_user_context(&self, username: &str) -> Result<Option<UserContext>> {
        let mut conn = self.pool.get().await?;
        let raw: Option<String> = conn.get(Self::context_key(username)).await?;
        Ok(match raw {
            Some(s) => Some(serde_json::from_str(&s)?),
            None => None,
        })
    }

    pub async fn set_user_context(&self, ctx: &UserContext) -> Result<()> {
        let mut conn = self.pool.get().await?;
        let raw = serde_json::to_string(ctx)?;
        conn.set_ex::<_, _, ()>(Self::context_key(&ctx.username), raw, UserContext::TTL_SECONDS)
            .await?;
        Ok(())
    }

    /// Pending upload-transcript staging key, TTL configurable (default 60s).
    /// `upload_transcript:{user}:{timestamp}:{n}`.
    pub async fn stage_upload_transcript(
        &self,
        username: &str,
        timestamp: i64,
        n: u32,
        payload: &serde_json::Value,
        ttl_seconds: u64,
    ) -> Result<()> {
        let mut conn = self.pool.get().await?;
        let key = format!("upload_transcript:{username}:{timestamp}:{n}");
        let raw = serde_json::to_string(payload)?;
        conn.set_ex::<_, _, ()>(key, raw, ttl_seconds).await?;
        Ok(())
    }

    pub async fn display_name_cached(&self, username: &str) -> Result<Option<String>> {
        let mut conn = self.pool.get().await?;
        Ok(conn.get(format!("display_name:{username}")).await?)
    }

    pub async fn cache_display_name(&self, username: &str, display_name: &str, ttl_seconds: u64) -> Result<()> {
        let mut conn = self.pool.get().await?;
        conn.set_ex::<_, _, ()>(format!("display_name:{username}"), display_name, ttl_seconds)
            .await?;
        Ok(())
    }

    pub async fn is_token_blacklisted(&self, jti: &str) -> Result<bool> {
        let mut conn = self.pool.get().await?;
        let exists: bool = conn.exists(format!("token_blacklist:{jti}")).await?;
        Ok(exists)
    }

    pub async fn blacklist_token(&self, jti: &str, ttl_seconds: u64) -> Result<()> {
        let mut conn = self.pool.get().await?;
        conn.set_ex::<_, _, ()>(format!("token_blacklist:{jti}"), "1", ttl_seconds)
            .await?;
        Ok(())
    }
}
