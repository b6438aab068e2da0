use async_trait::async_trait;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::Client as S3Client;
use std::time::Duration;

use crate::error::{Result, StorageError};

/// One object-store listing entry, used by the reconciliation sweep.
#[derive(Debug, Clone)]
pub struct ObjectSummary {
    pub key: String,
    pub last_modified: chrono::DateTime<chrono::Utc>,
    pub size: i64,
}

/// Narrow seam over S3 so the ingest/transcribe crates can be tested against
/// an in-memory fake without a live bucket.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get_object(&self, key: &str) -> Result<Vec<u8>>;
    async fn get_object_metadata(&self, key: &str) -> Result<std::collections::HashMap<String, String>>;
    async fn put_object(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()>;
    async fn delete_object(&self, key: &str) -> Result<()>;
    async fn presigned_get_url(&self, key: &str, expires_in: Duration) -> Result<String>;
    /// Lists keys under `prefix` modified since `since`, per the
    /// reconciliation sweep's 24h window (spec.md §4.1 step 4).
    async fn list_since(&self, prefix: &str, since: chrono::DateTime<chrono::Utc>, max_keys: usize) -> Result<Vec<ObjectSummary>>;
}

pub struct S3ObjectStore {
    client: S3Client,
    bucket: String,
}

impl S3ObjectStore {
    pub fn new(client: S3Client, bucket: String) -> Self {
        Self { client, bucket }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn get_object(&self, key: &str) -> Result<Vec<u8>> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::ObjectStore(e.to_string()))?;
        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::ObjectStore(e.to_string()))?;
        Ok(bytes.into_bytes().to_vec())
    }

    async fn get_object_metadata(&self, key: &str) -> Result<std::collections::HashMap<String, String>> {
        let output = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::ObjectStore(e.to_string()))?;
        Ok(output.metadata().cloned().unwrap_or_default())
    }

    async fn put_object(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(bytes.into())
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::ObjectStore(e.to_string()))?;
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::ObjectStore(e.to_string()))?;
        Ok(())
    }

    async fn presigned_get_url(&self, key: &str, expires_in: Duration) -> Result<String> {
        let presigning = PresigningConfig::expires_in(expires_in)
            .map_err(|e| StorageError::ObjectStore(e.to_string()))?;
        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| StorageError::ObjectStore(e.to_string()))?;
        Ok(presigned.uri().to_string())
    }

    async fn list_since(&self, prefix: &str, since: chrono::DateTime<chrono::Utc>, max_keys: usize) -> Result<Vec<ObjectSummary>> {
        let mut out = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut req = self.client.list_objects_v2().bucket(&self.bucket).prefix(prefix);
            if let Some(token) = &continuation_token {
                req = req.continuation_token(token);
            }
            let resp = req.send().await.map_err(|e| StorageError::ObjectStore(e.to_string()))?;

            for obj in resp.contents() {
                let Some(key) = obj.key() else { continue };
                let Some(last_modified) = obj.last_modified() else { continue };
                let last_modified = chrono::DateTime::from_timestamp(last_modified.secs(), 0).unwrap_or_default();
                if last_modified < since {
                    continue;
                }
                out.push(ObjectSummary {
                    key: key.to_string(),
                    last_modified,
                    size: obj.size().unwrap_or_default(),
                });
                if out.len() >= max_keys {
                    return Ok(out);
                }
            }

            continuation_token = resp.next_continuation_token().map(str::to_string);
            if continuation_token.is_none() {
                break;
            }
        }

        Ok(out)
    }
}
