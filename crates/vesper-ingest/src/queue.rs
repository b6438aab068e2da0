//! Upload-notification queue. Messages are the object-store `Records[*]`
//! envelope (spec.md §6): `eventName`, `eventTime`, `s3.bucket.name`,
//! `s3.object.key`, `s3.object.size`.

use async_trait::async_trait;
use aws_sdk_sqs::Client as SqsClient;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::{IngestError, Result};

#[derive(Debug, Clone)]
pub struct UploadNotification {
    pub bucket: String,
    pub key: String,
    pub size: i64,
    pub event_time: DateTime<Utc>,
    pub is_object_created: bool,
}

#[derive(Debug, Clone)]
pub struct ReceivedMessage {
    pub receipt_handle: String,
    pub notification: Option<UploadNotification>,
}

#[async_trait]
pub trait UploadQueue: Send + Sync {
    async fn receive(&self, max_messages: i32, wait_seconds: i32, visibility_timeout: i32) -> Result<Vec<ReceivedMessage>>;
    async fn delete(&self, receipt_handle: &str) -> Result<()>;
}

pub struct SqsUploadQueue {
    client: SqsClient,
    queue_url: String,
}

impl SqsUploadQueue {
    pub fn new(client: SqsClient, queue_url: String) -> Self {
        Self { client, queue_url }
    }
}

#[async_trait]
impl UploadQueue for SqsUploadQueue {
    async fn receive(&self, max_messages: i32, wait_seconds: i32, visibility_timeout: i32) -> Result<Vec<ReceivedMessage>> {
        let resp = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(max_messages)
            .wait_time_seconds(wait_seconds)
            .visibility_timeout(visibility_timeout)
            .send()
            .await
            .map_err(|e| IngestError::Queue(e.to_string()))?;

        let mut out = Vec::new();
        for msg in resp.messages() {
            let Some(receipt_handle) = msg.receipt_handle().map(str::to_string) else {
                continue;
            };
            let notification = msg.body().and_then(parse_envelope);
            out.push(ReceivedMessage {
                receipt_handle,
                notification,
            });
        }
        Ok(out)
    }

    async fn delete(&self, receipt_handle: &str) -> Result<()> {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(|e| IngestError::Queue(e.to_string()))?;
        Ok(())
    }
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "Records")]
    records: Vec<Record>,
}

#[derive(Deserialize)]
struct Record {
    #[serde(rename = "eventName")]
    event_name: String,
    #[serde(rename = "eventTime")]
    event_time: DateTime<Utc>,
    s3: S3Detail,
}

#[derive(Deserialize)]
struct S3Detail {
    bucket: BucketDetail,
    object: ObjectDetail,
}

#[derive(Deserialize)]
struct BucketDetail {
    name: String,
}

#[derive(Deserialize)]
struct ObjectDetail {
    key: String,
    size: Option<i64>,
}

fn parse_envelope(body: &str) -> Option<UploadNotification> {
    let envelope: Envelope = serde_json::from_str(body).ok()?;
    let record = envelope.records.into_iter().next()?;
    Some(UploadNotification {
        is_object_created: record.event_name.starts_with("ObjectCreated"),
        bucket: record.s3.bucket.name,
        key: record.s3.object.key,
        size: record.s3.object.size.unwrap_or(0),
        event_time: record.event_time,
    })
}

/// Validates the `native-audio/{username}/{filename}` key shape, returning
/// the username and filename on success.
pub fn parse_native_audio_key(key: &str) -> Result<(String, String)> {
    let mut parts = key.splitn(3, '/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("native-audio"), Some(username), Some(filename)) if !username.is_empty() && !filename.is_empty() => {
            Ok((username.to_string(), filename.to_string()))
        }
        _ => Err(IngestError::BadKeyShape(key.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_key() {
        let (user, file) = parse_native_audio_key("native-audio/alice/seg_001.wav").unwrap();
        assert_eq!(user, "alice");
        assert_eq!(file, "seg_001.wav");
    }

    #[test]
    fn rejects_wrong_prefix() {
        assert!(parse_native_audio_key("other/alice/seg_001.wav").is_err());
    }

    #[test]
    fn rejects_missing_filename() {
        assert!(parse_native_audio_key("native-audio/alice/").is_err());
    }
}
