//! Captured-at / timezone-offset derivation from object-store user metadata,
//! per spec.md §4.1 and §6: `capturedat` (Unix millis, string) takes
//! priority, then `capture-time` (ISO-8601), then upload time as the final
//! fallback.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

pub fn derive_captured_at(metadata: &HashMap<String, String>, upload_time: DateTime<Utc>) -> DateTime<Utc> {
    if let Some(millis) = metadata.get("capturedat").and_then(|s| s.parse::<i64>().ok()) {
        if let Some(dt) = DateTime::from_timestamp_millis(millis) {
            return dt;
        }
    }
    if let Some(iso) = metadata.get("capture-time") {
        if let Ok(dt) = DateTime::parse_from_rfc3339(iso) {
            return dt.with_timezone(&Utc);
        }
    }
    upload_time
}

/// Minutes, signed; defaults to 0 (UTC) when absent or unparseable.
pub fn derive_timezone_offset_minutes(metadata: &HashMap<String, String>) -> i32 {
    metadata
        .get("timezone-offset")
        .and_then(|s| s.parse::<i32>().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_capturedat_millis() {
        let mut meta = HashMap::new();
        meta.insert("capturedat".to_string(), "1700000000000".to_string());
        meta.insert("capture-time".to_string(), "2020-01-01T00:00:00Z".to_string());
        let upload = Utc::now();
        let captured = derive_captured_at(&meta, upload);
        assert_eq!(captured.timestamp_millis(), 1_700_000_000_000);
    }

    #[test]
    fn falls_back_to_capture_time() {
        let mut meta = HashMap::new();
        meta.insert("capture-time".to_string(), "2023-11-14T22:13:20Z".to_string());
        let upload = Utc::now();
        let captured = derive_captured_at(&meta, upload);
        assert_eq!(captured.timestamp(), 1_700_000_000);
    }

    #[test]
    fn falls_back_to_upload_time() {
        let meta = HashMap::new();
        let upload = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        assert_eq!(derive_captured_at(&meta, upload), upload);
    }

    #[test]
    fn timezone_offset_defaults_to_zero() {
        let meta = HashMap::new();
        assert_eq!(derive_timezone_offset_minutes(&meta), 0);
    }
}
