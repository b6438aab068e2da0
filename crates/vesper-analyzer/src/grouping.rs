//! Raw-event grouping (spec.md §4.3 steps 3-4): walk an ordered sequence of
//! `(time, text)` chunks and split into raw groups wherever the gap from
//! the previous chunk exceeds `T_event_gap`.

use chrono::{DateTime, Utc};
use vesper_core::domain::TranscriptionResult;

use crate::transcript::TimeMarkedChunk;

#[derive(Debug, Clone)]
pub struct RawGroup {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub text: String,
}

/// Formats one transcript as `"[HH:MM] {text}"`, the outer orientation
/// marker described in spec.md §4.3 step 3. The transcript's own text
/// already carries fine-grained per-sentence timestamps.
pub fn format_marker(transcript: &TranscriptionResult) -> String {
    format!("[{}] {}", transcript.start_time.format("%H:%M"), transcript.transcription_text)
}

/// Splits `transcripts` (already ordered by start_time within one
/// `(user, local_date)` group) into raw event groups, using each
/// transcript's own `start_time` as its chunk marker. Stored transcripts
/// already carry a real timestamp, so there is no need to format-then-reparse
/// through the bracket-marker text the way the freeform endpoint must.
pub fn group_into_raw_events(transcripts: &[TranscriptionResult], gap_seconds: i64) -> Vec<RawGroup> {
    let chunks: Vec<TimeMarkedChunk> = transcripts
        .iter()
        .map(|t| TimeMarkedChunk { time: t.start_time, text: t.transcription_text.clone() })
        .collect();
    group_chunks(&chunks, gap_seconds)
}

/// Shared grouping core used by both the periodic cycle (stored transcript
/// timestamps) and the immediate freeform endpoint (regex-parsed bracket
/// markers).
pub fn group_chunks(chunks: &[TimeMarkedChunk], gap_seconds: i64) -> Vec<RawGroup> {
    let mut groups = Vec::new();
    let mut current: Option<RawGroup> = None;

    for chunk in chunks {
        match &mut current {
            Some(group) => {
                let gap = (chunk.time - group.end_time).num_seconds();
                if gap > gap_seconds {
                    groups.push(current.take().unwrap());
                    current = Some(RawGroup { start_time: chunk.time, end_time: chunk.time, text: chunk.text.clone() });
                } else {
                    group.end_time = chunk.time;
                    group.text.push(' ');
                    group.text.push_str(&chunk.text);
                }
            }
            None => {
                current = Some(RawGroup { start_time: chunk.time, end_time: chunk.time, text: chunk.text.clone() });
            }
        }
    }

    if let Some(group) = current {
        groups.push(group);
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use vesper_core::domain::AnalysisStatus;
    use vesper_core::ids::{BatchId, TranscriptionResultId};

    fn transcript(start_offset_s: i64, text: &str) -> TranscriptionResult {
        let base = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        TranscriptionResult {
            id: TranscriptionResultId::new(),
            username: "alice".to_string(),
            batch_id: BatchId::new(),
            start_time: base + chrono::Duration::seconds(start_offset_s),
            end_time: base + chrono::Duration::seconds(start_offset_s + 10),
            transcription_text: text.to_string(),
            confidence: 0.9,
            language: "en".to_string(),
            sentiment: None,
            topics: None,
            intents: None,
            segment_count: 1,
            raw_vendor_response: None,
            analysis_status: AnalysisStatus::Processing,
            analyzed_at: None,
        }
    }

    #[test]
    fn splits_on_gap_exceeding_threshold() {
        let transcripts = vec![transcript(0, "hello"), transcript(700, "world")];
        let groups = group_into_raw_events(&transcripts, 600);
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn gap_equal_to_threshold_stays_in_same_group() {
        let transcripts = vec![transcript(0, "hello"), transcript(600, "world")];
        let groups = group_into_raw_events(&transcripts, 600);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].text, "hello world");
    }

    #[test]
    fn single_transcript_produces_one_group() {
        let transcripts = vec![transcript(0, "solo")];
        let groups = group_into_raw_events(&transcripts, 600);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].start_time, groups[0].end_time);
    }
}
