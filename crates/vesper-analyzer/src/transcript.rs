//! Parses freeform time-marked transcript text for the immediate
//! single-transcript analysis entry point (spec.md §4.3,
//! `POST /action/analyze/incremental/v1/`). Grounded directly in the
//! original analyzer's marker regex and lenient time parsing: accepts
//! either an RFC3339 timestamp or a bare `HH:MM`/`HH:MM:SS` inside the
//! brackets, using the previous chunk's date to resolve midnight
//! rollover, and falling back to "now" for anything else.

use chrono::{DateTime, NaiveTime, Utc};
use regex::Regex;
use std::sync::OnceLock;

fn marker_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\[([^\]]+)\]\s*([^\[]+)").expect("static regex"))
}

/// One `(time, text)` chunk extracted from a bracketed marker.
pub struct TimeMarkedChunk {
    pub time: DateTime<Utc>,
    pub text: String,
}

/// Extracts every `[marker] text` chunk from `transcript`, in order.
pub fn parse_time_marked_chunks(transcript: &str) -> Vec<TimeMarkedChunk> {
    let mut chunks = Vec::new();
    let mut previous: Option<DateTime<Utc>> = None;

    for cap in marker_pattern().captures_iter(transcript) {
        let time_str = cap[1].trim();
        let text = cap[2].trim();
        if text.is_empty() {
            continue;
        }
        let time = parse_time_string(time_str, previous);
        previous = Some(time);
        chunks.push(TimeMarkedChunk { time, text: text.to_string() });
    }

    chunks
}

fn parse_time_string(time_str: &str, previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(time_str) {
        return parsed.with_timezone(&Utc);
    }

    for format in ["%H:%M:%S", "%H:%M"] {
        if let Ok(time_of_day) = NaiveTime::parse_from_str(time_str, format) {
            let base_date = previous.map(|p| p.date_naive()).unwrap_or_else(|| Utc::now().date_naive());
            let mut candidate = base_date.and_time(time_of_day).and_utc();
            if let Some(prev) = previous {
                if candidate < prev {
                    candidate += chrono::Duration::days(1);
                }
            }
            return candidate;
        }
    }

    tracing::warn!(time_str, "failed to parse transcript time marker, falling back to now");
    Utc::now()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hh_mm_markers_in_order() {
        let text = "[09:00] Made coffee. [09:15] Left for work.";
        let chunks = parse_time_marked_chunks(text);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "Made coffee.");
        assert_eq!(chunks[1].text, "Left for work.");
        assert!(chunks[1].time >= chunks[0].time);
    }

    #[test]
    fn parses_rfc3339_markers() {
        let text = "[2025-09-04T23:30:00+00:00] Wrapping up the day.";
        let chunks = parse_time_marked_chunks(text);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].time.format("%H:%M").to_string(), "23:30");
    }

    #[test]
    fn midnight_rollover_advances_date() {
        let text = "[23:50] Still up. [00:10] Finally asleep.";
        let chunks = parse_time_marked_chunks(text);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[1].time > chunks[0].time);
    }

    #[test]
    fn empty_transcript_yields_no_chunks() {
        assert!(parse_time_marked_chunks("").is_empty());
    }
}
