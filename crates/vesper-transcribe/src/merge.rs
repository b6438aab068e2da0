//! Speaker-diarization / word-transcript merge. Exact algorithm grounded in
//! the original merger: overlap-based speaker assignment with midpoint
//! fallback, sentence grouping on speaker-change or gap-plus-punctuation,
//! text cleanup, and `"[HH:MM:SS-HH:MM:SS] {speaker}: {text}"` formatting.

use chrono::{DateTime, Duration, Utc};

#[derive(Debug, Clone)]
pub struct SpeakerSegment {
    pub speaker_id: String,
    pub start_s: f64,
    pub end_s: f64,
}

#[derive(Debug, Clone)]
pub struct Word {
    pub text: String,
    pub start_s: f64,
    pub end_s: f64,
    pub confidence: f64,
}

const DEFAULT_SPEAKER: &str = "0";
const SENTENCE_GAP_S: f64 = 1.0;
const SENTENCE_END_CHARS: [char; 3] = ['.', '?', '!'];

/// Merges diarization segments and words into speaker-attributed, timestamped
/// sentences, relative to `base_time` (the batch's first-segment captured-at)
/// offset by `timezone_offset_minutes`.
pub fn merge(
    segments: &[SpeakerSegment],
    words: &[Word],
    base_time: DateTime<Utc>,
    timezone_offset_minutes: i32,
) -> String {
    if words.is_empty() {
        return String::new();
    }

    let assigned: Vec<(String, &Word)> = words
        .iter()
        .map(|w| (assign_speaker(segments, w), w))
        .collect();

    let sentences = group_sentences(&assigned);

    let offset = Duration::minutes(timezone_offset_minutes as i64);
    sentences
        .into_iter()
        .map(|s| format_sentence(&s, base_time + offset))
        .collect::<Vec<_>>()
        .join(" ")
}

fn assign_speaker(segments: &[SpeakerSegment], word: &Word) -> String {
    if segments.is_empty() {
        return DEFAULT_SPEAKER.to_string();
    }

    let mut best: Option<(&SpeakerSegment, f64)> = None;
    for seg in segments {
        let overlap = overlap(word.start_s, word.end_s, seg.start_s, seg.end_s);
        if overlap > 0.0 {
            if best.is_none() || overlap > best.unwrap().1 {
                best = Some((seg, overlap));
            }
        }
    }
    if let Some((seg, _)) = best {
        return seg.speaker_id.clone();
    }

    let word_mid = (word.start_s + word.end_s) / 2.0;
    segments
        .iter()
        .min_by(|a, b| {
            let da = ((a.start_s + a.end_s) / 2.0 - word_mid).abs();
            let db = ((b.start_s + b.end_s) / 2.0 - word_mid).abs();
            da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|s| s.speaker_id.clone())
        .unwrap_or_else(|| DEFAULT_SPEAKER.to_string())
}

fn overlap(a_start: f64, a_end: f64, b_start: f64, b_end: f64) -> f64 {
    (a_end.min(b_end) - a_start.max(b_start)).max(0.0)
}

struct RawSentence {
    speaker: String,
    start_s: f64,
    end_s: f64,
    text: String,
}

fn group_sentences(assigned: &[(String, &Word)]) -> Vec<RawSentence> {
    let mut sentences = Vec::new();
    let mut current: Option<RawSentence> = None;
    let mut prev_word: Option<&Word> = None;
    let mut prev_speaker: Option<&str> = None;

    for (speaker, word) in assigned {
        let speaker_changed = prev_speaker.is_some_and(|p| p != speaker);
        let gap_too_large = prev_word.is_some_and(|p| {
            let gap = word.start_s - p.end_s;
            gap > SENTENCE_GAP_S && ends_with_sentence_punctuation(&p.text)
        });

        if speaker_changed || gap_too_large {
            if let Some(s) = current.take() {
                sentences.push(s);
            }
        }

        match &mut current {
            Some(s) => {
                s.end_s = word.end_s;
                s.text.push(' ');
                s.text.push_str(&word.text);
            }
            None => {
                current = Some(RawSentence {
                    speaker: speaker.clone(),
                    start_s: word.start_s,
                    end_s: word.end_s,
                    text: word.text.clone(),
                });
            }
        }

        prev_word = Some(word);
        prev_speaker = Some(speaker);
    }

    if let Some(s) = current {
        sentences.push(s);
    }

    sentences
}

fn ends_with_sentence_punctuation(text: &str) -> bool {
    text.trim_end().chars().last().is_some_and(|c| SENTENCE_END_CHARS.contains(&c))
}

fn clean_text(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut cleaned = String::with_capacity(collapsed.len());
    let mut chars = collapsed.chars().peekable();
    while let Some(c) = chars.next() {
        if c == ' ' && chars.peek().is_some_and(|n| ".,?!;:".contains(*n)) {
            continue;
        }
        cleaned.push(c);
    }

    let mut out = String::with_capacity(cleaned.len());
    let mut capitalize_next = false;
    for c in cleaned.chars() {
        if capitalize_next && c.is_alphabetic() {
            out.extend(c.to_uppercase());
            capitalize_next = false;
            continue;
        }
        out.push(c);
        if SENTENCE_END_CHARS.contains(&c) {
            capitalize_next = true;
        }
    }
    out
}

fn format_sentence(s: &RawSentence, base_time: DateTime<Utc>) -> String {
    let start = base_time + Duration::milliseconds((s.start_s * 1000.0) as i64);
    let end = base_time + Duration::milliseconds((s.end_s * 1000.0) as i64);
    format!(
        "[{}-{}] {}: {}",
        start.format("%H:%M:%S"),
        end.format("%H:%M:%S"),
        s.speaker,
        clean_text(&s.text)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(text: &str, start: f64, end: f64) -> Word {
        Word {
            text: text.to_string(),
            start_s: start,
            end_s: end,
            confidence: 0.9,
        }
    }

    fn base() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn gap_with_punctuation_and_speaker_change_splits_sentences() {
        let words = vec![word("Hello.", 0.0, 0.5), word("Goodbye", 1.51, 2.0)];
        let segments = vec![
            SpeakerSegment { speaker_id: "A".into(), start_s: 0.0, end_s: 0.5 },
            SpeakerSegment { speaker_id: "B".into(), start_s: 1.5, end_s: 2.0 },
        ];
        let text = merge(&segments, &words, base(), 0);
        let sentence_count = text.matches('[').count();
        assert_eq!(sentence_count, 2);
    }

    #[test]
    fn gap_just_over_one_second_with_terminal_punctuation_splits() {
        // gap is exactly 1.01s (> sentence_gap_s) and the previous word ends
        // with '.', so a new sentence starts even with the same speaker.
        let words = vec![word("One.", 0.0, 0.5), word("Two", 1.51, 2.0)];
        let segments = vec![SpeakerSegment { speaker_id: "0".into(), start_s: 0.0, end_s: 2.0 }];
        let text = merge(&segments, &words, base(), 0);
        assert_eq!(text.matches('[').count(), 2);
    }

    #[test]
    fn diarization_absent_labels_everything_speaker_zero() {
        let words: Vec<Word> = (0..10)
            .map(|i| {
                let start = i as f64 * 0.5;
                let text = if i == 4 { "five." } else { "word" };
                word(text, start, start + 0.4)
            })
            .collect();
        // 1.2s gap after the fifth word (index 4 ends at 2.4, next starts at 2.5 + 1.2).
        let mut words = words;
        for w in words.iter_mut().skip(5) {
            w.start_s += 1.2;
            w.end_s += 1.2;
        }

        let text = merge(&[], &words, base(), 0);
        assert_eq!(text.matches('[').count(), 2);
        assert!(text.matches("0:").count() >= 2);
    }

    #[test]
    fn merge_is_deterministic() {
        let words = vec![word("Hello.", 0.0, 0.5), word("World", 0.6, 1.0)];
        let segments = vec![SpeakerSegment { speaker_id: "0".into(), start_s: 0.0, end_s: 1.0 }];
        let a = merge(&segments, &words, base(), 0);
        let b = merge(&segments, &words, base(), 0);
        assert_eq!(a, b);
    }

    #[test]
    fn word_outside_all_segments_uses_closest_midpoint() {
        let words = vec![word("lonely", 10.0, 10.5)];
        let segments = vec![
            SpeakerSegment { speaker_id: "near".into(), start_s: 9.0, end_s: 9.8 },
            SpeakerSegment { speaker_id: "far".into(), start_s: 20.0, end_s: 21.0 },
        ];
        let text = merge(&segments, &words, base(), 0);
        assert!(text.contains("near:"));
    }

    #[test]
    fn empty_words_produce_empty_text() {
        assert_eq!(merge(&[], &[], base(), 0), "");
    }
}
