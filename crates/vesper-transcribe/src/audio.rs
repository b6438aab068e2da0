//! Decodes a batch's audio files and concatenates their detected speech
//! intervals (not the silence between them) into one PCM waveform, per
//! spec.md §4.2 step 2.

use vesper_core::domain::{AudioFile, SpeechInterval};

use crate::error::{Result, TranscribeError};

pub struct ConcatenatedAudio {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
}

/// Decodes `bytes` as mono 16-bit PCM WAV and appends the samples covered by
/// `intervals` (in seconds, clamped to the file's length) to `out`. Returns
/// an error only on a malformed WAV; an empty `intervals` list appends
/// nothing.
fn append_speech_samples(bytes: &[u8], intervals: &[SpeechInterval], out: &mut Vec<i16>) -> Result<u32> {
    let cursor = std::io::Cursor::new(bytes);
    let mut reader =
        hound::WavReader::new(cursor).map_err(|e| TranscribeError::AudioDecode(format!("wav decode failed: {e}")))?;
    let sample_rate = reader.spec().sample_rate;

    let samples: std::result::Result<Vec<i16>, _> = reader.samples::<i16>().collect();
    let samples = samples.map_err(|e| TranscribeError::AudioDecode(format!("wav sample read failed: {e}")))?;

    for interval in intervals {
        let start = ((interval.start_seconds * sample_rate as f64).round() as usize).min(samples.len());
        let end = ((interval.end_seconds * sample_rate as f64).round() as usize).min(samples.len());
        if end > start {
            out.extend_from_slice(&samples[start..end]);
        }
    }

    Ok(sample_rate)
}

/// Downloads and concatenates the speech intervals of every audio file in
/// `files`, in order. Files whose object fails to download or fails to
/// decode are skipped with a logged warning, not a hard failure (spec.md
/// §4.2 step 2: "files that fail to download are skipped"). Returns `None`
/// if nothing survived.
pub async fn concatenate_speech(
    object_store: &dyn vesper_storage::ObjectStore,
    files: &[AudioFile],
) -> Result<Option<ConcatenatedAudio>> {
    let mut samples = Vec::new();
    let mut sample_rate = None;

    for file in files {
        let bytes = match object_store.get_object(&file.object_key).await {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(file_id = %file.id, error = %e, "skipping file that failed to download");
                continue;
            }
        };

        if file.speech_intervals.is_empty() {
            continue;
        }

        match append_speech_samples(&bytes, &file.speech_intervals, &mut samples) {
            Ok(rate) => sample_rate = sample_rate.or(Some(rate)),
            Err(e) => {
                tracing::warn!(file_id = %file.id, error = %e, "skipping file with undecodable audio");
            }
        }
    }

    let Some(sample_rate) = sample_rate else {
        return Ok(None);
    };
    if samples.is_empty() {
        return Ok(None);
    }

    Ok(Some(ConcatenatedAudio { samples, sample_rate }))
}

/// Encodes mono 16-bit PCM `samples` as a WAV byte buffer.
pub fn encode_wav(samples: &[i16], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut buf = std::io::Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut buf, spec).map_err(|e| TranscribeError::AudioDecode(format!("wav encode failed: {e}")))?;
        for &s in samples {
            writer
                .write_sample(s)
                .map_err(|e| TranscribeError::AudioDecode(format!("wav write failed: {e}")))?;
        }
        writer
            .finalize()
            .map_err(|e| TranscribeError::AudioDecode(format!("wav finalize failed: {e}")))?;
    }
    Ok(buf.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_wav(samples: &[i16], sample_rate: u32) -> Vec<u8> {
        encode_wav(samples, sample_rate).unwrap()
    }

    #[test]
    fn append_speech_samples_slices_by_interval() {
        let samples: Vec<i16> = (0..1000).map(|i| i as i16).collect();
        let wav = make_wav(&samples, 1000);
        let intervals = vec![SpeechInterval { start_seconds: 0.1, end_seconds: 0.2 }];
        let mut out = Vec::new();
        let rate = append_speech_samples(&wav, &intervals, &mut out).unwrap();
        assert_eq!(rate, 1000);
        assert_eq!(out.len(), 100);
        assert_eq!(out[0], 100);
    }

    #[test]
    fn append_speech_samples_clamps_to_length() {
        let samples: Vec<i16> = vec![1, 2, 3, 4];
        let wav = make_wav(&samples, 10);
        let intervals = vec![SpeechInterval { start_seconds: 0.0, end_seconds: 10.0 }];
        let mut out = Vec::new();
        append_speech_samples(&wav, &intervals, &mut out).unwrap();
        assert_eq!(out.len(), 4);
    }

    #[test]
    fn encode_then_decode_round_trips_sample_rate() {
        let wav = make_wav(&[1, 2, 3], 16_000);
        let cursor = std::io::Cursor::new(wav);
        let reader = hound::WavReader::new(cursor).unwrap();
        assert_eq!(reader.spec().sample_rate, 16_000);
    }
}
