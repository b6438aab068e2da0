//! Voice-activity detection. Parameters pinned by spec.md §4.1 (these
//! override the original service's own defaults — see DESIGN.md): 16 kHz,
//! minimum-speech 250 ms, minimum-silence 100 ms, detection threshold 0.08,
//! pad 100 ms.

use vesper_core::domain::SpeechInterval;

#[derive(Debug, Clone, Copy)]
pub struct VadParams {
    pub sample_rate_hz: u32,
    pub min_speech_ms: u32,
    pub min_silence_ms: u32,
    pub threshold: f32,
    pub pad_ms: u32,
}

impl Default for VadParams {
    fn default() -> Self {
        Self {
            sample_rate_hz: 16_000,
            min_speech_ms: 250,
            min_silence_ms: 100,
            threshold: 0.08,
            pad_ms: 100,
        }
    }
}

pub struct VadResult {
    pub intervals: Vec<SpeechInterval>,
    pub total_duration_seconds: f64,
}

impl VadResult {
    pub fn total_speech_duration(&self) -> f64 {
        self.intervals.iter().map(|i| i.end_seconds - i.start_seconds).sum()
    }

    pub fn speech_ratio(&self) -> f64 {
        if self.total_duration_seconds <= 0.0 {
            return 0.0;
        }
        (self.total_speech_duration() / self.total_duration_seconds).min(1.0)
    }
}

/// Runs VAD over 16-bit PCM mono samples at `params.sample_rate_hz`.
///
/// Frames the signal into 30ms windows, scores each by normalized RMS
/// energy, thresholds, then merges adjacent speech frames that are closer
/// than `min_silence_ms` apart and drops speech runs shorter than
/// `min_speech_ms`. Each surviving interval is padded by `pad_ms` on both
/// sides, clamped to the clip bounds.
pub fn detect_speech(samples: &[i16], params: &VadParams) -> VadResult {
    let sample_rate = params.sample_rate_hz as f64;
    let total_duration_seconds = samples.len() as f64 / sample_rate;

    const FRAME_MS: u32 = 30;
    let frame_len = (params.sample_rate_hz * FRAME_MS / 1000).max(1) as usize;

    let mut frame_is_speech = Vec::with_capacity(samples.len() / frame_len + 1);
    for chunk in samples.chunks(frame_len) {
        let rms = rms_energy(chunk);
        frame_is_speech.push(rms >= params.threshold);
    }

    let frame_seconds = frame_len as f64 / sample_rate;
    let min_silence_frames = ((params.min_silence_ms as f64 / 1000.0) / frame_seconds).ceil() as usize;
    let min_speech_frames = ((params.min_speech_ms as f64 / 1000.0) / frame_seconds).ceil().max(1.0) as usize;

    let mut raw_runs: Vec<(usize, usize)> = Vec::new();
    let mut run_start: Option<usize> = None;
    for (i, &is_speech) in frame_is_speech.iter().enumerate() {
        match (is_speech, run_start) {
            (true, None) => run_start = Some(i),
            (false, Some(start)) => {
                raw_runs.push((start, i));
                run_start = None;
            }
            _ => {}
        }
    }
    if let Some(start) = run_start {
        raw_runs.push((start, frame_is_speech.len()));
    }

    // Merge runs separated by a silence gap shorter than min_silence_frames.
    let mut merged: Vec<(usize, usize)> = Vec::new();
    for run in raw_runs {
        if let Some(last) = merged.last_mut() {
            if run.0.saturating_sub(last.1) < min_silence_frames {
                last.1 = run.1;
                continue;
            }
        }
        merged.push(run);
    }

    let pad_seconds = params.pad_ms as f64 / 1000.0;
    let intervals = merged
        .into_iter()
        .filter(|(start, end)| end - start >= min_speech_frames)
        .map(|(start, end)| {
            let start_s = (start as f64 * frame_seconds - pad_seconds).max(0.0);
            let end_s = (end as f64 * frame_seconds + pad_seconds).min(total_duration_seconds);
            SpeechInterval {
                start_seconds: start_s,
                end_seconds: end_s,
            }
        })
        .collect();

    VadResult {
        intervals,
        total_duration_seconds,
    }
}

fn rms_energy(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = samples.iter().map(|&s| (s as f64 / i16::MAX as f64).powi(2)).sum();
    ((sum_sq / samples.len() as f64).sqrt()) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_produces_no_intervals() {
        let samples = vec![0i16; 16_000 * 2];
        let result = detect_speech(&samples, &VadParams::default());
        assert!(result.intervals.is_empty());
    }

    #[test]
    fn loud_tone_produces_one_padded_interval() {
        let sample_rate = 16_000usize;
        let mut samples = vec![0i16; sample_rate / 2]; // 0.5s silence
        samples.extend(std::iter::repeat(i16::MAX / 2).take(sample_rate)); // 1s loud
        samples.extend(vec![0i16; sample_rate / 2]); // 0.5s silence

        let result = detect_speech(&samples, &VadParams::default());
        assert_eq!(result.intervals.len(), 1);
        let iv = &result.intervals[0];
        assert!(iv.start_seconds < 0.5);
        assert!(iv.end_seconds > 1.4);
    }

    #[test]
    fn short_blip_below_min_speech_is_dropped() {
        let sample_rate = 16_000usize;
        let mut samples = vec![0i16; sample_rate];
        // 50ms blip, shorter than the 250ms min_speech default.
        samples.extend(std::iter::repeat(i16::MAX / 2).take(sample_rate / 20));
        samples.extend(vec![0i16; sample_rate]);

        let result = detect_speech(&samples, &VadParams::default());
        assert!(result.intervals.is_empty());
    }
}
