//! Audio decoding and voice-activity detection for local inference
//!
//! Local models expect 16 kHz mono `f32` samples. [`load_wav`] decodes and
//! converts WAV input; [`speech_regions`] finds the voiced stretches so
//! silence is never sent to the model.

use saywrite_core::ProviderError;
use std::ops::Range;
use std::path::Path;

/// Sample rate expected by whisper models
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

/// Energy-based voice-activity detection settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VadOptions {
    /// Frame RMS at or above this level counts as speech
    pub threshold: f32,
    /// Analysis frame length in milliseconds
    pub frame_ms: u32,
    /// Silence shorter than this does not split a region
    pub min_silence_ms: u32,
    /// Regions shorter than this are dropped
    pub min_speech_ms: u32,
    /// Padding added on both sides of each region
    pub speech_pad_ms: u32,
}

impl Default for VadOptions {
    fn default() -> Self {
        Self {
            threshold: 0.01,
            frame_ms: 30,
            min_silence_ms: 500,
            min_speech_ms: 250,
            speech_pad_ms: 400,
        }
    }
}

fn ms_to_samples(ms: u32, sample_rate: u32) -> usize {
    (ms as u64 * sample_rate as u64 / 1000) as usize
}

fn rms(frame: &[f32]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    let sum: f32 = frame.iter().map(|s| s * s).sum();
    (sum / frame.len() as f32).sqrt()
}

/// Find voiced regions in `samples`, as sample index ranges
///
/// Ranges are sorted, padded, and never overlap.
pub fn speech_regions(samples: &[f32], sample_rate: u32, opts: &VadOptions) -> Vec<Range<usize>> {
    let frame_len = ms_to_samples(opts.frame_ms, sample_rate).max(1);
    let min_silence = ms_to_samples(opts.min_silence_ms, sample_rate);
    let min_speech = ms_to_samples(opts.min_speech_ms, sample_rate);
    let pad = ms_to_samples(opts.speech_pad_ms, sample_rate);

    let mut raw: Vec<Range<usize>> = Vec::new();
    let mut current: Option<Range<usize>> = None;

    for (index, frame) in samples.chunks(frame_len).enumerate() {
        let frame_start = index * frame_len;
        let frame_end = frame_start + frame.len();

        if rms(frame) >= opts.threshold {
            current = Some(match current.take() {
                Some(region) => region.start..frame_end,
                None => frame_start..frame_end,
            });
        } else if let Some(region) = current.as_ref() {
            if frame_end - region.end >= min_silence {
                raw.extend(current.take());
            }
        }
    }
    raw.extend(current);

    let mut regions: Vec<Range<usize>> = Vec::new();
    for region in raw.into_iter().filter(|r| r.len() >= min_speech) {
        let start = region.start.saturating_sub(pad);
        let end = (region.end + pad).min(samples.len());
        match regions.last_mut() {
            Some(last) if start <= last.end => last.end = last.end.max(end),
            _ => regions.push(start..end),
        }
    }
    regions
}

/// Linear-interpolation resampling to [`TARGET_SAMPLE_RATE`]
fn resample(samples: Vec<f32>, from_rate: u32) -> Vec<f32> {
    if from_rate == TARGET_SAMPLE_RATE || samples.is_empty() {
        return samples;
    }

    let ratio = from_rate as f64 / TARGET_SAMPLE_RATE as f64;
    let out_len = (samples.len() as f64 / ratio).floor() as usize;
    (0..out_len)
        .map(|i| {
            let pos = i as f64 * ratio;
            let idx = pos.floor() as usize;
            let frac = (pos - idx as f64) as f32;
            let a = samples[idx];
            let b = samples.get(idx + 1).copied().unwrap_or(a);
            a + (b - a) * frac
        })
        .collect()
}

/// Decode a WAV file into 16 kHz mono `f32` samples
pub fn load_wav(path: &Path) -> Result<Vec<f32>, ProviderError> {
    let mut reader = hound::WavReader::open(path)
        .map_err(|e| ProviderError::Audio(format!("Failed to open {}: {e}", path.display())))?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(|e| ProviderError::Audio(e.to_string()))?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()
                .map_err(|e| ProviderError::Audio(e.to_string()))?
        }
    };

    let mono: Vec<f32> = interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect();

    Ok(resample(mono, spec.sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u32 = TARGET_SAMPLE_RATE;

    fn silence(ms: u32) -> Vec<f32> {
        vec![0.0; ms_to_samples(ms, RATE)]
    }

    fn tone(ms: u32) -> Vec<f32> {
        (0..ms_to_samples(ms, RATE))
            .map(|i| 0.5 * (i as f32 * 0.05).sin())
            .collect()
    }

    #[test]
    fn test_silence_has_no_regions() {
        let samples = silence(2000);
        assert!(speech_regions(&samples, RATE, &VadOptions::default()).is_empty());
    }

    #[test]
    fn test_single_burst() {
        let mut samples = silence(1000);
        samples.extend(tone(600));
        samples.extend(silence(1000));

        let regions = speech_regions(&samples, RATE, &VadOptions::default());
        assert_eq!(regions.len(), 1);

        let burst_start = ms_to_samples(1000, RATE);
        let burst_end = ms_to_samples(1600, RATE);
        assert!(regions[0].start <= burst_start);
        assert!(regions[0].end >= burst_end);
    }

    #[test]
    fn test_long_silence_splits_regions() {
        let opts = VadOptions {
            speech_pad_ms: 0,
            ..Default::default()
        };
        let mut samples = tone(600);
        samples.extend(silence(1200));
        samples.extend(tone(600));

        let regions = speech_regions(&samples, RATE, &opts);
        assert_eq!(regions.len(), 2);
    }

    #[test]
    fn test_short_pause_does_not_split() {
        let opts = VadOptions {
            speech_pad_ms: 0,
            ..Default::default()
        };
        let mut samples = tone(600);
        samples.extend(silence(200));
        samples.extend(tone(600));

        let regions = speech_regions(&samples, RATE, &opts);
        assert_eq!(regions.len(), 1);
    }

    #[test]
    fn test_click_shorter_than_min_speech_dropped() {
        let mut samples = silence(1000);
        samples.extend(tone(60));
        samples.extend(silence(1000));

        assert!(speech_regions(&samples, RATE, &VadOptions::default()).is_empty());
    }

    #[test]
    fn test_padding_is_clamped() {
        let samples = tone(500);
        let regions = speech_regions(&samples, RATE, &VadOptions::default());
        assert_eq!(regions, vec![0..samples.len()]);
    }

    #[test]
    fn test_resample_halves_length() {
        let samples: Vec<f32> = (0..3200).map(|i| i as f32).collect();
        let out = resample(samples, 32_000);
        assert_eq!(out.len(), 1600);
        assert_eq!(out[1], 2.0);
    }

    #[test]
    fn test_load_wav_stereo_int16() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: RATE,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for _ in 0..100 {
            writer.write_sample(i16::MAX / 2).unwrap();
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();

        let samples = load_wav(&path).unwrap();
        assert_eq!(samples.len(), 100);
        assert!((samples[0] - 0.25).abs() < 0.01);
    }

    #[test]
    fn test_load_wav_missing_file() {
        let err = load_wav(Path::new("/nonexistent/audio.wav")).unwrap_err();
        assert!(matches!(err, ProviderError::Audio(_)));
    }
}
