use rayon::prelude::*;
use std::ops::Range;
use std::path::Path;

use super::decode::{decode_audio, AudioData};
use super::features::{AudioAmplitudeFrame, AudioAnalysis, AMPLITUDE_POINTS, FPS};
use crate::error::Result;

/// Decode `path` and cut it into per-frame amplitude envelopes at 24 fps.
pub fn analyze(path: &Path) -> Result<AudioAnalysis> {
    let audio = decode_audio(path)?;
    Ok(analyze_samples(&audio, FPS))
}

pub fn analyze_samples(audio: &AudioData, fps: u32) -> AudioAnalysis {
    let samples = &audio.samples;
    let duration = audio.duration();
    let total_frames = total_frame_count(samples.len(), audio.sample_rate, fps);

    log::info!("Extracting waveform envelope ({} frames)...", total_frames);

    let frames: Vec<AudioAmplitudeFrame> = (0..total_frames)
        .into_par_iter()
        .map(|index| {
            let window = frame_window(index, samples.len(), total_frames);
            AudioAmplitudeFrame {
                index,
                time: index as f64 / fps as f64,
                amplitudes: envelope(&samples[window], AMPLITUDE_POINTS),
            }
        })
        .collect();

    log::info!(
        "Waveform: {} frames, {:.2}s, {}Hz",
        frames.len(),
        duration,
        audio.sample_rate
    );

    AudioAnalysis {
        frames,
        duration,
        sample_rate: audio.sample_rate,
        total_frame_count: total_frames,
        fps,
    }
}

/// `ceil(duration * fps)`, computed on integers so exact durations don't
/// round up an extra frame.
pub fn total_frame_count(sample_count: usize, sample_rate: u32, fps: u32) -> usize {
    if sample_rate == 0 {
        return 0;
    }
    let numerator = sample_count as u64 * fps as u64;
    numerator.div_ceil(sample_rate as u64) as usize
}

/// Sample range of frame `index`. Windows are `floor(len / total)` wide; the
/// trailing `len % total` samples are not covered by any window.
pub fn frame_window(index: usize, sample_count: usize, total_frames: usize) -> Range<usize> {
    if total_frames == 0 {
        return 0..0;
    }
    let samples_per_frame = sample_count / total_frames;
    let start = (index * samples_per_frame).min(sample_count);
    let end = (start + samples_per_frame).min(sample_count);
    start..end
}

/// Mean absolute value over `points` equal sub-buckets of `segment`.
/// Empty sub-buckets yield 0.
pub fn envelope(segment: &[f32], points: usize) -> Vec<f32> {
    let len = segment.len();
    (0..points)
        .map(|i| {
            // floor(i * len / points) without float drift
            let start = i * len / points;
            let end = (i + 1) * len / points;
            if end <= start {
                return 0.0;
            }
            let sum: f32 = segment[start..end].iter().map(|s| s.abs()).sum();
            sum / (end - start) as f32
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn audio(samples: Vec<f32>, sample_rate: u32) -> AudioData {
        AudioData {
            samples,
            sample_rate,
        }
    }

    #[test]
    fn frame_count_is_ceil_of_duration() {
        assert_eq!(total_frame_count(48_000 * 10, 48_000, 24), 240);
        // 10.01s -> 240.24 -> 241
        assert_eq!(total_frame_count(480_480, 48_000, 24), 241);
        assert_eq!(total_frame_count(1, 44_100, 24), 1);
        assert_eq!(total_frame_count(0, 44_100, 24), 0);
    }

    #[test]
    fn windows_are_contiguous_and_disjoint() {
        let sample_count = 44_100 * 3 + 17;
        let total = total_frame_count(sample_count, 44_100, 24);
        let mut expected_start = 0;
        for i in 0..total {
            let w = frame_window(i, sample_count, total);
            assert_eq!(w.start, expected_start, "gap or overlap at frame {i}");
            assert!(w.end <= sample_count);
            expected_start = w.end;
        }
        // Floor sizing leaves at most `total - 1` trailing samples uncovered
        assert!(sample_count - expected_start < total);
    }

    #[test]
    fn envelope_is_mean_abs_per_bucket() {
        let segment: Vec<f32> = (0..200).map(|i| if i % 2 == 0 { 0.5 } else { -0.25 }).collect();
        let env = envelope(&segment, 100);
        assert_eq!(env.len(), 100);
        for v in env {
            assert!((v - 0.375).abs() < 1e-6);
        }
    }

    #[test]
    fn envelope_of_short_segment_has_empty_buckets() {
        let env = envelope(&[1.0, -1.0, 1.0], 100);
        assert_eq!(env.len(), 100);
        let non_zero = env.iter().filter(|v| **v > 0.0).count();
        assert_eq!(non_zero, 3);
        assert!(env.iter().all(|v| *v == 0.0 || *v == 1.0));
    }

    #[test]
    fn envelope_of_empty_segment_is_zero() {
        assert_eq!(envelope(&[], 100), vec![0.0; 100]);
    }

    #[test]
    fn analysis_shape_matches_frame_count() {
        let sample_rate = 8_000;
        let samples: Vec<f32> = (0..sample_rate * 2 + 123)
            .map(|i| ((i as f32) * 0.01).sin() * 0.8)
            .collect();
        let analysis = analyze_samples(&audio(samples, sample_rate as u32), FPS);

        assert_eq!(analysis.fps, 24);
        assert_eq!(analysis.total_frame_count, analysis.frames.len());
        assert_eq!(
            analysis.total_frame_count,
            (analysis.duration * 24.0).ceil() as usize
        );
        for (i, frame) in analysis.frames.iter().enumerate() {
            assert_eq!(frame.index, i);
            assert!((frame.time - i as f64 / 24.0).abs() < 1e-12);
            assert_eq!(frame.amplitudes.len(), AMPLITUDE_POINTS);
            assert!(frame.amplitudes.iter().all(|a| (0.0..=0.8001).contains(a)));
        }
    }

    #[test]
    fn silence_yields_zero_envelopes() {
        let analysis = analyze_samples(&audio(vec![0.0; 8_000], 8_000), FPS);
        assert_eq!(analysis.total_frame_count, 24);
        assert!(analysis
            .frames
            .iter()
            .all(|f| f.amplitudes.iter().all(|a| *a == 0.0)));
    }
}
