//! WAV fixtures for tests. Also compiled into `tests/pipeline.rs`.

use std::path::Path;

/// Writes a 16-bit PCM WAV with `N` interleaved channels.
pub fn write_wav<const N: usize>(path: &Path, sample_rate: u32, frames: &[[f32; N]]) {
    let spec = hound::WavSpec {
        channels: N as u16,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for frame in frames {
        for sample in frame {
            writer
                .write_sample((sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
                .unwrap();
        }
    }
    writer.finalize().unwrap();
}

pub fn write_mono_wav(path: &Path, sample_rate: u32, samples: &[f32]) {
    let frames: Vec<[f32; 1]> = samples.iter().map(|s| [*s]).collect();
    write_wav(path, sample_rate, &frames);
}
