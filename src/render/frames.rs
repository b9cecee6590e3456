use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::RgbaImage;
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use super::compositor::Compositor;
use crate::audio::AudioAnalysis;
use crate::error::{RenderError, Result};

/// printf-style pattern matching `frame_file_name`, as the encoder expects it.
pub const FRAME_PATTERN: &str = "frame_%06d.png";

const PROGRESS_EVERY: usize = 50;
const PROGRESS_START: u8 = 35;
const PROGRESS_SPAN: f64 = 40.0;

pub fn frame_file_name(index: usize) -> String {
    format!("frame_{:06}.png", index)
}

pub fn is_frame_file_name(name: &str) -> bool {
    name.strip_prefix("frame_")
        .and_then(|rest| rest.strip_suffix(".png"))
        .is_some_and(|digits| digits.len() >= 6 && digits.bytes().all(|b| b.is_ascii_digit()))
}

/// Writes numbered PNG frames into a directory owned by one job.
pub struct FrameWriter {
    dir: PathBuf,
}

impl FrameWriter {
    /// Create `dir` if needed. Frame files left over from an earlier run are
    /// removed so the sequence only ever holds this run's frames.
    pub fn create(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir).map_err(|e| RenderError::io(dir, e))?;
        let entries = std::fs::read_dir(dir).map_err(|e| RenderError::io(dir, e))?;
        let mut stale = 0usize;
        for entry in entries {
            let entry = entry.map_err(|e| RenderError::io(dir, e))?;
            if entry.file_name().to_str().is_some_and(is_frame_file_name) {
                let path = entry.path();
                std::fs::remove_file(&path).map_err(|e| RenderError::io(&path, e))?;
                stale += 1;
            }
        }
        if stale > 0 {
            log::warn!("Removed {} stale frames from {}", stale, dir.display());
        }
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Encode and write one frame. The file is flushed and closed before
    /// this returns.
    pub fn write_frame(&self, raster: &RgbaImage, index: usize) -> Result<PathBuf> {
        let path = self.dir.join(frame_file_name(index));
        let file = File::create(&path).map_err(|e| RenderError::io(&path, e))?;
        let mut writer = BufWriter::new(file);

        let encoder = PngEncoder::new_with_quality(&mut writer, CompressionType::Fast, FilterType::Adaptive);
        raster
            .write_with_encoder(encoder)
            .map_err(|e| RenderError::Composition {
                frame: index,
                message: format!("PNG encode failed: {e}"),
            })?;

        writer.flush().map_err(|e| RenderError::io(&path, e))?;
        Ok(path)
    }
}

/// Composite and write every frame of `analysis`.
///
/// Frames may be produced on several threads; file names, not write order,
/// define the sequence. `on_progress` receives monotonically increasing
/// values in 35..=75, one per 50 completed frames.
pub fn render_frames(
    analysis: &AudioAnalysis,
    compositor: &Compositor,
    writer: &FrameWriter,
    parallel: bool,
    on_progress: &(dyn Fn(u8) + Sync),
) -> Result<usize> {
    let total = analysis.frames.len();
    let (width, height) = compositor.dimensions();
    log::info!(
        "Rendering {} frames at {}x{} into {} ({})",
        total,
        width,
        height,
        writer.dir().display(),
        if parallel { "parallel" } else { "sequential" }
    );

    let completed = AtomicUsize::new(0);
    let reported = Mutex::new(0u8);

    let render_one = |frame: &crate::audio::AudioAmplitudeFrame| -> Result<()> {
        let raster = compositor.composite(&frame.amplitudes);
        writer.write_frame(&raster, frame.index)?;

        let done = completed.fetch_add(1, Ordering::Relaxed);
        if done % PROGRESS_EVERY == 0 {
            let percent = frame_progress(done, total);
            // Held while reporting so workers can't deliver out of order
            let mut last = reported.lock().unwrap_or_else(PoisonError::into_inner);
            if percent > *last {
                *last = percent;
                on_progress(percent);
            }
            log::debug!("Frames: {}/{}", done, total);
        }
        Ok(())
    };

    if parallel {
        analysis.frames.par_iter().try_for_each(render_one)?;
    } else {
        analysis.frames.iter().try_for_each(render_one)?;
    }

    log::info!("Wrote {} frames", total);
    Ok(total)
}

/// `35 + round(done / total * 40)`.
pub fn frame_progress(done: usize, total: usize) -> u8 {
    if total == 0 {
        return PROGRESS_START;
    }
    let ratio = (done as f64 / total as f64).min(1.0);
    PROGRESS_START + (ratio * PROGRESS_SPAN).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioAmplitudeFrame;
    use crate::render::waveform::WaveformSpec;
    use crate::text::Rgb;
    use image::Rgba;

    fn analysis(frames: usize) -> AudioAnalysis {
        AudioAnalysis {
            frames: (0..frames)
                .map(|index| AudioAmplitudeFrame {
                    index,
                    time: index as f64 / 24.0,
                    amplitudes: vec![(index % 10) as f32 / 10.0; 100],
                })
                .collect(),
            duration: frames as f64 / 24.0,
            sample_rate: 8000,
            total_frame_count: frames,
            fps: 24,
        }
    }

    fn compositor() -> Compositor {
        let spec = WaveformSpec {
            color: Rgb { r: 0, g: 255, b: 0 },
            x: 2.0,
            y: 8.0,
            width: 28.0,
            height: 12.0,
        };
        Compositor::new(RgbaImage::from_pixel(32, 16, Rgba([0, 0, 0, 255])), &[], None, spec).unwrap()
    }

    fn listed(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn names_are_zero_padded() {
        assert_eq!(frame_file_name(0), "frame_000000.png");
        assert_eq!(frame_file_name(123), "frame_000123.png");
        assert!(is_frame_file_name("frame_000123.png"));
        assert!(!is_frame_file_name("frame_12.png"));
        assert!(!is_frame_file_name("frame_000123.jpg"));
        assert!(!is_frame_file_name("thumb_000123.png"));
    }

    #[test]
    fn written_frame_is_complete_png() {
        let dir = tempfile::tempdir().unwrap();
        let writer = FrameWriter::create(&dir.path().join("frames")).unwrap();
        let raster = RgbaImage::from_pixel(6, 4, Rgba([1, 2, 3, 255]));
        let path = writer.write_frame(&raster, 7).unwrap();
        assert!(path.ends_with("frame_000007.png"));

        let back = image::open(&path).unwrap().to_rgba8();
        assert_eq!(back, raster);
    }

    #[test]
    fn reused_directory_starts_without_old_frames() {
        let dir = tempfile::tempdir().unwrap();
        let writer = FrameWriter::create(dir.path()).unwrap();
        render_frames(&analysis(48), &compositor(), &writer, false, &|_| {}).unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"keep").unwrap();

        let writer = FrameWriter::create(dir.path()).unwrap();
        render_frames(&analysis(24), &compositor(), &writer, false, &|_| {}).unwrap();

        let mut expected: Vec<String> = (0..24).map(frame_file_name).collect();
        expected.push("notes.txt".into());
        assert_eq!(listed(dir.path()), expected);
    }

    #[test]
    fn sequential_and_parallel_produce_same_sequence() {
        for parallel in [false, true] {
            let dir = tempfile::tempdir().unwrap();
            let writer = FrameWriter::create(dir.path()).unwrap();
            let count = render_frames(&analysis(120), &compositor(), &writer, parallel, &|_| {}).unwrap();
            assert_eq!(count, 120);

            let names = listed(dir.path());
            let expected: Vec<String> = (0..120).map(frame_file_name).collect();
            assert_eq!(names, expected);
        }
    }

    #[test]
    fn progress_is_reported_every_fifty_frames() {
        let dir = tempfile::tempdir().unwrap();
        let writer = FrameWriter::create(dir.path()).unwrap();
        let seen = Mutex::new(Vec::new());
        render_frames(&analysis(120), &compositor(), &writer, false, &|p| {
            seen.lock().unwrap().push(p)
        })
        .unwrap();
        // frames 0, 50, 100 of 120
        assert_eq!(seen.into_inner().unwrap(), vec![35, 52, 68]);
    }

    #[test]
    fn parallel_progress_is_monotonic_and_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let writer = FrameWriter::create(dir.path()).unwrap();
        let seen = Mutex::new(Vec::new());
        render_frames(&analysis(240), &compositor(), &writer, true, &|p| {
            seen.lock().unwrap().push(p)
        })
        .unwrap();
        let seen = seen.into_inner().unwrap();
        assert!(!seen.is_empty());
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
        assert!(seen.iter().all(|p| (35..=75).contains(p)));
    }

    #[test]
    fn progress_formula() {
        assert_eq!(frame_progress(0, 240), 35);
        assert_eq!(frame_progress(120, 240), 55);
        assert_eq!(frame_progress(240, 240), 75);
        assert_eq!(frame_progress(0, 0), 35);
    }
}
