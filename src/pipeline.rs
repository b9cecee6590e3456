//! One render job from audio file to finished video.
//!
//! Stages run strictly in order and report fixed checkpoints to the sink:
//! initializing 5, audio 10..30, frames 35..75, video 75..95, finalizing 98.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::audio::{self, AudioAnalysis};
use crate::config::{Config, FontConfig};
use crate::encode::{EncodeRequest, EncoderDriver};
use crate::error::Result;
use crate::jobs::{ProgressSink, Step};
use crate::render::compositor::load_template;
use crate::render::frames::render_frames;
use crate::render::{Compositor, FontBook, FrameWriter, TextPlacement, WaveformSpec};

#[derive(Clone, Debug, Default)]
pub struct TextPlacements {
    pub hashtag: TextPlacement,
    pub title: TextPlacement,
}

/// Everything one invocation needs. Owned by that invocation only.
#[derive(Clone, Debug)]
pub struct RenderJob {
    pub audio_file: PathBuf,
    pub template_image: PathBuf,
    pub output_file: PathBuf,
    pub waveform: WaveformSpec,
    pub texts: TextPlacements,
    pub job_id: String,
}

#[derive(Clone, Debug)]
pub struct PipelineOptions {
    pub work_dir: PathBuf,
    pub parallel: bool,
    /// Delay between encoder success and frame-directory removal.
    pub cleanup_grace: Duration,
    pub encoder_program: PathBuf,
    pub encoder_timeout: Option<Duration>,
    pub fonts: FontConfig,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl PipelineOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            work_dir: config.render.work_dir.clone(),
            parallel: config.render.parallel,
            cleanup_grace: Duration::from_millis(config.render.cleanup_grace_ms),
            encoder_program: config.encoder.program.clone(),
            encoder_timeout: config.encoder.timeout_secs.map(Duration::from_secs),
            fonts: config.fonts.clone(),
        }
    }
}

/// `<work_dir>/frames_<job id>`, with anything outside `[A-Za-z0-9_-]`
/// in the id replaced by `_` so the directory stays inside `work_dir`.
pub fn frames_dir_for(work_dir: &Path, job_id: &str) -> PathBuf {
    let name: String = job_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    work_dir.join(format!("frames_{}", name))
}

/// Run the whole job. On success the frame directory is gone and the sink
/// has seen `mark_completed`; on failure the sink has seen `mark_failed`
/// and the frame directory has been removed.
pub fn render_job(job: &RenderJob, options: &PipelineOptions, sink: &dyn ProgressSink) -> Result<PathBuf> {
    let frames_dir = frames_dir_for(&options.work_dir, &job.job_id);
    log::info!(
        "Job {}: {} + {} -> {}",
        job.job_id,
        job.audio_file.display(),
        job.template_image.display(),
        job.output_file.display()
    );

    match run_stages(job, options, &frames_dir, sink) {
        Ok(output) => {
            finalize(&frames_dir, options.cleanup_grace);
            sink.update(&job.job_id, Step::Finalizing, 100);
            sink.mark_completed(&job.job_id);
            Ok(output)
        }
        Err(err) => {
            log::error!("Job {} failed: {}", job.job_id, err);
            sink.mark_failed(&job.job_id, &err.to_string());
            remove_frames_dir(&frames_dir);
            Err(err)
        }
    }
}

fn run_stages(
    job: &RenderJob,
    options: &PipelineOptions,
    frames_dir: &Path,
    sink: &dyn ProgressSink,
) -> Result<PathBuf> {
    let id = job.job_id.as_str();
    sink.update(id, Step::Initializing, 5);

    sink.update(id, Step::Audio, 10);
    let analysis = audio::analyze(&job.audio_file)?;
    sink.update(id, Step::Audio, 30);

    let frame_count = render_frame_stage(job, options, &analysis, frames_dir, sink)?;

    sink.update(id, Step::Video, 75);
    let expected = analysis.duration.min(analysis.frame_sequence_duration());
    let mut driver = EncoderDriver::new(&options.encoder_program).with_timeout(options.encoder_timeout);
    let request = EncodeRequest {
        frames_dir,
        audio: &job.audio_file,
        output: &job.output_file,
        expected_duration: Some(expected),
    };
    let output = driver.run(&request, |percent| sink.update(id, Step::Video, percent))?;
    log::info!("Job {}: encoded {} frames into {}", id, frame_count, output.display());

    sink.update(id, Step::Finalizing, 98);
    Ok(output)
}

/// Composite every frame of `analysis` into `frames_dir`. Reports 35 on
/// entry and then 35..=75 as frames complete.
pub fn render_frame_stage(
    job: &RenderJob,
    options: &PipelineOptions,
    analysis: &AudioAnalysis,
    frames_dir: &Path,
    sink: &dyn ProgressSink,
) -> Result<usize> {
    let id = job.job_id.as_str();
    sink.update(id, Step::Frames, 35);

    let template = load_template(&job.template_image)?;
    let texts = [&job.texts.hashtag, &job.texts.title];
    let fonts = if texts.iter().any(|t| !t.doc.is_empty()) {
        match FontBook::load(&options.fonts) {
            Ok(fonts) => Some(fonts),
            Err(err) => {
                log::warn!("Job {}: {}; rendering without text", id, err);
                None
            }
        }
    } else {
        None
    };
    // Text is best-effort: without fonts only the template and waveform are drawn
    let texts: &[&TextPlacement] = if fonts.is_some() { &texts } else { &[] };
    let compositor = Compositor::new(template, texts, fonts.as_ref(), job.waveform)?;

    let writer = FrameWriter::create(frames_dir)?;
    render_frames(analysis, &compositor, &writer, options.parallel, &|percent| {
        sink.update(id, Step::Frames, percent)
    })
}

fn finalize(frames_dir: &Path, grace: Duration) {
    if !grace.is_zero() {
        std::thread::sleep(grace);
    }
    remove_frames_dir(frames_dir);
}

fn remove_frames_dir(frames_dir: &Path) {
    if !frames_dir.exists() {
        return;
    }
    match std::fs::remove_dir_all(frames_dir) {
        Ok(()) => log::debug!("Removed {}", frames_dir.display()),
        Err(err) => log::warn!("Failed to remove {}: {}", frames_dir.display(), err),
    }
}
