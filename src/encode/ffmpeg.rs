use std::ffi::OsString;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use crate::audio::FPS;
use crate::error::{RenderError, Result};
use crate::render::frames::{is_frame_file_name, FRAME_PATTERN};

/// Caller-visible progress window for the encode stage.
const PROGRESS_FLOOR: f64 = 75.0;
const PROGRESS_CEIL: f64 = 95.0;
const STDERR_TAIL_LINES: usize = 20;

#[derive(Clone, Debug, PartialEq)]
pub enum EncoderState {
    Idle,
    Validating,
    Running,
    Succeeded(PathBuf),
    Failed(String),
}

pub struct EncodeRequest<'a> {
    pub frames_dir: &'a Path,
    pub audio: &'a Path,
    pub output: &'a Path,
    /// Expected output length in seconds, used to turn encoder timestamps
    /// into a percentage. Without it no progress is reported.
    pub expected_duration: Option<f64>,
}

/// Drives one ffmpeg run: `Idle -> Validating -> Running -> Succeeded | Failed`.
pub struct EncoderDriver {
    program: PathBuf,
    timeout: Option<Duration>,
    state: EncoderState,
}

impl EncoderDriver {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: None,
            state: EncoderState::Idle,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn state(&self) -> &EncoderState {
        &self.state
    }

    /// Validate inputs, run the encoder once and report progress in 75..=95.
    pub fn run(&mut self, request: &EncodeRequest, mut on_progress: impl FnMut(u8)) -> Result<PathBuf> {
        self.state = EncoderState::Validating;
        let result = validate(request).and_then(|frame_count| {
            log::info!("Encoding {} frames from {}", frame_count, request.frames_dir.display());
            self.state = EncoderState::Running;
            self.execute(request, &mut on_progress)
        });

        match result {
            Ok(()) => {
                self.state = EncoderState::Succeeded(request.output.to_path_buf());
                log::info!("Encoding complete: {}", request.output.display());
                Ok(request.output.to_path_buf())
            }
            Err(err) => {
                self.state = EncoderState::Failed(err.to_string());
                Err(err)
            }
        }
    }

    fn execute(&self, request: &EncodeRequest, on_progress: &mut dyn FnMut(u8)) -> Result<()> {
        if let Some(parent) = request.output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| RenderError::io(parent, e))?;
        }

        let args = encoder_args(request.frames_dir, request.audio, request.output);
        log::info!(
            "Starting encoder: {} {}",
            self.program.display(),
            args.iter()
                .map(|a| a.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        );

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                RenderError::Encoder(format!(
                    "failed to spawn {}: {}. Is ffmpeg installed?",
                    self.program.display(),
                    e
                ))
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RenderError::Encoder("encoder stdout not captured".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| RenderError::Encoder("encoder stderr not captured".into()))?;

        // Drain stderr so a chatty encoder can't block on a full pipe
        let stderr_task = thread::spawn(move || {
            let mut output = String::new();
            let _ = BufReader::new(stderr).read_to_string(&mut output);
            output
        });
        let ticks = spawn_progress_reader(stdout);

        let watched = self.watch(&mut child, &ticks, request.expected_duration, on_progress);
        if watched.is_err() {
            let _ = child.kill();
        }
        let status = child
            .wait()
            .map_err(|e| RenderError::Encoder(format!("failed to wait for encoder: {e}")))?;
        let stderr_output = stderr_task.join().unwrap_or_default();
        watched?;

        if !status.success() {
            return Err(RenderError::Encoder(format!(
                "encoder exited with {}:\n{}",
                status,
                tail(&stderr_output, STDERR_TAIL_LINES)
            )));
        }
        Ok(())
    }

    /// Consume progress ticks until the encoder closes stdout.
    fn watch(
        &self,
        child: &mut Child,
        ticks: &Receiver<ProgressTick>,
        expected_duration: Option<f64>,
        on_progress: &mut dyn FnMut(u8),
    ) -> Result<()> {
        let deadline = self.timeout.map(|t| Instant::now() + t);
        let mut last_reported = None;

        loop {
            let tick = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    match ticks.recv_timeout(remaining) {
                        Ok(tick) => tick,
                        Err(RecvTimeoutError::Disconnected) => return Ok(()),
                        Err(RecvTimeoutError::Timeout) => {
                            return Err(RenderError::Encoder(format!(
                                "encoder (pid {}) timed out after {:?}",
                                child.id(),
                                self.timeout.unwrap_or_default()
                            )));
                        }
                    }
                }
                None => match ticks.recv() {
                    Ok(tick) => tick,
                    Err(_) => return Ok(()),
                },
            };

            let Some(percent) = tick.percent(expected_duration) else {
                continue;
            };
            let mapped = map_progress(percent);
            log::debug!("Encoder progress: {:.1}% -> {}", percent, mapped);
            if last_reported.map_or(true, |last| mapped > last) {
                last_reported = Some(mapped);
                on_progress(mapped);
            }
        }
    }
}

/// The fixed ffmpeg argument contract: frame sequence at 24 fps plus the
/// source audio, H.264/yuv420p video with even dimensions, AAC audio,
/// output cut to the shorter stream. Progress goes to stdout as key=value.
pub fn encoder_args(frames_dir: &Path, audio: &Path, output: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = [
        "-y",
        "-hide_banner",
        "-nostats",
        "-progress",
        "pipe:1",
        "-framerate",
    ]
    .iter()
    .map(OsString::from)
    .collect();
    args.push(FPS.to_string().into());
    args.push("-i".into());
    args.push(frames_dir.join(FRAME_PATTERN).into_os_string());
    args.push("-i".into());
    args.push(audio.as_os_str().to_owned());
    args.extend(
        [
            "-vf",
            "scale=trunc(iw/2)*2:trunc(ih/2)*2",
            "-c:v",
            "libx264",
            "-pix_fmt",
            "yuv420p",
            "-preset",
            "ultrafast",
            "-crf",
            "23",
            "-c:a",
            "aac",
            "-b:a",
            "192k",
            "-shortest",
        ]
        .iter()
        .map(OsString::from),
    );
    args.push(output.as_os_str().to_owned());
    args
}

/// `75 + percent * 0.2`, clamped to 75..=95.
pub fn map_progress(percent: f64) -> u8 {
    (PROGRESS_FLOOR + percent * 0.2)
        .clamp(PROGRESS_FLOOR, PROGRESS_CEIL)
        .round() as u8
}

/// Count frame files; refuse to run on anything the encoder would choke on.
fn validate(request: &EncodeRequest) -> Result<usize> {
    if !request.frames_dir.is_dir() {
        return Err(RenderError::Validation(format!(
            "frame directory does not exist: {}",
            request.frames_dir.display()
        )));
    }
    if !request.audio.is_file() {
        return Err(RenderError::Validation(format!(
            "audio file does not exist: {}",
            request.audio.display()
        )));
    }

    let entries = std::fs::read_dir(request.frames_dir)
        .map_err(|e| RenderError::io(request.frames_dir, e))?;
    let mut total = 0usize;
    let mut frames = 0usize;
    for entry in entries {
        let entry = entry.map_err(|e| RenderError::io(request.frames_dir, e))?;
        total += 1;
        if entry.file_name().to_str().is_some_and(is_frame_file_name) {
            frames += 1;
        }
    }

    if total == 0 {
        return Err(RenderError::Validation(format!(
            "frame directory is empty: {}",
            request.frames_dir.display()
        )));
    }
    if frames == 0 {
        return Err(RenderError::Validation(format!(
            "no frame_NNNNNN.png files in {}",
            request.frames_dir.display()
        )));
    }
    Ok(frames)
}

/// One `-progress` block from the encoder.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProgressTick {
    pub out_time_secs: f64,
    pub finished: bool,
}

impl ProgressTick {
    pub fn percent(&self, expected_duration: Option<f64>) -> Option<f64> {
        if self.finished {
            return Some(100.0);
        }
        let expected = expected_duration.filter(|d| *d > 0.0)?;
        Some((self.out_time_secs / expected * 100.0).clamp(0.0, 100.0))
    }
}

/// Accumulates `key=value` lines; a block ends with `progress=continue|end`.
#[derive(Debug, Default)]
pub struct ProgressParser {
    out_time_secs: f64,
}

impl ProgressParser {
    pub fn feed(&mut self, line: &str) -> Option<ProgressTick> {
        let (key, value) = line.trim().split_once('=')?;
        match key {
            // Both are microseconds despite the name
            "out_time_us" | "out_time_ms" => {
                if let Ok(us) = value.trim().parse::<f64>() {
                    self.out_time_secs = us / 1_000_000.0;
                }
                None
            }
            "progress" => Some(ProgressTick {
                out_time_secs: self.out_time_secs,
                finished: value.trim() == "end",
            }),
            _ => None,
        }
    }
}

fn spawn_progress_reader(stdout: impl Read + Send + 'static) -> Receiver<ProgressTick> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut parser = ProgressParser::default();
        for line in BufReader::new(stdout).lines() {
            let Ok(line) = line else { break };
            if let Some(tick) = parser.feed(&line) {
                if tx.send(tick).is_err() {
                    break;
                }
            }
        }
    });
    rx
}

fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.lines().collect();
    all[all.len().saturating_sub(lines)..].join("\n")
}
