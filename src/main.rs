mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;
use std::time::{SystemTime, UNIX_EPOCH};

use cli::Cli;
use wavegram::config::{self, Config};
use wavegram::jobs::LogSink;
use wavegram::render::{TextPlacement, WaveformSpec};
use wavegram::text::{Rgb, StyledTextDocument};
use wavegram::{render_job, PipelineOptions, ProgressSink, RenderJob, Step, TextPlacements};

/// Mirrors checkpoints onto a terminal progress bar.
struct BarSink {
    bar: ProgressBar,
}

impl ProgressSink for BarSink {
    fn update(&self, job_id: &str, step: Step, percent: u8) {
        log::debug!("Job {}: {} - {}%", job_id, step, percent);
        self.bar.set_position(percent as u64);
        self.bar.set_message(step.as_str());
    }

    fn mark_completed(&self, _job_id: &str) {
        self.bar.finish_with_message("done");
    }

    fn mark_failed(&self, _job_id: &str, message: &str) {
        self.bar.abandon_with_message(format!("failed: {}", message));
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    // Explicit --config path, or auto-detect wavegram.toml / global config
    let config_path = cli.config.clone().or_else(config::discover_config);
    let config = match config_path {
        Some(ref path) => match config::load_config(path) {
            Some(cfg) => {
                log::info!("Loaded config from {}", path.display());
                cfg
            }
            None => {
                log::warn!("Failed to load config from {}", path.display());
                Config::default()
            }
        },
        None => Config::default(),
    };

    if !cli.input.exists() {
        anyhow::bail!("Input file not found: {}", cli.input.display());
    }
    if !cli.template.exists() {
        anyhow::bail!("Template image not found: {}", cli.template.display());
    }

    let job = build_job(&cli, &config)?;
    let mut options = PipelineOptions::from_config(&config);
    if let Some(ref dir) = cli.work_dir {
        options.work_dir = dir.clone();
    }
    if cli.sequential {
        options.parallel = false;
    }
    if let Some(secs) = cli.encoder_timeout {
        options.encoder_timeout = Some(std::time::Duration::from_secs(secs));
    }

    log::info!("wavegram - audio waveform video generator");
    log::info!("Input: {}", job.audio_file.display());
    log::info!("Template: {}", job.template_image.display());
    log::info!("Output: {}", job.output_file.display());

    // Piped or redirected output gets plain log lines instead of a bar
    let sink: Box<dyn ProgressSink> = if std::io::stderr().is_terminal() {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>3}% {msg}")
                .context("Invalid progress bar template")?
                .progress_chars("=>-"),
        );
        Box::new(BarSink { bar })
    } else {
        Box::new(LogSink)
    };

    let output = render_job(&job, &options, sink.as_ref())
        .with_context(|| format!("Job {} failed", job.job_id))?;

    log::info!("Done! Output: {}", output.display());
    Ok(())
}

fn build_job(cli: &Cli, config: &Config) -> Result<RenderJob> {
    let wave = &config.waveform;
    let color_src = cli.wave_color.as_deref().unwrap_or(&wave.color);
    let color = Rgb::parse_hex(color_src)
        .with_context(|| format!("Invalid waveform color: {}", color_src))?;

    let text = &config.text;
    let hashtag = TextPlacement {
        doc: StyledTextDocument::parse(cli.hashtag.as_deref().unwrap_or(&text.hashtag)),
        x: cli.hashtag_x.unwrap_or(text.hashtag_x),
        y: cli.hashtag_y.unwrap_or(text.hashtag_y),
    };
    let title = TextPlacement {
        doc: StyledTextDocument::parse(cli.title.as_deref().unwrap_or(&text.title)),
        x: cli.title_x.unwrap_or(text.title_x),
        y: cli.title_y.unwrap_or(text.title_y),
    };

    let job_id = match cli.job_id {
        Some(ref id) => id.clone(),
        None => SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .context("System clock is before the Unix epoch")?
            .as_millis()
            .to_string(),
    };

    Ok(RenderJob {
        audio_file: cli.input.clone(),
        template_image: cli.template.clone(),
        output_file: cli.output.clone(),
        waveform: WaveformSpec {
            color,
            x: cli.wave_x.unwrap_or(wave.x),
            y: cli.wave_y.unwrap_or(wave.y),
            width: cli.wave_width.unwrap_or(wave.width),
            height: cli.wave_height.unwrap_or(wave.height),
        },
        texts: TextPlacements { hashtag, title },
        job_id,
    })
}
