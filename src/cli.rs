use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "wavegram", about = "Render an audio waveform over a still image into an MP4")]
pub struct Cli {
    /// Input audio file (WAV, MP3, FLAC, OGG, AAC)
    pub input: PathBuf,

    /// Background template image (PNG, JPEG)
    #[arg(short, long)]
    pub template: PathBuf,

    /// Output video file
    #[arg(short, long, default_value = "output.mp4")]
    pub output: PathBuf,

    /// Config file (default: wavegram.toml, then the user config dir)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Hashtag document as `{"ops":[...]}` JSON
    #[arg(long)]
    pub hashtag: Option<String>,

    #[arg(long)]
    pub hashtag_x: Option<f32>,

    #[arg(long)]
    pub hashtag_y: Option<f32>,

    /// Title document as `{"ops":[...]}` JSON
    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub title_x: Option<f32>,

    #[arg(long)]
    pub title_y: Option<f32>,

    /// Waveform color as #RRGGBB
    #[arg(long)]
    pub wave_color: Option<String>,

    #[arg(long)]
    pub wave_x: Option<f32>,

    /// Vertical center of the waveform
    #[arg(long)]
    pub wave_y: Option<f32>,

    #[arg(long)]
    pub wave_width: Option<f32>,

    #[arg(long)]
    pub wave_height: Option<f32>,

    /// Directory for intermediate frames
    #[arg(long)]
    pub work_dir: Option<PathBuf>,

    /// Job identifier used in logs (default: current time in milliseconds)
    #[arg(long)]
    pub job_id: Option<String>,

    /// Composite frames on a single thread
    #[arg(long)]
    pub sequential: bool,

    /// Kill the encoder after this many seconds
    #[arg(long)]
    pub encoder_timeout: Option<u64>,
}
