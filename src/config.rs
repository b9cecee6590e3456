use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub encoder: EncoderConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub fonts: FontConfig,
    #[serde(default)]
    pub waveform: WaveformConfig,
    #[serde(default)]
    pub text: TextConfig,
}

#[derive(Debug, Deserialize)]
pub struct EncoderConfig {
    #[serde(default = "default_program")]
    pub program: PathBuf,
    /// Kill the encoder after this many seconds. Unset means wait forever.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct RenderConfig {
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,
    #[serde(default = "default_parallel")]
    pub parallel: bool,
    #[serde(default = "default_cleanup_grace_ms")]
    pub cleanup_grace_ms: u64,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct FontConfig {
    #[serde(default)]
    pub regular: Option<PathBuf>,
    #[serde(default)]
    pub bold: Option<PathBuf>,
    #[serde(default)]
    pub italic: Option<PathBuf>,
    #[serde(default)]
    pub bold_italic: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
pub struct WaveformConfig {
    #[serde(default = "default_wave_color")]
    pub color: String,
    #[serde(default = "default_wave_x")]
    pub x: f32,
    #[serde(default = "default_wave_y")]
    pub y: f32,
    #[serde(default = "default_wave_width")]
    pub width: f32,
    #[serde(default = "default_wave_height")]
    pub height: f32,
}

#[derive(Debug, Deserialize)]
pub struct TextConfig {
    #[serde(default = "default_hashtag")]
    pub hashtag: String,
    #[serde(default = "default_hashtag_x")]
    pub hashtag_x: f32,
    #[serde(default = "default_hashtag_y")]
    pub hashtag_y: f32,
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_title_x")]
    pub title_x: f32,
    #[serde(default = "default_title_y")]
    pub title_y: f32,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            timeout_secs: None,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            work_dir: default_work_dir(),
            parallel: default_parallel(),
            cleanup_grace_ms: default_cleanup_grace_ms(),
        }
    }
}

impl Default for WaveformConfig {
    fn default() -> Self {
        Self {
            color: default_wave_color(),
            x: default_wave_x(),
            y: default_wave_y(),
            width: default_wave_width(),
            height: default_wave_height(),
        }
    }
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            hashtag: default_hashtag(),
            hashtag_x: default_hashtag_x(),
            hashtag_y: default_hashtag_y(),
            title: default_title(),
            title_x: default_title_x(),
            title_y: default_title_y(),
        }
    }
}

fn default_program() -> PathBuf { "ffmpeg".into() }
fn default_work_dir() -> PathBuf { "outputs".into() }
fn default_parallel() -> bool { true }
fn default_cleanup_grace_ms() -> u64 { 2000 }
fn default_wave_color() -> String { "#FF0046".into() }
fn default_wave_x() -> f32 { 340.0 }
fn default_wave_y() -> f32 { 200.0 }
fn default_wave_width() -> f32 { 400.0 }
fn default_wave_height() -> f32 { 50.0 }
fn default_hashtag() -> String { r##"{"ops":[{"insert":"#SPAINMWC\n"}]}"##.into() }
fn default_hashtag_x() -> f32 { 108.0 }
fn default_hashtag_y() -> f32 { 128.0 }
fn default_title() -> String { r#"{"ops":[{"insert":"La revolución del pensamiento\n"}]}"#.into() }
fn default_title_x() -> f32 { 30.0 }
fn default_title_y() -> f32 { 195.0 }

pub fn load_config(path: &Path) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(err) => {
            log::warn!("Invalid config {}: {}", path.display(), err);
            None
        }
    }
}

/// `./wavegram.toml`, then `~/.config/wavegram/config.toml`, then the
/// platform config directory.
pub fn discover_config() -> Option<PathBuf> {
    let local = PathBuf::from("wavegram.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("wavegram").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("wavegram").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.encoder.program, PathBuf::from("ffmpeg"));
        assert_eq!(config.encoder.timeout_secs, None);
        assert!(config.render.parallel);
        assert_eq!(config.render.cleanup_grace_ms, 2000);
        assert_eq!(config.waveform.color, "#FF0046");
        assert_eq!(config.text.hashtag_x, 108.0);
        assert!(config.fonts.regular.is_none());
    }

    #[test]
    fn partial_sections_merge_with_defaults() {
        let config: Config = toml::from_str(
            r##"
            [encoder]
            timeout_secs = 600

            [waveform]
            color = "#00FF00"
            height = 80

            [fonts]
            regular = "/opt/fonts/Inter.ttf"
            "##,
        )
        .unwrap();
        assert_eq!(config.encoder.program, PathBuf::from("ffmpeg"));
        assert_eq!(config.encoder.timeout_secs, Some(600));
        assert_eq!(config.waveform.color, "#00FF00");
        assert_eq!(config.waveform.height, 80.0);
        assert_eq!(config.waveform.width, 400.0);
        assert_eq!(config.fonts.regular, Some(PathBuf::from("/opt/fonts/Inter.ttf")));
    }

    #[test]
    fn unreadable_or_invalid_config_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[render\nparallel = ").unwrap();
        assert!(load_config(&path).is_none());
        assert!(load_config(&dir.path().join("missing.toml")).is_none());
    }
}
