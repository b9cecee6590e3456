use fontdue::{Font, FontSettings};
use std::path::{Path, PathBuf};

use crate::config::FontConfig;
use crate::error::{RenderError, Result};
use crate::text::{FontStyle, TextMeasure};

/// Fallback face when neither the config nor the system provides one.
const EMBEDDED_FONT: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

/// (regular, bold, italic, bold italic) for common sans-serif families.
const SYSTEM_FAMILIES: &[[&str; 4]] = &[
    [
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
        "/usr/share/fonts/truetype/dejavu/DejaVuSans-Oblique.ttf",
        "/usr/share/fonts/truetype/dejavu/DejaVuSans-BoldOblique.ttf",
    ],
    [
        "/usr/share/fonts/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/dejavu/DejaVuSans-Bold.ttf",
        "/usr/share/fonts/dejavu/DejaVuSans-Oblique.ttf",
        "/usr/share/fonts/dejavu/DejaVuSans-BoldOblique.ttf",
    ],
    [
        "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
        "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
        "/usr/share/fonts/truetype/liberation/LiberationSans-Italic.ttf",
        "/usr/share/fonts/truetype/liberation/LiberationSans-BoldItalic.ttf",
    ],
    [
        "/usr/share/fonts/truetype/liberation2/LiberationSans-Regular.ttf",
        "/usr/share/fonts/truetype/liberation2/LiberationSans-Bold.ttf",
        "/usr/share/fonts/truetype/liberation2/LiberationSans-Italic.ttf",
        "/usr/share/fonts/truetype/liberation2/LiberationSans-BoldItalic.ttf",
    ],
    [
        "/System/Library/Fonts/Supplemental/Arial.ttf",
        "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
        "/System/Library/Fonts/Supplemental/Arial Italic.ttf",
        "/System/Library/Fonts/Supplemental/Arial Bold Italic.ttf",
    ],
    [
        "C:\\Windows\\Fonts\\arial.ttf",
        "C:\\Windows\\Fonts\\arialbd.ttf",
        "C:\\Windows\\Fonts\\ariali.ttf",
        "C:\\Windows\\Fonts\\arialbi.ttf",
    ],
];

/// Which effects must be faked because the face is missing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Synthetic {
    pub bold: bool,
    pub italic: bool,
}

pub struct FontBook {
    regular: Font,
    bold: Option<Font>,
    italic: Option<Font>,
    bold_italic: Option<Font>,
}

impl FontBook {
    /// Load configured faces. The regular face falls back to the first
    /// system family found and then to the embedded face, so this only
    /// fails if the embedded face itself is unusable.
    pub fn load(config: &FontConfig) -> Result<Self> {
        if let Some(path) = &config.regular {
            match load_font(path) {
                Ok(regular) => {
                    log::info!("Using font {}", path.display());
                    return Ok(Self::with_styles(regular, config, None));
                }
                Err(err) => log::warn!("{}; falling back to a default font", err),
            }
        }

        let family = SYSTEM_FAMILIES
            .iter()
            .find(|family| Path::new(family[0]).exists());
        if let Some(family) = family {
            match load_font(Path::new(family[0])) {
                Ok(regular) => {
                    log::info!("Using font {}", family[0]);
                    return Ok(Self::with_styles(regular, config, Some(family)));
                }
                Err(err) => log::warn!("{}", err),
            }
        }

        log::info!("Using embedded DejaVu Sans");
        let regular = parse_font(EMBEDDED_FONT, "<embedded>")?;
        Ok(Self::with_styles(regular, config, None))
    }

    /// Embedded regular face only; every other style is synthesized.
    pub fn embedded() -> Result<Self> {
        Self::from_regular_bytes(EMBEDDED_FONT)
    }

    /// Style faces come from the config, or from `family` when given.
    fn with_styles(regular: Font, config: &FontConfig, family: Option<&[&str; 4]>) -> Self {
        let optional_face = |configured: &Option<PathBuf>, slot: usize| -> Option<Font> {
            let path = configured
                .clone()
                .or_else(|| family.map(|f| PathBuf::from(f[slot])))?;
            match load_font(&path) {
                Ok(font) => Some(font),
                Err(err) => {
                    log::warn!("{}; synthesizing the style instead", err);
                    None
                }
            }
        };

        Self {
            bold: optional_face(&config.bold, 1),
            italic: optional_face(&config.italic, 2),
            bold_italic: optional_face(&config.bold_italic, 3),
            regular,
        }
    }

    pub fn from_regular_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(Self {
            regular: parse_font(bytes, "<memory>")?,
            bold: None,
            italic: None,
            bold_italic: None,
        })
    }

    /// Best face for `style`, plus whatever the face can't provide.
    pub fn face(&self, style: &FontStyle) -> (&Font, Synthetic) {
        match (style.bold, style.italic) {
            (false, false) => (&self.regular, Synthetic::default()),
            (true, false) => match &self.bold {
                Some(font) => (font, Synthetic::default()),
                None => (&self.regular, Synthetic { bold: true, italic: false }),
            },
            (false, true) => match &self.italic {
                Some(font) => (font, Synthetic::default()),
                None => (&self.regular, Synthetic { bold: false, italic: true }),
            },
            (true, true) => {
                if let Some(font) = &self.bold_italic {
                    (font, Synthetic::default())
                } else if let Some(font) = &self.bold {
                    (font, Synthetic { bold: false, italic: true })
                } else if let Some(font) = &self.italic {
                    (font, Synthetic { bold: true, italic: false })
                } else {
                    (&self.regular, Synthetic { bold: true, italic: true })
                }
            }
        }
    }
}

impl TextMeasure for FontBook {
    fn text_width(&self, text: &str, style: &FontStyle) -> f32 {
        let (font, _) = self.face(style);
        text.chars()
            .map(|ch| font.metrics(ch, style.size).advance_width)
            .sum()
    }
}

fn load_font(path: &Path) -> Result<Font> {
    let bytes = std::fs::read(path)
        .map_err(|e| RenderError::Font(format!("failed to read font {}: {}", path.display(), e)))?;
    parse_font(&bytes, &path.display().to_string())
}

fn parse_font(bytes: &[u8], name: &str) -> Result<Font> {
    Font::from_bytes(bytes, FontSettings::default())
        .map_err(|e| RenderError::Font(format!("failed to parse font {}: {}", name, e)))
}
