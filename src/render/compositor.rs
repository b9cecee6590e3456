use image::imageops::{self, FilterType};
use image::RgbaImage;
use std::path::Path;

use super::canvas::Canvas;
use super::fonts::FontBook;
use super::text::TextOverlay;
use super::waveform::{draw_waveform, WaveformSpec};
use crate::error::{RenderError, Result};
use crate::text::StyledTextDocument;

/// A text document anchored at a baseline origin.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextPlacement {
    pub doc: StyledTextDocument,
    pub x: f32,
    pub y: f32,
}

/// Round each dimension up to the next even number (yuv420p needs both even).
pub fn even_dimensions(width: u32, height: u32) -> (u32, u32) {
    (width + width % 2, height + height % 2)
}

/// Load the template and stretch it to even dimensions if necessary.
pub fn load_template(path: &Path) -> Result<RgbaImage> {
    let image = image::open(path)
        .map_err(|source| RenderError::Image {
            path: path.to_path_buf(),
            source,
        })?
        .to_rgba8();
    Ok(make_even(image))
}

pub fn make_even(image: RgbaImage) -> RgbaImage {
    let (width, height) = image.dimensions();
    let (even_w, even_h) = even_dimensions(width, height);
    if (even_w, even_h) == (width, height) {
        return image;
    }
    log::info!(
        "Resizing template {}x{} -> {}x{} for even dimensions",
        width,
        height,
        even_w,
        even_h
    );
    imageops::resize(&image, even_w, even_h, FilterType::Lanczos3)
}

/// Per-job compositor. Template and both text layers are identical across
/// frames, so they are flattened once into `base`; each frame only adds the
/// waveform on top. Layer order: template, hashtag, title, waveform.
pub struct Compositor {
    base: Canvas,
    waveform: WaveformSpec,
}

impl Compositor {
    /// `fonts` may be `None` only when every placement is empty.
    pub fn new(
        template: RgbaImage,
        texts: &[&TextPlacement],
        fonts: Option<&FontBook>,
        waveform: WaveformSpec,
    ) -> Result<Self> {
        let mut base = Canvas::from_image(make_even(template));
        let (width, height) = (base.width(), base.height());

        for placement in texts {
            if placement.doc.is_empty() {
                continue;
            }
            let fonts = fonts.ok_or_else(|| {
                RenderError::Font("text placement requires a loaded font book".into())
            })?;
            let layer = TextOverlay::new(fonts).render_document(
                &placement.doc,
                placement.x,
                placement.y,
                width,
                height,
            );
            base.composite_overlay(&layer);
        }

        Ok(Self { base, waveform })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.base.width(), self.base.height())
    }

    pub fn composite(&self, amplitudes: &[f32]) -> RgbaImage {
        let mut frame = self.base.clone();
        draw_waveform(&mut frame, amplitudes, &self.waveform);
        frame.into_image()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::Rgb;
    use image::Rgba;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

    fn spec() -> WaveformSpec {
        WaveformSpec {
            color: Rgb { r: 255, g: 0, b: 0 },
            x: 10.0,
            y: 20.0,
            width: 100.0,
            height: 20.0,
        }
    }

    #[test]
    fn odd_dimensions_round_up() {
        assert_eq!(even_dimensions(2401, 1000), (2402, 1000));
        assert_eq!(even_dimensions(1920, 1080), (1920, 1080));
        assert_eq!(even_dimensions(3, 5), (4, 6));
    }

    #[test]
    fn odd_template_is_resized_to_even() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("template.png");
        RgbaImage::from_pixel(2401, 1000, WHITE).save(&path).unwrap();

        let template = load_template(&path).unwrap();
        assert_eq!(template.dimensions(), (2402, 1000));
    }

    #[test]
    fn unreadable_template_is_an_image_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("template.png");
        std::fs::write(&path, b"not an image").unwrap();
        assert!(matches!(load_template(&path), Err(RenderError::Image { .. })));
    }

    #[test]
    fn frame_is_template_plus_waveform() {
        let template = RgbaImage::from_pixel(120, 40, WHITE);
        let compositor = Compositor::new(template, &[], None, spec()).unwrap();
        assert_eq!(compositor.dimensions(), (120, 40));

        let silent = compositor.composite(&[0.0; 100]);
        let loud = compositor.composite(&[1.0; 100]);
        // center line is always present
        assert_eq!(silent.get_pixel(50, 19), &Rgba([255, 0, 0, 255]));
        // bars only when there is signal
        assert_eq!(silent.get_pixel(10, 12), &WHITE);
        assert_eq!(loud.get_pixel(10, 12), &Rgba([255, 0, 0, 255]));
        // outside the waveform the template shows through
        assert_eq!(loud.get_pixel(115, 5), &WHITE);
    }

    #[test]
    fn non_empty_text_without_fonts_fails() {
        let placement = TextPlacement {
            doc: StyledTextDocument::parse(r#"{"ops":[{"insert":"hello"}]}"#),
            x: 5.0,
            y: 30.0,
        };
        let template = RgbaImage::from_pixel(64, 64, WHITE);
        let result = Compositor::new(template, &[&placement], None, spec());
        assert!(matches!(result, Err(RenderError::Font(_))));
    }

    #[test]
    fn empty_text_needs_no_fonts() {
        let placement = TextPlacement {
            doc: StyledTextDocument::parse("{broken"),
            x: 5.0,
            y: 30.0,
        };
        let template = RgbaImage::from_pixel(64, 64, WHITE);
        assert!(Compositor::new(template, &[&placement, &placement], None, spec()).is_ok());
    }

    #[test]
    fn text_is_drawn_over_the_template() {
        let fonts = FontBook::embedded().unwrap();
        let placement = TextPlacement {
            doc: StyledTextDocument::parse(
                r##"{"ops":[{"insert":"HELLO","attributes":{"color":"#0000FF","bold":true,"underline":true}}]}"##,
            ),
            x: 4.0,
            y: 30.0,
        };
        let template = RgbaImage::from_pixel(160, 48, WHITE);
        let compositor = Compositor::new(template, &[&placement], Some(&fonts), spec()).unwrap();
        let frame = compositor.composite(&[]);
        let blue = frame
            .pixels()
            .filter(|p| p[2] > 200 && p[0] < 100 && p[1] < 100)
            .count();
        assert!(blue > 20, "expected glyph pixels, found {blue}");
    }
}
