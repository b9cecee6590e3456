use super::canvas::Canvas;
use super::fonts::FontBook;
use crate::text::{layout, DrawCommand, FontStyle, StyledTextDocument};

/// Horizontal shear applied per pixel above the baseline for fake italics.
const SYNTHETIC_ITALIC_SHEAR: f32 = 0.2;

/// Rasterizes laid-out text onto a canvas.
pub struct TextOverlay<'a> {
    fonts: &'a FontBook,
}

impl<'a> TextOverlay<'a> {
    pub fn new(fonts: &'a FontBook) -> Self {
        Self { fonts }
    }

    /// Lay out `doc` at the baseline origin and draw it onto a fresh
    /// transparent layer of the given size.
    pub fn render_document(
        &self,
        doc: &StyledTextDocument,
        x: f32,
        y: f32,
        width: u32,
        height: u32,
    ) -> Canvas {
        let mut layer = Canvas::transparent(width, height);
        let commands = layout(doc, x, y, self.fonts);
        log::debug!("Text layout at ({}, {}): {} draw commands", x, y, commands.len());
        self.draw(&mut layer, &commands);
        layer
    }

    pub fn draw(&self, canvas: &mut Canvas, commands: &[DrawCommand]) {
        for command in commands {
            match command {
                DrawCommand::Text {
                    text,
                    x,
                    y,
                    style,
                    color,
                } => self.draw_text(canvas, text, *x, *y, style, color.to_rgba(255)),
                DrawCommand::Underline {
                    x,
                    y,
                    width,
                    thickness,
                    color,
                } => canvas.draw_line(*x, *y, x + width, *y, *thickness, color.to_rgba(255)),
            }
        }
    }

    fn draw_text(
        &self,
        canvas: &mut Canvas,
        text: &str,
        x: f32,
        baseline: f32,
        style: &FontStyle,
        color: [u8; 4],
    ) {
        let (font, synthetic) = self.fonts.face(style);
        let bold_offset = if synthetic.bold {
            (style.size / 24.0).max(1.0).round() as i64
        } else {
            0
        };
        let baseline_px = baseline.round() as i64;

        let mut pen_x = x;
        for ch in text.chars() {
            let (metrics, bitmap) = font.rasterize(ch, style.size);
            let left = pen_x.round() as i64 + metrics.xmin as i64;
            // ymin is the bitmap bottom relative to the baseline, positive up
            let top = baseline_px - (metrics.height as i64 + metrics.ymin as i64);

            for gy in 0..metrics.height {
                let py = top + gy as i64;
                let shear = if synthetic.italic {
                    ((baseline_px - py) as f32 * SYNTHETIC_ITALIC_SHEAR).round() as i64
                } else {
                    0
                };
                for gx in 0..metrics.width {
                    let coverage = bitmap[gy * metrics.width + gx];
                    if coverage == 0 {
                        continue;
                    }
                    let px = left + gx as i64 + shear;
                    let coverage = coverage as f32 / 255.0;
                    canvas.blend_pixel(px, py, color, coverage);
                    if bold_offset > 0 {
                        canvas.blend_pixel(px + bold_offset, py, color, coverage);
                    }
                }
            }

            pen_x += metrics.advance_width;
        }
    }
}
