use image::{Rgba, RgbaImage};

/// RGBA raster target. Every drawing primitive the compositor needs lives
/// here: image blits, overlay compositing, coverage blending for glyphs and
/// butt-capped line strokes.
#[derive(Clone, Debug)]
pub struct Canvas {
    image: RgbaImage,
}

impl Canvas {
    /// Fully transparent canvas, used for text overlays.
    pub fn transparent(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width, height),
        }
    }

    pub fn from_image(image: RgbaImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// Source-over blit of `image` with its top-left corner at `(x, y)`.
    pub fn draw_image(&mut self, image: &RgbaImage, x: i64, y: i64) {
        for (sx, sy, src) in image.enumerate_pixels() {
            let (px, py) = (x + sx as i64, y + sy as i64);
            if let Some(dst) = self.pixel_mut(px, py) {
                source_over(dst, src.0);
            }
        }
    }

    pub fn composite_overlay(&mut self, overlay: &Canvas) {
        self.draw_image(&overlay.image, 0, 0);
    }

    /// Source-over blend of `color` scaled by `coverage` (0..=1).
    /// Out-of-bounds coordinates are ignored.
    pub fn blend_pixel(&mut self, x: i64, y: i64, color: [u8; 4], coverage: f32) {
        let alpha = (color[3] as f32 * coverage.clamp(0.0, 1.0)).round() as u8;
        if let Some(dst) = self.pixel_mut(x, y) {
            source_over(dst, [color[0], color[1], color[2], alpha]);
        }
    }

    fn pixel_mut(&mut self, x: i64, y: i64) -> Option<&mut Rgba<u8>> {
        if x < 0 || y < 0 || x >= self.width() as i64 || y >= self.height() as i64 {
            return None;
        }
        Some(self.image.get_pixel_mut(x as u32, y as u32))
    }

    /// Stroke from `(x1, y1)` to `(x2, y2)` with butt caps. A pixel is painted
    /// when its center lies inside the stroke rectangle (half-open on the
    /// far edges so adjacent strokes don't double up). Zero-length lines draw
    /// nothing.
    pub fn draw_line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, width: f32, color: [u8; 4]) {
        let (dx, dy) = (x2 - x1, y2 - y1);
        let len = dx.hypot(dy);
        if len <= f32::EPSILON || width <= 0.0 {
            return;
        }
        let (ux, uy) = (dx / len, dy / len);
        let half = width / 2.0;

        let min_x = (x1.min(x2) - half).floor().max(0.0) as i64;
        let max_x = ((x1.max(x2) + half).ceil() as i64).min(self.width() as i64);
        let min_y = (y1.min(y2) - half).floor().max(0.0) as i64;
        let max_y = ((y1.max(y2) + half).ceil() as i64).min(self.height() as i64);

        for py in min_y..max_y {
            for px in min_x..max_x {
                let cx = px as f32 + 0.5 - x1;
                let cy = py as f32 + 0.5 - y1;
                let along = cx * ux + cy * uy;
                let across = cy * ux - cx * uy;
                if (0.0..len).contains(&along) && (-half..half).contains(&across) {
                    self.blend_pixel(px, py, color, 1.0);
                }
            }
        }
    }
}

/// Porter-Duff source-over on straight (non-premultiplied) alpha. An
/// opaque destination stays exactly opaque.
fn source_over(dst: &mut Rgba<u8>, src: [u8; 4]) {
    let sa = src[3] as f32 / 255.0;
    if sa <= 0.0 {
        return;
    }
    if src[3] == 255 {
        dst.0 = src;
        return;
    }
    let da = dst.0[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    for c in 0..3 {
        let blended = (src[c] as f32 * sa + dst.0[c] as f32 * da * (1.0 - sa)) / out_a;
        dst.0[c] = blended.round().clamp(0.0, 255.0) as u8;
    }
    dst.0[3] = if dst.0[3] == 255 {
        255
    } else {
        (out_a * 255.0).round().clamp(0.0, 255.0) as u8
    };
}
