use super::canvas::Canvas;
use crate::text::Rgb;

pub const STROKE_WIDTH: f32 = 2.0;

/// Waveform placement in output pixels. `y` is the vertical center line.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WaveformSpec {
    pub color: Rgb,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Stroke {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

/// Center line followed by one vertical bar per amplitude. Bar `i` sits at
/// `x + i * width / n` and spans `amplitude * height` centered on `y`.
pub fn waveform_strokes(amplitudes: &[f32], spec: &WaveformSpec) -> Vec<Stroke> {
    let mut strokes = Vec::with_capacity(amplitudes.len() + 1);
    strokes.push(Stroke {
        x1: spec.x,
        y1: spec.y,
        x2: spec.x + spec.width,
        y2: spec.y,
    });

    if amplitudes.is_empty() {
        return strokes;
    }

    let spacing = spec.width / amplitudes.len() as f32;
    strokes.extend(amplitudes.iter().enumerate().map(|(i, &amplitude)| {
        let bx = spec.x + i as f32 * spacing;
        let half = amplitude * spec.height / 2.0;
        Stroke {
            x1: bx,
            y1: spec.y - half,
            x2: bx,
            y2: spec.y + half,
        }
    }));
    strokes
}

pub fn draw_waveform(canvas: &mut Canvas, amplitudes: &[f32], spec: &WaveformSpec) {
    let color = spec.color.to_rgba(255);
    for s in waveform_strokes(amplitudes, spec) {
        canvas.draw_line(s.x1, s.y1, s.x2, s.y2, STROKE_WIDTH, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> WaveformSpec {
        WaveformSpec {
            color: Rgb { r: 255, g: 0, b: 70 },
            x: 340.0,
            y: 200.0,
            width: 400.0,
            height: 50.0,
        }
    }

    #[test]
    fn bars_are_centered_and_evenly_spaced() {
        let amplitudes: Vec<f32> = (0..100).map(|i| i as f32 / 100.0).collect();
        let strokes = waveform_strokes(&amplitudes, &spec());
        assert_eq!(strokes.len(), 101);
        assert_eq!(
            strokes[0],
            Stroke { x1: 340.0, y1: 200.0, x2: 740.0, y2: 200.0 }
        );
        for (i, bar) in strokes[1..].iter().enumerate() {
            let a = amplitudes[i];
            assert!((bar.x1 - (340.0 + i as f32 * 4.0)).abs() < 1e-3);
            assert_eq!(bar.x1, bar.x2);
            assert!((bar.y1 - (200.0 - a * 25.0)).abs() < 1e-4);
            assert!((bar.y2 - (200.0 + a * 25.0)).abs() < 1e-4);
        }
    }

    #[test]
    fn no_amplitudes_still_draws_center_line() {
        assert_eq!(waveform_strokes(&[], &spec()).len(), 1);
    }

    #[test]
    fn draws_in_spec_color() {
        let mut canvas = Canvas::transparent(800, 300);
        draw_waveform(&mut canvas, &[1.0; 100], &spec());
        // full-height bar 0 at x=340 spans 175..225
        assert_eq!(canvas.image().get_pixel(340, 176).0, [255, 0, 70, 255]);
        assert_eq!(canvas.image().get_pixel(339, 224).0, [255, 0, 70, 255]);
        assert_eq!(canvas.image().get_pixel(340, 230).0[3], 0);
        // center line
        assert_eq!(canvas.image().get_pixel(600, 199).0, [255, 0, 70, 255]);
    }
}
