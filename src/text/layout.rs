use super::document::{Rgb, Run, StyledTextDocument};

pub const LINE_HEIGHT: f32 = 1.2;
/// Distance of the underline stroke below the baseline.
pub const UNDERLINE_OFFSET: f32 = 3.0;
/// Horizontal space taken by an embedded (non-text) insert.
pub const EMBED_WIDTH: f32 = 20.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FontStyle {
    pub size: f32,
    pub bold: bool,
    pub italic: bool,
}

/// Width of a text span in output pixels for a given face and size.
pub trait TextMeasure {
    fn text_width(&self, text: &str, style: &FontStyle) -> f32;
}

/// Positioned draw operation. `y` is the text baseline.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    Text {
        text: String,
        x: f32,
        y: f32,
        style: FontStyle,
        color: Rgb,
    },
    Underline {
        x: f32,
        y: f32,
        width: f32,
        thickness: f32,
        color: Rgb,
    },
}

/// Lay out `doc` starting at the baseline `(origin_x, origin_y)`.
///
/// Only explicit `\n` breaks start a new line; there is no width-based
/// wrapping. The line advance is `1.2 * size` of the run containing the break.
pub fn layout(
    doc: &StyledTextDocument,
    origin_x: f32,
    origin_y: f32,
    measure: &dyn TextMeasure,
) -> Vec<DrawCommand> {
    let mut commands = Vec::new();
    let (mut x, mut y) = (origin_x, origin_y);

    for run in &doc.runs {
        let run = match run {
            Run::Text(run) => run,
            Run::Embed => {
                x += EMBED_WIDTH;
                continue;
            }
        };

        let style = FontStyle {
            size: run.font_size,
            bold: run.bold,
            italic: run.italic,
        };
        let lines: Vec<&str> = run.text.split('\n').collect();
        let last = lines.len() - 1;

        for (i, line) in lines.into_iter().enumerate() {
            let line = line.strip_suffix('\r').unwrap_or(line);
            if !line.is_empty() {
                let width = measure.text_width(line, &style);
                commands.push(DrawCommand::Text {
                    text: line.to_string(),
                    x,
                    y,
                    style,
                    color: run.color,
                });
                if run.underline {
                    commands.push(DrawCommand::Underline {
                        x,
                        y: y + UNDERLINE_OFFSET,
                        width,
                        thickness: (run.font_size / 15.0).max(1.0),
                        color: run.color,
                    });
                }
                x += width;
            }
            if i < last {
                x = origin_x;
                y += run.font_size * LINE_HEIGHT;
            }
        }
    }

    commands
}
