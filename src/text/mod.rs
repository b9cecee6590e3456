pub mod document;
pub mod layout;

pub use document::{Rgb, Run, StyledTextDocument, TextRun};
pub use layout::{layout, DrawCommand, FontStyle, TextMeasure};
