pub mod canvas;
pub mod compositor;
pub mod fonts;
pub mod frames;
pub mod text;
pub mod waveform;

pub use compositor::{Compositor, TextPlacement};
pub use fonts::FontBook;
pub use frames::FrameWriter;
pub use waveform::WaveformSpec;
