pub mod audio;
pub mod config;
pub mod encode;
pub mod error;
pub mod jobs;
pub mod pipeline;
pub mod render;
pub mod text;

pub use error::{RenderError, Result};
pub use jobs::{JobStore, MemoryJobStore, ProgressSink, Step};
pub use pipeline::{render_job, PipelineOptions, RenderJob, TextPlacements};
