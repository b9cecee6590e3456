pub mod ffmpeg;

pub use ffmpeg::{EncodeRequest, EncoderDriver, EncoderState};
