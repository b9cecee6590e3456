use std::path::PathBuf;
use thiserror::Error;

/// Terminal failures of a render job. Text parsing problems never show up
/// here: they degrade to an empty document inside `text::document`.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to decode audio {path}: {message}")]
    Decode { path: PathBuf, message: String },

    #[error("failed to load template image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("font error: {0}")]
    Font(String),

    #[error("failed to composite frame {frame}: {message}")]
    Composition { frame: usize, message: String },

    #[error("cannot encode: {0}")]
    Validation(String),

    #[error("encoder failed: {0}")]
    Encoder(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RenderError {
    pub(crate) fn decode(path: &std::path::Path, message: impl ToString) -> Self {
        Self::Decode {
            path: path.to_path_buf(),
            message: message.to_string(),
        }
    }

    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub type Result<T, E = RenderError> = std::result::Result<T, E>;
