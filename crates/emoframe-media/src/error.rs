//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found: {0}")]
    FfmpegNotFound(String),

    #[error("invalid frame rate `{0}`: expected a positive number or fraction such as 4, 2.5 or 30000/1001")]
    InvalidFrameRate(String),

    #[error("failed to spawn decoder for {}: {source}", video.display())]
    Spawn {
        video: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Discover(#[from] emoframe_core::discover::DiscoverError),

    #[error(transparent)]
    Layout(#[from] emoframe_core::layout::LayoutError),
}
