//! emoframe-media — FFmpeg wrapper and the video-to-frames job.
//!
//! Every video is decoded by one single-threaded FFmpeg process at a time.

pub mod dataset;
pub mod decoder;
pub mod error;
pub mod frames;

pub use dataset::{Dataset, FramePlan};
pub use decoder::{DecodeStatus, Ffmpeg, FrameDecoder, FrameRate};
pub use error::{MediaError, MediaResult};
pub use frames::{FrameExtractor, FrameReport};
