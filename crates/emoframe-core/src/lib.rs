//! emoframe-core — face extraction for emotion-recognition frame datasets.
//!
//! Detects faces with SCRFD via ONNX Runtime, optionally aligns them with a
//! similarity transform, and writes crops into a tree mirroring the input.

pub mod alignment;
pub mod crop;
pub mod detector;
pub mod discover;
pub mod extractor;
pub mod layout;
pub mod observer;
pub mod types;

pub use detector::{Detector, ScrfdDetector};
pub use discover::Scan;
pub use extractor::{FaceConfig, FaceExtractor, FaceReport};
pub use layout::{LayoutStrategy, TreeMapper};
pub use observer::{DebugWriter, FaceObserver};
pub use types::{BoundingBox, FaceSelection};
