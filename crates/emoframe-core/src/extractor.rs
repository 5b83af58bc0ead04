//! The face extraction batch job.
//!
//! Walks a tree of frame images and writes one face crop per frame that
//! contains a detectable face into a mirrored tree. Frames whose output
//! already exists are skipped before any decoding, so re-runs only touch
//! missing files.

use crate::alignment;
use crate::crop;
use crate::detector::{Detector, DetectorError};
use crate::discover::{DiscoverError, Scan};
use crate::layout::{LayoutError, TreeMapper};
use crate::observer::FaceObserver;
use crate::types::FaceSelection;
use image::RgbImage;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Width frames are resized to before detection.
pub const DEFAULT_WORKING_WIDTH: u32 = 800;
/// Detector upsampling factor.
pub const DEFAULT_UPSAMPLE: u32 = 2;
/// Output face width in pixels.
pub const DEFAULT_FACE_WIDTH: u32 = 224;

#[derive(Error, Debug)]
pub enum FaceJobError {
    #[error(transparent)]
    Discover(#[from] DiscoverError),
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error("detector error on {}: {source}", path.display())]
    Detector {
        path: PathBuf,
        #[source]
        source: DetectorError,
    },
    #[error("failed to read {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to write {}: {source}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to create {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Tunables for face extraction.
#[derive(Debug, Clone)]
pub struct FaceConfig {
    pub face_width: u32,
    pub working_width: u32,
    pub upsample: u32,
    pub align: bool,
    pub selection: FaceSelection,
    pub min_confidence: Option<f32>,
}

impl Default for FaceConfig {
    fn default() -> Self {
        Self {
            face_width: DEFAULT_FACE_WIDTH,
            working_width: DEFAULT_WORKING_WIDTH,
            upsample: DEFAULT_UPSAMPLE,
            align: false,
            selection: FaceSelection::First,
            min_confidence: None,
        }
    }
}

/// What happened to one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaceOutcome {
    Written(PathBuf),
    AlreadyExists,
    NoFace,
}

/// Totals for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FaceReport {
    pub frames: usize,
    pub written: usize,
    pub skipped_existing: usize,
    pub no_face: usize,
}

impl FaceReport {
    fn record(&mut self, outcome: &FaceOutcome) {
        self.frames += 1;
        match outcome {
            FaceOutcome::Written(_) => self.written += 1,
            FaceOutcome::AlreadyExists => self.skipped_existing += 1,
            FaceOutcome::NoFace => self.no_face += 1,
        }
    }
}

/// Extracts one face per frame with a [`Detector`].
pub struct FaceExtractor<D> {
    detector: D,
    config: FaceConfig,
    observer: Box<dyn FaceObserver>,
}

impl<D: Detector> FaceExtractor<D> {
    pub fn new(detector: D, config: FaceConfig) -> Self {
        Self {
            detector,
            config,
            observer: Box::new(()),
        }
    }

    /// Install an observer for intermediate results.
    pub fn with_observer(mut self, observer: Box<dyn FaceObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Process every frame `scan` finds, writing faces where `mapper` says.
    pub fn run(&mut self, scan: &Scan, mapper: &TreeMapper) -> Result<FaceReport, FaceJobError> {
        let frames = scan.collect()?;
        tracing::info!(root = %scan.root.display(), frames = frames.len(), "extracting faces");

        let mut report = FaceReport::default();
        for (i, frame) in frames.iter().enumerate() {
            let dest = mapper.map_file(frame)?;
            let outcome = self.process(frame, &dest)?;
            tracing::debug!(
                item = i + 1,
                total = frames.len(),
                src = %frame.display(),
                ?outcome,
                "frame done"
            );
            report.record(&outcome);
        }

        tracing::info!(
            frames = report.frames,
            written = report.written,
            skipped_existing = report.skipped_existing,
            no_face = report.no_face,
            "face extraction finished"
        );
        Ok(report)
    }

    /// Extract the face from `source` into `dest`.
    pub fn process(&mut self, source: &Path, dest: &Path) -> Result<FaceOutcome, FaceJobError> {
        if dest.exists() {
            tracing::info!(dest = %dest.display(), "found target, skipping");
            return Ok(FaceOutcome::AlreadyExists);
        }

        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|source| FaceJobError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let img = image::open(source)
            .map_err(|e| FaceJobError::Decode {
                path: source.to_path_buf(),
                source: e,
            })?
            .into_rgb8();

        let Some(face) = self.find_best_face(source, &img)? else {
            return Ok(FaceOutcome::NoFace);
        };

        self.observer.on_face(source, &face);
        face.save(dest).map_err(|e| FaceJobError::Encode {
            path: dest.to_path_buf(),
            source: e,
        })?;
        tracing::info!(src = %source.display(), dest = %dest.display(), "saved face");
        Ok(FaceOutcome::Written(dest.to_path_buf()))
    }

    /// Detect, select, crop and optionally align the face in one frame.
    fn find_best_face(&mut self, source: &Path, img: &RgbImage) -> Result<Option<RgbImage>, FaceJobError> {
        let working = crop::resize_to_width(img, self.config.working_width);
        let gray = image::imageops::grayscale(&working);

        let candidates = self
            .detector
            .detect(&gray, self.config.upsample)
            .map_err(|source_err| FaceJobError::Detector {
                path: source.to_path_buf(),
                source: source_err,
            })?;
        self.observer.on_detections(source, &working, &candidates);

        let Some(face) = self
            .config
            .selection
            .select(&candidates, self.config.min_confidence)
        else {
            return Ok(None);
        };

        let Some(mut out) = crop::crop_face(&working, face, self.config.face_width) else {
            tracing::warn!(src = %source.display(), ?face, "face box lies outside the frame, skipping");
            return Ok(None);
        };

        if self.config.align {
            match (face.left_eye(), face.right_eye()) {
                (Some(left), Some(right)) => {
                    out = alignment::align_face(&working, left, right, self.config.face_width);
                }
                _ => tracing::warn!(src = %source.display(), "no landmarks for alignment, keeping plain crop"),
            }
        }

        Ok(Some(out))
    }
}
