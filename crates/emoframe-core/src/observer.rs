//! Per-item hooks into the face extraction loop.

use crate::types::BoundingBox;
use image::{Rgb, RgbImage};
use std::path::{Path, PathBuf};

/// Receives intermediate results while faces are extracted.
///
/// Observers see data but cannot change the outcome. Errors are theirs to
/// report; the job never fails because of one.
pub trait FaceObserver {
    /// Called once per processed frame with the working-size image and all candidates.
    fn on_detections(&mut self, _source: &Path, _working: &RgbImage, _faces: &[BoundingBox]) {}

    /// Called with the face image about to be written.
    fn on_face(&mut self, _source: &Path, _face: &RgbImage) {}
}

/// Observer that does nothing.
impl FaceObserver for () {}

const BOX_COLOUR: Rgb<u8> = Rgb([0, 255, 0]);
const LANDMARK_COLOUR: Rgb<u8> = Rgb([255, 0, 0]);

/// Writes annotated working images and face crops to a directory.
///
/// Files are named after the source frame's parent directory and stem, e.g.
/// `clip1_0000005_frame.png` and `clip1_0000005_face.png`.
pub struct DebugWriter {
    dir: PathBuf,
}

impl DebugWriter {
    pub fn new(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn target(&self, source: &Path, suffix: &str) -> PathBuf {
        let stem = source.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
        let parent = source
            .parent()
            .and_then(|p| p.file_name())
            .map(|s| s.to_string_lossy())
            .unwrap_or_default();
        self.dir.join(format!("{parent}_{stem}_{suffix}.png"))
    }

    fn save(&self, img: &RgbImage, path: &Path) {
        if let Err(err) = img.save(path) {
            tracing::warn!(path = %path.display(), error = %err, "debug image write failed");
        }
    }
}

impl FaceObserver for DebugWriter {
    fn on_detections(&mut self, source: &Path, working: &RgbImage, faces: &[BoundingBox]) {
        let mut canvas = working.clone();
        for face in faces {
            draw_box(&mut canvas, face);
        }
        tracing::debug!(source = %source.display(), faces = faces.len(), "debug: detections");
        self.save(&canvas, &self.target(source, "frame"));
    }

    fn on_face(&mut self, source: &Path, face: &RgbImage) {
        self.save(face, &self.target(source, "face"));
    }
}

/// Draw a one-pixel box outline and landmark dots, clipped to the image.
fn draw_box(img: &mut RgbImage, face: &BoundingBox) {
    let (w, h) = (img.width() as i64, img.height() as i64);
    let mut put = |x: i64, y: i64, colour: Rgb<u8>| {
        if x >= 0 && x < w && y >= 0 && y < h {
            img.put_pixel(x as u32, y as u32, colour);
        }
    };

    let x0 = face.x.round() as i64;
    let y0 = face.y.round() as i64;
    let x1 = (face.x + face.width).round() as i64;
    let y1 = (face.y + face.height).round() as i64;

    for x in x0..=x1 {
        put(x, y0, BOX_COLOUR);
        put(x, y1, BOX_COLOUR);
    }
    for y in y0..=y1 {
        put(x0, y, BOX_COLOUR);
        put(x1, y, BOX_COLOUR);
    }

    for &(lx, ly) in face.landmarks.iter().flatten() {
        let (cx, cy) = (lx.round() as i64, ly.round() as i64);
        for dy in -1..=1 {
            for dx in -1..=1 {
                put(cx + dx, cy + dy, LANDMARK_COLOUR);
            }
        }
    }
}
