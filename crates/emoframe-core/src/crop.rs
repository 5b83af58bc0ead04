//! Resize and crop helpers for face images.

use crate::types::BoundingBox;
use image::imageops::{self, FilterType};
use image::RgbImage;

/// Integer pixel rectangle inside an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Resize to `width` pixels wide, scaling height to keep the aspect ratio.
pub fn resize_to_width(img: &RgbImage, width: u32) -> RgbImage {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 || width == 0 {
        return img.clone();
    }
    let height = ((h as f64 * width as f64 / w as f64).round() as u32).max(1);
    if (w, h) == (width, height) {
        return img.clone();
    }
    imageops::resize(img, width, height, FilterType::Triangle)
}

/// Round a detection to whole pixels and clamp it to a `width` × `height` image.
///
/// Returns `None` when nothing of the box is left inside the image.
pub fn clamp_box(face: &BoundingBox, width: u32, height: u32) -> Option<PixelRect> {
    let x0 = face.x.round().clamp(0.0, width as f32) as u32;
    let y0 = face.y.round().clamp(0.0, height as f32) as u32;
    let x1 = (face.x + face.width).round().clamp(0.0, width as f32) as u32;
    let y1 = (face.y + face.height).round().clamp(0.0, height as f32) as u32;

    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    Some(PixelRect {
        x: x0,
        y: y0,
        width: x1 - x0,
        height: y1 - y0,
    })
}

/// Cut the detected face out of `img` and scale it to `face_width`.
pub fn crop_face(img: &RgbImage, face: &BoundingBox, face_width: u32) -> Option<RgbImage> {
    let rect = clamp_box(face, img.width(), img.height())?;
    let roi = imageops::crop_imm(img, rect.x, rect.y, rect.width, rect.height).to_image();
    Some(resize_to_width(&roi, face_width))
}
