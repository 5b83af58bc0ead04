//! Face alignment via 4-DOF similarity transform.
//!
//! Rotates and scales a face so the eyes sit on a horizontal line at fixed
//! fractions of the output size, then resamples it with a bilinear warp.

use image::{Rgb, RgbImage};

/// Canonical left-eye position as a fraction of the output width/height.
/// The right eye mirrors it horizontally.
pub const DESIRED_LEFT_EYE: (f32, f32) = (0.35, 0.35);

/// A 2×3 similarity transform stored as `[a, -b, tx, b, a, ty]`:
/// ```text
/// | a  -b  tx |
/// | b   a  ty |
/// ```
pub type Similarity = [f32; 6];

/// Estimate the similarity transform mapping `src` points onto `dst` points
/// in the least-squares sense. Needs at least two distinct point pairs.
pub fn estimate_similarity_transform(src: &[(f32, f32)], dst: &[(f32, f32)]) -> Similarity {
    // Normal equations for the unknowns [a, b, tx, ty]:
    //   sx * a - sy * b + tx = dx
    //   sy * a + sx * b + ty = dy
    let mut ata = [0.0f32; 16];
    let mut atb = [0.0f32; 4];

    for (&(sx, sy), &(dx, dy)) in src.iter().zip(dst.iter()) {
        let r1 = [sx, -sy, 1.0, 0.0];
        let r2 = [sy, sx, 0.0, 1.0];

        for j in 0..4 {
            for k in 0..4 {
                ata[j * 4 + k] += r1[j] * r1[k] + r2[j] * r2[k];
            }
            atb[j] += r1[j] * dx + r2[j] * dy;
        }
    }

    let [a, b, tx, ty] = solve_4x4(&ata, &atb);
    [a, -b, tx, b, a, ty]
}

/// Gaussian elimination with partial pivoting. A singular system yields
/// the identity scale with no translation.
#[allow(clippy::needless_range_loop)]
fn solve_4x4(ata: &[f32; 16], atb: &[f32; 4]) -> [f32; 4] {
    let mut m = [[0.0f32; 5]; 4];
    for i in 0..4 {
        m[i][..4].copy_from_slice(&ata[i * 4..i * 4 + 4]);
        m[i][4] = atb[i];
    }

    for col in 0..4 {
        let max_row = (col..4)
            .max_by(|&r1, &r2| m[r1][col].abs().total_cmp(&m[r2][col].abs()))
            .unwrap_or(col);
        m.swap(col, max_row);

        let pivot = m[col][col];
        if pivot.abs() < 1e-12 {
            return [1.0, 0.0, 0.0, 0.0];
        }

        for row in (col + 1)..4 {
            let factor = m[row][col] / pivot;
            for j in col..5 {
                m[row][j] -= factor * m[col][j];
            }
        }
    }

    let mut x = [0.0f32; 4];
    for i in (0..4).rev() {
        x[i] = m[i][4];
        for j in (i + 1)..4 {
            x[i] -= m[i][j] * x[j];
        }
        x[i] /= m[i][i];
    }
    x
}

/// Warp `src` through `matrix` into an `out_w` × `out_h` image.
///
/// Each output pixel is mapped back through the inverse transform and
/// sampled bilinearly; samples outside the source are black.
pub fn warp_affine(src: &RgbImage, matrix: &Similarity, out_w: u32, out_h: u32) -> RgbImage {
    let (a, tx) = (matrix[0], matrix[2]);
    let (b, ty) = (matrix[3], matrix[5]);

    let mut output = RgbImage::new(out_w, out_h);

    // M = [[a, -b], [b, a]], det = a^2 + b^2
    let det = a * a + b * b;
    if det.abs() < 1e-12 {
        return output;
    }
    let ia = a / det;
    let ib = b / det;

    let (sw, sh) = (src.width() as i64, src.height() as i64);
    let sample = |x: i64, y: i64, c: usize| -> f32 {
        if x >= 0 && x < sw && y >= 0 && y < sh {
            src.get_pixel(x as u32, y as u32)[c] as f32
        } else {
            0.0
        }
    };

    for (ox, oy, px) in output.enumerate_pixels_mut() {
        let dx = ox as f32 - tx;
        let dy = oy as f32 - ty;
        let sx = ia * dx + ib * dy;
        let sy = -ib * dx + ia * dy;

        let x0 = sx.floor() as i64;
        let y0 = sy.floor() as i64;
        let fx = sx - x0 as f32;
        let fy = sy - y0 as f32;

        let mut rgb = [0u8; 3];
        for (c, out) in rgb.iter_mut().enumerate() {
            let val = sample(x0, y0, c) * (1.0 - fx) * (1.0 - fy)
                + sample(x0 + 1, y0, c) * fx * (1.0 - fy)
                + sample(x0, y0 + 1, c) * (1.0 - fx) * fy
                + sample(x0 + 1, y0 + 1, c) * fx * fy;
            *out = val.round().clamp(0.0, 255.0) as u8;
        }
        *px = Rgb(rgb);
    }

    output
}

/// Canonical eye positions for a `width` × `height` aligned face.
pub fn canonical_eyes(width: u32, height: u32) -> [(f32, f32); 2] {
    let (lx, ly) = DESIRED_LEFT_EYE;
    let (w, h) = (width as f32, height as f32);
    [(lx * w, ly * h), ((1.0 - lx) * w, ly * h)]
}

/// Align a face to a square `face_width` crop from its two eye centres.
pub fn align_face(
    img: &RgbImage,
    left_eye: (f32, f32),
    right_eye: (f32, f32),
    face_width: u32,
) -> RgbImage {
    let dst = canonical_eyes(face_width, face_width);
    let matrix = estimate_similarity_transform(&[left_eye, right_eye], &dst);
    warp_affine(img, &matrix, face_width, face_width)
}
