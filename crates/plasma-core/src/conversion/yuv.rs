//! RGB ↔ YUV conversion with fixed Rec. 709 luma coefficients.
//!
//! RGB is encoded in `[-1, 1]`; YUV has Y in `[0, 1]` and chroma roughly in
//! `[-0.6, 0.6]`. The forward transform first maps RGB to `[0, 1]`:
//!
//! ```text
//! [Y U V]ᵀ = M × ((rgb + 1) / 2)
//! rgb      = clamp(2 × M⁻¹ × [Y U V]ᵀ − 1, −1, 1)
//! ```

use glam::{Mat3, Vec3};

use crate::error::Result;
use crate::image::Image;

/// Forward matrix, row-major.
const RGB_TO_YUV: [[f32; 3]; 3] = [
    [0.2126, 0.7152, 0.0722],
    [-0.09991, -0.33609, 0.436],
    [0.615, -0.55861, -0.05639],
];

/// Inverse matrix, row-major.
const YUV_TO_RGB: [[f32; 3]; 3] = [
    [1.0, 0.0, 1.28033],
    [1.0, -0.21482, -0.38059],
    [1.0, 2.12798, 0.0],
];

fn row_major(rows: &[[f32; 3]; 3]) -> Mat3 {
    Mat3::from_cols_array_2d(rows).transpose()
}

/// Convert one RGB pixel in `[-1, 1]` to YUV.
pub fn rgb_to_yuv_pixel(rgb: [f32; 3]) -> [f32; 3] {
    let unit = (Vec3::from_array(rgb) + Vec3::ONE) * 0.5;
    (row_major(&RGB_TO_YUV) * unit).to_array()
}

/// Convert one YUV pixel back to RGB in `[-1, 1]`.
pub fn yuv_to_rgb_pixel(yuv: [f32; 3]) -> [f32; 3] {
    let unit = row_major(&YUV_TO_RGB) * Vec3::from_array(yuv);
    (unit * 2.0 - Vec3::ONE)
        .clamp(Vec3::splat(-1.0), Vec3::ONE)
        .to_array()
}

/// Apply `f` to every `(c0, c1, c2)` triplet of a 3-channel image.
pub(crate) fn map_triplets(
    image: &Image,
    op: &'static str,
    f: impl Fn([f32; 3]) -> [f32; 3],
) -> Result<Image> {
    image.ensure_channels(3, op)?;
    let mut out = image.clone();
    let plane = image.shape().plane_len();
    let stride = 3 * plane;
    for chunk in out.data_mut().chunks_exact_mut(stride) {
        for i in 0..plane {
            let px = f([chunk[i], chunk[plane + i], chunk[2 * plane + i]]);
            chunk[i] = px[0];
            chunk[plane + i] = px[1];
            chunk[2 * plane + i] = px[2];
        }
    }
    Ok(out)
}

/// Convert an `(N, 3, H, W)` RGB image to YUV.
pub fn rgb_to_yuv(image: &Image) -> Result<Image> {
    let m = row_major(&RGB_TO_YUV);
    map_triplets(image, "rgb_to_yuv", |rgb| {
        (m * ((Vec3::from_array(rgb) + Vec3::ONE) * 0.5)).to_array()
    })
}

/// Convert an `(N, 3, H, W)` YUV image to RGB, clamped to `[-1, 1]`.
pub fn yuv_to_rgb(image: &Image) -> Result<Image> {
    let m = row_major(&YUV_TO_RGB);
    map_triplets(image, "yuv_to_rgb", |yuv| {
        (m * Vec3::from_array(yuv) * 2.0 - Vec3::ONE)
            .clamp(Vec3::splat(-1.0), Vec3::ONE)
            .to_array()
    })
}

/// Rec. 709 luminance of an RGB image, as `(N, 1, H, W)` in `[-1, 1]`.
pub fn rgb_to_luminance(image: &Image) -> Result<Image> {
    image.ensure_channels(3, "rgb_to_luminance")?;
    let luma = RGB_TO_YUV[0];
    let shape = image.shape().with_channels(1);
    let mut data = Vec::with_capacity(shape.len());
    for n in 0..shape.batch {
        let (r, g, b) = (image.plane(n, 0), image.plane(n, 1), image.plane(n, 2));
        data.extend((0..shape.plane_len()).map(|i| {
            let y = luma[0] * (r[i] + 1.0) * 0.5
                + luma[1] * (g[i] + 1.0) * 0.5
                + luma[2] * (b[i] + 1.0) * 0.5;
            y * 2.0 - 1.0
        }));
    }
    Image::from_vec(shape, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::Shape;

    const EPSILON: f32 = 2e-3;

    #[test]
    fn test_yuv_roundtrip_preserves_values() {
        for rgb in [[0.5, -0.3, 0.7], [-1.0, -1.0, -1.0], [1.0, 1.0, 1.0], [0.0, 0.2, -0.9]] {
            let back = yuv_to_rgb_pixel(rgb_to_yuv_pixel(rgb));
            for c in 0..3 {
                assert!(
                    (back[c] - rgb[c]).abs() < EPSILON,
                    "channel {c}: {:.6} vs {:.6}",
                    back[c],
                    rgb[c]
                );
            }
        }
    }

    #[test]
    fn test_gray_has_zero_chroma() {
        let yuv = rgb_to_yuv_pixel([0.2, 0.2, 0.2]);
        assert!((yuv[0] - 0.6).abs() < 1e-4);
        assert!(yuv[1].abs() < 1e-4);
        assert!(yuv[2].abs() < 1e-4);
    }

    #[test]
    fn test_luminance_matches_yuv_luma() {
        let image = Image::from_fn(Shape::new(2, 3, 2, 3), |n, c, y, x| {
            ((n + c + y + x) as f32 * 0.13).sin()
        });
        let luma = rgb_to_luminance(&image).unwrap();
        let yuv = rgb_to_yuv(&image).unwrap();
        assert_eq!(luma.shape(), Shape::new(2, 1, 2, 3));
        for n in 0..2 {
            for y in 0..2 {
                for x in 0..3 {
                    let expected = yuv.get(n, 0, y, x) * 2.0 - 1.0;
                    assert!((luma.get(n, 0, y, x) - expected).abs() < 1e-5);
                }
            }
        }
    }

    #[test]
    fn test_conversion_rejects_non_rgb_input() {
        let image = Image::zeros(Shape::new(1, 1, 2, 2));
        assert!(rgb_to_yuv(&image).is_err());
        assert!(rgb_to_luminance(&image).is_err());
    }
}
