//! Per-pixel adjustments (contrast, exposure, saturation, temperature, tint).
//!
//! Every filter takes an RGB image in `[-1, 1]` and a [`Weight`] in `[-1, 1]`,
//! either one scalar or an `(N, 1, H, W)` map. A weight of `0` is the identity.
//! Chroma adjustments run in YUV space:
//!
//! ```text
//! saturation   U, V ×= (w + 1)
//! temperature  U −= 0.1w, V += 0.1w
//! tint         U += 0.1w, V += 0.1w
//! ```

use crate::conversion::yuv::{rgb_to_yuv_pixel, yuv_to_rgb_pixel};
use crate::error::Result;
use crate::image::{Image, Weight};

/// Chroma shift per unit of temperature or tint weight.
const CHROMA_SHIFT: f32 = 0.1;

/// Apply `f(value, weight)` to every element.
fn modulate(
    image: &Image,
    weight: Weight<'_>,
    op: &'static str,
    f: impl Fn(f32, f32) -> f32,
) -> Result<Image> {
    weight.check(image, op)?;
    match weight {
        Weight::Scalar(w) => Ok(image.map(|v| f(v, w))),
        Weight::Map(map) => image.zip_broadcast(map, op, f),
    }
}

/// Apply `f(yuv, weight)` to every pixel in YUV space.
fn adjust_yuv(
    image: &Image,
    weight: Weight<'_>,
    op: &'static str,
    f: impl Fn([f32; 3], f32) -> [f32; 3],
) -> Result<Image> {
    image.ensure_channels(3, op)?;
    weight.check(image, op)?;
    let mut out = image.clone();
    let width = image.width();
    for n in 0..image.batch() {
        for i in 0..image.shape().plane_len() {
            let w = weight.at(n, i / width, i % width);
            let rgb = [
                image.plane(n, 0)[i],
                image.plane(n, 1)[i],
                image.plane(n, 2)[i],
            ];
            let result = yuv_to_rgb_pixel(f(rgb_to_yuv_pixel(rgb), w));
            for (c, value) in result.into_iter().enumerate() {
                out.plane_mut(n, c)[i] = value;
            }
        }
    }
    Ok(out)
}

/// Scale pixel values around mid-gray.
///
/// ```text
/// out = clamp(x × (w + 1), −1, 1)
/// ```
pub fn contrast<'a>(image: &Image, weight: impl Into<Weight<'a>>) -> Result<Image> {
    modulate(image, weight.into(), "contrast", |x, w| {
        (x * (w + 1.0)).clamp(-1.0, 1.0)
    })
}

/// Scale linear brightness.
///
/// ```text
/// out = clamp(2 × ((x + 1) / 2 × (w + 1)) − 1, −1, 1)
/// ```
pub fn exposure<'a>(image: &Image, weight: impl Into<Weight<'a>>) -> Result<Image> {
    modulate(image, weight.into(), "exposure", |x, w| {
        (2.0 * ((x + 1.0) * 0.5 * (w + 1.0)) - 1.0).clamp(-1.0, 1.0)
    })
}

pub fn saturation<'a>(image: &Image, weight: impl Into<Weight<'a>>) -> Result<Image> {
    adjust_yuv(image, weight.into(), "saturation", |[y, u, v], w| {
        [y, u * (w + 1.0), v * (w + 1.0)]
    })
}

/// Warm (positive) or cool (negative) the image.
pub fn temperature<'a>(image: &Image, weight: impl Into<Weight<'a>>) -> Result<Image> {
    adjust_yuv(image, weight.into(), "temperature", |[y, u, v], w| {
        [y, u - CHROMA_SHIFT * w, v + CHROMA_SHIFT * w]
    })
}

/// Shift toward magenta (positive) or green (negative).
pub fn tint<'a>(image: &Image, weight: impl Into<Weight<'a>>) -> Result<Image> {
    adjust_yuv(image, weight.into(), "tint", |[y, u, v], w| {
        [y, u + CHROMA_SHIFT * w, v + CHROMA_SHIFT * w]
    })
}

/// Temperature and tint in one pass.
///
/// `weight` is `(N, 2, H, W)`: channel 0 is temperature, channel 1 is tint.
pub fn color_balance(image: &Image, weight: &Image) -> Result<Image> {
    image.ensure_channels(3, "color_balance")?;
    weight.ensure_shape(image.shape().with_channels(2), "color_balance")?;
    weight.ensure_range("color balance weight", -1.0, 1.0)?;
    let mut out = image.clone();
    for n in 0..image.batch() {
        let (temp, tint) = (weight.plane(n, 0), weight.plane(n, 1));
        for i in 0..image.shape().plane_len() {
            let rgb = [
                image.plane(n, 0)[i],
                image.plane(n, 1)[i],
                image.plane(n, 2)[i],
            ];
            let [y, u, v] = rgb_to_yuv_pixel(rgb);
            let (t, k) = (temp[i], tint[i]);
            let result = yuv_to_rgb_pixel([
                y,
                u - CHROMA_SHIFT * t + CHROMA_SHIFT * k,
                v + CHROMA_SHIFT * t + CHROMA_SHIFT * k,
            ]);
            for (c, value) in result.into_iter().enumerate() {
                out.plane_mut(n, c)[i] = value;
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlasmaError;
    use crate::image::Shape;

    const EPSILON: f32 = 2e-3;

    fn sample() -> Image {
        Image::from_fn(Shape::new(1, 3, 3, 4), |_, c, y, x| {
            ((c * 12 + y * 4 + x) as f32 * 0.61).sin() * 0.7
        })
    }

    #[test]
    fn test_zero_weight_is_identity() {
        let image = sample();
        for out in [
            contrast(&image, 0.0_f32).unwrap(),
            exposure(&image, 0.0_f32).unwrap(),
            saturation(&image, 0.0_f32).unwrap(),
            temperature(&image, 0.0_f32).unwrap(),
            tint(&image, 0.0_f32).unwrap(),
        ] {
            assert!(out.mean_abs_diff(&image).unwrap() < EPSILON);
        }
    }

    #[test]
    fn test_contrast_scales_and_clamps() {
        let image = Image::from_fn(Shape::new(1, 3, 1, 2), |_, _, _, x| {
            if x == 0 { 0.25 } else { 0.8 }
        });
        let out = contrast(&image, 1.0_f32).unwrap();
        assert!((out.get(0, 0, 0, 0) - 0.5).abs() < 1e-6);
        assert_eq!(out.get(0, 1, 0, 1), 1.0);
    }

    #[test]
    fn test_exposure_doubles_linear_brightness() {
        let image = Image::filled(Shape::new(1, 3, 1, 1), -0.5);
        let out = exposure(&image, 1.0_f32).unwrap();
        // (−0.5 + 1) / 2 = 0.25 → 0.5 → 0.0
        assert!(out.get(0, 0, 0, 0).abs() < 1e-6);
    }

    #[test]
    fn test_full_desaturation_gives_gray() {
        let out = saturation(&sample(), -1.0_f32).unwrap();
        for i in 0..12 {
            let (r, g, b) = (out.plane(0, 0)[i], out.plane(0, 1)[i], out.plane(0, 2)[i]);
            assert!((r - g).abs() < EPSILON && (g - b).abs() < EPSILON);
        }
    }

    #[test]
    fn test_temperature_warms_gray() {
        let gray = Image::zeros(Shape::new(1, 3, 1, 1));
        let warm = temperature(&gray, 1.0_f32).unwrap();
        assert!(warm.get(0, 0, 0, 0) > warm.get(0, 2, 0, 0));
    }

    #[test]
    fn test_out_of_range_weight_is_rejected() {
        let image = sample();
        assert!(matches!(
            contrast(&image, 5.0_f32),
            Err(PlasmaError::OutOfRange { .. })
        ));
        assert!(saturation(&image, -2.0_f32).is_err());
        let balance = Image::filled(Shape::new(1, 2, 3, 4), 1.5);
        assert!(color_balance(&image, &balance).is_err());
    }

    #[test]
    fn test_weight_map_modulates_per_pixel() {
        let image = Image::filled(Shape::new(1, 3, 1, 2), 0.25);
        let map = Image::from_fn(Shape::new(1, 1, 1, 2), |_, _, _, x| x as f32);
        let out = contrast(&image, &map).unwrap();
        assert!((out.get(0, 1, 0, 0) - 0.25).abs() < 1e-6);
        assert!((out.get(0, 1, 0, 1) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_color_balance_matches_sequential_filters_on_gray() {
        let gray = Image::zeros(Shape::new(1, 3, 1, 1));
        let weight = Image::from_fn(Shape::new(1, 2, 1, 1), |_, c, _, _| {
            if c == 0 { 0.5 } else { 0.0 }
        });
        let balanced = color_balance(&gray, &weight).unwrap();
        let warm = temperature(&gray, 0.5_f32).unwrap();
        assert!(balanced.mean_abs_diff(&warm).unwrap() < 1e-6);
        assert!(color_balance(&gray, &Image::zeros(Shape::new(1, 1, 1, 1))).is_err());
    }
}
