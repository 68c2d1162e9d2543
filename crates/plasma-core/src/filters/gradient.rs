//! Gradient masks for graduated and radial adjustments.
//!
//! Every mask is `(N, 1, H, W)` in `[0, 1]`, sized after the image it will
//! modulate.

use serde::{Deserialize, Serialize};

use crate::error::{PlasmaError, Result};
use crate::image::{Image, Shape};
use crate::sampling::resample::{linspace_at, resize};

fn check_extent(what: &str, value: f32) -> Result<()> {
    if !(value.is_finite() && value > 0.0) {
        return Err(PlasmaError::invalid(format!(
            "gradient {what} must be positive, got {value}"
        )));
    }
    Ok(())
}

/// Radial falloff from the image centre.
///
/// `f = min(1, ‖p‖ / radius)` over `p ∈ [-1, 1]²`, shaped by the smoothstep
/// `2|f|³ − 3|f|² + 1`. The mask is built on a square of side `min(H, W)`
/// and stretched to the image.
pub fn radial_gradient(image: &Image, radius: f32) -> Result<Image> {
    check_extent("radius", radius)?;
    let shape = image.shape();
    let extent = shape.height.min(shape.width);
    if extent == 0 {
        return Ok(Image::zeros(shape.with_channels(1)));
    }
    let square = Image::from_fn(Shape::new(shape.batch, 1, extent, extent), |_, _, y, x| {
        let (py, px) = (linspace_at(y, extent), linspace_at(x, extent));
        let f = ((py * py + px * px).sqrt() / radius).min(1.0);
        2.0 * f.powi(3) - 3.0 * f.powi(2) + 1.0
    });
    resize(&square, shape.spatial(), false)
}

/// Edge a linear gradient starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradientDirection {
    TopBottom,
    BottomTop,
    LeftRight,
    RightLeft,
}

/// `t ∈ [0, 1]` along an axis of `len` samples.
fn ramp(i: usize, len: usize) -> f32 {
    if len > 1 {
        i as f32 / (len - 1) as f32
    } else {
        0.0
    }
}

/// Linear falloff `1 − min(1, t / length)` where `t` runs from 0 at the
/// starting edge to 1 at the opposite edge.
pub fn linear_gradient(image: &Image, direction: GradientDirection, length: f32) -> Result<Image> {
    check_extent("length", length)?;
    let shape = image.shape().with_channels(1);
    let (h, w) = shape.spatial();
    Ok(Image::from_fn(shape, |_, _, y, x| {
        let t = match direction {
            GradientDirection::TopBottom => ramp(y, h),
            GradientDirection::BottomTop => 1.0 - ramp(y, h),
            GradientDirection::LeftRight => ramp(x, w),
            GradientDirection::RightLeft => 1.0 - ramp(x, w),
        };
        1.0 - (t / length).min(1.0)
    }))
}

pub fn top_bottom_gradient(image: &Image, length: f32) -> Result<Image> {
    linear_gradient(image, GradientDirection::TopBottom, length)
}

pub fn bottom_top_gradient(image: &Image, length: f32) -> Result<Image> {
    linear_gradient(image, GradientDirection::BottomTop, length)
}

pub fn left_right_gradient(image: &Image, length: f32) -> Result<Image> {
    linear_gradient(image, GradientDirection::LeftRight, length)
}

pub fn right_left_gradient(image: &Image, length: f32) -> Result<Image> {
    linear_gradient(image, GradientDirection::RightLeft, length)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn test_radial_gradient_peaks_at_centre() {
        let image = Image::zeros(Shape::new(2, 3, 21, 31));
        let mask = radial_gradient(&image, 0.8).unwrap();
        assert_eq!(mask.shape(), Shape::new(2, 1, 21, 31));
        let centre = mask.get(0, 0, 10, 15);
        assert!(centre > 0.95, "centre {centre}");
        assert!(mask.get(1, 0, 0, 0).abs() < EPSILON);
        let (lo, hi) = mask.min_max().unwrap();
        assert!(lo >= -EPSILON && hi <= 1.0 + EPSILON);
    }

    #[test]
    fn test_top_bottom_ramp() {
        let image = Image::zeros(Shape::new(1, 3, 5, 2));
        let mask = top_bottom_gradient(&image, 0.5).unwrap();
        assert!((mask.get(0, 0, 0, 1) - 1.0).abs() < EPSILON);
        assert!((mask.get(0, 0, 1, 0) - 0.5).abs() < EPSILON);
        assert!(mask.get(0, 0, 2, 0).abs() < EPSILON);
        assert!(mask.get(0, 0, 4, 0).abs() < EPSILON);
    }

    #[test]
    fn test_opposite_directions_mirror() {
        let image = Image::zeros(Shape::new(1, 1, 3, 7));
        let lr = left_right_gradient(&image, 1.0).unwrap();
        let rl = right_left_gradient(&image, 1.0).unwrap();
        let bt = bottom_top_gradient(&image, 1.0).unwrap();
        for x in 0..7 {
            assert!((lr.get(0, 0, 1, x) - rl.get(0, 0, 1, 6 - x)).abs() < EPSILON);
        }
        assert!((bt.get(0, 0, 2, 3) - 1.0).abs() < EPSILON);
        assert!(bt.get(0, 0, 0, 3).abs() < EPSILON);
    }

    #[test]
    fn test_non_positive_length_is_rejected() {
        let image = Image::zeros(Shape::new(1, 1, 3, 3));
        assert!(top_bottom_gradient(&image, 0.0).is_err());
        assert!(radial_gradient(&image, -1.0).is_err());
    }
}
