//! Gaussian and Laplacian pyramids and Burt–Adelson multi-band blending.
//!
//! Every level is resized to an explicit target size, so odd dimensions
//! collapse back to exactly the input size. Level `i + 1` has side
//! `max(1, side_i / 2)`.

use rayon::prelude::*;
use tracing::debug;

use crate::error::{PlasmaError, Result};
use crate::image::Image;
use crate::sampling::resample::resize;

#[inline]
fn half(side: usize) -> usize {
    (side / 2).max(1)
}

/// Deepest pyramid supported by an `height × width` image: `floor(log2(min side))`, at least 1.
pub fn max_pyramid_levels(height: usize, width: usize) -> usize {
    (height.min(width).max(1).ilog2() as usize).max(1)
}

fn check_levels(image: &Image, levels: usize) -> Result<()> {
    let (h, w) = image.shape().spatial();
    let max = max_pyramid_levels(h, w);
    if levels == 0 || levels > max {
        return Err(PlasmaError::PyramidDepth {
            requested: levels,
            max,
        });
    }
    Ok(())
}

/// Number of levels whose coarsest level still has a side of at least `peak_level`.
///
/// Always at least 1 and never more than [`max_pyramid_levels`].
pub fn pyramid_depth(height: usize, width: usize, peak_level: usize) -> Result<usize> {
    if peak_level == 0 {
        return Err(PlasmaError::invalid("peak level must be at least 1"));
    }
    let max = max_pyramid_levels(height, width);
    let (mut h, mut w) = (height, width);
    let mut levels = 1;
    while levels < max && half(h).min(half(w)) >= peak_level {
        h = half(h);
        w = half(w);
        levels += 1;
    }
    Ok(levels)
}

/// Successive low-pass octaves. Level 0 is `image` itself.
pub fn gaussian_pyramid(image: &Image, levels: usize) -> Result<Vec<Image>> {
    check_levels(image, levels)?;
    let mut pyramid = Vec::with_capacity(levels);
    pyramid.push(image.clone());
    for i in 1..levels {
        let prev = &pyramid[i - 1];
        let (h, w) = prev.shape().spatial();
        let next = resize(prev, (half(h), half(w)), false)?;
        pyramid.push(next);
    }
    Ok(pyramid)
}

/// Band-pass residuals. The last level is the coarsest Gaussian level.
pub fn laplacian_pyramid(image: &Image, levels: usize) -> Result<Vec<Image>> {
    let gaussian = gaussian_pyramid(image, levels)?;
    let mut pyramid = Vec::with_capacity(levels);
    for pair in gaussian.windows(2) {
        let (fine, coarse) = (&pair[0], &pair[1]);
        let up = resize(coarse, fine.shape().spatial(), false)?;
        pyramid.push(fine.zip_map(&up, "laplacian_pyramid", |a, b| a - b)?);
    }
    if let Some(last) = gaussian.into_iter().last() {
        pyramid.push(last);
    }
    Ok(pyramid)
}

/// Rebuild an image from its Laplacian pyramid, coarse to fine.
pub fn collapse_pyramid(levels: &[Image]) -> Result<Image> {
    let (coarsest, finer) = levels
        .split_last()
        .ok_or_else(|| PlasmaError::invalid("cannot collapse an empty pyramid"))?;
    finer.iter().rev().try_fold(coarsest.clone(), |acc, level| {
        let up = resize(&acc, level.shape().spatial(), false)?;
        level.zip_map(&up, "collapse_pyramid", |a, b| a + b)
    })
}

fn accumulate(acc: &mut [Image], part: &[Image]) {
    for (sum, level) in acc.iter_mut().zip(part) {
        for (s, v) in sum.data_mut().iter_mut().zip(level.data()) {
            *s += v;
        }
    }
}

/// Blend a stack of RGB exposures with per-pixel weights (Burt & Adelson, 1983).
///
/// `exposures` is `(N, 3M, H, W)`, `weights` is `(N, M, H, W)` in `[0, 1]`.
/// The pyramid is as deep as possible while its coarsest level keeps a side of
/// at least `peak_level`. Returns `(N, 3, H, W)`.
pub fn blend_pyramid(exposures: &Image, weights: &Image, peak_level: usize) -> Result<Image> {
    let es = exposures.shape();
    let ws = weights.shape();
    if ws.channels == 0 || es != ws.with_channels(3 * ws.channels) {
        return Err(PlasmaError::shape(
            "blend_pyramid",
            format!("exposures {} for weights {ws}", ws.with_channels(3 * ws.channels)),
            es,
        ));
    }
    weights.ensure_range("blend weights", 0.0, 1.0)?;

    let levels = pyramid_depth(es.height, es.width, peak_level)?;
    debug!(
        exposures = ws.channels,
        levels,
        height = es.height,
        width = es.width,
        "blending pyramid"
    );

    let images = exposures.split_channels(3)?;
    let maps = weights.split_channels(1)?;
    let blended: Vec<Vec<Image>> = images
        .par_iter()
        .zip(maps.par_iter())
        .map(|(image, map)| -> Result<Vec<Image>> {
            let bands = laplacian_pyramid(image, levels)?;
            let masks = gaussian_pyramid(map, levels)?;
            bands
                .iter()
                .zip(&masks)
                .map(|(band, mask)| band.zip_broadcast(mask, "blend_pyramid", |a, b| a * b))
                .collect()
        })
        .collect::<Result<_>>()?;

    let mut parts = blended.into_iter();
    let mut sum = parts
        .next()
        .ok_or_else(|| PlasmaError::invalid("blend_pyramid needs at least one exposure"))?;
    for part in parts {
        accumulate(&mut sum, &part);
    }
    collapse_pyramid(&sum)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::Shape;

    const EPSILON: f32 = 1e-4;

    fn pattern(h: usize, w: usize) -> Image {
        Image::from_fn(Shape::new(1, 3, h, w), |_, c, y, x| {
            ((x * 7 + y * 3 + c * 11) as f32 * 0.37).sin() * 0.8
        })
    }

    #[test]
    fn test_max_levels_follow_shorter_side() {
        assert_eq!(max_pyramid_levels(64, 100), 6);
        assert_eq!(max_pyramid_levels(7, 9), 2);
        assert_eq!(max_pyramid_levels(1, 1), 1);
    }

    #[test]
    fn test_gaussian_pyramid_halves_odd_sizes() {
        let pyramid = gaussian_pyramid(&pattern(33, 17), 4).unwrap();
        let sizes: Vec<_> = pyramid.iter().map(|l| l.shape().spatial()).collect();
        assert_eq!(sizes, vec![(33, 17), (16, 8), (8, 4), (4, 2)]);
    }

    #[test]
    fn test_over_deep_pyramid_fails_fast() {
        let err = laplacian_pyramid(&pattern(16, 16), 5);
        assert!(matches!(
            err,
            Err(PlasmaError::PyramidDepth { requested: 5, max: 4 })
        ));
        assert!(gaussian_pyramid(&pattern(16, 16), 0).is_err());
    }

    #[test]
    fn test_collapse_inverts_laplacian() {
        let image = pattern(21, 30);
        let bands = laplacian_pyramid(&image, 4).unwrap();
        let back = collapse_pyramid(&bands).unwrap();
        let mae = back.mean_abs_diff(&image).unwrap();
        assert!(mae < 1e-5, "mae {mae}");
    }

    #[test]
    fn test_pyramid_depth_respects_peak_level() {
        assert_eq!(pyramid_depth(64, 64, 8).unwrap(), 4);
        assert_eq!(pyramid_depth(64, 64, 1).unwrap(), 6);
        assert_eq!(pyramid_depth(5, 5, 8).unwrap(), 1);
        assert!(pyramid_depth(64, 64, 0).is_err());
    }

    #[test]
    fn test_blend_with_unit_weight_is_identity() {
        let image = pattern(24, 20);
        let weights = Image::filled(Shape::new(1, 1, 24, 20), 1.0);
        let out = blend_pyramid(&image, &weights, 2).unwrap();
        assert!(out.mean_abs_diff(&image).unwrap() < EPSILON);
    }

    #[test]
    fn test_blend_rejects_mismatched_stacks() {
        let exposures = Image::zeros(Shape::new(1, 6, 8, 8));
        let weights = Image::zeros(Shape::new(1, 3, 8, 8));
        assert!(matches!(
            blend_pyramid(&exposures, &weights, 2),
            Err(PlasmaError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_blend_rejects_weights_outside_unit_range() {
        let exposures = Image::zeros(Shape::new(1, 3, 8, 8));
        let weights = Image::filled(Shape::new(1, 1, 8, 8), 1.5);
        assert!(matches!(
            blend_pyramid(&exposures, &weights, 2),
            Err(PlasmaError::OutOfRange { .. })
        ));
    }
}
