//! Spatially-aware adjustments built on blurs and bilateral grids.
//!
//! Local-contrast filters split the image into a smooth base layer and detail,
//! then rescale the detail:
//!
//! ```text
//! out = clamp(lerp(base, image, 1 + w), −1, 1)
//! ```
//!
//! Highlight and shadow recovery build a luminance mask and soft-light blend it
//! over the image.

use tracing::warn;

use crate::blending::modes::blend_soft_light;
use crate::config::{BilateralParams, FilterParams};
use crate::conversion::{rgb_to_luminance, rgb_to_yuv, yuv_to_rgb};
use crate::error::{PlasmaError, Result};
use crate::image::{Image, Weight};
use crate::sampling::bilateral::bilateral_filter_2d;
use crate::sampling::blur::gaussian_blur_2d;

/// `clamp(base + (1 + w) × (image − base))` with per-pixel weights.
fn amplify_detail(image: &Image, base: &Image, weight: Weight<'_>) -> Result<Image> {
    image.ensure_shape(base.shape(), "amplify_detail")?;
    let mut out = image.clone();
    let width = image.width();
    for n in 0..image.batch() {
        for c in 0..image.channels() {
            let detail = image.plane(n, c);
            let smooth = base.plane(n, c);
            for (i, value) in out.plane_mut(n, c).iter_mut().enumerate() {
                let w = weight.at(n, i / width, i % width);
                *value = (smooth[i] + (1.0 + w) * (detail[i] - smooth[i])).clamp(-1.0, 1.0);
            }
        }
    }
    Ok(out)
}

fn check_tonal_range(tonal_range: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&tonal_range) {
        return Err(PlasmaError::OutOfRange {
            what: "tonal range",
            min: 0.0,
            max: 1.0,
            found: tonal_range,
        });
    }
    Ok(())
}

/// Coarse local contrast. The base layer is a bilateral-filtered luma channel.
pub fn clarity<'a>(
    image: &Image,
    weight: impl Into<Weight<'a>>,
    params: &FilterParams,
) -> Result<Image> {
    let weight = weight.into();
    weight.check(image, "clarity")?;
    let yuv = rgb_to_yuv(image)?;
    let luma = bilateral_filter_2d(&yuv.channel(0)?, &params.clarity, &params.budget)?;
    let chroma = yuv.channel_range(1, 2)?;
    let base = yuv_to_rgb(&Image::concat_channels(&[luma, chroma])?)?;
    amplify_detail(image, &base, weight)
}

/// Shrink the spatial grid so it never exceeds the image resolution.
fn grid_within_image(params: &BilateralParams, image: &Image, op: &str) -> BilateralParams {
    let [depth, gy, gx] = params.grid_size;
    let (h, w) = image.shape().spatial();
    if gy <= h && gx <= w {
        return *params;
    }
    let capped = [depth, gy.min(h).max(1), gx.min(w).max(1)];
    warn!(
        op,
        requested = ?params.grid_size,
        capped = ?capped,
        "bilateral grid larger than image, capping to image size"
    );
    BilateralParams::new(params.kernel_size, capped)
}

/// Fine local contrast. The base layer is a bilateral-filtered RGB image.
pub fn texture<'a>(
    image: &Image,
    weight: impl Into<Weight<'a>>,
    params: &FilterParams,
) -> Result<Image> {
    let weight = weight.into();
    weight.check(image, "texture")?;
    let grid = grid_within_image(&params.texture, image, "texture");
    let base = bilateral_filter_2d(image, &grid, &params.budget)?;
    amplify_detail(image, &base, weight)
}

/// Unsharp masking against a Gaussian base layer.
pub fn sharpen<'a>(
    image: &Image,
    weight: impl Into<Weight<'a>>,
    params: &FilterParams,
) -> Result<Image> {
    let weight = weight.into();
    weight.check(image, "sharpen")?;
    let base = gaussian_blur_2d(image, params.sharpen_kernel)?;
    amplify_detail(image, &base, weight)
}

/// Brighten (positive weight) or recover (negative weight) bright regions.
///
/// ```text
/// mask = clamp(−luma + (1 − tonal_range), −1, 0) × −w
/// ```
pub fn highlights<'a>(
    image: &Image,
    weight: impl Into<Weight<'a>>,
    tonal_range: f32,
) -> Result<Image> {
    let weight = weight.into();
    weight.check(image, "highlights")?;
    check_tonal_range(tonal_range)?;
    let mut mask = rgb_to_luminance(image)?;
    let width = mask.width();
    for n in 0..mask.batch() {
        for (i, m) in mask.plane_mut(n, 0).iter_mut().enumerate() {
            let w = weight.at(n, i / width, i % width);
            *m = (-*m + (1.0 - tonal_range)).clamp(-1.0, 0.0) * -w;
        }
    }
    blend_soft_light(image, &mask)
}

/// Lift (positive weight) or crush (negative weight) dark regions.
///
/// The mask is the bilateral-smoothed inverse luminance, offset by the tonal
/// range. After blending, contrast is raised by `shadow_contrast × |w|`.
pub fn shadows<'a>(
    image: &Image,
    weight: impl Into<Weight<'a>>,
    tonal_range: f32,
    params: &FilterParams,
) -> Result<Image> {
    let weight = weight.into();
    weight.check(image, "shadows")?;
    check_tonal_range(tonal_range)?;
    let inverse = rgb_to_luminance(image)?.map(|v| -v);
    let mut mask = bilateral_filter_2d(&inverse, &params.shadows, &params.budget)?;
    let width = mask.width();
    for n in 0..mask.batch() {
        for (i, m) in mask.plane_mut(n, 0).iter_mut().enumerate() {
            let w = weight.at(n, i / width, i % width);
            *m = (*m - (1.0 - tonal_range)).clamp(0.0, 1.0) * w;
        }
    }
    let mut result = blend_soft_light(image, &mask)?;
    for n in 0..result.batch() {
        for c in 0..result.channels() {
            for (i, v) in result.plane_mut(n, c).iter_mut().enumerate() {
                let w = weight.at(n, i / width, i % width);
                let scale = 1.0 + params.shadow_contrast * w.abs();
                *v = (*v * scale).clamp(-1.0, 1.0);
            }
        }
    }
    Ok(result)
}
