//! Exposure fusion (Mertens, Kautz & Van Reeth, 2009).
//!
//! Each exposure gets a per-pixel quality weight from three criteria, each
//! raised to its own exponent:
//!
//! ```text
//! contrast    |LoG(luma)|
//! exposure    Π_c exp(−(x_c − mean)² / 2σ²)
//! saturation  std(r, g, b)          (unbiased)
//! W = contrast^ω_c × exposure^ω_e × saturation^ω_s
//! ```
//!
//! Weights are normalized across exposures and handed to the pyramid blender.

use rayon::prelude::*;
use tracing::debug;

use crate::blending::pyramid::blend_pyramid;
use crate::config::FusionParams;
use crate::conversion::rgb_to_luminance;
use crate::error::{PlasmaError, Result};
use crate::filters::laplacian::{DEFAULT_LOG_KERNEL, laplacian_of_gaussian};
use crate::image::Image;

/// Well-exposedness: a Gaussian around `mean`, multiplied across channels.
///
/// Returns `(N, 1, H, W)`.
pub fn exposure_weight(exposure: &Image, mean: f32, sigma: f32) -> Result<Image> {
    exposure.ensure_channels(3, "exposure_weight")?;
    if !(sigma.is_finite() && sigma > 0.0) {
        return Err(PlasmaError::invalid(format!(
            "exposure sigma must be positive, got {sigma}"
        )));
    }
    let denom = 2.0 * sigma * sigma;
    let shape = exposure.shape().with_channels(1);
    let mut out = Image::filled(shape, 1.0);
    for n in 0..shape.batch {
        for c in 0..3 {
            let src = exposure.plane(n, c);
            for (w, &x) in out.plane_mut(n, 0).iter_mut().zip(src) {
                *w *= (-(x - mean).powi(2) / denom).exp();
            }
        }
    }
    Ok(out)
}

/// Per-pixel unbiased standard deviation across the three color channels.
pub fn saturation_weight(exposure: &Image) -> Result<Image> {
    exposure.ensure_channels(3, "saturation_weight")?;
    let shape = exposure.shape().with_channels(1);
    let mut out = Image::zeros(shape);
    for n in 0..shape.batch {
        let (r, g, b) = (exposure.plane(n, 0), exposure.plane(n, 1), exposure.plane(n, 2));
        for (i, w) in out.plane_mut(n, 0).iter_mut().enumerate() {
            let mean = (r[i] + g[i] + b[i]) / 3.0;
            let var = ((r[i] - mean).powi(2) + (g[i] - mean).powi(2) + (b[i] - mean).powi(2)) / 2.0;
            *w = var.sqrt();
        }
    }
    Ok(out)
}

/// Absolute Laplacian-of-Gaussian response of the luminance.
pub fn contrast_weight(exposure: &Image) -> Result<Image> {
    let luma = rgb_to_luminance(exposure)?;
    Ok(laplacian_of_gaussian(&luma, DEFAULT_LOG_KERNEL)?.map(f32::abs))
}

fn check_omega(what: &'static str, omega: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&omega) {
        return Err(PlasmaError::OutOfRange {
            what,
            min: 0.0,
            max: 1.0,
            found: omega,
        });
    }
    Ok(())
}

/// Combined, unnormalized quality weight of one exposure.
fn quality_weight(exposure: &Image, params: &FusionParams) -> Result<Image> {
    let raise = |weight: Image, factor: Image, omega: f32| {
        weight.zip_map(&factor, "quality_weight", |w, f| w * f.powf(omega))
    };
    // x^0 = 1, so a zero exponent drops its criterion.
    let mut weight = Image::filled(exposure.shape().with_channels(1), 1.0);
    if params.omega_contrast > 0.0 {
        weight = raise(weight, contrast_weight(exposure)?, params.omega_contrast)?;
    }
    if params.omega_exposure > 0.0 {
        let factor = exposure_weight(exposure, params.exposure_mean, params.exposure_sigma)?;
        weight = raise(weight, factor, params.omega_exposure)?;
    }
    if params.omega_saturation > 0.0 {
        weight = raise(weight, saturation_weight(exposure)?, params.omega_saturation)?;
    }
    Ok(weight)
}

/// Normalize an `(N, M, H, W)` weight stack so every pixel sums to 1.
///
/// ```text
/// w'_m = (w_m + ε) / (Σ_k w_k + M × ε)
/// ```
///
/// Pixels where every weight is zero become uniform.
pub fn normalize_weights(weights: &Image, epsilon: f32) -> Result<Image> {
    if !(epsilon.is_finite() && epsilon > 0.0) {
        return Err(PlasmaError::invalid(format!(
            "normalization epsilon must be positive, got {epsilon}"
        )));
    }
    weights.ensure_range("fusion weights", 0.0, f32::INFINITY)?;
    let shape = weights.shape();
    let m = shape.channels;
    let plane = shape.plane_len();
    let mut out = weights.clone();
    for n in 0..shape.batch {
        for i in 0..plane {
            let total: f32 = (0..m).map(|c| weights.plane(n, c)[i]).sum();
            let denom = total + m as f32 * epsilon;
            for c in 0..m {
                let w = &mut out.plane_mut(n, c)[i];
                *w = (*w + epsilon) / denom;
            }
        }
    }
    Ok(out)
}

fn check_stack(exposures: &Image) -> Result<()> {
    let channels = exposures.channels();
    if channels == 0 || channels % 3 != 0 {
        return Err(PlasmaError::shape(
            "exposure_fusion",
            "(N, 3M, H, W) with M ≥ 1",
            exposures.shape(),
        ));
    }
    exposures.ensure_range("exposures", -1.0, 1.0)
}

/// Normalized fusion weights for an `(N, 3M, H, W)` exposure stack, as `(N, M, H, W)`.
pub fn fusion_weights(exposures: &Image, params: &FusionParams) -> Result<Image> {
    check_stack(exposures)?;
    check_omega("contrast exponent", params.omega_contrast)?;
    check_omega("exposure exponent", params.omega_exposure)?;
    check_omega("saturation exponent", params.omega_saturation)?;

    let images = exposures.split_channels(3)?;
    let raw: Vec<Image> = images
        .par_iter()
        .map(|exposure| quality_weight(exposure, params))
        .collect::<Result<_>>()?;
    normalize_weights(&Image::concat_channels(&raw)?, params.epsilon)
}

/// Fuse an `(N, 3M, H, W)` exposure stack into one `(N, 3, H, W)` image.
pub fn exposure_fusion(exposures: &Image, params: &FusionParams) -> Result<Image> {
    let weights = fusion_weights(exposures, params)?;
    debug!(
        exposures = weights.channels(),
        peak_level = params.peak_level,
        "fusing exposures"
    );
    blend_pyramid(exposures, &weights, params.peak_level)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::Shape;

    const EPSILON: f32 = 1e-6;

    fn stack(values: &[f32], h: usize, w: usize) -> Image {
        let parts: Vec<Image> = values
            .iter()
            .map(|&v| Image::filled(Shape::new(1, 3, h, w), v))
            .collect();
        Image::concat_channels(&parts).unwrap()
    }

    #[test]
    fn test_exposure_weight_peaks_at_mean() {
        let image = stack(&[0.0], 1, 1);
        let w = exposure_weight(&image, 0.0, 0.5).unwrap();
        assert!((w.get(0, 0, 0, 0) - 1.0).abs() < EPSILON);
        let dark = exposure_weight(&stack(&[-0.5], 1, 1), 0.0, 0.5).unwrap();
        // exp(−0.25 / 0.5)³ = exp(−1.5)
        assert!((dark.get(0, 0, 0, 0) - (-1.5f32).exp()).abs() < 1e-5);
    }

    #[test]
    fn test_saturation_weight_is_unbiased_std() {
        let image = Image::from_fn(Shape::new(1, 3, 1, 1), |_, c, _, _| c as f32 * 0.5 - 0.5);
        let w = saturation_weight(&image).unwrap();
        assert!((w.get(0, 0, 0, 0) - 0.5).abs() < EPSILON);
        let gray = saturation_weight(&stack(&[0.3], 1, 1)).unwrap();
        assert!(gray.get(0, 0, 0, 0).abs() < EPSILON);
    }

    #[test]
    fn test_normalized_weights_sum_to_one_even_when_all_zero() {
        let weights = Image::from_fn(Shape::new(1, 3, 2, 2), |_, c, y, x| {
            if y == 0 && x == 0 { 0.0 } else { (c + 1) as f32 * 0.1 }
        });
        let norm = normalize_weights(&weights, 1e-8).unwrap();
        for y in 0..2 {
            for x in 0..2 {
                let total: f32 = (0..3).map(|c| norm.get(0, c, y, x)).sum();
                assert!((total - 1.0).abs() < 1e-6, "({y}, {x}) sums to {total}");
            }
        }
        assert!((norm.get(0, 1, 0, 0) - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_omega_outside_unit_range_is_rejected() {
        let params = FusionParams {
            omega_exposure: 1.5,
            ..FusionParams::default()
        };
        assert!(matches!(
            fusion_weights(&stack(&[0.0, 0.5], 4, 4), &params),
            Err(PlasmaError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_stack_must_hold_whole_rgb_triplets() {
        let image = Image::zeros(Shape::new(1, 4, 4, 4));
        assert!(matches!(
            fusion_weights(&image, &FusionParams::default()),
            Err(PlasmaError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_contrast_criterion_prefers_detail() {
        let flat = Image::filled(Shape::new(1, 3, 8, 8), 0.0);
        let checker = Image::from_fn(Shape::new(1, 3, 8, 8), |_, _, y, x| {
            if (x + y) % 2 == 0 { 0.4 } else { -0.4 }
        });
        let params = FusionParams {
            omega_contrast: 1.0,
            omega_exposure: 0.0,
            omega_saturation: 0.0,
            ..FusionParams::default()
        };
        let weights = fusion_weights(&Image::concat_channels(&[flat, checker]).unwrap(), &params)
            .unwrap();
        assert!(weights.get(0, 1, 4, 4) > 0.99);
    }
}
