//! Whole-pipeline properties of the pyramid, fusion and bilateral operators.

use plasma_core::blending::{blend_pyramid, collapse_pyramid, laplacian_pyramid};
use plasma_core::fusion::{exposure_fusion, fusion_weights};
use plasma_core::sampling::{gaussian_blur_2d, resize};
use plasma_core::{BilateralParams, FusionParams, GridBudget, Image, Shape, bilateral_filter_2d};

fn textured(h: usize, w: usize) -> Image {
    Image::from_fn(Shape::new(1, 3, h, w), |_, c, y, x| {
        ((x as f32 * 0.7 + y as f32 * 1.3 + c as f32).sin() * 0.8).clamp(-1.0, 1.0)
    })
}

fn stack(values: &[f32], h: usize, w: usize) -> Image {
    let parts: Vec<Image> = values
        .iter()
        .map(|&v| Image::filled(Shape::new(1, 3, h, w), v))
        .collect();
    Image::concat_channels(&parts).unwrap()
}

#[test]
fn test_pyramid_round_trip_on_odd_sizes() {
    for (h, w) in [(37, 53), (17, 9), (64, 31)] {
        let image = textured(h, w);
        let levels = plasma_core::blending::max_pyramid_levels(h, w);
        let bands = laplacian_pyramid(&image, levels).unwrap();
        let rebuilt = collapse_pyramid(&bands).unwrap();
        assert_eq!(rebuilt.shape(), image.shape());
        let err = rebuilt.mean_abs_diff(&image).unwrap();
        assert!(err < 1e-3, "{h}x{w}: mean error {err}");
    }
}

#[test]
fn test_single_exposure_with_unit_weight_is_unchanged() {
    let image = textured(33, 40);
    let ones = Image::filled(Shape::new(1, 1, 33, 40), 1.0);
    let out = blend_pyramid(&image, &ones, 2).unwrap();
    assert!(out.mean_abs_diff(&image).unwrap() < 1e-4);
}

#[test]
fn test_fusion_weights_sum_to_one_including_black_pixels() {
    let dark = Image::filled(Shape::new(1, 3, 8, 8), -1.0);
    let parts = [dark.clone(), dark, textured(8, 8)];
    let exposures = Image::concat_channels(&parts).unwrap();
    let weights = fusion_weights(&exposures, &FusionParams::default()).unwrap();
    for y in 0..8 {
        for x in 0..8 {
            let total: f32 = (0..3).map(|m| weights.get(0, m, y, x)).sum();
            assert!((total - 1.0).abs() < 1e-5, "({y}, {x}) sums to {total}");
        }
    }
}

#[test]
fn test_middle_exposure_dominates() {
    let exposures = stack(&[-0.6, 0.0, 0.6], 16, 16);
    let params = FusionParams {
        omega_contrast: 0.0,
        omega_exposure: 1.0,
        omega_saturation: 0.0,
        ..FusionParams::default()
    };
    let weights = fusion_weights(&exposures, &params).unwrap();
    let (under, middle, over) = (
        weights.get(0, 0, 8, 8),
        weights.get(0, 1, 8, 8),
        weights.get(0, 2, 8, 8),
    );
    assert!(middle > under && middle > over);

    let fused = exposure_fusion(&exposures, &params).unwrap();
    let candidates = exposures.split_channels(3).unwrap();
    let errors: Vec<f32> = candidates
        .iter()
        .map(|c| fused.mean_abs_diff(c).unwrap())
        .collect();
    assert!(errors[1] < errors[0] && errors[1] < errors[2], "{errors:?}");
}

#[test]
fn test_bilateral_keeps_constant_images_flat() {
    let image = Image::filled(Shape::new(1, 3, 24, 24), 0.3);
    let out =
        bilateral_filter_2d(&image, &BilateralParams::default(), &GridBudget::default()).unwrap();
    assert!(out.mean_abs_diff(&image).unwrap() < 1e-4);
}

#[test]
fn test_bilateral_full_resolution_grid_conserves_values() {
    let image = textured(12, 10);
    let params = BilateralParams::new([1, 1], [16, 12, 10]);
    let out = bilateral_filter_2d(&image, &params, &GridBudget::default()).unwrap();
    assert!(out.mean_abs_diff(&image).unwrap() < 1e-4);
}

#[test]
fn test_coarse_grid_with_identity_kernel_matches_down_up_sampling() {
    let (h, w) = (48, 40);
    let ramp = Image::from_fn(Shape::new(1, 1, h, w), |_, _, y, x| {
        (x as f32 / (w - 1) as f32) * 1.6 - 0.8 + y as f32 * 0.01
    });
    for grid in [[16, 12, 10], [8, 24, 20]] {
        let params = BilateralParams::new([1, 1], grid);
        let filtered = bilateral_filter_2d(&ramp, &params, &GridBudget::default()).unwrap();
        let small = resize(&ramp, (grid[1], grid[2]), true).unwrap();
        let down_up = resize(&small, (h, w), true).unwrap();
        let err = filtered.mean_abs_diff(&down_up).unwrap();
        assert!(err < 2e-2, "grid {grid:?}: mean error {err}");
    }
}

#[test]
fn test_step_edge_survives_bilateral_but_not_blur() {
    let step = Image::from_fn(Shape::new(1, 1, 32, 32), |_, _, _, x| {
        if x < 16 { -1.0 } else { 1.0 }
    });
    let params = BilateralParams::new([1, 7], [8, 16, 16]);
    let filtered = bilateral_filter_2d(&step, &params, &GridBudget::default()).unwrap();
    for y in [0, 13, 31] {
        for x in 0..32 {
            let v = filtered.get(0, 0, y, x);
            if x < 16 {
                assert!(v < -0.9, "({y}, {x}) = {v}");
            } else {
                assert!(v > 0.9, "({y}, {x}) = {v}");
            }
        }
    }

    let blurred = gaussian_blur_2d(&step, [15, 15]).unwrap();
    assert!(blurred.get(0, 0, 16, 15) > -0.5);
}
