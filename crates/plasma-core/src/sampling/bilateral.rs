//! Bilateral grid: splat → blur → slice over a joint intensity/space volume.
//!
//! Each channel is lifted into an `(I, Sy, Sx)` grid where the depth axis is
//! the guide intensity. Values land in the two intensity bins around
//! `(g + 1) / 2 × (I − 1)` with tent weights, so blurring the grid mixes only
//! pixels that are close both in space and in value. A parallel weight grid
//! records occupancy and is divided out when slicing.

use rayon::prelude::*;
use tracing::debug;

use crate::config::{BilateralParams, GridBudget};
use crate::error::{PlasmaError, Result};
use crate::image::Image;
use crate::sampling::blur::{Kernel1D, KernelKind, blur_3d_in_place};
use crate::sampling::resample::{linspace_at, resize, sample_trilinear, unnormalize};
use crate::volume::{Volume, VolumeShape};

/// Lower bound on the weight used in the homogeneous divide.
pub const WEIGHT_FLOOR: f32 = 1e-3;

/// Two source volumes and two grids are alive at the peak of a splat.
const PEAK_VOLUMES: u64 = 4;

/// Splatted intensity and occupancy volumes of identical shape `(N, C, I, Sy, Sx)`.
#[derive(Debug, Clone, PartialEq)]
pub struct BilateralGrid {
    pub intensity: Volume,
    pub weight: Volume,
}

/// Peak bytes needed to splat `channels` channels into a grid of `grid_size`.
pub fn grid_bytes(batch: usize, channels: usize, grid_size: [usize; 3]) -> u64 {
    let [depth, sy, sx] = grid_size;
    VolumeShape::new(batch, channels, depth, sy, sx)
        .byte_size()
        .saturating_mul(PEAK_VOLUMES)
}

fn check_grid_size(grid_size: [usize; 3]) -> Result<()> {
    if grid_size.contains(&0) {
        return Err(PlasmaError::invalid(format!(
            "grid size must be positive, got {grid_size:?}"
        )));
    }
    Ok(())
}

fn check_budget(requested: u64, budget: &GridBudget) -> Result<()> {
    if requested > budget.max_bytes {
        return Err(PlasmaError::ResourceExhausted {
            requested,
            budget: budget.max_bytes,
        });
    }
    Ok(())
}

/// Lift `input` into a bilateral grid guided by `guide`.
///
/// `input` is `(N, C, H, W)`, `guide` is `(N, 1, H, W)` in `[-1, 1]`.
pub fn splat(
    input: &Image,
    guide: &Image,
    grid_size: [usize; 3],
    budget: &GridBudget,
) -> Result<BilateralGrid> {
    check_grid_size(grid_size)?;
    input.ensure_single_channel_like(guide, "bilateral::splat")?;
    guide.ensure_range("bilateral guide", -1.0, 1.0)?;

    let shape = input.shape();
    let requested = grid_bytes(shape.batch, shape.channels, grid_size);
    check_budget(requested, budget)?;
    debug!(input = %shape, ?grid_size, requested, "splatting bilateral grid");

    let [depth, sy, sx] = grid_size;
    let small = resize(input, (sy, sx), true)?;
    let small_guide = resize(guide, (sy, sx), true)?;

    let vshape = VolumeShape::new(shape.batch, shape.channels, depth, sy, sx);
    let plane = sy * sx;
    let mut source = Volume::try_zeros(vshape)?;
    let mut ones = Volume::try_zeros(vshape)?;
    for n in 0..shape.batch {
        for c in 0..shape.channels {
            source.block_mut(n, c)[..plane].copy_from_slice(small.plane(n, c));
            ones.block_mut(n, c)[..plane].fill(1.0);
        }
    }

    let mut intensity = Volume::try_zeros(vshape)?;
    let mut weight = Volume::try_zeros(vshape)?;
    let dims = (depth, sy, sx);
    let channels = shape.channels;
    intensity
        .data_mut()
        .par_chunks_mut(vshape.block_len())
        .zip(weight.data_mut().par_chunks_mut(vshape.block_len()))
        .enumerate()
        .for_each(|(i, (ib, wb))| {
            let (n, c) = (i / channels, i % channels);
            let src = source.block(n, c);
            let occupancy = ones.block(n, c);
            let g = small_guide.plane(n, 0);
            for k in 0..depth {
                let z_base = linspace_at(k, depth);
                for y in 0..sy {
                    for x in 0..sx {
                        // Spatial axes map grid cells onto themselves.
                        let z = unnormalize(z_base - (g[y * sx + x] + 1.0), depth);
                        let idx = (k * sy + y) * sx + x;
                        ib[idx] = sample_trilinear(src, dims, z, y as f32, x as f32);
                        wb[idx] = sample_trilinear(occupancy, dims, z, y as f32, x as f32);
                    }
                }
            }
        });
    Ok(BilateralGrid { intensity, weight })
}

impl BilateralGrid {
    pub fn shape(&self) -> VolumeShape {
        self.intensity.shape()
    }

    /// Blur both volumes with the same separable kernel `[Ki, Ky, Kx]`.
    pub fn blur(&mut self, kernel_size: [usize; 3], kind: KernelKind) -> Result<()> {
        blur_3d_in_place(&mut self.intensity, kind, kernel_size)?;
        blur_3d_in_place(&mut self.weight, kind, kernel_size)
    }

    /// Slice at full resolution with the homogeneous divide.
    pub fn slice(&self, guide: &Image) -> Result<Image> {
        slice(&self.intensity, guide, Some(&self.weight))
    }
}

/// Read a grid back at full resolution along the guide surface.
///
/// When `weight` is given the result is `intensity / max(weight, WEIGHT_FLOOR)`.
pub fn slice(intensity: &Volume, guide: &Image, weight: Option<&Volume>) -> Result<Image> {
    let vshape = intensity.shape();
    guide.ensure_channels(1, "bilateral::slice")?;
    if guide.batch() != vshape.batch {
        return Err(PlasmaError::shape(
            "bilateral::slice",
            format!("guide batch {}", vshape.batch),
            guide.shape(),
        ));
    }
    if let Some(occupancy) = weight
        && occupancy.shape() != vshape
    {
        return Err(PlasmaError::shape(
            "bilateral::slice",
            vshape,
            occupancy.shape(),
        ));
    }
    guide.ensure_range("bilateral guide", -1.0, 1.0)?;

    let (h, w) = guide.shape().spatial();
    let out_shape = guide.shape().with_channels(vshape.channels);
    let mut out = Image::zeros(out_shape);
    if out_shape.is_empty() {
        return Ok(out);
    }
    let dims = (vshape.depth, vshape.height, vshape.width);
    let ys: Vec<f32> = (0..h)
        .map(|y| unnormalize(linspace_at(y, h), vshape.height))
        .collect();
    let xs: Vec<f32> = (0..w)
        .map(|x| unnormalize(linspace_at(x, w), vshape.width))
        .collect();
    let channels = vshape.channels;
    out.data_mut()
        .par_chunks_mut(h * w)
        .enumerate()
        .for_each(|(i, plane)| {
            let (n, c) = (i / channels, i % channels);
            let values = intensity.block(n, c);
            let occupancy = weight.map(|wv| wv.block(n, c));
            let g = guide.plane(n, 0);
            for y in 0..h {
                for x in 0..w {
                    let z = unnormalize(g[y * w + x], vshape.depth);
                    let v = sample_trilinear(values, dims, z, ys[y], xs[x]);
                    plane[y * w + x] = match occupancy {
                        Some(o) => v / sample_trilinear(o, dims, z, ys[y], xs[x]).max(WEIGHT_FLOOR),
                        None => v,
                    };
                }
            }
        });
    Ok(out)
}

/// Edge-preserving smoothing where every channel guides itself.
///
/// `input` must lie in `[-1, 1]`. Channels run in parallel when the budget
/// allows all of their grids at once, otherwise one after another.
pub fn bilateral_filter_2d(
    input: &Image,
    params: &BilateralParams,
    budget: &GridBudget,
) -> Result<Image> {
    let [ki, ks] = params.kernel_size;
    check_grid_size(params.grid_size)?;
    Kernel1D::gaussian(ki)?;
    Kernel1D::gaussian(ks)?;
    input.ensure_range("bilateral input", -1.0, 1.0)?;

    let shape = input.shape();
    if shape.channels == 0 {
        return Ok(input.clone());
    }
    let per_channel = grid_bytes(shape.batch, 1, params.grid_size);
    check_budget(per_channel, budget)?;
    let parallel = per_channel.saturating_mul(shape.channels as u64) <= budget.max_bytes;
    debug!(
        input = %shape,
        grid_size = ?params.grid_size,
        kernel_size = ?params.kernel_size,
        per_channel,
        parallel,
        "bilateral filter"
    );

    let filter_channel = |c: usize| -> Result<Image> {
        let channel = input.channel(c)?;
        let mut grid = splat(&channel, &channel, params.grid_size, budget)?;
        grid.blur([ki, ks, ks], KernelKind::Gaussian)?;
        grid.slice(&channel)
    };
    let filtered: Vec<Image> = if parallel {
        (0..shape.channels)
            .into_par_iter()
            .map(&filter_channel)
            .collect::<Result<_>>()?
    } else {
        (0..shape.channels)
            .map(&filter_channel)
            .collect::<Result<_>>()?
    };
    Image::concat_channels(&filtered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::Shape;

    const EPSILON: f32 = 1e-4;

    fn ramp(h: usize, w: usize) -> Image {
        Image::from_fn(Shape::new(1, 1, h, w), |_, _, y, x| {
            (x as f32 / (w - 1) as f32) * 1.6 - 0.8 + y as f32 * 0.01
        })
    }

    #[test]
    fn test_splat_weights_form_a_partition_of_unity() {
        let image = ramp(9, 9);
        let grid = splat(&image, &image, [8, 5, 5], &GridBudget::default()).unwrap();
        let s = grid.shape();
        for y in 0..s.height {
            for x in 0..s.width {
                let total: f32 = (0..s.depth).map(|k| grid.weight.get(0, 0, k, y, x)).sum();
                assert!((total - 1.0).abs() < EPSILON, "cell ({y}, {x}) total {total}");
            }
        }
    }

    #[test]
    fn test_splat_places_extremes_in_end_bins() {
        let image = Image::from_fn(Shape::new(1, 1, 2, 2), |_, _, _, x| {
            if x == 0 { -1.0 } else { 1.0 }
        });
        let grid = splat(&image, &image, [4, 2, 2], &GridBudget::default()).unwrap();
        assert!((grid.weight.get(0, 0, 0, 0, 0) - 1.0).abs() < EPSILON);
        assert!((grid.intensity.get(0, 0, 0, 0, 0) + 1.0).abs() < EPSILON);
        assert!((grid.weight.get(0, 0, 3, 0, 1) - 1.0).abs() < EPSILON);
        assert!(grid.weight.get(0, 0, 3, 0, 0).abs() < EPSILON);
    }

    #[test]
    fn test_constant_image_is_unchanged() {
        let image = Image::filled(Shape::new(2, 3, 12, 10), 0.3);
        let params = BilateralParams::new([5, 5], [8, 6, 6]);
        let out = bilateral_filter_2d(&image, &params, &GridBudget::default()).unwrap();
        assert_eq!(out.shape(), image.shape());
        for &v in out.data() {
            assert!((v - 0.3).abs() < EPSILON, "got {v}");
        }
    }

    #[test]
    fn test_slice_without_weight_skips_divide() {
        let image = Image::filled(Shape::new(1, 1, 4, 4), 0.5);
        let grid = splat(&image, &image, [4, 4, 4], &GridBudget::default()).unwrap();
        let raw = slice(&grid.intensity, &image, None).unwrap();
        let divided = grid.slice(&image).unwrap();
        // Tent weights at b = 2.25 give (0.75² + 0.25²) of the value.
        assert!((raw.get(0, 0, 1, 1) - 0.5 * 0.625).abs() < EPSILON);
        assert!((divided.get(0, 0, 1, 1) - 0.5).abs() < EPSILON);
    }

    #[test]
    fn test_budget_overrun_is_reported() {
        let image = ramp(8, 8);
        let budget = GridBudget { max_bytes: 1024 };
        let err = splat(&image, &image, [16, 16, 16], &budget);
        assert!(matches!(err, Err(PlasmaError::ResourceExhausted { budget: 1024, .. })));
    }

    #[test]
    fn test_guide_out_of_range_is_rejected() {
        let image = Image::filled(Shape::new(1, 1, 4, 4), 1.5);
        let err = splat(&image, &image, [4, 4, 4], &GridBudget::default());
        assert!(matches!(err, Err(PlasmaError::OutOfRange { .. })));
    }

    #[test]
    fn test_guide_shape_must_match_input() {
        let input = Image::zeros(Shape::new(1, 3, 4, 4));
        let guide = Image::zeros(Shape::new(1, 1, 4, 5));
        let err = splat(&input, &guide, [4, 4, 4], &GridBudget::default());
        assert!(matches!(err, Err(PlasmaError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_zero_grid_size_is_invalid() {
        let image = ramp(4, 4);
        let params = BilateralParams::new([3, 3], [0, 4, 4]);
        let err = bilateral_filter_2d(&image, &params, &GridBudget::default());
        assert!(matches!(err, Err(PlasmaError::InvalidArgument(_))));
    }
}
