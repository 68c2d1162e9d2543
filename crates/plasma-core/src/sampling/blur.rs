//! Separable Gaussian and box convolution over images and volumes.
//!
//! Kernels are one-dimensional and applied axis by axis. Images use a
//! clamp-to-edge border; volumes use zero padding.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{PlasmaError, Result};
use crate::image::Image;
use crate::volume::Volume;

/// Kernel profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KernelKind {
    #[default]
    Gaussian,
    Box,
}

/// How samples outside the signal are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Border {
    /// Outside samples are zero.
    Zero,
    /// Outside samples repeat the nearest edge sample.
    Replicate,
    /// Outside samples are ignored and the remaining taps renormalized.
    Renormalize,
}

/// Normalized, odd-length, symmetric convolution kernel.
#[derive(Debug, Clone, PartialEq)]
pub struct Kernel1D {
    taps: Vec<f32>,
}

fn check_size(size: usize) -> Result<()> {
    if size == 0 || size % 2 == 0 {
        return Err(PlasmaError::invalid(format!(
            "kernel size must be odd and positive, got {size}"
        )));
    }
    Ok(())
}

/// Sigma used for a Gaussian kernel of `size` taps when none is given.
pub fn sigma_for_size(size: usize) -> f32 {
    0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

impl Kernel1D {
    pub fn new(kind: KernelKind, size: usize) -> Result<Self> {
        match kind {
            KernelKind::Gaussian => Self::gaussian(size),
            KernelKind::Box => Self::box_filter(size),
        }
    }

    /// Gaussian kernel with sigma derived from the size.
    pub fn gaussian(size: usize) -> Result<Self> {
        Self::gaussian_with_sigma(size, sigma_for_size(size))
    }

    pub fn gaussian_with_sigma(size: usize, sigma: f32) -> Result<Self> {
        check_size(size)?;
        if !(sigma.is_finite() && sigma > 0.0) {
            return Err(PlasmaError::invalid(format!(
                "gaussian sigma must be positive, got {sigma}"
            )));
        }
        let radius = (size / 2) as f32;
        let taps: Vec<f32> = (0..size)
            .map(|i| {
                let d = i as f32 - radius;
                (-(d * d) / (2.0 * sigma * sigma)).exp()
            })
            .collect();
        Ok(Self::normalized(taps))
    }

    pub fn box_filter(size: usize) -> Result<Self> {
        check_size(size)?;
        Ok(Self::normalized(vec![1.0; size]))
    }

    fn normalized(mut taps: Vec<f32>) -> Self {
        let sum: f32 = taps.iter().sum();
        taps.iter_mut().for_each(|t| *t /= sum);
        Self { taps }
    }

    pub fn taps(&self) -> &[f32] {
        &self.taps
    }

    pub fn radius(&self) -> usize {
        self.taps.len() / 2
    }

    pub fn is_identity(&self) -> bool {
        self.taps.len() == 1
    }

    /// Convolve `src` into `dst` (same length).
    fn convolve(&self, src: &[f32], dst: &mut [f32], border: Border) {
        let len = src.len() as isize;
        let r = self.radius() as isize;
        for (i, out) in dst.iter_mut().enumerate() {
            let mut acc = 0.0;
            let mut norm = 0.0;
            for (k, &tap) in self.taps.iter().enumerate() {
                let j = i as isize + k as isize - r;
                let value = if (0..len).contains(&j) {
                    norm += tap;
                    src[j as usize]
                } else {
                    match border {
                        Border::Replicate => src[j.clamp(0, len - 1) as usize],
                        Border::Zero | Border::Renormalize => 0.0,
                    }
                };
                acc += tap * value;
            }
            *out = match border {
                Border::Renormalize if norm > 0.0 => acc / norm,
                _ => acc,
            };
        }
    }
}

/// Convolve every line along one axis of a contiguous block in place.
///
/// The block is viewed as `[outer][len][stride]`; lines run along `len`.
fn convolve_axis(block: &mut [f32], len: usize, stride: usize, kernel: &Kernel1D, border: Border) {
    if kernel.is_identity() || len == 0 || stride == 0 {
        return;
    }
    let mut line = vec![0.0; len];
    let mut out = vec![0.0; len];
    for outer in block.chunks_exact_mut(len * stride) {
        for inner in 0..stride {
            for (k, v) in line.iter_mut().enumerate() {
                *v = outer[k * stride + inner];
            }
            kernel.convolve(&line, &mut out, border);
            for (k, v) in out.iter().enumerate() {
                outer[k * stride + inner] = *v;
            }
        }
    }
}

/// Blur every `(H, W)` plane of `image` with separable kernels of size `[ky, kx]`.
pub fn blur_2d(image: &Image, kind: KernelKind, size: [usize; 2], border: Border) -> Result<Image> {
    let ky = Kernel1D::new(kind, size[0])?;
    let kx = Kernel1D::new(kind, size[1])?;
    let (h, w) = image.shape().spatial();
    let mut out = image.clone();
    let plane = h * w;
    if plane == 0 {
        return Ok(out);
    }
    out.data_mut().par_chunks_mut(plane).for_each(|p| {
        convolve_axis(p, w, 1, &kx, border);
        convolve_axis(p, h, w, &ky, border);
    });
    Ok(out)
}

/// Gaussian blur with clamp-to-edge border.
pub fn gaussian_blur_2d(image: &Image, size: [usize; 2]) -> Result<Image> {
    blur_2d(image, KernelKind::Gaussian, size, Border::Replicate)
}

/// Box blur with clamp-to-edge border.
pub fn box_blur_2d(image: &Image, size: [usize; 2]) -> Result<Image> {
    blur_2d(image, KernelKind::Box, size, Border::Replicate)
}

/// Blur every `(D, H, W)` block of `volume` in place, zero border.
pub fn blur_3d_in_place(volume: &mut Volume, kind: KernelKind, size: [usize; 3]) -> Result<()> {
    let kd = Kernel1D::new(kind, size[0])?;
    let ky = Kernel1D::new(kind, size[1])?;
    let kx = Kernel1D::new(kind, size[2])?;
    let shape = volume.shape();
    let (d, h, w) = (shape.depth, shape.height, shape.width);
    let block = shape.block_len();
    if block == 0 {
        return Ok(());
    }
    volume.data_mut().par_chunks_mut(block).for_each(|b| {
        convolve_axis(b, w, 1, &kx, Border::Zero);
        convolve_axis(b, h, w, &ky, Border::Zero);
        convolve_axis(b, d, h * w, &kd, Border::Zero);
    });
    Ok(())
}

pub fn gaussian_blur_3d(volume: &Volume, size: [usize; 3]) -> Result<Volume> {
    let mut out = volume.clone();
    blur_3d_in_place(&mut out, KernelKind::Gaussian, size)?;
    Ok(out)
}

pub fn box_blur_3d(volume: &Volume, size: [usize; 3]) -> Result<Volume> {
    let mut out = volume.clone();
    blur_3d_in_place(&mut out, KernelKind::Box, size)?;
    Ok(out)
}

/// Mean over a `(2r + 1)²` window, counting only pixels inside the image.
pub fn box_mean_2d(image: &Image, radius: usize) -> Result<Image> {
    let size = 2 * radius + 1;
    blur_2d(image, KernelKind::Box, [size, size], Border::Renormalize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::Shape;
    use crate::volume::VolumeShape;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn test_kernels_are_normalized() {
        for size in [1, 3, 5, 11] {
            for kind in [KernelKind::Gaussian, KernelKind::Box] {
                let sum: f32 = Kernel1D::new(kind, size).unwrap().taps().iter().sum();
                assert!((sum - 1.0).abs() < EPSILON, "{kind:?} size {size}: sum {sum}");
            }
        }
    }

    #[test]
    fn test_even_kernel_is_rejected() {
        assert!(matches!(
            Kernel1D::gaussian(4),
            Err(PlasmaError::InvalidArgument(_))
        ));
        assert!(Kernel1D::box_filter(0).is_err());
    }

    #[test]
    fn test_sigma_follows_size() {
        assert!((sigma_for_size(5) - 1.1).abs() < EPSILON);
        assert!((sigma_for_size(11) - 2.0).abs() < EPSILON);
    }

    #[test]
    fn test_blur_2d_keeps_constant_image() {
        let image = Image::filled(Shape::new(1, 2, 6, 5), 0.4);
        let out = gaussian_blur_2d(&image, [5, 3]).unwrap();
        for &v in out.data() {
            assert!((v - 0.4).abs() < EPSILON);
        }
    }

    #[test]
    fn test_size_one_is_identity() {
        let image = Image::from_fn(Shape::new(1, 1, 4, 4), |_, _, y, x| (y * 4 + x) as f32);
        assert_eq!(box_blur_2d(&image, [1, 1]).unwrap(), image);
    }

    #[test]
    fn test_box_blur_averages_neighbours() {
        let image = Image::from_fn(Shape::new(1, 1, 1, 5), |_, _, _, x| x as f32);
        let out = box_blur_2d(&image, [1, 3]).unwrap();
        assert!((out.get(0, 0, 0, 2) - 2.0).abs() < EPSILON);
        // Replicated edge: (0 + 0 + 1) / 3.
        assert!((out.get(0, 0, 0, 0) - 1.0 / 3.0).abs() < EPSILON);
    }

    #[test]
    fn test_box_mean_ignores_outside_pixels() {
        let image = Image::from_fn(Shape::new(1, 1, 1, 3), |_, _, _, x| x as f32);
        let out = box_mean_2d(&image, 1).unwrap();
        assert!((out.get(0, 0, 0, 0) - 0.5).abs() < EPSILON);
        assert!((out.get(0, 0, 0, 2) - 1.5).abs() < EPSILON);
    }

    #[test]
    fn test_blur_3d_zero_border_loses_mass_at_edges() {
        let mut volume = Volume::try_zeros(VolumeShape::new(1, 1, 3, 1, 1)).unwrap();
        volume.data_mut()[0] = 1.0;
        let out = box_blur_3d(&volume, [3, 1, 1]).unwrap();
        let total: f32 = out.data().iter().sum();
        assert!((total - 2.0 / 3.0).abs() < EPSILON, "total {total}");
        assert!((out.get(0, 0, 1, 0, 0) - 1.0 / 3.0).abs() < EPSILON);
    }
}
