//! Laplacian of Gaussian edge response.

use crate::error::Result;
use crate::image::Image;
use crate::sampling::blur::gaussian_blur_2d;

/// Gaussian kernel size used ahead of the Laplacian when none is given.
pub const DEFAULT_LOG_KERNEL: usize = 5;

/// Smooth with a `kernel_size` Gaussian, then apply the 4-neighbour Laplacian.
///
/// Borders replicate the edge pixel, so flat regions respond with zero
/// everywhere including the image boundary.
pub fn laplacian_of_gaussian(image: &Image, kernel_size: usize) -> Result<Image> {
    let smooth = gaussian_blur_2d(image, [kernel_size, kernel_size])?;
    let (h, w) = image.shape().spatial();
    let mut out = Image::zeros(image.shape());
    if out.shape().is_empty() {
        return Ok(out);
    }
    for (dst, src) in out
        .data_mut()
        .chunks_exact_mut(h * w)
        .zip(smooth.data().chunks_exact(h * w))
    {
        for y in 0..h {
            let up = y.saturating_sub(1);
            let down = (y + 1).min(h - 1);
            for x in 0..w {
                let left = x.saturating_sub(1);
                let right = (x + 1).min(w - 1);
                let center = src[y * w + x];
                dst[y * w + x] = src[up * w + x]
                    + src[down * w + x]
                    + src[y * w + left]
                    + src[y * w + right]
                    - 4.0 * center;
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::Shape;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn test_flat_image_has_no_response() {
        let image = Image::filled(Shape::new(1, 1, 6, 6), 0.7);
        let out = laplacian_of_gaussian(&image, DEFAULT_LOG_KERNEL).unwrap();
        assert!(out.data().iter().all(|v| v.abs() < EPSILON));
    }

    #[test]
    fn test_linear_ramp_has_no_interior_response() {
        let image = Image::from_fn(Shape::new(1, 1, 9, 9), |_, _, _, x| x as f32 * 0.1);
        let out = laplacian_of_gaussian(&image, 3).unwrap();
        for y in 0..9 {
            for x in 3..6 {
                assert!(out.get(0, 0, y, x).abs() < EPSILON, "({y}, {x})");
            }
        }
    }

    #[test]
    fn test_spike_responds_negatively_at_centre() {
        let mut image = Image::zeros(Shape::new(1, 1, 7, 7));
        image.set(0, 0, 3, 3, 1.0);
        let out = laplacian_of_gaussian(&image, 3).unwrap();
        assert!(out.get(0, 0, 3, 3) < 0.0);
        assert!(out.get(0, 0, 3, 5) > 0.0 || out.get(0, 0, 3, 4) > 0.0);
    }
}
