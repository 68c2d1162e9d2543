//! Image and LUT file loading for the adjustment pipeline.
//!
//! Supports common formats via the `image` crate (PNG, JPEG, TIFF, ...).
//! Pixels are converted to the `[-1, 1]` RGB range used everywhere else.

use std::path::Path;

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, ImageError, RgbImage};
use tracing::debug;

use crate::error::{PlasmaError, Result};
use crate::image::{Image, Shape};
use crate::sampling::lut::Lut1D;

fn open_error(path: &Path, err: ImageError) -> PlasmaError {
    match err {
        ImageError::IoError(source) => PlasmaError::Io {
            path: path.to_path_buf(),
            source,
        },
        other => PlasmaError::Decode(other),
    }
}

fn open(path: &Path) -> Result<DynamicImage> {
    image::open(path).map_err(|err| open_error(path, err))
}

/// Load an image as a `(1, 3, H, W)` batch in `[-1, 1]`.
///
/// When `max_edge` is given and the longer edge exceeds it, the image is
/// downscaled so the longer edge equals `max_edge`, keeping the aspect ratio.
pub fn read_image(path: &Path, max_edge: Option<u32>) -> Result<Image> {
    let mut img = open(path)?;
    if let Some(limit) = max_edge {
        if limit == 0 {
            return Err(PlasmaError::invalid("max edge must be positive"));
        }
        if img.width().max(img.height()) > limit {
            img = img.resize(limit, limit, FilterType::Triangle);
        }
    }
    let rgb = img.to_rgb32f();
    let (width, height) = rgb.dimensions();
    let (w, h) = (width as usize, height as usize);
    debug!(path = %path.display(), width, height, "loaded image");

    let mut data = vec![0.0; 3 * h * w];
    for (i, px) in rgb.pixels().enumerate() {
        for c in 0..3 {
            data[c * h * w + i] = px.0[c] * 2.0 - 1.0;
        }
    }
    Image::from_vec(Shape::new(1, 3, h, w), data)
}

#[inline]
fn to_byte(v: f32) -> u8 {
    ((v.clamp(-1.0, 1.0) + 1.0) * 0.5 * 255.0).round() as u8
}

/// Write one batch sample of a 1- or 3-channel image as 8-bit.
pub fn write_image(path: &Path, image: &Image, batch_index: usize) -> Result<()> {
    if batch_index >= image.batch() {
        return Err(PlasmaError::invalid(format!(
            "batch index {batch_index} out of bounds for {}",
            image.shape()
        )));
    }
    let (h, w) = image.shape().spatial();
    let (width, height) = (w as u32, h as u32);
    let result = match image.channels() {
        1 => {
            let plane = image.plane(batch_index, 0);
            GrayImage::from_fn(width, height, |x, y| {
                image::Luma([to_byte(plane[y as usize * w + x as usize])])
            })
            .save(path)
        }
        3 => {
            let planes = [
                image.plane(batch_index, 0),
                image.plane(batch_index, 1),
                image.plane(batch_index, 2),
            ];
            RgbImage::from_fn(width, height, |x, y| {
                let i = y as usize * w + x as usize;
                image::Rgb(planes.map(|p| to_byte(p[i])))
            })
            .save(path)
        }
        _ => {
            return Err(PlasmaError::shape(
                "write_image",
                "1 or 3 channels",
                image.shape(),
            ));
        }
    };
    result.map_err(|err| open_error(path, err))?;
    debug!(path = %path.display(), width, height, "wrote image");
    Ok(())
}

/// Load a 1D LUT stored as an image strip.
///
/// The image is converted to grayscale and each column averaged, giving one
/// entry per column in `[-1, 1]`.
pub fn read_lut_image(path: &Path) -> Result<Lut1D> {
    let gray = open(path)?.to_luma32f();
    let (width, height) = gray.dimensions();
    let mut values = vec![0.0f32; width as usize];
    for (x, _, px) in gray.enumerate_pixels() {
        values[x as usize] += px.0[0];
    }
    let rows = height.max(1) as f32;
    Lut1D::new(values.into_iter().map(|v| v / rows * 2.0 - 1.0).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("plasma-io-{}-{name}", std::process::id()))
    }

    #[test]
    fn test_rgb_roundtrip_within_quantization() {
        let path = temp_path("roundtrip.png");
        let image = Image::from_fn(Shape::new(1, 3, 6, 9), |_, c, y, x| {
            -1.0 + (c * 54 + y * 9 + x) as f32 / 81.0
        });
        write_image(&path, &image, 0).unwrap();
        let back = read_image(&path, None).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(back.shape(), image.shape());
        assert!(back.mean_abs_diff(&image).unwrap() < 2.0 / 255.0);
    }

    #[test]
    fn test_max_edge_limits_longer_side() {
        let path = temp_path("max_edge.png");
        write_image(&path, &Image::zeros(Shape::new(1, 3, 20, 40)), 0).unwrap();
        let small = read_image(&path, Some(10)).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(small.shape().spatial(), (5, 10));
    }

    #[test]
    fn test_lut_strip_averages_columns() {
        let path = temp_path("lut.png");
        let strip = Image::from_fn(Shape::new(1, 1, 2, 3), |_, _, _, x| x as f32 - 1.0);
        write_image(&path, &strip, 0).unwrap();
        let lut = read_lut_image(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(lut.len(), 3);
        assert!((lut.values()[0] + 1.0).abs() < 1e-2);
        assert!(lut.values()[1].abs() < 1e-2);
        assert!((lut.values()[2] - 1.0).abs() < 1e-2);
    }

    #[test]
    fn test_missing_file_is_an_io_error() {
        let err = read_image(Path::new("/nonexistent/plasma.png"), None);
        assert!(matches!(err, Err(PlasmaError::Io { .. })));
    }

    #[test]
    fn test_two_channel_images_cannot_be_written() {
        let image = Image::zeros(Shape::new(1, 2, 2, 2));
        assert!(write_image(&temp_path("bad.png"), &image, 0).is_err());
    }
}
