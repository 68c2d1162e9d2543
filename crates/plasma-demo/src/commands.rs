//! Subcommand implementations. Each loads, runs one pipeline and writes PNGs.

use std::path::{Path, PathBuf};
use std::time::Instant;

use plasma_core::blending::{laplacian_pyramid, pyramid_depth};
use plasma_core::filters::{
    clarity, contrast, exposure, highlights, saturation, shadows, sharpen, temperature, texture,
    tint, tone_curve,
};
use plasma_core::sampling::{Lut3D, color_sample_1d, color_sample_3d, resize};
use plasma_core::{
    Image, bilateral_filter_2d, exposure_fusion, read_image, read_lut_image, write_image,
};
use tracing::{debug, info};

use crate::config::DemoConfig;
use crate::error::{DemoError, DemoResult};

/// Slider values for the `filter` subcommand. `None` skips the adjustment.
#[derive(Debug, Clone, Default)]
pub struct Adjustments {
    pub exposure: Option<f32>,
    pub contrast: Option<f32>,
    pub saturation: Option<f32>,
    pub temperature: Option<f32>,
    pub tint: Option<f32>,
    pub highlights: Option<f32>,
    pub shadows: Option<f32>,
    pub tonal_range: f32,
    pub clarity: Option<f32>,
    pub texture: Option<f32>,
    pub sharpen: Option<f32>,
    pub curve: Option<[f32; 4]>,
    pub lut_cube: Option<PathBuf>,
    pub lut_strip: Option<PathBuf>,
}

fn load(path: &Path, config: &DemoConfig) -> DemoResult<Image> {
    let image = read_image(path, config.max_edge)?;
    info!(path = %path.display(), shape = %image.shape(), "loaded");
    Ok(image)
}

fn save(path: &Path, image: &Image) -> DemoResult<()> {
    write_image(path, image, 0)?;
    info!(path = %path.display(), "wrote");
    Ok(())
}

pub fn fuse(inputs: &[PathBuf], output: &Path, config: &DemoConfig) -> DemoResult<()> {
    let (first, rest) = inputs
        .split_first()
        .ok_or_else(|| DemoError::Usage("fuse needs at least one exposure".into()))?;
    let reference = load(first, config)?;
    let size = reference.shape().spatial();
    let mut exposures = vec![reference];
    for path in rest {
        let image = load(path, config)?;
        let image = if image.shape().spatial() == size {
            image
        } else {
            debug!(path = %path.display(), ?size, "resizing exposure to match the first");
            resize(&image, size, false)?
        };
        exposures.push(image);
    }

    let start = Instant::now();
    let stack = Image::concat_channels(&exposures)?;
    let fused = exposure_fusion(&stack, &config.params.fusion)?;
    info!(
        exposures = exposures.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "fused"
    );
    save(output, &fused)
}

pub fn filter(
    input: &Path,
    output: &Path,
    adjust: &Adjustments,
    config: &DemoConfig,
) -> DemoResult<()> {
    let mut image = load(input, config)?;
    let filters = &config.params.filters;
    let start = Instant::now();

    if let Some(w) = adjust.exposure {
        image = exposure(&image, w)?;
    }
    if let Some(w) = adjust.contrast {
        image = contrast(&image, w)?;
    }
    if let Some(w) = adjust.saturation {
        image = saturation(&image, w)?;
    }
    if let Some(w) = adjust.temperature {
        image = temperature(&image, w)?;
    }
    if let Some(w) = adjust.tint {
        image = tint(&image, w)?;
    }
    if let Some(w) = adjust.highlights {
        image = highlights(&image, w, adjust.tonal_range)?;
    }
    if let Some(w) = adjust.shadows {
        image = shadows(&image, w, adjust.tonal_range, filters)?;
    }
    if let Some(w) = adjust.clarity {
        image = clarity(&image, w, filters)?;
    }
    if let Some(w) = adjust.texture {
        image = texture(&image, w, filters)?;
    }
    if let Some(w) = adjust.sharpen {
        image = sharpen(&image, w, filters)?;
    }
    if let Some(control) = adjust.curve {
        image = tone_curve(&image, &[control])?;
    }
    if let Some(path) = &adjust.lut_strip {
        image = color_sample_1d(&image, &read_lut_image(path)?);
    }
    if let Some(path) = &adjust.lut_cube {
        image = color_sample_3d(&image, &Lut3D::load_cube(path)?)?;
    }

    info!(elapsed_ms = start.elapsed().as_millis() as u64, "filtered");
    save(output, &image)
}

pub fn bilateral(input: &Path, output: &Path, config: &DemoConfig) -> DemoResult<()> {
    let image = load(input, config)?;
    let start = Instant::now();
    let params = &config.params;
    let smooth = bilateral_filter_2d(&image, &params.bilateral, &params.filters.budget)?;
    info!(
        grid_size = ?params.bilateral.grid_size,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "bilateral filtered"
    );
    save(output, &smooth)
}

/// Write every Laplacian band. Detail bands are multiplied by `gain` so they are visible.
pub fn pyramid(
    input: &Path,
    out_dir: &Path,
    levels: Option<usize>,
    gain: f32,
    config: &DemoConfig,
) -> DemoResult<()> {
    let image = load(input, config)?;
    let (h, w) = image.shape().spatial();
    let levels = match levels {
        Some(levels) => levels,
        None => pyramid_depth(h, w, config.params.fusion.peak_level)?,
    };
    let bands = laplacian_pyramid(&image, levels)?;
    std::fs::create_dir_all(out_dir).map_err(|source| DemoError::Output {
        path: out_dir.to_path_buf(),
        source,
    })?;
    let coarsest = bands.len().saturating_sub(1);
    for (i, band) in bands.iter().enumerate() {
        let visible = if i == coarsest {
            band.clone()
        } else {
            band.map(|v| v * gain)
        };
        save(&out_dir.join(format!("level_{i}.png")), &visible)?;
    }
    info!(levels = bands.len(), "pyramid written");
    Ok(())
}
