//! Guided filter (He, Sun & Tang, 2010).
//!
//! Fits a local linear model `q = a × guide + b` in every
//! `(2r + 1) × (2r + 1)` window, then averages the coefficients of all windows
//! covering a pixel. Window means only count pixels inside the image.

use crate::error::{PlasmaError, Result};
use crate::image::Image;
use crate::sampling::blur::box_mean_2d;

fn product(a: &Image, b: &Image) -> Result<Image> {
    a.zip_map(b, "guided_filter", |x, y| x * y)
}

/// Smooth `input` while keeping the edges of `guide`.
///
/// `guide` is `(N, 1, H, W)` or matches `input`. `epsilon` regularizes flat
/// windows and must be positive.
pub fn guided_filter(input: &Image, guide: &Image, radius: usize, epsilon: f32) -> Result<Image> {
    if !(epsilon.is_finite() && epsilon > 0.0) {
        return Err(PlasmaError::invalid(format!(
            "guided filter epsilon must be positive, got {epsilon}"
        )));
    }
    let guide = if guide.shape() == input.shape() {
        guide.clone()
    } else {
        input.ensure_single_channel_like(guide, "guided_filter")?;
        Image::concat_channels(&vec![guide.clone(); input.channels()])?
    };

    let mean_g = box_mean_2d(&guide, radius)?;
    let mean_p = box_mean_2d(input, radius)?;
    let corr_gp = box_mean_2d(&product(&guide, input)?, radius)?;
    let corr_gg = box_mean_2d(&product(&guide, &guide)?, radius)?;

    let mut a = Image::zeros(input.shape());
    let mut b = Image::zeros(input.shape());
    for i in 0..input.shape().len() {
        let (mg, mp) = (mean_g.data()[i], mean_p.data()[i]);
        let covariance = corr_gp.data()[i] - mg * mp;
        let variance = corr_gg.data()[i] - mg * mg;
        let slope = covariance / (variance + epsilon);
        a.data_mut()[i] = slope;
        b.data_mut()[i] = mp - slope * mg;
    }

    let mean_a = box_mean_2d(&a, radius)?;
    let mean_b = box_mean_2d(&b, radius)?;
    let scaled = product(&mean_a, &guide)?;
    scaled.zip_map(&mean_b, "guided_filter", |x, y| x + y)
}
