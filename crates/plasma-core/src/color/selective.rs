//! Selective color: hue, saturation and exposure edits targeted at basis colors.
//!
//! Each basis color claims pixels by chroma similarity
//!
//! ```text
//! w_m = max(0, cos∠(uv_pixel, uv_basis_m))
//! ```
//!
//! and all `M` adjustments are applied at once:
//!
//! ```text
//! uv' = R(Σ w_m × hue_m) × uv + Σ uv × w_m × sat_m
//! y'  = y + Σ y × w_m × exp_m
//! ```

use glam::{Mat2, Vec2};

use crate::conversion::yuv::{rgb_to_yuv_pixel, yuv_to_rgb_pixel};
use crate::error::{PlasmaError, Result};
use crate::image::{Image, Shape};

const COSINE_EPSILON: f32 = 1e-8;

fn basis_chroma(colors: &[[f32; 3]]) -> Result<Vec<Vec2>> {
    if colors.is_empty() {
        return Err(PlasmaError::invalid("selective color needs at least one basis color"));
    }
    colors
        .iter()
        .map(|rgb| {
            if let Some(&found) = rgb.iter().find(|v| !(0.0..=1.0).contains(*v)) {
                return Err(PlasmaError::OutOfRange {
                    what: "basis color",
                    min: 0.0,
                    max: 1.0,
                    found,
                });
            }
            let [_, u, v] = rgb_to_yuv_pixel(rgb.map(|c| 2.0 * c - 1.0));
            Ok(Vec2::new(u, v))
        })
        .collect()
}

fn similarity(uv: Vec2, basis: Vec2) -> f32 {
    let denom = (uv.length() * basis.length()).max(COSINE_EPSILON);
    (uv.dot(basis) / denom).max(0.0)
}

fn pixel_uv(image: &Image, n: usize, i: usize) -> [f32; 3] {
    rgb_to_yuv_pixel([
        image.plane(n, 0)[i],
        image.plane(n, 1)[i],
        image.plane(n, 2)[i],
    ])
}

/// Per-pixel claim of every basis color, as `(N, M, H, W)` in `[0, 1]`.
///
/// `colors` are RGB in `[0, 1]`.
pub fn selective_color_weights(image: &Image, colors: &[[f32; 3]]) -> Result<Image> {
    image.ensure_channels(3, "selective_color_weights")?;
    let basis = basis_chroma(colors)?;
    let shape = image.shape().with_channels(basis.len());
    let mut out = Image::zeros(shape);
    for n in 0..shape.batch {
        for i in 0..shape.plane_len() {
            let [_, u, v] = pixel_uv(image, n, i);
            for (m, b) in basis.iter().enumerate() {
                out.plane_mut(n, m)[i] = similarity(Vec2::new(u, v), *b);
            }
        }
    }
    Ok(out)
}

/// Apply hue, saturation and exposure adjustments per basis color.
///
/// `hue_adj` is in radians; all three adjustment stacks are `(N, M, H, W)`.
pub fn selective_color(
    image: &Image,
    colors: &[[f32; 3]],
    hue_adj: &Image,
    sat_adj: &Image,
    exp_adj: &Image,
) -> Result<Image> {
    let weights = selective_color_weights(image, colors)?;
    let expected: Shape = weights.shape();
    hue_adj.ensure_shape(expected, "selective_color")?;
    sat_adj.ensure_shape(expected, "selective_color")?;
    exp_adj.ensure_shape(expected, "selective_color")?;

    let mut out = image.clone();
    for n in 0..expected.batch {
        for i in 0..expected.plane_len() {
            let [y, u, v] = pixel_uv(image, n, i);
            let uv = Vec2::new(u, v);
            let (mut angle, mut sat, mut exp) = (0.0, 0.0, 0.0);
            for m in 0..expected.channels {
                let w = weights.plane(n, m)[i];
                angle += w * hue_adj.plane(n, m)[i];
                sat += w * sat_adj.plane(n, m)[i];
                exp += w * exp_adj.plane(n, m)[i];
            }
            let rotated = Mat2::from_angle(angle) * uv;
            let chroma = rotated + uv * sat;
            let rgb = yuv_to_rgb_pixel([y + y * exp, chroma.x, chroma.y]);
            for (c, value) in rgb.into_iter().enumerate() {
                out.plane_mut(n, c)[i] = value;
            }
        }
    }
    Ok(out)
}
