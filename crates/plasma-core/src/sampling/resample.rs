//! Bilinear resampling to an exact target size.
//!
//! Sizes are always explicit so pyramids over odd dimensions never drift by a
//! pixel. Two coordinate conventions are supported:
//!
//! ```text
//! align_corners = true   src = dst × (in − 1) / (out − 1)
//! align_corners = false  src = max(0, (dst + 0.5) × in / out − 0.5)
//! ```

use rayon::prelude::*;

use crate::error::{PlasmaError, Result};
use crate::image::Image;

/// Precomputed interpolation taps along one axis.
#[derive(Debug, Clone, Copy)]
struct Tap {
    i0: usize,
    i1: usize,
    frac: f32,
}

fn source_coordinate(dst: usize, in_len: usize, out_len: usize, align_corners: bool) -> f32 {
    if align_corners {
        if out_len > 1 {
            dst as f32 * (in_len - 1) as f32 / (out_len - 1) as f32
        } else {
            0.0
        }
    } else {
        ((dst as f32 + 0.5) * in_len as f32 / out_len as f32 - 0.5).max(0.0)
    }
}

fn axis_taps(in_len: usize, out_len: usize, align_corners: bool) -> Vec<Tap> {
    (0..out_len)
        .map(|dst| {
            let src = source_coordinate(dst, in_len, out_len, align_corners);
            let i0 = (src.floor() as usize).min(in_len - 1);
            let i1 = (i0 + 1).min(in_len - 1);
            Tap {
                i0,
                i1,
                frac: src - i0 as f32,
            }
        })
        .collect()
}

fn resize_plane(src: &[f32], in_w: usize, dst: &mut [f32], out_w: usize, rows: &[Tap], cols: &[Tap]) {
    for (row, ty) in dst.chunks_exact_mut(out_w).zip(rows) {
        let top = &src[ty.i0 * in_w..(ty.i0 + 1) * in_w];
        let bottom = &src[ty.i1 * in_w..(ty.i1 + 1) * in_w];
        for (out, tx) in row.iter_mut().zip(cols) {
            let t = top[tx.i0] + (top[tx.i1] - top[tx.i0]) * tx.frac;
            let b = bottom[tx.i0] + (bottom[tx.i1] - bottom[tx.i0]) * tx.frac;
            *out = t + (b - t) * ty.frac;
        }
    }
}

/// Map a normalized coordinate in `[-1, 1]` to index space with corners aligned.
#[inline]
pub fn unnormalize(coord: f32, size: usize) -> f32 {
    (coord + 1.0) * 0.5 * size.saturating_sub(1) as f32
}

/// `linspace(-1, 1, size)[i]`. A single-element axis sits at `-1`.
#[inline]
pub fn linspace_at(i: usize, size: usize) -> f32 {
    if size > 1 {
        -1.0 + 2.0 * i as f32 / (size - 1) as f32
    } else {
        -1.0
    }
}

#[inline]
fn lerp_weights(coord: f32) -> (isize, f32) {
    let floor = coord.floor();
    (floor as isize, coord - floor)
}

/// Bilinear sample of an `(H, W)` plane at index coordinates, zero outside.
pub fn sample_bilinear(plane: &[f32], dims: (usize, usize), y: f32, x: f32) -> f32 {
    let (h, w) = dims;
    let (y0, fy) = lerp_weights(y);
    let (x0, fx) = lerp_weights(x);
    let at = |yy: isize, xx: isize| -> f32 {
        if yy < 0 || xx < 0 || yy as usize >= h || xx as usize >= w {
            0.0
        } else {
            plane[yy as usize * w + xx as usize]
        }
    };
    let top = at(y0, x0) * (1.0 - fx) + at(y0, x0 + 1) * fx;
    let bottom = at(y0 + 1, x0) * (1.0 - fx) + at(y0 + 1, x0 + 1) * fx;
    top * (1.0 - fy) + bottom * fy
}

/// Trilinear sample of a `(D, H, W)` block at index coordinates, zero outside.
pub fn sample_trilinear(
    block: &[f32],
    dims: (usize, usize, usize),
    z: f32,
    y: f32,
    x: f32,
) -> f32 {
    let (d, h, w) = dims;
    let (z0, fz) = lerp_weights(z);
    let plane_len = h * w;
    let slice = |zz: isize| -> f32 {
        if zz < 0 || zz as usize >= d {
            0.0
        } else {
            let start = zz as usize * plane_len;
            sample_bilinear(&block[start..start + plane_len], (h, w), y, x)
        }
    };
    let near = if fz < 1.0 { slice(z0) } else { 0.0 };
    let far = if fz > 0.0 { slice(z0 + 1) } else { 0.0 };
    near * (1.0 - fz) + far * fz
}

/// Resize every plane of `image` to `(height, width)` with bilinear interpolation.
pub fn resize(image: &Image, size: (usize, usize), align_corners: bool) -> Result<Image> {
    let (out_h, out_w) = size;
    let (in_h, in_w) = image.shape().spatial();
    if out_h == 0 || out_w == 0 {
        return Err(PlasmaError::invalid(format!(
            "resize target must be non-empty, got {out_h}x{out_w}"
        )));
    }
    if in_h == 0 || in_w == 0 {
        return Err(PlasmaError::invalid("cannot resize an empty image"));
    }
    if (in_h, in_w) == size {
        return Ok(image.clone());
    }

    let rows = axis_taps(in_h, out_h, align_corners);
    let cols = axis_taps(in_w, out_w, align_corners);
    let shape = image.shape().with_spatial(out_h, out_w);
    let mut out = Image::zeros(shape);
    out.data_mut()
        .par_chunks_mut(out_h * out_w)
        .zip(image.data().par_chunks(in_h * in_w))
        .for_each(|(dst, src)| resize_plane(src, in_w, dst, out_w, &rows, &cols));
    Ok(out)
}

/// Resize by a uniform scale factor. Target dimensions are `floor(dim × scale)`, at least 1.
pub fn resize_by(image: &Image, scale: f32, align_corners: bool) -> Result<Image> {
    if !(scale.is_finite() && scale > 0.0) {
        return Err(PlasmaError::invalid(format!(
            "scale factor must be positive, got {scale}"
        )));
    }
    let (h, w) = image.shape().spatial();
    let target = (
        ((h as f32 * scale).floor() as usize).max(1),
        ((w as f32 * scale).floor() as usize).max(1),
    );
    resize(image, target, align_corners)
}
