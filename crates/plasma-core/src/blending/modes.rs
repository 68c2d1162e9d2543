//! Layer blend modes over `[-1, 1]` images.
//!
//! Both operands are mapped to `[0, 1]` before blending and back afterwards.
//! The overlay may be `(N, 1, H, W)`, in which case it applies to every channel.

use crate::error::Result;
use crate::image::Image;

#[inline]
fn to_unit(v: f32) -> f32 {
    (v + 1.0) * 0.5
}

#[inline]
fn from_unit(v: f32) -> f32 {
    v * 2.0 - 1.0
}

/// Overlay blend: multiply in the lower half of the base, screen in the upper.
pub fn blend_overlay(base: &Image, overlay: &Image) -> Result<Image> {
    base.zip_broadcast(overlay, "blend_overlay", |b, o| {
        let (b, o) = (to_unit(b), to_unit(o));
        let out = if b < 0.5 {
            2.0 * b * o
        } else {
            1.0 - 2.0 * (1.0 - b) * (1.0 - o)
        };
        from_unit(out)
    })
}

#[inline]
fn soft_light_unit(b: f32, s: f32) -> f32 {
    if s <= 0.5 {
        b - (1.0 - 2.0 * s) * b * (1.0 - b)
    } else {
        let d = if b <= 0.25 {
            ((16.0 * b - 12.0) * b + 4.0) * b
        } else {
            b.sqrt()
        };
        b + (2.0 * s - 1.0) * (d - b)
    }
}

/// Soft light blend. An overlay of `0` leaves the base unchanged.
pub fn blend_soft_light(base: &Image, overlay: &Image) -> Result<Image> {
    base.zip_broadcast(overlay, "blend_soft_light", |b, o| {
        from_unit(soft_light_unit(to_unit(b), to_unit(o)))
    })
}
