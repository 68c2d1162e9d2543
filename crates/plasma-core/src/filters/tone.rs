//! Natural cubic tone curves.
//!
//! A tone curve is four control values at the fixed inputs
//! `[-1, -1/3, 1/3, 1]`. The curve is the natural cubic spline through them:
//! C2 continuous, with zero second derivative at both ends.
//!
//! # Algorithm
//! With uniform knot spacing `h = 2/3` the interior second derivatives solve
//! ```text
//! 4×M1 + M2 = 6/h² × (y0 − 2×y1 + y2)
//! M1 + 4×M2 = 6/h² × (y1 − 2×y2 + y3)
//! ```
//! and each segment `[xi, xi+1]` evaluates
//! ```text
//! S(t) = Mi×(xi+1 − t)³/6h + Mi+1×(t − xi)³/6h
//!      + (yi/h − Mi×h/6)×(xi+1 − t) + (yi+1/h − Mi+1×h/6)×(t − xi)
//! ```
//!
//! # Complexity
//! - Build: O(1)
//! - Evaluate: O(log N) binary search + O(1) interpolation

use crate::error::{PlasmaError, Result};
use crate::image::Image;

/// Fixed input positions of the four control values.
pub const CONTROL_X: [f32; 4] = [-1.0, -1.0 / 3.0, 1.0 / 3.0, 1.0];

const KNOT_SPACING: f32 = 2.0 / 3.0;

/// A natural cubic spline through four control values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NaturalCubicCurve {
    y: [f32; 4],
    /// Second derivatives at each knot.
    m: [f32; 4],
}

impl NaturalCubicCurve {
    pub fn new(control: [f32; 4]) -> Self {
        let h = KNOT_SPACING;
        let scale = 6.0 / (h * h);
        let r1 = scale * (control[0] - 2.0 * control[1] + control[2]);
        let r2 = scale * (control[1] - 2.0 * control[2] + control[3]);
        let m1 = (4.0 * r1 - r2) / 15.0;
        let m2 = (4.0 * r2 - r1) / 15.0;
        Self {
            y: control,
            m: [0.0, m1, m2, 0.0],
        }
    }

    /// The identity curve.
    pub fn identity() -> Self {
        Self::new(CONTROL_X)
    }

    /// Evaluate at `t`. Inputs outside `[-1, 1]` continue the end segments.
    pub fn evaluate(&self, t: f32) -> f32 {
        let xs = &CONTROL_X;
        let mut lo = 0;
        let mut hi = xs.len() - 1;
        while hi - lo > 1 {
            let mid = (lo + hi) / 2;
            if xs[mid] <= t {
                lo = mid;
            } else {
                hi = mid;
            }
        }

        let h = KNOT_SPACING;
        let (a, b) = (xs[hi] - t, t - xs[lo]);
        self.m[lo] * a.powi(3) / (6.0 * h)
            + self.m[hi] * b.powi(3) / (6.0 * h)
            + (self.y[lo] / h - self.m[lo] * h / 6.0) * a
            + (self.y[hi] / h - self.m[hi] * h / 6.0) * b
    }
}

/// Map every batch sample of `image` through its own tone curve.
///
/// `control` holds one row of four values per batch sample. The output is not
/// clamped.
pub fn tone_curve(image: &Image, control: &[[f32; 4]]) -> Result<Image> {
    if control.len() != image.batch() {
        return Err(PlasmaError::shape(
            "tone_curve",
            format!("{} control rows", image.batch()),
            format!("{} control rows", control.len()),
        ));
    }
    let mut out = image.clone();
    let chunk = image.shape().len() / image.batch().max(1);
    if chunk == 0 {
        return Ok(out);
    }
    for (sample, row) in out.data_mut().chunks_exact_mut(chunk).zip(control) {
        let curve = NaturalCubicCurve::new(*row);
        sample.iter_mut().for_each(|v| *v = curve.evaluate(*v));
    }
    Ok(out)
}
