//! Photographic adjustments.
//!
//! - [`pointwise`]: per-pixel contrast, exposure and chroma edits
//! - [`spectral`]: local contrast, sharpening, highlight and shadow recovery
//! - [`tone`]: natural cubic tone curves
//! - [`gradient`]: radial and linear masks
//! - [`guided`] and [`laplacian`]: supporting spatial filters

pub mod gradient;
pub mod guided;
pub mod laplacian;
pub mod pointwise;
pub mod spectral;
pub mod tone;

pub use gradient::{
    GradientDirection, bottom_top_gradient, left_right_gradient, linear_gradient,
    radial_gradient, right_left_gradient, top_bottom_gradient,
};
pub use guided::guided_filter;
pub use laplacian::laplacian_of_gaussian;
pub use pointwise::{color_balance, contrast, exposure, saturation, temperature, tint};
pub use spectral::{clarity, highlights, shadows, sharpen, texture};
pub use tone::{NaturalCubicCurve, tone_curve};
