//! Multi-band pyramid blending and layer blend modes.

pub mod modes;
pub mod pyramid;

pub use modes::{blend_overlay, blend_soft_light};
pub use pyramid::{
    blend_pyramid, collapse_pyramid, gaussian_pyramid, laplacian_pyramid, max_pyramid_levels,
    pyramid_depth,
};
