//! Resampling, convolution, bilateral grids, and lookup tables.

pub mod bilateral;
pub mod blur;
pub mod lut;
pub mod resample;

pub use bilateral::{BilateralGrid, bilateral_filter_2d, slice, splat};
pub use blur::{Border, Kernel1D, KernelKind, box_blur_2d, gaussian_blur_2d};
pub use lut::{Lut1D, Lut3D, color_sample_1d, color_sample_3d};
pub use resample::{resize, resize_by, sample_bilinear, sample_trilinear};
