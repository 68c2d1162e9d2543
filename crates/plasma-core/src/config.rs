//! Tunable parameters for every spatial operator.
//!
//! Kernel sizes, grid sizes and fusion exponents are tuning knobs rather than
//! correctness constants, so they live here with serde support instead of
//! being hardcoded at call sites. `Default` reproduces the stock look.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default bilateral memory budget: 1 GiB.
const DEFAULT_GRID_BUDGET_BYTES: u64 = 1 << 30;

/// Bilateral grid filter configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BilateralParams {
    /// Gaussian kernel size `[intensity, spatial]`. Both odd.
    pub kernel_size: [usize; 2],
    /// Grid size `[intensity bins, spatial bins y, spatial bins x]`.
    pub grid_size: [usize; 3],
}

impl BilateralParams {
    pub const fn new(kernel_size: [usize; 2], grid_size: [usize; 3]) -> Self {
        Self {
            kernel_size,
            grid_size,
        }
    }
}

impl Default for BilateralParams {
    fn default() -> Self {
        Self::new([5, 11], [16, 64, 64])
    }
}

/// Upper bound on bilateral grid memory.
///
/// Peak usage for one channel is four `f32` volumes of
/// `N × intensity × spatial_y × spatial_x` elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridBudget {
    pub max_bytes: u64,
}

impl Default for GridBudget {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_GRID_BUDGET_BYTES,
        }
    }
}

/// Mertens exposure fusion weighting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionParams {
    /// Exponent on the contrast (Laplacian) criterion, in `[0, 1]`.
    pub omega_contrast: f32,
    /// Exponent on the well-exposedness criterion, in `[0, 1]`.
    pub omega_exposure: f32,
    /// Exponent on the saturation criterion, in `[0, 1]`.
    pub omega_saturation: f32,
    /// Center of the well-exposedness Gaussian. `0.0` is mid-gray in `[-1, 1]`.
    pub exposure_mean: f32,
    /// Width of the well-exposedness Gaussian.
    pub exposure_sigma: f32,
    /// Floor added to every weight before normalization.
    pub epsilon: f32,
    /// Smallest allowed side length of the coarsest pyramid level.
    pub peak_level: usize,
}

impl Default for FusionParams {
    fn default() -> Self {
        Self {
            omega_contrast: 0.0,
            omega_exposure: 1.0,
            omega_saturation: 1.0,
            exposure_mean: 0.0,
            exposure_sigma: 0.5,
            epsilon: 1e-8,
            peak_level: 8,
        }
    }
}

/// Spatial filter configuration for the adjustment layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterParams {
    /// Coarse local contrast, filtered on luma.
    pub clarity: BilateralParams,
    /// Fine local contrast, filtered on RGB.
    pub texture: BilateralParams,
    /// Shadow mask smoothing.
    pub shadows: BilateralParams,
    /// Gaussian kernel `[y, x]` for the sharpen base layer.
    pub sharpen_kernel: [usize; 2],
    /// Extra contrast applied after shadow recovery, scaled by `|weight|`.
    /// `0.0` disables it.
    pub shadow_contrast: f32,
    pub budget: GridBudget,
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            clarity: BilateralParams::new([7, 7], [36, 256, 256]),
            texture: BilateralParams::new([5, 5], [32, 1000, 1000]),
            shadows: BilateralParams::new([5, 11], [16, 64, 64]),
            sharpen_kernel: [5, 5],
            shadow_contrast: 0.2,
            budget: GridBudget::default(),
        }
    }
}

/// Every tunable in one place. Loaded from JSON by front ends.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlasmaParams {
    pub bilateral: BilateralParams,
    pub fusion: FusionParams,
    pub filters: FilterParams,
}

impl PlasmaParams {
    /// Parse parameters from JSON. Missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
