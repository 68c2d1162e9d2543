//! Plasma Core — image adjustment and exposure fusion.
//!
//! This crate contains the tensor-style image type, bilateral grids, pyramid
//! blending, Mertens fusion and the photo adjustment filters. No GPU or
//! framework dependencies.

pub mod blending;
pub mod color;
pub mod config;
pub mod conversion;
pub mod error;
pub mod filters;
pub mod fusion;
pub mod image;
pub mod io;
pub mod sampling;
pub mod scene;
pub mod volume;

// Re-exports for convenience.
pub use config::{BilateralParams, FilterParams, FusionParams, GridBudget, PlasmaParams};
pub use error::{PlasmaError, Result};
pub use fusion::{exposure_fusion, fusion_weights};
pub use image::{Image, Shape, Weight};
pub use io::{read_image, read_lut_image, write_image};
pub use sampling::bilateral::bilateral_filter_2d;
pub use scene::{ImageScene, SceneClassifier, classify_scene};
pub use volume::{Volume, VolumeShape};
