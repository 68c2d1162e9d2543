//! Multi-exposure fusion.

pub mod mertens;

pub use mertens::{
    contrast_weight, exposure_fusion, exposure_weight, fusion_weights, normalize_weights,
    saturation_weight,
};
