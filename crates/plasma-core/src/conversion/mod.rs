//! Color-space conversion — pointwise RGB ↔ YUV and luminance.

pub mod yuv;

pub use yuv::{rgb_to_luminance, rgb_to_yuv, yuv_to_rgb};
