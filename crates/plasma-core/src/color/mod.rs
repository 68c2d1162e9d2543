//! Targeted color edits.

pub mod selective;

pub use selective::{selective_color, selective_color_weights};
