//! Error taxonomy shared by every operator in the crate.

use std::path::PathBuf;

/// Result alias used throughout Plasma.
pub type Result<T> = std::result::Result<T, PlasmaError>;

#[derive(Debug, thiserror::Error)]
pub enum PlasmaError {
    /// Operand dimensions are incompatible. Never broadcast silently.
    #[error("{op}: shape mismatch, expected {expected}, found {actual}")]
    ShapeMismatch {
        op: &'static str,
        expected: String,
        actual: String,
    },
    /// A value lies outside its documented range.
    #[error("{what} out of range: expected [{min}, {max}], found {found}")]
    OutOfRange {
        what: &'static str,
        min: f32,
        max: f32,
        found: f32,
    },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Grid or buffer allocation would exceed the configured budget, or failed outright.
    #[error("resource exhausted: {requested} bytes requested, budget is {budget} bytes")]
    ResourceExhausted { requested: u64, budget: u64 },
    #[error("unsupported pyramid depth: {requested} levels requested, at most {max} allowed")]
    PyramidDepth { requested: usize, max: usize },
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("LUT parse error at line {line}: {message}")]
    LutParse { line: usize, message: String },
    #[error("invalid parameters: {0}")]
    Params(#[from] serde_json::Error),
}

impl PlasmaError {
    pub(crate) fn shape(
        op: &'static str,
        expected: impl std::fmt::Display,
        actual: impl std::fmt::Display,
    ) -> Self {
        Self::ShapeMismatch {
            op,
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}
