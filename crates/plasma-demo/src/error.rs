//! Errors surfaced by the command line front end.

use std::path::PathBuf;

use plasma_core::PlasmaError;

#[derive(Debug, thiserror::Error)]
pub enum DemoError {
    #[error(transparent)]
    Plasma(#[from] PlasmaError),

    #[error("failed to read config {path}: {source}")]
    Config {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid {var}={value}: expected a positive integer")]
    Env { var: &'static str, value: String },

    #[error("failed to create {path}: {source}")]
    Output {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{0}")]
    Usage(String),
}

pub type DemoResult<T> = Result<T, DemoError>;
