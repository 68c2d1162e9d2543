//! Runtime configuration for the demo.

use std::path::Path;

use plasma_core::PlasmaParams;

use crate::error::{DemoError, DemoResult};

/// Environment variable capping the longer edge of loaded images.
const MAX_EDGE_VAR: &str = "PLASMA_MAX_EDGE";
/// Default longer-edge cap in pixels.
const DEFAULT_MAX_EDGE: u32 = 2048;

/// Runtime configuration for the Plasma demo.
#[derive(Debug, Clone)]
pub struct DemoConfig {
    /// Longer edge images are downscaled to on load. `None` keeps full size.
    pub max_edge: Option<u32>,
    /// Operator parameters.
    pub params: PlasmaParams,
}

impl DemoConfig {
    /// Build from defaults, an optional JSON parameter file and the environment.
    ///
    /// `cli_max_edge` beats `PLASMA_MAX_EDGE`, which beats the default.
    /// A value of 0 disables downscaling.
    pub fn load(params_path: Option<&Path>, cli_max_edge: Option<u32>) -> DemoResult<Self> {
        let params = match params_path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| DemoError::Config {
                    path: path.to_path_buf(),
                    source,
                })?;
                PlasmaParams::from_json(&text)?
            }
            None => PlasmaParams::default(),
        };
        let max_edge = match cli_max_edge {
            Some(edge) => edge,
            None => env_max_edge()?.unwrap_or(DEFAULT_MAX_EDGE),
        };
        Ok(Self {
            max_edge: (max_edge > 0).then_some(max_edge),
            params,
        })
    }
}

fn env_max_edge() -> DemoResult<Option<u32>> {
    match std::env::var(MAX_EDGE_VAR) {
        Ok(raw) if raw.trim().is_empty() => Ok(None),
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| DemoError::Env {
                var: MAX_EDGE_VAR,
                value: raw,
            }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_edge_overrides_default() {
        let config = DemoConfig::load(None, Some(512)).unwrap();
        assert_eq!(config.max_edge, Some(512));
        assert_eq!(config.params, PlasmaParams::default());
    }

    #[test]
    fn test_zero_edge_keeps_full_size() {
        let config = DemoConfig::load(None, Some(0)).unwrap();
        assert_eq!(config.max_edge, None);
    }

    #[test]
    fn test_missing_params_file_is_reported() {
        let err = DemoConfig::load(Some(Path::new("/nonexistent/plasma.json")), Some(1));
        assert!(matches!(err, Err(DemoError::Config { .. })));
    }
}
