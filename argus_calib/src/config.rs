// argus_calib/src/config.rs

//! Camera description files.
//!
//! ```toml
//! name = "front"
//! intrinsic = [500.0, 500.0, 320.0, 240.0]   # [αu, αv, u0, v0]
//! distortion = [-0.1, 0.01]
//! correction = []
//! width = 640
//! height = 480
//!
//! [fit]
//! order = 3
//! tolerance = 1e-4
//! ```
//!
//! Any key can be overridden from the environment with the `ARGUS_` prefix,
//! nested keys separated by `__` (e.g. `ARGUS_FIT__ORDER=4`).

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;
use std::path::Path;

/// The environment prefix for overrides.
pub const ENV_PREFIX: &str = "ARGUS_";

/// Top-level keys an `ARGUS_*` variable may override. Anything else sharing
/// the prefix belongs to someone else and is ignored.
const CAMERA_KEYS: &[&str] = &[
    "name",
    "intrinsic",
    "distortion",
    "correction",
    "width",
    "height",
    "fit",
];

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)] // Fail if the TOML has fields not in our struct
pub struct CameraConfig {
    pub name: String,
    /// Kept as a list so that a wrong length is reported by the sensor core.
    pub intrinsic: Vec<f64>,
    #[serde(default)]
    pub distortion: Vec<f64>,
    #[serde(default)]
    pub correction: Vec<f64>,
    pub width: usize,
    pub height: usize,
    #[serde(default)] // Use default if the [fit] section is missing
    pub fit: FitConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FitConfig {
    /// Correction order to fit; `None` keeps the file's correction unless it
    /// is empty.
    #[serde(default)]
    pub order: Option<usize>,
    #[serde(default = "default_samples")]
    pub samples: usize,
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    #[serde(default = "default_grid")]
    pub grid: usize,
}

fn default_samples() -> usize {
    200
}

fn default_tolerance() -> f64 {
    1e-4
}

fn default_grid() -> usize {
    21
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            order: None,
            samples: default_samples(),
            tolerance: default_tolerance(),
            grid: default_grid(),
        }
    }
}

/// Loads a camera file, with `ARGUS_*` environment overrides on top.
pub fn load(path: &Path) -> Result<CameraConfig, figment::Error> {
    Figment::new()
        .merge(Toml::file(path))
        .merge(camera_env())
        .extract()
}

/// The `ARGUS_*` variables that name a camera field.
fn camera_env() -> Env {
    Env::prefixed(ENV_PREFIX).split("__").filter(|key| {
        let top = key.as_str().split('.').next().unwrap_or_default();
        CAMERA_KEYS.iter().any(|k| k.eq_ignore_ascii_case(top))
    })
}

/// Parses a camera description from a TOML string (no environment overrides).
pub fn from_toml_str(toml: &str) -> Result<CameraConfig, figment::Error> {
    Figment::new().merge(Toml::string(toml)).extract()
}
