// argus_calib/src/cli.rs

use crate::config::FitConfig;
use clap::Parser;
use std::path::PathBuf;

/// Argus calibration: fit and check the correction model of a pin-hole camera.
///
/// Values given on the command line override the `[fit]` table of the
/// camera file.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The path to the camera TOML file.
    #[arg(short, long, default_value = "assets/cameras/default.toml")]
    pub config: PathBuf,

    /// Number of correction coefficients to fit. 0 keeps the correction empty.
    #[arg(short, long)]
    pub order: Option<usize>,

    /// Number of radial samples used by the least-squares fit.
    #[arg(long)]
    pub samples: Option<usize>,

    /// Largest acceptable round-trip error, in normalized image units.
    #[arg(short, long)]
    pub tolerance: Option<f64>,

    /// Side of the evaluation lattice spanning the image.
    #[arg(long)]
    pub grid: Option<usize>,
}

impl Cli {
    /// Merges the command-line overrides onto the file settings.
    pub fn resolve(&self, file: &FitConfig) -> FitConfig {
        FitConfig {
            order: self.order.or(file.order),
            samples: self.samples.unwrap_or(file.samples),
            tolerance: self.tolerance.unwrap_or(file.tolerance),
            grid: self.grid.unwrap_or(file.grid),
        }
    }
}
