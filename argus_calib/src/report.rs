// argus_calib/src/report.rs

use crate::config::{CameraConfig, FitConfig};
use anyhow::{Context, Result};
use argus_core::prelude::*;
use log::{info, warn};
use serde::Serialize;

/// Order used when the file carries no correction and none is requested.
pub const DEFAULT_ORDER: usize = 3;

/// The calibration written back out by the tool.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CalibrationOutcome {
    pub name: String,
    pub intrinsic: Vec<f64>,
    pub distortion: Vec<f64>,
    pub correction: Vec<f64>,
    pub image: ImageShape,
    pub round_trip: RoundTripSummary,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct RoundTripSummary {
    pub max_error: f64,
    pub mean_error: f64,
    pub max_error_px: f64,
    pub samples: usize,
    pub tolerance: f64,
    pub within_tolerance: bool,
    /// Residual of the radial fit, when one was run.
    pub fit_max_residual: Option<f64>,
}

impl CalibrationOutcome {
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize the calibration")
    }
}

/// Configures a pin-hole model from `camera`, fits its correction when asked
/// to (or when the file has none), and measures the round trip.
///
/// A round trip outside `settings.tolerance` is reported, not rejected.
pub fn run(camera: &CameraConfig, settings: &FitConfig) -> Result<CalibrationOutcome> {
    let mut model = PinholeModel::new();
    model
        .configure(
            &camera.intrinsic,
            &camera.distortion,
            &camera.correction,
            camera.width,
            camera.height,
        )
        .with_context(|| format!("Camera '{}' has an invalid calibration", camera.name))?;

    let order = match settings.order {
        Some(order) => Some(order),
        None if camera.correction.is_empty() && !camera.distortion.is_empty() => {
            Some(DEFAULT_ORDER)
        }
        None => None,
    };

    let mut fit_max_residual = None;
    if let Some(order) = order {
        let fit = fit_correction(
            model.intrinsic(),
            model.distortion(),
            model.image_shape(),
            order,
            settings.samples,
        )
        .with_context(|| format!("Could not fit an order-{order} correction"))?;
        info!(
            "'{}': fitted {} correction coefficients (max radial residual {:.3e})",
            camera.name,
            fit.coefficients.len(),
            fit.max_residual
        );
        let parameters = PinholeParameters {
            correction: fit.coefficients,
            ..model.parameters().clone()
        };
        let shape = model.image_shape();
        model.configure_with(&parameters, shape)?;
        fit_max_residual = Some(fit.max_residual);
    }

    let report = round_trip_report(&model, settings.grid)
        .context("Could not evaluate the distortion round trip")?;
    let within_tolerance = report.within(settings.tolerance);
    if within_tolerance {
        info!(
            "'{}': round trip max {:.3e} ({:.3} px) over {} points",
            camera.name, report.max_error, report.max_error_px, report.samples
        );
    } else {
        warn!(
            "'{}': round trip max {:.3e} exceeds tolerance {:.1e}",
            camera.name, report.max_error, settings.tolerance
        );
    }

    Ok(CalibrationOutcome {
        name: camera.name.clone(),
        intrinsic: model.intrinsic().as_slice().to_vec(),
        distortion: model.distortion().to_vec(),
        correction: model.correction().to_vec(),
        image: model.image_shape(),
        round_trip: RoundTripSummary {
            max_error: report.max_error,
            mean_error: report.mean_error,
            max_error_px: report.max_error_px,
            samples: report.samples,
            tolerance: settings.tolerance,
            within_tolerance,
            fit_max_residual,
        },
    })
}
