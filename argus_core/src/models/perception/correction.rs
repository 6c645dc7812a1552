// argus_core/src/models/perception/correction.rs

//! Fitting of the correction polynomial and round-trip quality checks.
//!
//! The correction polynomial is only an approximate inverse of the distortion
//! polynomial. It is fitted by linear least squares over the radii actually
//! seen by the image:
//!
//! 1. Sample observed radii `r_d` from the image centre out to the farthest corner.
//! 2. Invert the distortion for each sample (Newton on `r_u · s_d(r_u²) = r_d`).
//! 3. Solve `r_d · (1 + c1·r_d² + ... + cn·r_d²ⁿ) ≈ r_u` for `c` via SVD.
//!
//! How much residual is acceptable is a calibration-quality decision left to
//! the caller; [`RoundTripReport::within`] takes the tolerance explicitly.

use crate::models::perception::pinhole::{ImageShape, PinholeModel};
use crate::models::perception::projection::{
    depixellize, distort_point, radial_factor, undistort_point,
};
use crate::types::{NormalizedPoint, Pixel};
use log::{debug, trace};
use nalgebra::{DMatrix, DVector, Vector4};
use thiserror::Error;

const NEWTON_ITERATIONS: usize = 30;
const NEWTON_TOLERANCE: f64 = 1e-14;

/// Errors that can occur while fitting a correction model.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CorrectionFitError {
    /// Not enough radial samples for the requested polynomial order.
    #[error("need at least {0} samples for the correction fit, got {1}")]
    NotEnoughSamples(usize, usize),
    /// Zero-sized image or zero focal length.
    #[error("image shape or intrinsic parameters are degenerate")]
    InvalidShape,
    /// The image covers no measurable radius.
    #[error("degenerate field of view: maximum radius is {0}")]
    DegenerateField(f64),
    /// The distortion folds back on itself inside the field of view.
    #[error("distortion is not invertible at observed radius {0}")]
    NonInvertible(f64),
    /// Newton's method ran out of iterations before settling.
    #[error("distortion inversion did not converge at observed radius {0}")]
    NotConverged(f64),
    /// SVD failed during the least-squares solve.
    #[error("svd failed during correction estimation")]
    SvdFailed,
}

/// The result of [`fit_correction`].
#[derive(Debug, Clone, PartialEq)]
pub struct CorrectionFit {
    /// Correction coefficients `[c1, ..., cn]`.
    pub coefficients: DVector<f64>,
    /// Largest `|correct(r_d) - r_u|` over the samples, in normalized units.
    pub max_residual: f64,
    /// Root mean square of the same residual.
    pub rms_residual: f64,
}

/// Largest normalized radius observed by the image (its farthest corner).
pub fn max_observed_radius(intrinsic: &Vector4<f64>, shape: ImageShape) -> f64 {
    let (w, h) = (shape.width as f64, shape.height as f64);
    [(0.0, 0.0), (w, 0.0), (0.0, h), (w, h)]
        .iter()
        .map(|(u, v)| depixellize(intrinsic, &Pixel::new(*u, *v)).norm())
        .fold(0.0, f64::max)
}

/// Solves `r_u · s_d(r_u²) = r_d` for `r_u`.
fn invert_radial_distortion(distortion: &[f64], r_d: f64) -> Result<f64, CorrectionFitError> {
    newton_invert(distortion, r_d, NEWTON_ITERATIONS)
}

fn newton_invert(
    distortion: &[f64],
    r_d: f64,
    max_iterations: usize,
) -> Result<f64, CorrectionFitError> {
    let mut r_u = r_d;
    for _ in 0..max_iterations {
        let r2 = r_u * r_u;
        let g = r_u * radial_factor(distortion, r2) - r_d;
        // d/dr_u of r_u·s(r_u²) = 1 + Σ (2i + 1)·dᵢ·r_u²ⁱ
        let dg: f64 = 1.0
            + distortion
                .iter()
                .enumerate()
                .map(|(i, d)| (2 * i + 3) as f64 * d * r2.powi(i as i32 + 1))
                .sum::<f64>();
        if dg <= 0.0 {
            return Err(CorrectionFitError::NonInvertible(r_d));
        }
        let step = g / dg;
        r_u -= step;
        if step.abs() < NEWTON_TOLERANCE {
            return Ok(r_u);
        }
    }
    Err(CorrectionFitError::NotConverged(r_d))
}

/// Fits `order` correction coefficients approximating the inverse of
/// `distortion` over the image's field of view.
///
/// `order == 0` is valid and yields an empty (identity) correction; its
/// residuals then measure how far the uncorrected distortion is from ideal.
pub fn fit_correction(
    intrinsic: &Vector4<f64>,
    distortion: &[f64],
    shape: ImageShape,
    order: usize,
    samples: usize,
) -> Result<CorrectionFit, CorrectionFitError> {
    if shape.width == 0 || shape.height == 0 || intrinsic[0] == 0.0 || intrinsic[1] == 0.0 {
        return Err(CorrectionFitError::InvalidShape);
    }
    let needed = order.max(1) + 1;
    if samples < needed {
        return Err(CorrectionFitError::NotEnoughSamples(needed, samples));
    }

    let r_d_max = max_observed_radius(intrinsic, shape);
    if !(r_d_max > 1e-6) {
        return Err(CorrectionFitError::DegenerateField(r_d_max));
    }

    let mut observed = Vec::with_capacity(samples);
    let mut ideal = Vec::with_capacity(samples);
    for i in 0..samples {
        let r_d = r_d_max * (i + 1) as f64 / samples as f64;
        observed.push(r_d);
        ideal.push(invert_radial_distortion(distortion, r_d)?);
    }

    // Each row: r_d · r_d²ʲ · c_j = r_u - r_d
    let mut a = DMatrix::<f64>::zeros(samples, order);
    let mut b = DVector::<f64>::zeros(samples);
    for (row, (r_d, r_u)) in observed.iter().zip(&ideal).enumerate() {
        let r2 = r_d * r_d;
        let mut power = *r_d;
        for col in 0..order {
            power *= r2;
            a[(row, col)] = power;
        }
        b[row] = r_u - r_d;
    }

    let coefficients = if order == 0 {
        DVector::zeros(0)
    } else {
        let svd = a.svd(true, true);
        svd.solve(&b, 1e-15).map_err(|_| CorrectionFitError::SvdFailed)?
    };

    let residuals: Vec<f64> = observed
        .iter()
        .zip(&ideal)
        .map(|(r_d, r_u)| (r_d * radial_factor(coefficients.as_slice(), r_d * r_d) - r_u).abs())
        .collect();
    let max_residual = residuals.iter().copied().fold(0.0, f64::max);
    let rms_residual =
        (residuals.iter().map(|r| r * r).sum::<f64>() / residuals.len() as f64).sqrt();

    trace!(
        "correction fit: r_d_max = {r_d_max:.6}, {samples} samples, order {order}, c = {:?}",
        coefficients.as_slice()
    );
    debug!("correction fit residual: max {max_residual:.3e}, rms {rms_residual:.3e}");

    Ok(CorrectionFit {
        coefficients,
        max_residual,
        rms_residual,
    })
}

/// Convenience wrapper fitting the correction of an already configured model.
pub fn fit_model_correction(
    model: &PinholeModel,
    order: usize,
    samples: usize,
) -> Result<CorrectionFit, CorrectionFitError> {
    fit_correction(
        model.intrinsic(),
        model.distortion(),
        model.image_shape(),
        order,
        samples,
    )
}

// =========================================================================
// == Round-trip quality ==
// =========================================================================

/// Statistics of `|correct(distort(p)) - p|` over the field of view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundTripReport {
    /// Largest error, normalized units.
    pub max_error: f64,
    /// Mean error, normalized units.
    pub mean_error: f64,
    /// Largest error scaled by the larger focal length, in pixels.
    pub max_error_px: f64,
    /// Number of evaluated points.
    pub samples: usize,
}

impl RoundTripReport {
    /// Whether the worst-case error is within `tolerance` (normalized units).
    pub fn within(&self, tolerance: f64) -> bool {
        self.max_error <= tolerance
    }
}

/// Evaluates the round trip on a `grid x grid` lattice of points spanning
/// the image, corners included.
pub fn round_trip_report(
    model: &PinholeModel,
    grid: usize,
) -> Result<RoundTripReport, CorrectionFitError> {
    if !model.is_configured() {
        return Err(CorrectionFitError::InvalidShape);
    }
    if grid < 2 {
        return Err(CorrectionFitError::NotEnoughSamples(2, grid));
    }

    let shape = model.image_shape();
    let k = model.intrinsic();
    let mut max_error: f64 = 0.0;
    let mut sum = 0.0;
    let mut count = 0;
    for i in 0..grid {
        for j in 0..grid {
            let u = Pixel::new(
                shape.width as f64 * i as f64 / (grid - 1) as f64,
                shape.height as f64 * j as f64 / (grid - 1) as f64,
            );
            let p: NormalizedPoint = depixellize(k, &u);
            let back = undistort_point(model.correction(), &distort_point(model.distortion(), &p));
            let err = (back - p).norm();
            max_error = max_error.max(err);
            sum += err;
            count += 1;
        }
    }

    Ok(RoundTripReport {
        max_error,
        mean_error: sum / count as f64,
        max_error_px: max_error * k[0].abs().max(k[1].abs()),
        samples: count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::Rng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    const K: [f64; 4] = [500.0, 500.0, 320.0, 240.0];
    const BARREL: [f64; 2] = [-0.1, 0.01];

    fn k() -> Vector4<f64> {
        Vector4::from_column_slice(&K)
    }

    fn model_with(correction: &[f64]) -> PinholeModel {
        let mut model = PinholeModel::new();
        model.configure(&K, &BARREL, correction, 640, 480).unwrap();
        model
    }

    #[test]
    fn test_max_observed_radius_is_the_corner() {
        // (320/500, 240/500) = (0.64, 0.48)
        let r = max_observed_radius(&k(), ImageShape::new(640, 480));
        assert!((r - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_inversion_recovers_distorted_radius() {
        for r_u in [0.05, 0.3, 0.7] {
            let r_d = r_u * radial_factor(&BARREL, r_u * r_u);
            let back = invert_radial_distortion(&BARREL, r_d).unwrap();
            assert!((back - r_u).abs() < 1e-12);
        }
    }

    #[test]
    fn test_no_distortion_fits_zero_correction() {
        let fit = fit_correction(&k(), &[], ImageShape::new(640, 480), 2, 50).unwrap();
        assert!(fit.coefficients.iter().all(|c| c.abs() < 1e-12));
        assert!(fit.max_residual < 1e-12);
    }

    #[test]
    fn test_fitted_round_trip_within_tolerance() {
        let fit = fit_correction(&k(), &BARREL, ImageShape::new(640, 480), 3, 200).unwrap();
        assert_eq!(fit.coefficients.len(), 3);
        // Leading term of the series inverse is -k1.
        assert!((fit.coefficients[0] - 0.1).abs() < 0.02);
        assert!(fit.max_residual < 1e-4);

        let model = model_with(fit.coefficients.as_slice());
        let report = round_trip_report(&model, 21).unwrap();
        assert_eq!(report.samples, 441);
        assert!(report.within(1e-4), "{report:?}");
        assert!(report.mean_error <= report.max_error);
    }

    #[test]
    fn test_higher_order_does_not_do_worse() {
        let shape = ImageShape::new(640, 480);
        let mut previous = f64::INFINITY;
        for order in 0..=4 {
            let fit = fit_correction(&k(), &BARREL, shape, order, 200).unwrap();
            assert!(fit.rms_residual <= previous * (1.0 + 1e-9) + 1e-14, "order {order}");
            previous = fit.rms_residual;
        }
    }

    #[test]
    fn test_uncorrected_round_trip_is_reported_not_failed() {
        let report = round_trip_report(&model_with(&[]), 11).unwrap();
        assert!(report.max_error > 1e-3);
        assert!(!report.within(1e-4));
    }

    #[test]
    fn test_random_points_inside_the_field_round_trip() {
        let fit = fit_correction(&k(), &BARREL, ImageShape::new(640, 480), 3, 200).unwrap();
        let model = model_with(fit.coefficients.as_slice());
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..500 {
            let u = Pixel::new(rng.gen_range(0.0..640.0), rng.gen_range(0.0..480.0));
            let p = depixellize(&k(), &u);
            let back = model.correct(&model.distort(&p));
            assert!((back - p).norm() < 1e-4);
        }
    }

    #[test]
    fn test_fit_errors() {
        let shape = ImageShape::new(640, 480);
        assert_eq!(
            fit_correction(&k(), &BARREL, ImageShape::new(0, 480), 2, 50),
            Err(CorrectionFitError::InvalidShape)
        );
        assert_eq!(
            fit_correction(&k(), &BARREL, shape, 4, 3),
            Err(CorrectionFitError::NotEnoughSamples(5, 3))
        );
        // Strong barrel distortion folds over before the corner.
        assert!(matches!(
            fit_correction(&k(), &[-2.0], shape, 2, 50),
            Err(CorrectionFitError::NonInvertible(_))
        ));
        assert_eq!(
            round_trip_report(&PinholeModel::new(), 5),
            Err(CorrectionFitError::InvalidShape)
        );
    }

    #[test]
    fn test_newton_inversion_reports_an_exhausted_budget() {
        assert_eq!(
            newton_invert(&BARREL, 0.8, 1),
            Err(CorrectionFitError::NotConverged(0.8))
        );

        let r_u = invert_radial_distortion(&BARREL, 0.8).unwrap();
        assert_abs_diff_eq!(r_u * radial_factor(&BARREL, r_u * r_u), 0.8, epsilon = 1e-12);
    }

    #[test]
    fn test_undistorted_input_inverts_immediately() {
        assert_eq!(newton_invert(&[], 0.5, 2), Ok(0.5));
    }
}
