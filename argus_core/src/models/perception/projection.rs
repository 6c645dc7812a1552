// argus_core/src/models/perception/projection.rs

//! Pin-hole projection kernels with radial polynomial distortion.
//!
//! Intrinsic vectors are `k = [αu, αv, u0, v0]` (focal lengths in pixels, then
//! the principal point). Distortion and correction are both radial
//! polynomials in the squared radius:
//!
//! ```text
//! s(r²) = 1 + k1·r² + k2·r⁴ + ... + kn·r²ⁿ
//! distorted   = s_d(|up|²) · up
//! undistorted ≈ s_c(|dp|²) · dp
//! ```
//!
//! An empty coefficient slice gives `s ≡ 1`, i.e. the identity mapping.

use crate::models::perception::pinhole::ImageShape;
use crate::types::{NormalizedPoint, Pixel, SensorPoint};
use nalgebra::{Matrix2, Matrix2x3, Vector4};

/// `s(r²) = 1 + Σ cᵢ r²ⁱ`.
pub fn radial_factor(coeffs: &[f64], r2: f64) -> f64 {
    let mut s = 1.0;
    let mut r2i = 1.0;
    for c in coeffs {
        r2i *= r2;
        s += c * r2i;
    }
    s
}

/// `ds/d(r²) = Σ i·cᵢ r²⁽ⁱ⁻¹⁾`.
fn radial_factor_derivative(coeffs: &[f64], r2: f64) -> f64 {
    let mut ds = 0.0;
    let mut r2i = 1.0; // r² to the power (i - 1)
    for (i, c) in coeffs.iter().enumerate() {
        ds += (i + 1) as f64 * c * r2i;
        r2i *= r2;
    }
    ds
}

/// Applies a radial polynomial and returns the mapped point with its 2x2 Jacobian.
fn apply_radial_with_jacobian(
    coeffs: &[f64],
    p: &NormalizedPoint,
) -> (NormalizedPoint, Matrix2<f64>) {
    let r2 = p.norm_squared();
    let s = radial_factor(coeffs, r2);
    let ds_dr2 = radial_factor_derivative(coeffs, r2);
    // d(s·p)/dp = s·I + p · (ds/dr2 · 2p)^T
    let jac = Matrix2::identity() * s + p * p.transpose() * (2.0 * ds_dr2);
    (p * s, jac)
}

// =========================================================================
// == Normalized plane ==
// =========================================================================

/// Projects a direction in the sensor frame onto the normalized plane z = 1.
pub fn project_to_normalized(v: &SensorPoint) -> NormalizedPoint {
    NormalizedPoint::new(v.x / v.z, v.y / v.z)
}

pub fn project_to_normalized_with_jacobian(v: &SensorPoint) -> (NormalizedPoint, Matrix2x3<f64>) {
    let inv_z = 1.0 / v.z;
    let up = NormalizedPoint::new(v.x * inv_z, v.y * inv_z);
    #[rustfmt::skip]
    let jac = Matrix2x3::new(
        inv_z, 0.0,   -up.x * inv_z,
        0.0,   inv_z, -up.y * inv_z,
    );
    (up, jac)
}

// =========================================================================
// == Distortion / correction ==
// =========================================================================

/// Maps an ideal normalized point to where the lens actually images it.
pub fn distort_point(d: &[f64], up: &NormalizedPoint) -> NormalizedPoint {
    up * radial_factor(d, up.norm_squared())
}

pub fn distort_point_with_jacobian(
    d: &[f64],
    up: &NormalizedPoint,
) -> (NormalizedPoint, Matrix2<f64>) {
    apply_radial_with_jacobian(d, up)
}

/// Maps an observed normalized point back toward its ideal position using the
/// correction polynomial. This is an approximation of the inverse of
/// [`distort_point`], not an exact one.
pub fn undistort_point(c: &[f64], dp: &NormalizedPoint) -> NormalizedPoint {
    dp * radial_factor(c, dp.norm_squared())
}

pub fn undistort_point_with_jacobian(
    c: &[f64],
    dp: &NormalizedPoint,
) -> (NormalizedPoint, Matrix2<f64>) {
    apply_radial_with_jacobian(c, dp)
}

// =========================================================================
// == Pixel plane ==
// =========================================================================

pub fn pixellize(k: &Vector4<f64>, p: &NormalizedPoint) -> Pixel {
    Pixel::new(k[2] + k[0] * p.x, k[3] + k[1] * p.y)
}

pub fn pixellize_with_jacobian(k: &Vector4<f64>, p: &NormalizedPoint) -> (Pixel, Matrix2<f64>) {
    (pixellize(k, p), Matrix2::new(k[0], 0.0, 0.0, k[1]))
}

pub fn depixellize(k: &Vector4<f64>, u: &Pixel) -> NormalizedPoint {
    NormalizedPoint::new((u.x - k[2]) / k[0], (u.y - k[3]) / k[1])
}

/// True when the pixel falls on the image, `[0, width) x [0, height)`.
pub fn is_in_image(u: &Pixel, shape: &ImageShape) -> bool {
    u.x >= 0.0 && u.y >= 0.0 && u.x < shape.width as f64 && u.y < shape.height as f64
}

// =========================================================================
// == Full chains ==
// =========================================================================

/// Sensor-frame point → pixel: normalize, distort, pixellize.
pub fn project_point(k: &Vector4<f64>, d: &[f64], v: &SensorPoint) -> Pixel {
    pixellize(k, &distort_point(d, &project_to_normalized(v)))
}

/// As [`project_point`], also returning `∂pixel/∂v` (2x3).
pub fn project_point_with_jacobian(
    k: &Vector4<f64>,
    d: &[f64],
    v: &SensorPoint,
) -> (Pixel, Matrix2x3<f64>) {
    let (up, up_v) = project_to_normalized_with_jacobian(v);
    let (dp, dp_up) = distort_point_with_jacobian(d, &up);
    let (u, u_dp) = pixellize_with_jacobian(k, &dp);
    (u, u_dp * dp_up * up_v)
}

/// Pixel → sensor-frame point at the given depth (distance along the optical
/// axis): depixellize, correct, scale.
pub fn backproject_pixel(k: &Vector4<f64>, c: &[f64], u: &Pixel, depth: f64) -> SensorPoint {
    let up = undistort_point(c, &depixellize(k, u));
    SensorPoint::new(up.x, up.y, 1.0) * depth
}
