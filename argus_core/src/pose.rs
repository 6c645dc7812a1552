// argus_core/src/pose.rs

//! Poses as 7-vectors `[px, py, pz, qx, qy, qz, qw]`, optionally carrying a
//! full 7x7 covariance, and the frame composition used to chain a sensor
//! offset onto its parent frame.

use crate::error::SensorError;
use crate::types::{Mat7, Vec7};
use nalgebra::{
    Isometry3, Matrix3, Matrix3x4, Matrix4, Quaternion, Translation3, UnitQuaternion, Vector3,
    Vector4,
};

/// Quaternions whose norm is within this distance of 1 are left untouched.
const UNIT_NORM_TOLERANCE: f64 = 1e-9;

/// A pose with Gaussian uncertainty: mean 7-vector and its covariance.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianPose {
    /// Position followed by the orientation quaternion, `[x, y, z, qx, qy, qz, qw]`.
    pub mean: Vec7,
    /// The 7x7 covariance of `mean`.
    pub covariance: Mat7,
}

impl GaussianPose {
    /// Builds a pose from a mean and covariance.
    ///
    /// Mean and covariance are stored as given when the quaternion part is
    /// already unit. A quaternion that is merely off-norm is renormalized;
    /// the covariance is never touched.
    pub fn new(mean: Vec7, covariance: Mat7) -> Result<Self, SensorError> {
        Ok(Self {
            mean: normalized_pose_vector(mean)?,
            covariance,
        })
    }

    /// Re-checks the quaternion of a pose built field by field, e.g. one read
    /// back from an estimator whose state has drifted off the unit sphere.
    pub fn normalized(self) -> Result<Self, SensorError> {
        Self::new(self.mean, self.covariance)
    }

    /// A pose known exactly (zero covariance).
    pub fn deterministic(mean: Vec7) -> Result<Self, SensorError> {
        Self::new(mean, Mat7::zeros())
    }

    /// The identity frame with zero uncertainty.
    pub fn identity() -> Self {
        Self {
            mean: identity_pose_vector(),
            covariance: Mat7::zeros(),
        }
    }

    pub fn from_isometry(iso: &Isometry3<f64>, covariance: Mat7) -> Self {
        Self {
            mean: isometry_to_vec7(iso),
            covariance,
        }
    }

    pub fn to_isometry(&self) -> Isometry3<f64> {
        vec7_to_isometry(&self.mean)
    }

    pub fn position(&self) -> Vector3<f64> {
        self.mean.fixed_rows::<3>(0).into_owned()
    }

    pub fn orientation(&self) -> UnitQuaternion<f64> {
        self.to_isometry().rotation
    }

    /// True when every covariance entry is exactly zero.
    pub fn is_deterministic(&self) -> bool {
        self.covariance.iter().all(|v| *v == 0.0)
    }

    /// Chains `other` (expressed in this frame) onto this frame.
    ///
    /// The two inputs are treated as uncorrelated:
    /// `P = J1 * P1 * J1^T + J2 * P2 * J2^T`.
    pub fn compose(&self, other: &GaussianPose) -> GaussianPose {
        let (mean, j1, j2) = compose_frames(&self.mean, &other.mean);
        let covariance =
            j1 * self.covariance * j1.transpose() + j2 * other.covariance * j2.transpose();
        GaussianPose { mean, covariance }
    }
}

impl Default for GaussianPose {
    fn default() -> Self {
        Self::identity()
    }
}

// =========================================================================
// == Pose vector helpers ==
// =========================================================================

/// `[0, 0, 0, 0, 0, 0, 1]`.
pub fn identity_pose_vector() -> Vec7 {
    let mut v = Vec7::zeros();
    v[6] = 1.0;
    v
}

/// Checks the quaternion part of a pose vector and renormalizes it if needed.
pub fn normalized_pose_vector(mut pose: Vec7) -> Result<Vec7, SensorError> {
    let norm = pose.fixed_rows::<4>(3).norm();
    if !norm.is_finite() || norm < f64::EPSILON {
        return Err(SensorError::InvalidPose(format!(
            "orientation quaternion has norm {norm}"
        )));
    }
    if (norm - 1.0).abs() > UNIT_NORM_TOLERANCE {
        pose.fixed_rows_mut::<4>(3).unscale_mut(norm);
    }
    Ok(pose)
}

pub fn vec7_to_isometry(pose: &Vec7) -> Isometry3<f64> {
    Isometry3::from_parts(
        Translation3::new(pose[0], pose[1], pose[2]),
        // nalgebra's constructor takes (w, i, j, k).
        UnitQuaternion::from_quaternion(Quaternion::new(pose[6], pose[3], pose[4], pose[5])),
    )
}

pub fn isometry_to_vec7(iso: &Isometry3<f64>) -> Vec7 {
    let t = iso.translation.vector;
    let q = iso.rotation.coords; // stored as [i, j, k, w]
    Vec7::from_column_slice(&[t.x, t.y, t.z, q.x, q.y, q.z, q.w])
}

// =========================================================================
// == Frame composition with Jacobians ==
// =========================================================================

/// Hamilton product of two quaternions stored as `[x, y, z, w]`.
fn quaternion_product(a: &Vector4<f64>, b: &Vector4<f64>) -> Vector4<f64> {
    (Quaternion::from(*a) * Quaternion::from(*b)).coords
}

/// Rotates `v` by the (not necessarily unit) quaternion `q = [x, y, z, w]`:
/// `(w^2 - u.u) v + 2 (u.v) u + 2 w (u x v)`.
pub fn rotate_by_quaternion(q: &Vector4<f64>, v: &Vector3<f64>) -> Vector3<f64> {
    let u = q.xyz();
    let w = q.w;
    v * (w * w - u.dot(&u)) + u * (2.0 * u.dot(v)) + u.cross(v) * (2.0 * w)
}

/// Jacobian (3x4) of [`rotate_by_quaternion`] with respect to `q = [x, y, z, w]`.
pub fn rotate_by_quaternion_jacobian(q: &Vector4<f64>, v: &Vector3<f64>) -> Matrix3x4<f64> {
    let u = q.xyz();
    let w = q.w;
    let d_du = (Matrix3::identity() * u.dot(v) + u * v.transpose() - v * u.transpose()
        - v.cross_matrix() * w)
        * 2.0;
    let d_dw = (v * w + u.cross(v)) * 2.0;

    let mut jac = Matrix3x4::zeros();
    jac.fixed_view_mut::<3, 3>(0, 0).copy_from(&d_du);
    jac.set_column(3, &d_dw);
    jac
}

/// Composes two frames `f = f1 ∘ f2`, where `f2` is expressed in `f1`.
///
/// Returns the composed pose vector and the Jacobians with respect to `f1`
/// and `f2`.
pub fn compose_frames(f1: &Vec7, f2: &Vec7) -> (Vec7, Mat7, Mat7) {
    let p1: Vector3<f64> = f1.fixed_rows::<3>(0).into_owned();
    let q1: Vector4<f64> = f1.fixed_rows::<4>(3).into_owned();
    let p2: Vector3<f64> = f2.fixed_rows::<3>(0).into_owned();
    let q2: Vector4<f64> = f2.fixed_rows::<4>(3).into_owned();

    let p = p1 + rotate_by_quaternion(&q1, &p2);
    let q = quaternion_product(&q1, &q2);

    let mut composed = Vec7::zeros();
    composed.fixed_rows_mut::<3>(0).copy_from(&p);
    composed.fixed_rows_mut::<4>(3).copy_from(&q);

    // The quaternion product is bilinear, so each Jacobian column is the
    // product with a basis quaternion.
    let mut dq_dq1 = Matrix4::zeros();
    let mut dq_dq2 = Matrix4::zeros();
    for j in 0..4 {
        let e = Vector4::ith(j, 1.0);
        dq_dq1.set_column(j, &quaternion_product(&e, &q2));
        dq_dq2.set_column(j, &quaternion_product(&q1, &e));
    }

    let mut dp_dp2 = Matrix3::zeros();
    for j in 0..3 {
        dp_dp2.set_column(j, &rotate_by_quaternion(&q1, &Vector3::ith(j, 1.0)));
    }

    let mut j1 = Mat7::zeros();
    j1.fixed_view_mut::<3, 3>(0, 0).copy_from(&Matrix3::identity());
    j1.fixed_view_mut::<3, 4>(0, 3)
        .copy_from(&rotate_by_quaternion_jacobian(&q1, &p2));
    j1.fixed_view_mut::<4, 4>(3, 3).copy_from(&dq_dq1);

    let mut j2 = Mat7::zeros();
    j2.fixed_view_mut::<3, 3>(0, 0).copy_from(&dp_dp2);
    j2.fixed_view_mut::<4, 4>(3, 3).copy_from(&dq_dq2);

    (composed, j1, j2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;

    const EPS: f64 = 1e-9;

    fn pose(t: Vector3<f64>, axis: Vector3<f64>, angle: f64) -> Vec7 {
        let iso = Isometry3::from_parts(
            Translation3::from(t),
            UnitQuaternion::from_axis_angle(&nalgebra::Unit::new_normalize(axis), angle),
        );
        isometry_to_vec7(&iso)
    }

    #[test]
    fn test_gaussian_pose_preserves_unit_mean_and_covariance() {
        let mean = pose(Vector3::new(1.0, 2.0, 3.0), Vector3::z_axis().into_inner(), 0.3);
        let mut cov = Mat7::identity() * 0.01;
        cov[(0, 1)] = 0.002;
        cov[(1, 0)] = 0.002;

        let g = GaussianPose::new(mean, cov).unwrap();
        assert_eq!(g.mean, mean);
        assert_eq!(g.covariance, cov);
    }

    #[test]
    fn test_gaussian_pose_renormalizes_quaternion_only() {
        let mut mean = Vec7::from_column_slice(&[1.0, 2.0, 3.0, 0.0, 0.0, 0.0, 2.0]);
        let cov = Mat7::identity();
        let g = GaussianPose::new(mean, cov).unwrap();
        mean[6] = 1.0;
        assert_eq!(g.mean, mean);
        assert_eq!(g.covariance, cov);
    }

    #[test]
    fn test_zero_quaternion_is_rejected() {
        let err = GaussianPose::deterministic(Vec7::zeros()).unwrap_err();
        assert!(matches!(err, SensorError::InvalidPose(_)));
    }

    #[test]
    fn test_isometry_round_trip() {
        let v = pose(Vector3::new(-1.0, 0.5, 2.0), Vector3::new(1.0, 1.0, 0.0), 0.7);
        let back = isometry_to_vec7(&vec7_to_isometry(&v));
        assert_abs_diff_eq!(back, v, epsilon = EPS);
    }

    #[test]
    fn test_compose_matches_isometry_product() {
        let a = pose(Vector3::new(1.0, 0.0, 0.0), Vector3::z_axis().into_inner(), FRAC_PI_2);
        let b = pose(Vector3::new(0.0, 2.0, 0.5), Vector3::x_axis().into_inner(), 0.2);
        let (c, _, _) = compose_frames(&a, &b);
        let expected = vec7_to_isometry(&a) * vec7_to_isometry(&b);
        assert_abs_diff_eq!(c, isometry_to_vec7(&expected), epsilon = EPS);
        // The robot faces +Y, so its local +Y offset lands on world -X.
        assert_abs_diff_eq!(c[0], -1.0, epsilon = EPS);
        assert_abs_diff_eq!(c[1], 0.0, epsilon = EPS);
    }

    #[test]
    fn test_compose_jacobians_match_finite_differences() {
        let a = pose(Vector3::new(0.3, -0.2, 1.0), Vector3::new(0.2, 1.0, -0.4), 0.9);
        let b = pose(Vector3::new(0.1, 0.4, -0.7), Vector3::new(-1.0, 0.3, 0.5), -0.6);
        let (_, j1, j2) = compose_frames(&a, &b);

        let h = 1e-6;
        for j in 0..7 {
            let mut ap = a;
            let mut am = a;
            ap[j] += h;
            am[j] -= h;
            let col = (compose_frames(&ap, &b).0 - compose_frames(&am, &b).0) / (2.0 * h);
            assert_abs_diff_eq!(col, j1.column(j).into_owned(), epsilon = 1e-6);

            let mut bp = b;
            let mut bm = b;
            bp[j] += h;
            bm[j] -= h;
            let col = (compose_frames(&a, &bp).0 - compose_frames(&a, &bm).0) / (2.0 * h);
            assert_abs_diff_eq!(col, j2.column(j).into_owned(), epsilon = 1e-6);
        }
    }

    #[test]
    fn test_compose_with_deterministic_offset_only_propagates_parent_covariance() {
        let parent = GaussianPose::new(
            pose(Vector3::new(1.0, 1.0, 0.0), Vector3::z_axis().into_inner(), 0.4),
            Mat7::identity() * 0.1,
        )
        .unwrap();
        let offset = GaussianPose::identity();
        let composed = parent.compose(&offset);
        assert_abs_diff_eq!(composed.mean, parent.mean, epsilon = EPS);
        assert_abs_diff_eq!(composed.covariance, parent.covariance, epsilon = EPS);
    }
}
