// argus_core/src/types.rs

use nalgebra::{SMatrix, SVector, Vector2, Vector3};

// --- Core Type Aliases ---
/// A 7-element pose vector `[px, py, pz, qx, qy, qz, qw]`.
pub type Vec7 = SVector<f64, 7>;
/// Covariance (or Jacobian) matrix matching a `Vec7`.
pub type Mat7 = SMatrix<f64, 7, 7>;

/// A point on the normalized image plane (z = 1).
pub type NormalizedPoint = Vector2<f64>;
/// A pixel coordinate `(u, v)`.
pub type Pixel = Vector2<f64>;
/// A 3D direction or point expressed in the sensor frame.
pub type SensorPoint = Vector3<f64>;

/// Number of scalars in a pose vector.
pub const POSE_DIM: usize = 7;

// --- Core Identifier ---
/// A generic, framework-agnostic identifier for a map, robot or sensor.
/// On a real robot this might be a hardware id; a host application can use
/// whatever stable integer it already keys its entities with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FrameHandle(pub u64);
