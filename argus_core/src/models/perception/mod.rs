// argus_core/src/models/perception/mod.rs

pub mod correction;
pub mod pinhole;
pub mod projection;

use dyn_clone::DynClone;
use std::any::Any;
use std::fmt::Debug;

/// The contract every sensor calibration model fulfils.
///
/// A model owns whatever maps 3D geometry to its raw measurements (for a
/// camera: intrinsic, distortion and correction parameters plus the pixel
/// buffer). The pose a sensor sits at is not the model's concern; see
/// [`crate::sensor::Sensor`].
pub trait SensorModel: DynClone + Debug + Send + Sync + 'static {
    /// The human-readable tag estimators dispatch on to select the matching
    /// observation model, e.g. `"Pin-hole-camera"`.
    fn type_tag(&self) -> &'static str;

    /// Allows for dynamic downcasting to the concrete model.
    fn as_any(&self) -> &dyn Any;
}

// Make the trait object cloneable.
dyn_clone::clone_trait_object!(SensorModel);
