// argus_core/src/prelude.rs

// --- Core Abstractions (The main contracts of the library) ---
pub use crate::abstractions::{MapEntity, RobotEntity};
pub use crate::models::perception::SensorModel;

// --- Core Data Structures (The "nouns" of the library) ---
pub use crate::error::SensorError;
pub use crate::frames::{FrameAwareState, FrameId, StateSlot, StateVariable};
pub use crate::pose::GaussianPose;
pub use crate::sensor::{Attachment, DynSensor, PinholeSensor, RobotMount, Sensor};
pub use crate::types::{FrameHandle, Mat7, NormalizedPoint, Pixel, SensorPoint, Vec7};

// --- Concrete Model Implementations ---
pub use crate::models::perception::correction::{
    fit_correction, round_trip_report, CorrectionFit, CorrectionFitError, RoundTripReport,
};
pub use crate::models::perception::pinhole::{
    ImageShape, PinholeModel, PinholeParameters, RawImage, PINHOLE_TYPE_TAG,
};
