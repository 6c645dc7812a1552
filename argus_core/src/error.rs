// argus_core/src/error.rs

use crate::frames::StateSlot;
use thiserror::Error;

/// Structural failures raised by sensor construction, attachment lookups and
/// calibration updates. Every variant is a deterministic caller error; none of
/// them is retried internally.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SensorError {
    /// The map or robot a sensor was asked to attach to no longer exists.
    #[error("invalid attachment: {0} reference is absent")]
    InvalidAttachment(&'static str),

    /// The entity a sensor is attached to was dropped after construction.
    #[error("attached {0} has been dropped")]
    DanglingAttachment(&'static str),

    /// The requested operation does not apply to this sensor's attachment.
    #[error("operation `{0}` is not supported by this attachment")]
    AttachmentMismatch(&'static str),

    /// The robot no longer exposes the in-filter slot holding the sensor offset.
    #[error("robot state has no pose block at index {}", .0.start)]
    MissingStateSlot(StateSlot),

    /// `configure` was called with an intrinsic vector that is not 4 long, or
    /// with an empty image.
    #[error(
        "invalid calibration shape: intrinsic has {intrinsic_len} entries (expected 4), \
         image is {width}x{height}"
    )]
    InvalidCalibrationShape {
        intrinsic_len: usize,
        width: usize,
        height: usize,
    },

    /// A pose whose orientation cannot be turned into a unit quaternion.
    #[error("invalid pose: {0}")]
    InvalidPose(String),

    /// The in-filter state refused to grow (duplicate or malformed layout).
    #[error("state conflict: {0}")]
    StateConflict(String),
}
