// argus_core/src/abstractions.rs

//! Contracts of the collaborators a sensor attaches to. Maps and robots are
//! owned by the surrounding estimator; sensors only ever hold them through
//! `std::sync::Weak` and query them on demand.

use crate::error::SensorError;
use crate::frames::{StateSlot, StateVariable};
use crate::pose::GaussianPose;
use crate::types::FrameHandle;
use std::fmt::Debug;

// --- MAP ENTITY TRAIT ---
/// Any map that exposes a queryable reference frame.
pub trait MapEntity: Debug + Send + Sync {
    /// The map's own identifier.
    fn handle(&self) -> FrameHandle;

    /// The map frame expressed in the world frame, with its uncertainty.
    fn frame(&self) -> GaussianPose;
}

// --- ROBOT ENTITY TRAIT ---
/// A robot whose current pose can be read, and whose in-filter state can be
/// extended with the pose of a sensor mounted on it.
pub trait RobotEntity: Debug + Send + Sync {
    /// The robot's own identifier.
    fn handle(&self) -> FrameHandle;

    /// The current estimate of the robot body pose in the world frame.
    fn pose(&self) -> GaussianPose;

    /// Appends a pose block (a sensor-to-robot offset) to the robot's
    /// in-filter state vector and returns where it landed.
    ///
    /// Implementations usually wrap their `FrameAwareState` in a lock and
    /// delegate to [`crate::frames::FrameAwareState::append`].
    fn extend_state(
        &self,
        layout: Vec<StateVariable>,
        initial: &GaussianPose,
    ) -> Result<StateSlot, SensorError>;

    /// Reads the current estimate of a pose block previously appended with
    /// [`RobotEntity::extend_state`]. `None` if the slot no longer exists.
    fn state_pose(&self, slot: StateSlot) -> Option<GaussianPose>;
}
