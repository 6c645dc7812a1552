// argus_core/src/sensor/attachment.rs

use crate::abstractions::{MapEntity, RobotEntity};
use crate::error::SensorError;
use crate::frames::StateSlot;
use crate::pose::GaussianPose;
use crate::types::Vec7;
use std::sync::Weak;

/// How a robot-mounted sensor's offset to the robot body is known.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RobotMount {
    /// The offset is part of the robot's in-filter state and is refined by
    /// the estimator's update step. `slot` locates it in that state.
    InFilter { slot: StateSlot },
    /// The offset is a pre-calibrated constant.
    Fixed { offset: Vec7 },
}

/// Where a sensor's pose comes from. Chosen at construction, never changed.
#[derive(Debug, Clone)]
pub enum Attachment {
    /// The sensor owns an uncertain pose directly.
    Gaussian(GaussianPose),
    /// The sensor owns an exactly known pose.
    Deterministic(Vec7),
    /// The pose is the map's reference frame composed with a fixed mounting.
    Map {
        map: Weak<dyn MapEntity>,
        mounting: Vec7,
    },
    /// The pose is the robot's current pose composed with the sensor offset.
    Robot {
        robot: Weak<dyn RobotEntity>,
        mount: RobotMount,
    },
}

impl Attachment {
    /// A short name for logs and diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Attachment::Gaussian(_) => "gaussian",
            Attachment::Deterministic(_) => "deterministic",
            Attachment::Map { .. } => "map",
            Attachment::Robot {
                mount: RobotMount::InFilter { .. },
                ..
            } => "robot (in-filter)",
            Attachment::Robot {
                mount: RobotMount::Fixed { .. },
                ..
            } => "robot (fixed)",
        }
    }

    /// Resolves the effective pose in the world frame.
    ///
    /// Map and robot references are upgraded only for the duration of the
    /// lookup; a dropped entity yields `DanglingAttachment`. Poses read from
    /// collaborators are renormalized before composition, so an estimator
    /// quaternion that drifted off unit norm never scales the mounting.
    pub fn resolve(&self) -> Result<GaussianPose, SensorError> {
        match self {
            Attachment::Gaussian(pose) => pose.clone().normalized(),
            Attachment::Deterministic(pose) => GaussianPose::deterministic(*pose),
            Attachment::Map { map, mounting } => {
                let map = map.upgrade().ok_or(SensorError::DanglingAttachment("map"))?;
                let frame = map.frame().normalized()?;
                Ok(frame.compose(&GaussianPose::deterministic(*mounting)?))
            }
            Attachment::Robot { robot, mount } => {
                let robot = robot
                    .upgrade()
                    .ok_or(SensorError::DanglingAttachment("robot"))?;
                let offset = match mount {
                    RobotMount::InFilter { slot } => robot
                        .state_pose(*slot)
                        .ok_or(SensorError::MissingStateSlot(*slot))?
                        .normalized()?,
                    RobotMount::Fixed { offset } => GaussianPose::deterministic(*offset)?,
                };
                Ok(robot.pose().normalized()?.compose(&offset))
            }
        }
    }
}
