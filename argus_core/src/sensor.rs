// argus_core/src/sensor.rs

//! A sensor: a pose attachment plus a calibration model.
//!
//! Every constructor funnels into the same initialization step, which stores
//! the attachment and writes the type tag taken from the model. The tag is a
//! plain attribute, not a dispatch mechanism; estimators read it to select
//! the matching observation model.

pub mod attachment;

use crate::abstractions::{MapEntity, RobotEntity};
use crate::error::SensorError;
use crate::frames::layout::pose_state_layout;
use crate::frames::FrameId;
use crate::models::perception::pinhole::PinholeModel;
use crate::models::perception::SensorModel;
use crate::pose::{normalized_pose_vector, GaussianPose};
use crate::types::{FrameHandle, Pixel, Vec7};
use log::debug;
use nalgebra::Point3;
use std::any::Any;
use std::sync::Weak;

pub use attachment::{Attachment, RobotMount};

/// A sensor attached to the estimator, generic over its calibration model.
#[derive(Debug, Clone)]
pub struct Sensor<M: SensorModel> {
    handle: FrameHandle,
    type_tag: String,
    attachment: Attachment,
    model: M,
}

/// A pin-hole camera sensor.
pub type PinholeSensor = Sensor<PinholeModel>;

/// A sensor whose model is only known through the `SensorModel` trait.
pub type DynSensor = Sensor<Box<dyn SensorModel>>;

impl<M: SensorModel> Sensor<M> {
    /// The initialization step shared by every constructor.
    fn init(handle: FrameHandle, attachment: Attachment, model: M) -> Self {
        let mut sensor = Self {
            handle,
            type_tag: String::new(),
            attachment,
            model,
        };
        sensor.type_tag = sensor.model.type_tag().to_string();
        debug!(
            "sensor {:?} [{}] attached via {}",
            sensor.handle,
            sensor.type_tag,
            sensor.attachment.kind()
        );
        sensor
    }

    /// A sensor owning an uncertain pose.
    pub fn with_gaussian_pose(handle: FrameHandle, pose: GaussianPose, model: M) -> Self {
        Self::init(handle, Attachment::Gaussian(pose), model)
    }

    /// A sensor owning an exactly known pose `[x, y, z, qx, qy, qz, qw]`.
    pub fn with_pose_vector(
        handle: FrameHandle,
        pose: Vec7,
        model: M,
    ) -> Result<Self, SensorError> {
        let pose = normalized_pose_vector(pose)?;
        Ok(Self::init(handle, Attachment::Deterministic(pose), model))
    }

    /// A sensor whose pose is derived from a map's reference frame.
    pub fn on_map(
        handle: FrameHandle,
        map: Weak<dyn MapEntity>,
        model: M,
    ) -> Result<Self, SensorError> {
        if map.strong_count() == 0 {
            return Err(SensorError::InvalidAttachment("map"));
        }
        let mounting = GaussianPose::identity().mean;
        Ok(Self::init(handle, Attachment::Map { map, mounting }, model))
    }

    /// A sensor mounted on a robot.
    ///
    /// With `in_filter` set, the sensor-to-robot offset is appended to the
    /// robot's in-filter state (starting at identity with zero uncertainty)
    /// and refined by the estimator from then on. Otherwise the offset is a
    /// constant, identity until [`Sensor::set_mounting`] supplies it.
    pub fn on_robot(
        handle: FrameHandle,
        robot: Weak<dyn RobotEntity>,
        in_filter: bool,
        model: M,
    ) -> Result<Self, SensorError> {
        if in_filter {
            Self::on_robot_in_filter(handle, robot, &GaussianPose::identity(), model)
        } else {
            if robot.strong_count() == 0 {
                return Err(SensorError::InvalidAttachment("robot"));
            }
            let mount = RobotMount::Fixed {
                offset: GaussianPose::identity().mean,
            };
            Ok(Self::init(handle, Attachment::Robot { robot, mount }, model))
        }
    }

    /// A robot-mounted sensor whose offset is estimated in-filter, starting
    /// from the given prior.
    pub fn on_robot_in_filter(
        handle: FrameHandle,
        robot: Weak<dyn RobotEntity>,
        prior: &GaussianPose,
        model: M,
    ) -> Result<Self, SensorError> {
        let owner = robot
            .upgrade()
            .ok_or(SensorError::InvalidAttachment("robot"))?;
        let layout = pose_state_layout(FrameId::Sensor(handle), FrameId::Body(owner.handle()));
        let slot = owner.extend_state(layout, prior)?;
        let mount = RobotMount::InFilter { slot };
        Ok(Self::init(handle, Attachment::Robot { robot, mount }, model))
    }

    // --- Accessors ---

    pub fn handle(&self) -> FrameHandle {
        self.handle
    }

    pub fn type_tag(&self) -> &str {
        &self.type_tag
    }

    pub fn attachment(&self) -> &Attachment {
        &self.attachment
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    /// True when the sensor pose is part of the estimator's state.
    pub fn is_in_filter(&self) -> bool {
        matches!(
            self.attachment,
            Attachment::Robot {
                mount: RobotMount::InFilter { .. },
                ..
            }
        )
    }

    /// Supplies the constant mounting of a map-attached sensor, or the fixed
    /// offset of a robot-mounted one. Other attachments have no constant to set.
    pub fn set_mounting(&mut self, offset: Vec7) -> Result<(), SensorError> {
        let offset = normalized_pose_vector(offset)?;
        match &mut self.attachment {
            Attachment::Map { mounting, .. } => *mounting = offset,
            Attachment::Robot {
                mount: RobotMount::Fixed { offset: fixed },
                ..
            } => *fixed = offset,
            _ => return Err(SensorError::AttachmentMismatch("set_mounting")),
        }
        Ok(())
    }

    /// The effective sensor pose in the world frame.
    pub fn global_pose(&self) -> Result<GaussianPose, SensorError> {
        self.attachment.resolve()
    }

    /// Erases the concrete model type, e.g. to keep sensors of different
    /// kinds in one collection.
    pub fn into_dyn(self) -> DynSensor {
        Sensor {
            handle: self.handle,
            type_tag: self.type_tag,
            attachment: self.attachment,
            model: Box::new(self.model),
        }
    }
}

impl SensorModel for Box<dyn SensorModel> {
    fn type_tag(&self) -> &'static str {
        (**self).type_tag()
    }

    fn as_any(&self) -> &dyn Any {
        (**self).as_any()
    }
}

impl Sensor<PinholeModel> {
    /// Forwards to [`PinholeModel::configure`].
    pub fn configure(
        &mut self,
        intrinsic: &[f64],
        distortion: &[f64],
        correction: &[f64],
        width: usize,
        height: usize,
    ) -> Result<(), SensorError> {
        self.model.configure(intrinsic, distortion, correction, width, height)
    }

    /// Projects a world point to a pixel through the current sensor pose.
    /// `Ok(None)` when the point is behind the camera or off the image.
    pub fn observe_point(&self, point: &Point3<f64>) -> Result<Option<Pixel>, SensorError> {
        let pose = self.global_pose()?.to_isometry();
        let in_sensor = pose.inverse_transform_point(point);
        Ok(self
            .model
            .project(&in_sensor.coords)
            .filter(|u| self.model.is_in_image(u)))
    }
}
