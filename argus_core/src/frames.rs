// argus_core/src/frames.rs

use crate::error::SensorError;
use crate::pose::GaussianPose;
use crate::types::{FrameHandle, Mat7, Vec7, POSE_DIM};
use nalgebra::{DMatrix, DVector};

pub mod layout;

/// A unique, hashable identifier for any coordinate frame known to the estimator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FrameId {
    /// The global frame. The ultimate source of truth.
    World,
    /// The reference frame of a map entity.
    Map(FrameHandle),
    /// The origin of a robot body.
    Body(FrameHandle),
    /// The specific origin of a sensor component.
    Sensor(FrameHandle),
}

/// Every variable a pose block in a state vector can hold.
/// Position variables name the frame whose origin they locate; orientation
/// variables name the rotation pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StateVariable {
    // --- Cartesian Position ---
    Px(FrameId),
    Py(FrameId),
    Pz(FrameId),
    // --- Orientation (as a quaternion) ---
    // Represents the rotation FROM the first frame TO the second frame.
    Qx(FrameId, FrameId),
    Qy(FrameId, FrameId),
    Qz(FrameId, FrameId),
    Qw(FrameId, FrameId),
}

/// The position of a 7-wide pose block inside an in-filter state vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateSlot {
    pub start: usize,
}

/// The "smart" state object used by filters. It bundles the state vector
/// with its schema (the layout), covariance, and timestamp.
#[derive(Debug, Clone)]
pub struct FrameAwareState {
    /// The ordered "schema" of the state vector.
    pub layout: Vec<StateVariable>,
    /// The actual numerical data vector `x`.
    pub vector: DVector<f64>,
    /// The covariance matrix `P`.
    pub covariance: DMatrix<f64>,
    /// The timestamp of the last update.
    pub last_update_timestamp: f64,
}

impl FrameAwareState {
    /// Creates a new state with a given layout, initializing the vector to zero
    /// (with valid identity quaternions) and the covariance to a scaled identity matrix.
    pub fn new(layout: Vec<StateVariable>, initial_covariance_val: f64, timestamp: f64) -> Self {
        let dim = layout.len();
        let mut vector = DVector::zeros(dim);

        // Every quaternion block starts at identity, otherwise the first
        // normalization would divide by zero.
        for (i, var) in layout.iter().enumerate() {
            if matches!(var, StateVariable::Qw(_, _)) {
                vector[i] = 1.0;
            }
        }

        Self {
            layout,
            vector,
            covariance: DMatrix::identity(dim, dim) * initial_covariance_val,
            last_update_timestamp: timestamp,
        }
    }

    /// Returns the dimension (number of rows) of the state vector.
    pub fn dim(&self) -> usize {
        self.layout.len()
    }

    /// Finds the index of a specific `StateVariable` in the layout.
    pub fn find_idx(&self, var: &StateVariable) -> Option<usize> {
        self.layout.iter().position(|v| v == var)
    }

    /// Appends a pose block to the state. The covariance grows block-diagonally:
    /// the new block is uncorrelated with everything already estimated.
    pub fn append(
        &mut self,
        layout: Vec<StateVariable>,
        initial: &GaussianPose,
    ) -> Result<StateSlot, SensorError> {
        if layout.len() != POSE_DIM {
            return Err(SensorError::StateConflict(format!(
                "a pose block needs {POSE_DIM} variables, got {}",
                layout.len()
            )));
        }
        if let Some(dup) = layout.iter().find(|v| self.find_idx(v).is_some()) {
            return Err(SensorError::StateConflict(format!(
                "{dup:?} is already part of the state"
            )));
        }

        let start = self.dim();
        let new_dim = start + POSE_DIM;

        let mut vector = DVector::zeros(new_dim);
        vector.rows_mut(0, start).copy_from(&self.vector);
        vector.rows_mut(start, POSE_DIM).copy_from(&initial.mean);

        let mut covariance = DMatrix::zeros(new_dim, new_dim);
        covariance
            .view_mut((0, 0), (start, start))
            .copy_from(&self.covariance);
        covariance
            .view_mut((start, start), (POSE_DIM, POSE_DIM))
            .copy_from(&initial.covariance);

        self.layout.extend(layout);
        self.vector = vector;
        self.covariance = covariance;
        Ok(StateSlot { start })
    }

    /// Reads back the pose block stored at `slot`, with its marginal covariance.
    pub fn pose_at(&self, slot: StateSlot) -> Option<GaussianPose> {
        if slot.start + POSE_DIM > self.dim() {
            return None;
        }
        let mean = Vec7::from_iterator(self.vector.rows(slot.start, POSE_DIM).iter().copied());
        let covariance = Mat7::from_iterator(
            self.covariance
                .view((slot.start, slot.start), (POSE_DIM, POSE_DIM))
                .iter()
                .copied(),
        );
        Some(GaussianPose { mean, covariance })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frames::layout::pose_state_layout;
    use approx::assert_abs_diff_eq;

    fn robot_state() -> FrameAwareState {
        let robot = FrameHandle(1);
        FrameAwareState::new(
            pose_state_layout(FrameId::Body(robot), FrameId::World),
            0.5,
            0.0,
        )
    }

    #[test]
    fn test_new_state_starts_at_identity() {
        let state = robot_state();
        assert_eq!(state.dim(), 7);
        let pose = state.pose_at(StateSlot { start: 0 }).unwrap();
        assert_abs_diff_eq!(pose.mean[6], 1.0);
        assert_abs_diff_eq!(pose.covariance, Mat7::identity() * 0.5);
    }

    #[test]
    fn test_append_grows_block_diagonally() {
        let mut state = robot_state();
        let mut mean = Vec7::zeros();
        mean[0] = 0.2;
        mean[6] = 1.0;
        let offset = GaussianPose::new(mean, Mat7::identity() * 0.01).unwrap();

        let layout =
            pose_state_layout(FrameId::Sensor(FrameHandle(9)), FrameId::Body(FrameHandle(1)));
        let slot = state.append(layout, &offset).unwrap();

        assert_eq!(slot, StateSlot { start: 7 });
        assert_eq!(state.dim(), 14);
        assert_eq!(state.covariance.nrows(), 14);
        assert_abs_diff_eq!(state.covariance[(0, 7)], 0.0);
        assert_abs_diff_eq!(state.covariance[(3, 3)], 0.5);
        assert_eq!(state.pose_at(slot).unwrap(), offset);
    }

    #[test]
    fn test_append_rejects_duplicate_block() {
        let mut state = robot_state();
        let layout = pose_state_layout(FrameId::Body(FrameHandle(1)), FrameId::World);
        let err = state.append(layout, &GaussianPose::identity()).unwrap_err();
        assert!(matches!(err, SensorError::StateConflict(_)));
        assert_eq!(state.dim(), 7);
    }

    #[test]
    fn test_pose_at_out_of_range() {
        assert!(robot_state().pose_at(StateSlot { start: 3 }).is_none());
    }
}
