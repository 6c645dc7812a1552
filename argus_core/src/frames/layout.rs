// argus_core/src/frames/layout.rs
use crate::frames::{FrameId, StateVariable};

/// Returns the 7-variable layout of a frame pose expressed in `parent`.
///
/// The block is composed of:
/// - Position (3) of `frame` in `parent`
/// - Orientation (4, Quaternion) from `frame` to `parent`
///
/// Stored as `[x, y, z, qx, qy, qz, qw]`, the same order as a pose vector.
/// Position variables are keyed by the frame whose origin they locate, so two
/// sensors mounted on the same robot never collide.
pub fn pose_state_layout(frame: FrameId, parent: FrameId) -> Vec<StateVariable> {
    vec![
        StateVariable::Px(frame.clone()),
        StateVariable::Py(frame.clone()),
        StateVariable::Pz(frame.clone()),
        StateVariable::Qx(frame.clone(), parent.clone()),
        StateVariable::Qy(frame.clone(), parent.clone()),
        StateVariable::Qz(frame.clone(), parent.clone()),
        StateVariable::Qw(frame, parent),
    ]
}
