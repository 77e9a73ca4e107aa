//! Demo scene pieces shared by the desktop binary.

use std::f32::consts::TAU;

use glam::{Mat4, Quat, Vec3};

use crate::geometry::Aabb;
use crate::input::{Joint, JointPose, Pose, TrackedController};
use crate::render::CameraParams;

/// Wrist-level anchor the simulated hand floats around.
pub const HAND_ORIGIN: Vec3 = Vec3::new(0.0, 1.4, -0.35);

const CYCLE_SECONDS: f32 = 4.0;
const DISTANCE_MID: f32 = 0.03;
const DISTANCE_SWING: f32 = 0.025;

/// Tip separation of the scripted open-close cycle at the given time.
pub fn cycle_distance(time: f32) -> f32 {
    DISTANCE_MID - DISTANCE_SWING * (TAU * time / CYCLE_SECONDS).sin()
}

/// Scripted tracking source that stands in for a live hand.
///
/// Writes thumb and index tip poses plus a few support joints into a
/// [`TrackedController`], either along a repeating open-close cycle or at
/// an explicitly requested tip separation.
pub struct SimulatedHand {
    controller: TrackedController,
    time: f32,
    distance: f32,
}

impl SimulatedHand {
    pub fn new(controller: &TrackedController) -> Self {
        controller.set_connected(true);
        let mut hand = Self {
            controller: controller.clone(),
            time: 0.0,
            distance: 0.0,
        };
        hand.set_distance(cycle_distance(0.0));
        hand
    }

    /// Advances the scripted cycle by `dt` seconds.
    pub fn advance(&mut self, dt: f32) {
        self.time += dt;
        self.set_distance(cycle_distance(self.time));
    }

    /// Pins the tips at the given separation, overriding the cycle for
    /// this frame.
    pub fn set_distance(&mut self, distance: f32) {
        self.distance = distance;
        let half = distance * 0.5;
        self.write_joint(Joint::ThumbTip, Vec3::new(-half, 0.0, 0.0), 0.008);
        self.write_joint(Joint::IndexFingerTip, Vec3::new(half, 0.0, 0.0), 0.008);
        self.write_joint(Joint::MiddleFingerTip, Vec3::new(0.012, -0.008, -0.01), 0.007);
        self.write_joint(Joint::Wrist, Vec3::new(0.0, -0.07, 0.08), 0.02);
        self.controller.set_grip(Pose {
            position: HAND_ORIGIN + Vec3::new(0.0, -0.03, 0.05),
            orientation: Quat::IDENTITY,
        });
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    fn write_joint(&self, joint: Joint, offset: Vec3, radius: f32) {
        self.controller.set_joint(
            joint,
            JointPose {
                position: HAND_ORIGIN + offset,
                orientation: Quat::IDENTITY,
                radius,
            },
        );
    }
}

/// Ray targets the demo scatters in front of the hand.
pub fn demo_targets() -> Vec<Aabb> {
    vec![
        Aabb::from_center_half_extents(
            HAND_ORIGIN + Vec3::new(0.0, 0.0, -0.9),
            Vec3::new(0.25, 0.18, 0.02),
        ),
        Aabb::from_center_half_extents(
            HAND_ORIGIN + Vec3::new(0.45, 0.1, -1.3),
            Vec3::new(0.2, 0.15, 0.02),
        ),
    ]
}

/// Camera looking over the simulated hand toward the targets.
pub fn demo_camera(aspect: f32) -> CameraParams {
    let position = HAND_ORIGIN + Vec3::new(0.12, 0.14, 0.35);
    let target = HAND_ORIGIN + Vec3::new(0.0, 0.0, -0.2);
    let view = Mat4::look_at_rh(position, target, Vec3::Y);
    let projection = Mat4::perspective_rh_gl(50.0_f32.to_radians(), aspect.max(0.01), 0.01, 20.0);
    CameraParams {
        view_proj: projection * view,
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{HandConfig, PinchConfig, PointerConfig};
    use crate::hand::{HandModel, HandSkeleton};
    use crate::input::Handedness;
    use crate::pointer::HandPointerModel;

    use super::*;

    #[test]
    fn cycle_sweeps_past_both_clamp_bounds() {
        let mut min = f32::MAX;
        let mut max = f32::MIN;
        let mut time = 0.0;
        while time < CYCLE_SECONDS {
            let distance = cycle_distance(time);
            min = min.min(distance);
            max = max.max(distance);
            time += 0.01;
        }
        assert!(min < 0.01);
        assert!(max > 0.05);
    }

    #[test]
    fn set_distance_places_the_tips_apart() {
        let controller = TrackedController::new(Handedness::Right);
        let mut hand = SimulatedHand::new(&controller);
        hand.set_distance(0.04);
        let thumb = controller.joint_position(Joint::ThumbTip).unwrap();
        let index = controller.joint_position(Joint::IndexFingerTip).unwrap();
        assert!((thumb.distance(index) - 0.04).abs() < 1e-6);
    }

    #[test]
    fn scripted_cycle_drives_the_widgets() {
        let controller = TrackedController::new(Handedness::Right);
        let mut hand_model = HandModel::new(&controller, HandConfig::default());
        let mut pointer =
            HandPointerModel::new(&controller, PointerConfig::default(), PinchConfig::default());
        let mut hand = SimulatedHand::new(&controller);

        let dt = 1.0 / 60.0;
        let mut pinched_frames = 0;
        for _ in 0..240 {
            hand.advance(dt);
            hand_model.update();
            pointer.update();
            if pointer.is_pinched() {
                pinched_frames += 1;
            }
        }
        assert!(pinched_frames > 0);
        assert!(pinched_frames < 240);
        assert!(hand_model.is_visible());
        assert_eq!(hand_model.skeleton().map(HandSkeleton::len), Some(4));
    }
}
