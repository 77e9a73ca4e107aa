use std::collections::HashMap;

use glam::Vec3;

use crate::config::HandConfig;
use crate::events::Subscription;
use crate::geometry::Aabb;
use crate::input::{Joint, JointPose, TrackedController, TrackingEvent};

/// Pressable target for fingertip touches.
pub trait TouchButton {
    /// World-space bounds of the touchable face.
    fn bounds(&self) -> Aabb;
    fn is_pressed(&self) -> bool;
    fn on_press(&mut self);
    fn on_clear(&mut self);
    /// Runs every frame the button stays pressed.
    fn while_pressed(&mut self) {}
}

/// Joint spheres captured from the controller for drawing.
#[derive(Debug, Default)]
pub struct HandSkeleton {
    poses: HashMap<Joint, JointPose>,
}

impl HandSkeleton {
    fn refresh(&mut self, controller: &TrackedController) {
        self.poses.clear();
        for joint in Joint::ALL {
            if let Some(pose) = controller.joint_pose(joint) {
                self.poses.insert(joint, pose);
            }
        }
    }

    pub fn pose(&self, joint: Joint) -> Option<JointPose> {
        self.poses.get(&joint).copied()
    }

    /// Tracked joints in skeleton order.
    pub fn tracked(&self) -> impl Iterator<Item = (Joint, JointPose)> + '_ {
        Joint::ALL
            .into_iter()
            .filter_map(|joint| self.poses.get(&joint).map(|pose| (joint, *pose)))
    }

    pub fn len(&self) -> usize {
        self.poses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }
}

/// Visualizes a tracked hand as joint spheres and answers pointing
/// queries from the index finger tip.
///
/// The widget owns a subscription to the controller's lifecycle: the
/// skeleton exists from the connect event until the disconnect event
/// and is refreshed from shared tracking state every update.
#[derive(Debug)]
pub struct HandModel {
    controller: TrackedController,
    config: HandConfig,
    events: Subscription<TrackingEvent>,
    skeleton: Option<HandSkeleton>,
}

impl HandModel {
    pub fn new(controller: &TrackedController, config: HandConfig) -> Self {
        Self {
            controller: controller.clone(),
            config,
            events: controller.subscribe(),
            skeleton: None,
        }
    }

    /// Per-frame hook: applies queued lifecycle events, then pulls the
    /// latest joint poses into the skeleton.
    pub fn update(&mut self) {
        while let Some(event) = self.events.poll() {
            match event {
                TrackingEvent::Connected => {
                    log::debug!("{} hand connected", self.controller.handedness().name());
                    self.skeleton = Some(HandSkeleton::default());
                }
                TrackingEvent::Disconnected => {
                    log::debug!("{} hand disconnected", self.controller.handedness().name());
                    self.skeleton = None;
                }
            }
        }
        if let Some(skeleton) = &mut self.skeleton {
            skeleton.refresh(&self.controller);
        }
    }

    pub fn is_visible(&self) -> bool {
        self.skeleton.is_some() && self.controller.is_visible()
    }

    pub fn skeleton(&self) -> Option<&HandSkeleton> {
        self.skeleton.as_ref()
    }

    /// Position of the pointing joint, or `None` while it is untracked.
    pub fn pointer_position(&self) -> Option<Vec3> {
        self.controller.joint_position(self.config.pointing_joint)
    }

    /// Whether the touch sphere around the pointing joint overlaps the
    /// box. An untracked joint touches nothing.
    pub fn intersect_box(&self, bounds: &Aabb) -> bool {
        match self.pointer_position() {
            Some(tip) => bounds.intersects_sphere(tip, self.config.touch_radius),
            None => false,
        }
    }

    /// Drives a button from the touch state: press while overlapping,
    /// clear otherwise, and tick it for every frame it reports pressed.
    pub fn check_button(&self, button: &mut impl TouchButton) {
        if self.intersect_box(&button.bounds()) {
            button.on_press();
        } else {
            button.on_clear();
        }
        if button.is_pressed() {
            button.while_pressed();
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Quat;

    use super::*;
    use crate::input::Handedness;

    fn joint_pose(position: Vec3) -> JointPose {
        JointPose {
            position,
            orientation: Quat::IDENTITY,
            radius: 0.008,
        }
    }

    fn connected_hand() -> (TrackedController, HandModel) {
        let controller = TrackedController::new(Handedness::Right);
        let model = HandModel::new(&controller, HandConfig::default());
        controller.set_connected(true);
        (controller, model)
    }

    #[test]
    fn skeleton_follows_the_connection_lifecycle() {
        let (controller, mut model) = connected_hand();
        assert!(model.skeleton().is_none());

        model.update();
        assert!(model.skeleton().is_some());
        assert!(model.is_visible());

        controller.set_connected(false);
        model.update();
        assert!(model.skeleton().is_none());
        assert!(!model.is_visible());
    }

    #[test]
    fn skeleton_mirrors_tracked_joints() {
        let (controller, mut model) = connected_hand();
        controller.set_joint(Joint::Wrist, joint_pose(Vec3::ZERO));
        controller.set_joint(Joint::ThumbTip, joint_pose(Vec3::X));
        model.update();

        let skeleton = model.skeleton().unwrap();
        assert_eq!(skeleton.len(), 2);
        assert_eq!(skeleton.pose(Joint::ThumbTip).unwrap().position, Vec3::X);
        assert!(skeleton.pose(Joint::IndexFingerTip).is_none());
    }

    #[test]
    fn pointer_position_requires_a_tracked_tip() {
        let (controller, mut model) = connected_hand();
        model.update();
        assert!(model.pointer_position().is_none());

        controller.set_joint(Joint::IndexFingerTip, joint_pose(Vec3::new(0.1, 0.2, 0.3)));
        model.update();
        assert_eq!(model.pointer_position(), Some(Vec3::new(0.1, 0.2, 0.3)));
    }

    #[test]
    fn touch_sphere_reaches_slightly_past_the_tip() {
        let (controller, mut model) = connected_hand();
        let bounds = Aabb::from_center_half_extents(Vec3::ZERO, Vec3::splat(0.05));

        assert!(!model.intersect_box(&bounds));

        controller.set_joint(Joint::IndexFingerTip, joint_pose(Vec3::new(0.055, 0.0, 0.0)));
        model.update();
        assert!(model.intersect_box(&bounds));

        controller.set_joint(Joint::IndexFingerTip, joint_pose(Vec3::new(0.07, 0.0, 0.0)));
        model.update();
        assert!(!model.intersect_box(&bounds));
    }

    #[derive(Debug, Default)]
    struct RecordingButton {
        pressed: bool,
        presses: usize,
        clears: usize,
        held_frames: usize,
    }

    impl TouchButton for RecordingButton {
        fn bounds(&self) -> Aabb {
            Aabb::from_center_half_extents(Vec3::ZERO, Vec3::splat(0.05))
        }

        fn is_pressed(&self) -> bool {
            self.pressed
        }

        fn on_press(&mut self) {
            if !self.pressed {
                self.presses += 1;
            }
            self.pressed = true;
        }

        fn on_clear(&mut self) {
            self.pressed = false;
            self.clears += 1;
        }

        fn while_pressed(&mut self) {
            self.held_frames += 1;
        }
    }

    #[test]
    fn check_button_dispatches_press_hold_and_clear() {
        let (controller, mut model) = connected_hand();
        let mut button = RecordingButton::default();

        controller.set_joint(Joint::IndexFingerTip, joint_pose(Vec3::ZERO));
        model.update();
        model.check_button(&mut button);
        model.check_button(&mut button);
        assert_eq!(button.presses, 1);
        assert_eq!(button.held_frames, 2);

        controller.set_joint(Joint::IndexFingerTip, joint_pose(Vec3::splat(1.0)));
        model.update();
        model.check_button(&mut button);
        assert!(!button.pressed);
        assert_eq!(button.held_frames, 2);
        assert!(button.clears >= 1);
    }
}
