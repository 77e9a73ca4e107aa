use std::collections::HashMap;
use std::sync::Arc;

use glam::{Quat, Vec3};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::events::{EventHub, Subscription};

/// Which hand an input source belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Handedness {
    Left,
    Right,
}

impl Handedness {
    pub fn name(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            _ => None,
        }
    }
}

/// Identifier for one of the 25 articulated hand joints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Joint {
    Wrist,
    ThumbMetacarpal,
    ThumbPhalanxProximal,
    ThumbPhalanxDistal,
    ThumbTip,
    IndexFingerMetacarpal,
    IndexFingerPhalanxProximal,
    IndexFingerPhalanxIntermediate,
    IndexFingerPhalanxDistal,
    IndexFingerTip,
    MiddleFingerMetacarpal,
    MiddleFingerPhalanxProximal,
    MiddleFingerPhalanxIntermediate,
    MiddleFingerPhalanxDistal,
    MiddleFingerTip,
    RingFingerMetacarpal,
    RingFingerPhalanxProximal,
    RingFingerPhalanxIntermediate,
    RingFingerPhalanxDistal,
    RingFingerTip,
    PinkyFingerMetacarpal,
    PinkyFingerPhalanxProximal,
    PinkyFingerPhalanxIntermediate,
    PinkyFingerPhalanxDistal,
    PinkyFingerTip,
}

impl Joint {
    /// Every joint in skeleton order, wrist first.
    pub const ALL: [Joint; 25] = [
        Joint::Wrist,
        Joint::ThumbMetacarpal,
        Joint::ThumbPhalanxProximal,
        Joint::ThumbPhalanxDistal,
        Joint::ThumbTip,
        Joint::IndexFingerMetacarpal,
        Joint::IndexFingerPhalanxProximal,
        Joint::IndexFingerPhalanxIntermediate,
        Joint::IndexFingerPhalanxDistal,
        Joint::IndexFingerTip,
        Joint::MiddleFingerMetacarpal,
        Joint::MiddleFingerPhalanxProximal,
        Joint::MiddleFingerPhalanxIntermediate,
        Joint::MiddleFingerPhalanxDistal,
        Joint::MiddleFingerTip,
        Joint::RingFingerMetacarpal,
        Joint::RingFingerPhalanxProximal,
        Joint::RingFingerPhalanxIntermediate,
        Joint::RingFingerPhalanxDistal,
        Joint::RingFingerTip,
        Joint::PinkyFingerMetacarpal,
        Joint::PinkyFingerPhalanxProximal,
        Joint::PinkyFingerPhalanxIntermediate,
        Joint::PinkyFingerPhalanxDistal,
        Joint::PinkyFingerTip,
    ];

    /// The joint name as reported by the device layer.
    pub fn name(self) -> &'static str {
        match self {
            Self::Wrist => "wrist",
            Self::ThumbMetacarpal => "thumb-metacarpal",
            Self::ThumbPhalanxProximal => "thumb-phalanx-proximal",
            Self::ThumbPhalanxDistal => "thumb-phalanx-distal",
            Self::ThumbTip => "thumb-tip",
            Self::IndexFingerMetacarpal => "index-finger-metacarpal",
            Self::IndexFingerPhalanxProximal => "index-finger-phalanx-proximal",
            Self::IndexFingerPhalanxIntermediate => "index-finger-phalanx-intermediate",
            Self::IndexFingerPhalanxDistal => "index-finger-phalanx-distal",
            Self::IndexFingerTip => "index-finger-tip",
            Self::MiddleFingerMetacarpal => "middle-finger-metacarpal",
            Self::MiddleFingerPhalanxProximal => "middle-finger-phalanx-proximal",
            Self::MiddleFingerPhalanxIntermediate => "middle-finger-phalanx-intermediate",
            Self::MiddleFingerPhalanxDistal => "middle-finger-phalanx-distal",
            Self::MiddleFingerTip => "middle-finger-tip",
            Self::RingFingerMetacarpal => "ring-finger-metacarpal",
            Self::RingFingerPhalanxProximal => "ring-finger-phalanx-proximal",
            Self::RingFingerPhalanxIntermediate => "ring-finger-phalanx-intermediate",
            Self::RingFingerPhalanxDistal => "ring-finger-phalanx-distal",
            Self::RingFingerTip => "ring-finger-tip",
            Self::PinkyFingerMetacarpal => "pinky-finger-metacarpal",
            Self::PinkyFingerPhalanxProximal => "pinky-finger-phalanx-proximal",
            Self::PinkyFingerPhalanxIntermediate => "pinky-finger-phalanx-intermediate",
            Self::PinkyFingerPhalanxDistal => "pinky-finger-phalanx-distal",
            Self::PinkyFingerTip => "pinky-finger-tip",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|joint| joint.name() == name)
    }
}

/// Rigid transform of a tracked body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    pub orientation: Quat,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
        }
    }
}

/// Tracked state of one hand joint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointPose {
    pub position: Vec3,
    pub orientation: Quat,
    pub radius: f32,
}

/// Lifecycle edge of a tracked input source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingEvent {
    Connected,
    Disconnected,
}

#[derive(Debug, Default)]
struct ControllerState {
    connected: bool,
    visible: bool,
    grip: Option<Pose>,
    joints: HashMap<Joint, JointPose>,
}

/// Shared tracking state for one hand.
///
/// The platform layer writes poses into it each frame; widgets keep a
/// clone and read from the frame thread. Connect and disconnect edges are
/// queued on the event hub so widgets can react from their `update`.
#[derive(Debug)]
pub struct TrackedController {
    handedness: Handedness,
    state: Arc<RwLock<ControllerState>>,
    events: EventHub<TrackingEvent>,
}

impl Clone for TrackedController {
    fn clone(&self) -> Self {
        Self {
            handedness: self.handedness,
            state: Arc::clone(&self.state),
            events: self.events.clone(),
        }
    }
}

impl TrackedController {
    pub fn new(handedness: Handedness) -> Self {
        Self {
            handedness,
            state: Arc::new(RwLock::new(ControllerState::default())),
            events: EventHub::new(),
        }
    }

    pub fn handedness(&self) -> Handedness {
        self.handedness
    }

    /// Marks the source as connected or gone. Emits a tracking event on
    /// the edge only; repeated calls with the same value are no-ops.
    pub fn set_connected(&self, connected: bool) {
        {
            let mut state = self.state.write();
            if state.connected == connected {
                return;
            }
            state.connected = connected;
            state.visible = connected;
            if !connected {
                state.joints.clear();
                state.grip = None;
            }
        }
        self.events.emit(if connected {
            TrackingEvent::Connected
        } else {
            TrackingEvent::Disconnected
        });
    }

    pub fn set_visible(&self, visible: bool) {
        self.state.write().visible = visible;
    }

    pub fn set_grip(&self, pose: Pose) {
        self.state.write().grip = Some(pose);
    }

    pub fn set_joint(&self, joint: Joint, pose: JointPose) {
        self.state.write().joints.insert(joint, pose);
    }

    pub fn clear_joint(&self, joint: Joint) {
        self.state.write().joints.remove(&joint);
    }

    pub fn clear_joints(&self) {
        self.state.write().joints.clear();
    }

    pub fn is_connected(&self) -> bool {
        self.state.read().connected
    }

    pub fn is_visible(&self) -> bool {
        self.state.read().visible
    }

    pub fn grip(&self) -> Option<Pose> {
        self.state.read().grip
    }

    pub fn joint_pose(&self, joint: Joint) -> Option<JointPose> {
        self.state.read().joints.get(&joint).copied()
    }

    pub fn joint_position(&self, joint: Joint) -> Option<Vec3> {
        self.joint_pose(joint).map(|pose| pose.position)
    }

    pub fn subscribe(&self) -> Subscription<TrackingEvent> {
        self.events.subscribe()
    }
}
