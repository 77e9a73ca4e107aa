use glam::Vec3;

use crate::config::{PinchConfig, PointerConfig};
use crate::events::Subscription;
use crate::geometry::{Aabb, PointerGeometry, Ray};
use crate::input::{Joint, Pose, TrackedController, TrackingEvent};
use crate::pinch::{PinchState, PinchTracker};

/// Drawable state of the pinch pointer: the tapered mesh, its pose, and
/// the cursor riding the pointer ray.
#[derive(Debug)]
pub struct PointerVisual {
    geometry: PointerGeometry,
    pose: Pose,
    mesh_offset: f32,
    opacity: f32,
    cursor_distance: f32,
    visible: bool,
}

impl PointerVisual {
    fn new(config: &PointerConfig) -> Self {
        Self {
            geometry: PointerGeometry::new(config),
            pose: Pose::default(),
            mesh_offset: -config.rear_radius,
            opacity: config.opacity_min,
            cursor_distance: config.cursor_max_distance,
            visible: false,
        }
    }

    pub fn geometry(&self) -> &PointerGeometry {
        &self.geometry
    }

    pub fn geometry_mut(&mut self) -> &mut PointerGeometry {
        &mut self.geometry
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    /// Mesh translation along the pointer's forward axis, applied before
    /// the pose. Moves the tip ahead as the pinch closes.
    pub fn mesh_offset(&self) -> f32 {
        self.mesh_offset
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn cursor_distance(&self) -> f32 {
        self.cursor_distance
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }
}

/// Pinch-driven pointer for one tracked hand.
///
/// Listens for connect and disconnect edges to create and drop the
/// visual, feeds tip positions through the pinch recognizer every
/// update, and reshapes the pointer mesh from the result. The pointer
/// ray leaves the tip midpoint along the grip's forward axis; a cursor
/// sphere marks where the ray lands.
#[derive(Debug)]
pub struct HandPointerModel {
    controller: TrackedController,
    config: PointerConfig,
    tracker: PinchTracker,
    events: Subscription<TrackingEvent>,
    visual: Option<PointerVisual>,
    attached: bool,
}

impl HandPointerModel {
    pub fn new(controller: &TrackedController, config: PointerConfig, pinch: PinchConfig) -> Self {
        Self {
            controller: controller.clone(),
            config,
            tracker: PinchTracker::new(pinch),
            events: controller.subscribe(),
            visual: None,
            attached: false,
        }
    }

    /// Per-frame hook: applies lifecycle events, advances the pinch
    /// recognizer, and rewrites the pointer mesh for the new strength.
    pub fn update(&mut self) {
        while let Some(event) = self.events.poll() {
            match event {
                TrackingEvent::Connected => {
                    log::debug!(
                        "{} hand pointer created",
                        self.controller.handedness().name()
                    );
                    self.visual = Some(PointerVisual::new(&self.config));
                }
                TrackingEvent::Disconnected => {
                    log::debug!(
                        "{} hand pointer destroyed",
                        self.controller.handedness().name()
                    );
                    self.visual = None;
                }
            }
        }

        let Some(visual) = &mut self.visual else {
            return;
        };
        visual.visible = self.controller.is_visible();

        let thumb = self.controller.joint_position(Joint::ThumbTip);
        let index = self.controller.joint_position(Joint::IndexFingerTip);
        let Some(state) = self.tracker.update(thumb, index) else {
            return;
        };

        if let (Some(thumb), Some(index)) = (thumb, index) {
            visual.pose.position = (thumb + index) * 0.5;
        }
        if let Some(grip) = self.controller.grip() {
            visual.pose.orientation = grip.orientation;
        }

        let rear_radius = state.rear_radius(&self.config);
        visual.geometry.update_vertices(rear_radius);
        visual.mesh_offset = -(rear_radius + state.advance(&self.config));
        visual.opacity = state.opacity(&self.config);
    }

    pub fn visual(&self) -> Option<&PointerVisual> {
        self.visual.as_ref()
    }

    pub fn visual_mut(&mut self) -> Option<&mut PointerVisual> {
        self.visual.as_mut()
    }

    pub fn is_visible(&self) -> bool {
        self.visual.as_ref().map_or(false, PointerVisual::is_visible)
    }

    pub fn pinch_state(&self) -> Option<PinchState> {
        self.tracker.state()
    }

    pub fn is_pinched(&self) -> bool {
        self.tracker.is_pinched()
    }

    pub fn pinch_strength(&self) -> f32 {
        self.tracker.strength()
    }

    /// Pointer origin, or `None` until both tips have been tracked once.
    pub fn pointer_position(&self) -> Option<Vec3> {
        let visual = self.visual.as_ref()?;
        self.tracker.state()?;
        Some(visual.pose.position)
    }

    /// Ray from the pointer origin along the grip's forward axis.
    pub fn ray(&self) -> Option<Ray> {
        let visual = self.visual.as_ref()?;
        self.tracker.state()?;
        Some(Ray::new(
            visual.pose.position,
            visual.pose.orientation * Vec3::NEG_Z,
        ))
    }

    /// Places the cursor at the given distance down the ray, kept inside
    /// `[0, cursor_max_distance]`.
    pub fn set_cursor(&mut self, distance: f32) {
        let distance = distance.clamp(0.0, self.config.cursor_max_distance);
        if let Some(visual) = &mut self.visual {
            visual.cursor_distance = distance;
        }
    }

    pub fn cursor_position(&self) -> Option<Vec3> {
        let visual = self.visual.as_ref()?;
        let local = Vec3::new(0.0, 0.0, -visual.cursor_distance);
        Some(visual.pose.position + visual.pose.orientation * local)
    }

    /// Casts the pointer ray against the targets and parks the cursor at
    /// the nearest hit, or at the far limit when nothing is hit. Does
    /// nothing while the pointer is attached to a surface.
    pub fn check_intersections(&mut self, targets: &[Aabb]) {
        if self.attached {
            return;
        }
        let Some(ray) = self.ray() else {
            return;
        };

        let mut nearest: Option<f32> = None;
        for target in targets {
            if let Some(distance) = ray.intersect_aabb(target) {
                if nearest.map_or(true, |best| distance < best) {
                    nearest = Some(distance);
                }
            }
        }
        match nearest {
            Some(distance) => self.set_cursor(distance),
            None => self.set_cursor(self.config.cursor_max_distance),
        }
    }

    /// Latches the pointer onto a surface; cursor placement stops until
    /// it is released.
    pub fn set_attached(&mut self, attached: bool) {
        self.attached = attached;
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }
}
