use glam::Vec3;

use crate::config::{PinchConfig, PointerConfig};

/// Instantaneous pinch reading between the thumb and index finger tips.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinchState {
    /// Tip separation in meters.
    pub distance: f32,
    /// Normalized closeness in `[0, 1]`, one at full pinch.
    pub strength: f32,
    /// True while the separation is under the gesture threshold.
    pub pinched: bool,
}

impl PinchState {
    /// Rear cap radius driven by the pinch: nominal when relaxed,
    /// minimum when closed.
    pub fn rear_radius(&self, config: &PointerConfig) -> f32 {
        lerp(config.rear_radius, config.rear_radius_min, self.strength)
    }

    /// Forward travel of the pointer mesh along its axis.
    pub fn advance(&self, config: &PointerConfig) -> f32 {
        config.advance_max * self.strength
    }

    pub fn opacity(&self, config: &PointerConfig) -> f32 {
        lerp(config.opacity_min, config.opacity_max, self.strength)
    }
}

/// Per-frame pinch recognizer.
///
/// Frames where either tip is untracked leave the previous state in
/// place, so a momentary dropout cannot flicker the gesture.
#[derive(Debug, Clone)]
pub struct PinchTracker {
    config: PinchConfig,
    state: Option<PinchState>,
}

impl PinchTracker {
    pub fn new(config: PinchConfig) -> Self {
        Self {
            config,
            state: None,
        }
    }

    pub fn config(&self) -> &PinchConfig {
        &self.config
    }

    /// Last computed state, or `None` before the first tracked frame.
    pub fn state(&self) -> Option<PinchState> {
        self.state
    }

    pub fn is_pinched(&self) -> bool {
        self.state.map_or(false, |state| state.pinched)
    }

    pub fn strength(&self) -> f32 {
        self.state.map_or(0.0, |state| state.strength)
    }

    /// Feeds one frame of tip positions and returns the current state.
    pub fn update(
        &mut self,
        thumb_tip: Option<Vec3>,
        index_tip: Option<Vec3>,
    ) -> Option<PinchState> {
        let (thumb, index) = match (thumb_tip, index_tip) {
            (Some(thumb), Some(index)) => (thumb, index),
            _ => return self.state,
        };
        let distance = thumb.distance(index);
        let state = PinchState {
            distance,
            strength: self.config.strength(distance),
            pinched: self.config.is_pinched(distance),
        };
        self.state = Some(state);
        self.state
    }
}

fn lerp(from: f32, to: f32, t: f32) -> f32 {
    from + (to - from) * t
}
