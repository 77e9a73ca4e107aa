use serde::{Deserialize, Serialize};

use crate::input::Joint;

/// Tuning for the pinch gesture recognizer.
///
/// Distances are in meters between the thumb tip and the index finger tip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PinchConfig {
    /// Distance at which the pinch strength saturates at one.
    #[serde(default = "default_pinch_min")]
    pub min_distance: f32,
    /// Distance at which the pinch strength falls to zero.
    #[serde(default = "default_pinch_max")]
    pub max_distance: f32,
    /// Distances strictly below this count as a pinch.
    #[serde(default = "default_pinch_threshold")]
    pub threshold: f32,
}

impl Default for PinchConfig {
    fn default() -> Self {
        Self {
            min_distance: default_pinch_min(),
            max_distance: default_pinch_max(),
            threshold: default_pinch_threshold(),
        }
    }
}

impl PinchConfig {
    /// Maps a tip distance to a strength in `[0, 1]`.
    pub fn strength(&self, distance: f32) -> f32 {
        let clamped = distance.clamp(self.min_distance, self.max_distance);
        1.0 - (clamped - self.min_distance) / (self.max_distance - self.min_distance)
    }

    pub fn is_pinched(&self, distance: f32) -> bool {
        distance < self.threshold
    }
}

fn default_pinch_min() -> f32 {
    0.01
}

fn default_pinch_max() -> f32 {
    0.05
}

fn default_pinch_threshold() -> f32 {
    0.02
}

/// Shape and feel of the tapered pointer and its ray cursor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointerConfig {
    /// Radius of the tip ring at the front face.
    #[serde(default = "default_front_radius")]
    pub front_radius: f32,
    /// Rear cap radius when the hand is fully relaxed.
    #[serde(default = "default_rear_radius")]
    pub rear_radius: f32,
    /// Rear cap radius when the pinch is fully closed.
    #[serde(default = "default_rear_radius_min")]
    pub rear_radius_min: f32,
    /// Distance from the rear cap center to the front face.
    #[serde(default = "default_pointer_length")]
    pub length: f32,
    /// Points per ring.
    #[serde(default = "default_segments")]
    pub segments: usize,
    /// Ring count of the rear cap.
    #[serde(default = "default_rings")]
    pub rings: usize,
    /// Polar angle in degrees at which the rear cap rings start.
    #[serde(default = "default_hemisphere_angle")]
    pub hemisphere_angle_deg: f32,
    /// Forward travel of the mesh at full pinch strength.
    #[serde(default = "default_advance_max")]
    pub advance_max: f32,
    /// Opacity when the hand is fully relaxed.
    #[serde(default = "default_opacity_min")]
    pub opacity_min: f32,
    /// Opacity when the pinch is fully closed.
    #[serde(default = "default_opacity_max")]
    pub opacity_max: f32,
    /// Radius of the cursor sphere placed along the pointer ray.
    #[serde(default = "default_cursor_radius")]
    pub cursor_radius: f32,
    /// Cursor distance used when the ray hits nothing.
    #[serde(default = "default_cursor_max_distance")]
    pub cursor_max_distance: f32,
}

impl Default for PointerConfig {
    fn default() -> Self {
        Self {
            front_radius: default_front_radius(),
            rear_radius: default_rear_radius(),
            rear_radius_min: default_rear_radius_min(),
            length: default_pointer_length(),
            segments: default_segments(),
            rings: default_rings(),
            hemisphere_angle_deg: default_hemisphere_angle(),
            advance_max: default_advance_max(),
            opacity_min: default_opacity_min(),
            opacity_max: default_opacity_max(),
            cursor_radius: default_cursor_radius(),
            cursor_max_distance: default_cursor_max_distance(),
        }
    }
}

impl PointerConfig {
    pub fn hemisphere_angle(&self) -> f32 {
        self.hemisphere_angle_deg.to_radians()
    }

    /// Keeps a requested rear radius inside the printable range.
    pub fn clamp_rear_radius(&self, radius: f32) -> f32 {
        radius.clamp(self.rear_radius_min, self.rear_radius)
    }

    /// Vertex count of the pointer mesh: one front ring, the rear cap
    /// rings, and the two cap centers.
    pub fn vertex_count(&self) -> usize {
        (self.rings + 1) * self.segments + 2
    }
}

fn default_front_radius() -> f32 {
    0.002
}

fn default_rear_radius() -> f32 {
    0.01
}

fn default_rear_radius_min() -> f32 {
    0.003
}

fn default_pointer_length() -> f32 {
    0.035
}

fn default_segments() -> usize {
    16
}

fn default_rings() -> usize {
    12
}

fn default_hemisphere_angle() -> f32 {
    110.0
}

fn default_advance_max() -> f32 {
    0.02
}

fn default_opacity_min() -> f32 {
    0.4
}

fn default_opacity_max() -> f32 {
    1.0
}

fn default_cursor_radius() -> f32 {
    0.02
}

fn default_cursor_max_distance() -> f32 {
    1.5
}

/// Tuning for the skinned hand widget.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HandConfig {
    /// Radius of the touch sphere carried by the pointing joint.
    #[serde(default = "default_touch_radius")]
    pub touch_radius: f32,
    /// Joint whose position answers pointing queries.
    #[serde(default = "default_pointing_joint")]
    pub pointing_joint: Joint,
}

impl Default for HandConfig {
    fn default() -> Self {
        Self {
            touch_radius: default_touch_radius(),
            pointing_joint: default_pointing_joint(),
        }
    }
}

fn default_touch_radius() -> f32 {
    0.01
}

fn default_pointing_joint() -> Joint {
    Joint::IndexFingerTip
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pinch_defaults_match_tuning() {
        let config = PinchConfig::default();
        assert_eq!(config.min_distance, 0.01);
        assert_eq!(config.max_distance, 0.05);
        assert_eq!(config.threshold, 0.02);
    }

    #[test]
    fn pointer_defaults_match_tuning() {
        let config = PointerConfig::default();
        assert_eq!(config.front_radius, 0.002);
        assert_eq!(config.rear_radius, 0.01);
        assert_eq!(config.rear_radius_min, 0.003);
        assert_eq!(config.length, 0.035);
        assert_eq!(config.segments, 16);
        assert_eq!(config.rings, 12);
        assert_eq!(config.hemisphere_angle_deg, 110.0);
        assert_eq!(config.advance_max, 0.02);
        assert_eq!(config.opacity_min, 0.4);
        assert_eq!(config.opacity_max, 1.0);
        assert_eq!(config.cursor_radius, 0.02);
        assert_eq!(config.cursor_max_distance, 1.5);
        assert_eq!(config.vertex_count(), 13 * 16 + 2);
    }

    #[test]
    fn hand_defaults_match_tuning() {
        let config = HandConfig::default();
        assert_eq!(config.touch_radius, 0.01);
        assert_eq!(config.pointing_joint, Joint::IndexFingerTip);
    }

    #[test]
    fn strength_saturates_at_the_clamp_bounds() {
        let config = PinchConfig::default();
        assert_eq!(config.strength(0.005), 1.0);
        assert_eq!(config.strength(config.min_distance), 1.0);
        assert_eq!(config.strength(config.max_distance), 0.0);
        assert_eq!(config.strength(0.2), 0.0);
    }

    #[test]
    fn threshold_is_exclusive() {
        let config = PinchConfig::default();
        assert!(config.is_pinched(0.019));
        assert!(!config.is_pinched(0.02));
        assert!(!config.is_pinched(0.021));
    }

    #[test]
    fn clamp_covers_degenerate_radii() {
        let config = PointerConfig::default();
        assert_eq!(config.clamp_rear_radius(0.0), config.rear_radius_min);
        assert_eq!(config.clamp_rear_radius(0.007), 0.007);
        assert_eq!(config.clamp_rear_radius(1.0), config.rear_radius);
    }
}
