use std::f32::consts::PI;

use glam::{Quat, Vec3};

use crate::config::PointerConfig;

/// Flat position and index buffers ready for upload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub positions: Vec<f32>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Procedural mesh of the tapered pinch pointer.
///
/// The position buffer is allocated once at creation and rewritten in
/// place as the pinch narrows the rear cap; the triangle list never
/// changes. Layout: ring 0 is the front face, rings `1..=rings` wrap the
/// rear cap, and the last two vertices are the front and rear cap
/// centers.
#[derive(Debug, Clone)]
pub struct PointerGeometry {
    config: PointerConfig,
    positions: Vec<f32>,
    indices: Vec<u32>,
    dirty: bool,
}

impl PointerGeometry {
    pub fn new(config: &PointerConfig) -> Self {
        let config = config.clone();
        let mut geometry = Self {
            positions: vec![0.0; config.vertex_count() * 3],
            indices: build_indices(config.segments, config.rings),
            dirty: false,
            config,
        };
        let rear_radius = geometry.config.rear_radius;
        geometry.update_vertices(rear_radius);
        geometry
    }

    pub fn segments(&self) -> usize {
        self.config.segments
    }

    pub fn rings(&self) -> usize {
        self.config.rings
    }

    pub fn vertex_count(&self) -> usize {
        self.config.vertex_count()
    }

    pub fn positions(&self) -> &[f32] {
        &self.positions
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Reports and clears the pending-upload flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn point(&self, index: usize) -> Vec3 {
        let offset = index * 3;
        Vec3::new(
            self.positions[offset],
            self.positions[offset + 1],
            self.positions[offset + 2],
        )
    }

    pub fn ring_point(&self, ring: usize, segment: usize) -> Vec3 {
        self.point(ring * self.config.segments + segment)
    }

    pub fn front_center_index(&self) -> usize {
        self.config.segments * (1 + self.config.rings)
    }

    pub fn rear_center_index(&self) -> usize {
        self.front_center_index() + 1
    }

    /// Writes one ring of points starting at `ring * segments`.
    ///
    /// Point `i` is the base vector rotated about the z axis by
    /// `i * 2pi / segments`, so the ring keeps the base's distance from
    /// the axis and its z offset.
    pub fn write_ring(&mut self, base: Vec3, ring: usize) {
        let step = 2.0 * PI / self.config.segments as f32;
        for i in 0..self.config.segments {
            let point = Quat::from_rotation_z(step * i as f32) * base;
            self.set_point(ring * self.config.segments + i, point);
        }
    }

    /// Rewrites every vertex for the given rear cap radius and marks the
    /// buffer for upload. The radius is clamped to the configured range;
    /// the triangle list is untouched.
    pub fn update_vertices(&mut self, rear_radius: f32) {
        let rear_radius = self.config.clamp_rear_radius(rear_radius);
        let front_z = -(self.config.length - rear_radius);

        self.write_ring(Vec3::new(self.config.front_radius, 0.0, front_z), 0);

        let angle = self.config.hemisphere_angle();
        let ring_step = (PI - angle) / self.config.rings as f32;
        let mut rear_base = Vec3::new(angle.sin() * rear_radius, angle.cos() * rear_radius, 0.0);
        for ring in 1..=self.config.rings {
            self.write_ring(rear_base, ring);
            rear_base = Quat::from_rotation_y(ring_step) * rear_base;
        }

        let front_center = self.front_center_index();
        let rear_center = self.rear_center_index();
        self.set_point(front_center, Vec3::new(0.0, 0.0, front_z));
        self.set_point(rear_center, Vec3::new(0.0, 0.0, rear_radius));
        self.dirty = true;
    }

    pub fn mesh_data(&self) -> MeshData {
        MeshData {
            positions: self.positions.clone(),
            indices: self.indices.clone(),
        }
    }

    fn set_point(&mut self, index: usize, point: Vec3) {
        let offset = index * 3;
        self.positions[offset] = point.x;
        self.positions[offset + 1] = point.y;
        self.positions[offset + 2] = point.z;
    }
}

/// Triangle list for the pointer: two triangles per ring-gap quad plus a
/// fan per cap center. Built once; vertex rewrites reuse it.
fn build_indices(segments: usize, rings: usize) -> Vec<u32> {
    let segments = segments as u32;
    let rings = rings as u32;
    let mut indices = Vec::with_capacity(((rings + 1) * segments * 6) as usize);

    for ring in 0..rings {
        let row = ring * segments;
        let next_row = row + segments;
        for i in 0..segments - 1 {
            indices.extend_from_slice(&[row + i, row + i + 1, next_row + i]);
            indices.extend_from_slice(&[row + i + 1, next_row + i + 1, next_row + i]);
        }
        // seam quad joining the last segment back to the first
        indices.extend_from_slice(&[next_row - 1, row, next_row + segments - 1]);
        indices.extend_from_slice(&[row, next_row, next_row + segments - 1]);
    }

    let front_center = segments * (1 + rings);
    for i in 0..segments - 1 {
        indices.extend_from_slice(&[front_center, i + 1, i]);
    }
    indices.extend_from_slice(&[front_center, 0, segments - 1]);

    let rear_center = front_center + 1;
    let rear_row = rings * segments;
    for i in 0..segments - 1 {
        indices.extend_from_slice(&[rear_center, rear_row + i, rear_row + i + 1]);
    }
    indices.extend_from_slice(&[rear_center, rear_row + segments - 1, rear_row]);

    indices
}

/// Tessellates a unit-orientation sphere around the origin.
pub fn uv_sphere(radius: f32, sectors: usize, stacks: usize) -> MeshData {
    let mut positions = Vec::with_capacity((stacks + 1) * (sectors + 1) * 3);
    for stack in 0..=stacks {
        let polar = PI * stack as f32 / stacks as f32;
        for sector in 0..=sectors {
            let azimuth = 2.0 * PI * sector as f32 / sectors as f32;
            positions.push(radius * polar.sin() * azimuth.cos());
            positions.push(radius * polar.cos());
            positions.push(radius * polar.sin() * azimuth.sin());
        }
    }

    let mut indices = Vec::with_capacity(stacks * sectors * 6);
    let row = (sectors + 1) as u32;
    for stack in 0..stacks as u32 {
        for sector in 0..sectors as u32 {
            let a = stack * row + sector;
            let b = a + row;
            indices.extend_from_slice(&[a, b, a + 1]);
            indices.extend_from_slice(&[a + 1, b, b + 1]);
        }
    }

    MeshData { positions, indices }
}

/// Axis-aligned box used for touch and ray targets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn closest_point(&self, point: Vec3) -> Vec3 {
        point.clamp(self.min, self.max)
    }

    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        self.closest_point(center).distance_squared(center) <= radius * radius
    }
}

/// Half-line used for cursor placement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    pub fn point_at(&self, distance: f32) -> Vec3 {
        self.origin + self.direction * distance
    }

    /// Slab test returning the distance to the nearest boundary hit in
    /// front of the origin, or the exit distance when the origin is
    /// inside the box.
    pub fn intersect_aabb(&self, aabb: &Aabb) -> Option<f32> {
        let inverse = self.direction.recip();
        let to_min = (aabb.min - self.origin) * inverse;
        let to_max = (aabb.max - self.origin) * inverse;
        let near = to_min.min(to_max).max_element();
        let far = to_min.max(to_max).min_element();
        if near > far || far < 0.0 {
            return None;
        }
        Some(if near >= 0.0 { near } else { far })
    }
}

#[cfg(test)]
mod tests {
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use once_cell::sync::Lazy;

    use super::*;
    use crate::config::PointerConfig;

    static DEFAULT_GEOMETRY: Lazy<PointerGeometry> =
        Lazy::new(|| PointerGeometry::new(&PointerConfig::default()));

    fn radial_distance(point: Vec3) -> f32 {
        (point.x * point.x + point.y * point.y).sqrt()
    }

    #[test]
    fn ring_points_are_evenly_spaced_about_z() {
        let config = PointerConfig::default();
        let mut geometry = PointerGeometry::new(&config);
        let base = Vec3::new(0.004, 0.003, -0.02);
        geometry.write_ring(base, 2);

        let step = 2.0 * PI / config.segments as f32;
        let base_angle = base.y.atan2(base.x);
        for i in 0..config.segments {
            let point = geometry.ring_point(2, i);
            assert_abs_diff_eq!(radial_distance(point), radial_distance(base), epsilon = 1e-6);
            assert_abs_diff_eq!(point.z, base.z, epsilon = 1e-6);
            let expected = base_angle + step * i as f32;
            let actual = point.y.atan2(point.x);
            let wrapped = (actual - expected).rem_euclid(2.0 * PI);
            assert!(wrapped < 1e-4 || wrapped > 2.0 * PI - 1e-4);
        }
    }

    #[test]
    fn index_counts_cover_tube_and_caps() {
        let config = PointerConfig::default();
        let geometry = &DEFAULT_GEOMETRY;
        let tube = config.rings * config.segments * 6;
        let caps = 2 * config.segments * 3;
        assert_eq!(geometry.indices().len(), tube + caps);

        let vertex_count = geometry.vertex_count() as u32;
        assert!(geometry.indices().iter().all(|&index| index < vertex_count));
    }

    #[test]
    fn every_vertex_is_referenced_by_a_triangle() {
        let geometry = &DEFAULT_GEOMETRY;
        let mut seen = vec![false; geometry.vertex_count()];
        for &index in geometry.indices() {
            seen[index as usize] = true;
        }
        assert!(seen.into_iter().all(|referenced| referenced));
    }

    #[test]
    fn arena_size_is_fixed_across_updates() {
        let config = PointerConfig::default();
        let mut geometry = PointerGeometry::new(&config);
        let expected = config.vertex_count() * 3;
        assert_eq!(geometry.positions().len(), expected);
        geometry.update_vertices(0.004);
        geometry.update_vertices(0.009);
        assert_eq!(geometry.positions().len(), expected);
    }

    #[test]
    fn update_writes_front_ring_and_cap_centers() {
        let config = PointerConfig::default();
        let mut geometry = PointerGeometry::new(&config);
        geometry.update_vertices(config.rear_radius);

        let front_z = -(config.length - config.rear_radius);
        for i in 0..config.segments {
            let point = geometry.ring_point(0, i);
            assert_abs_diff_eq!(radial_distance(point), config.front_radius, epsilon = 1e-6);
            assert_abs_diff_eq!(point.z, front_z, epsilon = 1e-6);
        }

        let front_center = geometry.point(geometry.front_center_index());
        assert_abs_diff_eq!(front_center.z, front_z, epsilon = 1e-6);
        let rear_center = geometry.point(geometry.rear_center_index());
        assert_abs_diff_eq!(rear_center.z, config.rear_radius, epsilon = 1e-6);
    }

    #[test]
    fn rear_cap_rings_stay_on_the_cap_sphere() {
        let config = PointerConfig::default();
        let mut geometry = PointerGeometry::new(&config);
        geometry.update_vertices(config.rear_radius);
        for ring in 1..=config.rings {
            let point = geometry.ring_point(ring, 0);
            assert_relative_eq!(point.length(), config.rear_radius, epsilon = 1e-6);
        }
    }

    #[test]
    fn update_clamps_out_of_range_radii() {
        let config = PointerConfig::default();
        let mut geometry = PointerGeometry::new(&config);

        geometry.update_vertices(0.0);
        let rear = geometry.point(geometry.rear_center_index());
        assert_abs_diff_eq!(rear.z, config.rear_radius_min, epsilon = 1e-6);

        geometry.update_vertices(10.0);
        let rear = geometry.point(geometry.rear_center_index());
        assert_abs_diff_eq!(rear.z, config.rear_radius, epsilon = 1e-6);
    }

    #[test]
    fn dirty_flag_tracks_vertex_updates() {
        let config = PointerConfig::default();
        let mut geometry = PointerGeometry::new(&config);
        assert!(geometry.take_dirty());
        assert!(!geometry.take_dirty());
        geometry.update_vertices(0.005);
        assert!(geometry.take_dirty());
    }

    #[test]
    fn sphere_counts_match_tessellation() {
        let sphere = uv_sphere(0.02, 12, 8);
        assert_eq!(sphere.vertex_count(), 13 * 9);
        assert_eq!(sphere.triangle_count(), 12 * 8 * 2);
        let vertex_count = sphere.vertex_count() as u32;
        assert!(sphere.indices.iter().all(|&index| index < vertex_count));
    }

    #[test]
    fn sphere_points_sit_on_the_radius() {
        let sphere = uv_sphere(0.5, 6, 4);
        for chunk in sphere.positions.chunks_exact(3) {
            let point = Vec3::new(chunk[0], chunk[1], chunk[2]);
            assert_relative_eq!(point.length(), 0.5, epsilon = 1e-5);
        }
    }

    #[test]
    fn ray_hits_box_at_near_face() {
        let aabb = Aabb::new(Vec3::new(-1.0, -1.0, 4.0), Vec3::new(1.0, 1.0, 6.0));
        let ray = Ray::new(Vec3::ZERO, Vec3::Z);
        assert_abs_diff_eq!(ray.intersect_aabb(&aabb).unwrap(), 4.0, epsilon = 1e-6);

        let miss = Ray::new(Vec3::new(5.0, 0.0, 0.0), Vec3::Z);
        assert!(miss.intersect_aabb(&aabb).is_none());

        let behind = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::Z);
        assert!(behind.intersect_aabb(&aabb).is_none());
    }

    #[test]
    fn ray_from_inside_reports_exit_distance() {
        let aabb = Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        let ray = Ray::new(Vec3::ZERO, Vec3::Z);
        assert_abs_diff_eq!(ray.intersect_aabb(&aabb).unwrap(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn sphere_box_overlap_uses_closest_point() {
        let aabb = Aabb::from_center_half_extents(Vec3::ZERO, Vec3::splat(1.0));
        assert!(aabb.intersects_sphere(Vec3::new(1.5, 0.0, 0.0), 0.6));
        assert!(!aabb.intersects_sphere(Vec3::new(1.5, 0.0, 0.0), 0.4));
        assert!(aabb.intersects_sphere(Vec3::ZERO, 0.1));
    }
}
