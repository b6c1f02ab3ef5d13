//! Object poses with lazily cached world matrices.
//!
//! A [`Transform`] holds an origin (the pivot for rotation and scaling), a
//! position, a rotation and a per-axis scale. The world matrix is composed as
//!
//! ```text
//! translation(position - origin) * rotation * scale
//! ```
//!
//! and is only rebuilt when something changed since the last read. The inverse
//! is cached separately, so code that only needs the forward matrix never pays
//! for a 4x4 inverse.
//!
//! # Example
//!
//! ```
//! use vantage::Transform;
//! use vantage::math::{Angle, Vector3f};
//!
//! let mut transform = Transform::new()
//!     .with_position(Vector3f::new(0.0, 1.0, 0.0))
//!     .with_uniform_scale(2.0);
//! transform.rotate(Vector3f::Y, Angle::degrees(90.0));
//!
//! let world = transform.matrix();
//! let p = world.transform_point(Vector3f::new(1.0, 0.0, 0.0));
//! assert!((p.y - 1.0).abs() < 1e-5);
//! ```

use crate::math::{Angle, Matrix4, Quaternion, Vector3f};

/// Position, rotation, scale and origin of an object, plus cached matrices.
///
/// Matrix getters take `&mut self` because they may refresh the cache.
#[derive(Clone, Debug)]
pub struct Transform {
    origin: Vector3f,
    position: Vector3f,
    rotation: Quaternion,
    scale: Vector3f,
    matrix: Matrix4,
    matrix_dirty: bool,
    inverse: Matrix4,
    inverse_dirty: bool,
    revision: u64,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            origin: Vector3f::ZERO,
            position: Vector3f::ZERO,
            rotation: Quaternion::IDENTITY,
            scale: Vector3f::ONE,
            matrix: Matrix4::IDENTITY,
            matrix_dirty: true,
            inverse: Matrix4::IDENTITY,
            inverse_dirty: true,
            revision: 0,
        }
    }
}

impl Transform {
    /// Identity transform: no offset, no rotation, unit scale.
    pub fn new() -> Self {
        Self::default()
    }

    /// Identity transform placed at `position`.
    pub fn from_position(position: Vector3f) -> Self {
        Self::new().with_position(position)
    }

    /// Builder form of [`set_position`](Self::set_position).
    pub fn with_position(mut self, position: Vector3f) -> Self {
        self.set_position(position);
        self
    }

    /// Builder form of [`set_rotation`](Self::set_rotation).
    pub fn with_rotation(mut self, rotation: Quaternion) -> Self {
        self.set_rotation(rotation);
        self
    }

    /// Builder form of [`set_scale`](Self::set_scale).
    pub fn with_scale(mut self, scale: Vector3f) -> Self {
        self.set_scale(scale);
        self
    }

    /// Builder form of [`set_uniform_scale`](Self::set_uniform_scale).
    pub fn with_uniform_scale(mut self, factor: f32) -> Self {
        self.set_scale(Vector3f::splat(factor));
        self
    }

    /// Builder form of [`set_origin`](Self::set_origin).
    pub fn with_origin(mut self, origin: Vector3f) -> Self {
        self.set_origin(origin);
        self
    }

    fn invalidate(&mut self) {
        self.matrix_dirty = true;
        self.inverse_dirty = true;
        self.revision = self.revision.wrapping_add(1);
    }

    /// Places the origin point at `position` in world space.
    pub fn set_position(&mut self, position: Vector3f) {
        self.position = position;
        self.invalidate();
    }

    /// Replaces the rotation. `rotation` is expected to be unit length.
    pub fn set_rotation(&mut self, rotation: Quaternion) {
        self.rotation = rotation;
        self.invalidate();
    }

    /// Replaces the rotation with `angle` around `axis`.
    pub fn set_rotation_axis(&mut self, axis: Vector3f, angle: Angle) {
        self.set_rotation(Quaternion::from_axis_angle(axis, angle));
    }

    /// Swings the position around `pivot` by `angle` and replaces the rotation
    /// with that same axis-angle rotation.
    pub fn set_rotation_around(&mut self, pivot: Vector3f, axis: Vector3f, angle: Angle) {
        let rotation = self.orbit(pivot, axis, angle);
        self.set_rotation(rotation);
    }

    /// Sets the per-axis scale, applied before rotation.
    pub fn set_scale(&mut self, scale: Vector3f) {
        self.scale = scale;
        self.invalidate();
    }

    /// Scales all three axes by `factor`.
    pub fn set_uniform_scale(&mut self, factor: f32) {
        self.set_scale(Vector3f::splat(factor));
    }

    /// Sets the local pivot that rotation and scale act around.
    pub fn set_origin(&mut self, origin: Vector3f) {
        self.origin = origin;
        self.invalidate();
    }

    /// World position of the origin point.
    pub fn position(&self) -> Vector3f {
        self.position
    }

    /// Current orientation.
    pub fn rotation(&self) -> Quaternion {
        self.rotation
    }

    /// Per-axis scale.
    pub fn scale(&self) -> Vector3f {
        self.scale
    }

    /// Local pivot point.
    pub fn origin(&self) -> Vector3f {
        self.origin
    }

    /// Heading in the XY plane, derived from the right vector.
    ///
    /// Only meaningful when the object is rotated about a single axis; for
    /// general 3D orientations the value has no useful interpretation.
    pub fn rotation_2d(&self) -> Angle {
        let right = self.rotation.right();
        Angle::radians((right.y / right.x).atan())
    }

    /// Moves by `offset` in world space.
    pub fn translate(&mut self, offset: Vector3f) {
        self.set_position(self.position + offset);
    }

    /// Applies `angle` around the world-space `axis` on top of the current rotation.
    pub fn rotate(&mut self, axis: Vector3f, angle: Angle) {
        self.rotate_quat(Quaternion::from_axis_angle(axis, angle));
    }

    /// Pre-multiplies `rotation` onto the current rotation and renormalizes.
    pub fn rotate_quat(&mut self, rotation: Quaternion) {
        self.set_rotation((rotation * self.rotation).normalized());
    }

    /// Orbits the position around `pivot` (relative to the origin) and turns
    /// the object by the same amount.
    pub fn rotate_around(&mut self, pivot: Vector3f, axis: Vector3f, angle: Angle) {
        let rotation = self.orbit(pivot, axis, angle);
        self.rotate_quat(rotation);
    }

    fn orbit(&mut self, pivot: Vector3f, axis: Vector3f, angle: Angle) -> Quaternion {
        let rotation = Quaternion::from_axis_angle(axis, angle).normalized();
        let arm = self.position - self.origin - pivot;
        self.set_position(pivot + arm.rotate(rotation) + self.origin);
        rotation
    }

    /// Multiplies the current scale componentwise.
    pub fn scale_by(&mut self, factor: Vector3f) {
        self.set_scale(Vector3f::new(
            self.scale.x * factor.x,
            self.scale.y * factor.y,
            self.scale.z * factor.z,
        ));
    }

    /// Back to the identity pose; both caches are invalidated.
    pub fn reset(&mut self) {
        let revision = self.revision;
        *self = Self::default();
        self.revision = revision;
        self.invalidate();
    }

    /// Local-to-world matrix, rebuilt only if the pose changed.
    pub fn matrix(&mut self) -> Matrix4 {
        if self.matrix_dirty {
            self.matrix = Matrix4::translation(self.position - self.origin)
                * self.rotation.to_rotation_matrix()
                * Matrix4::scale(self.scale);
            self.matrix_dirty = false;
        }
        self.matrix
    }

    /// World-to-local matrix, a full 4x4 inverse of [`matrix`](Self::matrix).
    pub fn inverse_matrix(&mut self) -> Matrix4 {
        if self.inverse_dirty {
            self.inverse = self.matrix().inverse();
            self.inverse_dirty = false;
        }
        self.inverse
    }

    /// True when the next [`matrix`](Self::matrix) call will rebuild the matrix.
    pub fn matrix_needs_update(&self) -> bool {
        self.matrix_dirty
    }

    /// True when the next [`inverse_matrix`](Self::inverse_matrix) call will recompute the inverse.
    pub fn inverse_needs_update(&self) -> bool {
        self.inverse_dirty
    }

    /// Incremented on every mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_transform_is_identity() {
        let mut t = Transform::new();
        assert_eq!(t.matrix(), Matrix4::IDENTITY);
        assert_eq!(t.inverse_matrix(), Matrix4::IDENTITY);
    }

    #[test]
    fn cache_is_reused_until_mutation() {
        let mut t = Transform::from_position(Vector3f::new(1.0, 2.0, 3.0));
        assert!(t.matrix_needs_update());

        let first = t.matrix();
        assert!(!t.matrix_needs_update());
        let revision = t.revision();
        let second = t.matrix();
        assert_eq!(first.to_cols_array_2d(), second.to_cols_array_2d());
        assert_eq!(t.revision(), revision);
        assert!(!t.matrix_needs_update());
    }

    #[test]
    fn every_mutator_invalidates_both_caches() {
        let mutators: [fn(&mut Transform); 6] = [
            |t| t.set_position(Vector3f::new(0.0, 5.0, 0.0)),
            |t| t.set_rotation_axis(Vector3f::X, Angle::degrees(30.0)),
            |t| t.set_scale(Vector3f::new(1.0, 2.0, 1.0)),
            |t| t.set_origin(Vector3f::new(0.5, 0.0, 0.0)),
            |t| t.translate(Vector3f::Z),
            |t| t.rotate(Vector3f::Y, Angle::degrees(10.0)),
        ];

        for mutate in mutators {
            let mut t = Transform::new();
            let before = t.matrix();
            t.inverse_matrix();

            mutate(&mut t);
            assert!(t.matrix_needs_update());
            assert!(t.inverse_needs_update());
            assert_ne!(t.matrix(), before);
            assert!(!t.matrix_needs_update());
            assert!(t.inverse_needs_update());
        }
    }

    #[test]
    fn inverse_undoes_matrix() {
        let mut t = Transform::new()
            .with_position(Vector3f::new(3.0, -1.0, 2.0))
            .with_scale(Vector3f::new(2.0, 2.0, 0.5))
            .with_origin(Vector3f::new(0.0, 1.0, 0.0));
        t.rotate(Vector3f::new(1.0, 1.0, 0.0).normalized(), Angle::degrees(75.0));

        let p = Vector3f::new(0.25, 4.0, -3.0);
        let round_trip = t.inverse_matrix().transform_point(t.matrix().transform_point(p));
        assert!(round_trip.distance(p) < 1e-4);
    }

    #[test]
    fn composition_is_translate_rotate_scale() {
        let mut t = Transform::new()
            .with_position(Vector3f::new(10.0, 0.0, 0.0))
            .with_scale(Vector3f::new(2.0, 1.0, 1.0))
            .with_rotation(Quaternion::from_axis_angle(Vector3f::Z, Angle::degrees(90.0)));

        // scale x by 2, turn +X into +Y, then move
        let p = t.matrix().transform_point(Vector3f::X);
        assert!(p.distance(Vector3f::new(10.0, 2.0, 0.0)) < 1e-5);
    }

    #[test]
    fn origin_offsets_translation() {
        let mut t = Transform::new()
            .with_position(Vector3f::new(5.0, 0.0, 0.0))
            .with_origin(Vector3f::new(1.0, 0.0, 0.0));
        assert_eq!(t.matrix().transform_point(Vector3f::ZERO), Vector3f::new(4.0, 0.0, 0.0));
    }

    #[test]
    fn rotate_pre_multiplies_in_world_space() {
        let mut t = Transform::new();
        t.rotate(Vector3f::X, Angle::degrees(90.0));
        t.rotate(Vector3f::Y, Angle::degrees(90.0));

        let expected = Quaternion::from_axis_angle(Vector3f::Y, Angle::degrees(90.0))
            * Quaternion::from_axis_angle(Vector3f::X, Angle::degrees(90.0));
        assert!((t.rotation().dot(expected).abs() - 1.0).abs() < 1e-5);
        assert!((t.rotation().length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn rotate_around_orbits_pivot() {
        let mut t = Transform::from_position(Vector3f::new(2.0, 0.0, 0.0));
        t.rotate_around(Vector3f::new(1.0, 0.0, 0.0), Vector3f::Y, Angle::degrees(180.0));
        assert!(t.position().distance(Vector3f::ZERO) < 1e-5);
        assert!(t.rotation().forward().distance(-Vector3f::Z) < 1e-5);
    }

    #[test]
    fn set_rotation_around_swings_about_a_fixed_pivot() {
        let pivot = Vector3f::new(1.0, 0.0, 0.0);
        let mut t = Transform::new();
        t.set_rotation_around(pivot, Vector3f::Y, Angle::degrees(90.0));

        // the arm (-1, 0, 0) turns to (0, 0, 1)
        assert!(t.position().distance(Vector3f::new(1.0, 0.0, 1.0)) < 1e-5);
        assert!(t.rotation().forward().distance(Vector3f::X) < 1e-5);
        // the local point that sat on the pivot has not moved
        assert!(t.matrix().transform_point(pivot).distance(pivot) < 1e-5);
    }

    #[test]
    fn set_rotation_around_replaces_the_rotation() {
        let mut t = Transform::new().with_rotation(Quaternion::from_axis_angle(Vector3f::X, Angle::degrees(45.0)));
        t.set_rotation_around(Vector3f::ZERO, Vector3f::Y, Angle::degrees(90.0));

        let expected = Quaternion::from_axis_angle(Vector3f::Y, Angle::degrees(90.0));
        assert!((t.rotation().dot(expected).abs() - 1.0).abs() < 1e-5);
        assert_eq!(t.position(), Vector3f::ZERO);
    }

    #[test]
    fn rotation_2d_reads_back_z_rotation() {
        let mut t = Transform::new();
        t.set_rotation_axis(Vector3f::Z, Angle::degrees(30.0));
        assert!((t.rotation_2d().as_degrees() - 30.0).abs() < 1e-3);
    }

    #[test]
    fn reset_restores_identity_and_dirties_cache() {
        let mut t = Transform::from_position(Vector3f::ONE);
        t.matrix();
        t.reset();
        assert!(t.matrix_needs_update());
        assert_eq!(t.position(), Vector3f::ZERO);
        assert_eq!(t.matrix(), Matrix4::IDENTITY);
    }

    #[test]
    fn scale_by_multiplies() {
        let mut t = Transform::new().with_uniform_scale(2.0);
        t.scale_by(Vector3f::new(1.0, 3.0, 0.5));
        assert_eq!(t.scale(), Vector3f::new(2.0, 6.0, 1.0));
    }
}
