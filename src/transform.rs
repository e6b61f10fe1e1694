//! Position, rotation, and scale of an object, with lazily derived world matrices.
//!
//! Rotation is stored as Euler angles in radians, `(pitch, yaw, roll)`, applied
//! roll first (about Z), then pitch (about X), then yaw (about Y). The world
//! matrix applies scale, then rotation, then translation.
//!
//! All coordinates are left-handed: `+X` right, `+Y` up, `+Z` forward. A yaw of
//! `π/2` turns the forward axis `+Z` onto `+X`.
//!
//! # Example
//!
//! ```
//! use penumbra::{Transform, Vec3};
//!
//! let mut transform = Transform::new();
//! transform.move_absolute(Vec3::new(3.0, 0.0, 0.0));
//! transform.rotate(Vec3::new(0.0, std::f32::consts::FRAC_PI_2, 0.0));
//!
//! let world = transform.world_matrix();
//! let p = world.transform_point3(Vec3::Z);
//! assert!(p.abs_diff_eq(Vec3::new(4.0, 0.0, 0.0), 1e-5));
//! ```

use glam::{EulerRot, Mat4, Quat, Vec3};

use crate::cache::Cached;

/// The world matrix and the matrix used to transform normals, derived together.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorldMatrices {
    /// Local space to world space.
    pub world: Mat4,
    /// Inverse transpose of `world`, correct for normals under non-uniform scale.
    pub world_inverse_transpose: Mat4,
}

impl WorldMatrices {
    const IDENTITY: Self = Self {
        world: Mat4::IDENTITY,
        world_inverse_transpose: Mat4::IDENTITY,
    };

    fn compose(position: Vec3, rotation: Vec3, scale: Vec3) -> Self {
        let world =
            Mat4::from_scale_rotation_translation(scale, euler_to_quat(rotation), position);
        Self {
            world,
            world_inverse_transpose: world.inverse().transpose(),
        }
    }
}

/// An object's placement in the world.
///
/// Every setter and mutator invalidates the cached matrices; the next call to
/// [`world_matrix`](Self::world_matrix) or
/// [`world_inverse_transpose_matrix`](Self::world_inverse_transpose_matrix)
/// recomputes both. Reading either one is therefore always fresh, regardless of
/// call order.
#[derive(Clone, Debug)]
pub struct Transform {
    position: Vec3,
    rotation: Vec3,
    scale: Vec3,
    matrices: Cached<WorldMatrices>,
    revision: u64,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            matrices: Cached::new(WorldMatrices::IDENTITY),
            revision: 0,
        }
    }
}

impl Transform {
    /// Creates an identity transform (origin, no rotation, unit scale).
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transform at the given position.
    pub fn from_position(position: impl Into<Vec3>) -> Self {
        let mut transform = Self::new();
        transform.set_position(position);
        transform
    }

    /// Builder form of [`set_position`](Self::set_position).
    pub fn with_position(mut self, position: impl Into<Vec3>) -> Self {
        self.set_position(position);
        self
    }

    /// Builder form of [`set_rotation`](Self::set_rotation).
    pub fn with_rotation(mut self, pitch_yaw_roll: impl Into<Vec3>) -> Self {
        self.set_rotation(pitch_yaw_roll);
        self
    }

    /// Builder form of [`set_scale`](Self::set_scale).
    pub fn with_scale(mut self, scale: impl Into<Vec3>) -> Self {
        self.set_scale(scale);
        self
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Euler angles `(pitch, yaw, roll)` in radians.
    pub fn rotation(&self) -> Vec3 {
        self.rotation
    }

    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    /// Current orientation as a quaternion.
    pub fn orientation(&self) -> Quat {
        euler_to_quat(self.rotation)
    }

    /// Local `+Z` rotated into world space.
    pub fn forward(&self) -> Vec3 {
        self.orientation() * Vec3::Z
    }

    /// Local `+X` rotated into world space.
    pub fn right(&self) -> Vec3 {
        self.orientation() * Vec3::X
    }

    /// Local `+Y` rotated into world space.
    pub fn up(&self) -> Vec3 {
        self.orientation() * Vec3::Y
    }

    /// Counter bumped by every mutation.
    ///
    /// Dependents that cache something derived from this transform (the camera's
    /// view matrix) compare revisions instead of trusting a notification.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Returns the world matrix, recomputing it if anything changed.
    pub fn world_matrix(&mut self) -> Mat4 {
        self.world_matrices().world
    }

    /// Returns the inverse transpose of the world matrix, recomputing if needed.
    pub fn world_inverse_transpose_matrix(&mut self) -> Mat4 {
        self.world_matrices().world_inverse_transpose
    }

    /// Returns both world matrices, recomputing them together if needed.
    pub fn world_matrices(&mut self) -> WorldMatrices {
        let (position, rotation, scale) = (self.position, self.rotation, self.scale);
        self.matrices
            .get_or_update(|| WorldMatrices::compose(position, rotation, scale))
    }

    pub fn set_position(&mut self, position: impl Into<Vec3>) {
        self.position = position.into();
        self.touch();
    }

    /// Replaces the Euler angles `(pitch, yaw, roll)`.
    pub fn set_rotation(&mut self, pitch_yaw_roll: impl Into<Vec3>) {
        self.rotation = pitch_yaw_roll.into();
        self.touch();
    }

    pub fn set_scale(&mut self, scale: impl Into<Vec3>) {
        self.scale = scale.into();
        self.touch();
    }

    /// Adds an offset to the position along the world axes.
    pub fn move_absolute(&mut self, offset: impl Into<Vec3>) {
        self.position += offset.into();
        self.touch();
    }

    /// Adds an offset expressed in the transform's own axes.
    ///
    /// `move_relative(Vec3::Z)` moves one unit along [`forward`](Self::forward).
    pub fn move_relative(&mut self, offset: impl Into<Vec3>) {
        self.position += self.orientation() * offset.into();
        self.touch();
    }

    /// Adds to the Euler angles `(pitch, yaw, roll)`.
    pub fn rotate(&mut self, delta: impl Into<Vec3>) {
        self.rotation += delta.into();
        self.touch();
    }

    /// Multiplies the scale component-wise.
    pub fn scale_by(&mut self, factors: impl Into<Vec3>) {
        self.scale *= factors.into();
        self.touch();
    }

    fn touch(&mut self) {
        self.matrices.invalidate();
        self.revision = self.revision.wrapping_add(1);
    }
}

/// Roll about Z, then pitch about X, then yaw about Y.
fn euler_to_quat(pitch_yaw_roll: Vec3) -> Quat {
    Quat::from_euler(
        EulerRot::YXZ,
        pitch_yaw_roll.y,
        pitch_yaw_roll.x,
        pitch_yaw_roll.z,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    const EPS: f32 = 1e-5;

    #[test]
    fn new_transform_is_identity() {
        let mut t = Transform::new();
        assert_eq!(t.world_matrix(), Mat4::IDENTITY);
        assert_eq!(t.world_inverse_transpose_matrix(), Mat4::IDENTITY);
        assert_eq!(t.scale(), Vec3::ONE);
    }

    #[test]
    fn repeated_reads_are_bit_identical() {
        let mut t = Transform::new()
            .with_position(Vec3::new(1.5, -2.0, 7.25))
            .with_rotation(Vec3::new(0.3, 1.1, -0.4))
            .with_scale(Vec3::new(2.0, 0.5, 3.0));

        let a = t.world_matrix();
        let b = t.world_matrix();
        assert_eq!(a.to_cols_array(), b.to_cols_array());
    }

    #[test]
    fn every_mutator_invalidates() {
        type Mutation = fn(&mut Transform);
        let mutations: [Mutation; 7] = [
            |t| t.set_position(Vec3::new(1.0, 0.0, 0.0)),
            |t| t.set_rotation(Vec3::new(0.0, 0.5, 0.0)),
            |t| t.set_scale(Vec3::new(2.0, 2.0, 2.0)),
            |t| t.move_absolute(Vec3::new(0.0, 1.0, 0.0)),
            |t| t.move_relative(Vec3::new(0.0, 0.0, 1.0)),
            |t| t.rotate(Vec3::new(0.25, 0.0, 0.0)),
            |t| t.scale_by(Vec3::new(1.0, 3.0, 1.0)),
        ];

        for mutate in mutations {
            let mut t = Transform::new();
            let before = t.world_matrix();
            mutate(&mut t);
            assert_ne!(t.world_matrix(), before);
        }
    }

    #[test]
    fn scale_is_applied_before_translation() {
        let mut t = Transform::new()
            .with_position(Vec3::new(1.0, 0.0, 0.0))
            .with_scale(Vec3::new(2.0, 1.0, 1.0));

        let p = t.world_matrix().transform_point3(Vec3::X);
        assert!(p.abs_diff_eq(Vec3::new(3.0, 0.0, 0.0), EPS));
    }

    #[test]
    fn yaw_turns_forward_onto_positive_x() {
        let mut t = Transform::new();
        t.rotate(Vec3::new(0.0, FRAC_PI_2, 0.0));
        assert!(t.forward().abs_diff_eq(Vec3::X, EPS));
    }

    #[test]
    fn move_relative_follows_orientation() {
        let mut t = Transform::new().with_rotation(Vec3::new(0.0, FRAC_PI_2, 0.0));
        t.move_relative(Vec3::new(0.0, 0.0, 1.0));

        assert!(t.position().abs_diff_eq(Vec3::new(1.0, 0.0, 0.0), EPS));
    }

    #[test]
    fn positive_pitch_looks_down() {
        let t = Transform::new().with_rotation(Vec3::new(0.5, 0.0, 0.0));
        assert!(t.forward().y < 0.0);
    }

    #[test]
    fn move_then_rotate_scenario() {
        let mut t = Transform::new();
        t.move_absolute(Vec3::new(3.0, 0.0, 0.0));
        t.rotate(Vec3::new(0.0, FRAC_PI_2, 0.0));

        let world = t.world_matrix();
        assert!(world.w_axis.truncate().abs_diff_eq(Vec3::new(3.0, 0.0, 0.0), EPS));
        let p = world.transform_point3(Vec3::Z);
        assert!(p.abs_diff_eq(Vec3::new(4.0, 0.0, 0.0), EPS));
    }

    #[test]
    fn accumulating_mutators_add_and_multiply() {
        let mut t = Transform::new();
        t.rotate(Vec3::new(0.1, 0.2, 0.3));
        t.rotate(Vec3::new(0.1, 0.2, 0.3));
        t.scale_by(Vec3::new(2.0, 3.0, 4.0));
        t.scale_by(Vec3::new(2.0, 3.0, 4.0));

        assert!(t.rotation().abs_diff_eq(Vec3::new(0.2, 0.4, 0.6), EPS));
        assert!(t.scale().abs_diff_eq(Vec3::new(4.0, 9.0, 16.0), EPS));
    }

    #[test]
    fn inverse_transpose_is_fresh_without_world_read() {
        let mut t = Transform::new();
        t.set_scale(Vec3::new(2.0, 4.0, 8.0));

        let it = t.world_inverse_transpose_matrix();
        let expected = Mat4::from_scale(Vec3::new(0.5, 0.25, 0.125));
        assert!(it.abs_diff_eq(expected, EPS));
    }

    #[test]
    fn inverse_transpose_keeps_normals_perpendicular() {
        let mut t = Transform::new()
            .with_rotation(Vec3::new(0.0, 0.7, 0.0))
            .with_scale(Vec3::new(4.0, 1.0, 1.0));
        let m = t.world_matrices();

        // A 45 degree slope in XY: tangent (1,1,0), normal (1,-1,0).
        let tangent = m.world.transform_vector3(Vec3::new(1.0, 1.0, 0.0));
        let normal = m
            .world_inverse_transpose
            .transform_vector3(Vec3::new(1.0, -1.0, 0.0));
        assert!(tangent.dot(normal).abs() < 1e-4);
    }

    #[test]
    fn revision_counts_mutations() {
        let mut t = Transform::new();
        assert_eq!(t.revision(), 0);
        t.move_absolute(Vec3::X);
        t.rotate(Vec3::Y);
        assert_eq!(t.revision(), 2);
        let _ = t.world_matrix();
        assert_eq!(t.revision(), 2);
    }
}
