//! Light-space matrices for a directional shadow caster.
//!
//! A directional light has no position, so the shadow camera is placed
//! `distance` units back along the light direction, looking at the origin,
//! with a square orthographic frustum `size` units wide.

use glam::{Mat4, Vec3, Vec4Swizzles};

use crate::camera::look_to;
use crate::error::ConfigError;

/// View and projection of the shadow camera.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LightSpace {
    pub view: Mat4,
    pub projection: Mat4,
}

/// Parameters of the orthographic light frustum.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LightFrustum {
    pub distance: f32,
    pub size: f32,
    pub near: f32,
    pub far: f32,
}

impl LightSpace {
    /// Derives the shadow camera for a light shining along `direction`.
    ///
    /// The direction need not be normalised but must be non-zero.
    pub fn new(direction: Vec3, frustum: LightFrustum) -> Result<Self, ConfigError> {
        let dir = direction
            .try_normalize()
            .ok_or(ConfigError::ZeroLightDirection)?;
        Ok(Self::from_unit_direction(dir, frustum))
    }

    /// Like [`new`](Self::new) for a direction already known to be unit length.
    pub fn from_unit_direction(dir: Vec3, frustum: LightFrustum) -> Self {
        Self {
            view: look_along(dir, frustum.distance),
            projection: light_projection(frustum.size, frustum.near, frustum.far),
        }
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }

    /// Returns the shadow-map texture coordinate and depth of a world point.
    ///
    /// `x, y` are in `[0, 1]` texture space (`v` pointing down), `z` is the
    /// depth the shadow pass would have written for that point.
    pub fn shadow_coord(&self, world: Vec3) -> Vec3 {
        let clip = self.view_projection() * world.extend(1.0);
        let ndc = clip.xyz() / clip.w;
        Vec3::new(ndc.x * 0.5 + 0.5, -ndc.y * 0.5 + 0.5, ndc.z)
    }

    /// Returns true if the point lies inside the light frustum.
    pub fn contains(&self, world: Vec3) -> bool {
        let c = self.shadow_coord(world);
        (0.0..=1.0).contains(&c.x) && (0.0..=1.0).contains(&c.y) && (0.0..=1.0).contains(&c.z)
    }
}

/// Look-to matrix for the shadow camera.
///
/// Uses `+Y` as up, or `+Z` when the light points straight up or down.
fn look_along(dir: Vec3, distance: f32) -> Mat4 {
    look_to(-dir * distance, dir, Vec3::Z)
}

/// Square orthographic projection, depth mapped to `[0, 1]`.
pub fn light_projection(size: f32, near: f32, far: f32) -> Mat4 {
    let half = size * 0.5;
    Mat4::orthographic_lh(-half, half, -half, half, near, far)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frustum(size: f32) -> LightFrustum {
        LightFrustum {
            distance: 20.0,
            size,
            near: 1.0,
            far: 100.0,
        }
    }

    #[test]
    fn straight_down_light_contains_points_within_half_size() {
        let space = LightSpace::new(Vec3::new(0.0, -1.0, 0.0), frustum(15.0)).unwrap();
        assert!(space.contains(Vec3::new(7.0, 0.0, 7.0)));
        assert!(!space.contains(Vec3::new(20.0, 0.0, 0.0)));
    }

    fn view_for(direction: Vec3) -> Result<Mat4, ConfigError> {
        LightSpace::new(direction, frustum(20.0)).map(|space| space.view)
    }

    #[test]
    fn straight_down_view_is_finite() {
        let view = view_for(Vec3::NEG_Y).unwrap();
        assert!(view.is_finite());
        // The eye sits 20 units above the origin, looking down.
        let origin = view.transform_point3(Vec3::ZERO);
        assert!(origin.abs_diff_eq(Vec3::new(0.0, 0.0, 20.0), 1e-5));
    }

    #[test]
    fn diagonal_light_places_origin_at_distance() {
        let view = view_for(Vec3::new(1.0, -1.0, 0.0)).unwrap();
        let origin = view.transform_point3(Vec3::ZERO);
        assert!(origin.abs_diff_eq(Vec3::new(0.0, 0.0, 20.0), 1e-4));
    }

    #[test]
    fn depth_increases_along_light_direction() {
        let space = LightSpace::new(Vec3::NEG_Y, frustum(20.0)).unwrap();
        let high = space.shadow_coord(Vec3::new(0.0, 5.0, 0.0));
        let low = space.shadow_coord(Vec3::new(0.0, -5.0, 0.0));
        assert!(high.z < low.z);
    }

    #[test]
    fn unnormalised_direction_matches_normalised() {
        let a = view_for(Vec3::new(2.0, -2.0, 0.0)).unwrap();
        let b = view_for(Vec3::new(1.0, -1.0, 0.0).normalize()).unwrap();
        assert!(a.abs_diff_eq(b, 1e-5));
    }

    #[test]
    fn zero_direction_is_rejected() {
        assert_eq!(
            view_for(Vec3::ZERO),
            Err(ConfigError::ZeroLightDirection)
        );
    }
}
