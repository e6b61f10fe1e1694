//! A viewpoint with perspective or orthographic projection.
//!
//! The camera owns a [`Transform`]; its view matrix looks along the transform's
//! forward axis with world up `+Y`. Both projection parameter sets (field of
//! view and orthographic width) are kept, so switching modes and back is exact.
//!
//! View and projection are both cached:
//! - the view matrix is rebuilt whenever the owned transform's
//!   [`revision`](Transform::revision) differs from the one it was built from,
//! - the projection matrix is rebuilt after any projection setter.
//!
//! [`Camera::update_view_matrix`] and [`Camera::update_projection_matrix`] force
//! a rebuild and are what the frame loop and the resize handler call.

use glam::{Mat4, Vec3};

use crate::cache::Cached;
use crate::error::ConfigError;
use crate::transform::Transform;

/// How eye space is mapped to clip space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Projection {
    #[default]
    Perspective,
    Orthographic,
}

/// Construction parameters for a [`Camera`].
///
/// # Example
///
/// ```
/// use penumbra::{Camera, CameraConfig, Projection, Vec3};
///
/// let camera = Camera::new(
///     CameraConfig::new(Vec3::new(3.0, 1.0, -3.0), 16.0 / 9.0)
///         .projection(Projection::Orthographic)
///         .orthographic_width(17.5)
///         .move_speed(0.5),
/// )
/// .unwrap();
/// assert!(!camera.is_perspective());
/// ```
#[derive(Clone, Debug)]
pub struct CameraConfig {
    pub position: Vec3,
    /// Euler angles `(pitch, yaw, roll)` in radians.
    pub rotation: Vec3,
    pub aspect_ratio: f32,
    /// Vertical field of view in radians.
    pub field_of_view: f32,
    pub near_clip: f32,
    pub far_clip: f32,
    pub projection: Projection,
    pub orthographic_width: f32,
    /// World units per second.
    pub move_speed: f32,
    /// Radians per pixel of mouse movement.
    pub look_speed: f32,
}

impl CameraConfig {
    pub fn new(position: impl Into<Vec3>, aspect_ratio: f32) -> Self {
        Self {
            position: position.into(),
            rotation: Vec3::ZERO,
            aspect_ratio,
            field_of_view: std::f32::consts::FRAC_PI_3,
            near_clip: 0.01,
            far_clip: 100.0,
            projection: Projection::Perspective,
            orthographic_width: 10.0,
            move_speed: 5.0,
            look_speed: 0.004,
        }
    }

    pub fn rotation(mut self, pitch_yaw_roll: impl Into<Vec3>) -> Self {
        self.rotation = pitch_yaw_roll.into();
        self
    }

    pub fn field_of_view(mut self, radians: f32) -> Self {
        self.field_of_view = radians;
        self
    }

    pub fn clip_planes(mut self, near: f32, far: f32) -> Self {
        self.near_clip = near;
        self.far_clip = far;
        self
    }

    pub fn projection(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }

    pub fn orthographic_width(mut self, width: f32) -> Self {
        self.orthographic_width = width;
        self
    }

    pub fn move_speed(mut self, speed: f32) -> Self {
        self.move_speed = speed;
        self
    }

    pub fn look_speed(mut self, speed: f32) -> Self {
        self.look_speed = speed;
        self
    }
}

/// A camera with an owned transform and cached view/projection matrices.
#[derive(Clone, Debug)]
pub struct Camera {
    transform: Transform,
    aspect_ratio: f32,
    field_of_view: f32,
    near_clip: f32,
    far_clip: f32,
    orthographic_width: f32,
    projection: Projection,
    move_speed: f32,
    look_speed: f32,
    view: Cached<Mat4>,
    view_revision: u64,
    projection_matrix: Cached<Mat4>,
}

impl Camera {
    /// Validates the configuration and builds both matrices immediately.
    pub fn new(config: CameraConfig) -> Result<Self, ConfigError> {
        validate_aspect(config.aspect_ratio)?;
        validate_fov(config.field_of_view)?;
        validate_clip(config.near_clip, config.far_clip)?;
        validate_ortho_width(config.orthographic_width)?;

        let transform = Transform::from_position(config.position).with_rotation(config.rotation);
        let mut camera = Self {
            view_revision: transform.revision(),
            transform,
            aspect_ratio: config.aspect_ratio,
            field_of_view: config.field_of_view,
            near_clip: config.near_clip,
            far_clip: config.far_clip,
            orthographic_width: config.orthographic_width,
            projection: config.projection,
            move_speed: config.move_speed,
            look_speed: config.look_speed,
            view: Cached::stale(Mat4::IDENTITY),
            projection_matrix: Cached::stale(Mat4::IDENTITY),
        };
        camera.update_view_matrix();
        camera.rebuild_projection();
        Ok(camera)
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Mutable access to the owned transform.
    ///
    /// Changes are picked up by the next [`view_matrix`](Self::view_matrix) call.
    pub fn transform_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }

    pub fn position(&self) -> Vec3 {
        self.transform.position()
    }

    /// Rebuilds the view matrix from the transform's position and forward axis.
    pub fn update_view_matrix(&mut self) -> Mat4 {
        self.view.invalidate();
        self.view_matrix()
    }

    /// Returns the view matrix, rebuilding it if the transform moved.
    pub fn view_matrix(&mut self) -> Mat4 {
        if self.view_revision != self.transform.revision() {
            self.view.invalidate();
            self.view_revision = self.transform.revision();
        }
        let transform = &self.transform;
        self.view
            .get_or_update(|| look_to(transform.position(), transform.forward(), transform.up()))
    }

    /// Stores a new aspect ratio and rebuilds the projection matrix.
    pub fn update_projection_matrix(&mut self, aspect_ratio: f32) -> Result<Mat4, ConfigError> {
        validate_aspect(aspect_ratio)?;
        self.aspect_ratio = aspect_ratio;
        Ok(self.rebuild_projection())
    }

    /// Returns the projection matrix, rebuilding it after any parameter change.
    pub fn projection_matrix(&mut self) -> Mat4 {
        let params = self.projection_params();
        self.projection_matrix.get_or_update(|| params.build())
    }

    /// `projection * view`, the matrix that takes world space to clip space.
    pub fn view_projection_matrix(&mut self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.aspect_ratio
    }

    pub fn field_of_view(&self) -> f32 {
        self.field_of_view
    }

    pub fn near_clip(&self) -> f32 {
        self.near_clip
    }

    pub fn far_clip(&self) -> f32 {
        self.far_clip
    }

    pub fn orthographic_width(&self) -> f32 {
        self.orthographic_width
    }

    pub fn projection(&self) -> Projection {
        self.projection
    }

    pub fn is_perspective(&self) -> bool {
        self.projection == Projection::Perspective
    }

    pub fn move_speed(&self) -> f32 {
        self.move_speed
    }

    pub fn look_speed(&self) -> f32 {
        self.look_speed
    }

    pub fn set_field_of_view(&mut self, radians: f32) -> Result<(), ConfigError> {
        validate_fov(radians)?;
        self.field_of_view = radians;
        self.projection_matrix.invalidate();
        Ok(())
    }

    pub fn set_near_clip(&mut self, near: f32) -> Result<(), ConfigError> {
        self.set_clip_planes(near, self.far_clip)
    }

    pub fn set_far_clip(&mut self, far: f32) -> Result<(), ConfigError> {
        self.set_clip_planes(self.near_clip, far)
    }

    pub fn set_clip_planes(&mut self, near: f32, far: f32) -> Result<(), ConfigError> {
        validate_clip(near, far)?;
        self.near_clip = near;
        self.far_clip = far;
        self.projection_matrix.invalidate();
        Ok(())
    }

    pub fn set_orthographic_width(&mut self, width: f32) -> Result<(), ConfigError> {
        validate_ortho_width(width)?;
        self.orthographic_width = width;
        self.projection_matrix.invalidate();
        Ok(())
    }

    pub fn set_projection(&mut self, projection: Projection) {
        if self.projection != projection {
            self.projection = projection;
            self.projection_matrix.invalidate();
        }
    }

    /// Switches between perspective and orthographic.
    pub fn toggle_projection(&mut self) {
        self.set_projection(match self.projection {
            Projection::Perspective => Projection::Orthographic,
            Projection::Orthographic => Projection::Perspective,
        });
    }

    pub fn set_move_speed(&mut self, speed: f32) {
        self.move_speed = speed;
    }

    pub fn set_look_speed(&mut self, speed: f32) {
        self.look_speed = speed;
    }

    fn rebuild_projection(&mut self) -> Mat4 {
        let matrix = self.projection_params().build();
        self.projection_matrix.set(matrix);
        matrix
    }

    fn projection_params(&self) -> ProjectionParams {
        ProjectionParams {
            mode: self.projection,
            aspect_ratio: self.aspect_ratio,
            field_of_view: self.field_of_view,
            orthographic_width: self.orthographic_width,
            near: self.near_clip,
            far: self.far_clip,
        }
    }
}

#[derive(Clone, Copy)]
struct ProjectionParams {
    mode: Projection,
    aspect_ratio: f32,
    field_of_view: f32,
    orthographic_width: f32,
    near: f32,
    far: f32,
}

impl ProjectionParams {
    fn build(self) -> Mat4 {
        match self.mode {
            Projection::Perspective => {
                Mat4::perspective_lh(self.field_of_view, self.aspect_ratio, self.near, self.far)
            }
            Projection::Orthographic => {
                // Width alone controls zoom; height follows the surface shape.
                let half_w = self.orthographic_width * 0.5;
                let half_h = half_w / self.aspect_ratio;
                Mat4::orthographic_lh(-half_w, half_w, -half_h, half_h, self.near, self.far)
            }
        }
    }
}

fn validate_aspect(aspect: f32) -> Result<(), ConfigError> {
    if aspect.is_finite() && aspect > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidAspectRatio(aspect))
    }
}

fn validate_fov(fov: f32) -> Result<(), ConfigError> {
    if fov > 0.0 && fov < std::f32::consts::PI {
        Ok(())
    } else {
        Err(ConfigError::InvalidFieldOfView(fov))
    }
}

fn validate_clip(near: f32, far: f32) -> Result<(), ConfigError> {
    if near > 0.0 && near < far && far.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::InvalidClipPlanes { near, far })
    }
}

fn validate_ortho_width(width: f32) -> Result<(), ConfigError> {
    if width.is_finite() && width > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidOrthographicWidth(width))
    }
}

/// Left-handed look-to matrix with world up `+Y`.
///
/// Falls back to `fallback_up` when `dir` is parallel to `+Y`, where the
/// world-up basis is undefined.
pub(crate) fn look_to(eye: Vec3, dir: Vec3, fallback_up: Vec3) -> Mat4 {
    let up = if dir.cross(Vec3::Y).length_squared() < 1e-6 {
        fallback_up
    } else {
        Vec3::Y
    };
    Mat4::look_to_lh(eye, dir, up)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    fn camera() -> Camera {
        Camera::new(CameraConfig::new(Vec3::ZERO, 1.0)).unwrap()
    }

    fn ndc_depth(proj: Mat4, view_z: f32) -> f32 {
        let clip = proj * Vec4::new(0.0, 0.0, view_z, 1.0);
        clip.z / clip.w
    }

    #[test]
    fn defaults_match_source_framework() {
        let cam = camera();
        assert!((cam.field_of_view() - std::f32::consts::FRAC_PI_3).abs() < 1e-6);
        assert_eq!(cam.near_clip(), 0.01);
        assert_eq!(cam.far_clip(), 100.0);
        assert!(cam.is_perspective());
    }

    #[test]
    fn perspective_maps_near_to_zero_and_far_to_one() {
        let mut cam = camera();
        for aspect in [1.0, 1.777, 0.5625] {
            let proj = cam.update_projection_matrix(aspect).unwrap();
            assert!(ndc_depth(proj, 0.01).abs() < 1e-4, "aspect {aspect}");
            assert!((ndc_depth(proj, 100.0) - 1.0).abs() < 1e-4, "aspect {aspect}");
        }
    }

    #[test]
    fn orthographic_height_follows_aspect() {
        let mut cam = Camera::new(
            CameraConfig::new(Vec3::ZERO, 2.0)
                .projection(Projection::Orthographic)
                .orthographic_width(8.0),
        )
        .unwrap();

        let proj = cam.projection_matrix();
        // Half width 4, half height 2.
        let edge = proj.project_point3(Vec3::new(4.0, 2.0, 1.0));
        assert!((edge.x - 1.0).abs() < 1e-5);
        assert!((edge.y - 1.0).abs() < 1e-5);
    }

    #[test]
    fn projection_mode_round_trip_is_exact() {
        let mut cam = camera();
        cam.set_orthographic_width(12.5).unwrap();
        cam.set_projection(Projection::Orthographic);
        let ortho = cam.projection_matrix();

        cam.set_projection(Projection::Perspective);
        let persp = cam.projection_matrix();
        assert_ne!(ortho, persp);

        cam.set_projection(Projection::Orthographic);
        assert_eq!(
            cam.projection_matrix().to_cols_array(),
            ortho.to_cols_array()
        );
    }

    #[test]
    fn setters_invalidate_projection() {
        let mut cam = camera();
        let before = cam.projection_matrix();
        cam.set_field_of_view(1.2).unwrap();
        assert_ne!(cam.projection_matrix(), before);

        let before = cam.projection_matrix();
        cam.set_far_clip(500.0).unwrap();
        assert_ne!(cam.projection_matrix(), before);
    }

    #[test]
    fn view_follows_transform_without_explicit_update() {
        let mut cam = camera();
        let before = cam.view_matrix();
        cam.transform_mut().move_absolute(Vec3::new(0.0, 0.0, 5.0));

        let view = cam.view_matrix();
        assert_ne!(view, before);
        // The camera now sits at z = 5, so the origin is 5 units behind it.
        let origin = view.transform_point3(Vec3::ZERO);
        assert!(origin.abs_diff_eq(Vec3::new(0.0, 0.0, -5.0), 1e-5));
    }

    #[test]
    fn view_looks_along_transform_forward() {
        let mut cam = camera();
        cam.transform_mut()
            .set_rotation(Vec3::new(0.0, std::f32::consts::FRAC_PI_2, 0.0));

        // Forward is now +X; a point ahead on +X lands on the view +Z axis.
        let p = cam.view_matrix().transform_point3(Vec3::new(3.0, 0.0, 0.0));
        assert!(p.abs_diff_eq(Vec3::new(0.0, 0.0, 3.0), 1e-5));
    }

    #[test]
    fn view_is_finite_looking_straight_down_or_up() {
        use std::f32::consts::FRAC_PI_2;

        let mut cam = camera();
        cam.transform_mut().set_position(Vec3::new(0.0, 5.0, 0.0));
        cam.transform_mut()
            .set_rotation(Vec3::new(FRAC_PI_2, 0.0, 0.0));
        let view = cam.view_matrix();
        assert!(view.is_finite());
        // Looking down from y = 5, the origin is 5 units ahead.
        let origin = view.transform_point3(Vec3::ZERO);
        assert!(origin.abs_diff_eq(Vec3::new(0.0, 0.0, 5.0), 1e-4));

        cam.transform_mut()
            .set_rotation(Vec3::new(-FRAC_PI_2, 0.0, 0.0));
        assert!(cam.view_matrix().is_finite());
        assert!(cam.update_view_matrix().is_finite());
    }

    #[test]
    fn view_is_rebuilt_once_per_transform_change() {
        let mut cam = camera();
        cam.view_matrix();
        assert!(!cam.view.is_dirty());

        cam.transform_mut().move_absolute(Vec3::X);
        let moved = cam.view_matrix();
        assert!(!cam.view.is_dirty());
        assert_eq!(cam.view_matrix(), moved);
        assert_eq!(cam.update_view_matrix(), moved);
    }

    #[test]
    fn rejects_degenerate_parameters() {
        assert_eq!(
            Camera::new(CameraConfig::new(Vec3::ZERO, 1.0).clip_planes(10.0, 1.0)).err(),
            Some(ConfigError::InvalidClipPlanes {
                near: 10.0,
                far: 1.0
            })
        );
        assert!(matches!(
            Camera::new(CameraConfig::new(Vec3::ZERO, 0.0)),
            Err(ConfigError::InvalidAspectRatio(_))
        ));

        let mut cam = camera();
        assert!(cam.set_near_clip(0.0).is_err());
        assert!(cam.set_near_clip(200.0).is_err());
        assert!(cam.set_field_of_view(std::f32::consts::PI).is_err());
        assert!(cam.set_orthographic_width(-1.0).is_err());
        assert!(cam.update_projection_matrix(-1.0).is_err());
        assert_eq!(cam.near_clip(), 0.01);
    }

    #[test]
    fn toggle_projection_flips_mode() {
        let mut cam = camera();
        cam.toggle_projection();
        assert_eq!(cam.projection(), Projection::Orthographic);
        cam.toggle_projection();
        assert_eq!(cam.projection(), Projection::Perspective);
    }
}
