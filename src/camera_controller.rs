//! Keyboard and mouse fly-through control for a [`Camera`].
//!
//! # Controls
//!
//! - **W/S**: forward/backward
//! - **A/D**: strafe left/right
//! - **Space/Left Shift**: up/down
//! - **Ctrl** (held): move three times faster
//! - **Alt** (held): move at a quarter speed
//! - **Left mouse drag**: look around

use std::f32::consts::FRAC_PI_2;

use glam::Vec3;
use winit::event::MouseButton;
use winit::keyboard::KeyCode;

use crate::camera::Camera;
use crate::input::Input;

const FAST_MULTIPLIER: f32 = 3.0;
const SLOW_MULTIPLIER: f32 = 0.25;
/// Pitch stops just short of vertical, where forward and world up coincide.
const MAX_PITCH: f32 = FRAC_PI_2 - 1e-3;

/// Drives the active camera from [`Input`].
///
/// Speeds come from the camera itself, so each camera in a scene can move at
/// its own pace.
#[derive(Clone, Copy, Debug)]
pub struct FlyController {
    /// Button that must be held for mouse look.
    pub look_button: MouseButton,
}

impl Default for FlyController {
    fn default() -> Self {
        Self {
            look_button: MouseButton::Left,
        }
    }
}

impl FlyController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&self, camera: &mut Camera, input: &Input, dt: f32) {
        let direction = movement_axes(input);
        if direction != Vec3::ZERO {
            let speed = camera.move_speed() * speed_multiplier(input) * dt;
            camera
                .transform_mut()
                .move_relative(direction.normalize() * speed);
        }

        if input.mouse_down(self.look_button) {
            let delta = input.mouse_delta() * camera.look_speed();
            if delta.x != 0.0 || delta.y != 0.0 {
                let transform = camera.transform_mut();
                let mut rotation = transform.rotation();
                rotation.x = (rotation.x + delta.y).clamp(-MAX_PITCH, MAX_PITCH);
                rotation.y += delta.x;
                transform.set_rotation(rotation);
            }
        }
    }
}

/// Camera-local movement direction from held keys, unnormalized.
fn movement_axes(input: &Input) -> Vec3 {
    let axis = |positive: KeyCode, negative: KeyCode| {
        input.key_down(positive) as i32 as f32 - input.key_down(negative) as i32 as f32
    };
    Vec3::new(
        axis(KeyCode::KeyD, KeyCode::KeyA),
        axis(KeyCode::Space, KeyCode::ShiftLeft),
        axis(KeyCode::KeyW, KeyCode::KeyS),
    )
}

fn speed_multiplier(input: &Input) -> f32 {
    let held = |left, right| input.key_down(left) || input.key_down(right);
    let mut multiplier = 1.0;
    if held(KeyCode::ControlLeft, KeyCode::ControlRight) {
        multiplier *= FAST_MULTIPLIER;
    }
    if held(KeyCode::AltLeft, KeyCode::AltRight) {
        multiplier *= SLOW_MULTIPLIER;
    }
    multiplier
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::CameraConfig;
    use glam::Vec2;

    const EPS: f32 = 1e-5;

    fn camera() -> Camera {
        Camera::new(CameraConfig::new(Vec3::ZERO, 1.0).move_speed(2.0).look_speed(0.01)).unwrap()
    }

    #[test]
    fn forward_moves_along_view_direction() {
        let mut camera = camera();
        let mut input = Input::new();
        input.simulate_key(KeyCode::KeyW, true);

        FlyController::new().update(&mut camera, &input, 0.5);
        assert!(camera.position().abs_diff_eq(Vec3::new(0.0, 0.0, 1.0), EPS));
    }

    #[test]
    fn modifiers_scale_speed() {
        let controller = FlyController::new();
        let mut input = Input::new();
        input.simulate_key(KeyCode::KeyD, true);
        input.simulate_key(KeyCode::ControlLeft, true);

        let mut fast = camera();
        controller.update(&mut fast, &input, 1.0);
        assert!((fast.position().x - 6.0).abs() < EPS);

        input.simulate_key(KeyCode::ControlLeft, false);
        input.simulate_key(KeyCode::AltLeft, true);
        let mut slow = camera();
        controller.update(&mut slow, &input, 1.0);
        assert!((slow.position().x - 0.5).abs() < EPS);
    }

    #[test]
    fn diagonal_is_not_faster() {
        let mut camera = camera();
        let mut input = Input::new();
        input.simulate_key(KeyCode::KeyW, true);
        input.simulate_key(KeyCode::KeyD, true);

        FlyController::new().update(&mut camera, &input, 1.0);
        assert!((camera.position().length() - 2.0).abs() < EPS);
    }

    #[test]
    fn opposing_keys_cancel() {
        let mut camera = camera();
        let mut input = Input::new();
        input.simulate_key(KeyCode::KeyW, true);
        input.simulate_key(KeyCode::KeyS, true);

        FlyController::new().update(&mut camera, &input, 1.0);
        assert_eq!(camera.position(), Vec3::ZERO);
    }

    #[test]
    fn look_requires_button_and_clamps_pitch() {
        let controller = FlyController::new();
        let mut camera = camera();
        let mut input = Input::new();

        controller.update(&mut camera, &input, 1.0);
        assert_eq!(camera.transform().rotation(), Vec3::ZERO);

        input.simulate_drag(MouseButton::Left, Vec2::new(50.0, 1000.0));
        controller.update(&mut camera, &input, 1.0);
        let rotation = camera.transform().rotation();
        assert!((rotation.y - 0.5).abs() < EPS);
        assert!((rotation.x - MAX_PITCH).abs() < EPS);
        assert!(rotation.x < FRAC_PI_2);
        assert!(camera.view_matrix().is_finite());

        input.simulate_drag(MouseButton::Left, Vec2::new(0.0, -5000.0));
        controller.update(&mut camera, &input, 1.0);
        assert!((camera.transform().rotation().x + MAX_PITCH).abs() < EPS);
        assert!(camera.view_matrix().is_finite());
    }
}
