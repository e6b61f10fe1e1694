use std::collections::HashSet;

use glam::Vec2;
use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Keyboard and mouse state, fed from window events and read once per frame.
///
/// "Pressed" sets and the mouse delta only cover the current frame; call
/// [`begin_frame`](Self::begin_frame) after the frame has read them.
#[derive(Default)]
pub struct Input {
    keys_down: HashSet<KeyCode>,
    keys_pressed: HashSet<KeyCode>,
    buttons_down: HashSet<MouseButton>,
    cursor: Option<Vec2>,
    mouse_delta: Vec2,
}

impl Input {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears the per-frame state.
    pub fn begin_frame(&mut self) {
        self.keys_pressed.clear();
        self.mouse_delta = Vec2::ZERO;
    }

    pub fn handle_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    match event.state {
                        ElementState::Pressed => self.press_key(key),
                        ElementState::Released => self.release_key(key),
                    }
                }
            }
            WindowEvent::MouseInput { state, button, .. } => match state {
                ElementState::Pressed => {
                    self.buttons_down.insert(*button);
                }
                ElementState::Released => {
                    self.buttons_down.remove(button);
                }
            },
            WindowEvent::CursorMoved { position, .. } => {
                self.move_cursor(Vec2::new(position.x as f32, position.y as f32));
            }
            WindowEvent::CursorLeft { .. } => self.cursor = None,
            // Releases are not delivered to an unfocused window.
            WindowEvent::Focused(false) => self.release_all(),
            _ => {}
        }
    }

    fn press_key(&mut self, key: KeyCode) {
        if self.keys_down.insert(key) {
            self.keys_pressed.insert(key);
        }
    }

    fn release_key(&mut self, key: KeyCode) {
        self.keys_down.remove(&key);
    }

    fn move_cursor(&mut self, position: Vec2) {
        if let Some(previous) = self.cursor {
            self.mouse_delta += position - previous;
        }
        self.cursor = Some(position);
    }

    fn release_all(&mut self) {
        self.keys_down.clear();
        self.buttons_down.clear();
        self.cursor = None;
    }

    /// True while the key is held.
    pub fn key_down(&self, key: KeyCode) -> bool {
        self.keys_down.contains(&key)
    }

    /// True only on the frame the key went down; key repeat does not count.
    pub fn key_pressed(&self, key: KeyCode) -> bool {
        self.keys_pressed.contains(&key)
    }

    pub fn mouse_down(&self, button: MouseButton) -> bool {
        self.buttons_down.contains(&button)
    }

    /// Cursor movement in pixels since the last [`begin_frame`](Self::begin_frame).
    pub fn mouse_delta(&self) -> Vec2 {
        self.mouse_delta
    }

    pub fn cursor_position(&self) -> Option<Vec2> {
        self.cursor
    }

    #[cfg(test)]
    pub(crate) fn simulate_key(&mut self, key: KeyCode, down: bool) {
        if down {
            self.press_key(key);
        } else {
            self.release_key(key);
        }
    }

    #[cfg(test)]
    pub(crate) fn simulate_drag(&mut self, button: MouseButton, delta: Vec2) {
        self.buttons_down.insert(button);
        self.mouse_delta += delta;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pressed_lasts_one_frame() {
        let mut input = Input::new();
        input.press_key(KeyCode::KeyW);
        assert!(input.key_pressed(KeyCode::KeyW));
        assert!(input.key_down(KeyCode::KeyW));

        input.begin_frame();
        input.press_key(KeyCode::KeyW); // key repeat
        assert!(!input.key_pressed(KeyCode::KeyW));
        assert!(input.key_down(KeyCode::KeyW));

        input.release_key(KeyCode::KeyW);
        assert!(!input.key_down(KeyCode::KeyW));
    }

    #[test]
    fn first_cursor_sample_has_no_delta() {
        let mut input = Input::new();
        input.move_cursor(Vec2::new(100.0, 100.0));
        assert_eq!(input.mouse_delta(), Vec2::ZERO);

        input.move_cursor(Vec2::new(110.0, 95.0));
        input.move_cursor(Vec2::new(112.0, 95.0));
        assert_eq!(input.mouse_delta(), Vec2::new(12.0, -5.0));

        input.begin_frame();
        assert_eq!(input.mouse_delta(), Vec2::ZERO);
        assert_eq!(input.cursor_position(), Some(Vec2::new(112.0, 95.0)));
    }

    #[test]
    fn focus_loss_releases_everything() {
        let mut input = Input::new();
        input.press_key(KeyCode::ShiftLeft);
        input.buttons_down.insert(MouseButton::Left);
        input.release_all();
        assert!(!input.key_down(KeyCode::ShiftLeft));
        assert!(!input.mouse_down(MouseButton::Left));
        assert_eq!(input.cursor_position(), None);
    }
}
