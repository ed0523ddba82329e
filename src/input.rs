use nalgebra::Vector2;

use crate::geometry::FloatType;

/// Keys the renderers react to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Key {
    W,
    A,
    S,
    D,
}

/// Snapshot of user input for one frame, filled in by the windowing layer.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct InputState {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,

    /// Mouse movement since the previous frame, in degrees of yaw (x) and pitch (y).
    /// Positive y is downwards on the screen.
    pub mouse_delta: Vector2<FloatType>,
}

impl InputState {
    pub fn set_key(&mut self, key: Key, pressed: bool) {
        match key {
            Key::W => self.forward = pressed,
            Key::S => self.backward = pressed,
            Key::A => self.left = pressed,
            Key::D => self.right = pressed,
        }
    }

    /// Clears per-frame accumulated values, keeps held keys.
    pub fn end_frame(&mut self) {
        self.mouse_delta = Vector2::zeros();
    }
}
