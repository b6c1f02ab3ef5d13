use std::collections::HashSet;

use winit::event::{DeviceEvent, ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::math::{Vector2f, Vector2u};

/// Tracks keyboard, mouse and window-size state between frames.
///
/// Feed it every [`WindowEvent`] and [`DeviceEvent`], read it during the
/// update, then call [`begin_frame`](Input::begin_frame) before the next batch
/// of events.
#[derive(Debug, Default)]
pub struct Input {
    keys_down: HashSet<KeyCode>,
    keys_pressed: HashSet<KeyCode>,
    keys_released: HashSet<KeyCode>,
    mouse_buttons_down: HashSet<MouseButton>,
    mouse_buttons_pressed: HashSet<MouseButton>,
    mouse_buttons_released: HashSet<MouseButton>,
    mouse_position: Vector2f,
    mouse_delta: Vector2f,
    raw_mouse_delta: Vector2f,
    scroll_delta: Vector2f,
    resized: Option<Vector2u>,
}

impl Input {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call at the start of each frame to reset per-frame state.
    pub fn begin_frame(&mut self) {
        self.keys_pressed.clear();
        self.keys_released.clear();
        self.mouse_buttons_pressed.clear();
        self.mouse_buttons_released.clear();
        self.mouse_delta = Vector2f::ZERO;
        self.raw_mouse_delta = Vector2f::ZERO;
        self.scroll_delta = Vector2f::ZERO;
        self.resized = None;
    }

    /// Process a window event and update input state.
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
                ElementState::Pressed => self.press_mouse(*button),
                ElementState::Released => self.release_mouse(*button),
            },
            WindowEvent::CursorMoved { position, .. } => {
                let new_pos = Vector2f::new(position.x as f32, position.y as f32);
                self.mouse_delta += new_pos - self.mouse_position;
                self.mouse_position = new_pos;
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let d = match delta {
                    MouseScrollDelta::LineDelta(x, y) => Vector2f::new(*x, *y),
                    MouseScrollDelta::PixelDelta(pos) => Vector2f::new(pos.x as f32, pos.y as f32) / 120.0,
                };
                self.scroll_delta += d;
            }
            WindowEvent::Resized(size) => {
                self.resized = Some(Vector2u::new(size.width, size.height));
            }
            WindowEvent::Focused(false) => {
                // keys released while unfocused never reach us
                self.keys_down.clear();
                self.mouse_buttons_down.clear();
            }
            _ => {}
        }
    }

    /// Process a device event. Only raw mouse motion is used; it keeps
    /// arriving while the cursor is hidden and confined.
    pub fn handle_device_event(&mut self, event: &DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            self.move_mouse_raw(Vector2f::new(*dx as f32, *dy as f32));
        }
    }

    pub fn press_key(&mut self, key: KeyCode) {
        if self.keys_down.insert(key) {
            self.keys_pressed.insert(key);
        }
    }

    pub fn release_key(&mut self, key: KeyCode) {
        self.keys_down.remove(&key);
        self.keys_released.insert(key);
    }

    pub fn press_mouse(&mut self, button: MouseButton) {
        if self.mouse_buttons_down.insert(button) {
            self.mouse_buttons_pressed.insert(button);
        }
    }

    pub fn release_mouse(&mut self, button: MouseButton) {
        self.mouse_buttons_down.remove(&button);
        self.mouse_buttons_released.insert(button);
    }

    pub fn move_mouse_raw(&mut self, delta: Vector2f) {
        self.raw_mouse_delta += delta;
    }

    /// Returns true if the key is currently held down.
    pub fn key_down(&self, key: KeyCode) -> bool {
        self.keys_down.contains(&key)
    }

    /// Returns true if the key was pressed this frame.
    pub fn key_pressed(&self, key: KeyCode) -> bool {
        self.keys_pressed.contains(&key)
    }

    /// Returns true if the key was released this frame.
    pub fn key_released(&self, key: KeyCode) -> bool {
        self.keys_released.contains(&key)
    }

    /// Returns true if the mouse button is currently held down.
    pub fn mouse_down(&self, button: MouseButton) -> bool {
        self.mouse_buttons_down.contains(&button)
    }

    /// Returns true if the mouse button was pressed this frame.
    pub fn mouse_pressed(&self, button: MouseButton) -> bool {
        self.mouse_buttons_pressed.contains(&button)
    }

    /// Returns true if the mouse button was released this frame.
    pub fn mouse_released(&self, button: MouseButton) -> bool {
        self.mouse_buttons_released.contains(&button)
    }

    /// Current mouse position in window coordinates.
    pub fn mouse_position(&self) -> Vector2f {
        self.mouse_position
    }

    /// Cursor movement this frame, in window pixels.
    pub fn mouse_delta(&self) -> Vector2f {
        self.mouse_delta
    }

    /// Unaccelerated device motion this frame.
    pub fn raw_mouse_delta(&self) -> Vector2f {
        self.raw_mouse_delta
    }

    /// Scroll wheel delta this frame (in "lines").
    pub fn scroll_delta(&self) -> Vector2f {
        self.scroll_delta
    }

    /// New inner window size if the window was resized this frame.
    pub fn resized(&self) -> Option<Vector2u> {
        self.resized
    }
}
