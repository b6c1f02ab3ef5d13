//! Perspective camera with first-person mouse-look.
//!
//! [`Camera`] owns a [`Transform`] for its pose and adds the projection
//! parameters. The combined matrix handed to shaders is
//!
//! ```text
//! projection * rotation(conjugate(q)) * translation(-position)
//! ```
//!
//! The projection is computed once in [`Camera::init`] from the viewport size
//! at that moment. Resizing keeps it unless
//! [`CameraSettings::track_viewport_aspect`] is enabled.
//!
//! # Controls
//!
//! - **Left click**: engage mouse-look (cursor hidden and confined)
//! - **Escape / E**: release the cursor
//! - **Mouse** (engaged): yaw about world up, pitch about the camera's right axis
//! - **W/A/S/D**: move forward/left/back/right relative to the view
//! - **Space**: move up along world Y
//! - **Left Shift**: 3x speed, **Left Control**: 0.33x speed (wins over Shift)
//!
//! # Example
//!
//! ```
//! use vantage::{Camera, CameraSettings};
//! use vantage::math::{Angle, Vector2u, Vector3f};
//!
//! let mut camera = Camera::new(CameraSettings::default().fov(Angle::degrees(60.0)));
//! camera.init(Vector2u::new(1280, 720));
//! camera.transform_mut().set_position(Vector3f::new(0.0, 1.0, -5.0));
//!
//! let clip = camera.view_projection().transform_point(Vector3f::new(0.0, 1.0, 0.0));
//! assert!(clip.x.abs() < 1e-5 && clip.y.abs() < 1e-5);
//! ```

use winit::event::MouseButton;
use winit::keyboard::KeyCode;
use winit::window::{CursorGrabMode, Window};

use crate::input::Input;
use crate::math::{Angle, Matrix4, Vector2u, Vector3f};
use crate::transform::Transform;

/// Intrinsic camera parameters and control tuning.
#[derive(Clone, Debug)]
pub struct CameraSettings {
    /// Vertical field of view.
    pub fov: Angle,
    /// Near clipping distance.
    pub near: f32,
    /// Far clipping distance.
    pub far: f32,
    /// Mouse deltas are scaled by `dt / look_sensitivity` radians.
    pub look_sensitivity: f32,
    /// Units per second at 1x speed.
    pub move_speed: f32,
    /// Speed multiplier while Left Shift is held.
    pub fast_multiplier: f32,
    /// Speed multiplier while Left Control is held.
    pub slow_multiplier: f32,
    /// Recompute the projection from the new aspect ratio on resize.
    pub track_viewport_aspect: bool,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            fov: Angle::degrees(70.0),
            near: 0.1,
            far: 1000.0,
            look_sensitivity: 3.0,
            move_speed: 1.0,
            fast_multiplier: 3.0,
            slow_multiplier: 0.33,
            track_viewport_aspect: false,
        }
    }
}

impl CameraSettings {
    pub fn fov(mut self, fov: Angle) -> Self {
        self.fov = fov;
        self
    }

    pub fn clip_planes(mut self, near: f32, far: f32) -> Self {
        self.near = near;
        self.far = far;
        self
    }

    pub fn look_sensitivity(mut self, sensitivity: f32) -> Self {
        self.look_sensitivity = sensitivity;
        self
    }

    pub fn move_speed(mut self, speed: f32) -> Self {
        self.move_speed = speed;
        self
    }

    pub fn track_viewport_aspect(mut self, enabled: bool) -> Self {
        self.track_viewport_aspect = enabled;
        self
    }
}

/// Whether mouse motion currently steers the camera.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LookState {
    /// Cursor visible and free; motion is ignored.
    #[default]
    Free,
    /// Cursor hidden and confined; raw motion rotates the camera.
    Engaged,
}

/// Window cursor change the application should perform after a look-state
/// transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CursorRequest {
    /// Hide the cursor and confine it to the window.
    Capture,
    /// Show the cursor, release the confinement and recenter it.
    Release,
}

impl CursorRequest {
    /// Applies the request to `window`. Platforms that refuse a grab mode are
    /// logged and otherwise ignored.
    pub fn apply(self, window: &Window) {
        match self {
            CursorRequest::Capture => {
                let grabbed = window
                    .set_cursor_grab(CursorGrabMode::Confined)
                    .or_else(|_| window.set_cursor_grab(CursorGrabMode::Locked));
                if let Err(err) = grabbed {
                    log::warn!("could not grab cursor: {err}");
                }
                window.set_cursor_visible(false);
            }
            CursorRequest::Release => {
                if let Err(err) = window.set_cursor_grab(CursorGrabMode::None) {
                    log::warn!("could not release cursor: {err}");
                }
                window.set_cursor_visible(true);
                let size = window.inner_size();
                let center = winit::dpi::PhysicalPosition::new(size.width / 2, size.height / 2);
                if let Err(err) = window.set_cursor_position(center) {
                    log::debug!("could not recenter cursor: {err}");
                }
            }
        }
    }
}

/// A perspective camera posed by a [`Transform`].
#[derive(Clone, Debug)]
pub struct Camera {
    transform: Transform,
    settings: CameraSettings,
    aspect: f32,
    projection: Matrix4,
    look: LookState,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(CameraSettings::default())
    }
}

impl Camera {
    /// Creates a camera with a square aspect ratio until [`init`](Self::init) runs.
    pub fn new(settings: CameraSettings) -> Self {
        let projection = Matrix4::perspective(settings.fov, 1.0, settings.near, settings.far);
        Self {
            transform: Transform::new(),
            settings,
            aspect: 1.0,
            projection,
            look: LookState::Free,
        }
    }

    /// Captures the viewport aspect ratio and caches the projection.
    pub fn init(&mut self, viewport: Vector2u) {
        self.look = LookState::Free;
        self.rebuild_projection(viewport);
        log::debug!(
            "camera initialised: fov {:.1} deg, aspect {:.3}",
            self.settings.fov.as_degrees(),
            self.aspect
        );
    }

    /// Called when the window size changes. Only rebuilds the projection when
    /// the settings ask for it; otherwise the init-time aspect is kept.
    pub fn resize_viewport(&mut self, viewport: Vector2u) {
        if self.settings.track_viewport_aspect {
            self.rebuild_projection(viewport);
        }
    }

    fn rebuild_projection(&mut self, viewport: Vector2u) {
        self.aspect = aspect_of(viewport);
        self.projection = Matrix4::perspective(self.settings.fov, self.aspect, self.settings.near, self.settings.far);
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn transform_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }

    pub fn settings(&self) -> &CameraSettings {
        &self.settings
    }

    pub fn position(&self) -> Vector3f {
        self.transform.position()
    }

    pub fn fov(&self) -> Angle {
        self.settings.fov
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.aspect
    }

    pub fn near(&self) -> f32 {
        self.settings.near
    }

    pub fn far(&self) -> f32 {
        self.settings.far
    }

    pub fn look_state(&self) -> LookState {
        self.look
    }

    pub fn is_engaged(&self) -> bool {
        self.look == LookState::Engaged
    }

    /// The cached projection matrix alone.
    pub fn projection(&self) -> Matrix4 {
        self.projection
    }

    /// World-to-camera matrix. Recomputed on every call.
    pub fn view_matrix(&self) -> Matrix4 {
        let rotation = self.transform.rotation().conjugate().to_rotation_matrix();
        rotation * Matrix4::translation(-self.transform.position())
    }

    /// `projection * view`, what the shaders receive as their projection.
    pub fn view_projection(&self) -> Matrix4 {
        self.projection * self.view_matrix()
    }

    /// Viewing direction taken from the world matrix's third column.
    pub fn look_at(&mut self) -> Vector3f {
        self.transform.matrix().col(2).truncate()
    }

    /// Runs the mouse-look state machine for this frame's input.
    ///
    /// Returns the cursor change the window should apply when the state
    /// changed. While engaged, raw mouse motion turns the camera.
    pub fn handle_input(&mut self, input: &Input, dt: f32) -> Option<CursorRequest> {
        let mut request = None;

        if input.mouse_pressed(MouseButton::Left) && self.look == LookState::Free {
            self.look = LookState::Engaged;
            log::debug!("mouse-look engaged");
            request = Some(CursorRequest::Capture);
        } else if (input.key_pressed(KeyCode::Escape) || input.key_pressed(KeyCode::KeyE))
            && self.look == LookState::Engaged
        {
            self.look = LookState::Free;
            log::debug!("mouse-look released");
            request = Some(CursorRequest::Release);
        }

        if self.look == LookState::Engaged {
            let delta = input.raw_mouse_delta();
            if delta != crate::math::Vector2f::ZERO {
                self.look_by(delta.x, delta.y, dt);
            }
        }

        request
    }

    /// Turns by a mouse delta: yaw about world up, then pitch about the
    /// current right axis, both scaled by `dt / look_sensitivity`.
    pub fn look_by(&mut self, dx: f32, dy: f32, dt: f32) {
        let scale = dt / self.settings.look_sensitivity;
        self.transform.rotate(Vector3f::Y, Angle::radians(dx * scale));
        let right = self.transform.rotation().right();
        self.transform.rotate(right, Angle::radians(dy * scale));
    }

    /// Keyboard movement for this frame; distance is `speed * dt`.
    pub fn update(&mut self, input: &Input, dt: f32) {
        let mut multiplier = 1.0;
        if input.key_down(KeyCode::ShiftLeft) {
            multiplier = self.settings.fast_multiplier;
        }
        if input.key_down(KeyCode::ControlLeft) {
            multiplier = self.settings.slow_multiplier;
        }

        let amount = self.settings.move_speed * multiplier * dt;
        let rotation = self.transform.rotation();

        let moves = [
            (KeyCode::Space, Vector3f::Y),
            (KeyCode::KeyW, rotation.forward()),
            (KeyCode::KeyS, rotation.back()),
            (KeyCode::KeyA, rotation.left()),
            (KeyCode::KeyD, rotation.right()),
        ];
        for (key, direction) in moves {
            if input.key_down(key) {
                self.transform.translate(direction * amount);
            }
        }
    }
}

fn aspect_of(viewport: Vector2u) -> f32 {
    viewport.x as f32 / viewport.y.max(1) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Vector2f, approx_eq};

    fn camera() -> Camera {
        let mut camera = Camera::default();
        camera.init(Vector2u::new(800, 600));
        camera
    }

    #[test]
    fn init_uses_fixed_intrinsics() {
        let camera = camera();
        assert!(approx_eq(camera.fov().as_degrees(), 70.0));
        assert!(approx_eq(camera.aspect_ratio(), 800.0 / 600.0));
        assert_eq!(camera.near(), 0.1);
        assert_eq!(camera.far(), 1000.0);
        assert_eq!(camera.look_state(), LookState::Free);
    }

    #[test]
    fn half_turn_reverses_forward() {
        let mut camera = camera();
        camera.transform_mut().rotate(Vector3f::Y, Angle::degrees(180.0));
        let forward = camera.transform().rotation().forward();
        assert!(forward.distance(-Vector3f::Z) < 1e-5);
    }

    #[test]
    fn view_projection_matches_inverse_world() {
        let mut camera = camera();
        camera.transform_mut().set_position(Vector3f::new(1.0, 2.0, -3.0));
        camera.transform_mut().rotate(Vector3f::Y, Angle::degrees(35.0));
        camera.transform_mut().rotate(Vector3f::X, Angle::degrees(-20.0));

        let expected = camera.projection() * camera.transform_mut().inverse_matrix();
        let actual = camera.view_projection();
        let (a, b) = (actual.to_cols_array_2d(), expected.to_cols_array_2d());
        for c in 0..4 {
            for r in 0..4 {
                assert!((a[c][r] - b[c][r]).abs() < 1e-4, "element {r},{c}");
            }
        }
    }

    #[test]
    fn point_ahead_projects_to_center() {
        let mut camera = camera();
        camera.transform_mut().rotate(Vector3f::Y, Angle::degrees(90.0));
        let ahead = camera.transform().rotation().forward() * 10.0;
        let ndc = camera.view_projection().transform_point(ahead);
        assert!(ndc.x.abs() < 1e-4 && ndc.y.abs() < 1e-4);
        assert!(ndc.z > -1.0 && ndc.z < 1.0);
    }

    #[test]
    fn look_at_is_forward_for_unit_scale() {
        let mut camera = camera();
        camera.transform_mut().rotate(Vector3f::X, Angle::degrees(30.0));
        let forward = camera.transform().rotation().forward();
        assert!(camera.look_at().distance(forward) < 1e-5);
    }

    #[test]
    fn resize_keeps_projection_unless_tracking() {
        let mut camera = camera();
        let before = camera.projection();
        camera.resize_viewport(Vector2u::new(1920, 600));
        assert_eq!(camera.projection(), before);

        let mut tracking = Camera::new(CameraSettings::default().track_viewport_aspect(true));
        tracking.init(Vector2u::new(800, 600));
        tracking.resize_viewport(Vector2u::new(1920, 600));
        assert!(approx_eq(tracking.aspect_ratio(), 3.2));
    }

    #[test]
    fn click_engages_and_escape_releases() {
        let mut camera = camera();
        let mut input = Input::new();

        input.press_mouse(MouseButton::Left);
        assert_eq!(camera.handle_input(&input, 0.016), Some(CursorRequest::Capture));
        assert!(camera.is_engaged());

        input.begin_frame();
        input.press_mouse(MouseButton::Left);
        assert_eq!(camera.handle_input(&input, 0.016), None);

        input.begin_frame();
        input.press_key(KeyCode::Escape);
        assert_eq!(camera.handle_input(&input, 0.016), Some(CursorRequest::Release));
        assert!(!camera.is_engaged());

        input.begin_frame();
        input.release_mouse(MouseButton::Left);
        input.press_mouse(MouseButton::Left);
        camera.handle_input(&input, 0.016);
        input.begin_frame();
        input.press_key(KeyCode::KeyE);
        assert_eq!(camera.handle_input(&input, 0.016), Some(CursorRequest::Release));
    }

    #[test]
    fn motion_only_turns_when_engaged() {
        let mut camera = camera();
        let mut input = Input::new();
        input.move_mouse_raw(Vector2f::new(30.0, 0.0));
        camera.handle_input(&input, 0.1);
        assert_eq!(camera.transform().rotation(), crate::math::Quaternion::IDENTITY);

        input.press_mouse(MouseButton::Left);
        camera.handle_input(&input, 0.1);
        // 30 * 0.1 / 3 = 1 radian about world up
        let expected = crate::math::Quaternion::from_axis_angle(Vector3f::Y, Angle::radians(1.0));
        assert!((camera.transform().rotation().dot(expected).abs() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn movement_scales_with_modifiers_and_dt() {
        let mut input = Input::new();
        input.press_key(KeyCode::KeyW);

        let mut camera = camera();
        camera.update(&input, 0.5);
        assert!(camera.position().distance(Vector3f::new(0.0, 0.0, 0.5)) < 1e-5);

        input.press_key(KeyCode::ShiftLeft);
        let mut camera = self::camera();
        camera.update(&input, 0.5);
        assert!(camera.position().distance(Vector3f::new(0.0, 0.0, 1.5)) < 1e-5);

        input.press_key(KeyCode::ControlLeft);
        let mut camera = self::camera();
        camera.update(&input, 1.0);
        assert!(camera.position().distance(Vector3f::new(0.0, 0.0, 0.33)) < 1e-5);
    }

    #[test]
    fn strafe_and_rise_follow_orientation() {
        let mut input = Input::new();
        input.press_key(KeyCode::KeyD);
        input.press_key(KeyCode::Space);

        let mut camera = camera();
        camera.transform_mut().rotate(Vector3f::Y, Angle::degrees(180.0));
        camera.update(&input, 1.0);
        assert!(camera.position().distance(Vector3f::new(-1.0, 1.0, 0.0)) < 1e-5);
    }
}
