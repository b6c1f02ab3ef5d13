//! Window, event loop and frame pacing for the viewer.
//!
//! [`run`] opens a window and builds the [`GraphicSystem`] once the GPU is
//! ready. Each redraw handles mouse-look and resizes, runs as many fixed
//! simulation steps as the elapsed time allows, then renders.
//!
//! ```no_run
//! use vantage::{AppConfig, run};
//!
//! run(AppConfig::new().title("Viewer").time_step(1.0 / 120.0), |_gpu, _graphics| {}).unwrap();
//! ```

use std::sync::Arc;
use std::time::Instant;

use winit::application::ApplicationHandler;
use winit::error::EventLoopError;
use winit::event::{DeviceEvent, DeviceId, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::KeyCode;
use winit::window::{Window, WindowAttributes, WindowId};

use crate::camera::CameraSettings;
use crate::gpu::GpuContext;
use crate::graphics::GraphicSystem;
use crate::input::Input;

/// Frame time is clamped to this before it feeds the fixed-step loop, so a
/// long stall does not turn into hundreds of catch-up updates.
const MAX_FRAME_TIME: f32 = 0.25;

/// Step used when a configured step is zero, negative or not finite.
const DEFAULT_TIME_STEP: f32 = 1.0 / 60.0;

/// Window and loop settings for [`run`].
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Window title.
    pub title: String,
    /// Initial inner width in logical pixels.
    pub width: u32,
    /// Initial inner height in logical pixels.
    pub height: u32,
    /// Seconds per fixed update step. Invalid values fall back to 1/60 s.
    pub time_step: f32,
    /// Settings for the scene camera.
    pub camera: CameraSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "Vantage".to_string(),
            width: 1280,
            height: 720,
            time_step: DEFAULT_TIME_STEP,
            camera: CameraSettings::default(),
        }
    }
}

impl AppConfig {
    /// Default configuration: 1280x720, 60 updates per second.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the window title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Sets the initial window size.
    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Sets the fixed update step in seconds.
    ///
    /// Zero, negative or non-finite steps are replaced by 1/60 s when the
    /// loop starts.
    pub fn time_step(mut self, seconds: f32) -> Self {
        self.time_step = seconds;
        self
    }

    /// Sets the camera settings.
    pub fn camera(mut self, settings: CameraSettings) -> Self {
        self.camera = settings;
        self
    }
}

/// Splits elapsed wall time into whole fixed steps, carrying the remainder.
#[derive(Clone, Copy, Debug)]
pub struct FixedStep {
    step: f32,
    accumulated: f32,
}

impl FixedStep {
    /// Accumulator for steps of `step` seconds.
    ///
    /// A step that is not a positive finite number would never drain the
    /// accumulator, so it is replaced by 1/60 s.
    pub fn new(step: f32) -> Self {
        let step = if step.is_finite() && step > 0.0 {
            step
        } else {
            log::warn!("invalid time step {step}, using {DEFAULT_TIME_STEP}");
            DEFAULT_TIME_STEP
        };
        Self { step, accumulated: 0.0 }
    }

    /// Seconds per step.
    pub fn step(&self) -> f32 {
        self.step
    }

    /// Adds `elapsed` seconds and returns how many steps are now due.
    pub fn advance(&mut self, elapsed: f32) -> u32 {
        self.accumulated += elapsed.min(MAX_FRAME_TIME);
        let mut steps = 0;
        while self.accumulated >= self.step {
            self.accumulated -= self.step;
            steps += 1;
        }
        steps
    }
}

type SetupFn = Box<dyn FnOnce(&GpuContext, &mut GraphicSystem)>;

enum VantageApp {
    Pending {
        config: AppConfig,
        setup: Option<SetupFn>,
    },
    Running {
        window: Arc<Window>,
        gpu: GpuContext,
        graphics: GraphicSystem,
        input: Input,
        clock: FixedStep,
        last_frame: Instant,
    },
}

/// Opens a window and runs the viewer until it is closed.
///
/// `setup` runs once the GPU is ready, to load models or add spheres.
pub fn run<S>(config: AppConfig, setup: S) -> Result<(), EventLoopError>
where
    S: FnOnce(&GpuContext, &mut GraphicSystem) + 'static,
{
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = VantageApp::Pending {
        config,
        setup: Some(Box::new(setup)),
    };
    event_loop.run_app(&mut app)
}

impl ApplicationHandler for VantageApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if let VantageApp::Pending { config, setup } = self {
            let window_attrs = WindowAttributes::default()
                .with_title(&config.title)
                .with_inner_size(winit::dpi::LogicalSize::new(config.width, config.height));

            let window = Arc::new(
                event_loop
                    .create_window(window_attrs)
                    .expect("Failed to create window"),
            );
            let gpu = GpuContext::new(window.clone());
            let mut graphics = GraphicSystem::init(&gpu, config.camera.clone());

            if let Some(setup) = setup.take() {
                setup(&gpu, &mut graphics);
            }

            *self = VantageApp::Running {
                window,
                gpu,
                graphics,
                input: Input::new(),
                clock: FixedStep::new(config.time_step),
                last_frame: Instant::now(),
            };
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let VantageApp::Running {
            window,
            gpu,
            graphics,
            input,
            clock,
            last_frame,
        } = self
        else {
            return;
        };

        input.handle_event(&event);

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                gpu.resize(size.width, size.height);
            }
            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                let elapsed = now.duration_since(*last_frame).as_secs_f32();
                *last_frame = now;

                // Escape releases the cursor first and quits on the next press
                let was_engaged = graphics.camera().is_engaged();
                if let Some(request) = graphics.handle_event(input, clock.step()) {
                    request.apply(window);
                }
                if input.key_pressed(KeyCode::Escape) && !was_engaged {
                    event_loop.exit();
                    return;
                }

                for _ in 0..clock.advance(elapsed) {
                    graphics.update(input, clock.step());
                }

                graphics.render(gpu);

                input.begin_frame();
                window.request_redraw();
            }
            _ => {}
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _id: DeviceId, event: DeviceEvent) {
        if let VantageApp::Running { input, .. } = self {
            input.handle_device_event(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_step_carries_the_remainder() {
        let mut clock = FixedStep::new(0.25);
        assert_eq!(clock.advance(0.2), 0);
        assert_eq!(clock.advance(0.2), 1);
        assert_eq!(clock.advance(0.1), 1);
    }

    #[test]
    fn long_stalls_are_clamped() {
        let mut clock = FixedStep::new(0.125);
        assert_eq!(clock.advance(10.0), 2);
    }

    #[test]
    fn unusable_steps_fall_back_to_sixty_hertz() {
        for step in [0.0, -0.5, f32::NAN, f32::INFINITY] {
            let mut clock = FixedStep::new(step);
            assert_eq!(clock.step(), DEFAULT_TIME_STEP);
            // 0.1 s is six 1/60 s steps, give or take rounding
            let steps = clock.advance(0.1);
            assert!((5..=6).contains(&steps), "{steps}");
        }
    }

    #[test]
    fn config_step_reaches_the_clock() {
        let config = AppConfig::new().time_step(0.0);
        assert_eq!(config.time_step, 0.0);
        assert_eq!(FixedStep::new(config.time_step).step(), DEFAULT_TIME_STEP);
    }
}
