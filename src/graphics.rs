//! The scene the demo renders: a camera, the ground grid, loaded models and
//! debug spheres.

use std::path::Path;

use crate::camera::{Camera, CameraSettings, CursorRequest};
use crate::drawable::{DrawList, Ground, Model, Renderable, Sphere};
use crate::geometry::{GeometryError, MeshCache};
use crate::gpu::GpuContext;
use crate::input::Input;
use crate::math::{Angle, Vector2u, Vector3f};
use crate::mesh_pass::MeshPass;

/// Where the camera starts: behind the origin, turned around, looking down.
pub fn initial_camera(settings: CameraSettings, viewport: Vector2u) -> Camera {
    let mut camera = Camera::new(settings);
    camera.init(viewport);

    let transform = camera.transform_mut();
    transform.set_position(Vector3f::new(0.5, 0.75, 1.6));
    transform.rotate(Vector3f::Y, Angle::degrees(180.0));
    transform.rotate(Vector3f::X, Angle::degrees(-20.0));
    camera
}

/// Owns everything that is drawn and the pass that draws it.
pub struct GraphicSystem {
    camera: Camera,
    ground: Ground,
    models: Vec<Model>,
    spheres: Vec<Sphere>,
    meshes: MeshCache,
    mesh_pass: MeshPass,
    draw_list: DrawList,
}

impl GraphicSystem {
    pub const CLEAR_COLOR: wgpu::Color = wgpu::Color {
        r: 0.2,
        g: 0.2,
        b: 0.2,
        a: 1.0,
    };

    /// Sets up the camera, the ground grid and the render pass.
    pub fn init(gpu: &GpuContext, settings: CameraSettings) -> Self {
        log::info!("initialising graphics");
        let viewport = Vector2u::new(gpu.width(), gpu.height());

        Self {
            camera: initial_camera(settings, viewport),
            ground: Ground::new(gpu),
            models: Vec::new(),
            spheres: Vec::new(),
            meshes: MeshCache::new(),
            mesh_pass: MeshPass::new(gpu),
            draw_list: DrawList::new(),
        }
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Loads a model, reusing the mesh when the path was loaded before.
    pub fn add_model(&mut self, gpu: &GpuContext, path: impl AsRef<Path>) -> Result<&mut Model, GeometryError> {
        let model = Model::load(path, &mut self.meshes, gpu)?;
        let index = self.models.len();
        self.models.push(model);
        Ok(&mut self.models[index])
    }

    pub fn add_sphere(&mut self, gpu: &GpuContext, depth: u32, radius: f32, position: Vector3f) -> &mut Sphere {
        let mut sphere = Sphere::new(gpu, depth, radius);
        sphere.transform_mut().set_position(position);
        let index = self.spheres.len();
        self.spheres.push(sphere);
        &mut self.spheres[index]
    }

    /// Runs mouse-look and follows window resizes. Returns the cursor change
    /// the window should apply, if any.
    pub fn handle_event(&mut self, input: &Input, dt: f32) -> Option<CursorRequest> {
        if let Some(size) = input.resized() {
            self.camera.resize_viewport(size);
        }
        self.camera.handle_input(input, dt)
    }

    /// One fixed simulation step.
    pub fn update(&mut self, input: &Input, dt: f32) {
        self.camera.update(input, dt);
    }

    /// Queues every drawable and renders one frame to the surface.
    pub fn render(&mut self, gpu: &GpuContext) {
        self.draw_list.clear();
        self.ground.render(&self.camera, &mut self.draw_list);
        for model in &mut self.models {
            model.render(&self.camera, &mut self.draw_list);
        }
        for sphere in &mut self.spheres {
            sphere.render(&self.camera, &mut self.draw_list);
        }

        let output = match gpu.surface.get_current_texture() {
            Ok(output) => output,
            Err(e) => {
                log::warn!("failed to get surface texture: {e}");
                return;
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.mesh_pass.prepare(gpu, &self.draw_list);

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });
        self.mesh_pass
            .render(&mut encoder, &view, Self::CLEAR_COLOR, &self.draw_list);

        gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_starts_behind_the_origin_looking_down() {
        let camera = initial_camera(CameraSettings::default(), Vector2u::new(1280, 720));
        assert_eq!(camera.position(), Vector3f::new(0.5, 0.75, 1.6));

        let forward = camera.transform().rotation().forward();
        let expected = Vector3f::new(0.0, -(20f32.to_radians().sin()), -(20f32.to_radians().cos()));
        assert!(forward.distance(expected) < 1e-5, "{forward}");
        assert!((camera.aspect_ratio() - 1280.0 / 720.0).abs() < 1e-6);
    }
}
