//! # Vantage
//!
//! Transform, camera and mesh core for a small wgpu model viewer.
//!
//! - [`math`]: vectors, quaternions, 4x4 matrices, rectangles, boxes and rays
//! - [`Transform`]: position/rotation/scale/origin with cached matrices
//! - [`Camera`]: perspective projection and mouse-look
//! - [`Mesh`]: CPU geometry with a one-shot GPU upload
//! - [`geometry`]: STL import/export and the [`MeshCache`]
//! - [`drawable`]: models, the ground grid and icospheres
//!
//! ## Quick Start
//!
//! ```no_run
//! use vantage::{AppConfig, run};
//!
//! run(AppConfig::new().title("Viewer"), |gpu, graphics| {
//!     let model = graphics.add_model(gpu, "bunny.stl").unwrap();
//!     model.set_wireframe(true);
//! })
//! .unwrap();
//! ```
//!
//! ## Conventions
//!
//! Matrices act on column vectors and are stored column by column. Objects
//! look down +Z with +Y up. Projections produce OpenGL-style depth in
//! `[-1, 1]`; the bundled shader remaps it for wgpu.

mod app;
mod camera;
pub mod drawable;
pub mod geometry;
pub mod gpu;
mod graphics;
mod input;
pub mod math;
mod mesh;
mod mesh_pass;
mod transform;

pub use app::{AppConfig, FixedStep, run};
pub use camera::{Camera, CameraSettings, CursorRequest, LookState};
pub use drawable::{DrawList, Ground, Model, Renderable, Sphere, UniformBlock};
pub use geometry::{GeometryError, ImportedGeometry, MeshCache};
pub use gpu::{GeometryBackend, GpuContext};
pub use graphics::{GraphicSystem, initial_camera};
pub use input::Input;
pub use mesh::{Mesh, RayHit, SharedMesh, Triangle, Vertex, smooth_normals};
pub use mesh_pass::MeshPass;
pub use transform::Transform;

// Re-export commonly used winit types for convenience
pub use winit::event::MouseButton;
pub use winit::keyboard::KeyCode;
