//! GPU context and the buffer/draw boundary used by meshes.
//!
//! [`GpuContext`] holds the wgpu device, queue and surface. Mesh code does not
//! talk to wgpu directly; it goes through two small capability traits:
//!
//! - [`GeometryBackend`] creates and updates buffers
//! - [`DrawEncoder`] records indexed draws
//!
//! `GpuContext` implements the first and the mesh pass implements the second.
//! The [`testing`] module provides recording doubles so mesh lifecycles can be
//! checked without a GPU adapter.
//!
//! [`GpuBuffer`] is the single owner of one backend buffer. It is not `Clone`;
//! moving it moves the handle.
//!
//! # Example
//!
//! ```
//! use vantage::gpu::{BufferKind, GpuBuffer};
//! use vantage::gpu::testing::RecordingBackend;
//!
//! let backend = RecordingBackend::new();
//! let mut buffer = GpuBuffer::new(&backend, "positions", BufferKind::Vertex, &[0u8; 16]);
//! buffer.upload(&backend, &[1u8; 8]); // fits, written in place
//! buffer.upload(&backend, &[2u8; 32]); // grows, reallocated
//! assert_eq!(buffer.capacity(), 32);
//! ```

use std::sync::Arc;

use wgpu::util::DeviceExt;
use winit::window::Window;

/// Core GPU context holding wgpu resources.
///
/// Created once at startup and passed by reference to everything that renders.
pub struct GpuContext {
    /// The surface for presenting rendered frames to the window.
    pub surface: wgpu::Surface<'static>,
    /// The logical GPU device for creating resources and pipelines.
    pub device: wgpu::Device,
    /// The command queue for submitting work to the GPU.
    pub queue: wgpu::Queue,
    /// Current surface configuration (format, size, present mode).
    pub config: wgpu::SurfaceConfiguration,
}

impl GpuContext {
    /// Create a new GPU context from a winit window.
    ///
    /// # Panics
    ///
    /// Panics if the surface cannot be created, no suitable adapter is found,
    /// or device creation fails.
    pub fn new(window: Arc<Window>) -> Self {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window)
            .expect("Failed to create a surface for the window");

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .expect("Failed to find a suitable GPU adapter");

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("Vantage Device"),
            required_features: wgpu::Features::POLYGON_MODE_LINE & adapter.features(),
            required_limits: wgpu::Limits::default(),
            memory_hints: Default::default(),
            trace: Default::default(),
            experimental_features: Default::default(),
        }))
        .expect("Failed to create device");

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        log::info!(
            "GPU ready: {} ({:?}), surface {}x{} {:?}",
            adapter.get_info().name,
            adapter.get_info().backend,
            config.width,
            config.height,
            config.format
        );

        Self {
            surface,
            device,
            queue,
            config,
        }
    }

    /// Resize the surface to new dimensions.
    ///
    /// Zero-sized dimensions (minimized window) are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.config.width = width;
            self.config.height = height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    /// Returns the current surface width in pixels.
    pub fn width(&self) -> u32 {
        self.config.width
    }

    /// Returns the current surface height in pixels.
    pub fn height(&self) -> u32 {
        self.config.height
    }

    /// True when the device can rasterize polygons as lines.
    pub fn supports_line_polygons(&self) -> bool {
        self.device.features().contains(wgpu::Features::POLYGON_MODE_LINE)
    }
}

/// What a buffer holds; decides its usage flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BufferKind {
    Vertex,
    Index,
    Uniform,
}

impl BufferKind {
    /// wgpu usages for this kind. Every kind can be rewritten with `write_buffer`.
    pub fn usages(self) -> wgpu::BufferUsages {
        let base = match self {
            BufferKind::Vertex => wgpu::BufferUsages::VERTEX,
            BufferKind::Index => wgpu::BufferUsages::INDEX,
            BufferKind::Uniform => wgpu::BufferUsages::UNIFORM,
        };
        base | wgpu::BufferUsages::COPY_DST
    }
}

/// Creates and updates GPU buffers.
pub trait GeometryBackend {
    /// Backend handle for one buffer.
    type Buffer;

    /// Allocates a buffer sized to `contents` and fills it.
    fn create_buffer(&self, label: &str, kind: BufferKind, contents: &[u8]) -> Self::Buffer;

    /// Overwrites the start of `buffer` with `contents`.
    fn write_buffer(&self, buffer: &Self::Buffer, contents: &[u8]);
}

impl GeometryBackend for GpuContext {
    type Buffer = wgpu::Buffer;

    fn create_buffer(&self, label: &str, kind: BufferKind, contents: &[u8]) -> wgpu::Buffer {
        self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents,
            usage: kind.usages(),
        })
    }

    fn write_buffer(&self, buffer: &wgpu::Buffer, contents: &[u8]) {
        self.queue.write_buffer(buffer, 0, contents);
    }
}

/// Exclusive owner of one backend buffer.
#[derive(Debug)]
pub struct GpuBuffer<B> {
    raw: B,
    label: String,
    kind: BufferKind,
    capacity: u64,
}

impl<B> GpuBuffer<B> {
    pub fn new<G>(gpu: &G, label: &str, kind: BufferKind, contents: &[u8]) -> Self
    where
        G: GeometryBackend<Buffer = B> + ?Sized,
    {
        Self {
            raw: gpu.create_buffer(label, kind, contents),
            label: label.to_owned(),
            kind,
            capacity: contents.len() as u64,
        }
    }

    /// Replaces the contents. Writes in place when they fit, otherwise drops
    /// the old buffer and allocates a bigger one.
    pub fn upload<G>(&mut self, gpu: &G, contents: &[u8])
    where
        G: GeometryBackend<Buffer = B> + ?Sized,
    {
        let len = contents.len() as u64;
        if len <= self.capacity {
            if len > 0 {
                gpu.write_buffer(&self.raw, contents);
            }
        } else {
            log::debug!("growing buffer '{}' from {} to {len} bytes", self.label, self.capacity);
            self.raw = gpu.create_buffer(&self.label, self.kind, contents);
            self.capacity = len;
        }
    }

    pub fn raw(&self) -> &B {
        &self.raw
    }

    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    /// Allocated size in bytes.
    pub fn capacity(&self) -> u64 {
        self.capacity
    }
}

/// One indexed draw over a vertex and an index buffer.
#[derive(Debug)]
pub struct IndexedDraw<'a, B> {
    pub vertex_buffer: &'a B,
    pub index_buffer: &'a B,
    pub index_count: u32,
    pub topology: wgpu::PrimitiveTopology,
    /// Rasterize triangle edges only.
    pub wireframe: bool,
}

/// Receives draw submissions.
pub trait DrawEncoder<B> {
    fn draw_indexed(&mut self, draw: IndexedDraw<'_, B>);
}

/// Recording test doubles for [`GeometryBackend`] and [`DrawEncoder`].
pub mod testing {
    use std::cell::{Cell, RefCell};

    use super::{BufferKind, DrawEncoder, GeometryBackend, IndexedDraw};

    /// A buffer operation seen by [`RecordingBackend`].
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum BufferCall {
        Create { id: u32, label: String, kind: BufferKind, bytes: Vec<u8> },
        Write { id: u32, bytes: Vec<u8> },
    }

    /// Backend whose buffers are plain ids; every call is logged.
    #[derive(Debug, Default)]
    pub struct RecordingBackend {
        calls: RefCell<Vec<BufferCall>>,
        next_id: Cell<u32>,
    }

    impl RecordingBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn calls(&self) -> Vec<BufferCall> {
            self.calls.borrow().clone()
        }

        pub fn creates(&self) -> usize {
            self.calls
                .borrow()
                .iter()
                .filter(|call| matches!(call, BufferCall::Create { .. }))
                .count()
        }

        pub fn writes(&self) -> usize {
            self.calls
                .borrow()
                .iter()
                .filter(|call| matches!(call, BufferCall::Write { .. }))
                .count()
        }

        /// Latest bytes created in or written to buffer `id`.
        pub fn contents(&self, id: u32) -> Option<Vec<u8>> {
            self.calls.borrow().iter().rev().find_map(|call| match call {
                BufferCall::Create { id: i, bytes, .. } | BufferCall::Write { id: i, bytes } if *i == id => {
                    Some(bytes.clone())
                }
                _ => None,
            })
        }

        pub fn clear(&self) {
            self.calls.borrow_mut().clear();
        }
    }

    impl GeometryBackend for RecordingBackend {
        type Buffer = u32;

        fn create_buffer(&self, label: &str, kind: BufferKind, contents: &[u8]) -> u32 {
            let id = self.next_id.get();
            self.next_id.set(id + 1);
            self.calls.borrow_mut().push(BufferCall::Create {
                id,
                label: label.to_owned(),
                kind,
                bytes: contents.to_vec(),
            });
            id
        }

        fn write_buffer(&self, buffer: &u32, contents: &[u8]) {
            self.calls.borrow_mut().push(BufferCall::Write {
                id: *buffer,
                bytes: contents.to_vec(),
            });
        }
    }

    /// A draw seen by [`RecordingEncoder`].
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct RecordedDraw {
        pub vertex_buffer: u32,
        pub index_buffer: u32,
        pub index_count: u32,
        pub topology: wgpu::PrimitiveTopology,
        pub wireframe: bool,
    }

    #[derive(Debug, Default)]
    pub struct RecordingEncoder {
        pub draws: Vec<RecordedDraw>,
    }

    impl DrawEncoder<u32> for RecordingEncoder {
        fn draw_indexed(&mut self, draw: IndexedDraw<'_, u32>) {
            self.draws.push(RecordedDraw {
                vertex_buffer: *draw.vertex_buffer,
                index_buffer: *draw.index_buffer,
                index_count: draw.index_count,
                topology: draw.topology,
                wireframe: draw.wireframe,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{BufferCall, RecordingBackend};
    use super::*;

    #[test]
    fn every_kind_is_writable() {
        for kind in [BufferKind::Vertex, BufferKind::Index, BufferKind::Uniform] {
            assert!(kind.usages().contains(wgpu::BufferUsages::COPY_DST));
        }
        assert!(BufferKind::Index.usages().contains(wgpu::BufferUsages::INDEX));
    }

    #[test]
    fn upload_writes_in_place_when_it_fits() {
        let backend = RecordingBackend::new();
        let mut buffer = GpuBuffer::new(&backend, "v", BufferKind::Vertex, &[0; 8]);
        buffer.upload(&backend, &[7; 4]);

        assert_eq!(backend.creates(), 1);
        assert_eq!(backend.calls()[1], BufferCall::Write { id: 0, bytes: vec![7; 4] });
        assert_eq!(buffer.capacity(), 8);
        assert_eq!(*buffer.raw(), 0);
    }

    #[test]
    fn upload_reallocates_when_too_small() {
        let backend = RecordingBackend::new();
        let mut buffer = GpuBuffer::new(&backend, "i", BufferKind::Index, &[]);
        buffer.upload(&backend, &[1; 12]);

        assert_eq!(backend.creates(), 2);
        assert_eq!(backend.writes(), 0);
        assert_eq!(*buffer.raw(), 1);
        assert_eq!(buffer.capacity(), 12);
        assert_eq!(backend.contents(1), Some(vec![1; 12]));
    }

    #[test]
    fn ownership_moves_with_the_value() {
        let backend = RecordingBackend::new();
        let buffer = GpuBuffer::new(&backend, "u", BufferKind::Uniform, &[0; 4]);
        let moved = buffer;
        assert_eq!(*moved.raw(), 0);
        assert_eq!(moved.kind(), BufferKind::Uniform);
    }
}
