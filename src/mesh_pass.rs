//! Depth-tested mesh rendering for a [`DrawList`].
//!
//! Every queued draw gets its own slot in one uniform buffer, bound with a
//! dynamic offset, so all uniforms are written before the render pass begins.
//!
//! # Pipelines
//!
//! One pipeline per topology, plus a line-polygon variant of the triangle list
//! pipeline when the adapter supports `POLYGON_MODE_LINE`. Without it,
//! wireframe draws of triangles fall back to filled polygons.
//!
//! All pipelines share:
//! - no face culling
//! - alpha blending
//! - depth write with `LessEqual`, so edges drawn over their own surface pass
//!
//! # Example
//!
//! ```ignore
//! let mut pass = MeshPass::new(&gpu);
//! pass.prepare(&gpu, &list);
//! pass.render(&mut encoder, &view, clear_color, &list);
//! ```

use std::collections::HashMap;

use crate::drawable::{DrawList, UniformBlock};
use crate::gpu::{DrawEncoder, GpuContext, IndexedDraw};
use crate::mesh::Vertex;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

const TOPOLOGIES: [wgpu::PrimitiveTopology; 5] = [
    wgpu::PrimitiveTopology::PointList,
    wgpu::PrimitiveTopology::LineList,
    wgpu::PrimitiveTopology::LineStrip,
    wgpu::PrimitiveTopology::TriangleList,
    wgpu::PrimitiveTopology::TriangleStrip,
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct PipelineKey {
    topology: wgpu::PrimitiveTopology,
    polygon_mode: wgpu::PolygonMode,
}

/// Renders meshes with per-draw uniforms and a depth buffer.
pub struct MeshPass {
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    bind_group_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    /// Bytes between consecutive uniform slots.
    slot_stride: u64,
    slot_capacity: usize,
    depth_view: wgpu::TextureView,
    depth_size: (u32, u32),
}

impl MeshPass {
    pub fn new(gpu: &GpuContext) -> Self {
        let device = &gpu.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Model Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/model.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Model Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<UniformBlock>() as u64),
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Model Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let mut pipelines = HashMap::new();
        for topology in TOPOLOGIES {
            let key = PipelineKey {
                topology,
                polygon_mode: wgpu::PolygonMode::Fill,
            };
            pipelines.insert(key, create_pipeline(gpu, &pipeline_layout, &shader, key));
        }
        if gpu.supports_line_polygons() {
            let key = PipelineKey {
                topology: wgpu::PrimitiveTopology::TriangleList,
                polygon_mode: wgpu::PolygonMode::Line,
            };
            pipelines.insert(key, create_pipeline(gpu, &pipeline_layout, &shader, key));
        } else {
            log::warn!("POLYGON_MODE_LINE unavailable, wireframes will render filled");
        }

        let alignment = u64::from(device.limits().min_uniform_buffer_offset_alignment);
        let slot_stride = (std::mem::size_of::<UniformBlock>() as u64).div_ceil(alignment) * alignment;
        let slot_capacity = 16;
        let (uniform_buffer, bind_group) =
            create_uniforms(device, &bind_group_layout, slot_stride, slot_capacity);

        let depth_view = create_depth_view(gpu);

        Self {
            pipelines,
            bind_group_layout,
            uniform_buffer,
            bind_group,
            slot_stride,
            slot_capacity,
            depth_view,
            depth_size: (gpu.width(), gpu.height()),
        }
    }

    /// Recreates the depth buffer if the surface size changed.
    pub fn ensure_depth_size(&mut self, gpu: &GpuContext) {
        if self.depth_size != (gpu.width(), gpu.height()) {
            self.depth_view = create_depth_view(gpu);
            self.depth_size = (gpu.width(), gpu.height());
        }
    }

    /// Writes the uniforms of every item in `list`, growing the buffer first
    /// when it has too few slots.
    pub fn prepare(&mut self, gpu: &GpuContext, list: &DrawList) {
        self.ensure_depth_size(gpu);

        if list.len() > self.slot_capacity {
            let capacity = list.len().next_power_of_two();
            log::debug!("growing uniform slots from {} to {capacity}", self.slot_capacity);
            let (buffer, bind_group) =
                create_uniforms(&gpu.device, &self.bind_group_layout, self.slot_stride, capacity);
            self.uniform_buffer = buffer;
            self.bind_group = bind_group;
            self.slot_capacity = capacity;
        }

        for (slot, item) in list.items().iter().enumerate() {
            gpu.queue.write_buffer(
                &self.uniform_buffer,
                slot as u64 * self.slot_stride,
                bytemuck::bytes_of(&item.uniforms),
            );
        }
    }

    /// Clears colour and depth, then draws every item of a prepared `list`.
    pub fn render(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        clear_color: wgpu::Color,
        list: &DrawList,
    ) {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Mesh Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear_color),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        for (slot, item) in list.items().iter().enumerate() {
            let mut pass_encoder = PassEncoder {
                mesh_pass: self,
                render_pass: &mut render_pass,
                offset: (slot as u64 * self.slot_stride) as u32,
            };
            item.draw(&mut pass_encoder);
        }
    }

    fn pipeline(&self, topology: wgpu::PrimitiveTopology, wireframe: bool) -> &wgpu::RenderPipeline {
        let fill = PipelineKey {
            topology,
            polygon_mode: wgpu::PolygonMode::Fill,
        };
        let key = PipelineKey {
            polygon_mode: if wireframe { wgpu::PolygonMode::Line } else { wgpu::PolygonMode::Fill },
            ..fill
        };
        // every topology has a fill pipeline
        self.pipelines.get(&key).unwrap_or_else(|| &self.pipelines[&fill])
    }
}

/// Binds one uniform slot and issues indexed draws into a render pass.
struct PassEncoder<'p, 'r> {
    mesh_pass: &'p MeshPass,
    render_pass: &'p mut wgpu::RenderPass<'r>,
    offset: u32,
}

impl DrawEncoder<wgpu::Buffer> for PassEncoder<'_, '_> {
    fn draw_indexed(&mut self, draw: IndexedDraw<'_, wgpu::Buffer>) {
        let pipeline = self.mesh_pass.pipeline(draw.topology, draw.wireframe);
        self.render_pass.set_pipeline(pipeline);
        self.render_pass
            .set_bind_group(0, &self.mesh_pass.bind_group, &[self.offset]);
        self.render_pass.set_vertex_buffer(0, draw.vertex_buffer.slice(..));
        self.render_pass
            .set_index_buffer(draw.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        self.render_pass.draw_indexed(0..draw.index_count, 0, 0..1);
    }
}

fn create_pipeline(
    gpu: &GpuContext,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    key: PipelineKey,
) -> wgpu::RenderPipeline {
    let strip_index_format = match key.topology {
        wgpu::PrimitiveTopology::LineStrip | wgpu::PrimitiveTopology::TriangleStrip => {
            Some(wgpu::IndexFormat::Uint32)
        }
        _ => None,
    };

    gpu.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("Model Pipeline"),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs"),
            buffers: &[Vertex::LAYOUT],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs"),
            targets: &[Some(wgpu::ColorTargetState {
                format: gpu.config.format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: key.topology,
            strip_index_format,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: key.polygon_mode,
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

fn create_uniforms(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    slot_stride: u64,
    slots: usize,
) -> (wgpu::Buffer, wgpu::BindGroup) {
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Model Uniforms"),
        size: slot_stride * slots as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Model Bind Group"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer: &buffer,
                offset: 0,
                size: wgpu::BufferSize::new(std::mem::size_of::<UniformBlock>() as u64),
            }),
        }],
    });

    (buffer, bind_group)
}

fn create_depth_view(gpu: &GpuContext) -> wgpu::TextureView {
    let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width: gpu.width(),
            height: gpu.height(),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}
