//! CPU-side geometry with a GPU upload lifecycle.
//!
//! A [`Mesh`] owns its vertices and indices and, once completed, a vertex and
//! an index buffer on the GPU:
//!
//! 1. create it empty or pre-sized
//! 2. append vertices and indices
//! 3. call [`Mesh::complete`] to upload both arrays
//!
//! Completion is a one-way step. Appending afterwards only changes the CPU
//! arrays; nothing is re-uploaded until [`Mesh::upload_vertices`] or
//! [`Mesh::update_normals`] is called, and those only refresh the vertex buffer.
//! Draws always use the index count that was uploaded.
//!
//! Meshes shared between several drawables live behind a [`SharedMesh`].
//!
//! # Vertex Layout
//!
//! | Attribute | Format    | Offset | Shader Location |
//! |-----------|-----------|--------|-----------------|
//! | position  | Float32x3 | 0      | 0               |
//! | normal    | Float32x3 | 12     | 1               |
//!
//! # Example
//!
//! ```
//! use vantage::gpu::testing::RecordingBackend;
//! use vantage::math::Vector3f;
//! use vantage::{Mesh, Vertex};
//!
//! let gpu = RecordingBackend::new();
//! let mut mesh = Mesh::<RecordingBackend>::new();
//! mesh.add_vertex(Vertex::from_position(Vector3f::new(0.0, 0.0, 0.0)));
//! mesh.add_vertex(Vertex::from_position(Vector3f::new(1.0, 0.0, 0.0)));
//! mesh.add_vertex(Vertex::from_position(Vector3f::new(0.0, 1.0, 0.0)));
//! mesh.add_indices([0, 1, 2]);
//! mesh.update_normals_cpu();
//! mesh.complete(&gpu);
//!
//! assert!(mesh.is_complete());
//! assert_eq!(mesh.vertices()[0].normal, Vector3f::new(0.0, 0.0, 1.0));
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::gpu::{BufferKind, DrawEncoder, GeometryBackend, GpuBuffer, GpuContext, IndexedDraw};
use crate::math::{Aabb, Matrix4, Ray, Vector3f};

/// A mesh vertex: position and normal.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: Vector3f,
    pub normal: Vector3f,
}

impl Vertex {
    /// wgpu layout for pipelines reading [`Vertex`] buffers.
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            // position
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x3,
            },
            // normal
            wgpu::VertexAttribute {
                offset: 12,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x3,
            },
        ],
    };

    pub const fn new(position: Vector3f, normal: Vector3f) -> Self {
        Self { position, normal }
    }

    /// Vertex with a zero normal, to be filled by normal generation.
    pub const fn from_position(position: Vector3f) -> Self {
        Self::new(position, Vector3f::ZERO)
    }
}

/// Three vertices of one triangle, copied out of a mesh.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Triangle {
    pub vertices: [Vertex; 3],
}

impl Triangle {
    /// The three corner positions in winding order.
    pub fn positions(&self) -> [Vector3f; 3] {
        self.vertices.map(|v| v.position)
    }

    /// Unit face normal from the winding order, zero for degenerate triangles.
    pub fn normal(&self) -> Vector3f {
        let [a, b, c] = self.positions();
        (b - a).cross(c - a).normalized_or_zero()
    }

    /// Positions mapped through `transform`.
    pub fn transformed(&self, transform: &Matrix4) -> [Vector3f; 3] {
        self.positions().map(|p| transform.transform_point(p))
    }
}

/// Recomputes smooth normals for an indexed triangle list.
///
/// Each face normal is added to its three vertices, then every vertex normal is
/// normalized. Vertices used by no triangle end up with a zero normal.
pub fn smooth_normals(vertices: &mut [Vertex], indices: &[u32]) {
    let mut normals = vec![Vector3f::ZERO; vertices.len()];

    for face in indices.chunks_exact(3) {
        let [i0, i1, i2] = [face[0] as usize, face[1] as usize, face[2] as usize];
        let p0 = vertices[i0].position;
        let edge1 = vertices[i1].position - p0;
        let edge2 = vertices[i2].position - p0;
        let normal = edge1.cross(edge2).normalized_or_zero();

        normals[i0] += normal;
        normals[i1] += normal;
        normals[i2] += normal;
    }

    for (vertex, normal) in vertices.iter_mut().zip(normals) {
        vertex.normal = normal.normalized_or_zero();
    }
}

/// Nearest ray hit against a mesh.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RayHit {
    /// Distance along the ray.
    pub distance: f32,
    /// Index of the triangle that was hit.
    pub triangle: usize,
    /// World-space hit point.
    pub point: Vector3f,
}

struct MeshBuffers<B> {
    vertices: GpuBuffer<B>,
    indices: GpuBuffer<B>,
    index_count: u32,
}

/// Vertex and index data plus the GPU buffers created by [`complete`](Mesh::complete).
pub struct Mesh<G: GeometryBackend = GpuContext> {
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    topology: wgpu::PrimitiveTopology,
    buffers: Option<MeshBuffers<G::Buffer>>,
}

/// A mesh owned jointly by several drawables on the render thread.
pub type SharedMesh<G = GpuContext> = Rc<RefCell<Mesh<G>>>;

impl<G: GeometryBackend> Default for Mesh<G> {
    fn default() -> Self {
        Self {
            vertices: Vec::new(),
            indices: Vec::new(),
            topology: wgpu::PrimitiveTopology::TriangleList,
            buffers: None,
        }
    }
}

impl<G: GeometryBackend> fmt::Debug for Mesh<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mesh")
            .field("vertices", &self.vertices.len())
            .field("indices", &self.indices.len())
            .field("topology", &self.topology)
            .field("complete", &self.is_complete())
            .finish()
    }
}

impl<G: GeometryBackend> Mesh<G> {
    /// Empty triangle-list mesh with no GPU buffers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mesh with `size` default vertices and no indices.
    pub fn with_size(size: usize) -> Self {
        let mut mesh = Self::new();
        mesh.resize(size);
        mesh
    }

    /// Wraps the mesh so several drawables can hold it.
    pub fn into_shared(self) -> SharedMesh<G> {
        Rc::new(RefCell::new(self))
    }

    /// Grows or truncates the vertex array; new vertices are zeroed.
    pub fn resize(&mut self, size: usize) {
        self.vertices.resize(size, Vertex::default());
    }

    /// Empties both CPU arrays. GPU buffers are kept.
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
    }

    /// Appends a vertex. After [`complete`](Self::complete) the GPU copy is not updated.
    pub fn add_vertex(&mut self, vertex: Vertex) {
        self.vertices.push(vertex);
    }

    /// Appends an index. After [`complete`](Self::complete) the GPU copy is not updated.
    pub fn add_index(&mut self, index: u32) {
        self.indices.push(index);
    }

    /// Appends several vertices.
    pub fn add_vertices(&mut self, vertices: impl IntoIterator<Item = Vertex>) {
        self.vertices.extend(vertices);
    }

    /// Appends several indices.
    pub fn add_indices(&mut self, indices: impl IntoIterator<Item = u32>) {
        self.indices.extend(indices);
    }

    /// Replaces the vertex array.
    pub fn set_vertices(&mut self, vertices: Vec<Vertex>) {
        self.vertices = vertices;
    }

    /// Replaces the index array.
    pub fn set_indices(&mut self, indices: Vec<u32>) {
        self.indices = indices;
    }

    /// Number of vertices.
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// True when the mesh has no vertices.
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Number of indices on the CPU side.
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Number of complete index triples.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// CPU vertex array.
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// CPU index array.
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Mutable access to one vertex. Call [`upload_vertices`](Self::upload_vertices)
    /// afterwards to push the change to the GPU.
    ///
    /// Panics if `index` is out of range.
    pub fn vertex_mut(&mut self, index: usize) -> &mut Vertex {
        &mut self.vertices[index]
    }

    /// How the index buffer is assembled into primitives.
    pub fn topology(&self) -> wgpu::PrimitiveTopology {
        self.topology
    }

    /// Changes the primitive topology used by [`draw`](Self::draw).
    pub fn set_topology(&mut self, topology: wgpu::PrimitiveTopology) {
        self.topology = topology;
    }

    /// True once [`complete`](Self::complete) has uploaded the buffers.
    pub fn is_complete(&self) -> bool {
        self.buffers.is_some()
    }

    /// Uploads both arrays to GPU buffers.
    ///
    /// Empty arrays produce a valid mesh that simply draws nothing. Calling it
    /// again re-uploads both arrays, reusing the buffers when they are big enough.
    pub fn complete(&mut self, gpu: &G) {
        let vertex_bytes: &[u8] = bytemuck::cast_slice(&self.vertices);
        let index_bytes: &[u8] = bytemuck::cast_slice(&self.indices);
        let index_count = self.indices.len() as u32;

        match &mut self.buffers {
            Some(buffers) => {
                buffers.vertices.upload(gpu, vertex_bytes);
                buffers.indices.upload(gpu, index_bytes);
                buffers.index_count = index_count;
            }
            None => {
                self.buffers = Some(MeshBuffers {
                    vertices: GpuBuffer::new(gpu, "Mesh Vertex Buffer", BufferKind::Vertex, vertex_bytes),
                    indices: GpuBuffer::new(gpu, "Mesh Index Buffer", BufferKind::Index, index_bytes),
                    index_count,
                });
            }
        }

        log::debug!(
            "mesh completed: {} vertices, {} indices",
            self.vertices.len(),
            self.indices.len()
        );
    }

    /// Re-uploads the vertex array only. Does nothing before completion.
    pub fn upload_vertices(&mut self, gpu: &G) {
        match &mut self.buffers {
            Some(buffers) => buffers.vertices.upload(gpu, bytemuck::cast_slice(&self.vertices)),
            None => log::warn!("upload_vertices on a mesh that was never completed"),
        }
    }

    /// Recomputes smooth vertex normals without uploading. See [`smooth_normals`].
    pub fn update_normals_cpu(&mut self) {
        smooth_normals(&mut self.vertices, &self.indices);
    }

    /// Recomputes normals and re-uploads the vertex buffer.
    ///
    /// A full pass over all vertices and triangles; meant for post-load
    /// processing, not for every frame.
    pub fn update_normals(&mut self, gpu: &G) {
        self.update_normals_cpu();
        self.upload_vertices(gpu);
    }

    /// The `index`-th triangle of a triangle-list mesh.
    ///
    /// `index` must be below [`triangle_count`](Self::triangle_count). Debug
    /// builds check this; release builds leave it to the caller.
    pub fn triangle(&self, index: usize) -> Triangle {
        debug_assert!(
            index < self.triangle_count(),
            "triangle index {index} out of range ({} triangles)",
            self.triangle_count()
        );
        let base = index * 3;
        Triangle {
            vertices: [
                self.vertices[self.indices[base] as usize],
                self.vertices[self.indices[base + 1] as usize],
                self.vertices[self.indices[base + 2] as usize],
            ],
        }
    }

    /// Every triangle of a triangle-list mesh, in index order.
    pub fn triangles(&self) -> impl Iterator<Item = Triangle> + '_ {
        (0..self.triangle_count()).map(|i| self.triangle(i))
    }

    /// Enclosed volume after applying `transform`, by summing signed
    /// tetrahedra against the origin. Only meaningful for closed meshes.
    pub fn volume(&self, transform: &Matrix4) -> f32 {
        let signed: f32 = self
            .triangles()
            .map(|tri| {
                let [a, b, c] = tri.transformed(transform);
                a.dot(b.cross(c)) / 6.0
            })
            .sum();
        signed.abs()
    }

    /// Bounds of the untransformed vertices.
    pub fn local_bounds(&self) -> Aabb<f32> {
        Aabb::from_points(self.vertices.iter().map(|v| v.position))
    }

    /// Bounds of the vertices after applying `transform`.
    pub fn global_bounds(&self, transform: &Matrix4) -> Aabb<f32> {
        Aabb::from_points(self.vertices.iter().map(|v| transform.transform_point(v.position)))
    }

    /// Nearest triangle hit in world space, ignoring hits behind the origin.
    ///
    /// Only triangle lists can be hit.
    pub fn intersect_ray(&self, ray: &Ray, transform: &Matrix4) -> Option<RayHit> {
        if self.topology != wgpu::PrimitiveTopology::TriangleList {
            return None;
        }

        self.triangles()
            .enumerate()
            .filter_map(|(index, tri)| {
                let [a, b, c] = tri.transformed(transform);
                let distance = ray.triangle_intersects(a, b, c)?;
                (distance >= 0.0).then_some((index, distance))
            })
            .min_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(triangle, distance)| RayHit {
                distance,
                triangle,
                point: ray.point_at(distance),
            })
    }

    /// Submits one indexed draw over the uploaded buffers.
    ///
    /// Incomplete meshes are skipped with a warning; completed meshes without
    /// indices are skipped silently.
    pub fn draw<E>(&self, encoder: &mut E, wireframe: bool)
    where
        E: DrawEncoder<G::Buffer> + ?Sized,
    {
        let Some(buffers) = &self.buffers else {
            log::warn!("skipping draw of a mesh that was never completed");
            return;
        };
        if buffers.index_count == 0 {
            return;
        }

        encoder.draw_indexed(IndexedDraw {
            vertex_buffer: buffers.vertices.raw(),
            index_buffer: buffers.indices.raw(),
            index_count: buffers.index_count,
            topology: self.topology,
            wireframe,
        });
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::gpu::testing::{BufferCall, RecordingBackend, RecordingEncoder};
    use crate::math::{Angle, Quaternion};

    pub(crate) fn unit_cube() -> Mesh<RecordingBackend> {
        let mut mesh = Mesh::new();
        for i in 0..8 {
            let p = Vector3f::new((i & 1) as f32, ((i >> 1) & 1) as f32, ((i >> 2) & 1) as f32);
            mesh.add_vertex(Vertex::from_position(p));
        }
        mesh.add_indices([
            0, 2, 1, 1, 2, 3, // -z
            4, 5, 6, 5, 7, 6, // +z
            0, 1, 4, 1, 5, 4, // -y
            2, 6, 3, 3, 6, 7, // +y
            0, 4, 2, 2, 4, 6, // -x
            1, 3, 5, 3, 7, 5, // +x
        ]);
        mesh
    }

    fn single_triangle() -> Mesh<RecordingBackend> {
        let mut mesh = Mesh::new();
        mesh.add_vertex(Vertex::from_position(Vector3f::new(0.0, 0.0, 0.0)));
        mesh.add_vertex(Vertex::from_position(Vector3f::new(1.0, 0.0, 0.0)));
        mesh.add_vertex(Vertex::from_position(Vector3f::new(0.0, 1.0, 0.0)));
        mesh.add_indices([0, 1, 2]);
        mesh
    }

    #[test]
    fn vertex_layout_matches_struct() {
        assert_eq!(std::mem::size_of::<Vertex>(), 24);
        assert_eq!(Vertex::LAYOUT.array_stride, 24);
    }

    #[test]
    fn complete_uploads_both_arrays() {
        let gpu = RecordingBackend::new();
        let mut mesh = unit_cube();
        assert!(!mesh.is_complete());

        mesh.complete(&gpu);
        assert!(mesh.is_complete());
        assert_eq!(mesh.len(), 8);

        let calls = gpu.calls();
        assert_eq!(calls.len(), 2);
        match &calls[0] {
            BufferCall::Create { kind, bytes, .. } => {
                assert_eq!(*kind, BufferKind::Vertex);
                assert_eq!(bytes.len(), 8 * 24);
            }
            other => panic!("unexpected call {other:?}"),
        }
        match &calls[1] {
            BufferCall::Create { kind, bytes, .. } => {
                assert_eq!(*kind, BufferKind::Index);
                assert_eq!(bytes.len(), 36 * 4);
            }
            other => panic!("unexpected call {other:?}"),
        }
    }

    #[test]
    fn appending_after_complete_stays_on_the_cpu() {
        let gpu = RecordingBackend::new();
        let mut mesh = single_triangle();
        mesh.complete(&gpu);

        mesh.add_vertex(Vertex::from_position(Vector3f::ONE));
        mesh.add_indices([0, 2, 3]);
        assert_eq!(gpu.calls().len(), 2);
        assert_eq!(mesh.len(), 4);

        let mut encoder = RecordingEncoder::default();
        mesh.draw(&mut encoder, false);
        assert_eq!(encoder.draws[0].index_count, 3);
    }

    #[test]
    fn update_normals_points_along_winding() {
        let gpu = RecordingBackend::new();
        let mut mesh = single_triangle();
        mesh.complete(&gpu);
        gpu.clear();

        mesh.update_normals(&gpu);
        for vertex in mesh.vertices() {
            assert!(vertex.normal.distance(Vector3f::Z) < 1e-6);
        }

        // only the vertex buffer (id 0) is refreshed
        let calls = gpu.calls();
        assert_eq!(calls.len(), 1);
        assert!(matches!(&calls[0], BufferCall::Write { id: 0, .. }));
    }

    #[test]
    fn shared_vertices_average_face_normals() {
        let mut mesh = unit_cube();
        mesh.update_normals_cpu();
        let corner = mesh.vertices()[7].normal;
        let expected = Vector3f::ONE.normalized();
        assert!(corner.distance(expected) < 1e-5);
    }

    #[test]
    fn triangle_reads_indexed_vertices() {
        let mesh = unit_cube();
        assert_eq!(mesh.triangle_count(), 12);
        let tri = mesh.triangle(1);
        assert_eq!(tri.positions()[2], Vector3f::new(1.0, 1.0, 0.0));
        assert!(tri.normal().distance(-Vector3f::Z) < 1e-6);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn triangle_past_the_end_panics_in_debug() {
        single_triangle().triangle(1);
    }

    #[test]
    fn closed_cube_volume_uses_every_triangle() {
        let mesh = unit_cube();
        assert!((mesh.volume(&Matrix4::IDENTITY) - 1.0).abs() < 1e-5);

        let moved = Matrix4::translation(Vector3f::new(3.0, -2.0, 1.0))
            * Quaternion::from_axis_angle(Vector3f::Y, Angle::degrees(30.0)).to_rotation_matrix()
            * Matrix4::scale(Vector3f::splat(2.0));
        assert!((mesh.volume(&moved) - 8.0).abs() < 1e-3);
    }

    #[test]
    fn bounds_follow_the_transform() {
        let mesh = unit_cube();
        let local = mesh.local_bounds();
        assert_eq!(local.min, Vector3f::ZERO);
        assert_eq!(local.max, Vector3f::ONE);

        let global = mesh.global_bounds(&Matrix4::translation(Vector3f::new(0.0, 5.0, 0.0)));
        assert_eq!(global.min, Vector3f::new(0.0, 5.0, 0.0));
        assert_eq!(global.max, Vector3f::new(1.0, 6.0, 1.0));

        assert!(Mesh::<RecordingBackend>::new().local_bounds().is_empty());
    }

    #[test]
    fn ray_hits_nearest_face() {
        let mesh = unit_cube();
        let ray = Ray::new(Vector3f::new(0.25, 0.25, -5.0), Vector3f::Z);
        let hit = mesh.intersect_ray(&ray, &Matrix4::IDENTITY).expect("ray should hit the cube");
        assert!((hit.distance - 5.0).abs() < 1e-5);
        assert!(hit.point.distance(Vector3f::new(0.25, 0.25, 0.0)) < 1e-5);
        assert_eq!(hit.triangle, 0);

        let miss = Ray::new(Vector3f::new(5.0, 0.5, -5.0), Vector3f::Z);
        assert_eq!(mesh.intersect_ray(&miss, &Matrix4::IDENTITY), None);
    }

    #[test]
    fn draw_skips_incomplete_and_empty_meshes() {
        let gpu = RecordingBackend::new();
        let mut encoder = RecordingEncoder::default();

        let mesh = single_triangle();
        mesh.draw(&mut encoder, false);
        assert!(encoder.draws.is_empty());

        let mut empty = Mesh::<RecordingBackend>::new();
        empty.complete(&gpu);
        empty.draw(&mut encoder, false);
        assert!(encoder.draws.is_empty());
    }

    #[test]
    fn draw_passes_topology_and_wireframe() {
        let gpu = RecordingBackend::new();
        let mut mesh = unit_cube();
        mesh.set_topology(wgpu::PrimitiveTopology::LineList);
        mesh.complete(&gpu);

        let mut encoder = RecordingEncoder::default();
        mesh.draw(&mut encoder, true);
        let draw = encoder.draws[0];
        assert_eq!(draw.vertex_buffer, 0);
        assert_eq!(draw.index_buffer, 1);
        assert_eq!(draw.index_count, 36);
        assert_eq!(draw.topology, wgpu::PrimitiveTopology::LineList);
        assert!(draw.wireframe);
    }

    #[test]
    fn recompleting_reuses_buffers_that_fit() {
        let gpu = RecordingBackend::new();
        let mut mesh = unit_cube();
        mesh.complete(&gpu);
        mesh.set_indices(vec![0, 1, 2]);
        mesh.complete(&gpu);
        assert_eq!(gpu.creates(), 2);
        assert_eq!(gpu.writes(), 2);
    }
}
