//! Things that can be drawn: models, the ground grid and debug spheres.
//!
//! Each drawable owns a [`Transform`] and a [`SharedMesh`]. Rendering does not
//! touch the GPU directly; it appends [`DrawItem`]s to a [`DrawList`], which
//! the mesh pass later turns into uniform writes and indexed draws.

use std::path::Path;

use crate::camera::Camera;
use crate::geometry::{self, GeometryError, MeshCache};
use crate::gpu::{DrawEncoder, GeometryBackend, GpuContext};
use crate::math::{Aabb, Rect, Vector2f, Vector3f};
use crate::mesh::{Mesh, SharedMesh, Vertex};
use crate::transform::Transform;

/// Per-draw shader parameters.
///
/// Laid out for a WGSL uniform struct: every `vec3` shares its 16-byte slot
/// with the scalar that follows it.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct UniformBlock {
    pub model: [[f32; 4]; 4],
    /// Inverse transpose of `model`, so normals stay perpendicular under
    /// non-uniform scale.
    pub normal_matrix: [[f32; 4]; 4],
    /// Camera projection times view.
    pub view_projection: [[f32; 4]; 4],
    pub object_color: [f32; 3],
    /// 1 fades fragments out with distance from the viewer.
    pub fade: f32,
    pub light_position: [f32; 3],
    /// 1 for lit surfaces, 0 for flat-coloured line overlays.
    pub wireframe: f32,
    pub light_color: [f32; 3],
    pub _pad0: f32,
    pub view_position: [f32; 3],
    pub _pad1: f32,
}

/// Lighting inputs shared by every draw of one drawable.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Shading {
    pub color: Vector3f,
    pub light_position: Vector3f,
    pub light_color: Vector3f,
    pub fade: f32,
}

impl Shading {
    pub fn new(color: Vector3f, light_position: Vector3f) -> Self {
        Self {
            color,
            light_position,
            light_color: Vector3f::ONE,
            fade: 0.0,
        }
    }

    pub fn with_fade(mut self, fade: f32) -> Self {
        self.fade = fade;
        self
    }
}

impl UniformBlock {
    /// Uniforms for drawing through `transform`; refreshes its cached matrices.
    pub fn new(transform: &mut Transform, camera: &Camera, shading: &Shading, wireframe: f32) -> Self {
        Self {
            model: transform.matrix().to_cols_array_2d(),
            normal_matrix: transform.inverse_matrix().transpose().to_cols_array_2d(),
            view_projection: camera.view_projection().to_cols_array_2d(),
            object_color: shading.color.to_array(),
            fade: shading.fade,
            light_position: shading.light_position.to_array(),
            wireframe,
            light_color: shading.light_color.to_array(),
            _pad0: 0.0,
            view_position: camera.position().to_array(),
            _pad1: 0.0,
        }
    }
}

/// One queued draw: a mesh, its uniforms and the rasterization mode.
pub struct DrawItem<G: GeometryBackend = GpuContext> {
    pub mesh: SharedMesh<G>,
    pub uniforms: UniformBlock,
    pub wireframe: bool,
}

impl<G: GeometryBackend> DrawItem<G> {
    /// Forwards the mesh draw to `encoder`.
    pub fn draw<E>(&self, encoder: &mut E)
    where
        E: DrawEncoder<G::Buffer> + ?Sized,
    {
        self.mesh.borrow().draw(encoder, self.wireframe);
    }
}

/// Draws collected for one frame, in submission order.
pub struct DrawList<G: GeometryBackend = GpuContext> {
    items: Vec<DrawItem<G>>,
}

impl<G: GeometryBackend> Default for DrawList<G> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<G: GeometryBackend> DrawList<G> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, mesh: &SharedMesh<G>, uniforms: UniformBlock, wireframe: bool) {
        self.items.push(DrawItem {
            mesh: mesh.clone(),
            uniforms,
            wireframe,
        });
    }

    pub fn items(&self) -> &[DrawItem<G>] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

/// Something that queues draws for the current camera.
pub trait Renderable<G: GeometryBackend = GpuContext> {
    fn render(&mut self, camera: &Camera, list: &mut DrawList<G>);
}

/// A lit mesh with an optional wireframe overlay.
pub struct Model<G: GeometryBackend = GpuContext> {
    transform: Transform,
    mesh: SharedMesh<G>,
    color: Vector3f,
    wireframe: bool,
}

impl<G: GeometryBackend> Model<G> {
    pub const LIGHT_POSITION: Vector3f = Vector3f::new(0.5, 1.1, 0.8);

    pub fn new(mesh: SharedMesh<G>) -> Self {
        Self {
            transform: Transform::new(),
            mesh,
            color: Vector3f::ONE,
            wireframe: false,
        }
    }

    /// Loads `path` through `cache`, sharing the mesh with earlier loads.
    pub fn load(path: impl AsRef<Path>, cache: &mut MeshCache<G>, gpu: &G) -> Result<Self, GeometryError> {
        cache.load_or_insert(path, gpu).map(Self::new)
    }

    /// Writes the mesh's triangles to `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), GeometryError> {
        geometry::export(&*self.mesh.borrow(), path)
    }

    pub fn mesh(&self) -> &SharedMesh<G> {
        &self.mesh
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn transform_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }

    pub fn color(&self) -> Vector3f {
        self.color
    }

    pub fn set_color(&mut self, color: Vector3f) {
        self.color = color;
    }

    pub fn wireframe(&self) -> bool {
        self.wireframe
    }

    /// Draw triangle edges over the lit surface.
    pub fn set_wireframe(&mut self, wireframe: bool) {
        self.wireframe = wireframe;
    }

    pub fn local_bounds(&self) -> Aabb<f32> {
        self.mesh.borrow().local_bounds()
    }

    pub fn global_bounds(&mut self) -> Aabb<f32> {
        let matrix = self.transform.matrix();
        self.mesh.borrow().global_bounds(&matrix)
    }

    pub fn volume(&mut self) -> f32 {
        let matrix = self.transform.matrix();
        self.mesh.borrow().volume(&matrix)
    }

    /// Recomputes smooth normals on the shared mesh and re-uploads it.
    pub fn generate_normals(&self, gpu: &G) {
        self.mesh.borrow_mut().update_normals(gpu);
    }
}

impl<G: GeometryBackend> Renderable<G> for Model<G> {
    fn render(&mut self, camera: &Camera, list: &mut DrawList<G>) {
        let shading = Shading::new(self.color, Self::LIGHT_POSITION);

        list.push(&self.mesh, UniformBlock::new(&mut self.transform, camera, &shading, 1.0), false);
        if self.wireframe {
            list.push(&self.mesh, UniformBlock::new(&mut self.transform, camera, &shading, 0.0), true);
        }
    }
}

/// A flat line grid on the XZ plane.
pub struct Ground<G: GeometryBackend = GpuContext> {
    transform: Transform,
    mesh: SharedMesh<G>,
}

impl<G: GeometryBackend> Ground<G> {
    pub const BOUNDS: Rect<f32> = Rect::new(10.0, -10.0, -10.0, 10.0);
    pub const INTERVAL: f32 = 0.2;
    pub const COLOR: Vector3f = Vector3f::new(0.4, 0.4, 0.4);
    pub const LIGHT_POSITION: Vector3f = Vector3f::new(0.5, 20.0, 0.5);

    /// Builds and uploads the grid.
    pub fn new(gpu: &G) -> Self {
        let mut mesh = grid_mesh(&Self::BOUNDS, Self::INTERVAL);
        mesh.complete(gpu);
        Self {
            transform: Transform::new(),
            mesh: mesh.into_shared(),
        }
    }

    pub fn mesh(&self) -> &SharedMesh<G> {
        &self.mesh
    }

    pub fn transform_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }
}

impl<G: GeometryBackend> Renderable<G> for Ground<G> {
    fn render(&mut self, camera: &Camera, list: &mut DrawList<G>) {
        let shading = Shading::new(Self::COLOR, Self::LIGHT_POSITION).with_fade(1.0);
        let uniforms = UniformBlock::new(&mut self.transform, camera, &shading, 1.0);
        list.push(&self.mesh, uniforms, false);
    }
}

/// Line-list grid: lines along Z at every `interval` in X, then lines along X
/// at every `interval` in Z, each set closed by a line on the far edge.
fn grid_mesh<G: GeometryBackend>(bounds: &Rect<f32>, interval: f32) -> Mesh<G> {
    let mut mesh = Mesh::new();
    mesh.set_topology(wgpu::PrimitiveTopology::LineList);

    let mut append = |point: Vector2f| {
        mesh.add_vertex(Vertex::new(Vector3f::new(point.x, 0.0, point.y), Vector3f::Y));
        mesh.add_index(mesh.len() as u32 - 1);
    };

    let columns = ((bounds.right - bounds.left) / interval).round() as usize;
    for i in 0..columns {
        let x = bounds.left + i as f32 * interval;
        append(Vector2f::new(x, bounds.bottom));
        append(Vector2f::new(x, bounds.top));
    }
    append(Vector2f::new(bounds.right, bounds.bottom));
    append(Vector2f::new(bounds.right, bounds.top));

    let rows = ((bounds.top - bounds.bottom) / interval).round() as usize;
    for i in 0..rows {
        let z = bounds.bottom + i as f32 * interval;
        append(Vector2f::new(bounds.left, z));
        append(Vector2f::new(bounds.right, z));
    }
    append(Vector2f::new(bounds.left, bounds.top));
    append(Vector2f::new(bounds.right, bounds.top));

    mesh
}

/// A subdivided icosahedron drawn as a wireframe.
pub struct Sphere<G: GeometryBackend = GpuContext> {
    transform: Transform,
    mesh: SharedMesh<G>,
}

const ICO_X: f32 = 0.525_731_1;
const ICO_Z: f32 = 0.850_650_8;

const ICOSAHEDRON_VERTICES: [Vector3f; 12] = [
    Vector3f::new(-ICO_X, 0.0, ICO_Z),
    Vector3f::new(ICO_X, 0.0, ICO_Z),
    Vector3f::new(-ICO_X, 0.0, -ICO_Z),
    Vector3f::new(ICO_X, 0.0, -ICO_Z),
    Vector3f::new(0.0, ICO_Z, ICO_X),
    Vector3f::new(0.0, ICO_Z, -ICO_X),
    Vector3f::new(0.0, -ICO_Z, ICO_X),
    Vector3f::new(0.0, -ICO_Z, -ICO_X),
    Vector3f::new(ICO_Z, ICO_X, 0.0),
    Vector3f::new(-ICO_Z, ICO_X, 0.0),
    Vector3f::new(ICO_Z, -ICO_X, 0.0),
    Vector3f::new(-ICO_Z, -ICO_X, 0.0),
];

const ICOSAHEDRON_FACES: [[usize; 3]; 20] = [
    [0, 4, 1],
    [0, 9, 4],
    [9, 5, 4],
    [4, 5, 8],
    [4, 8, 1],
    [8, 10, 1],
    [8, 3, 10],
    [5, 3, 8],
    [5, 2, 3],
    [2, 7, 3],
    [7, 10, 3],
    [7, 6, 10],
    [7, 11, 6],
    [11, 0, 6],
    [0, 1, 6],
    [6, 1, 10],
    [9, 0, 11],
    [9, 11, 2],
    [9, 2, 5],
    [7, 2, 11],
];

impl<G: GeometryBackend> Sphere<G> {
    pub const COLOR: Vector3f = Vector3f::new(1.0, 0.4, 0.4);
    pub const LIGHT_POSITION: Vector3f = Vector3f::new(0.5, 20.0, 0.5);

    /// Builds a unit icosphere with `depth` subdivisions, scaled to `radius`.
    pub fn new(gpu: &G, depth: u32, radius: f32) -> Self {
        let mut mesh = icosphere_mesh(depth);
        mesh.complete(gpu);
        Self {
            transform: Transform::new().with_uniform_scale(radius),
            mesh: mesh.into_shared(),
        }
    }

    pub fn mesh(&self) -> &SharedMesh<G> {
        &self.mesh
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn transform_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }
}

impl<G: GeometryBackend> Renderable<G> for Sphere<G> {
    fn render(&mut self, camera: &Camera, list: &mut DrawList<G>) {
        let shading = Shading::new(Self::COLOR, Self::LIGHT_POSITION);
        let uniforms = UniformBlock::new(&mut self.transform, camera, &shading, 0.0);
        list.push(&self.mesh, uniforms, true);
    }
}

/// Unindexed-style icosphere: every triangle gets its own three vertices.
fn icosphere_mesh<G: GeometryBackend>(depth: u32) -> Mesh<G> {
    let mut mesh = Mesh::new();
    for [a, b, c] in ICOSAHEDRON_FACES {
        subdivide(
            &mut mesh,
            ICOSAHEDRON_VERTICES[a],
            ICOSAHEDRON_VERTICES[b],
            ICOSAHEDRON_VERTICES[c],
            depth,
        );
    }
    mesh
}

fn subdivide<G: GeometryBackend>(mesh: &mut Mesh<G>, v1: Vector3f, v2: Vector3f, v3: Vector3f, depth: u32) {
    if depth == 0 {
        for v in [v1, v2, v3] {
            // on the unit sphere the position is its own normal
            mesh.add_vertex(Vertex::new(v, v));
            mesh.add_index(mesh.len() as u32 - 1);
        }
        return;
    }

    let v12 = (v1 + v2).normalized();
    let v23 = (v2 + v3).normalized();
    let v31 = (v3 + v1).normalized();

    subdivide(mesh, v1, v12, v31, depth - 1);
    subdivide(mesh, v2, v23, v12, depth - 1);
    subdivide(mesh, v3, v31, v23, depth - 1);
    subdivide(mesh, v12, v23, v31, depth - 1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::testing::{RecordingBackend, RecordingEncoder};
    use crate::math::{Matrix4, Vector2u};
    use crate::mesh::tests::unit_cube;

    fn camera() -> Camera {
        let mut camera = Camera::default();
        camera.init(Vector2u::new(1280, 720));
        camera.transform_mut().set_position(Vector3f::new(0.0, 1.0, -3.0));
        camera
    }

    #[test]
    fn uniform_block_matches_wgsl_layout() {
        assert_eq!(std::mem::size_of::<UniformBlock>(), 256);
        assert_eq!(std::mem::offset_of!(UniformBlock, normal_matrix), 64);
        assert_eq!(std::mem::offset_of!(UniformBlock, object_color), 192);
        assert_eq!(std::mem::offset_of!(UniformBlock, wireframe), 220);
        assert_eq!(std::mem::offset_of!(UniformBlock, view_position), 240);
    }

    #[test]
    fn normal_matrix_keeps_normals_perpendicular_under_stretch() {
        let mut transform = Transform::new().with_scale(Vector3f::new(2.0, 1.0, 1.0));
        let shading = Shading::new(Vector3f::ONE, Vector3f::Y);
        let uniforms = UniformBlock::new(&mut transform, &camera(), &shading, 1.0);

        let model = Matrix4::from(glam::Mat4::from_cols_array_2d(&uniforms.model));
        let normal_matrix = Matrix4::from(glam::Mat4::from_cols_array_2d(&uniforms.normal_matrix));

        // surface x + y = c: tangent (1, -1, 0), normal (1, 1, 0)
        let tangent = model.transform_vector(Vector3f::new(1.0, -1.0, 0.0));
        let normal = normal_matrix.transform_vector(Vector3f::new(1.0, 1.0, 0.0));
        assert!(tangent.dot(normal).abs() < 1e-6);
        assert!(tangent.dot(model.transform_vector(Vector3f::new(1.0, 1.0, 0.0))).abs() > 1.0);
    }

    #[test]
    fn model_queues_overlay_only_when_enabled() {
        let gpu = RecordingBackend::new();
        let mut mesh = unit_cube();
        mesh.complete(&gpu);
        let mut model = Model::new(mesh.into_shared());
        model.set_color(Vector3f::new(0.2, 0.6, 1.0));

        let camera = camera();
        let mut list = DrawList::new();
        model.render(&camera, &mut list);
        assert_eq!(list.len(), 1);

        model.set_wireframe(true);
        list.clear();
        model.render(&camera, &mut list);
        let [solid, overlay] = list.items() else {
            panic!("expected two draws");
        };
        assert!(!solid.wireframe);
        assert_eq!(solid.uniforms.wireframe, 1.0);
        assert!(overlay.wireframe);
        assert_eq!(overlay.uniforms.wireframe, 0.0);
        assert_eq!(solid.uniforms.object_color, [0.2, 0.6, 1.0]);
        assert_eq!(solid.uniforms.light_position, [0.5, 1.1, 0.8]);
        assert_eq!(solid.uniforms.view_position, [0.0, 1.0, -3.0]);

        let mut encoder = RecordingEncoder::default();
        for item in list.items() {
            item.draw(&mut encoder);
        }
        assert_eq!(encoder.draws.len(), 2);
        assert!(encoder.draws[1].wireframe);
    }

    #[test]
    fn model_measures_through_its_transform() {
        let mut model = Model::new(unit_cube().into_shared());
        model.transform_mut().set_uniform_scale(3.0);
        model.transform_mut().set_position(Vector3f::new(1.0, 0.0, 0.0));

        assert_eq!(model.local_bounds().max, Vector3f::ONE);
        let bounds = model.global_bounds();
        assert_eq!(bounds.min, Vector3f::new(1.0, 0.0, 0.0));
        assert_eq!(bounds.max, Vector3f::new(4.0, 3.0, 3.0));
        assert!((model.volume() - 27.0).abs() < 1e-3);
    }

    #[test]
    fn models_share_one_mesh() {
        let gpu = RecordingBackend::new();
        let shared = unit_cube().into_shared();
        let a = Model::new(shared.clone());
        let b = Model::new(shared);

        a.generate_normals(&gpu);
        assert!(b.mesh().borrow().vertices()[7].normal.length() > 0.99);
    }

    #[test]
    fn ground_is_a_closed_line_grid() {
        let gpu = RecordingBackend::new();
        let ground = Ground::new(&gpu);
        let mesh = ground.mesh().borrow();

        assert_eq!(mesh.topology(), wgpu::PrimitiveTopology::LineList);
        assert_eq!(mesh.len(), 404);
        assert!(mesh.is_complete());
        assert!(mesh.indices().iter().enumerate().all(|(i, &index)| index == i as u32));
        assert!(mesh.vertices().iter().all(|v| v.position.y == 0.0 && v.normal == Vector3f::Y));

        let bounds = mesh.local_bounds();
        assert_eq!(bounds.min, Vector3f::new(-10.0, 0.0, -10.0));
        assert_eq!(bounds.max, Vector3f::new(10.0, 0.0, 10.0));
    }

    #[test]
    fn ground_fades_with_distance() {
        let gpu = RecordingBackend::new();
        let mut ground = Ground::new(&gpu);
        let mut list = DrawList::new();
        ground.render(&camera(), &mut list);
        assert_eq!(list.items()[0].uniforms.fade, 1.0);
        assert_eq!(list.items()[0].uniforms.object_color, [0.4, 0.4, 0.4]);
    }

    #[test]
    fn icosphere_vertices_lie_on_the_unit_sphere() {
        let gpu = RecordingBackend::new();
        for (depth, expected) in [(0, 60), (1, 240), (2, 960)] {
            let sphere = Sphere::new(&gpu, depth, 2.0);
            let mesh = sphere.mesh().borrow();
            assert_eq!(mesh.len(), expected);
            for vertex in mesh.vertices() {
                assert!((vertex.position.length() - 1.0).abs() < 1e-5);
                assert_eq!(vertex.position, vertex.normal);
            }
            assert_eq!(sphere.transform().scale(), Vector3f::splat(2.0));
        }
    }

    #[test]
    fn sphere_draws_as_wireframe() {
        let gpu = RecordingBackend::new();
        let mut sphere = Sphere::new(&gpu, 1, 0.5);
        let mut list = DrawList::new();
        sphere.render(&camera(), &mut list);
        assert!(list.items()[0].wireframe);
        assert_eq!(list.items()[0].uniforms.object_color, [1.0, 0.4, 0.4]);
    }
}
