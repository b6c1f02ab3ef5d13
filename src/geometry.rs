//! Mesh import/export and the mesh cache.
//!
//! Files are read and written through `stl_io`. Imported data lands in an
//! [`ImportedGeometry`] first so it can be inspected before it becomes a
//! [`Mesh`]. Smooth normals are generated on import.
//!
//! [`MeshCache`] shares one completed mesh between every model that loads the
//! same path:
//!
//! ```no_run
//! use vantage::geometry::MeshCache;
//! # fn demo(gpu: &vantage::GpuContext) -> Result<(), vantage::geometry::GeometryError> {
//! let mut cache = MeshCache::new();
//! let a = cache.load_or_insert("assets/bunny.stl", gpu)?;
//! let b = cache.load_or_insert("assets/bunny.stl", gpu)?; // no second import
//! assert!(std::rc::Rc::ptr_eq(&a, &b));
//! # Ok(())
//! # }
//! ```
//!
//! # Supported Formats
//!
//! | Format | Extensions | Notes |
//! |--------|------------|-------|
//! | STL    | `.stl`     | Binary and ASCII in, binary out |

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Cursor, Read, Seek};
use std::path::{Path, PathBuf};

use crate::gpu::{GeometryBackend, GpuContext};
use crate::math::Vector3f;
use crate::mesh::{Mesh, SharedMesh, Vertex, smooth_normals};

/// Errors that can occur when importing or exporting geometry.
#[derive(Debug)]
pub enum GeometryError {
    /// The file does not exist.
    NotFound(PathBuf),
    /// Reading or writing failed.
    Io(io::Error),
    /// No importer or exporter for this extension.
    UnknownFormat(String),
    /// The file was read but its contents are invalid.
    Parse(String),
    /// The file parsed but holds no triangles.
    EmptyScene,
}

impl std::fmt::Display for GeometryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeometryError::NotFound(path) => write!(f, "File not found: {}", path.display()),
            GeometryError::Io(e) => write!(f, "IO error: {e}"),
            GeometryError::UnknownFormat(ext) => write!(f, "Unknown geometry format: '{ext}'"),
            GeometryError::Parse(msg) => write!(f, "Parse error: {msg}"),
            GeometryError::EmptyScene => write!(f, "File contains no triangles"),
        }
    }
}

impl std::error::Error for GeometryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GeometryError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for GeometryError {
    fn from(e: io::Error) -> Self {
        GeometryError::Io(e)
    }
}

/// Lowercased extension of `path`, empty when there is none.
fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default()
}

/// Indexed triangle data read from a file, not yet on the GPU.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ImportedGeometry {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl ImportedGeometry {
    /// Reads `path`, choosing the importer from its extension.
    pub fn import(path: impl AsRef<Path>) -> Result<Self, GeometryError> {
        let path = path.as_ref();
        let ext = extension_of(path);
        if ext != "stl" {
            return Err(GeometryError::UnknownFormat(ext));
        }

        let file = File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => GeometryError::NotFound(path.to_path_buf()),
            _ => GeometryError::Io(e),
        })?;
        Self::from_stl_reader(&mut BufReader::new(file))
    }

    /// Parses STL data held in memory.
    pub fn from_stl_bytes(bytes: &[u8]) -> Result<Self, GeometryError> {
        Self::from_stl_reader(&mut Cursor::new(bytes))
    }

    pub fn from_stl_reader<R: Read + Seek>(reader: &mut R) -> Result<Self, GeometryError> {
        let stl = stl_io::read_stl(reader).map_err(|e| GeometryError::Parse(format!("STL: {e}")))?;
        if stl.faces.is_empty() {
            return Err(GeometryError::EmptyScene);
        }

        let vertices = stl
            .vertices
            .iter()
            .map(|v| {
                let position: [f32; 3] = (*v).into();
                Vertex::from_position(Vector3f::from(position))
            })
            .collect();
        let indices = stl
            .faces
            .iter()
            .flat_map(|face| face.vertices.map(|i| i as u32))
            .collect();

        let mut geometry = Self { vertices, indices };
        geometry.smooth_normals();
        Ok(geometry)
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Averages face normals into each vertex.
    pub fn smooth_normals(&mut self) {
        smooth_normals(&mut self.vertices, &self.indices);
    }

    /// Moves the data into an incomplete mesh.
    pub fn into_mesh<G: GeometryBackend>(self) -> Mesh<G> {
        let mut mesh = Mesh::new();
        mesh.set_vertices(self.vertices);
        mesh.set_indices(self.indices);
        mesh
    }
}

/// Writes the triangles of `mesh` to `path`, choosing the exporter from its
/// extension. Each triangle is written with its face normal.
pub fn export<G: GeometryBackend>(mesh: &Mesh<G>, path: impl AsRef<Path>) -> Result<(), GeometryError> {
    let path = path.as_ref();
    let ext = extension_of(path);
    if ext != "stl" {
        return Err(GeometryError::UnknownFormat(ext));
    }

    let mut writer = BufWriter::new(File::create(path)?);
    write_stl(mesh, &mut writer)?;
    log::info!("exported {} triangles to {}", mesh.triangle_count(), path.display());
    Ok(())
}

/// Writes binary STL for the triangles of `mesh`.
pub fn write_stl<G: GeometryBackend, W: io::Write>(mesh: &Mesh<G>, writer: &mut W) -> io::Result<()> {
    let triangles: Vec<stl_io::Triangle> = mesh
        .triangles()
        .map(|tri| stl_io::Triangle {
            normal: stl_io::Normal::new(tri.normal().to_array()),
            vertices: tri.positions().map(|p| stl_io::Vertex::new(p.to_array())),
        })
        .collect();
    stl_io::write_stl(writer, triangles.iter())
}

/// Completed meshes keyed by the path they were loaded from.
///
/// Owned by whoever needs sharing; there is no process-wide instance.
pub struct MeshCache<G: GeometryBackend = GpuContext> {
    meshes: HashMap<PathBuf, SharedMesh<G>>,
}

impl<G: GeometryBackend> Default for MeshCache<G> {
    fn default() -> Self {
        Self { meshes: HashMap::new() }
    }
}

impl<G: GeometryBackend> MeshCache<G> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: impl AsRef<Path>) -> Option<SharedMesh<G>> {
        self.meshes.get(path.as_ref()).cloned()
    }

    /// Stores `mesh` under `path`, returning the mesh it replaced.
    pub fn insert(&mut self, path: impl Into<PathBuf>, mesh: SharedMesh<G>) -> Option<SharedMesh<G>> {
        self.meshes.insert(path.into(), mesh)
    }

    /// Drops the cache's handle. Models holding the mesh keep it alive.
    pub fn evict(&mut self, path: impl AsRef<Path>) -> Option<SharedMesh<G>> {
        self.meshes.remove(path.as_ref())
    }

    pub fn clear(&mut self) {
        self.meshes.clear();
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    /// Returns the cached mesh for `path`, importing and completing it on a miss.
    pub fn load_or_insert(&mut self, path: impl AsRef<Path>, gpu: &G) -> Result<SharedMesh<G>, GeometryError> {
        let path = path.as_ref();
        if let Some(mesh) = self.get(path) {
            log::info!("loaded {} from mesh cache", path.display());
            return Ok(mesh);
        }

        let geometry = ImportedGeometry::import(path).inspect_err(|e| {
            log::warn!("failed to load {}: {e}", path.display());
        })?;
        let mut mesh: Mesh<G> = geometry.into_mesh();
        mesh.complete(gpu);
        log::info!("finished loading {} with {} vertices", path.display(), mesh.len());

        let mesh = mesh.into_shared();
        self.meshes.insert(path.to_path_buf(), mesh.clone());
        Ok(mesh)
    }
}
