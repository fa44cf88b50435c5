//! Common traits for mesh readers and writers.
//!
//! Readers produce [`SourceMesh`]es ready for [`gmdc_mesh::pack()`];
//! writers consume the [`UnpackedMesh`]es [`gmdc_mesh::unpack()`] returns.
//!
//! ```ignore
//! use gmdc_io::{ObjReader, ObjWriter, Reader, Writer};
//!
//! let meshes = ObjReader::open("body.obj")?.read_meshes()?;
//! let mut writer = ObjWriter::new();
//! writer.add_mesh(&unpacked, Some("body"))?;
//! writer.write("body_out.obj")?;
//! ```

use std::io;
use std::path::Path;

use gmdc_mesh::{SourceMesh, UnpackedMesh};

/// Common interface for mesh writers.
///
/// ```ignore
/// fn save<W: Writer>(mut writer: W, mesh: &UnpackedMesh) -> io::Result<()> {
///     writer.add_mesh(mesh, None)?;
///     writer.write("output.ext")
/// }
/// ```
pub trait Writer: Sized {
    fn new() -> Self;

    /// Queue a mesh. `name` overrides the mesh's own name.
    fn add_mesh(&mut self, mesh: &UnpackedMesh, name: Option<&str>) -> io::Result<()>;

    /// Write every queued mesh to `path`.
    fn write<P: AsRef<Path>>(&self, path: P) -> io::Result<()>;

    fn vertex_count(&self) -> usize;

    fn face_count(&self) -> usize {
        0
    }
}

/// Common interface for mesh readers.
pub trait Reader: Sized {
    fn open<P: AsRef<Path>>(path: P) -> io::Result<Self>;

    /// Read every object in the file.
    fn read_meshes(&mut self) -> io::Result<Vec<SourceMesh>>;

    /// Read the first object in the file.
    fn read_mesh(&mut self) -> io::Result<SourceMesh> {
        let meshes = self.read_meshes()?;
        if let Some(m) = meshes.into_iter().next() {
            Ok(m)
        } else {
            Err(io::Error::new(io::ErrorKind::InvalidData, "No mesh found"))
        }
    }
}
