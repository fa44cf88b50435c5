//! GMDC I/O library: mesh interchange for the geometry pipeline.
//!
//! | Format | Read | Write |
//! |--------|------|-------|
//! | OBJ    | ✓    | ✓     |
//!
//! Readers implement [`Reader`] and return [`gmdc_mesh::SourceMesh`]es;
//! writers implement [`Writer`] and accept [`gmdc_mesh::UnpackedMesh`]es.
//!
//! ```ignore
//! use gmdc_io::{ObjReader, Reader};
//! use gmdc_mesh::{pack, ExportContext, ExportOptions};
//!
//! let meshes = ObjReader::open("body.obj")?.read_meshes()?;
//! let geometry = pack(&meshes, None, None, &ExportOptions::new(), &mut ExportContext::new())?;
//! ```

pub mod obj_reader;
pub mod obj_writer;
pub mod traits;

pub use obj_reader::{parse_obj, shape_key_from_mesh, ObjReader};
pub use obj_writer::ObjWriter;
pub use traits::{Reader, Writer};
