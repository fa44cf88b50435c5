//! GMDC Mesh Library
//!
//! Converts between editable meshes (shared vertices, faces with per-corner
//! UVs, vertex groups, shape keys) and the vertex-streaming geometry data
//! stored in geometry data containers.
//!
//! - [`pack()`] builds [`gmdc_core::GeometryData`] from [`SourceMesh`]es.
//! - [`unpack()`] and [`unpack_index_group()`] rebuild [`UnpackedMesh`]es.

mod bounding;
pub mod context;
mod morph;
pub mod options;
pub mod pack;
pub mod source;
pub mod unpack;
pub mod unpacked;

pub use context::{Diagnostic, DiagnosticLevel, Diagnostics, ExportContext, ImportContext};
pub use options::{ExportOptions, ImportOptions, MorphExport};
pub use pack::pack;
pub use source::{MeshProperties, ShapeKey, SourceFace, SourceMesh, SourceVertex};
pub use unpack::{unique_bone_name, unpack, unpack_index_group};
pub use unpacked::{
    ShapeKeyDeltas, SkinWeights, UnpackedBoundingMesh, UnpackedGeometry, UnpackedMesh,
    VertexGroup,
};
