//! Editable mesh description handed to the pack pipeline.
//!
//! Vertices are shared between faces; attributes that vary per corner (UV,
//! tangents) live on the faces.

use glam::{Vec2, Vec3};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SourceVertex {
    pub position: Vec3,
    pub normal: Vec3,
    /// Vertex group memberships as `(group name, weight)`.
    pub groups: Vec<(String, f32)>,
}

impl SourceVertex {
    pub fn new(position: Vec3, normal: Vec3) -> Self {
        Self {
            position,
            normal,
            groups: Vec::new(),
        }
    }

    pub fn with_group(mut self, name: impl Into<String>, weight: f32) -> Self {
        self.groups.push((name.into(), weight));
        self
    }
}

/// A triangle or quad over the mesh's vertices.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFace {
    pub corners: Vec<u32>,
    /// One texture coordinate per corner, in the host's convention (v up).
    pub uv: Option<Vec<Vec2>>,
    /// Smooth faces use per-vertex normals, flat faces `normal`.
    pub smooth: bool,
    pub normal: Vec3,
    pub tangents: Option<Vec<Vec3>>,
    pub selected: bool,
}

impl SourceFace {
    /// A smooth, selected face with texture coordinates.
    pub fn new(corners: Vec<u32>, uv: Vec<Vec2>) -> Self {
        Self {
            corners,
            uv: Some(uv),
            smooth: true,
            normal: Vec3::ZERO,
            tangents: None,
            selected: true,
        }
    }

    pub fn flat(mut self, normal: Vec3) -> Self {
        self.smooth = false;
        self.normal = normal;
        self
    }
}

/// Absolute vertex positions of one shape key.
///
/// `face_normals` is indexed like the mesh's face list, including faces
/// later filtered out by selection.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShapeKey {
    pub name: String,
    pub positions: Vec<Vec3>,
    pub vertex_normals: Vec<Vec3>,
    pub face_normals: Vec<Vec3>,
}

/// Per-object properties consulted when property use is enabled.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeshProperties {
    pub name: Option<String>,
    pub flags: Option<u32>,
    pub selected_only: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SourceMesh {
    pub name: String,
    /// Object location, added to every vertex position.
    pub origin: Vec3,
    pub vertices: Vec<SourceVertex>,
    pub faces: Vec<SourceFace>,
    /// Shape keys, not including the basis.
    pub shape_keys: Vec<ShapeKey>,
    pub properties: MeshProperties,
}

impl SourceMesh {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Indices of the vertices in group `name` with a positive weight.
    pub fn group_members(&self, name: &str) -> Vec<u32> {
        self.vertices
            .iter()
            .enumerate()
            .filter(|(_, v)| v.groups.iter().any(|(g, w)| g == name && *w > 0.0))
            .map(|(i, _)| i as u32)
            .collect()
    }
}
