//! Reconstructed mesh description produced by the unpack pipeline.

use glam::{Vec2, Vec3};

use gmdc_core::Transform;

/// Named vertex groups with per-vertex memberships.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SkinWeights {
    pub groups: Vec<String>,
    /// `(group index, weight)` pairs of every vertex.
    pub vertices: Vec<Vec<(usize, f32)>>,
}

impl SkinWeights {
    /// Members of group `group` with their weights.
    pub fn members(&self, group: usize) -> Vec<(u32, f32)> {
        self.vertices
            .iter()
            .enumerate()
            .flat_map(|(v, influences)| {
                influences
                    .iter()
                    .filter(move |(g, _)| *g == group)
                    .map(move |&(_, w)| (v as u32, w))
            })
            .collect()
    }
}

/// A shape key as derived vertex positions (and normals when the group
/// stores normal deltas).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShapeKeyDeltas {
    pub name: String,
    pub positions: Vec<Vec3>,
    pub normals: Option<Vec<Vec3>>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct UnpackedMesh {
    pub name: String,
    pub flags: u32,
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub triangles: Vec<[u32; 3]>,
    /// One UV triple per triangle, in the host's convention (v up).
    pub uvs: Vec<[Vec2; 3]>,
    pub skin: Option<SkinWeights>,
    pub shape_keys: Vec<ShapeKeyDeltas>,
}

impl UnpackedMesh {
    /// Object property text for the flags, as eight hex digits.
    pub fn flags_property(&self) -> String {
        format!("{:08X}", self.flags)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct VertexGroup {
    pub name: String,
    pub vertices: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct UnpackedBoundingMesh {
    pub positions: Vec<Vec3>,
    pub triangles: Vec<[u32; 3]>,
    /// One group per bone part; empty for a static shape.
    pub groups: Vec<VertexGroup>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct UnpackedGeometry {
    pub meshes: Vec<UnpackedMesh>,
    /// Static bounding shape.
    pub bounding_mesh: Option<UnpackedBoundingMesh>,
    /// Per-bone bounding parts merged into object space.
    pub dynamic_bounding_mesh: Option<UnpackedBoundingMesh>,
    pub inverse_transforms: Option<Vec<Transform>>,
}
