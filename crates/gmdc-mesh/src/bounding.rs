//! Bounding shapes: building them from a shape mesh and turning them back
//! into host meshes.

use std::collections::{BTreeSet, HashMap};

use glam::Vec3;
use tracing::debug;

use gmdc_core::{BoundingMesh, GmdcError, NodeQuery, Result, Transform, TransformTree};

use crate::context::ImportContext;
use crate::source::SourceMesh;
use crate::unpack::{bone_group_name, unique_bone_name};
use crate::unpacked::{UnpackedBoundingMesh, VertexGroup};

const TRIANGLE_A: u32 = 0b0111;
const TRIANGLE_B: u32 = 0b1101;

fn check_face(shape: &SourceMesh, face: usize, corners: &[u32]) -> Result<()> {
    if corners.len() != 3 && corners.len() != 4 {
        return Err(GmdcError::invalid_geometry(format!(
            "face #{} of shape mesh \"{}\" has {} corners",
            face,
            shape.name,
            corners.len()
        )));
    }
    if let Some(&c) = corners.iter().find(|&&c| c as usize >= shape.vertices.len()) {
        return Err(GmdcError::invalid_geometry(format!(
            "face #{} of shape mesh \"{}\" references missing vertex {}",
            face, shape.name, c
        )));
    }
    Ok(())
}

/// Whole shape mesh in object space, quads split along the `0-2` diagonal.
pub(crate) fn static_bounding_mesh(shape: &SourceMesh) -> Result<BoundingMesh> {
    let vertices = shape
        .vertices
        .iter()
        .map(|v| v.position + shape.origin)
        .collect();
    let mut triangles = Vec::with_capacity(shape.faces.len() * 2);
    for (f, face) in shape.faces.iter().enumerate() {
        check_face(shape, f, &face.corners)?;
        let c = &face.corners;
        triangles.push([c[0], c[1], c[2]]);
        if c.len() == 4 {
            triangles.push([c[0], c[2], c[3]]);
        }
    }
    Ok(BoundingMesh {
        vertices,
        triangles,
    })
}

/// One part per bone index `0..=max`, made of the faces fully inside the
/// vertex group named after the bone, in bone space.
///
/// Returns `None` when no part has a triangle.
pub(crate) fn dynamic_bounding_mesh(
    shape: &SourceMesh,
    tree: &TransformTree,
) -> Result<Option<Vec<Option<BoundingMesh>>>> {
    let Some(max) = tree.max_bone_index() else {
        return Ok(None);
    };
    for (f, face) in shape.faces.iter().enumerate() {
        check_face(shape, f, &face.corners)?;
    }

    let mut parts = Vec::with_capacity(max as usize + 1);
    for k in 0..=max {
        let node = match tree.get_node(NodeQuery::BoneIndex(k)) {
            Ok(node) => node,
            Err(GmdcError::NotFound(_)) => {
                parts.push(None);
                continue;
            }
            Err(e) => return Err(e),
        };
        let members: BTreeSet<u32> = shape.group_members(&node.name).into_iter().collect();
        if members.is_empty() {
            parts.push(None);
            continue;
        }

        let mut accepted = Vec::new();
        for face in &shape.faces {
            let mask = face
                .corners
                .iter()
                .enumerate()
                .filter(|(_, c)| members.contains(*c))
                .fold(0u32, |m, (i, _)| m | (1 << i));
            let c = &face.corners;
            if mask & TRIANGLE_A == TRIANGLE_A {
                accepted.push([c[0], c[1], c[2]]);
            }
            if c.len() == 4 && mask & TRIANGLE_B == TRIANGLE_B {
                accepted.push([c[0], c[2], c[3]]);
            }
        }
        if accepted.is_empty() {
            parts.push(None);
            continue;
        }

        let to_bone = node.absolute().inverse();
        let mut remap: HashMap<u32, u32> = HashMap::new();
        let mut vertices = Vec::new();
        let triangles: Vec<[u32; 3]> = accepted
            .iter()
            .map(|tri| {
                tri.map(|v| {
                    *remap.entry(v).or_insert_with(|| {
                        let co = shape.vertices[v as usize].position + shape.origin;
                        vertices.push(to_bone.transform_point(co));
                        (vertices.len() - 1) as u32
                    })
                })
            })
            .collect();
        debug!(
            "Bounding part for bone {} \"{}\": {} vertices",
            k,
            node.name,
            vertices.len()
        );
        parts.push(Some(BoundingMesh {
            vertices,
            triangles,
        }));
    }

    if parts.iter().all(Option::is_none) {
        return Ok(None);
    }
    Ok(Some(parts))
}

pub(crate) fn unpack_static(mesh: &BoundingMesh) -> UnpackedBoundingMesh {
    UnpackedBoundingMesh {
        positions: mesh.vertices.clone(),
        triangles: mesh.triangles.clone(),
        groups: Vec::new(),
    }
}

/// Merges the present parts into one object-space mesh with one vertex
/// group per part.
pub(crate) fn unpack_dynamic(
    parts: &[Option<BoundingMesh>],
    inverse_transforms: Option<&[Transform]>,
    tree: Option<&TransformTree>,
    ctx: &mut ImportContext,
) -> Result<Option<UnpackedBoundingMesh>> {
    let mut merged = UnpackedBoundingMesh::default();
    for (k, part) in parts.iter().enumerate() {
        let Some(part) = part else {
            continue;
        };
        let inverse = inverse_transforms
            .and_then(|t| t.get(k))
            .ok_or_else(|| {
                GmdcError::reference(format!(
                    "bounding part {} has no inverse transform",
                    k
                ))
            })?;
        let to_object = inverse.inverse();

        let used: BTreeSet<u32> = part.triangles.iter().flatten().copied().collect();
        let base = merged.positions.len() as u32;
        let mut remap = HashMap::with_capacity(used.len());
        for (i, &v) in used.iter().enumerate() {
            let co: Vec3 = *part.vertices.get(v as usize).ok_or_else(|| {
                GmdcError::reference(format!(
                    "bounding part {} references missing vertex {}",
                    k, v
                ))
            })?;
            remap.insert(v, base + i as u32);
            merged.positions.push(to_object.transform_point(co));
        }
        merged
            .triangles
            .extend(part.triangles.iter().map(|tri| tri.map(|v| remap[&v])));

        let taken: Vec<String> = merged.groups.iter().map(|g| g.name.clone()).collect();
        let name = unique_bone_name(&bone_group_name(tree, k as u32, ctx), k as u32, &taken);
        merged.groups.push(VertexGroup {
            name,
            vertices: (base..base + used.len() as u32).collect(),
        });
    }
    if merged.groups.is_empty() {
        return Ok(None);
    }
    Ok(Some(merged))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{SourceFace, SourceVertex};
    use glam::{Quat, Vec2};

    fn quad_shape() -> SourceMesh {
        let mut shape = SourceMesh::new("shape");
        shape.origin = Vec3::new(0.0, 0.0, 1.0);
        shape.vertices = vec![
            SourceVertex::new(Vec3::ZERO, Vec3::Z).with_group("spine", 1.0),
            SourceVertex::new(Vec3::X, Vec3::Z).with_group("spine", 0.5),
            SourceVertex::new(Vec3::new(1.0, 1.0, 0.0), Vec3::Z).with_group("spine", 1.0),
            SourceVertex::new(Vec3::Y, Vec3::Z).with_group("spine", 0.0),
        ];
        shape.faces = vec![SourceFace::new(vec![0, 1, 2, 3], vec![Vec2::ZERO; 4])];
        shape
    }

    #[test]
    fn test_static_splits_quads() {
        let mesh = static_bounding_mesh(&quad_shape()).unwrap();
        assert_eq!(mesh.triangles, vec![[0, 1, 2], [0, 2, 3]]);
        assert_eq!(mesh.vertices[1], Vec3::new(1.0, 0.0, 1.0));
    }

    #[test]
    fn test_unpack_dynamic_needs_inverse_transform() {
        let part = BoundingMesh {
            vertices: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            triangles: vec![[0, 1, 2]],
        };
        let mut ctx = ImportContext::new();
        let parts = [None, Some(part)];
        let only_first = [Transform::IDENTITY];
        let result = unpack_dynamic(&parts, Some(&only_first[..]), None, &mut ctx);
        assert!(matches!(result, Err(GmdcError::Reference(_))));

        let moved = Transform::new(Vec3::new(0.0, -2.0, 0.0), Quat::IDENTITY);
        let both = [Transform::IDENTITY, moved];
        let mesh = unpack_dynamic(&parts, Some(&both[..]), None, &mut ctx)
            .unwrap()
            .unwrap();
        assert_eq!(mesh.positions[0], Vec3::new(0.0, 2.0, 0.0));
        assert_eq!(mesh.groups[0].name, "bone#1");
        assert_eq!(mesh.groups[0].vertices, vec![0, 1, 2]);
    }
}
