//! Geometry data back to editable meshes.

use std::borrow::Cow;
use std::collections::{BTreeSet, HashMap};

use glam::Vec2;
use tracing::{debug, info};

use gmdc_core::{GeometryData, GmdcError, NodeQuery, Result, TransformTree};

use crate::bounding::{unpack_dynamic, unpack_static};
use crate::context::ImportContext;
use crate::options::ImportOptions;
use crate::unpacked::{ShapeKeyDeltas, SkinWeights, UnpackedGeometry, UnpackedMesh};

/// Longest vertex group name hosts accept.
pub const MAX_GROUP_NAME_LEN: usize = 30;

/// Group name used when a bone has no transform node.
pub const DEFAULT_BONE_NAME: &str = "bone";

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((at, _)) => &s[..at],
        None => s,
    }
}

/// `name#index`, cut to [`MAX_GROUP_NAME_LEN`] characters and
/// disambiguated with `.N` against `taken`.
pub fn unique_bone_name(name: &str, index: u32, taken: &[String]) -> String {
    let suffix = format!("#{}", index);
    let mut candidate = format!(
        "{}{}",
        truncate_chars(name, MAX_GROUP_NAME_LEN.saturating_sub(suffix.len())),
        suffix
    );
    let mut i = 1;
    while taken.contains(&candidate) {
        let tail = format!(".{}{}", i, suffix);
        candidate = format!(
            "{}{}",
            truncate_chars(name, MAX_GROUP_NAME_LEN.saturating_sub(tail.len())),
            tail
        );
        i += 1;
    }
    candidate
}

/// Name of the transform node carrying bone index `bone`.
pub(crate) fn bone_group_name(
    tree: Option<&TransformTree>,
    bone: u32,
    ctx: &mut ImportContext,
) -> String {
    let Some(tree) = tree else {
        return DEFAULT_BONE_NAME.to_string();
    };
    let node = i32::try_from(bone)
        .ok()
        .and_then(|b| tree.get_node(NodeQuery::BoneIndex(b)).ok());
    match node {
        Some(node) => node.name.clone(),
        None => {
            ctx.diagnostics.warn(format!(
                "No single transform node with bone index {}; using \"{}\"",
                bone, DEFAULT_BONE_NAME
            ));
            DEFAULT_BONE_NAME.to_string()
        }
    }
}

fn flip(uv: Vec2) -> Vec2 {
    Vec2::new(uv.x, 1.0 - uv.y)
}

/// Rebuilds index group `group_index` as a standalone mesh holding only
/// the vertices its triangles reference.
///
/// Triangles with index 0 in the last slot are rotated to the front and
/// degenerate triangles are dropped; both are reported in `ctx`.
pub fn unpack_index_group(
    geometry: &GeometryData,
    group_index: usize,
    tree: Option<&TransformTree>,
    ctx: &mut ImportContext,
) -> Result<UnpackedMesh> {
    unpack_group(geometry, group_index, None, tree, ctx)
}

/// Host UVs of every triangle corner, per index group.
fn corner_uvs(geometry: &GeometryData) -> Result<Vec<Vec<[Vec2; 3]>>> {
    geometry.validate()?;
    Ok(geometry
        .index_groups
        .iter()
        .map(|group| {
            let data = &geometry.data_groups[group.data_group_index];
            group
                .indices
                .iter()
                .map(|tri| tri.map(|v| flip(data.tex_coords[v as usize])))
                .collect()
        })
        .collect())
}

/// `uvs` overrides the UVs read from the data group, one triple per
/// triangle of the index group.
fn unpack_group(
    geometry: &GeometryData,
    group_index: usize,
    uvs: Option<&[[Vec2; 3]]>,
    tree: Option<&TransformTree>,
    ctx: &mut ImportContext,
) -> Result<UnpackedMesh> {
    let group = geometry.index_groups.get(group_index).ok_or_else(|| {
        GmdcError::reference(format!("index group #{} does not exist", group_index))
    })?;
    let data = geometry
        .data_groups
        .get(group.data_group_index)
        .ok_or_else(|| {
            GmdcError::reference(format!(
                "index group \"{}\" references missing data group #{}",
                group.name, group.data_group_index
            ))
        })?;
    geometry.validate()?;
    if let Some(uvs) = uvs {
        if uvs.len() != group.indices.len() {
            return Err(GmdcError::invalid_parameter(format!(
                "{} corner UV triples for {} triangles of \"{}\"",
                uvs.len(),
                group.indices.len(),
                group.name
            )));
        }
    }
    info!("Unpacking index group \"{}\"", group.name);

    let used: BTreeSet<u32> = group.indices.iter().flatten().copied().collect();
    let remap: HashMap<u32, u32> = used
        .iter()
        .enumerate()
        .map(|(i, &v)| (v, i as u32))
        .collect();
    let source: Vec<usize> = used.iter().map(|&v| v as usize).collect();

    let positions: Vec<_> = source.iter().map(|&v| data.vertices[v]).collect();
    let normals: Vec<_> = source.iter().map(|&v| data.normals[v]).collect();

    let mut triangles = Vec::with_capacity(group.indices.len());
    let mut triangle_uvs = Vec::with_capacity(group.indices.len());
    for (t, tri) in group.indices.iter().enumerate() {
        let mut local = tri.map(|v| remap[&v]);
        let mut uv = match uvs {
            Some(uvs) => uvs[t],
            None => tri.map(|v| flip(data.tex_coords[v as usize])),
        };
        if local[2] == 0 {
            let before = local;
            local = [local[2], local[0], local[1]];
            uv = [uv[2], uv[0], uv[1]];
            ctx.diagnostics.info(format!(
                "Triangle #{} of \"{}\" reordered: {:?} -> {:?}",
                t, group.name, before, local
            ));
        }
        if local[0] == local[1] || local[1] == local[2] || local[0] == local[2] {
            ctx.diagnostics.warn(format!(
                "Triangle #{} of \"{}\" {:?} removed",
                t, group.name, local
            ));
            continue;
        }
        triangles.push(local);
        triangle_uvs.push(uv);
    }

    let skin = if data.has_skin() {
        let mut groups: Vec<String> = Vec::with_capacity(group.bone_index_map.len());
        for &bone in &group.bone_index_map {
            let name = bone_group_name(tree, bone, ctx);
            let name = unique_bone_name(&name, bone, &groups);
            groups.push(name);
        }
        let vertices = source
            .iter()
            .map(|&v| {
                data.bones[v]
                    .iter()
                    .zip(data.vertex_weights(v))
                    .map(|(&slot, weight)| {
                        if slot as usize >= groups.len() {
                            return Err(GmdcError::reference(format!(
                                "vertex #{} of \"{}\" uses bone slot {} but the group maps {} bones",
                                v,
                                group.name,
                                slot,
                                groups.len()
                            )));
                        }
                        Ok((slot as usize, weight))
                    })
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;
        Some(SkinWeights { groups, vertices })
    } else {
        None
    };

    let mut shape_keys = Vec::new();
    if data.has_morphs() {
        for (m, morph_name) in geometry.morph_names.iter().enumerate() {
            let hits: Vec<(usize, usize)> = source
                .iter()
                .enumerate()
                .filter_map(|(i, &v)| {
                    data.morph_keys[v]
                        .iter()
                        .position(|&k| k as usize == m)
                        .map(|slot| (i, slot))
                })
                .collect();
            if hits.is_empty() {
                continue;
            }
            let mut key_positions = positions.clone();
            let mut key_normals = data.has_delta_normals().then(|| normals.clone());
            for &(i, slot) in &hits {
                let v = source[i];
                key_positions[i] += data.delta_vertices[v][slot];
                if let Some(n) = key_normals.as_mut() {
                    n[i] += data.delta_normals[v][slot];
                }
            }
            debug!("Shape key \"{}\": {} vertices", morph_name, hits.len());
            shape_keys.push(ShapeKeyDeltas {
                name: morph_name.to_string(),
                positions: key_positions,
                normals: key_normals,
            });
        }
    }

    Ok(UnpackedMesh {
        name: group.name.clone(),
        flags: group.flags,
        positions,
        normals,
        triangles,
        uvs: triangle_uvs,
        skin,
        shape_keys,
    })
}

/// Rebuilds every index group, and the bounding shapes when requested.
///
/// With remove doubles on, vertices that differ only in UV or normal are
/// merged; each triangle corner keeps the UV it had before the merge.
pub fn unpack(
    geometry: &GeometryData,
    tree: Option<&TransformTree>,
    options: &ImportOptions,
    ctx: &mut ImportContext,
) -> Result<UnpackedGeometry> {
    let (geometry, uvs) = if options.remove_doubles() {
        let uvs = corner_uvs(geometry)?;
        let mut merged = geometry.clone();
        let removed = merged.remove_doubles();
        ctx.diagnostics
            .info(format!("Removed {} duplicate vertices", removed));
        (Cow::Owned(merged), Some(uvs))
    } else {
        (Cow::Borrowed(geometry), None)
    };

    let meshes = (0..geometry.index_groups.len())
        .map(|i| {
            let group_uvs = uvs.as_ref().map(|uvs| uvs[i].as_slice());
            unpack_group(&geometry, i, group_uvs, tree, ctx)
        })
        .collect::<Result<Vec<_>>>()?;

    let mut unpacked = UnpackedGeometry {
        meshes,
        inverse_transforms: geometry.inverse_transforms.clone(),
        ..Default::default()
    };
    if options.import_bounding_mesh() {
        unpacked.bounding_mesh = geometry.static_bounding_mesh.as_ref().map(unpack_static);
        if let Some(parts) = &geometry.dynamic_bounding_mesh {
            unpacked.dynamic_bounding_mesh = unpack_dynamic(
                parts,
                geometry.inverse_transforms.as_deref(),
                tree,
                ctx,
            )?;
        }
    }
    Ok(unpacked)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_bone_name() {
        assert_eq!(unique_bone_name("spine", 3, &[]), "spine#3");
        let taken = vec!["spine#3".to_string()];
        assert_eq!(unique_bone_name("spine", 3, &taken), "spine.1#3");
        let taken = vec!["spine#3".to_string(), "spine.1#3".to_string()];
        assert_eq!(unique_bone_name("spine", 3, &taken), "spine.2#3");
    }

    #[test]
    fn test_unique_bone_name_truncates() {
        let long = "a".repeat(40);
        let name = unique_bone_name(&long, 12, &[]);
        assert_eq!(name.len(), MAX_GROUP_NAME_LEN);
        assert!(name.ends_with("#12"));
        let again = unique_bone_name(&long, 12, &[name]);
        assert_eq!(again.len(), MAX_GROUP_NAME_LEN);
        assert!(again.ends_with(".1#12"));
    }

    #[test]
    fn test_missing_bone_falls_back() {
        let mut ctx = ImportContext::new();
        assert_eq!(bone_group_name(None, 4, &mut ctx), "bone");
        assert!(ctx.diagnostics.is_empty());
        let tree = TransformTree::default();
        assert_eq!(bone_group_name(Some(&tree), 4, &mut ctx), "bone");
        assert_eq!(ctx.diagnostics.warnings().count(), 1);
    }
}
