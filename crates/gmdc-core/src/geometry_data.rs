//! In-memory model of a geometry data container.
//!
//! Vertex data lives in columnar [`DataGroup`] pools; [`IndexGroup`]s are
//! named triangle lists over one pool. Morph targets are referenced by
//! position in the shared [`GeometryData::morph_names`] registry.

use std::collections::HashMap;
use std::fmt;

use glam::{Vec2, Vec3};
use tracing::debug;

use crate::status::{GmdcError, Result};
use crate::transform::Transform;

/// Maximum number of bones influencing one vertex.
pub const MAX_BONE_INFLUENCES: usize = 4;

/// Maximum number of morph targets affecting one vertex.
pub const MAX_MORPH_INFLUENCES: usize = 4;

/// Flags written for index groups that do not specify their own.
pub const DEFAULT_INDEX_GROUP_FLAGS: u32 = 0xFFFF_FFFF;

/// Separator between the segments of a morph name.
pub const MORPH_NAME_SEPARATOR: &str = "::";

/// Bit pattern of a float for equality and hashing, with `-0.0` folded
/// into `0.0`.
pub fn float_key(value: f32) -> u32 {
    (value + 0.0).to_bits()
}

pub fn vec3_key(value: Vec3) -> [u32; 3] {
    [float_key(value.x), float_key(value.y), float_key(value.z)]
}

pub fn vec2_key(value: Vec2) -> [u32; 2] {
    [float_key(value.x), float_key(value.y)]
}

/// Number of weights stored for a vertex with `bone_count` bones. The
/// fourth weight is implied by the other three.
pub fn stored_weight_count(bone_count: usize) -> usize {
    if bone_count >= MAX_BONE_INFLUENCES {
        MAX_BONE_INFLUENCES - 1
    } else {
        bone_count
    }
}

/// Dotted morph identity such as `expression::smile`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct MorphName(pub Vec<String>);

impl MorphName {
    /// Splits a shape key name on `::`.
    pub fn parse(name: &str) -> Self {
        MorphName(name.split(MORPH_NAME_SEPARATOR).map(str::to_string).collect())
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for MorphName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(MORPH_NAME_SEPARATOR))
    }
}

/// Columnar vertex pool.
///
/// `vertices`, `normals` and `tex_coords` always hold one entry per vertex.
/// The skin (`bones`, `weights`), `tangents` and morph (`morph_keys`,
/// `delta_vertices`, `delta_normals`) columns are either empty or hold one
/// entry per vertex.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataGroup {
    pub vertices: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub tex_coords: Vec<Vec2>,
    pub bones: Vec<Vec<u8>>,
    pub weights: Vec<Vec<f32>>,
    pub tangents: Vec<Vec3>,
    pub morph_keys: Vec<Vec<u32>>,
    pub delta_vertices: Vec<Vec<Vec3>>,
    pub delta_normals: Vec<Vec<Vec3>>,
    pub morph_width: usize,
}

impl DataGroup {
    pub fn count(&self) -> usize {
        self.vertices.len()
    }

    pub fn has_skin(&self) -> bool {
        !self.bones.is_empty()
    }

    pub fn has_tangents(&self) -> bool {
        !self.tangents.is_empty()
    }

    pub fn has_morphs(&self) -> bool {
        self.morph_width > 0
    }

    pub fn has_delta_normals(&self) -> bool {
        !self.delta_normals.is_empty()
    }

    /// Full weight list of vertex `i`, with the implied fourth weight.
    pub fn vertex_weights(&self, i: usize) -> Vec<f32> {
        let bones = &self.bones[i];
        let mut weights = self.weights[i].clone();
        if bones.len() == MAX_BONE_INFLUENCES && weights.len() == MAX_BONE_INFLUENCES - 1 {
            let sum: f32 = weights.iter().sum();
            weights.push(1.0 - sum);
        }
        weights
    }

    pub fn validate(&self) -> Result<()> {
        let n = self.count();
        let check_len = |what: &str, len: usize, optional: bool| -> Result<()> {
            if len == n || (optional && len == 0) {
                Ok(())
            } else {
                Err(GmdcError::invalid_geometry(format!(
                    "{} has {} entries for {} vertices",
                    what, len, n
                )))
            }
        };
        check_len("normal array", self.normals.len(), false)?;
        check_len("texture coordinate array", self.tex_coords.len(), false)?;
        check_len("bone array", self.bones.len(), true)?;
        check_len("weight array", self.weights.len(), !self.has_skin())?;
        check_len("tangent array", self.tangents.len(), true)?;

        for (i, (bones, weights)) in self.bones.iter().zip(&self.weights).enumerate() {
            if bones.len() > MAX_BONE_INFLUENCES {
                return Err(GmdcError::invalid_geometry(format!(
                    "vertex #{} has {} bones",
                    i,
                    bones.len()
                )));
            }
            if weights.len() != stored_weight_count(bones.len()) {
                return Err(GmdcError::invalid_geometry(format!(
                    "vertex #{} has {} bones but {} stored weights",
                    i,
                    bones.len(),
                    weights.len()
                )));
            }
        }

        if !self.has_morphs() {
            if !self.morph_keys.is_empty()
                || !self.delta_vertices.is_empty()
                || !self.delta_normals.is_empty()
            {
                return Err(GmdcError::invalid_geometry(
                    "morph data present with a morph width of 0",
                ));
            }
            return Ok(());
        }

        check_len("morph key array", self.morph_keys.len(), false)?;
        check_len("delta vertex array", self.delta_vertices.len(), false)?;
        check_len("delta normal array", self.delta_normals.len(), true)?;
        for (i, keys) in self.morph_keys.iter().enumerate() {
            if keys.len() > MAX_MORPH_INFLUENCES || keys.len() > self.morph_width {
                return Err(GmdcError::invalid_geometry(format!(
                    "vertex #{} has {} morph keys (width {})",
                    i,
                    keys.len(),
                    self.morph_width
                )));
            }
        }
        let widths = self
            .delta_vertices
            .iter()
            .chain(&self.delta_normals)
            .map(Vec::len);
        for (i, width) in widths.enumerate() {
            if width != self.morph_width {
                return Err(GmdcError::invalid_geometry(format!(
                    "vertex #{} stores {} deltas instead of {}",
                    i % n.max(1),
                    width,
                    self.morph_width
                )));
            }
        }
        Ok(())
    }
}

/// Named triangle list over one data group.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexGroup {
    pub name: String,
    pub data_group_index: usize,
    pub indices: Vec<[u32; 3]>,
    pub flags: u32,
    /// Global bone index of every local bone slot, by local index.
    pub bone_index_map: Vec<u32>,
}

impl IndexGroup {
    pub fn new(name: impl Into<String>, data_group_index: usize) -> Self {
        Self {
            name: name.into(),
            data_group_index,
            indices: Vec::new(),
            flags: DEFAULT_INDEX_GROUP_FLAGS,
            bone_index_map: Vec::new(),
        }
    }
}

/// Simple triangle mesh used for collision and selection shapes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BoundingMesh {
    pub vertices: Vec<Vec3>,
    pub triangles: Vec<[u32; 3]>,
}

impl BoundingMesh {
    pub fn validate(&self) -> Result<()> {
        let n = self.vertices.len();
        for (t, tri) in self.triangles.iter().enumerate() {
            if tri.iter().any(|&i| i as usize >= n) {
                return Err(GmdcError::invalid_geometry(format!(
                    "bounding triangle #{} {:?} references a missing vertex (count {})",
                    t, tri, n
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct GeometryData {
    pub data_groups: Vec<DataGroup>,
    pub index_groups: Vec<IndexGroup>,
    /// Inverse bind transforms, indexed by bone index.
    pub inverse_transforms: Option<Vec<Transform>>,
    pub morph_names: Vec<MorphName>,
    pub static_bounding_mesh: Option<BoundingMesh>,
    /// Per-bone bounding parts, indexed by bone index.
    pub dynamic_bounding_mesh: Option<Vec<Option<BoundingMesh>>>,
}

impl GeometryData {
    /// Checks the cross references between groups, registry and bounding
    /// shapes, and every data group's own invariants.
    pub fn validate(&self) -> Result<()> {
        for (g, group) in self.data_groups.iter().enumerate() {
            group.validate().map_err(|e| match e {
                GmdcError::InvalidGeometry(msg) => {
                    GmdcError::invalid_geometry(format!("data group #{}: {}", g, msg))
                }
                other => other,
            })?;
            for keys in &group.morph_keys {
                if let Some(&k) = keys.iter().find(|&&k| k as usize >= self.morph_names.len()) {
                    return Err(GmdcError::invalid_geometry(format!(
                        "data group #{} references morph #{} but only {} are registered",
                        g,
                        k,
                        self.morph_names.len()
                    )));
                }
            }
        }

        for group in &self.index_groups {
            let data = self.data_groups.get(group.data_group_index).ok_or_else(|| {
                GmdcError::invalid_geometry(format!(
                    "index group \"{}\" references missing data group #{}",
                    group.name, group.data_group_index
                ))
            })?;
            let n = data.count();
            if let Some(tri) = group
                .indices
                .iter()
                .find(|tri| tri.iter().any(|&i| i as usize >= n))
            {
                return Err(GmdcError::invalid_geometry(format!(
                    "index group \"{}\" triangle {:?} is out of range (count {})",
                    group.name, tri, n
                )));
            }
        }

        if let Some(mesh) = &self.static_bounding_mesh {
            mesh.validate()?;
        }
        if let Some(parts) = &self.dynamic_bounding_mesh {
            for part in parts.iter().flatten() {
                part.validate()?;
            }
        }
        Ok(())
    }

    /// Merges vertices of each data group that agree in position, skin and
    /// morph data, keeping the first occurrence's normal, UV and tangent.
    /// Index groups are rewritten to the merged vertices. Returns the
    /// number of removed vertices.
    ///
    /// UVs of merged corners are lost; read them from the index groups
    /// before merging to keep UV seams.
    pub fn remove_doubles(&mut self) -> usize {
        let mut removed = 0;
        for (g, group) in self.data_groups.iter_mut().enumerate() {
            let remap = merge_group_doubles(group);
            let merged = remap.len() - group.count();
            if merged == 0 {
                continue;
            }
            debug!("Data group #{}: merged {} duplicate vertices", g, merged);
            removed += merged;
            for index_group in self
                .index_groups
                .iter_mut()
                .filter(|ig| ig.data_group_index == g)
            {
                for tri in &mut index_group.indices {
                    for i in tri.iter_mut() {
                        *i = remap[*i as usize];
                    }
                }
            }
        }
        removed
    }
}

#[derive(PartialEq, Eq, Hash)]
struct MergeKey {
    position: [u32; 3],
    bones: Vec<u8>,
    weights: Vec<u32>,
    morph_keys: Vec<u32>,
    deltas: Vec<[u32; 3]>,
}

/// Compacts `group` in place and returns the old-to-new index map.
fn merge_group_doubles(group: &mut DataGroup) -> Vec<u32> {
    let n = group.count();
    let mut seen: HashMap<MergeKey, u32> = HashMap::with_capacity(n);
    let mut remap = Vec::with_capacity(n);
    let mut keep = Vec::with_capacity(n);
    for i in 0..n {
        let key = MergeKey {
            position: vec3_key(group.vertices[i]),
            bones: group.bones.get(i).cloned().unwrap_or_default(),
            weights: group
                .weights
                .get(i)
                .map(|w| w.iter().copied().map(float_key).collect())
                .unwrap_or_default(),
            morph_keys: group.morph_keys.get(i).cloned().unwrap_or_default(),
            deltas: group
                .delta_vertices
                .get(i)
                .into_iter()
                .chain(group.delta_normals.get(i))
                .flatten()
                .copied()
                .map(vec3_key)
                .collect(),
        };
        let next = keep.len() as u32;
        let index = *seen.entry(key).or_insert_with(|| {
            keep.push(i);
            next
        });
        remap.push(index);
    }
    if keep.len() < n {
        fn select<T: Clone>(column: &mut Vec<T>, keep: &[usize]) {
            if !column.is_empty() {
                *column = keep.iter().map(|&i| column[i].clone()).collect();
            }
        }
        select(&mut group.vertices, &keep);
        select(&mut group.normals, &keep);
        select(&mut group.tex_coords, &keep);
        select(&mut group.bones, &keep);
        select(&mut group.weights, &keep);
        select(&mut group.tangents, &keep);
        select(&mut group.morph_keys, &keep);
        select(&mut group.delta_vertices, &keep);
        select(&mut group.delta_normals, &keep);
    }
    remap
}

impl fmt::Display for GeometryData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "data groups ({}):", self.data_groups.len())?;
        for (i, g) in self.data_groups.iter().enumerate() {
            writeln!(
                f,
                "  #{}: {} vertices, skin: {}, tangents: {}, morph width: {}",
                i,
                g.count(),
                g.has_skin(),
                g.has_tangents(),
                g.morph_width
            )?;
        }
        writeln!(f, "index groups ({}):", self.index_groups.len())?;
        for g in &self.index_groups {
            writeln!(
                f,
                "  \"{}\": data group #{}, {} triangles, flags {:08X}, bones {:?}",
                g.name,
                g.data_group_index,
                g.indices.len(),
                g.flags,
                g.bone_index_map
            )?;
        }
        if let Some(t) = &self.inverse_transforms {
            writeln!(f, "inverse transforms: {}", t.len())?;
        }
        if !self.morph_names.is_empty() {
            writeln!(f, "morphs ({}):", self.morph_names.len())?;
            for (i, m) in self.morph_names.iter().enumerate() {
                writeln!(f, "  #{}: \"{}\"", i, m)?;
            }
        }
        if let Some(m) = &self.static_bounding_mesh {
            writeln!(
                f,
                "static bounding mesh: {} vertices, {} triangles",
                m.vertices.len(),
                m.triangles.len()
            )?;
        }
        if let Some(parts) = &self.dynamic_bounding_mesh {
            let present = parts.iter().filter(|p| p.is_some()).count();
            writeln!(
                f,
                "dynamic bounding mesh: {} parts ({} present)",
                parts.len(),
                present
            )?;
        }
        Ok(())
    }
}
