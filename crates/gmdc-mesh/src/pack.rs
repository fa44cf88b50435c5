//! Source meshes to geometry data.
//!
//! Each mesh is flattened to one vertex record per triangle corner, the
//! records are deduplicated, and the result is either appended to a
//! compatible data group or becomes a new one. Every mesh gets its own
//! index group.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use glam::{Vec2, Vec3};
use tracing::{debug, info};

use gmdc_core::geometry_data::stored_weight_count;
use gmdc_core::{
    float_key, vec2_key, vec3_key, DataGroup, GeometryData, GmdcError, IndexGroup, NodeQuery,
    Result, Transform, TransformTree, DEFAULT_INDEX_GROUP_FLAGS, MAX_BONE_INFLUENCES,
};

use crate::bounding::{dynamic_bounding_mesh, static_bounding_mesh};
use crate::context::ExportContext;
use crate::morph::{morph_columns, CornerRef};
use crate::options::ExportOptions;
use crate::source::{SourceFace, SourceMesh};

const TRIANGLE_ORDER: [usize; 3] = [0, 1, 2];
/// Quads are split along the `0-2` diagonal.
const QUAD_ORDER: [usize; 6] = [0, 1, 2, 0, 2, 3];

/// Weight sums at or below this are treated as no influence at all.
const MIN_WEIGHT_SUM: f32 = 1e-4;

fn corner_order(corners: usize) -> &'static [usize] {
    if corners == 4 {
        &QUAD_ORDER
    } else {
        &TRIANGLE_ORDER
    }
}

/// Packs `meshes` (and an optional bounding `shape`) into geometry data.
///
/// Skinning needs `options.rigging()` and a `tree`. The morph registry of
/// `ctx` is cleared first and then holds the names of this export only;
/// soft problems are appended to `ctx.diagnostics`. Any error aborts the
/// whole export.
///
/// # Example
///
/// ```
/// use glam::{Vec2, Vec3};
/// use gmdc_mesh::{pack, ExportContext, ExportOptions, SourceFace, SourceMesh, SourceVertex};
///
/// let mut mesh = SourceMesh::new("plane");
/// mesh.vertices = vec![
///     SourceVertex::new(Vec3::ZERO, Vec3::Z),
///     SourceVertex::new(Vec3::X, Vec3::Z),
///     SourceVertex::new(Vec3::Y, Vec3::Z),
/// ];
/// mesh.faces = vec![SourceFace::new(vec![0, 1, 2], vec![Vec2::ZERO, Vec2::X, Vec2::Y])];
///
/// let mut ctx = ExportContext::new();
/// let geometry = pack(&[mesh], None, None, &ExportOptions::new(), &mut ctx).unwrap();
/// assert_eq!(geometry.data_groups[0].count(), 3);
/// assert_eq!(geometry.index_groups[0].indices, vec![[0, 1, 2]]);
/// ```
pub fn pack(
    meshes: &[SourceMesh],
    shape: Option<&SourceMesh>,
    tree: Option<&TransformTree>,
    options: &ExportOptions,
    ctx: &mut ExportContext,
) -> Result<GeometryData> {
    ctx.rollback_morphs(0);
    if meshes.is_empty() {
        return Err(GmdcError::invalid_geometry("no meshes to export"));
    }
    let skeleton = if options.rigging() {
        if tree.is_none() {
            ctx.diagnostics
                .warn("Rigging requested without a transform tree; exporting unskinned geometry");
        }
        tree
    } else {
        None
    };

    let mut geometry = GeometryData::default();
    for mesh in meshes {
        info!("Packing mesh \"{}\"", mesh.name);
        let PackedMesh {
            group,
            mut triangles,
            bone_table,
        } = pack_mesh(mesh, skeleton, options, ctx)?;
        let data_group_index = add_to_data_groups(&mut geometry.data_groups, group, &mut triangles);

        let name = options
            .use_properties()
            .then_some(mesh.properties.name.as_deref())
            .flatten()
            .filter(|s| !s.is_empty())
            .unwrap_or(&mesh.name);
        let mut index_group = IndexGroup::new(name, data_group_index);
        index_group.indices = triangles;
        if options.use_properties() {
            index_group.flags = mesh.properties.flags.unwrap_or(DEFAULT_INDEX_GROUP_FLAGS);
        }
        index_group.bone_index_map = bone_table;
        debug!(
            "Index group \"{}\": data group #{}, {} triangles",
            index_group.name,
            data_group_index,
            index_group.indices.len()
        );
        geometry.index_groups.push(index_group);
    }

    if let Some(tree) = skeleton {
        if let Some(max) = tree.max_bone_index() {
            let mut inverse = vec![Transform::IDENTITY; max as usize + 1];
            for node in tree.bone_nodes() {
                if let Some(bone) = node.bone_index {
                    inverse[bone as usize] = node.absolute().inverse();
                }
            }
            info!("Inverse transforms: {}", inverse.len());
            geometry.inverse_transforms = Some(inverse);
        }
    }

    if let Some(shape) = shape {
        match skeleton {
            Some(tree) => {
                geometry.dynamic_bounding_mesh = dynamic_bounding_mesh(shape, tree)?;
                if geometry.dynamic_bounding_mesh.is_none() {
                    ctx.diagnostics.info(format!(
                        "Shape mesh \"{}\" has no faces inside any bone group",
                        shape.name
                    ));
                }
            }
            None => geometry.static_bounding_mesh = Some(static_bounding_mesh(shape)?),
        }
    }

    geometry.morph_names = ctx.morph_names().to_vec();
    geometry.validate()?;
    Ok(geometry)
}

struct PackedMesh {
    group: DataGroup,
    triangles: Vec<[u32; 3]>,
    bone_table: Vec<u32>,
}

#[derive(Default)]
struct VertexRecord {
    position: Vec3,
    normal: Vec3,
    uv: Vec2,
    tangent: Vec3,
    bones: Vec<u8>,
    weights: Vec<f32>,
    morph_keys: Vec<u32>,
    delta_vertices: Vec<Vec3>,
    delta_normals: Vec<Vec3>,
}

#[derive(PartialEq, Eq, Hash)]
struct RecordKey {
    position: [u32; 3],
    normal: [u32; 3],
    uv: [u32; 2],
    tangent: [u32; 3],
    bones: Vec<u8>,
    weights: Vec<u32>,
    morph_keys: Vec<u32>,
    deltas: Vec<[u32; 3]>,
}

impl VertexRecord {
    fn key(&self) -> RecordKey {
        RecordKey {
            position: vec3_key(self.position),
            normal: vec3_key(self.normal),
            uv: vec2_key(self.uv),
            tangent: vec3_key(self.tangent),
            bones: self.bones.clone(),
            weights: self.weights.iter().copied().map(float_key).collect(),
            morph_keys: self.morph_keys.clone(),
            deltas: self
                .delta_vertices
                .iter()
                .chain(&self.delta_normals)
                .copied()
                .map(vec3_key)
                .collect(),
        }
    }
}

fn check_faces(mesh: &SourceMesh, faces: &[(usize, &SourceFace)], tangents: bool) -> Result<()> {
    for &(f, face) in faces {
        let n = face.corners.len();
        if n != 3 && n != 4 {
            return Err(GmdcError::invalid_geometry(format!(
                "face #{} of mesh \"{}\" has {} corners",
                f, mesh.name, n
            )));
        }
        if let Some(&c) = face
            .corners
            .iter()
            .find(|&&c| c as usize >= mesh.vertices.len())
        {
            return Err(GmdcError::invalid_geometry(format!(
                "face #{} of mesh \"{}\" references missing vertex {}",
                f, mesh.name, c
            )));
        }
        match &face.uv {
            None => {
                return Err(GmdcError::invalid_geometry(format!(
                    "mesh \"{}\" has faces with no texture coordinates",
                    mesh.name
                )))
            }
            Some(uv) if uv.len() != n => {
                return Err(GmdcError::invalid_geometry(format!(
                    "face #{} of mesh \"{}\" has {} texture coordinates for {} corners",
                    f,
                    mesh.name,
                    uv.len(),
                    n
                )))
            }
            Some(_) => {}
        }
        if let Some(t) = face.tangents.as_ref().filter(|t| tangents && t.len() != n) {
            return Err(GmdcError::invalid_geometry(format!(
                "face #{} of mesh \"{}\" has {} tangents for {} corners",
                f,
                mesh.name,
                t.len(),
                n
            )));
        }
    }
    Ok(())
}

fn pack_mesh(
    mesh: &SourceMesh,
    skeleton: Option<&TransformTree>,
    options: &ExportOptions,
    ctx: &mut ExportContext,
) -> Result<PackedMesh> {
    let selected_only = options.use_properties() && mesh.properties.selected_only;
    let faces: Vec<(usize, &SourceFace)> = mesh
        .faces
        .iter()
        .enumerate()
        .filter(|(_, f)| !selected_only || f.selected)
        .collect();
    if faces.is_empty() {
        return Err(GmdcError::invalid_geometry(format!(
            "there are no faces to export in mesh \"{}\"{}",
            mesh.name,
            if selected_only { " (selected faces only)" } else { "" }
        )));
    }
    check_faces(mesh, &faces, options.tangents())?;
    if selected_only {
        debug!("Exporting only selected faces ({})", faces.len());
    }

    let mut skin = SkinResolver::new(mesh, skeleton);
    let mut corners = Vec::with_capacity(faces.len() * 6);
    let mut records = Vec::with_capacity(faces.len() * 6);
    for &(f, face) in &faces {
        let uv = face.uv.as_deref().unwrap_or_default();
        for &c in corner_order(face.corners.len()) {
            let vertex = face.corners[c] as usize;
            let source = &mesh.vertices[vertex];
            let normal = if face.smooth { source.normal } else { face.normal };
            let tangent = match &face.tangents {
                Some(t) if options.tangents() => t[c],
                _ => Vec3::ZERO,
            };
            let (bones, weights) = skin.influences(vertex, ctx)?;
            corners.push(CornerRef {
                face: f,
                vertex,
                smooth: face.smooth,
                normal,
            });
            records.push(VertexRecord {
                position: source.position + mesh.origin,
                normal,
                uv: Vec2::new(uv[c].x, 1.0 - uv[c].y),
                tangent,
                bones,
                weights,
                ..Default::default()
            });
        }
    }

    let mut morph_width = 0;
    if let Some(morphs) = morph_columns(mesh, &corners, options.morphs(), ctx)? {
        morph_width = morphs.width;
        let mut delta_normals = morphs.delta_normals.into_iter();
        for ((record, keys), dv) in records
            .iter_mut()
            .zip(morphs.keys)
            .zip(morphs.delta_vertices)
        {
            record.morph_keys = keys;
            record.delta_vertices = dv;
            record.delta_normals = delta_normals.next().unwrap_or_default();
        }
    }

    let skinned = !skin.bone_table.is_empty();
    let with_delta_normals = morph_width > 0 && options.morphs().with_normals();
    let mut group = DataGroup {
        morph_width,
        ..Default::default()
    };
    let mut seen: HashMap<RecordKey, u32> = HashMap::with_capacity(records.len());
    let mut indices = Vec::with_capacity(records.len());
    let corner_count = records.len();
    for record in records {
        let next = group.count() as u32;
        let index = match seen.entry(record.key()) {
            Entry::Occupied(e) => *e.get(),
            Entry::Vacant(e) => {
                e.insert(next);
                group.vertices.push(record.position);
                group.normals.push(record.normal);
                group.tex_coords.push(record.uv);
                if skinned {
                    group.bones.push(record.bones);
                    group.weights.push(record.weights);
                }
                if options.tangents() {
                    group.tangents.push(record.tangent);
                }
                if morph_width > 0 {
                    group.morph_keys.push(record.morph_keys);
                    group.delta_vertices.push(record.delta_vertices);
                }
                if with_delta_normals {
                    group.delta_normals.push(record.delta_normals);
                }
                next
            }
        };
        indices.push(index);
    }
    debug!(
        "Mesh \"{}\": {} corners, {} unique vertices, {} bones, morph width {}",
        mesh.name,
        corner_count,
        group.count(),
        skin.bone_table.len(),
        morph_width
    );

    let triangles = indices
        .chunks_exact(3)
        .map(|c| [c[0], c[1], c[2]])
        .collect();
    Ok(PackedMesh {
        group,
        triangles,
        bone_table: skin.bone_table,
    })
}

/// Appends `group` to the first data group with the same skinning and
/// morph width, offsetting `triangles`, or adds it as a new group.
fn add_to_data_groups(
    groups: &mut Vec<DataGroup>,
    group: DataGroup,
    triangles: &mut [[u32; 3]],
) -> usize {
    let target = groups
        .iter()
        .position(|g| g.has_skin() == group.has_skin() && g.morph_width == group.morph_width);
    let Some(g) = target else {
        groups.push(group);
        return groups.len() - 1;
    };

    let existing = &mut groups[g];
    let offset = existing.count() as u32;
    for i in triangles.iter_mut().flatten() {
        *i += offset;
    }
    existing.vertices.extend(group.vertices);
    existing.normals.extend(group.normals);
    existing.tex_coords.extend(group.tex_coords);
    existing.bones.extend(group.bones);
    existing.weights.extend(group.weights);
    existing.tangents.extend(group.tangents);
    existing.morph_keys.extend(group.morph_keys);
    existing.delta_vertices.extend(group.delta_vertices);
    existing.delta_normals.extend(group.delta_normals);
    g
}

/// Resolves vertex group influences to local bone slots, numbering bones
/// in first-use order.
struct SkinResolver<'a> {
    mesh: &'a SourceMesh,
    tree: Option<&'a TransformTree>,
    cache: HashMap<usize, (Vec<u8>, Vec<f32>)>,
    local: HashMap<i32, u8>,
    bone_table: Vec<u32>,
    reported: HashSet<&'a str>,
}

impl<'a> SkinResolver<'a> {
    fn new(mesh: &'a SourceMesh, tree: Option<&'a TransformTree>) -> Self {
        Self {
            mesh,
            tree,
            cache: HashMap::new(),
            local: HashMap::new(),
            bone_table: Vec::new(),
            reported: HashSet::new(),
        }
    }

    /// Local bone slots and stored weights of `vertex`.
    fn influences(
        &mut self,
        vertex: usize,
        ctx: &mut ExportContext,
    ) -> Result<(Vec<u8>, Vec<f32>)> {
        let Some(tree) = self.tree else {
            return Ok((Vec::new(), Vec::new()));
        };
        if let Some(hit) = self.cache.get(&vertex) {
            return Ok(hit.clone());
        }

        let mesh = self.mesh;
        let mut bones = Vec::new();
        let mut weights = Vec::new();
        for (name, weight) in &mesh.vertices[vertex].groups {
            let bone = match tree.get_node(NodeQuery::Name(name)) {
                Ok(node) => node.bone_index.filter(|&b| b >= 0),
                Err(GmdcError::NotFound(_)) => None,
                Err(e) => return Err(e),
            };
            let Some(bone) = bone else {
                if self.reported.insert(name.as_str()) {
                    ctx.diagnostics.warn(format!(
                        "No bone named \"{}\"; its influence on mesh \"{}\" is ignored",
                        name, mesh.name
                    ));
                }
                continue;
            };
            bones.push(self.local_index(bone)?);
            weights.push(*weight);
        }
        if bones.len() > MAX_BONE_INFLUENCES {
            return Err(GmdcError::TooManyInfluences {
                mesh: mesh.name.clone(),
                vertex,
                count: bones.len(),
            });
        }

        let sum: f32 = weights.iter().sum();
        if sum > MIN_WEIGHT_SUM {
            for w in &mut weights {
                *w /= sum;
            }
        } else {
            weights.fill(0.0);
        }
        weights.truncate(stored_weight_count(bones.len()));

        self.cache.insert(vertex, (bones.clone(), weights.clone()));
        Ok((bones, weights))
    }

    fn local_index(&mut self, bone: i32) -> Result<u8> {
        if let Some(&slot) = self.local.get(&bone) {
            return Ok(slot);
        }
        let slot = u8::try_from(self.bone_table.len()).map_err(|_| {
            GmdcError::invalid_geometry(format!(
                "mesh \"{}\" is influenced by more than 256 bones",
                self.mesh.name
            ))
        })?;
        self.local.insert(bone, slot);
        self.bone_table.push(bone as u32);
        Ok(slot)
    }
}
