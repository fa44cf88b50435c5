//! Shape key to morph delta conversion.

use glam::Vec3;

use gmdc_core::{GmdcError, MorphName, Result, MAX_MORPH_INFLUENCES};

use crate::context::ExportContext;
use crate::options::MorphExport;
use crate::source::SourceMesh;

/// One exported corner, as seen by the morph pass.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CornerRef {
    /// Index into the mesh's full face list.
    pub face: usize,
    pub vertex: usize,
    pub smooth: bool,
    /// Normal written for the corner.
    pub normal: Vec3,
}

/// Morph columns of one mesh, one entry per corner.
#[derive(Debug, Clone, Default)]
pub(crate) struct MorphColumns {
    pub width: usize,
    pub keys: Vec<Vec<u32>>,
    pub delta_vertices: Vec<Vec<Vec3>>,
    /// Empty unless normals are exported.
    pub delta_normals: Vec<Vec<Vec3>>,
}

fn check_key_lengths(mesh: &SourceMesh, with_normals: bool) -> Result<()> {
    let vertex_count = mesh.vertices.len();
    for key in &mesh.shape_keys {
        let bad = if key.positions.len() != vertex_count {
            Some(("positions", key.positions.len(), vertex_count))
        } else if with_normals && key.vertex_normals.len() != vertex_count {
            Some(("vertex normals", key.vertex_normals.len(), vertex_count))
        } else if with_normals && key.face_normals.len() != mesh.faces.len() {
            Some(("face normals", key.face_normals.len(), mesh.faces.len()))
        } else {
            None
        };
        if let Some((what, got, want)) = bad {
            return Err(GmdcError::invalid_geometry(format!(
                "shape key \"{}\" of mesh \"{}\" has {} {} instead of {}",
                key.name, mesh.name, got, what, want
            )));
        }
    }
    Ok(())
}

/// Computes the morph columns of `mesh` for the exported `corners`.
///
/// Returns `None` when morphs are off, the mesh has no shape keys, or no
/// key moves any vertex. In the last case names first registered by this
/// mesh are removed from the registry again.
pub(crate) fn morph_columns(
    mesh: &SourceMesh,
    corners: &[CornerRef],
    mode: MorphExport,
    ctx: &mut ExportContext,
) -> Result<Option<MorphColumns>> {
    if !mode.enabled() || mesh.shape_keys.is_empty() {
        return Ok(None);
    }
    let with_normals = mode.with_normals();
    check_key_lengths(mesh, with_normals)?;

    let registry_len = ctx.morph_names().len();
    let key_indices: Vec<u32> = mesh
        .shape_keys
        .iter()
        .map(|key| ctx.register_morph(MorphName::parse(key.name.trim())))
        .collect();

    let mut columns = MorphColumns::default();
    for corner in corners {
        let base = &mesh.vertices[corner.vertex];
        let mut keys = Vec::new();
        let mut dv = Vec::new();
        let mut dn = Vec::new();
        for (key, &index) in mesh.shape_keys.iter().zip(&key_indices) {
            let delta_position = key.positions[corner.vertex] - base.position;
            let delta_normal = if with_normals {
                let key_normal = if corner.smooth {
                    key.vertex_normals[corner.vertex]
                } else {
                    key.face_normals[corner.face]
                };
                key_normal - corner.normal
            } else {
                Vec3::ZERO
            };
            if delta_position == Vec3::ZERO && delta_normal == Vec3::ZERO {
                continue;
            }
            keys.push(index);
            dv.push(delta_position);
            dn.push(delta_normal);
        }
        if keys.len() > MAX_MORPH_INFLUENCES {
            return Err(GmdcError::TooManyMorphs {
                mesh: mesh.name.clone(),
                vertex: corner.vertex,
            });
        }
        columns.width = columns.width.max(keys.len());
        columns.keys.push(keys);
        columns.delta_vertices.push(dv);
        if with_normals {
            columns.delta_normals.push(dn);
        }
    }

    if columns.width == 0 {
        ctx.rollback_morphs(registry_len);
        ctx.diagnostics.info(format!(
            "Shape keys of mesh \"{}\" move no vertex; exported without morphs",
            mesh.name
        ));
        return Ok(None);
    }

    let width = columns.width;
    for deltas in columns
        .delta_vertices
        .iter_mut()
        .chain(columns.delta_normals.iter_mut())
    {
        deltas.resize(width, Vec3::ZERO);
    }
    Ok(Some(columns))
}
