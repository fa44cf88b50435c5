//! Body codec of `cGeometryDataContainer` nodes.
//!
//! Layout, all little-endian, following the resource name block:
//!
//! ```text
//! i32 data group count
//!   i32 vertex count, u32 attribute mask, u8 morph width
//!   per vertex: 3f position, 3f normal, 2f uv
//!     [skin]     u8 n, n bone bytes, u8 m, m f32 weights
//!     [tangents] 3f
//!     [morph]    u8 n, n u32 keys, width x 3f deltas, [delta normals] width x 3f
//! i32 index group count
//!   string name, i32 data group, u32 flags, i32 n + n x 3 u32, i32 n + n u32
//! i32 inverse transform count (0 = none), each 4f rotation + 3f translation
//! i32 morph name count, each i32 segment count + strings
//! u8 static bounding flag [+ bounding mesh]
//! i32 dynamic part count (0 = none), each u8 present flag [+ bounding mesh]
//! ```
//!
//! This layout is this crate's own serialization of [`GeometryData`]. It is
//! not the body layout of containers written by the game, so only files
//! produced by [`encode_geometry`] decode. Bodies in any other layout fail
//! with a [`GmdcError::InvalidRecord`] or [`GmdcError::Truncated`] error
//! instead of decoding to wrong geometry.

use crate::decoder_buffer::DecoderBuffer;
use crate::encoder_buffer::EncoderBuffer;
use crate::geometry_data::{
    BoundingMesh, DataGroup, GeometryData, IndexGroup, MorphName, MAX_BONE_INFLUENCES,
    MAX_MORPH_INFLUENCES,
};
use crate::sg_blocks::{decode_string_list, encode_string_list};
use crate::status::{GmdcError, Result};
use crate::transform::Transform;

pub const ATTRIBUTE_SKIN: u32 = 1 << 0;
pub const ATTRIBUTE_TANGENTS: u32 = 1 << 1;
pub const ATTRIBUTE_MORPH: u32 = 1 << 2;
pub const ATTRIBUTE_DELTA_NORMALS: u32 = 1 << 3;

const KNOWN_ATTRIBUTES: u32 =
    ATTRIBUTE_SKIN | ATTRIBUTE_TANGENTS | ATTRIBUTE_MORPH | ATTRIBUTE_DELTA_NORMALS;

/// Smallest encoded vertex: position, normal and uv.
const MIN_VERTEX_SIZE: usize = 32;

pub fn attribute_mask(group: &DataGroup) -> u32 {
    let mut mask = 0;
    if group.has_skin() {
        mask |= ATTRIBUTE_SKIN;
    }
    if group.has_tangents() {
        mask |= ATTRIBUTE_TANGENTS;
    }
    if group.has_morphs() {
        mask |= ATTRIBUTE_MORPH;
        if group.has_delta_normals() {
            mask |= ATTRIBUTE_DELTA_NORMALS;
        }
    }
    mask
}

/// Decodes a geometry body and validates its invariants. Violations are
/// reported as format errors at the body's offset.
pub fn decode_geometry(buffer: &mut DecoderBuffer) -> Result<GeometryData> {
    let offset = buffer.position();

    let group_count = buffer.decode_count(9)?;
    let data_groups = (0..group_count)
        .map(|_| decode_data_group(buffer))
        .collect::<Result<Vec<_>>>()?;

    let group_count = buffer.decode_count(20)?;
    let index_groups = (0..group_count)
        .map(|_| decode_index_group(buffer))
        .collect::<Result<Vec<_>>>()?;

    let transform_count = buffer.decode_count(28)?;
    let inverse_transforms = if transform_count == 0 {
        None
    } else {
        let transforms = (0..transform_count)
            .map(|_| {
                let rotation = buffer.decode_quat()?;
                let translation = buffer.decode_vec3()?;
                Ok(Transform::new(translation, rotation))
            })
            .collect::<Result<Vec<_>>>()?;
        Some(transforms)
    };

    let name_count = buffer.decode_count(4)?;
    let morph_names = (0..name_count)
        .map(|_| decode_string_list(buffer).map(MorphName))
        .collect::<Result<Vec<_>>>()?;

    let static_bounding_mesh = match decode_flag(buffer)? {
        true => Some(decode_bounding_mesh(buffer)?),
        false => None,
    };

    let part_count = buffer.decode_count(1)?;
    let dynamic_bounding_mesh = if part_count == 0 {
        None
    } else {
        let parts = (0..part_count)
            .map(|_| match decode_flag(buffer)? {
                true => decode_bounding_mesh(buffer).map(Some),
                false => Ok(None),
            })
            .collect::<Result<Vec<_>>>()?;
        Some(parts)
    };

    let geometry = GeometryData {
        data_groups,
        index_groups,
        inverse_transforms,
        morph_names,
        static_bounding_mesh,
        dynamic_bounding_mesh,
    };
    geometry.validate().map_err(|e| match e {
        GmdcError::InvalidGeometry(message) => GmdcError::invalid_record(offset, message),
        other => other,
    })?;
    Ok(geometry)
}

pub fn encode_geometry(buffer: &mut EncoderBuffer, geometry: &GeometryData) -> Result<()> {
    geometry
        .validate()
        .map_err(|e| GmdcError::invalid_parameter(e.to_string()))?;

    buffer.encode_count(geometry.data_groups.len())?;
    for group in &geometry.data_groups {
        encode_data_group(buffer, group)?;
    }

    buffer.encode_count(geometry.index_groups.len())?;
    for group in &geometry.index_groups {
        encode_index_group(buffer, group)?;
    }

    let transforms = geometry.inverse_transforms.as_deref().unwrap_or(&[]);
    buffer.encode_count(transforms.len())?;
    for t in transforms {
        buffer.encode_quat(t.rotation);
        buffer.encode_vec3(t.translation);
    }

    buffer.encode_count(geometry.morph_names.len())?;
    for name in &geometry.morph_names {
        encode_string_list(buffer, name.segments())?;
    }

    match &geometry.static_bounding_mesh {
        Some(mesh) => {
            buffer.encode_u8(1);
            encode_bounding_mesh(buffer, mesh)?;
        }
        None => buffer.encode_u8(0),
    }

    let parts = geometry.dynamic_bounding_mesh.as_deref().unwrap_or(&[]);
    buffer.encode_count(parts.len())?;
    for part in parts {
        match part {
            Some(mesh) => {
                buffer.encode_u8(1);
                encode_bounding_mesh(buffer, mesh)?;
            }
            None => buffer.encode_u8(0),
        }
    }
    Ok(())
}

fn decode_flag(buffer: &mut DecoderBuffer) -> Result<bool> {
    let offset = buffer.position();
    match buffer.decode_u8()? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(GmdcError::invalid_record(
            offset,
            format!("presence flag must be 0 or 1, found {}", other),
        )),
    }
}

fn decode_small_count(buffer: &mut DecoderBuffer, max: usize, what: &str) -> Result<usize> {
    let offset = buffer.position();
    let count = buffer.decode_u8()? as usize;
    if count > max {
        return Err(GmdcError::invalid_record(
            offset,
            format!("{} {} exceeds the limit of {}", what, count, max),
        ));
    }
    Ok(count)
}

fn decode_data_group(buffer: &mut DecoderBuffer) -> Result<DataGroup> {
    let count = buffer.decode_count(MIN_VERTEX_SIZE)?;
    let mask_offset = buffer.position();
    let mask = buffer.decode_u32()?;
    if mask & !KNOWN_ATTRIBUTES != 0 {
        return Err(GmdcError::invalid_record(
            mask_offset,
            format!("unknown attribute bits {:#x}", mask & !KNOWN_ATTRIBUTES),
        ));
    }
    let width = buffer.decode_u8()? as usize;
    let has_morph = mask & ATTRIBUTE_MORPH != 0;
    if has_morph != (width > 0) || (mask & ATTRIBUTE_DELTA_NORMALS != 0 && !has_morph) {
        return Err(GmdcError::invalid_record(
            mask_offset,
            format!("attribute mask {:#x} does not match morph width {}", mask, width),
        ));
    }

    let mut group = DataGroup {
        morph_width: width,
        ..Default::default()
    };
    for _ in 0..count {
        group.vertices.push(buffer.decode_vec3()?);
        group.normals.push(buffer.decode_vec3()?);
        group.tex_coords.push(buffer.decode_vec2()?);
        if mask & ATTRIBUTE_SKIN != 0 {
            let n = decode_small_count(buffer, MAX_BONE_INFLUENCES, "bone count")?;
            group.bones.push(buffer.decode_slice(n)?.to_vec());
            let m = decode_small_count(buffer, MAX_BONE_INFLUENCES, "weight count")?;
            let weights = (0..m)
                .map(|_| buffer.decode_f32())
                .collect::<Result<Vec<_>>>()?;
            group.weights.push(weights);
        }
        if mask & ATTRIBUTE_TANGENTS != 0 {
            group.tangents.push(buffer.decode_vec3()?);
        }
        if has_morph {
            let n = decode_small_count(buffer, MAX_MORPH_INFLUENCES, "morph key count")?;
            let keys = (0..n)
                .map(|_| buffer.decode_u32())
                .collect::<Result<Vec<_>>>()?;
            group.morph_keys.push(keys);
            let deltas = (0..width)
                .map(|_| buffer.decode_vec3())
                .collect::<Result<Vec<_>>>()?;
            group.delta_vertices.push(deltas);
            if mask & ATTRIBUTE_DELTA_NORMALS != 0 {
                let deltas = (0..width)
                    .map(|_| buffer.decode_vec3())
                    .collect::<Result<Vec<_>>>()?;
                group.delta_normals.push(deltas);
            }
        }
    }
    Ok(group)
}

fn encode_data_group(buffer: &mut EncoderBuffer, group: &DataGroup) -> Result<()> {
    let mask = attribute_mask(group);
    buffer.encode_count(group.count())?;
    buffer.encode_u32(mask);
    buffer.encode_small_count(group.morph_width)?;
    for i in 0..group.count() {
        buffer.encode_vec3(group.vertices[i]);
        buffer.encode_vec3(group.normals[i]);
        buffer.encode_vec2(group.tex_coords[i]);
        if mask & ATTRIBUTE_SKIN != 0 {
            buffer.encode_small_count(group.bones[i].len())?;
            buffer.encode_bytes(&group.bones[i]);
            buffer.encode_small_count(group.weights[i].len())?;
            for &w in &group.weights[i] {
                buffer.encode_f32(w);
            }
        }
        if mask & ATTRIBUTE_TANGENTS != 0 {
            buffer.encode_vec3(group.tangents[i]);
        }
        if mask & ATTRIBUTE_MORPH != 0 {
            buffer.encode_small_count(group.morph_keys[i].len())?;
            for &k in &group.morph_keys[i] {
                buffer.encode_u32(k);
            }
            for &d in &group.delta_vertices[i] {
                buffer.encode_vec3(d);
            }
            if mask & ATTRIBUTE_DELTA_NORMALS != 0 {
                for &d in &group.delta_normals[i] {
                    buffer.encode_vec3(d);
                }
            }
        }
    }
    Ok(())
}

fn decode_index_group(buffer: &mut DecoderBuffer) -> Result<IndexGroup> {
    let name = buffer.decode_string()?;
    let offset = buffer.position();
    let data_group_index = buffer.decode_i32()?;
    let data_group_index = usize::try_from(data_group_index).map_err(|_| {
        GmdcError::invalid_record(
            offset,
            format!("index group \"{}\" has data group {}", name, data_group_index),
        )
    })?;
    let flags = buffer.decode_u32()?;
    let count = buffer.decode_count(12)?;
    let indices = (0..count)
        .map(|_| Ok([buffer.decode_u32()?, buffer.decode_u32()?, buffer.decode_u32()?]))
        .collect::<Result<Vec<_>>>()?;
    let count = buffer.decode_count(4)?;
    let bone_index_map = (0..count)
        .map(|_| buffer.decode_u32())
        .collect::<Result<Vec<_>>>()?;
    Ok(IndexGroup {
        name,
        data_group_index,
        indices,
        flags,
        bone_index_map,
    })
}

fn encode_index_group(buffer: &mut EncoderBuffer, group: &IndexGroup) -> Result<()> {
    buffer.encode_string(&group.name)?;
    buffer.encode_count(group.data_group_index)?;
    buffer.encode_u32(group.flags);
    encode_triangles(buffer, &group.indices)?;
    buffer.encode_count(group.bone_index_map.len())?;
    for &b in &group.bone_index_map {
        buffer.encode_u32(b);
    }
    Ok(())
}

fn encode_triangles(buffer: &mut EncoderBuffer, triangles: &[[u32; 3]]) -> Result<()> {
    buffer.encode_count(triangles.len())?;
    for tri in triangles {
        for &i in tri {
            buffer.encode_u32(i);
        }
    }
    Ok(())
}

fn decode_bounding_mesh(buffer: &mut DecoderBuffer) -> Result<BoundingMesh> {
    let count = buffer.decode_count(12)?;
    let vertices = (0..count)
        .map(|_| buffer.decode_vec3())
        .collect::<Result<Vec<_>>>()?;
    let count = buffer.decode_count(12)?;
    let triangles = (0..count)
        .map(|_| Ok([buffer.decode_u32()?, buffer.decode_u32()?, buffer.decode_u32()?]))
        .collect::<Result<Vec<_>>>()?;
    Ok(BoundingMesh {
        vertices,
        triangles,
    })
}

fn encode_bounding_mesh(buffer: &mut EncoderBuffer, mesh: &BoundingMesh) -> Result<()> {
    buffer.encode_count(mesh.vertices.len())?;
    for &v in &mesh.vertices {
        buffer.encode_vec3(v);
    }
    encode_triangles(buffer, &mesh.triangles)
}
