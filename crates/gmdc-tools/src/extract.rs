//! Geometry resource file -> OBJ.
//!
//! Writes `<stem>.obj` with one object per index group, one
//! `<stem>_<key>.obj` per shape key (same objects, moved positions) and
//! `<stem>_bounds.obj` when bounding shapes are imported.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use gmdc_io::{ObjWriter, Writer};
use gmdc_mesh::{unpack, ImportContext, ImportOptions, UnpackedMesh};

use crate::inspect::{load, load_skeleton};

#[derive(Debug, Clone, Default)]
pub struct ExtractSettings {
    /// Skeleton used to name bone groups and to place the dynamic bounding shape.
    pub skeleton: Option<PathBuf>,
    pub options: ImportOptions,
}

fn file_safe(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn write_obj(writer: &ObjWriter, path: PathBuf, written: &mut Vec<PathBuf>) -> Result<()> {
    Writer::write(writer, &path).with_context(|| format!("Failed to write {:?}", path))?;
    written.push(path);
    Ok(())
}

/// Mesh with the positions (and normals, when stored) of shape key `name`.
fn shaped(mesh: &UnpackedMesh, name: &str) -> Option<UnpackedMesh> {
    let key = mesh.shape_keys.iter().find(|k| k.name == name)?;
    let mut shaped = mesh.clone();
    shaped.positions = key.positions.clone();
    if let Some(normals) = &key.normals {
        shaped.normals = normals.clone();
    }
    shaped.skin = None;
    shaped.shape_keys.clear();
    Some(shaped)
}

/// Unpacks the geometry of `input` into OBJ files under `out_dir`.
/// Returns the files written.
pub fn extract(input: &Path, out_dir: &Path, settings: &ExtractSettings) -> Result<Vec<PathBuf>> {
    let file = load(input)?;
    let geometry = file
        .geometry()
        .with_context(|| format!("{:?} holds no geometry data container", input))?;
    let tree = settings
        .skeleton
        .as_deref()
        .map(load_skeleton)
        .transpose()?;

    let mut ctx = ImportContext::new();
    let unpacked = unpack(geometry, tree.as_ref(), &settings.options, &mut ctx)
        .context("Import failed")?;

    fs::create_dir_all(out_dir).with_context(|| format!("Failed to create {:?}", out_dir))?;
    let stem = input
        .file_stem()
        .map(|s| file_safe(&s.to_string_lossy()))
        .unwrap_or_else(|| "geometry".to_string());
    let mut written = Vec::new();

    let mut writer = ObjWriter::new();
    for mesh in &unpacked.meshes {
        writer.add_mesh(mesh, None)?;
        if let Some(skin) = &mesh.skin {
            info!(
                "\"{}\": {} bone groups are not representable in OBJ",
                mesh.name,
                skin.groups.len()
            );
        }
    }
    write_obj(&writer, out_dir.join(format!("{}.obj", stem)), &mut written)?;

    let mut key_names: Vec<&str> = Vec::new();
    for key in unpacked.meshes.iter().flat_map(|m| &m.shape_keys) {
        if !key_names.contains(&key.name.as_str()) {
            key_names.push(&key.name);
        }
    }
    for name in key_names {
        let mut writer = ObjWriter::new();
        for mesh in unpacked.meshes.iter().filter_map(|m| shaped(m, name)) {
            writer.add_mesh(&mesh, None)?;
        }
        let path = out_dir.join(format!("{}_{}.obj", stem, file_safe(name)));
        write_obj(&writer, path, &mut written)?;
    }

    if unpacked.bounding_mesh.is_some() || unpacked.dynamic_bounding_mesh.is_some() {
        let mut writer = ObjWriter::new();
        if let Some(shape) = &unpacked.bounding_mesh {
            writer.add_bounding_mesh(shape, "bounding_mesh")?;
        }
        if let Some(shape) = &unpacked.dynamic_bounding_mesh {
            writer.add_bounding_mesh(shape, "dynamic_bounding_mesh")?;
        }
        write_obj(&writer, out_dir.join(format!("{}_bounds.obj", stem)), &mut written)?;
    }

    info!(
        "Extracted {} meshes from {:?} ({} diagnostics)",
        unpacked.meshes.len(),
        input,
        ctx.diagnostics.len()
    );
    Ok(written)
}
