//! OBJ -> geometry resource file.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use gmdc_core::{geometry_resource_name, ResourceFile};
use gmdc_io::{shape_key_from_mesh, ObjReader, Reader};
use gmdc_mesh::{pack, ExportContext, ExportOptions, SourceMesh};

use crate::inspect::load_skeleton;

#[derive(Debug, Clone, Default)]
pub struct ExportSettings {
    /// Resource name; derived from the output file name when absent.
    pub name: Option<String>,
    pub locator_suffix: bool,
    pub options: ExportOptions,
    /// OBJ whose first object is the bounding shape.
    pub shape: Option<PathBuf>,
    /// Skeleton used for rigging and the dynamic bounding shape.
    pub skeleton: Option<PathBuf>,
    /// `(key name, OBJ)` pairs. Objects are matched to meshes by name.
    pub shape_keys: Vec<(String, PathBuf)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub resource_name: String,
    pub meshes: usize,
    pub data_groups: usize,
    pub index_groups: usize,
    pub morphs: usize,
    pub warnings: usize,
}

/// Parses a `name=path.obj` shape key argument.
pub fn parse_shape_key_arg(s: &str) -> std::result::Result<(String, PathBuf), String> {
    match s.split_once('=') {
        Some((name, path)) if !name.trim().is_empty() && !path.is_empty() => {
            Ok((name.trim().to_string(), PathBuf::from(path)))
        }
        _ => Err(format!("expected NAME=FILE.obj, got \"{}\"", s)),
    }
}

fn read_obj(path: &Path) -> Result<Vec<SourceMesh>> {
    ObjReader::open(path)
        .and_then(|mut reader| reader.read_meshes())
        .with_context(|| format!("Failed to read OBJ: {:?}", path))
}

fn attach_shape_keys(meshes: &mut [SourceMesh], shape_keys: &[(String, PathBuf)]) -> Result<()> {
    for (name, path) in shape_keys {
        let targets = read_obj(path)?;
        for mesh in meshes.iter_mut() {
            match targets.iter().find(|t| t.name == mesh.name) {
                Some(target) => {
                    let key = shape_key_from_mesh(mesh, target, name)
                        .with_context(|| format!("Shape key {:?} from {:?}", name, path))?;
                    mesh.shape_keys.push(key);
                }
                None => warn!(
                    "Shape key \"{}\": {:?} has no object \"{}\"",
                    name, path, mesh.name
                ),
            }
        }
    }
    Ok(())
}

/// Packs every object of `inputs` into one geometry resource file at `output`.
pub fn export_objs(inputs: &[PathBuf], output: &Path, settings: &ExportSettings) -> Result<ExportSummary> {
    if inputs.is_empty() {
        bail!("No input OBJ files");
    }
    let mut meshes = Vec::new();
    for input in inputs {
        meshes.extend(read_obj(input)?);
    }
    if !settings.shape_keys.is_empty() && !settings.options.morphs().enabled() {
        warn!("Shape keys given but morph export is off");
    }
    attach_shape_keys(&mut meshes, &settings.shape_keys)?;

    let shape = match &settings.shape {
        Some(path) => Some(
            ObjReader::open(path)
                .and_then(|mut reader| reader.read_mesh())
                .with_context(|| format!("Failed to read bounding shape: {:?}", path))?,
        ),
        None => None,
    };
    let tree = settings
        .skeleton
        .as_deref()
        .map(load_skeleton)
        .transpose()?;

    let mut ctx = ExportContext::new();
    let geometry = pack(&meshes, shape.as_ref(), tree.as_ref(), &settings.options, &mut ctx)
        .context("Export failed")?;

    let resource_name =
        geometry_resource_name(settings.name.as_deref(), output, settings.locator_suffix);
    let summary = ExportSummary {
        resource_name: resource_name.clone(),
        meshes: meshes.len(),
        data_groups: geometry.data_groups.len(),
        index_groups: geometry.index_groups.len(),
        morphs: geometry.morph_names.len(),
        warnings: ctx.diagnostics.warnings().count(),
    };
    ResourceFile::from_geometry(resource_name, geometry)
        .save(output)
        .with_context(|| format!("Failed to write {:?}", output))?;
    info!(
        "Exported {} meshes as \"{}\" ({} data groups, {} index groups)",
        summary.meshes, summary.resource_name, summary.data_groups, summary.index_groups
    );
    Ok(summary)
}
