//! Wavefront OBJ reader.
//!
//! Every `o` statement starts a new mesh. `g` puts the vertices of the
//! faces that follow into the named vertex groups, and `s off` / `s 0` makes
//! them flat. Corners without a `vn` index also make their face flat; such
//! vertices get the average of their faces' normals.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use glam::{Vec2, Vec3};
use tracing::{debug, info};

use gmdc_mesh::{ShapeKey, SourceFace, SourceMesh, SourceVertex};

use crate::traits::Reader;

/// OBJ format reader.
#[derive(Debug)]
pub struct ObjReader {
    path: PathBuf,
}

impl ObjReader {
    /// Open an OBJ file for reading.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("File not found: {}", path.display()),
            ));
        }
        Ok(Self { path })
    }

    /// Name given to faces that appear before any `o` statement.
    fn default_name(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "mesh".to_string())
    }
}

impl Reader for ObjReader {
    fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        ObjReader::open(path)
    }

    fn read_meshes(&mut self) -> io::Result<Vec<SourceMesh>> {
        let file = File::open(&self.path)?;
        let meshes = parse_obj(BufReader::new(file), &self.default_name())?;
        info!("Read {} meshes from {}", meshes.len(), self.path.display());
        Ok(meshes)
    }
}

fn invalid(line: usize, msg: impl std::fmt::Display) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, format!("line {}: {}", line, msg))
}

#[derive(Debug, Default)]
struct ObjData {
    positions: Vec<Vec3>,
    tex_coords: Vec<Vec2>,
    normals: Vec<Vec3>,
}

#[derive(Debug, Clone, Copy)]
struct Corner {
    position: usize,
    tex_coord: Option<usize>,
    normal: Option<usize>,
}

struct MeshBuilder {
    mesh: SourceMesh,
    vertex_map: HashMap<(usize, Option<usize>), u32>,
    computed_normals: Vec<bool>,
}

impl MeshBuilder {
    fn new(name: &str) -> Self {
        Self {
            mesh: SourceMesh::new(name),
            vertex_map: HashMap::new(),
            computed_normals: Vec::new(),
        }
    }

    fn vertex(&mut self, corner: &Corner, data: &ObjData, groups: &[String]) -> u32 {
        let key = (corner.position, corner.normal);
        let index = match self.vertex_map.get(&key) {
            Some(&i) => i,
            None => {
                let i = self.mesh.vertices.len() as u32;
                let normal = corner.normal.map_or(Vec3::ZERO, |n| data.normals[n]);
                self.mesh
                    .vertices
                    .push(SourceVertex::new(data.positions[corner.position], normal));
                self.computed_normals.push(corner.normal.is_none());
                self.vertex_map.insert(key, i);
                i
            }
        };
        let vertex = &mut self.mesh.vertices[index as usize];
        for group in groups {
            if !vertex.groups.iter().any(|(name, _)| name == group) {
                vertex.groups.push((group.clone(), 1.0));
            }
        }
        index
    }

    fn add_face(&mut self, corners: &[Corner], data: &ObjData, groups: &[String], smooth: bool) {
        let indices: Vec<u32> = corners
            .iter()
            .map(|c| self.vertex(c, data, groups))
            .collect();
        let points: Vec<Vec3> = corners.iter().map(|c| data.positions[c.position]).collect();
        let uv = corners
            .iter()
            .map(|c| c.tex_coord.map(|t| data.tex_coords[t]))
            .collect::<Option<Vec<_>>>();
        let has_normals = corners.iter().all(|c| c.normal.is_some());
        self.mesh.faces.push(SourceFace {
            corners: indices,
            uv,
            smooth: smooth && has_normals,
            normal: face_normal(&points),
            tangents: None,
            selected: true,
        });
    }

    fn finish(mut self) -> SourceMesh {
        let mut sums = vec![Vec3::ZERO; self.mesh.vertices.len()];
        for face in &self.mesh.faces {
            for &c in &face.corners {
                sums[c as usize] += face.normal;
            }
        }
        for ((vertex, &computed), sum) in self
            .mesh
            .vertices
            .iter_mut()
            .zip(&self.computed_normals)
            .zip(sums)
        {
            if computed {
                vertex.normal = sum.normalize_or_zero();
            }
        }
        self.mesh
    }
}

/// Newell normal, so quads that are not quite planar still get a sane one.
fn face_normal(points: &[Vec3]) -> Vec3 {
    let mut n = Vec3::ZERO;
    for (i, a) in points.iter().enumerate() {
        let b = points[(i + 1) % points.len()];
        n += a.cross(b);
    }
    n.normalize_or_zero()
}

/// Resolves a 1-based (or negative, relative) OBJ index.
fn resolve_index(token: &str, len: usize, line: usize) -> io::Result<usize> {
    let raw: i64 = token
        .parse()
        .map_err(|_| invalid(line, format!("bad index \"{}\"", token)))?;
    let index = match raw {
        0 => None,
        r if r > 0 => Some(r as usize - 1),
        r => usize::try_from(len as i64 + r).ok(),
    };
    index
        .filter(|&i| i < len)
        .ok_or_else(|| invalid(line, format!("index {} out of range ({} defined)", raw, len)))
}

fn parse_corner(token: &str, data: &ObjData, line: usize) -> io::Result<Corner> {
    let mut fields = token.split('/');
    let position = resolve_index(fields.next().unwrap_or(""), data.positions.len(), line)?;
    let tex_coord = match fields.next() {
        Some(s) if !s.is_empty() => Some(resolve_index(s, data.tex_coords.len(), line)?),
        _ => None,
    };
    let normal = match fields.next() {
        Some(s) if !s.is_empty() => Some(resolve_index(s, data.normals.len(), line)?),
        _ => None,
    };
    Ok(Corner {
        position,
        tex_coord,
        normal,
    })
}

fn parse_floats<const N: usize>(parts: &[&str], line: usize) -> io::Result<[f32; N]> {
    let mut out = [0.0; N];
    for (i, slot) in out.iter_mut().enumerate() {
        let token = parts
            .get(i)
            .ok_or_else(|| invalid(line, format!("expected {} components", N)))?;
        *slot = token
            .parse()
            .map_err(|_| invalid(line, format!("bad number \"{}\"", token)))?;
    }
    Ok(out)
}

/// Parses OBJ text. Faces before the first `o` go into a mesh called
/// `default_name`; objects without faces are skipped.
pub fn parse_obj<R: BufRead>(reader: R, default_name: &str) -> io::Result<Vec<SourceMesh>> {
    let mut data = ObjData::default();
    let mut builders: Vec<MeshBuilder> = Vec::new();
    let mut groups: Vec<String> = Vec::new();
    let mut smooth = true;

    for (i, line) in reader.lines().enumerate() {
        let line_no = i + 1;
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts[0] {
            "v" => {
                let [x, y, z] = parse_floats::<3>(&parts[1..], line_no)?;
                data.positions.push(Vec3::new(x, y, z));
            }
            "vt" => {
                let [u, v] = parse_floats::<2>(&parts[1..], line_no)?;
                data.tex_coords.push(Vec2::new(u, v));
            }
            "vn" => {
                let [x, y, z] = parse_floats::<3>(&parts[1..], line_no)?;
                data.normals.push(Vec3::new(x, y, z));
            }
            "o" => {
                let name = line[1..].trim();
                builders.push(MeshBuilder::new(if name.is_empty() {
                    default_name
                } else {
                    name
                }));
            }
            "g" => {
                groups = parts[1..]
                    .iter()
                    .filter(|g| **g != "default")
                    .map(|g| g.to_string())
                    .collect();
            }
            "s" => {
                smooth = !matches!(parts.get(1), Some(&"off") | Some(&"0"));
            }
            "f" => {
                let corners = parts[1..]
                    .iter()
                    .map(|t| parse_corner(t, &data, line_no))
                    .collect::<io::Result<Vec<_>>>()?;
                if corners.len() < 3 {
                    return Err(invalid(line_no, "face with fewer than 3 corners"));
                }
                if builders.is_empty() {
                    builders.push(MeshBuilder::new(default_name));
                }
                let builder = builders.len() - 1;
                let builder = &mut builders[builder];
                if corners.len() <= 4 {
                    builder.add_face(&corners, &data, &groups, smooth);
                } else {
                    // Fan larger polygons into triangles.
                    for k in 1..corners.len() - 1 {
                        let tri = [corners[0], corners[k], corners[k + 1]];
                        builder.add_face(&tri, &data, &groups, smooth);
                    }
                }
            }
            other => debug!("Skipping OBJ statement \"{}\" on line {}", other, line_no),
        }
    }

    Ok(builders
        .into_iter()
        .filter(|b| {
            let keep = !b.mesh.faces.is_empty();
            if !keep {
                debug!("Object \"{}\" has no faces", b.mesh.name);
            }
            keep
        })
        .map(MeshBuilder::finish)
        .collect())
}

/// Shape key whose positions and normals come from `target`, which must
/// list its vertices and faces in the same order as `base`.
pub fn shape_key_from_mesh(base: &SourceMesh, target: &SourceMesh, name: &str) -> io::Result<ShapeKey> {
    if base.vertices.len() != target.vertices.len() || base.faces.len() != target.faces.len() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "shape \"{}\" has {} vertices and {} faces, \"{}\" has {} and {}",
                name,
                target.vertices.len(),
                target.faces.len(),
                base.name,
                base.vertices.len(),
                base.faces.len()
            ),
        ));
    }
    Ok(ShapeKey {
        name: name.to_string(),
        positions: target.vertices.iter().map(|v| v.position).collect(),
        vertex_normals: target.vertices.iter().map(|v| v.normal).collect(),
        face_normals: target.faces.iter().map(|f| f.normal).collect(),
    })
}
