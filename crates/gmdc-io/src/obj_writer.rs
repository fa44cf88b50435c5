//! Wavefront OBJ writer.
//!
//! Each added mesh becomes one `o` object. Texture coordinates are written
//! per triangle corner, normals per vertex.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use glam::{Vec2, Vec3};
use tracing::info;

use gmdc_mesh::{UnpackedBoundingMesh, UnpackedMesh};

use crate::traits::Writer;

#[derive(Debug, Clone)]
struct ObjObject {
    name: String,
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    triangles: Vec<[u32; 3]>,
    uvs: Vec<[Vec2; 3]>,
}

impl ObjObject {
    fn check(&self) -> io::Result<()> {
        let bad = |msg: String| Err(io::Error::new(io::ErrorKind::InvalidInput, msg));
        if !self.normals.is_empty() && self.normals.len() != self.positions.len() {
            return bad(format!(
                "\"{}\": {} normals for {} vertices",
                self.name,
                self.normals.len(),
                self.positions.len()
            ));
        }
        if !self.uvs.is_empty() && self.uvs.len() != self.triangles.len() {
            return bad(format!(
                "\"{}\": {} UV triples for {} triangles",
                self.name,
                self.uvs.len(),
                self.triangles.len()
            ));
        }
        if let Some(v) = self
            .triangles
            .iter()
            .flatten()
            .find(|&&v| v as usize >= self.positions.len())
        {
            return bad(format!(
                "\"{}\": vertex index {} out of range ({} vertices)",
                self.name,
                v,
                self.positions.len()
            ));
        }
        Ok(())
    }
}

/// OBJ format writer.
#[derive(Debug, Default)]
pub struct ObjWriter {
    objects: Vec<ObjObject>,
}

impl ObjWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_mesh(&mut self, mesh: &UnpackedMesh, name: Option<&str>) -> io::Result<()> {
        let object = ObjObject {
            name: name.unwrap_or(&mesh.name).to_string(),
            positions: mesh.positions.clone(),
            normals: mesh.normals.clone(),
            triangles: mesh.triangles.clone(),
            uvs: mesh.uvs.clone(),
        };
        object.check()?;
        self.objects.push(object);
        Ok(())
    }

    /// Adds a bounding shape as a flat object without normals or UVs.
    pub fn add_bounding_mesh(&mut self, mesh: &UnpackedBoundingMesh, name: &str) -> io::Result<()> {
        let object = ObjObject {
            name: name.to_string(),
            positions: mesh.positions.clone(),
            normals: Vec::new(),
            triangles: mesh.triangles.clone(),
            uvs: Vec::new(),
        };
        object.check()?;
        self.objects.push(object);
        Ok(())
    }

    pub fn write_to<W: Write>(&self, mut out: W) -> io::Result<()> {
        writeln!(out, "# gmdc {}", env!("CARGO_PKG_VERSION"))?;
        let (mut v_base, mut vt_base, mut vn_base) = (1usize, 1usize, 1usize);
        for object in &self.objects {
            writeln!(out, "o {}", object.name)?;
            for p in &object.positions {
                writeln!(out, "v {} {} {}", p.x, p.y, p.z)?;
            }
            for tri in &object.uvs {
                for uv in tri {
                    writeln!(out, "vt {} {}", uv.x, uv.y)?;
                }
            }
            for n in &object.normals {
                writeln!(out, "vn {} {} {}", n.x, n.y, n.z)?;
            }

            let has_uv = !object.uvs.is_empty();
            let has_normals = !object.normals.is_empty();
            writeln!(out, "s {}", if has_normals { "1" } else { "off" })?;
            for (t, tri) in object.triangles.iter().enumerate() {
                write!(out, "f")?;
                for (k, &v) in tri.iter().enumerate() {
                    let v = v as usize;
                    let vt = vt_base + t * 3 + k;
                    match (has_uv, has_normals) {
                        (true, true) => write!(out, " {}/{}/{}", v_base + v, vt, vn_base + v)?,
                        (true, false) => write!(out, " {}/{}", v_base + v, vt)?,
                        (false, true) => write!(out, " {}//{}", v_base + v, vn_base + v)?,
                        (false, false) => write!(out, " {}", v_base + v)?,
                    }
                }
                writeln!(out)?;
            }

            v_base += object.positions.len();
            vt_base += object.uvs.len() * 3;
            vn_base += object.normals.len();
        }
        out.flush()
    }
}

impl Writer for ObjWriter {
    fn new() -> Self {
        ObjWriter::new()
    }

    fn add_mesh(&mut self, mesh: &UnpackedMesh, name: Option<&str>) -> io::Result<()> {
        ObjWriter::add_mesh(self, mesh, name)
    }

    fn write<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();
        self.write_to(BufWriter::new(File::create(path)?))?;
        info!(
            "Wrote {} objects ({} vertices) to {}",
            self.objects.len(),
            self.vertex_count(),
            path.display()
        );
        Ok(())
    }

    fn vertex_count(&self) -> usize {
        self.objects.iter().map(|o| o.positions.len()).sum()
    }

    fn face_count(&self) -> usize {
        self.objects.iter().map(|o| o.triangles.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obj_reader::ObjReader;
    use crate::traits::Reader;
    use tempfile::NamedTempFile;

    fn triangle(name: &str) -> UnpackedMesh {
        UnpackedMesh {
            name: name.to_string(),
            positions: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            normals: vec![Vec3::Z; 3],
            triangles: vec![[0, 1, 2]],
            uvs: vec![[Vec2::ZERO, Vec2::X, Vec2::new(0.0, 0.5)]],
            ..Default::default()
        }
    }

    #[test]
    fn test_write_offsets_indices_per_object() {
        let mut writer = ObjWriter::new();
        writer.add_mesh(&triangle("a"), None).unwrap();
        writer.add_mesh(&triangle("a"), Some("b")).unwrap();
        let mut out = Vec::new();
        writer.write_to(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("o a\n"));
        assert!(text.contains("o b\n"));
        assert!(text.contains("f 1/1/1 2/2/2 3/3/3\n"));
        assert!(text.contains("f 4/4/4 5/5/5 6/6/6\n"));
        assert!(text.contains("vt 0 0.5\n"));
        assert_eq!(writer.vertex_count(), 6);
        assert_eq!(writer.face_count(), 2);
    }

    #[test]
    fn test_bounding_mesh_has_plain_faces() {
        let mut writer = ObjWriter::new();
        let shape = UnpackedBoundingMesh {
            positions: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            triangles: vec![[0, 1, 2]],
            groups: Vec::new(),
        };
        writer.add_bounding_mesh(&shape, "bounds").unwrap();
        let mut out = Vec::new();
        writer.write_to(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("s off\nf 1 2 3\n"));
    }

    #[test]
    fn test_rejects_out_of_range_triangle() {
        let mut mesh = triangle("bad");
        mesh.triangles[0] = [0, 1, 7];
        let err = ObjWriter::new().add_mesh(&mesh, None).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_file_round_trip() {
        let file = NamedTempFile::new().unwrap();
        let mut writer = ObjWriter::new();
        writer.add_mesh(&triangle("tri"), None).unwrap();
        Writer::write(&writer, file.path()).unwrap();

        let mesh = ObjReader::open(file.path()).unwrap().read_mesh().unwrap();
        assert_eq!(mesh.name, "tri");
        assert_eq!(
            mesh.vertices.iter().map(|v| v.position).collect::<Vec<_>>(),
            vec![Vec3::ZERO, Vec3::X, Vec3::Y]
        );
        assert!(mesh.faces[0].smooth);
        assert_eq!(mesh.faces[0].uv.as_ref().unwrap()[2], Vec2::new(0.0, 0.5));
    }
}
