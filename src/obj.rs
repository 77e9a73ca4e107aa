use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::geometry::MeshData;

/// Serializes mesh buffers as Wavefront OBJ text.
///
/// Positions become `v` lines and triangles `f` lines with the 1-based
/// indices the format expects. Normals are left to the importer.
pub fn obj_string(mesh: &MeshData) -> String {
    let mut out = String::new();
    for chunk in mesh.positions.chunks_exact(3) {
        out.push_str(&format!("v {} {} {}\n", chunk[0], chunk[1], chunk[2]));
    }
    for triangle in mesh.indices.chunks_exact(3) {
        out.push_str(&format!(
            "f {} {} {}\n",
            triangle[0] + 1,
            triangle[1] + 1,
            triangle[2] + 1
        ));
    }
    out
}

/// Writes the mesh to disk for inspection in external tools.
pub fn export_obj(mesh: &MeshData, path: &Path) -> Result<()> {
    fs::write(path, obj_string(mesh))
        .with_context(|| format!("failed to write OBJ file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PointerConfig;
    use crate::geometry::PointerGeometry;

    #[test]
    fn faces_use_one_based_indices() {
        let mesh = MeshData {
            positions: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            indices: vec![0, 1, 2],
        };
        assert_eq!(obj_string(&mesh), "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n");
    }

    #[test]
    fn pointer_mesh_exports_every_vertex_and_face() {
        let config = PointerConfig::default();
        let geometry = PointerGeometry::new(&config);
        let text = obj_string(&geometry.mesh_data());
        let vertex_lines = text.lines().filter(|line| line.starts_with("v ")).count();
        let face_lines = text.lines().filter(|line| line.starts_with("f ")).count();
        assert_eq!(vertex_lines, config.vertex_count());
        assert_eq!(face_lines, (config.rings + 1) * config.segments * 2);
    }

    #[test]
    fn export_writes_the_file() {
        let mesh = MeshData {
            positions: vec![0.0, 0.0, 0.0],
            indices: vec![],
        };
        let file = tempfile::NamedTempFile::new().unwrap();
        export_obj(&mesh, file.path()).unwrap();
        let contents = fs::read_to_string(file.path()).unwrap();
        assert_eq!(contents, "v 0 0 0\n");
    }
}
