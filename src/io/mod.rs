pub mod csv;
pub mod obj;
pub mod stl;
pub mod vtk;

use crate::geom::mesh::TriangleMesh;
use anyhow::{Result, bail};
use std::path::Path;

pub use csv::write_panel_forces;
pub use obj::read_obj;
pub use stl::{StlFormat, read_stl, write_stl};
pub use vtk::{write_panel_scalars, write_population, write_rays};

/// Reads a mesh, picking the format from the file extension
/// (`.obj` or `.stl`, case-insensitive).
pub fn read_mesh(path: &Path) -> Result<TriangleMesh> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("obj") => read_obj(path),
        Some("stl") => read_stl(path),
        _ => bail!("Unsupported mesh format: {}", path.display()),
    }
}
