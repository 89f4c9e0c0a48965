//! Legacy ASCII VTK (POLYDATA) export for ParaView and friends.

use crate::Point;
use crate::geom::mesh::{PanelId, TriangleMesh};
use crate::sim::drag::Segment;
use crate::sim::particle::Particle;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

fn create(path: &Path) -> Result<BufWriter<File>> {
    let file =
        File::create(path).with_context(|| format!("Failed to create file: {}", path.display()))?;
    Ok(BufWriter::new(file))
}

fn write_header<W: Write>(w: &mut W, title: &str) -> Result<()> {
    writeln!(w, "# vtk DataFile Version 3.0")?;
    // Title line is limited to one line of text
    writeln!(w, "{}", title.replace('\n', " "))?;
    writeln!(w, "ASCII")?;
    writeln!(w, "DATASET POLYDATA")?;
    Ok(())
}

fn write_points<W: Write>(w: &mut W, points: impl ExactSizeIterator<Item = Point>) -> Result<()> {
    writeln!(w, "POINTS {} double", points.len())?;
    for p in points {
        writeln!(w, "{} {} {}", p.x, p.y, p.z)?;
    }
    Ok(())
}

fn write_polygons<W: Write>(w: &mut W, mesh: &TriangleMesh) -> Result<()> {
    let n = mesh.triangle_count();
    writeln!(w, "POLYGONS {} {}", n, n * 4)?;
    for tri in mesh.triangles() {
        writeln!(w, "3 {} {} {}", tri.v1, tri.v2, tri.v3)?;
    }
    Ok(())
}

/// Writes the mesh with one scalar per triangle, looked up by panel id.
/// Panels missing from `values` get zero.
pub fn write_panel_scalars(
    path: &Path,
    mesh: &TriangleMesh,
    values: &BTreeMap<PanelId, f64>,
    name: &str,
) -> Result<()> {
    let mut w = create(path)?;
    write_header(&mut w, "fmdrag panel data")?;
    write_points(&mut w, mesh.vertices().iter().copied())?;
    write_polygons(&mut w, mesh)?;

    writeln!(w, "CELL_DATA {}", mesh.triangle_count())?;
    writeln!(w, "SCALARS {} double 1", name)?;
    writeln!(w, "LOOKUP_TABLE default")?;
    for tri in mesh.triangles() {
        writeln!(w, "{}", values.get(&tri.panel_id).copied().unwrap_or(0.0))?;
    }

    w.flush()?;
    Ok(())
}

/// Writes the mesh together with ray path segments as lines.
pub fn write_rays(path: &Path, mesh: &TriangleMesh, segments: &[Segment]) -> Result<()> {
    let mut w = create(path)?;
    write_header(&mut w, "fmdrag ray paths")?;

    let offset = mesh.vertices().len();
    let points = mesh
        .vertices()
        .iter()
        .copied()
        .chain(segments.iter().flat_map(|(a, b)| [*a, *b]));
    write_points(&mut w, points.collect::<Vec<_>>().into_iter())?;
    write_polygons(&mut w, mesh)?;

    writeln!(w, "LINES {} {}", segments.len(), segments.len() * 3)?;
    for i in 0..segments.len() {
        let a = offset + 2 * i;
        writeln!(w, "2 {} {}", a, a + 1)?;
    }

    w.flush()?;
    Ok(())
}

/// Writes particle origins as vertices with their velocity as point vectors.
pub fn write_population(path: &Path, particles: &[Particle]) -> Result<()> {
    let mut w = create(path)?;
    write_header(&mut w, "fmdrag injected population")?;
    write_points(&mut w, particles.iter().map(|p| p.origin))?;

    let n = particles.len();
    writeln!(w, "VERTICES {} {}", n, n * 2)?;
    for i in 0..n {
        writeln!(w, "1 {}", i)?;
    }

    writeln!(w, "POINT_DATA {}", n)?;
    writeln!(w, "VECTORS velocity double")?;
    for p in particles {
        writeln!(w, "{} {} {}", p.velocity.dx, p.velocity.dy, p.velocity.dz)?;
    }
    writeln!(w, "SCALARS weight double 1")?;
    writeln!(w, "LOOKUP_TABLE default")?;
    for p in particles {
        writeln!(w, "{}", p.weight)?;
    }

    w.flush()?;
    Ok(())
}
