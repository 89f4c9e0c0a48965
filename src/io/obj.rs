//! Wavefront OBJ reader.
//!
//! Only `v` and `f` records are used. Polygons are fan-triangulated and every
//! resulting triangle becomes its own panel.

use crate::Point;
use crate::Vector;
use crate::geom::mesh::{PanelId, Triangle, TriangleMesh};
use anyhow::{Context, Result, anyhow, bail};
use log::{debug, warn};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Reads an OBJ file into an outward-oriented mesh.
pub fn read_obj(path: &Path) -> Result<TriangleMesh> {
    let file =
        File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;
    parse_obj(BufReader::new(file))
        .with_context(|| format!("Failed to parse OBJ: {}", path.display()))
}

/// Parses OBJ text from any reader.
pub fn parse_obj<R: BufRead>(reader: R) -> Result<TriangleMesh> {
    let mut vertices: Vec<Point> = Vec::new();
    let mut triangles: Vec<Triangle> = Vec::new();
    let mut skipped = 0usize;

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("v") => {
                let coords: Vec<f64> = parts
                    .take(3)
                    .map(|s| s.parse::<f64>())
                    .collect::<std::result::Result<_, _>>()
                    .with_context(|| format!("Invalid vertex on line {}", line_no + 1))?;
                if coords.len() != 3 {
                    bail!("Vertex on line {} has {} coordinates", line_no + 1, coords.len());
                }
                vertices.push(Point::new(coords[0], coords[1], coords[2]));
            }
            Some("f") => {
                let idx: Vec<usize> = parts
                    .map(|tok| resolve_index(tok, vertices.len()))
                    .collect::<Result<_>>()
                    .with_context(|| format!("Invalid face on line {}", line_no + 1))?;
                if idx.len() < 3 {
                    bail!("Face on line {} has {} vertices", line_no + 1, idx.len());
                }
                // Fan around the first corner
                for k in 1..idx.len() - 1 {
                    let (a, b, c) = (idx[0], idx[k], idx[k + 1]);
                    if a == b
                        || b == c
                        || a == c
                        || Vector::normal(vertices[a], vertices[b], vertices[c]).is_none()
                    {
                        warn!("Skipping degenerate triangle on line {}", line_no + 1);
                        skipped += 1;
                        continue;
                    }
                    triangles.push(Triangle::new(a, b, c, triangles.len() as PanelId));
                }
            }
            _ => {}
        }
    }

    debug!(
        "OBJ: {} vertices, {} triangles, {} degenerate skipped",
        vertices.len(),
        triangles.len(),
        skipped
    );
    let mut mesh = TriangleMesh::new(vertices, triangles)?;
    mesh.orient_outward();
    Ok(mesh)
}

/// Turns a face token (`7`, `7/1`, `7/1/3`, `-1`...) into a zero-based
/// vertex index. Negative indices count back from the last vertex read.
fn resolve_index(token: &str, vertex_count: usize) -> Result<usize> {
    let raw = token
        .split('/')
        .next()
        .ok_or_else(|| anyhow!("Empty face token"))?;
    let i: i64 = raw
        .parse()
        .with_context(|| format!("Invalid face index '{raw}'"))?;
    let resolved = match i {
        0 => bail!("Face index 0 is not valid"),
        i if i > 0 => i - 1,
        i => vertex_count as i64 + i,
    };
    if resolved < 0 || resolved as usize >= vertex_count {
        bail!("Face index {i} out of range for {vertex_count} vertices");
    }
    Ok(resolved as usize)
}
