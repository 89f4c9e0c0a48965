//! STL file format I/O.
//!
//! STL stores raw triangles with normals. Shared corners are merged on
//! reading and every triangle becomes its own panel.

use crate::geom::mesh::{PanelId, Triangle, TriangleMesh};
use crate::{Point, Vector};
use anyhow::{Context, Result, bail};
use log::warn;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

/// STL file format variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StlFormat {
    /// ASCII text format (human-readable, larger file size)
    Ascii,
    /// Binary format (compact, faster to read/write)
    Binary,
}

/// Writes a mesh to an STL file.
pub fn write_stl(path: &Path, mesh: &TriangleMesh, name: &str, format: StlFormat) -> Result<()> {
    match format {
        StlFormat::Ascii => write_stl_ascii(path, mesh, name),
        StlFormat::Binary => write_stl_binary(path, mesh, name),
    }
}

fn facet_normal(mesh: &TriangleMesh, tri: &Triangle) -> Vector {
    mesh.triangle_normal(tri).unwrap_or(Vector::zero())
}

/// Writes a mesh to an ASCII STL file.
fn write_stl_ascii(path: &Path, mesh: &TriangleMesh, name: &str) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("Failed to create file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "solid {}", name)?;
    for tri in mesh.triangles() {
        let n = facet_normal(mesh, tri);
        writeln!(writer, "  facet normal {:e} {:e} {:e}", n.dx, n.dy, n.dz)?;
        writeln!(writer, "    outer loop")?;
        for p in mesh.corners(tri) {
            writeln!(writer, "      vertex {:e} {:e} {:e}", p.x, p.y, p.z)?;
        }
        writeln!(writer, "    endloop")?;
        writeln!(writer, "  endfacet")?;
    }
    writeln!(writer, "endsolid {}", name)?;

    writer.flush()?;
    Ok(())
}

/// Writes a mesh to a binary STL file.
fn write_stl_binary(path: &Path, mesh: &TriangleMesh, name: &str) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("Failed to create file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    // 80-byte header, name padded with zeros
    let mut header = [0u8; 80];
    let name_bytes = name.as_bytes();
    let len = name_bytes.len().min(80);
    header[..len].copy_from_slice(&name_bytes[..len]);
    writer.write_all(&header)?;

    let num_triangles = mesh.triangle_count() as u32;
    writer.write_all(&num_triangles.to_le_bytes())?;

    for tri in mesh.triangles() {
        let n = facet_normal(mesh, tri);
        for c in [n.dx, n.dy, n.dz] {
            writer.write_all(&(c as f32).to_le_bytes())?;
        }
        for p in mesh.corners(tri) {
            for c in [p.x, p.y, p.z] {
                writer.write_all(&(c as f32).to_le_bytes())?;
            }
        }
        // Attribute byte count
        writer.write_all(&0u16.to_le_bytes())?;
    }

    writer.flush()?;
    Ok(())
}

/// Reads an STL file (ASCII or binary, detected automatically).
///
/// Triangles get sequential panel ids and are oriented outward.
pub fn read_stl(path: &Path) -> Result<TriangleMesh> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to open file: {}", path.display()))?;

    // Binary files may also start with "solid", so look for ASCII keywords too
    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(512)]);
    let (vertices, corners) = if head.trim_start().starts_with("solid")
        && (head.contains("facet") || head.contains("vertex"))
    {
        parse_stl_ascii(BufReader::new(bytes.as_slice()))
            .with_context(|| format!("Failed to parse ASCII STL: {}", path.display()))?
    } else {
        parse_stl_binary(bytes.as_slice())
            .with_context(|| format!("Failed to parse binary STL: {}", path.display()))?
    };

    build_mesh(vertices, corners)
}

type Corners = Vec<[usize; 3]>;

fn parse_stl_ascii<R: BufRead>(reader: R) -> Result<(Vec<Point>, Corners)> {
    let mut vertices: Vec<Point> = Vec::new();
    let mut faces: Corners = Vec::new();
    let mut vertex_map: HashMap<(i64, i64, i64), usize> = HashMap::new();

    let mut current_vertices: Vec<Point> = Vec::new();

    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();

        if trimmed.starts_with("vertex") {
            let parts: Vec<&str> = trimmed.split_whitespace().collect();
            if parts.len() >= 4 {
                let x: f64 = parts[1].parse().context("Invalid vertex x")?;
                let y: f64 = parts[2].parse().context("Invalid vertex y")?;
                let z: f64 = parts[3].parse().context("Invalid vertex z")?;
                current_vertices.push(Point::new(x, y, z));
            }
        } else if trimmed.starts_with("endloop") {
            if current_vertices.len() == 3 {
                let i0 = add_dedup_vertex(&mut vertex_map, &mut vertices, current_vertices[0]);
                let i1 = add_dedup_vertex(&mut vertex_map, &mut vertices, current_vertices[1]);
                let i2 = add_dedup_vertex(&mut vertex_map, &mut vertices, current_vertices[2]);
                faces.push([i0, i1, i2]);
            } else {
                warn!("Skipping STL facet with {} vertices", current_vertices.len());
            }
            current_vertices.clear();
        }
    }

    Ok((vertices, faces))
}

fn parse_stl_binary(mut reader: &[u8]) -> Result<(Vec<Point>, Corners)> {
    // Skip 80-byte header
    let mut header = [0u8; 80];
    reader.read_exact(&mut header).context("Truncated header")?;

    let mut count_bytes = [0u8; 4];
    reader
        .read_exact(&mut count_bytes)
        .context("Missing triangle count")?;
    let num_triangles = u32::from_le_bytes(count_bytes) as usize;
    if reader.len() < num_triangles * 50 {
        bail!(
            "File holds {} bytes of facets, {} triangles need {}",
            reader.len(),
            num_triangles,
            num_triangles * 50
        );
    }

    let mut vertices: Vec<Point> = Vec::with_capacity(num_triangles * 3);
    let mut faces: Corners = Vec::with_capacity(num_triangles);
    let mut vertex_map: HashMap<(i64, i64, i64), usize> = HashMap::new();

    for _ in 0..num_triangles {
        // Skip normal (3 x f32 = 12 bytes)
        let mut normal_bytes = [0u8; 12];
        reader.read_exact(&mut normal_bytes)?;

        let mut tri_idx: [usize; 3] = [0; 3];
        for slot in tri_idx.iter_mut() {
            let mut v_bytes = [0u8; 12];
            reader.read_exact(&mut v_bytes)?;

            let x = f32::from_le_bytes([v_bytes[0], v_bytes[1], v_bytes[2], v_bytes[3]]) as f64;
            let y = f32::from_le_bytes([v_bytes[4], v_bytes[5], v_bytes[6], v_bytes[7]]) as f64;
            let z = f32::from_le_bytes([v_bytes[8], v_bytes[9], v_bytes[10], v_bytes[11]]) as f64;

            *slot = add_dedup_vertex(&mut vertex_map, &mut vertices, Point::new(x, y, z));
        }

        // Skip attribute byte count (2 bytes)
        let mut attr_bytes = [0u8; 2];
        reader.read_exact(&mut attr_bytes)?;

        faces.push(tri_idx);
    }

    Ok((vertices, faces))
}

/// Drops degenerate triangles, numbers panels and orients the result outward.
fn build_mesh(vertices: Vec<Point>, corners: Corners) -> Result<TriangleMesh> {
    let mut triangles = Vec::with_capacity(corners.len());
    for [a, b, c] in corners {
        if a == b
            || b == c
            || a == c
            || Vector::normal(vertices[a], vertices[b], vertices[c]).is_none()
        {
            warn!("Skipping degenerate STL facet ({a}, {b}, {c})");
            continue;
        }
        triangles.push(Triangle::new(a, b, c, triangles.len() as PanelId));
    }
    let mut mesh = TriangleMesh::new(vertices, triangles)?;
    mesh.orient_outward();
    Ok(mesh)
}

const STL_DEDUP_SCALE: f64 = 1e9;

fn stl_vertex_key(p: Point) -> (i64, i64, i64) {
    (
        (p.x * STL_DEDUP_SCALE).round() as i64,
        (p.y * STL_DEDUP_SCALE).round() as i64,
        (p.z * STL_DEDUP_SCALE).round() as i64,
    )
}

fn add_dedup_vertex(
    map: &mut HashMap<(i64, i64, i64), usize>,
    vertices: &mut Vec<Point>,
    p: Point,
) -> usize {
    let key = stl_vertex_key(p);
    if let Some(&idx) = map.get(&key) {
        return idx;
    }
    let idx = vertices.len();
    vertices.push(p);
    map.insert(key, idx);
    idx
}
