//! Triangulated body surface with per-triangle panel ids.

use std::collections::BTreeMap;

use crate::error::{DragError, Result};
use crate::geom::bboxes::{bounding_box, padded_bounding_box};
use crate::{Point, Vector};

/// Force-reporting unit of surface. Normally one per triangle.
pub type PanelId = i32;

/// Three vertex indices plus the panel the triangle belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Triangle {
    pub v1: usize,
    pub v2: usize,
    pub v3: usize,
    pub panel_id: PanelId,
}

impl Triangle {
    pub fn new(v1: usize, v2: usize, v3: usize, panel_id: PanelId) -> Self {
        Self {
            v1,
            v2,
            v3,
            panel_id,
        }
    }
}

/// Immutable vertex/triangle list the tracer runs against.
#[derive(Debug, Clone, Default)]
pub struct TriangleMesh {
    vertices: Vec<Point>,
    triangles: Vec<Triangle>,
}

impl TriangleMesh {
    /// Creates a mesh after checking that every vertex index is valid
    /// and every panel id is non-negative.
    pub fn new(vertices: Vec<Point>, triangles: Vec<Triangle>) -> Result<Self> {
        let n = vertices.len();
        for (i, tri) in triangles.iter().enumerate() {
            if tri.v1 >= n || tri.v2 >= n || tri.v3 >= n {
                return Err(DragError::GeometryUnavailable(format!(
                    "triangle {i} references a vertex outside 0..{n}"
                )));
            }
            if tri.panel_id < 0 {
                return Err(DragError::GeometryUnavailable(format!(
                    "triangle {i} has negative panel id {}",
                    tri.panel_id
                )));
            }
        }
        Ok(Self {
            vertices,
            triangles,
        })
    }

    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Returns the corner points of `tri`.
    pub fn corners(&self, tri: &Triangle) -> [Point; 3] {
        [
            self.vertices[tri.v1],
            self.vertices[tri.v2],
            self.vertices[tri.v3],
        ]
    }

    /// Geometric normal following the winding `v1 -> v2 -> v3`.
    pub fn triangle_normal(&self, tri: &Triangle) -> Option<Vector> {
        let [a, b, c] = self.corners(tri);
        Vector::normal(a, b, c)
    }

    pub fn triangle_area(&self, tri: &Triangle) -> f64 {
        let [a, b, c] = self.corners(tri);
        0.5 * (b - a).cross(c - a).length()
    }

    pub fn total_area(&self) -> f64 {
        self.triangles.iter().map(|t| self.triangle_area(t)).sum()
    }

    /// Area of every panel (sum over the triangles sharing its id).
    pub fn panel_areas(&self) -> BTreeMap<PanelId, f64> {
        let mut areas = BTreeMap::new();
        for tri in &self.triangles {
            *areas.entry(tri.panel_id).or_insert(0.0) += self.triangle_area(tri);
        }
        areas
    }

    pub fn bounding_box(&self) -> Option<(Point, Point)> {
        bounding_box(&self.vertices)
    }

    pub fn padded_bounding_box(&self, padding_fraction: f64) -> Option<(Point, Point)> {
        padded_bounding_box(&self.vertices, padding_fraction)
    }

    /// Center of the (padded) bounding box.
    pub fn center(&self, padding_fraction: f64) -> Option<Point> {
        let (pmin, pmax) = self.padded_bounding_box(padding_fraction)?;
        Some(Point::new_between_2_points(pmin, pmax, 0.5))
    }

    /// Diagonal length of the (padded) bounding box.
    pub fn size(&self, padding_fraction: f64) -> Option<f64> {
        let (pmin, pmax) = self.padded_bounding_box(padding_fraction)?;
        Some((pmax - pmin).length())
    }

    /// Flips the winding of every triangle whose normal points toward the
    /// bounding box center. Returns the number of flipped triangles.
    ///
    /// Exact for convex bodies; a heuristic otherwise.
    pub fn orient_outward(&mut self) -> usize {
        let Some(center) = self.center(0.0) else {
            return 0;
        };
        let mut flipped = 0;
        for i in 0..self.triangles.len() {
            let tri = self.triangles[i];
            let [a, b, c] = self.corners(&tri);
            let Some(normal) = Vector::normal(a, b, c) else {
                continue;
            };
            let face_center = Point::new(
                (a.x + b.x + c.x) / 3.0,
                (a.y + b.y + c.y) / 3.0,
                (a.z + b.z + c.z) / 3.0,
            );
            if normal.dot(face_center - center) < 0.0 {
                let t = &mut self.triangles[i];
                std::mem::swap(&mut t.v1, &mut t.v2);
                flipped += 1;
            }
        }
        flipped
    }

    /// Assigns panel id = triangle index.
    pub fn renumber_panels(&mut self) {
        for (i, tri) in self.triangles.iter_mut().enumerate() {
            tri.panel_id = i as PanelId;
        }
    }

    /// Axis-aligned box `[min, max]` made of 12 outward-wound triangles,
    /// one panel per triangle.
    pub fn cuboid(min: Point, max: Point) -> Self {
        let vertices = vec![
            Point::new(min.x, min.y, min.z),
            Point::new(max.x, min.y, min.z),
            Point::new(max.x, max.y, min.z),
            Point::new(min.x, max.y, min.z),
            Point::new(min.x, min.y, max.z),
            Point::new(max.x, min.y, max.z),
            Point::new(max.x, max.y, max.z),
            Point::new(min.x, max.y, max.z),
        ];
        let faces = [
            (0, 2, 1),
            (0, 3, 2), // bottom
            (4, 5, 6),
            (4, 6, 7), // top
            (0, 1, 5),
            (0, 5, 4), // front
            (2, 3, 7),
            (2, 7, 6), // back
            (0, 4, 7),
            (0, 7, 3), // left
            (1, 2, 6),
            (1, 6, 5), // right
        ];
        let triangles = faces
            .iter()
            .enumerate()
            .map(|(i, &(a, b, c))| Triangle::new(a, b, c, i as PanelId))
            .collect();
        Self {
            vertices,
            triangles,
        }
    }
}
