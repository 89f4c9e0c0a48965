pub mod reflection;

use std::sync::Arc;

use crate::geom::mesh::{PanelId, TriangleMesh};
use crate::geom::ray::Ray;
use crate::{Point, Vector};

/// Closest surface hit along a ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitInfo {
    pub point: Point,
    /// Unit normal on the side the ray came from
    pub normal: Vector,
    pub panel_id: PanelId,
    /// Distance along the (unit) ray direction
    pub t: f64,
}

/// Nearest-hit queries against a shared, read-only triangle mesh.
///
/// Every query scans all triangles. Target bodies have at most a few
/// thousand triangles, so no spatial index is built.
#[derive(Debug, Clone, Default)]
pub struct IntersectionEngine {
    mesh: Option<Arc<TriangleMesh>>,
}

impl IntersectionEngine {
    pub fn new(mesh: Arc<TriangleMesh>) -> Self {
        Self { mesh: Some(mesh) }
    }

    /// Replaces the active geometry.
    pub fn set_mesh(&mut self, mesh: Arc<TriangleMesh>) {
        self.mesh = Some(mesh);
    }

    pub fn mesh(&self) -> Option<&Arc<TriangleMesh>> {
        self.mesh.as_ref()
    }

    /// True if a non-empty mesh is bound.
    pub fn has_geometry(&self) -> bool {
        self.mesh.as_ref().is_some_and(|m| !m.is_empty())
    }

    /// Finds the closest triangle hit by `ray`.
    ///
    /// Among equal distances the first triangle in mesh order wins.
    pub fn intersect(&self, ray: &Ray) -> Option<HitInfo> {
        let mesh = self.mesh.as_ref()?;

        let mut closest: Option<(usize, f64)> = None;
        for (idx, tri) in mesh.triangles().iter().enumerate() {
            let [a, b, c] = mesh.corners(tri);
            if let Some(t) = ray.intersect_triangle(a, b, c) {
                match closest {
                    None => closest = Some((idx, t)),
                    Some((_, best_t)) if t < best_t => closest = Some((idx, t)),
                    _ => {}
                }
            }
        }

        let (idx, t) = closest?;
        let tri = &mesh.triangles()[idx];
        // A triangle degenerate enough to have no normal cannot pass the
        // determinant test above.
        let mut normal = mesh.triangle_normal(tri)?;
        if normal.dot(ray.direction) > 0.0 {
            normal = -normal;
        }
        Some(HitInfo {
            point: ray.point_at(t),
            normal,
            panel_id: tri.panel_id,
            t,
        })
    }
}
