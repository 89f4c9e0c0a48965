//! Ray casting infrastructure.
//!
//! This module provides a Ray struct and the ray-triangle intersection test
//! used by the particle tracer.

use crate::{Point, Vector};

/// Below this |determinant| the ray is treated as parallel to the triangle plane.
const PARALLEL_EPS: f64 = 1e-12;

/// Smallest accepted ray parameter. Excludes hits at the emission point.
pub const T_MIN: f64 = 1e-9;

/// A ray defined by an origin point and a direction vector.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    /// Origin point of the ray
    pub origin: Point,
    /// Unit direction vector
    pub direction: Vector,
}

impl Ray {
    /// Creates a new ray from origin point and direction vector.
    ///
    /// The direction vector is automatically normalized.
    pub fn new(origin: Point, direction: Vector) -> Option<Self> {
        let normalized = direction.normalize()?;
        Some(Self {
            origin,
            direction: normalized,
        })
    }

    /// Returns the point along the ray at parameter t.
    ///
    /// point = origin + t * direction
    pub fn point_at(&self, t: f64) -> Point {
        self.origin + self.direction * t
    }

    /// Möller-Trumbore ray-triangle test.
    ///
    /// Returns the ray parameter `t > T_MIN` of the hit, or `None`.
    /// Barycentric coordinates on the triangle boundary are accepted.
    pub fn intersect_triangle(&self, v0: Point, v1: Point, v2: Point) -> Option<f64> {
        let edge1 = v1 - v0;
        let edge2 = v2 - v0;
        let h = self.direction.cross(edge2);
        let a = edge1.dot(h);
        if a.abs() < PARALLEL_EPS {
            return None;
        }

        let f = 1.0 / a;
        let s = self.origin - v0;
        let u = f * s.dot(h);
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(edge1);
        let v = f * self.direction.dot(q);
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = f * edge2.dot(q);
        (t > T_MIN).then_some(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xy_triangle() -> [Point; 3] {
        [
            Point::new(0.0, 0.0, 0.0),
            Point::new(2.0, 0.0, 0.0),
            Point::new(0.0, 2.0, 0.0),
        ]
    }

    #[test]
    fn test_ray_creation() {
        assert!(Ray::new(Point::new(0.0, 0.0, 0.0), Vector::new(3.0, 0.0, 0.0)).is_some());
        // Zero direction should fail
        assert!(Ray::new(Point::new(0.0, 0.0, 0.0), Vector::zero()).is_none());
    }

    #[test]
    fn test_ray_point_at() {
        let ray = Ray::new(Point::new(0.0, 0.0, 0.0), Vector::new(1.0, 0.0, 0.0)).unwrap();
        assert!(ray.point_at(5.0).is_close(&Point::new(5.0, 0.0, 0.0)));
    }

    #[test]
    fn test_triangle_hit_from_both_sides() {
        let [a, b, c] = xy_triangle();
        let below = Ray::new(Point::new(0.5, 0.5, -5.0), Vector::new(0.0, 0.0, 1.0)).unwrap();
        let t = below.intersect_triangle(a, b, c).unwrap();
        assert!((t - 5.0).abs() < 1e-12);

        let above = Ray::new(Point::new(0.5, 0.5, 3.0), Vector::new(0.0, 0.0, -1.0)).unwrap();
        let t = above.intersect_triangle(a, b, c).unwrap();
        assert!((t - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_triangle_miss_behind() {
        let [a, b, c] = xy_triangle();
        let ray = Ray::new(Point::new(0.5, 0.5, -5.0), Vector::new(0.0, 0.0, -1.0)).unwrap();
        assert!(ray.intersect_triangle(a, b, c).is_none());
    }

    #[test]
    fn test_triangle_parallel() {
        let [a, b, c] = xy_triangle();
        let ray = Ray::new(Point::new(0.5, 0.5, 1.0), Vector::new(1.0, 0.0, 0.0)).unwrap();
        assert!(ray.intersect_triangle(a, b, c).is_none());
    }

    #[test]
    fn test_triangle_outside_bounds() {
        let [a, b, c] = xy_triangle();
        // Inside the bounding square but beyond the hypotenuse (u + v > 1)
        let ray = Ray::new(Point::new(1.5, 1.5, -1.0), Vector::new(0.0, 0.0, 1.0)).unwrap();
        assert!(ray.intersect_triangle(a, b, c).is_none());
    }

    #[test]
    fn test_triangle_vertex_counts_as_hit() {
        let [a, b, c] = xy_triangle();
        let ray = Ray::new(Point::new(0.0, 0.0, 1.0), Vector::new(0.0, 0.0, -1.0)).unwrap();
        assert!(ray.intersect_triangle(a, b, c).is_some());
    }

    #[test]
    fn test_origin_on_triangle_is_not_a_hit() {
        let [a, b, c] = xy_triangle();
        let ray = Ray::new(Point::new(0.5, 0.5, 0.0), Vector::new(0.0, 0.0, 1.0)).unwrap();
        assert!(ray.intersect_triangle(a, b, c).is_none());
    }
}
