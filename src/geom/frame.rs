//! Orthonormal frames built around a single axis.

use crate::Vector;

/// Right-handed orthonormal basis `(tangent, bitangent, axis)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub tangent: Vector,
    pub bitangent: Vector,
    pub axis: Vector,
}

impl Frame {
    /// Builds a frame whose third vector is the normalized `axis`.
    ///
    /// Returns `None` for a zero-length axis.
    pub fn around(axis: Vector) -> Option<Self> {
        let n = axis.normalize()?;
        let arbitrary = if n.dx.abs() < 0.9 {
            Vector::new(1.0, 0.0, 0.0)
        } else {
            Vector::new(0.0, 1.0, 0.0)
        };
        let tangent = n.cross(arbitrary).normalize()?;
        let bitangent = n.cross(tangent);
        Some(Self {
            tangent,
            bitangent,
            axis: n,
        })
    }

    /// Maps local coordinates `(x, y, z)` to world space.
    pub fn to_world(&self, x: f64, y: f64, z: f64) -> Vector {
        self.tangent * x + self.bitangent * y + self.axis * z
    }
}
