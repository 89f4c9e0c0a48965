use rand::Rng;

use crate::Vector;
use crate::geom::frame::Frame;

/// Defines how particle directions change at a wall.
pub trait ReflectionModel {
    /// Computes the reflected unit direction given incident direction and surface normal.
    fn reflect<R: Rng + ?Sized>(&self, incident: Vector, normal: Vector, rng: &mut R) -> Vector;
}

/// Cosine-weighted unit direction in the hemisphere around `frame.axis`
/// (Malley's method: uniform disk sample projected onto the hemisphere).
pub fn cosine_weighted_direction<R: Rng + ?Sized>(frame: &Frame, rng: &mut R) -> Vector {
    let u1: f64 = rng.r#gen();
    let u2: f64 = rng.r#gen();
    let r = u1.sqrt();
    let phi = 2.0 * std::f64::consts::PI * u2;
    let x = r * phi.cos();
    let y = r * phi.sin();
    let z = (1.0 - u1).max(0.0).sqrt(); // = sqrt(1 - r^2)

    frame.to_world(x, y, z)
}

/// Perfect specular (mirror) reflection.
pub struct Specular;

impl ReflectionModel for Specular {
    fn reflect<R: Rng + ?Sized>(&self, incident: Vector, normal: Vector, _rng: &mut R) -> Vector {
        let reflected = incident.reflect(normal);
        reflected.normalize().unwrap_or(reflected)
    }
}

/// Lambertian diffuse re-emission.
pub struct Diffuse;

impl ReflectionModel for Diffuse {
    fn reflect<R: Rng + ?Sized>(&self, incident: Vector, normal: Vector, rng: &mut R) -> Vector {
        // Re-emit on the side the particle came from.
        let hemisphere_normal = if incident.dot(normal) >= 0.0 {
            -normal
        } else {
            normal
        };
        match Frame::around(hemisphere_normal) {
            Some(frame) => cosine_weighted_direction(&frame, rng),
            None => -incident,
        }
    }
}

/// Specular with a given probability, diffuse otherwise.
pub struct Hybrid {
    /// Probability [0, 1] of a mirror reflection.
    pub specular_probability: f64,
}

impl Hybrid {
    pub fn new(specular_probability: f64) -> Self {
        Self {
            specular_probability: specular_probability.clamp(0.0, 1.0),
        }
    }
}

impl ReflectionModel for Hybrid {
    fn reflect<R: Rng + ?Sized>(&self, incident: Vector, normal: Vector, rng: &mut R) -> Vector {
        let r: f64 = rng.r#gen();
        if r < self.specular_probability {
            Specular.reflect(incident, normal, rng)
        } else {
            Diffuse.reflect(incident, normal, rng)
        }
    }
}
