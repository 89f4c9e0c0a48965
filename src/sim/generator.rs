//! Initial particle population on an injection plane upstream of the body.

use std::collections::BTreeMap;

use log::{debug, info};
use rand::Rng;

use crate::error::{DragError, Result};
use crate::geom::bboxes::corners;
use crate::geom::frame::Frame;
use crate::geom::mesh::TriangleMesh;
use crate::sim::drag::SimulationConfig;
use crate::sim::kinetic::MaxwellSampler;
use crate::sim::particle::Particle;
use crate::{Point, Vector};

/// Rectangle perpendicular to the flow from which particles are launched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InjectionPlane {
    pub center: Point,
    /// `axis` is the flow direction, the plane spans tangent and bitangent.
    pub frame: Frame,
    pub half_u: f64,
    pub half_v: f64,
}

impl InjectionPlane {
    /// Places the plane one body diagonal upstream of the mesh bounding box.
    ///
    /// Its half-extents cover the projection of the bounding box onto the
    /// plane plus `padding_fraction` of the diagonal on every side.
    pub fn upstream_of(mesh: &TriangleMesh, flow: Vector, padding_fraction: f64) -> Result<Self> {
        let frame = Frame::around(flow)
            .ok_or_else(|| DragError::Configuration("flow velocity is zero".to_string()))?;
        let (pmin, pmax) = mesh
            .bounding_box()
            .ok_or_else(|| DragError::GeometryUnavailable("mesh has no vertices".to_string()))?;

        let bb_center = Point::new_between_2_points(pmin, pmax, 0.5);
        let diag = (pmax - pmin).length();
        let side_padding = padding_fraction * diag;

        let extent = |dir: Vector| {
            let (lo, hi) = corners(pmin, pmax)
                .iter()
                .map(|c| Vector::from_a_point(*c).dot(dir))
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| {
                    (lo.min(x), hi.max(x))
                });
            0.5 * (hi - lo) + side_padding
        };

        Ok(Self {
            center: bb_center + frame.axis * -diag,
            frame,
            half_u: extent(frame.tangent),
            half_v: extent(frame.bitangent),
        })
    }

    pub fn area(&self) -> f64 {
        4.0 * self.half_u * self.half_v
    }

    /// Unit normal of the plane, pointing downstream.
    pub fn normal(&self) -> Vector {
        self.frame.axis
    }

    /// Uniformly distributed point on the plane.
    pub fn sample_point<R: Rng + ?Sized>(&self, rng: &mut R) -> Point {
        let u = (rng.r#gen::<f64>() * 2.0 - 1.0) * self.half_u;
        let v = (rng.r#gen::<f64>() * 2.0 - 1.0) * self.half_v;
        self.center + self.frame.to_world(u, v, 0.0)
    }
}

/// Particles ready for tracing, with the plane they were launched from.
#[derive(Debug, Clone)]
pub struct Population {
    pub particles: Vec<Particle>,
    pub plane: InjectionPlane,
}

impl Population {
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Sum of statistical weights.
    pub fn weight_sum(&self) -> f64 {
        self.particles.iter().map(|p| p.weight).sum()
    }

    /// Number of particles per species name.
    pub fn species_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for p in &self.particles {
            *counts.entry(p.species.name.clone()).or_insert(0) += 1;
        }
        counts
    }
}

/// Builds particle populations for one configuration.
pub struct ParticleGenerator<'a> {
    config: &'a SimulationConfig,
}

impl<'a> ParticleGenerator<'a> {
    pub fn new(config: &'a SimulationConfig) -> Self {
        Self { config }
    }

    /// Generates exactly `target` particles.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        mesh: &TriangleMesh,
        target: usize,
        rng: &mut R,
    ) -> Result<Population> {
        self.generate_mixed(mesh, target, target, rng)
    }

    /// Samples about `initial` particles split across species by density,
    /// then truncates or pads (by cycling through the samples) to `target`.
    ///
    /// Fails with [`DragError::Configuration`] if there is no usable species
    /// or if no particle could be sampled while `target > 0`.
    pub fn generate_mixed<R: Rng + ?Sized>(
        &self,
        mesh: &TriangleMesh,
        initial: usize,
        target: usize,
        rng: &mut R,
    ) -> Result<Population> {
        if mesh.is_empty() {
            return Err(DragError::GeometryUnavailable(
                "cannot generate particles without a mesh".to_string(),
            ));
        }
        let species: Vec<_> = self
            .config
            .species_list()
            .into_iter()
            .filter(|sp| sp.is_active())
            .collect();
        if species.is_empty() {
            return Err(DragError::Configuration(
                "no species has positive mass and density".to_string(),
            ));
        }

        let flow = self.config.flow();
        let plane = InjectionPlane::upstream_of(mesh, flow, self.config.padding_fraction)?;
        let area = plane.area();
        if area.is_nan() || area <= 0.0 {
            return Err(DragError::NumericDegenerate(format!(
                "injection plane area is {area}"
            )));
        }
        let normal = plane.normal();

        // Only active species count toward the total, so inactive ones do not
        // leave a share of `initial` to be made up by padding.
        let density_sum: f64 = species.iter().map(|sp| sp.density).sum();
        let mut particles = Vec::with_capacity(target);
        for sp in &species {
            let count = (initial as f64 * sp.density / density_sum).round() as usize;
            debug!("Species {}: {} particles", sp.name, count);
            if count == 0 {
                continue;
            }
            let sampler = MaxwellSampler::new(self.config.temperature, sp.mass, flow)?;
            for _ in 0..count {
                let origin = plane.sample_point(rng);
                let velocity = sampler.sample_velocity(rng);
                let v_n = velocity.dot(normal).max(0.0);
                let weight = sp.density * v_n * area / count as f64;
                if let Some(p) = Particle::new(origin, velocity, sp.clone(), weight) {
                    particles.push(p);
                }
            }
        }

        if target > 0 && particles.is_empty() {
            return Err(DragError::Configuration(format!(
                "no particles sampled for a target of {target}"
            )));
        }
        let sampled = particles.len();
        if sampled > target {
            particles.truncate(target);
        } else {
            for i in 0..target - sampled {
                let copy = particles[i % sampled].clone();
                particles.push(copy);
            }
        }

        info!("Particles generated: {}", particles.len());
        Ok(Population { particles, plane })
    }
}
