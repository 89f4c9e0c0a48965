use std::sync::Arc;

use crate::geom::mesh::PanelId;
use crate::geom::ray::Ray;
use crate::{Point, Vector};

/// Gas species carried by a particle.
#[derive(Debug, Clone, PartialEq)]
pub struct Species {
    pub name: String,
    /// Molecular mass (kg)
    pub mass: f64,
    /// Number density (1/m^3)
    pub density: f64,
}

impl Species {
    pub fn new(name: impl Into<String>, mass: f64, density: f64) -> Self {
        Self {
            name: name.into(),
            mass,
            density,
        }
    }

    /// Species with positive mass and density take part in generation.
    pub fn is_active(&self) -> bool {
        self.mass > 0.0 && self.density > 0.0
    }
}

/// Test particle traced through the domain.
///
/// A bounce never mutates a particle; the surface model returns a new one.
#[derive(Debug, Clone)]
pub struct Particle {
    pub origin: Point,
    /// Unit direction of flight
    pub direction: Vector,
    pub velocity: Vector,
    /// velocity * mass
    pub momentum: Vector,
    /// Kinetic energy (J)
    pub energy: f64,
    pub species: Arc<Species>,
    /// Number of real molecules this sample stands for
    pub weight: f64,
    pub alive: bool,
    /// Panel of the most recent surface hit
    pub panel_id: Option<PanelId>,
}

impl Particle {
    /// Creates a live, unattached particle moving with `velocity`.
    ///
    /// Returns `None` if the velocity is zero (no direction of flight).
    pub fn new(
        origin: Point,
        velocity: Vector,
        species: Arc<Species>,
        weight: f64,
    ) -> Option<Self> {
        let direction = velocity.normalize()?;
        let mass = species.mass;
        Some(Self {
            origin,
            direction,
            velocity,
            momentum: velocity * mass,
            energy: 0.5 * mass * velocity.length_squared(),
            species,
            weight,
            alive: true,
            panel_id: None,
        })
    }

    /// Creates a live particle from a unit `direction`, a speed and an energy.
    ///
    /// The energy is stored as given, so it may differ from `0.5 m v^2`
    /// when the species mass is not positive.
    pub fn launched(
        origin: Point,
        direction: Vector,
        speed: f64,
        energy: f64,
        species: Arc<Species>,
        weight: f64,
        panel_id: Option<PanelId>,
    ) -> Self {
        let velocity = direction * speed;
        Self {
            origin,
            direction,
            velocity,
            momentum: velocity * species.mass,
            energy,
            species,
            weight,
            alive: true,
            panel_id,
        }
    }

    pub fn mass(&self) -> f64 {
        self.species.mass
    }

    pub fn ray(&self) -> Ray {
        Ray {
            origin: self.origin,
            direction: self.direction,
        }
    }
}
