//! Gas-surface interaction (scattering) models.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::sim::BOLTZMANN;
use crate::sim::engine::HitInfo;
use crate::sim::engine::reflection::{Diffuse, Hybrid, ReflectionModel};
use crate::sim::particle::Particle;

/// Distance along the normal at which a reflected particle is re-emitted.
pub const SURFACE_OFFSET: f64 = 1e-6;

/// Scattering model selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScatteringModel {
    /// Diffuse reflection with incomplete energy accommodation.
    #[default]
    #[serde(rename = "DRIA")]
    Dria,
    /// Accommodated energy, specular or diffuse direction.
    Sentman,
    /// Any other name: specular/diffuse by reflection ratio, fixed energy loss.
    #[serde(other)]
    Fallback,
}

/// Surface model with its parameters bound once per run.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceInteraction {
    pub model: ScatteringModel,
    /// Energy accommodation coefficient alpha [0, 1]
    pub accommodation: f64,
    /// Wall temperature (K)
    pub wall_temperature: f64,
    /// Sentman: probability of specular re-emission
    pub specular_fraction: f64,
    /// Fallback: probability of specular re-emission
    pub reflection_ratio: f64,
    /// Fallback: fraction of energy lost per bounce
    pub energy_loss: f64,
}

impl SurfaceInteraction {
    /// Produces the particle leaving the wall after `incident` hits it at `hit`.
    ///
    /// The returned particle is always alive, starts slightly off the wall on
    /// the incident side, and keeps the species and weight of `incident`.
    pub fn generate_reflection<R: Rng + ?Sized>(
        &self,
        incident: &Particle,
        hit: &HitInfo,
        rng: &mut R,
    ) -> Particle {
        let normal = hit.normal.normalize().unwrap_or(hit.normal);
        let (direction, energy) = match self.model {
            ScatteringModel::Dria => (
                Diffuse.reflect(incident.direction, normal, rng),
                self.accommodated_energy(incident.energy),
            ),
            ScatteringModel::Sentman => (
                Hybrid::new(self.specular_fraction).reflect(incident.direction, normal, rng),
                self.accommodated_energy(incident.energy),
            ),
            ScatteringModel::Fallback => (
                Hybrid::new(self.reflection_ratio).reflect(incident.direction, normal, rng),
                incident.energy * (1.0 - self.energy_loss),
            ),
        };

        let mass = incident.mass();
        let speed = if mass > 0.0 {
            (2.0 * energy.max(0.0) / mass).sqrt()
        } else {
            0.0
        };

        Particle::launched(
            hit.point + normal * SURFACE_OFFSET,
            direction,
            speed,
            energy,
            incident.species.clone(),
            incident.weight,
            Some(hit.panel_id),
        )
    }

    /// Mean kinetic energy at the re-emission temperature
    /// `T_r = alpha * T_wall + (1 - alpha) * T_i`, with `T_i = 2E / (3 k_B)`.
    fn accommodated_energy(&self, incident_energy: f64) -> f64 {
        let t_incident = 2.0 * incident_energy / (3.0 * BOLTZMANN);
        let alpha = self.accommodation;
        let t_reemit = alpha * self.wall_temperature + (1.0 - alpha) * t_incident;
        1.5 * BOLTZMANN * t_reemit
    }
}
