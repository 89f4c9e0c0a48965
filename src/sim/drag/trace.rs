use std::collections::BTreeMap;

use rand::Rng;

use crate::Point;
use crate::geom::mesh::PanelId;
use crate::sim::engine::IntersectionEngine;
use crate::sim::forces::ForceAccumulator;
use crate::sim::particle::Particle;
use crate::sim::surface::SurfaceInteraction;

/// Maximum number of wall hits per particle.
pub const MAX_BOUNCES: usize = 10;

/// A particle stops once its remaining energy drops to this fraction of
/// its injection energy.
pub const ENERGY_FLOOR_FRACTION: f64 = 0.1;

/// Straight piece of a particle path, from launch or bounce to the next event.
pub type Segment = (Point, Point);

/// Why a particle stopped being traced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Termination {
    /// Left the domain without hitting anything (more).
    Escaped,
    /// Remaining energy fell to the floor.
    EnergyFloor,
    /// Reached [`MAX_BOUNCES`].
    BounceLimit,
    /// Arrived already dead and was never launched.
    Inactive,
}

/// Per-particle trace statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceOutcome {
    pub hits: usize,
    pub termination: Termination,
}

/// Bounce loop of a single particle.
///
/// Borrows the shared read-only run state; every worker owns its own
/// accumulator and random generator.
pub struct Tracer<'a> {
    pub engine: &'a IntersectionEngine,
    pub surface: &'a SurfaceInteraction,
    pub panel_areas: &'a BTreeMap<PanelId, f64>,
    /// Length of the segment recorded for an escaping particle
    pub escape_length: f64,
}

impl Tracer<'_> {
    /// Traces `particle` until it escapes, runs out of energy or hits the
    /// bounce limit, adding every wall impulse to `forces`.
    ///
    /// A dead particle is reported as [`Termination::Inactive`]; a live one
    /// without energy is already at the floor. Neither is traced.
    pub fn trace<R: Rng + ?Sized>(
        &self,
        particle: &Particle,
        forces: &mut ForceAccumulator,
        rng: &mut R,
        mut segments: Option<&mut Vec<Segment>>,
    ) -> TraceOutcome {
        if !particle.alive {
            return TraceOutcome {
                hits: 0,
                termination: Termination::Inactive,
            };
        }
        if particle.energy.is_nan() || particle.energy <= 0.0 {
            return TraceOutcome {
                hits: 0,
                termination: Termination::EnergyFloor,
            };
        }

        let floor = ENERGY_FLOOR_FRACTION * particle.energy;
        let loss = self.surface.energy_loss;
        let mut current = particle.clone();
        let mut hits = 0;

        loop {
            let ray = current.ray();
            let Some(hit) = self.engine.intersect(&ray) else {
                if let Some(segs) = segments.as_deref_mut() {
                    segs.push((ray.origin, ray.point_at(self.escape_length)));
                }
                return TraceOutcome {
                    hits,
                    termination: Termination::Escaped,
                };
            };
            if let Some(segs) = segments.as_deref_mut() {
                segs.push((ray.origin, hit.point));
            }

            let reflected = self.surface.generate_reflection(&current, &hit, rng);
            let area = self.panel_areas.get(&hit.panel_id).copied().unwrap_or(0.0);
            forces.accumulate_force(&current, &reflected, area);
            hits += 1;

            let remaining = reflected.energy * (1.0 - loss);
            if remaining <= floor {
                return TraceOutcome {
                    hits,
                    termination: Termination::EnergyFloor,
                };
            }
            if hits >= MAX_BOUNCES {
                return TraceOutcome {
                    hits,
                    termination: Termination::BounceLimit,
                };
            }
            current = reflected;
        }
    }
}
