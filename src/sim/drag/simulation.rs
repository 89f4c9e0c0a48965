use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use log::info;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;

use crate::error::{DragError, Result};
use crate::geom::mesh::{PanelId, TriangleMesh};
use crate::sim::engine::IntersectionEngine;
use crate::sim::forces::ForceAccumulator;
use crate::sim::generator::{ParticleGenerator, Population};
use crate::sim::particle::Particle;
use crate::sim::surface::SurfaceInteraction;

use super::config::SimulationConfig;
use super::trace::{Segment, Termination, TraceOutcome, Tracer};

/// Particles per work unit. Each unit gets its own accumulator and generator.
const CHUNK_SIZE: usize = 256;

/// Aggregate trace statistics.
///
/// Counts combine by sum, `max_bounces` by max.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraceStats {
    pub particles: usize,
    pub particles_with_hits: usize,
    pub total_hits: usize,
    pub max_bounces: usize,
    pub escaped: usize,
    pub energy_floor: usize,
    pub bounce_limit: usize,
    /// Particles that arrived dead and were not traced
    pub inactive: usize,
}

impl TraceStats {
    pub fn record(&mut self, outcome: &TraceOutcome) {
        self.particles += 1;
        if outcome.hits > 0 {
            self.particles_with_hits += 1;
        }
        self.total_hits += outcome.hits;
        self.max_bounces = self.max_bounces.max(outcome.hits);
        match outcome.termination {
            Termination::Escaped => self.escaped += 1,
            Termination::EnergyFloor => self.energy_floor += 1,
            Termination::BounceLimit => self.bounce_limit += 1,
            Termination::Inactive => self.inactive += 1,
        }
    }

    pub fn merge(&mut self, other: &TraceStats) {
        self.particles += other.particles;
        self.particles_with_hits += other.particles_with_hits;
        self.total_hits += other.total_hits;
        self.max_bounces = self.max_bounces.max(other.max_bounces);
        self.escaped += other.escaped;
        self.energy_floor += other.energy_floor;
        self.bounce_limit += other.bounce_limit;
        self.inactive += other.inactive;
    }

    /// Average number of wall hits per traced particle.
    pub fn mean_hits(&self) -> f64 {
        if self.particles == 0 {
            0.0
        } else {
            self.total_hits as f64 / self.particles as f64
        }
    }
}

/// Result of tracing a set of particles.
#[derive(Debug, Clone, Default)]
pub struct SimulationResult {
    pub forces: ForceAccumulator,
    pub stats: TraceStats,
    /// One outcome per traced particle, in input order
    pub outcomes: Vec<TraceOutcome>,
    /// Path segments, only filled if segment recording is enabled
    pub segments: Vec<Segment>,
    /// Sum of statistical weights of the traced particles
    pub weight_sum: f64,
}

impl SimulationResult {
    /// Folds `other` into `self`; outcomes and segments are appended.
    pub fn merge(&mut self, other: SimulationResult) {
        self.forces.merge(&other.forces);
        self.stats.merge(&other.stats);
        self.outcomes.extend(other.outcomes);
        self.segments.extend(other.segments);
        self.weight_sum += other.weight_sum;
    }
}

/// Multi-threaded drag run against one mesh and configuration.
pub struct Simulation {
    config: SimulationConfig,
    mesh: Arc<TriangleMesh>,
    engine: IntersectionEngine,
    surface: SurfaceInteraction,
    panel_areas: BTreeMap<PanelId, f64>,
    escape_length: f64,
}

impl Simulation {
    /// Fails if the configuration is invalid or the mesh is empty.
    pub fn new(mesh: Arc<TriangleMesh>, config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        if mesh.is_empty() {
            return Err(DragError::GeometryUnavailable(
                "mesh has no triangles".to_string(),
            ));
        }
        let panel_areas = mesh.panel_areas();
        let escape_length = mesh.size(0.0).unwrap_or(1.0);
        let surface = config.surface();
        Ok(Self {
            engine: IntersectionEngine::new(mesh.clone()),
            mesh,
            config,
            surface,
            panel_areas,
            escape_length,
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn mesh(&self) -> &Arc<TriangleMesh> {
        &self.mesh
    }

    pub fn panel_areas(&self) -> &BTreeMap<PanelId, f64> {
        &self.panel_areas
    }

    /// Generates `ray_count` particles, seeded from the configuration if a
    /// seed is set.
    pub fn generate(&self) -> Result<Population> {
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        ParticleGenerator::new(&self.config).generate(&self.mesh, self.config.ray_count, &mut rng)
    }

    /// Traces all particles on the rayon thread pool.
    pub fn run(&self, particles: &[Particle]) -> SimulationResult {
        let result = self.trace_block(particles, 0);
        info!(
            "Traced {} particles: {} hits, {} with hits, max bounces {}",
            result.stats.particles,
            result.stats.total_hits,
            result.stats.particles_with_hits,
            result.stats.max_bounces
        );
        result
    }

    /// Traces one block of particles. `stream` separates the random streams
    /// of different blocks when a seed is configured.
    pub(crate) fn trace_block(&self, particles: &[Particle], stream: u64) -> SimulationResult {
        let tracer = Tracer {
            engine: &self.engine,
            surface: &self.surface,
            panel_areas: &self.panel_areas,
            escape_length: self.escape_length,
        };
        let record = self.config.record_segments;
        let seed = self.config.seed;
        let shared_segments: Mutex<Vec<Segment>> = Mutex::new(Vec::new());

        let partials: Vec<(ForceAccumulator, TraceStats, Vec<TraceOutcome>)> = particles
            .par_chunks(CHUNK_SIZE)
            .enumerate()
            .map(|(idx, chunk)| {
                let mut rng = match seed {
                    Some(s) => StdRng::seed_from_u64(chunk_seed(s, stream, idx)),
                    None => StdRng::from_entropy(),
                };
                let mut forces = ForceAccumulator::new();
                let mut stats = TraceStats::default();
                let mut outcomes = Vec::with_capacity(chunk.len());
                let mut local_segments = Vec::new();

                for p in chunk {
                    let segs = if record {
                        Some(&mut local_segments)
                    } else {
                        None
                    };
                    let outcome = tracer.trace(p, &mut forces, &mut rng, segs);
                    stats.record(&outcome);
                    outcomes.push(outcome);
                }

                if !local_segments.is_empty() {
                    // Poisoning only records a panic in another worker.
                    let mut shared = shared_segments
                        .lock()
                        .unwrap_or_else(|poisoned| poisoned.into_inner());
                    shared.extend(local_segments);
                }
                (forces, stats, outcomes)
            })
            .collect();

        let mut result = SimulationResult {
            weight_sum: particles.iter().map(|p| p.weight).sum(),
            outcomes: Vec::with_capacity(particles.len()),
            ..Default::default()
        };
        for (forces, stats, outcomes) in partials {
            result.forces.merge(&forces);
            result.stats.merge(&stats);
            result.outcomes.extend(outcomes);
        }
        result.segments = shared_segments
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        result
    }
}

/// Mixes the base seed with block and chunk indices.
fn chunk_seed(seed: u64, stream: u64, chunk: usize) -> u64 {
    const GOLDEN: u64 = 0x9E37_79B9_7F4A_7C15;
    seed ^ stream.wrapping_add(1).wrapping_mul(GOLDEN).rotate_left(17)
        ^ (chunk as u64).wrapping_add(1).wrapping_mul(GOLDEN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::drag::{decode_block, encode_block};
    use crate::{Point, Vector};

    fn cube() -> Arc<TriangleMesh> {
        Arc::new(TriangleMesh::cuboid(
            Point::new(0., 0., 0.),
            Point::new(1., 1., 1.),
        ))
    }

    fn config() -> SimulationConfig {
        let mut config = SimulationConfig::new().with_species("N2", 4.65e-26, 1e20);
        config.flow_velocity = [0.0, 0.0, -7500.0];
        config.ray_count = 2000;
        config.seed = Some(7);
        config
    }

    #[test]
    fn test_new_rejects_empty_mesh() {
        let res = Simulation::new(Arc::new(TriangleMesh::default()), config());
        assert!(matches!(res, Err(DragError::GeometryUnavailable(_))));
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let res = Simulation::new(cube(), SimulationConfig::new());
        assert!(matches!(res, Err(DragError::Configuration(_))));
    }

    #[test]
    fn test_run_statistics() {
        let sim = Simulation::new(cube(), config()).unwrap();
        let pop = sim.generate().unwrap();
        let result = sim.run(&pop.particles);

        assert_eq!(result.outcomes.len(), 2000);
        assert_eq!(result.stats.particles, 2000);
        assert_eq!(
            result.stats.escaped + result.stats.energy_floor + result.stats.bounce_limit,
            2000
        );
        let hits: usize = result.outcomes.iter().map(|o| o.hits).sum();
        assert_eq!(hits, result.stats.total_hits);
        assert_eq!(result.forces.total_hits(), result.stats.total_hits);
        assert!(result.stats.particles_with_hits > 0);
        assert!(result.stats.max_bounces <= crate::sim::drag::MAX_BOUNCES);
        assert!((result.weight_sum - pop.weight_sum()).abs() < 1e-9 * pop.weight_sum());
        assert!(result.segments.is_empty());
    }

    #[test]
    fn test_flow_pushes_body_downstream() {
        // Gas momentum gains a component against the flow, i.e. along +z here.
        let sim = Simulation::new(cube(), config()).unwrap();
        let pop = sim.generate().unwrap();
        let result = sim.run(&pop.particles);
        let flow = Vector::new(0., 0., -1.);
        assert!(result.forces.total_force().dot(flow) < 0.0);
    }

    #[test]
    fn test_seeded_runs_repeat() {
        let sim = Simulation::new(cube(), config()).unwrap();
        let pop = sim.generate().unwrap();
        let a = sim.run(&pop.particles);
        let b = sim.run(&pop.particles);
        assert_eq!(a.outcomes, b.outcomes);
        assert!((a.forces.total_force() - b.forces.total_force()).length() < 1e-12);
    }

    #[test]
    fn test_segments_recorded() {
        let mut cfg = config();
        cfg.record_segments = true;
        cfg.ray_count = 100;
        let sim = Simulation::new(cube(), cfg).unwrap();
        let pop = sim.generate().unwrap();
        let result = sim.run(&pop.particles);
        // One segment per hit plus one per escape
        assert_eq!(
            result.segments.len(),
            result.stats.total_hits + result.stats.escaped
        );
    }

    #[test]
    fn test_dead_particles_counted_separately() {
        let mut cfg = config();
        cfg.ray_count = 50;
        let sim = Simulation::new(cube(), cfg).unwrap();
        let mut particles = sim.generate().unwrap().particles;
        for p in particles.iter_mut().step_by(10) {
            p.alive = false;
        }
        // Liveness survives the trip through a rank boundary
        let particles = decode_block(&encode_block(&particles)).unwrap();
        let result = sim.run(&particles);

        assert_eq!(result.stats.particles, 50);
        assert_eq!(result.stats.inactive, 5);
        assert_eq!(
            result.stats.escaped + result.stats.energy_floor + result.stats.bounce_limit,
            45
        );
        for idx in (0..50).step_by(10) {
            assert_eq!(result.outcomes[idx].termination, Termination::Inactive);
            assert_eq!(result.outcomes[idx].hits, 0);
        }
    }

    #[test]
    fn test_stats_merge() {
        let mut a = TraceStats::default();
        a.record(&TraceOutcome {
            hits: 3,
            termination: Termination::BounceLimit,
        });
        let mut b = TraceStats::default();
        b.record(&TraceOutcome {
            hits: 0,
            termination: Termination::Escaped,
        });
        b.record(&TraceOutcome {
            hits: 5,
            termination: Termination::EnergyFloor,
        });
        b.record(&TraceOutcome {
            hits: 0,
            termination: Termination::Inactive,
        });
        a.merge(&b);
        assert_eq!(a.particles, 4);
        assert_eq!(a.particles_with_hits, 2);
        assert_eq!(a.total_hits, 8);
        assert_eq!(a.max_bounces, 5);
        assert_eq!(a.inactive, 1);
        assert_eq!(a.energy_floor, 1);
        assert!((a.mean_hits() - 2.0).abs() < 1e-12);
    }
}
