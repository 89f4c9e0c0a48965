//! Process-level scatter/gather around the threaded engine.
//!
//! The population is cut into contiguous blocks, one per rank. Each block
//! crosses the rank boundary as fixed-size little-endian records:
//!
//! | offset | field                                   |
//! |--------|-----------------------------------------|
//! | 0      | origin, direction, momentum, velocity (4 x 3 x f64) |
//! | 96     | energy, mass, density (3 x f64)         |
//! | 120    | species name, 32 bytes, NUL padded      |
//! | 152    | alive flag (u8) + 7 bytes padding       |
//! | 160    | weight (f64)                            |
//! | 168    | panel id (i32, -1 if none) + 4 bytes padding |

use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;

use log::info;
use rayon::prelude::*;

use crate::error::{DragError, Result};
use crate::sim::particle::{Particle, Species};
use crate::{Point, Vector};

use super::simulation::{Simulation, SimulationResult};

/// Size in bytes of one encoded particle.
pub const RECORD_SIZE: usize = 176;

/// Species name buffer, including the terminating NUL.
const NAME_CAPACITY: usize = 32;

const OFF_ENERGY: usize = 96;
const OFF_NAME: usize = 120;
const OFF_ALIVE: usize = OFF_NAME + NAME_CAPACITY;
const OFF_WEIGHT: usize = 160;
const OFF_PANEL: usize = 168;

/// Splits `0..total` into `ranks` contiguous blocks whose sizes differ by at
/// most one; the first `total % ranks` blocks are the longer ones.
pub fn partition_blocks(total: usize, ranks: usize) -> Vec<Range<usize>> {
    if ranks == 0 {
        return Vec::new();
    }
    let base = total / ranks;
    let remainder = total % ranks;
    let mut start = 0;
    (0..ranks)
        .map(|i| {
            let len = base + usize::from(i < remainder);
            let block = start..start + len;
            start += len;
            block
        })
        .collect()
}

/// Flat, fixed-layout copy of a particle.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleRecord {
    pub origin: [f64; 3],
    pub direction: [f64; 3],
    pub momentum: [f64; 3],
    pub velocity: [f64; 3],
    pub energy: f64,
    pub mass: f64,
    pub density: f64,
    pub name: [u8; NAME_CAPACITY],
    pub alive: bool,
    pub weight: f64,
    pub panel_id: i32,
}

impl ParticleRecord {
    /// Species names longer than 31 bytes are cut at the last character
    /// boundary that fits.
    pub fn from_particle(p: &Particle) -> Self {
        let mut name = [0u8; NAME_CAPACITY];
        let short = truncate_name(&p.species.name);
        name[..short.len()].copy_from_slice(short.as_bytes());
        Self {
            origin: p.origin.to_array(),
            direction: p.direction.to_array(),
            momentum: p.momentum.to_array(),
            velocity: p.velocity.to_array(),
            energy: p.energy,
            mass: p.species.mass,
            density: p.species.density,
            name,
            alive: p.alive,
            weight: p.weight,
            panel_id: p.panel_id.unwrap_or(-1),
        }
    }

    /// Species name up to the first NUL byte.
    pub fn name(&self) -> Result<&str> {
        let end = self
            .name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(NAME_CAPACITY);
        std::str::from_utf8(&self.name[..end])
            .map_err(|e| DragError::Wire(format!("species name is not UTF-8: {e}")))
    }

    pub fn to_bytes(&self) -> [u8; RECORD_SIZE] {
        let mut buf = [0u8; RECORD_SIZE];
        let vectors = [self.origin, self.direction, self.momentum, self.velocity];
        for (i, v) in vectors.iter().flatten().enumerate() {
            put_f64(&mut buf, i * 8, *v);
        }
        put_f64(&mut buf, OFF_ENERGY, self.energy);
        put_f64(&mut buf, OFF_ENERGY + 8, self.mass);
        put_f64(&mut buf, OFF_ENERGY + 16, self.density);
        buf[OFF_NAME..OFF_ALIVE].copy_from_slice(&self.name);
        buf[OFF_ALIVE] = u8::from(self.alive);
        put_f64(&mut buf, OFF_WEIGHT, self.weight);
        buf[OFF_PANEL..OFF_PANEL + 4].copy_from_slice(&self.panel_id.to_le_bytes());
        buf
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != RECORD_SIZE {
            return Err(DragError::Wire(format!(
                "record is {} bytes, expected {RECORD_SIZE}",
                bytes.len()
            )));
        }
        let vec3 = |offset: usize| {
            [
                get_f64(bytes, offset),
                get_f64(bytes, offset + 8),
                get_f64(bytes, offset + 16),
            ]
        };
        let mut name = [0u8; NAME_CAPACITY];
        name.copy_from_slice(&bytes[OFF_NAME..OFF_ALIVE]);
        let panel_id = i32::from_le_bytes([
            bytes[OFF_PANEL],
            bytes[OFF_PANEL + 1],
            bytes[OFF_PANEL + 2],
            bytes[OFF_PANEL + 3],
        ]);
        Ok(Self {
            origin: vec3(0),
            direction: vec3(24),
            momentum: vec3(48),
            velocity: vec3(72),
            energy: get_f64(bytes, OFF_ENERGY),
            mass: get_f64(bytes, OFF_ENERGY + 8),
            density: get_f64(bytes, OFF_ENERGY + 16),
            name,
            alive: bytes[OFF_ALIVE] != 0,
            weight: get_f64(bytes, OFF_WEIGHT),
            panel_id,
        })
    }

    pub fn into_particle(self, species: Arc<Species>) -> Particle {
        Particle {
            origin: Point::from_array(self.origin),
            direction: Vector::from_array(self.direction),
            velocity: Vector::from_array(self.velocity),
            momentum: Vector::from_array(self.momentum),
            energy: self.energy,
            species,
            weight: self.weight,
            alive: self.alive,
            panel_id: (self.panel_id >= 0).then_some(self.panel_id),
        }
    }
}

fn truncate_name(name: &str) -> &str {
    let mut end = name.len().min(NAME_CAPACITY - 1);
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}

fn put_f64(buf: &mut [u8], offset: usize, value: f64) {
    buf[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
}

fn get_f64(bytes: &[u8], offset: usize) -> f64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&bytes[offset..offset + 8]);
    f64::from_le_bytes(raw)
}

/// Encodes particles back to back.
pub fn encode_block(particles: &[Particle]) -> Vec<u8> {
    let mut out = Vec::with_capacity(particles.len() * RECORD_SIZE);
    for p in particles {
        out.extend_from_slice(&ParticleRecord::from_particle(p).to_bytes());
    }
    out
}

/// Decodes a block written by [`encode_block`].
///
/// Particles of the same species share one `Arc<Species>`.
pub fn decode_block(bytes: &[u8]) -> Result<Vec<Particle>> {
    if bytes.len() % RECORD_SIZE != 0 {
        return Err(DragError::Wire(format!(
            "block of {} bytes is not a multiple of {RECORD_SIZE}",
            bytes.len()
        )));
    }
    let mut species: HashMap<(String, u64, u64), Arc<Species>> = HashMap::new();
    bytes
        .chunks_exact(RECORD_SIZE)
        .map(|chunk| {
            let record = ParticleRecord::from_bytes(chunk)?;
            let name = record.name()?.to_string();
            let key = (name, record.mass.to_bits(), record.density.to_bits());
            let sp = species
                .entry(key)
                .or_insert_with_key(|(name, _, _)| {
                    Arc::new(Species::new(name.as_str(), record.mass, record.density))
                })
                .clone();
            Ok(record.into_particle(sp))
        })
        .collect()
}

/// Runs `particles` split over `ranks` independent blocks.
///
/// Every rank receives its block as encoded bytes, traces it against the
/// shared mesh and configuration, and the partial results are reduced in
/// rank order.
pub fn run_cluster(
    sim: &Simulation,
    particles: &[Particle],
    ranks: usize,
) -> Result<SimulationResult> {
    if ranks == 0 {
        return Err(DragError::Configuration(
            "ranks must be at least 1".to_string(),
        ));
    }

    let blocks: Vec<Vec<u8>> = partition_blocks(particles.len(), ranks)
        .into_iter()
        .map(|range| encode_block(&particles[range]))
        .collect();

    let partials = blocks
        .par_iter()
        .enumerate()
        .map(|(rank, bytes)| {
            let local = decode_block(bytes)?;
            Ok(sim.trace_block(&local, rank as u64))
        })
        .collect::<Result<Vec<SimulationResult>>>()?;

    let mut total = SimulationResult::default();
    for partial in partials {
        total.merge(partial);
    }
    info!(
        "Reduced {} ranks: {} particles, {} hits, {} with hits, max bounces {}",
        ranks,
        total.stats.particles,
        total.stats.total_hits,
        total.stats.particles_with_hits,
        total.stats.max_bounces
    );
    Ok(total)
}
