pub mod drag;
pub mod engine;
pub mod forces;
pub mod generator;
pub mod kinetic;
pub mod particle;
pub mod surface;

/// Boltzmann constant (J/K)
pub const BOLTZMANN: f64 = 1.380649e-23;
