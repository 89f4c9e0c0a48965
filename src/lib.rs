pub mod error;
pub mod geom;
pub mod io;
pub mod sim;

// Prelude
pub use error::{DragError, Result};
pub use geom::mesh::{PanelId, Triangle, TriangleMesh};
pub use geom::point::Point;
pub use geom::ray::Ray;
pub use geom::vector::Vector;
pub use sim::drag::{DragReport, Simulation, SimulationConfig, SimulationResult};
pub use sim::particle::{Particle, Species};
