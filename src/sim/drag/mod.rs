//! Free-molecular drag: configuration, bounce loop, threaded and
//! multi-rank runs, and the final report.

mod config;
mod distributed;
mod report;
mod simulation;
mod trace;

pub use config::{SimulationConfig, SpeciesInfo};
pub use distributed::{
    ParticleRecord, RECORD_SIZE, decode_block, encode_block, partition_blocks, run_cluster,
};
pub use report::DragReport;
pub use simulation::{Simulation, SimulationResult, TraceStats};
pub use trace::{
    ENERGY_FLOOR_FRACTION, MAX_BOUNCES, Segment, Termination, TraceOutcome, Tracer,
};
