//! Per-panel force table as comma-separated text.

use crate::sim::forces::ForceAccumulator;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub const PANEL_FORCES_HEADER: &str = "panel_id,area,hits,fx,fy,fz,pressure";

/// One row per panel that was hit, ordered by panel id.
pub fn write_panel_forces(path: &Path, forces: &ForceAccumulator) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("Failed to create file: {}", path.display()))?;
    let mut w = BufWriter::new(file);

    writeln!(w, "{}", PANEL_FORCES_HEADER)?;
    for (id, panel) in forces.panel_forces() {
        writeln!(
            w,
            "{},{:e},{},{:e},{:e},{:e},{:e}",
            id,
            panel.area,
            panel.hits,
            panel.force.dx,
            panel.force.dy,
            panel.force.dz,
            panel.pressure()
        )?;
    }

    w.flush()?;
    Ok(())
}
