use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use fmdrag::io::{read_mesh, write_panel_forces, write_panel_scalars, write_population, write_rays};
use fmdrag::sim::drag::run_cluster;
use fmdrag::{DragReport, Simulation, SimulationConfig};
use log::info;

fn usage() -> String {
    "Usage: fmdrag <config.json> [ranks]".to_string()
}

/// Relative geometry paths are taken relative to the config file.
fn resolve(config_path: &Path, file: &Path) -> PathBuf {
    if file.is_absolute() {
        return file.to_path_buf();
    }
    match config_path.parent() {
        Some(dir) => dir.join(file),
        None => file.to_path_buf(),
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let Some(config_arg) = args.next() else {
        bail!(usage());
    };
    let config_path = PathBuf::from(config_arg);
    let mut config = SimulationConfig::from_json_file(&config_path)?;
    if let Some(ranks) = args.next() {
        config.ranks = ranks
            .parse()
            .with_context(|| format!("Invalid rank count '{ranks}'. {}", usage()))?;
    }

    if config.rays_output.is_some() {
        config.record_segments = true;
    }

    let mesh_path = resolve(&config_path, &config.geometry_file);
    let mesh = read_mesh(&mesh_path)?;
    info!(
        "Loaded {} triangles from {}",
        mesh.triangle_count(),
        mesh_path.display()
    );

    let ranks = config.ranks;
    let sim = Simulation::new(Arc::new(mesh), config)?;
    let population = sim.generate()?;
    let result = if ranks > 1 {
        run_cluster(&sim, &population.particles, ranks)?
    } else {
        sim.run(&population.particles)
    };

    let config = sim.config();
    let report = DragReport::new(config, sim.mesh(), population.plane.area(), &result);
    println!("{report}");

    if let Some(path) = &config.heatmap_output {
        let pressure: BTreeMap<_, _> = result
            .forces
            .panel_forces()
            .iter()
            .map(|(id, p)| (*id, p.pressure()))
            .collect();
        write_panel_scalars(path, sim.mesh(), &pressure, "pressure")?;
        info!("Wrote panel heatmap to {}", path.display());
    }
    if let Some(path) = &config.rays_output {
        write_rays(path, sim.mesh(), &result.segments)?;
        info!("Wrote {} ray segments to {}", result.segments.len(), path.display());
    }
    if let Some(path) = &config.population_output {
        write_population(path, &population.particles)?;
        info!("Wrote injected population to {}", path.display());
    }
    if let Some(path) = &config.panel_forces_output {
        write_panel_forces(path, &result.forces)?;
        info!("Wrote panel forces to {}", path.display());
    }

    Ok(())
}
