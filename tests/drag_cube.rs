use anyhow::Result;
use fmdrag::io::{StlFormat, read_mesh, write_stl};
use fmdrag::sim::drag::{decode_block, encode_block, run_cluster};
use fmdrag::sim::surface::ScatteringModel;
use fmdrag::{DragReport, Point, Simulation, SimulationConfig, TriangleMesh, Vector};
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

const N2_MASS: f64 = 4.65e-26;
const O_MASS: f64 = 2.66e-26;

const CUBE_OBJ: &str = "\
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
v 0 0 1
v 1 0 1
v 1 1 1
v 0 1 1
f 1 2 3 4
f 5 6 7 8
f 1 2 6 5
f 3 4 8 7
f 1 5 8 4
f 2 3 7 6
";

fn leo_config(geometry: &Path) -> SimulationConfig {
    let mut config = SimulationConfig::new()
        .with_species("N2", N2_MASS, 0.8e15)
        .with_species("O", O_MASS, 0.2e15);
    config.geometry_file = geometry.to_path_buf();
    config.flow_velocity = [0.0, 0.0, -7500.0];
    config.temperature = 1000.0;
    config.ray_count = 4000;
    config.seed = Some(2024);
    config
}

fn cube_sim(config: SimulationConfig) -> Result<Simulation> {
    let mesh = TriangleMesh::cuboid(Point::new(0., 0., 0.), Point::new(1., 1., 1.));
    Ok(Simulation::new(Arc::new(mesh), config)?)
}

#[test]
fn test_end_to_end_from_files() -> Result<()> {
    let dir = tempdir()?;
    let obj_path = dir.path().join("cube.obj");
    std::fs::write(&obj_path, CUBE_OBJ)?;

    let mut config = leo_config(&obj_path);
    config.dynamic_pressure = Some(0.5 * 1e-12 * 7500.0 * 7500.0);
    config.mass_density = Some(1e-12);
    config.heatmap_output = Some(dir.path().join("heat.vtk"));
    let config_path = dir.path().join("run.json");
    std::fs::write(&config_path, serde_json::to_string_pretty(&config)?)?;

    let loaded = SimulationConfig::from_json_file(&config_path)?;
    assert_eq!(loaded.ray_count, 4000);
    assert_eq!(loaded.species.len(), 2);
    assert_eq!(loaded.geometry_file, obj_path);

    let mesh = read_mesh(&loaded.geometry_file)?;
    assert_eq!(mesh.triangle_count(), 12);
    let sim = Simulation::new(Arc::new(mesh), loaded)?;
    let population = sim.generate()?;
    assert_eq!(population.len(), 4000);

    let counts = population.species_counts();
    assert!((counts["N2"] as i64 - 3200).abs() <= 1);
    assert!((counts["O"] as i64 - 800).abs() <= 1);

    let drift = Vector::new(0., 0., -1.);
    for p in &population.particles {
        assert!((p.direction.length() - 1.0).abs() < 1e-6);
        assert!(p.velocity.dot(drift) > 0.0);
    }

    let result = sim.run(&population.particles);
    let report = DragReport::new(sim.config(), sim.mesh(), population.plane.area(), &result);

    // Gas is pushed back against the flow
    assert!(report.drag_along_flow < 0.0);
    assert!(report.drag_coefficient.unwrap() > 0.0);
    assert!(report.scaled_force.unwrap().dot(drift) < 0.0);
    assert_eq!(report.stats.particles, 4000);
    assert!(report.stats.particles_with_hits > 0);
    // Only the top face sees the incoming stream on the first bounce
    let top: usize = [2, 3].iter().filter_map(|id| report.panel_hits.get(id)).sum();
    assert!(top * 2 > report.stats.particles_with_hits);

    let text = report.to_string();
    assert!(text.contains("[RESULT] Total C_d"));
    Ok(())
}

#[test]
fn test_single_rank_cluster_matches_thread_run() -> Result<()> {
    let sim = cube_sim(leo_config(Path::new("cube.obj")))?;
    let population = sim.generate()?;

    let direct = sim.run(&population.particles);
    let cluster = run_cluster(&sim, &population.particles, 1)?;

    assert_eq!(direct.outcomes, cluster.outcomes);
    assert_eq!(direct.stats, cluster.stats);
    assert!((direct.forces.total_force() - cluster.forces.total_force()).length() < 1e-30);
    Ok(())
}

#[test]
fn test_multi_rank_cluster_agrees_statistically() -> Result<()> {
    let sim = cube_sim(leo_config(Path::new("cube.obj")))?;
    let population = sim.generate()?;

    let direct = sim.run(&population.particles);
    let cluster = run_cluster(&sim, &population.particles, 4)?;

    assert_eq!(cluster.stats.particles, direct.stats.particles);
    assert_eq!(cluster.outcomes.len(), population.len());
    assert!((cluster.weight_sum - direct.weight_sum).abs() <= 1e-9 * direct.weight_sum);

    let flow = Vector::new(0., 0., -1.);
    let a = direct.forces.total_force().dot(flow);
    let b = cluster.forces.total_force().dot(flow);
    assert!((a - b).abs() < 0.1 * a.abs(), "direct {a}, cluster {b}");
    Ok(())
}

#[test]
fn test_wire_blocks_preserve_particles() -> Result<()> {
    let sim = cube_sim(leo_config(Path::new("cube.obj")))?;
    let population = sim.generate()?;
    let decoded = decode_block(&encode_block(&population.particles[..10]))?;
    assert_eq!(decoded.len(), 10);
    for (a, b) in population.particles.iter().zip(&decoded) {
        assert_eq!(a.origin, b.origin);
        assert_eq!(a.velocity, b.velocity);
        assert_eq!(a.weight, b.weight);
        assert_eq!(a.species.name, b.species.name);
    }
    Ok(())
}

#[test]
fn test_specular_plate_force_along_normal() -> Result<()> {
    // Flow hitting a flat box head-on with mirror reflection pushes only along z
    let dir = tempdir()?;
    let stl_path = dir.path().join("plate.stl");
    let plate = TriangleMesh::cuboid(Point::new(0., 0., 0.), Point::new(2., 2., 0.1));
    write_stl(&stl_path, &plate, "plate", StlFormat::Binary)?;

    let mut config = leo_config(&stl_path);
    config.temperature = 0.0;
    config.model = ScatteringModel::Fallback;
    config.reflection_ratio = 1.0;
    config.energy_loss = 0.0;
    config.ray_count = 1000;

    let sim = Simulation::new(Arc::new(read_mesh(&stl_path)?), config)?;
    let population = sim.generate()?;
    let result = sim.run(&population.particles);

    let f = result.forces.total_force();
    assert!(f.dz > 0.0);
    assert!(f.dx.abs() < 1e-9 * f.dz);
    assert!(f.dy.abs() < 1e-9 * f.dz);
    Ok(())
}
