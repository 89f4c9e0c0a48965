use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::Vector;
use crate::error::{DragError, Result};
use crate::sim::particle::Species;
use crate::sim::surface::{ScatteringModel, SurfaceInteraction};

/// Mass and number density of one gas species.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeciesInfo {
    /// Molecular mass (kg)
    pub mass: f64,
    /// Number density (1/m^3)
    pub density: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    // Geometry
    pub geometry_file: PathBuf,
    /// Injection plane margin as a fraction of the body diagonal
    pub padding_fraction: f64,

    // Particles
    pub ray_count: usize,
    /// Bulk flow velocity (m/s)
    pub flow_velocity: [f64; 3],
    /// Free-stream temperature (K)
    pub temperature: f64,
    pub species: BTreeMap<String, SpeciesInfo>,

    // Surface
    pub model: ScatteringModel,
    pub reflection_ratio: f64,
    pub absorption_ratio: f64,
    pub energy_loss: f64,
    pub accommodation: f64,
    /// Wall temperature (K)
    pub wall_temperature: f64,
    pub specular_fraction: f64,

    // Execution
    /// Number of process-level partitions
    pub ranks: usize,
    /// Base seed for worker generators. Fresh entropy if unset.
    pub seed: Option<u64>,
    /// Keep every traced path segment for export
    pub record_segments: bool,

    // Reporting
    /// Free-stream mass density (kg/m^3), enables the scaled force
    pub mass_density: Option<f64>,
    /// Dynamic pressure (Pa), enables the drag coefficient
    pub dynamic_pressure: Option<f64>,
    pub heatmap_output: Option<PathBuf>,
    pub rays_output: Option<PathBuf>,
    pub population_output: Option<PathBuf>,
    pub panel_forces_output: Option<PathBuf>,
}

impl SimulationConfig {
    pub fn new() -> Self {
        Self {
            geometry_file: PathBuf::from("models/Cube.obj"),
            padding_fraction: 0.05,
            ray_count: 1000,
            flow_velocity: [0.0, 0.0, -1.0],
            temperature: 300.0,
            species: BTreeMap::new(),
            model: ScatteringModel::Dria,
            reflection_ratio: 0.5,
            absorption_ratio: 0.2,
            energy_loss: 0.1,
            accommodation: 1.0,
            wall_temperature: 300.0,
            specular_fraction: 0.3,
            ranks: 1,
            seed: None,
            record_segments: false,
            mass_density: None,
            dynamic_pressure: None,
            heatmap_output: None,
            rays_output: None,
            population_output: None,
            panel_forces_output: None,
        }
    }

    /// Reads and validates a JSON configuration file.
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let file =
            File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;
        let reader = BufReader::new(file);

        let config: SimulationConfig = serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(config)
    }

    /// Adds (or replaces) a species.
    pub fn with_species(mut self, name: &str, mass: f64, density: f64) -> Self {
        self.species
            .insert(name.to_string(), SpeciesInfo { mass, density });
        self
    }

    pub fn flow(&self) -> Vector {
        Vector::from_array(self.flow_velocity)
    }

    /// Species table in name order.
    pub fn species_list(&self) -> Vec<Arc<Species>> {
        self.species
            .iter()
            .map(|(name, sp)| Arc::new(Species::new(name.as_str(), sp.mass, sp.density)))
            .collect()
    }

    /// Surface model bound to this configuration's parameters.
    pub fn surface(&self) -> SurfaceInteraction {
        SurfaceInteraction {
            model: self.model,
            accommodation: self.accommodation,
            wall_temperature: self.wall_temperature,
            specular_fraction: self.specular_fraction,
            reflection_ratio: self.reflection_ratio,
            energy_loss: self.energy_loss,
        }
    }

    /// Checks that a run can be set up from this configuration.
    pub fn validate(&self) -> Result<()> {
        if self.species.is_empty() {
            return Err(DragError::Configuration(
                "species table is empty".to_string(),
            ));
        }
        if !self
            .species
            .values()
            .any(|sp| sp.mass > 0.0 && sp.density > 0.0)
        {
            return Err(DragError::Configuration(
                "no species has positive mass and density".to_string(),
            ));
        }
        if self.flow().normalize().is_none() {
            return Err(DragError::Configuration(
                "flow velocity is zero".to_string(),
            ));
        }
        for (name, value) in [
            ("reflection_ratio", self.reflection_ratio),
            ("absorption_ratio", self.absorption_ratio),
            ("energy_loss", self.energy_loss),
            ("accommodation", self.accommodation),
            ("specular_fraction", self.specular_fraction),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(DragError::Configuration(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        if self.temperature.is_nan() || self.temperature < 0.0 {
            return Err(DragError::Configuration(format!(
                "temperature must be non-negative, got {}",
                self.temperature
            )));
        }
        if self.wall_temperature.is_nan() || self.wall_temperature < 0.0 {
            return Err(DragError::Configuration(format!(
                "wall_temperature must be non-negative, got {}",
                self.wall_temperature
            )));
        }
        if self.padding_fraction.is_nan() || self.padding_fraction < 0.0 {
            return Err(DragError::Configuration(format!(
                "padding_fraction must be non-negative, got {}",
                self.padding_fraction
            )));
        }
        if self.ranks == 0 {
            return Err(DragError::Configuration(
                "ranks must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn air() -> SimulationConfig {
        SimulationConfig::new()
            .with_species("N2", 4.65e-26, 0.8e20)
            .with_species("O", 2.66e-26, 0.2e20)
    }

    #[test]
    fn test_config_defaults() {
        let config = SimulationConfig::new();
        assert_eq!(config.ray_count, 1000);
        assert_eq!(config.model, ScatteringModel::Dria);
        assert_eq!(config.geometry_file, PathBuf::from("models/Cube.obj"));
        assert!((config.energy_loss - 0.1).abs() < 1e-10);
        assert!((config.wall_temperature - 300.0).abs() < 1e-10);
        assert!(config.flow().is_close(&Vector::new(0., 0., -1.)));
        assert_eq!(config.ranks, 1);
    }

    #[test]
    fn test_config_default_trait() {
        let config: SimulationConfig = Default::default();
        assert_eq!(config.ray_count, 1000);
    }

    #[test]
    fn test_validate() {
        assert!(air().validate().is_ok());

        let empty = SimulationConfig::new();
        assert!(matches!(
            empty.validate(),
            Err(DragError::Configuration(_))
        ));

        let inert = SimulationConfig::new().with_species("X", 0.0, 1.0);
        assert!(inert.validate().is_err());

        let mut still = air();
        still.flow_velocity = [0.0; 3];
        assert!(still.validate().is_err());

        let mut lossy = air();
        lossy.energy_loss = 1.5;
        assert!(lossy.validate().is_err());

        let mut no_ranks = air();
        no_ranks.ranks = 0;
        assert!(no_ranks.validate().is_err());
    }

    #[test]
    fn test_species_list_sorted() {
        let names: Vec<String> = air().species_list().iter().map(|s| s.name.clone()).collect();
        assert_eq!(names, vec!["N2".to_string(), "O".to_string()]);
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        let mut f = File::create(&path).unwrap();
        write!(
            f,
            r#"{{
                "geometry_file": "body.stl",
                "model": "Sentman",
                "ray_count": 250,
                "flow_velocity": [7500.0, 0.0, 0.0],
                "species": {{
                    "N2": {{ "mass": 4.65e-26, "density": 8e19 }},
                    "O": {{ "mass": 2.66e-26, "density": 2e19 }}
                }}
            }}"#
        )
        .unwrap();
        drop(f);

        let config = SimulationConfig::from_json_file(&path).unwrap();
        assert_eq!(config.model, ScatteringModel::Sentman);
        assert_eq!(config.ray_count, 250);
        assert_eq!(config.species.len(), 2);
        // Unset keys keep their defaults
        assert!((config.reflection_ratio - 0.5).abs() < 1e-10);
        assert_eq!(config.seed, None);
    }

    #[test]
    fn test_from_json_file_rejects_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        std::fs::write(&path, r#"{ "ray_count": 10 }"#).unwrap();
        let err = SimulationConfig::from_json_file(&path).unwrap_err();
        assert!(format!("{err:#}").contains("species"));

        assert!(SimulationConfig::from_json_file(&dir.path().join("missing.json")).is_err());
    }
}
