use std::collections::BTreeMap;
use std::fmt;

use crate::Vector;
use crate::geom::mesh::{PanelId, TriangleMesh};

use super::config::SimulationConfig;
use super::simulation::{SimulationResult, TraceStats};

/// Physical summary of a finished run.
#[derive(Debug, Clone)]
pub struct DragReport {
    /// Momentum change of the gas, summed over all wall hits (N)
    pub total_force: Vector,
    pub flow_direction: Vector,
    /// `total_force` projected on the flow direction
    pub drag_along_flow: f64,
    /// Half the wetted surface area (m^2)
    pub reference_area: f64,
    /// Set when a dynamic pressure is configured
    pub drag_coefficient: Option<f64>,
    /// Set when a free-stream mass density is configured
    pub scaled_force: Option<Vector>,
    pub stats: TraceStats,
    pub weight_sum: f64,
    pub panel_hits: BTreeMap<PanelId, usize>,
}

impl DragReport {
    /// `plane_area` is the area of the injection plane the particles were
    /// launched from.
    pub fn new(
        config: &SimulationConfig,
        mesh: &TriangleMesh,
        plane_area: f64,
        result: &SimulationResult,
    ) -> Self {
        let flow = config.flow();
        let flow_direction = flow.normalize().unwrap_or(flow);
        let total_force = result.forces.total_force();
        let drag_along_flow = total_force.dot(flow_direction);
        let reference_area = mesh.total_area() / 2.0;

        let drag_coefficient = config
            .dynamic_pressure
            .map(|q| reference_area * q)
            .filter(|denom| *denom > 0.0)
            .map(|denom| -drag_along_flow / denom);

        let scaled_force = config.mass_density.map(|rho| {
            let mass_flux = rho * flow.length() * plane_area;
            result.forces.compute_scaled_force(mass_flux)
        });

        let panel_hits = result
            .forces
            .panel_forces()
            .iter()
            .map(|(id, p)| (*id, p.hits))
            .collect();

        Self {
            total_force,
            flow_direction,
            drag_along_flow,
            reference_area,
            drag_coefficient,
            scaled_force,
            stats: result.stats,
            weight_sum: result.weight_sum,
            panel_hits,
        }
    }
}

impl fmt::Display for DragReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[RESULT] Total force: {}", self.total_force)?;
        writeln!(f, "[RESULT] Drag force: {:.6e} N", self.drag_along_flow)?;
        if let Some(cd) = self.drag_coefficient {
            writeln!(f, "[RESULT] Total C_d: {cd:.6}")?;
        }
        if let Some(scaled) = self.scaled_force {
            writeln!(f, "[RESULT] Scaled force: {scaled}")?;
        }
        writeln!(f, "[STATS] Total rays: {}", self.stats.particles)?;
        writeln!(f, "[STATS] Rays with hits: {}", self.stats.particles_with_hits)?;
        writeln!(f, "[STATS] Total hits: {}", self.stats.total_hits)?;
        writeln!(f, "[STATS] Avg. hits per ray: {:.4}", self.stats.mean_hits())?;
        writeln!(f, "[STATS] Max bounces: {}", self.stats.max_bounces)?;
        writeln!(
            f,
            "[STATS] Escaped / energy floor / bounce limit / inactive: {} / {} / {} / {}",
            self.stats.escaped,
            self.stats.energy_floor,
            self.stats.bounce_limit,
            self.stats.inactive
        )?;
        write!(f, "[STATS] Weight sum: {:.6e}", self.weight_sum)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::Point;
    use crate::sim::forces::ForceAccumulator;
    use crate::sim::particle::{Particle, Species};

    fn result_with_impulse() -> SimulationResult {
        // One hit on panel 2 turning a -z particle around: +4 along z.
        let sp = Arc::new(Species::new("N2", 1.0, 1.0));
        let o = Point::new(0., 0., 0.);
        let incident = Particle::new(o, Vector::new(0., 0., -2.), sp.clone(), 1.0).unwrap();
        let mut reflected = Particle::new(o, Vector::new(0., 0., 2.), sp, 1.0).unwrap();
        reflected.panel_id = Some(2);
        let mut forces = ForceAccumulator::new();
        forces.accumulate_force(&incident, &reflected, 0.5);
        SimulationResult {
            forces,
            weight_sum: 3.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_drag_coefficient() {
        let mut config = SimulationConfig::new();
        config.flow_velocity = [0.0, 0.0, -10.0];
        config.dynamic_pressure = Some(2.0);
        let cube = TriangleMesh::cuboid(Point::new(0., 0., 0.), Point::new(1., 1., 1.));
        let report = DragReport::new(&config, &cube, 1.0, &result_with_impulse());

        assert!((report.drag_along_flow + 4.0).abs() < 1e-12);
        assert!((report.reference_area - 3.0).abs() < 1e-12);
        // C_d = 4 / (3 * 2)
        assert!((report.drag_coefficient.unwrap() - 4.0 / 6.0).abs() < 1e-12);
        assert!(report.scaled_force.is_none());
        assert_eq!(report.panel_hits[&2], 1);
    }

    #[test]
    fn test_scaled_force() {
        let mut config = SimulationConfig::new();
        config.flow_velocity = [0.0, 0.0, -10.0];
        config.mass_density = Some(0.1);
        let cube = TriangleMesh::cuboid(Point::new(0., 0., 0.), Point::new(1., 1., 1.));
        let report = DragReport::new(&config, &cube, 2.0, &result_with_impulse());
        // Target flux 0.1 * 10 * 2 = 2 over a summed magnitude of 4
        let scaled = report.scaled_force.unwrap();
        assert!((scaled - Vector::new(0., 0., 2.)).length() < 1e-12);
        assert!(report.drag_coefficient.is_none());
    }

    #[test]
    fn test_display() {
        let config = SimulationConfig::new();
        let cube = TriangleMesh::cuboid(Point::new(0., 0., 0.), Point::new(1., 1., 1.));
        let text = DragReport::new(&config, &cube, 1.0, &result_with_impulse()).to_string();
        assert!(text.contains("Drag force"));
        assert!(text.contains("Max bounces"));
        assert!(!text.contains("C_d"));
    }
}
