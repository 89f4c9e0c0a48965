use std::collections::BTreeMap;

use crate::Vector;
use crate::geom::mesh::PanelId;
use crate::sim::particle::Particle;

/// Momentum transfer collected on one panel.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PanelForce {
    /// Sum of weighted momentum changes of the gas
    pub force: Vector,
    /// Geometric area of the panel (m^2)
    pub area: f64,
    pub hits: usize,
}

impl PanelForce {
    /// Force per unit area, zero for a panel without area.
    pub fn pressure(&self) -> f64 {
        if self.area > 0.0 {
            self.force.length() / self.area
        } else {
            0.0
        }
    }
}

/// Total and per-panel momentum transfer.
///
/// Each worker owns one accumulator; partial accumulators are combined with
/// [`ForceAccumulator::merge`], which is associative and commutative.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForceAccumulator {
    total: Vector,
    panels: BTreeMap<PanelId, PanelForce>,
}

impl ForceAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `(reflected.momentum - incident.momentum) * incident.weight` to the
    /// total and to the panel `reflected` was emitted from.
    pub fn accumulate_force(&mut self, incident: &Particle, reflected: &Particle, panel_area: f64) {
        let impulse = (reflected.momentum - incident.momentum) * incident.weight;
        self.total += impulse;

        if let Some(id) = reflected.panel_id {
            let panel = self.panels.entry(id).or_default();
            panel.force += impulse;
            panel.area = panel.area.max(panel_area);
            panel.hits += 1;
        }
    }

    /// Folds `other` into `self`.
    pub fn merge(&mut self, other: &ForceAccumulator) {
        self.total += other.total;
        for (id, theirs) in &other.panels {
            let ours = self.panels.entry(*id).or_default();
            ours.force += theirs.force;
            ours.area = ours.area.max(theirs.area);
            ours.hits += theirs.hits;
        }
    }

    pub fn total_force(&self) -> Vector {
        self.total
    }

    pub fn panel_forces(&self) -> &BTreeMap<PanelId, PanelForce> {
        &self.panels
    }

    pub fn total_hits(&self) -> usize {
        self.panels.values().map(|p| p.hits).sum()
    }

    /// Rescales the total so that the summed per-panel force magnitudes
    /// equal `total_physical_mass_flux`.
    ///
    /// Returns the unscaled total if no panel carries any force.
    pub fn compute_scaled_force(&self, total_physical_mass_flux: f64) -> Vector {
        let summed: f64 = self.panels.values().map(|p| p.force.length()).sum();
        if summed > 0.0 {
            self.total * (total_physical_mass_flux / summed)
        } else {
            self.total
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::Point;
    use crate::sim::particle::Species;

    fn pair(vin: Vector, vout: Vector, weight: f64, panel: PanelId) -> (Particle, Particle) {
        let sp = Arc::new(Species::new("N2", 2.0, 1.0));
        let o = Point::new(0., 0., 0.);
        let incident = Particle::new(o, vin, sp.clone(), weight).unwrap();
        let mut reflected = Particle::new(o, vout, sp, weight).unwrap();
        reflected.panel_id = Some(panel);
        (incident, reflected)
    }

    fn sample_pairs() -> Vec<(Particle, Particle)> {
        vec![
            pair(Vector::new(0., 0., -3.), Vector::new(0., 0., 1.), 1.0, 0),
            pair(Vector::new(1., 0., -2.), Vector::new(0.5, 0.5, 1.), 2.5, 1),
            pair(Vector::new(0., 1., -1.), Vector::new(0., -1., 1.), 0.3, 0),
            pair(Vector::new(-2., 0., -1.), Vector::new(1., 0., 0.5), 1.7, 4),
            pair(Vector::new(0., 0., -9.), Vector::new(0.1, 0., 2.), 0.9, 1),
        ]
    }

    #[test]
    fn test_accumulate_weighted_delta() {
        let (i, r) = pair(Vector::new(0., 0., -3.), Vector::new(0., 0., 1.), 2.0, 5);
        let mut acc = ForceAccumulator::new();
        acc.accumulate_force(&i, &r, 0.5);
        // (2 - (-6)) * 2 = 16 along +z
        assert!(acc.total_force().is_close(&Vector::new(0., 0., 16.)));
        let panel = acc.panel_forces()[&5];
        assert!(panel.force.is_close(&Vector::new(0., 0., 16.)));
        assert_eq!(panel.area, 0.5);
        assert_eq!(panel.hits, 1);
        assert!((panel.pressure() - 32.0).abs() < 1e-12);
    }

    #[test]
    fn test_unattached_counts_only_in_total() {
        let (i, mut r) = pair(Vector::new(0., 0., -1.), Vector::new(0., 0., 1.), 1.0, 0);
        r.panel_id = None;
        let mut acc = ForceAccumulator::new();
        acc.accumulate_force(&i, &r, 1.0);
        assert!(acc.panel_forces().is_empty());
        assert!(acc.total_force().is_close(&Vector::new(0., 0., 4.)));
    }

    #[test]
    fn test_merge_matches_direct_accumulation() {
        let pairs = sample_pairs();
        let mut direct = ForceAccumulator::new();
        for (i, r) in &pairs {
            direct.accumulate_force(i, r, 1.0);
        }

        let mut a = ForceAccumulator::new();
        let mut b = ForceAccumulator::new();
        for (k, (i, r)) in pairs.iter().enumerate() {
            if k % 2 == 0 {
                a.accumulate_force(i, r, 1.0);
            } else {
                b.accumulate_force(i, r, 1.0);
            }
        }
        let mut ab = a.clone();
        ab.merge(&b);
        let mut ba = b.clone();
        ba.merge(&a);

        for merged in [&ab, &ba] {
            assert!((merged.total_force() - direct.total_force()).length() < 1e-12);
            assert_eq!(merged.total_hits(), direct.total_hits());
            for (id, p) in direct.panel_forces() {
                let q = merged.panel_forces()[id];
                assert!((q.force - p.force).length() < 1e-12);
                assert_eq!(q.hits, p.hits);
            }
        }
    }

    #[test]
    fn test_merge_associative() {
        let pairs = sample_pairs();
        let parts: Vec<ForceAccumulator> = pairs
            .iter()
            .map(|(i, r)| {
                let mut acc = ForceAccumulator::new();
                acc.accumulate_force(i, r, 1.0);
                acc
            })
            .collect();

        let mut left = parts[0].clone();
        left.merge(&parts[1]);
        left.merge(&parts[2]);

        let mut right_tail = parts[1].clone();
        right_tail.merge(&parts[2]);
        let mut right = parts[0].clone();
        right.merge(&right_tail);

        assert!((left.total_force() - right.total_force()).length() < 1e-12);
        assert_eq!(left.panel_forces().len(), right.panel_forces().len());
    }

    #[test]
    fn test_scaled_force() {
        let mut acc = ForceAccumulator::new();
        assert!(acc.compute_scaled_force(10.0).is_close(&Vector::zero()));

        let (i, r) = pair(Vector::new(0., 0., -1.), Vector::new(0., 0., 1.), 1.0, 0);
        acc.accumulate_force(&i, &r, 1.0);
        // Total and panel magnitude are both 4, so the result has magnitude 10
        let scaled = acc.compute_scaled_force(10.0);
        assert!(scaled.is_close(&Vector::new(0., 0., 10.)));
    }
}
