//! Velocity sampling from a drifting Maxwellian.
//!
//! Particles injected through a plane perpendicular to the drift are
//! distributed by flux, not by volume: directions are cosine-weighted about
//! the drift axis and only velocities crossing the plane forward are kept.

use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::Vector;
use crate::error::{DragError, Result};
use crate::geom::frame::Frame;
use crate::sim::BOLTZMANN;
use crate::sim::engine::reflection::cosine_weighted_direction;

/// Flux-weighted velocity sampler for one species.
#[derive(Debug, Clone)]
pub struct MaxwellSampler {
    drift: Vector,
    frame: Frame,
    speed: Normal<f64>,
}

impl MaxwellSampler {
    /// Creates a sampler for gas at `temperature` (K) made of molecules of
    /// `mass` (kg) moving with bulk velocity `drift` (m/s).
    pub fn new(temperature: f64, mass: f64, drift: Vector) -> Result<Self> {
        if mass.is_nan() || mass <= 0.0 {
            return Err(DragError::Configuration(format!(
                "species mass must be positive, got {mass}"
            )));
        }
        if temperature.is_nan() || temperature < 0.0 {
            return Err(DragError::Configuration(format!(
                "temperature must be non-negative, got {temperature}"
            )));
        }
        let frame = Frame::around(drift)
            .ok_or_else(|| DragError::Configuration("flow velocity is zero".to_string()))?;
        let sigma = (BOLTZMANN * temperature / mass).sqrt();
        let speed = Normal::new(0.0, sigma)
            .map_err(|e| DragError::NumericDegenerate(format!("thermal speed {sigma}: {e}")))?;
        Ok(Self {
            drift,
            frame,
            speed,
        })
    }

    /// Unit vector along the drift.
    pub fn drift_direction(&self) -> Vector {
        self.frame.axis
    }

    /// Standard deviation of one thermal velocity component (m/s).
    pub fn thermal_speed(&self) -> f64 {
        self.speed.std_dev()
    }

    /// Draws a velocity with a positive component along the drift.
    pub fn sample_velocity<R: Rng + ?Sized>(&self, rng: &mut R) -> Vector {
        loop {
            let dir = cosine_weighted_direction(&self.frame, rng);
            let speed = self.speed.sample(rng).abs();
            let velocity = dir * speed + self.drift;
            if velocity.dot(self.frame.axis) > 0.0 {
                return velocity;
            }
        }
    }
}
