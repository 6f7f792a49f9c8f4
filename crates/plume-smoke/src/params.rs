//! Simulation parameters.

use crate::error::{SmokeError, SmokeResult};
use glam::{UVec3, Vec3};
use rhizome_plume_backend::GeneralParams;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for the smoke solver.
///
/// Dissipation factors above 1 amplify the field every step and will
/// eventually blow up; they are allowed but not useful.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SimulationParameters {
    /// Grid extent in cells. Fixed for the lifetime of a solver.
    pub dimensions: UVec3,
    /// Time step.
    pub time_step: f32,
    /// Multiplier applied to velocity on every advection.
    pub velocity_dissipation: f32,
    /// Multiplier applied to density on every advection.
    pub density_dissipation: f32,
    /// Multiplier applied to temperature on every advection (cooling).
    pub temperature_dissipation: f32,
    /// Buoyancy coefficient (how much hot gas rises).
    pub buoyancy: f32,
    /// Downward force per unit density.
    pub smoke_weight: f32,
    /// Temperature that produces no lift.
    pub ambient_temperature: f32,
    /// Temperature injected at the source each step.
    pub impulse_temperature: f32,
    /// Density injected at the source each step.
    pub impulse_density: f32,
    /// Radius of the source in cells.
    pub impulse_radius: f32,
    /// Jacobi iterations per pressure solve.
    pub jacobi_iterations: u32,
    /// Use MacCormack correction instead of plain semi-Lagrangian advection.
    pub maccormack_enabled: bool,
    /// Vorticity confinement strength; 0 disables the stage.
    pub vorticity_strength: f32,
}

impl Default for SimulationParameters {
    fn default() -> Self {
        Self {
            dimensions: UVec3::splat(64),
            time_step: 0.125,
            velocity_dissipation: 0.999,
            density_dissipation: 0.999,
            temperature_dissipation: 0.99,
            buoyancy: 1.0,
            smoke_weight: 0.05,
            ambient_temperature: 0.0,
            impulse_temperature: 1.5,
            impulse_density: 1.0,
            impulse_radius: 3.0,
            jacobi_iterations: 15,
            maccormack_enabled: true,
            vorticity_strength: 0.0,
        }
    }
}

impl SimulationParameters {
    /// Creates default parameters for a grid of the given size.
    pub fn new(dimensions: UVec3) -> Self {
        Self {
            dimensions,
            ..Default::default()
        }
    }

    /// Sets the time step.
    pub fn with_time_step(mut self, time_step: f32) -> Self {
        self.time_step = time_step;
        self
    }

    /// Sets velocity, density and temperature dissipation.
    pub fn with_dissipation(mut self, velocity: f32, density: f32, temperature: f32) -> Self {
        self.velocity_dissipation = velocity;
        self.density_dissipation = density;
        self.temperature_dissipation = temperature;
        self
    }

    /// Sets the buoyancy coefficient and smoke weight.
    pub fn with_buoyancy(mut self, buoyancy: f32, smoke_weight: f32) -> Self {
        self.buoyancy = buoyancy;
        self.smoke_weight = smoke_weight;
        self
    }

    /// Sets the ambient temperature.
    pub fn with_ambient_temperature(mut self, ambient_temperature: f32) -> Self {
        self.ambient_temperature = ambient_temperature;
        self
    }

    /// Sets the source temperature, density and radius.
    pub fn with_impulse(mut self, temperature: f32, density: f32, radius: f32) -> Self {
        self.impulse_temperature = temperature;
        self.impulse_density = density;
        self.impulse_radius = radius;
        self
    }

    /// Sets the number of Jacobi iterations.
    pub fn with_jacobi_iterations(mut self, iterations: u32) -> Self {
        self.jacobi_iterations = iterations;
        self
    }

    /// Enables or disables MacCormack correction.
    pub fn with_maccormack(mut self, enabled: bool) -> Self {
        self.maccormack_enabled = enabled;
        self
    }

    /// Sets the vorticity confinement strength.
    pub fn with_vorticity_strength(mut self, strength: f32) -> Self {
        self.vorticity_strength = strength;
        self
    }

    /// Centre of the smoke source: bottom centre of the grid.
    pub fn impulse_point(&self) -> Vec3 {
        Vec3::new(
            self.dimensions.x as f32 * 0.5,
            0.0,
            self.dimensions.z as f32 * 0.5,
        )
    }

    /// Checks that the parameters describe a runnable simulation.
    pub fn validate(&self) -> SmokeResult<()> {
        if self.dimensions.cmpeq(UVec3::ZERO).any() {
            return Err(SmokeError::InvalidParameters(format!(
                "dimensions {} have an empty axis",
                self.dimensions
            )));
        }
        if !self.time_step.is_finite() || self.time_step <= 0.0 {
            return Err(SmokeError::InvalidParameters(format!(
                "time step must be positive, got {}",
                self.time_step
            )));
        }
        let coefficients = [
            ("velocity_dissipation", self.velocity_dissipation),
            ("density_dissipation", self.density_dissipation),
            ("temperature_dissipation", self.temperature_dissipation),
            ("buoyancy", self.buoyancy),
            ("smoke_weight", self.smoke_weight),
            ("ambient_temperature", self.ambient_temperature),
            ("impulse_temperature", self.impulse_temperature),
            ("impulse_density", self.impulse_density),
            ("impulse_radius", self.impulse_radius),
            ("vorticity_strength", self.vorticity_strength),
        ];
        if let Some((name, value)) = coefficients.iter().find(|(_, v)| !v.is_finite()) {
            return Err(SmokeError::InvalidParameters(format!(
                "{name} must be finite, got {value}"
            )));
        }
        Ok(())
    }

    /// The general parameter block kernels read.
    pub fn general_params(&self) -> GeneralParams {
        GeneralParams::new(
            self.dimensions,
            self.time_step,
            self.buoyancy,
            self.smoke_weight,
            self.ambient_temperature,
            self.vorticity_strength,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let p = SimulationParameters::default();
        assert_eq!(p.dimensions, UVec3::splat(64));
        assert_eq!(p.time_step, 0.125);
        assert_eq!(p.jacobi_iterations, 15);
        assert!(p.maccormack_enabled);
        assert_eq!(p.vorticity_strength, 0.0);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_impulse_point_bottom_centre() {
        let p = SimulationParameters::new(UVec3::new(16, 32, 8));
        assert_eq!(p.impulse_point(), Vec3::new(8.0, 0.0, 4.0));
    }

    #[test]
    fn test_validate_rejects_empty_axis() {
        let p = SimulationParameters::new(UVec3::new(16, 0, 16));
        assert!(matches!(p.validate(), Err(SmokeError::InvalidParameters(_))));
    }

    #[test]
    fn test_validate_rejects_bad_time_step() {
        for dt in [0.0, -0.1, f32::NAN, f32::INFINITY] {
            let p = SimulationParameters::default().with_time_step(dt);
            assert!(p.validate().is_err(), "time step {dt} accepted");
        }
    }

    #[test]
    fn test_validate_rejects_non_finite() {
        let p = SimulationParameters::default().with_buoyancy(f32::NAN, 0.05);
        assert!(p.validate().is_err());
        let p = SimulationParameters::default().with_vorticity_strength(f32::INFINITY);
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_general_params() {
        let p = SimulationParameters::new(UVec3::new(4, 5, 6)).with_buoyancy(2.0, 0.1);
        let g = p.general_params();
        assert_eq!(g.dimensions, [4, 5, 6, 0]);
        assert_eq!(g.buoyancy, 2.0);
        assert_eq!(g.smoke_weight, 0.1);
        assert_eq!(g.time_step, 0.125);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_roundtrip() {
        let p = SimulationParameters::new(UVec3::splat(32)).with_jacobi_iterations(40);
        let json = serde_json::to_string(&p).unwrap();
        let back: SimulationParameters = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }
}
