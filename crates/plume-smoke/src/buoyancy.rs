//! Thermal buoyancy.

use crate::error::SmokeResult;
use crate::field::{GridField, Slot};
use crate::pass::dispatch;
use rhizome_plume_backend::{BufferHandle, ComputeBackend, Kernel};

/// Pushes hot gas up and dense smoke down.
///
/// `v.y += dt * ((T - ambient) * buoyancy - density * smoke_weight)`, with the
/// coefficients taken from the general parameter block.
#[derive(Clone, Copy, Debug, Default)]
pub struct BuoyancyStage;

impl BuoyancyStage {
    /// Writes the accelerated velocity into `velocity.Write`.
    pub fn apply<B: ComputeBackend + ?Sized>(
        &self,
        backend: &mut B,
        velocity: &GridField,
        temperature: BufferHandle,
        density: BufferHandle,
    ) -> SmokeResult<Slot> {
        dispatch(
            backend,
            Kernel::Buoyancy,
            &[velocity.read(), temperature, density],
            velocity.write(),
        )?;
        Ok(Slot::Write)
    }
}
