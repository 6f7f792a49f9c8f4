//! Vorticity confinement.

use crate::error::SmokeResult;
use crate::field::{GridField, Slot};
use crate::pass::dispatch;
use rhizome_plume_backend::{ComputeBackend, Kernel};

/// Re-injects small-scale swirl that numerical dissipation smooths away.
///
/// The strength comes from the general parameter block; the solver skips
/// this stage entirely when it is zero.
#[derive(Clone, Copy, Debug, Default)]
pub struct VorticityStage;

impl VorticityStage {
    /// Computes the curl of `velocity.Read` into `vorticity.Read`.
    pub fn compute_vorticity<B: ComputeBackend + ?Sized>(
        &self,
        backend: &mut B,
        velocity: &GridField,
        vorticity: &GridField,
    ) -> SmokeResult<()> {
        dispatch(backend, Kernel::Vorticity, &[velocity.read()], vorticity.read())
    }

    /// Adds the confinement force to `velocity.Read`, writing `velocity.Write`.
    pub fn apply_confinement<B: ComputeBackend + ?Sized>(
        &self,
        backend: &mut B,
        velocity: &GridField,
        vorticity: &GridField,
    ) -> SmokeResult<Slot> {
        dispatch(
            backend,
            Kernel::Confinement,
            &[velocity.read(), vorticity.read()],
            velocity.write(),
        )?;
        Ok(Slot::Write)
    }

    /// Runs both passes.
    pub fn apply<B: ComputeBackend + ?Sized>(
        &self,
        backend: &mut B,
        velocity: &GridField,
        vorticity: &GridField,
    ) -> SmokeResult<Slot> {
        self.compute_vorticity(backend, velocity, vorticity)?;
        self.apply_confinement(backend, velocity, vorticity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{UVec3, Vec3};
    use rhizome_plume_backend::{CpuBackend, ElementFormat, GeneralParams, ParamBlock};

    #[test]
    fn test_vortex_gains_speed() {
        let dims = UVec3::splat(9);
        let mut backend = CpuBackend::new();
        backend
            .write_params(ParamBlock::General(GeneralParams::new(
                dims, 0.125, 1.0, 0.05, 0.0, 2.0,
            )))
            .unwrap();
        let mut velocity =
            GridField::allocate(&mut backend, "velocity", dims, ElementFormat::Vector3, 2)
                .unwrap();
        let vorticity =
            GridField::allocate(&mut backend, "vorticity", dims, ElementFormat::Vector3, 1)
                .unwrap();

        // A Gaussian vortex about the z axis through the centre.
        let centre = Vec3::splat(4.0);
        let swirl: Vec<Vec3> = (0..729)
            .map(|i| {
                let p = Vec3::new((i % 9) as f32, ((i / 9) % 9) as f32, (i / 81) as f32);
                let r = p - centre;
                Vec3::new(-r.y, r.x, 0.0) * (-(r.x * r.x + r.y * r.y) / 4.0).exp()
            })
            .collect();
        let flat: Vec<f32> = swirl.iter().flat_map(|v| v.to_array()).collect();
        backend.write_buffer(velocity.read(), &flat).unwrap();

        let slot = VorticityStage
            .apply(&mut backend, &velocity, &vorticity)
            .unwrap();
        velocity.promote(slot);

        let curl = backend.read_buffer(vorticity.read()).unwrap();
        let centre_index = 4 * 81 + 4 * 9 + 4;
        assert!(curl[centre_index * 3 + 2] > 0.0);

        let energy = |data: &[f32]| data.iter().map(|v| v * v).sum::<f32>();
        let after = backend.read_buffer(velocity.read()).unwrap();
        assert!(energy(&after) > energy(&flat));
    }
}
