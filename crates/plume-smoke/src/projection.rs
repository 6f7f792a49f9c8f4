//! Pressure projection.

use crate::error::SmokeResult;
use crate::field::{GridField, Slot};
use crate::pass::dispatch;
use rhizome_plume_backend::{ComputeBackend, Kernel};

/// Makes the velocity field (approximately) divergence free.
///
/// Solves `∇²p = ∇·v` with a fixed number of Jacobi iterations from a zero
/// initial guess and subtracts `∇p` from the velocity. Domain walls are
/// closed: the divergence treats flow through them as reflected.
#[derive(Clone, Copy, Debug)]
pub struct ProjectionStage {
    /// Jacobi iterations per solve. No residual check is made.
    pub iterations: u32,
}

impl ProjectionStage {
    /// Creates a projection stage.
    pub fn new(iterations: u32) -> Self {
        Self { iterations }
    }

    /// Writes `∇·velocity.Read` into `divergence.Read`.
    pub fn compute_divergence<B: ComputeBackend + ?Sized>(
        &self,
        backend: &mut B,
        velocity: &GridField,
        divergence: &GridField,
    ) -> SmokeResult<()> {
        dispatch(backend, Kernel::Divergence, &[velocity.read()], divergence.read())
    }

    /// Clears `pressure.Read` and relaxes it `iterations` times.
    ///
    /// The result is left in `pressure.Read`.
    pub fn solve_pressure<B: ComputeBackend + ?Sized>(
        &self,
        backend: &mut B,
        pressure: &mut GridField,
        divergence: &GridField,
    ) -> SmokeResult<()> {
        pressure.clear(backend, Slot::Read)?;
        for _ in 0..self.iterations {
            dispatch(
                backend,
                Kernel::Jacobi,
                &[pressure.read(), divergence.read()],
                pressure.write(),
            )?;
            pressure.promote(Slot::Write);
        }
        Ok(())
    }

    /// Writes `velocity.Read - ∇pressure.Read` into `velocity.Write`.
    pub fn subtract_gradient<B: ComputeBackend + ?Sized>(
        &self,
        backend: &mut B,
        velocity: &GridField,
        pressure: &GridField,
    ) -> SmokeResult<Slot> {
        dispatch(
            backend,
            Kernel::SubtractGradient,
            &[velocity.read(), pressure.read()],
            velocity.write(),
        )?;
        Ok(Slot::Write)
    }

    /// Runs divergence, pressure solve and gradient subtraction.
    pub fn project<B: ComputeBackend + ?Sized>(
        &self,
        backend: &mut B,
        velocity: &GridField,
        pressure: &mut GridField,
        divergence: &GridField,
    ) -> SmokeResult<Slot> {
        self.compute_divergence(backend, velocity, divergence)?;
        self.solve_pressure(backend, pressure, divergence)?;
        self.subtract_gradient(backend, velocity, pressure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{UVec3, Vec3};
    use rhizome_plume_backend::kernels::{self, Grid};
    use rhizome_plume_backend::{CpuBackend, ElementFormat, GeneralParams, ParamBlock};

    struct Fixture {
        backend: CpuBackend,
        velocity: GridField,
        pressure: GridField,
        divergence: GridField,
        grid: Grid,
    }

    fn fixture(dims: UVec3, velocity_at: impl Fn(Vec3) -> Vec3) -> Fixture {
        let grid = Grid::new(dims);
        let mut backend = CpuBackend::new();
        backend
            .write_params(ParamBlock::General(GeneralParams::new(
                dims, 0.125, 1.0, 0.05, 0.0, 0.0,
            )))
            .unwrap();
        let velocity =
            GridField::allocate(&mut backend, "velocity", dims, ElementFormat::Vector3, 2)
                .unwrap();
        let pressure =
            GridField::allocate(&mut backend, "pressure", dims, ElementFormat::Scalar, 2).unwrap();
        let divergence =
            GridField::allocate(&mut backend, "divergence", dims, ElementFormat::Scalar, 1)
                .unwrap();
        let data: Vec<f32> = (0..grid.len())
            .flat_map(|i| velocity_at(grid.coords(i).as_vec3()).to_array())
            .collect();
        backend.write_buffer(velocity.read(), &data).unwrap();
        Fixture {
            backend,
            velocity,
            pressure,
            divergence,
            grid,
        }
    }

    fn mean_abs_divergence(grid: Grid, velocity: &[f32]) -> f32 {
        let v: Vec<Vec3> = velocity
            .chunks_exact(3)
            .map(|c| Vec3::new(c[0], c[1], c[2]))
            .collect();
        let mut div = vec![0.0; grid.len()];
        kernels::divergence(grid, &v, &mut div);
        div.iter().map(|d| d.abs()).sum::<f32>() / grid.len() as f32
    }

    #[test]
    fn test_projection_reduces_divergence() {
        // A source in the middle of the box.
        let mut f = fixture(UVec3::splat(8), |p| {
            let r = p - Vec3::splat(3.5);
            r * (-r.length_squared() / 4.0).exp()
        });
        let before = f.backend.read_buffer(f.velocity.read()).unwrap();
        let slot = ProjectionStage::new(30)
            .project(&mut f.backend, &f.velocity, &mut f.pressure, &f.divergence)
            .unwrap();
        f.velocity.promote(slot);
        let after = f.backend.read_buffer(f.velocity.read()).unwrap();

        let pre = mean_abs_divergence(f.grid, &before);
        let post = mean_abs_divergence(f.grid, &after);
        assert!(pre > 0.0);
        assert!(post < pre * 0.8, "{post} vs {pre}");
    }

    #[test]
    fn test_zero_iterations_passthrough() {
        let mut f = fixture(UVec3::splat(4), |p| Vec3::new(p.y, p.z * 0.5, -p.x));
        let before = f.backend.read_buffer(f.velocity.read()).unwrap();
        let slot = ProjectionStage::new(0)
            .project(&mut f.backend, &f.velocity, &mut f.pressure, &f.divergence)
            .unwrap();
        f.velocity.promote(slot);
        assert_eq!(f.backend.read_buffer(f.velocity.read()).unwrap(), before);
    }

    #[test]
    fn test_pressure_cold_start() {
        let mut f = fixture(UVec3::splat(4), |_| Vec3::ZERO);
        let p = f.pressure.read();
        f.backend.write_buffer(p, &[5.0; 64]).unwrap();
        ProjectionStage::new(0)
            .solve_pressure(&mut f.backend, &mut f.pressure, &f.divergence)
            .unwrap();
        assert_eq!(f.backend.read_buffer(f.pressure.read()).unwrap(), vec![0.0; 64]);
    }

    #[test]
    fn test_still_air_has_no_divergence() {
        let mut f = fixture(UVec3::splat(6), |_| Vec3::ZERO);
        ProjectionStage::new(1)
            .compute_divergence(&mut f.backend, &f.velocity, &f.divergence)
            .unwrap();
        let div = f.backend.read_buffer(f.divergence.read()).unwrap();
        assert!(div.iter().all(|&d| d == 0.0));
    }
}
