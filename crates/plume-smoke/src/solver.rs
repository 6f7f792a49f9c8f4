//! The per-step smoke pipeline.

use crate::advection::AdvectionStage;
use crate::buoyancy::BuoyancyStage;
use crate::error::{SmokeError, SmokeResult};
use crate::field::{GridField, Slot};
use crate::impulse::ImpulseStage;
use crate::params::SimulationParameters;
use crate::pass::{dispatch, upload};
use crate::projection::ProjectionStage;
use crate::vorticity::VorticityStage;
use rhizome_plume_backend::{BufferHandle, ComputeBackend, ElementFormat, Kernel, ParamBlock};

/// The fields a solver owns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Velocity (`Vector3`, 4 slots).
    Velocity,
    /// Smoke density (`Scalar`, 4 slots).
    Density,
    /// Temperature (`Scalar`, 4 slots).
    Temperature,
    /// Pressure (`Scalar`, 2 slots).
    Pressure,
    /// Velocity divergence before the last projection (`Scalar`, 1 slot).
    Divergence,
    /// Velocity curl (`Vector3`, 1 slot).
    Vorticity,
}

impl FieldKind {
    /// Every field.
    pub const ALL: [FieldKind; 6] = [
        FieldKind::Velocity,
        FieldKind::Density,
        FieldKind::Temperature,
        FieldKind::Pressure,
        FieldKind::Divergence,
        FieldKind::Vorticity,
    ];

    /// Field name used in errors and logs.
    pub fn name(self) -> &'static str {
        match self {
            FieldKind::Velocity => "velocity",
            FieldKind::Density => "density",
            FieldKind::Temperature => "temperature",
            FieldKind::Pressure => "pressure",
            FieldKind::Divergence => "divergence",
            FieldKind::Vorticity => "vorticity",
        }
    }

    fn format(self) -> ElementFormat {
        match self {
            FieldKind::Velocity | FieldKind::Vorticity => ElementFormat::Vector3,
            _ => ElementFormat::Scalar,
        }
    }

    fn slot_count(self) -> usize {
        match self {
            FieldKind::Velocity | FieldKind::Density | FieldKind::Temperature => 4,
            FieldKind::Pressure => 2,
            FieldKind::Divergence | FieldKind::Vorticity => 1,
        }
    }
}

/// 3D smoke simulation driven through a [`ComputeBackend`].
///
/// Each [`step`](Self::step) advects velocity, temperature and density,
/// applies buoyancy (and optionally vorticity confinement), injects heat and
/// smoke at the bottom centre of the grid and projects the velocity onto its
/// divergence-free part.
///
/// # Example
///
/// ```
/// use glam::UVec3;
/// use rhizome_plume_backend::CpuBackend;
/// use rhizome_plume_smoke::{FluidSolver, SimulationParameters};
///
/// let params = SimulationParameters::new(UVec3::splat(8));
/// let mut solver = FluidSolver::new(CpuBackend::new(), params).unwrap();
/// for _ in 0..3 {
///     solver.step().unwrap();
/// }
/// assert!(solver.total_density().unwrap() > 0.0);
/// ```
pub struct FluidSolver<B: ComputeBackend> {
    backend: B,
    params: SimulationParameters,
    velocity: GridField,
    density: GridField,
    temperature: GridField,
    pressure: GridField,
    divergence: GridField,
    vorticity: GridField,
    step_count: u64,
    general_dirty: bool,
}

impl<B: ComputeBackend> FluidSolver<B> {
    /// Allocates every field on `backend` and zeroes it.
    pub fn new(mut backend: B, params: SimulationParameters) -> SmokeResult<Self> {
        params.validate()?;
        let dims = params.dimensions;
        let max = backend.capabilities().max_dimension;
        if dims.max_element() > max {
            return Err(SmokeError::UnsupportedDimensions { dims, max });
        }

        let mut allocate = |kind: FieldKind| {
            GridField::allocate(
                &mut backend,
                kind.name(),
                dims,
                kind.format(),
                kind.slot_count(),
            )
        };
        let velocity = allocate(FieldKind::Velocity)?;
        let density = allocate(FieldKind::Density)?;
        let temperature = allocate(FieldKind::Temperature)?;
        let pressure = allocate(FieldKind::Pressure)?;
        let divergence = allocate(FieldKind::Divergence)?;
        let vorticity = allocate(FieldKind::Vorticity)?;

        for field in [
            &velocity,
            &density,
            &temperature,
            &pressure,
            &divergence,
            &vorticity,
        ] {
            field.clear_all(&mut backend)?;
        }

        log::info!(
            "smoke solver on {} backend, grid {}x{}x{}",
            backend.name(),
            dims.x,
            dims.y,
            dims.z
        );

        Ok(Self {
            backend,
            params,
            velocity,
            density,
            temperature,
            pressure,
            divergence,
            vorticity,
            step_count: 0,
            general_dirty: true,
        })
    }

    /// Advances the simulation by one time step.
    ///
    /// A backend failure aborts the step part way; field contents are then
    /// unspecified until [`reset`](Self::reset) or new data is written.
    pub fn step(&mut self) -> SmokeResult<()> {
        log::trace!("smoke step {}", self.step_count);
        self.upload_general()?;

        let p = &self.params;
        let backend = &mut self.backend;

        // Every quantity moves along the same pre-step velocity.
        let advection = AdvectionStage::new(p.maccormack_enabled);
        let velocity = self.velocity.read();
        let v = advection.advect(backend, velocity, &self.velocity, p.velocity_dissipation)?;
        let t = advection.advect(
            backend,
            velocity,
            &self.temperature,
            p.temperature_dissipation,
        )?;
        let d = advection.advect(backend, velocity, &self.density, p.density_dissipation)?;
        self.velocity.promote(v);
        self.temperature.promote(t);
        self.density.promote(d);

        let slot = BuoyancyStage.apply(
            backend,
            &self.velocity,
            self.temperature.read(),
            self.density.read(),
        )?;
        self.velocity.promote(slot);

        if p.vorticity_strength > 0.0 {
            let slot = VorticityStage.apply(backend, &self.velocity, &self.vorticity)?;
            self.velocity.promote(slot);
        }

        let point = p.impulse_point();
        let heat = ImpulseStage::new(point, p.impulse_temperature, p.impulse_radius);
        let slot = heat.apply(backend, &self.temperature)?;
        self.temperature.promote(slot);
        let smoke = ImpulseStage::new(point, p.impulse_density, p.impulse_radius);
        let slot = smoke.apply(backend, &self.density)?;
        self.density.promote(slot);

        let slot = ProjectionStage::new(p.jacobi_iterations).project(
            backend,
            &self.velocity,
            &mut self.pressure,
            &self.divergence,
        )?;
        self.velocity.promote(slot);

        self.step_count += 1;
        Ok(())
    }

    /// The buffer holding the current density, for a renderer to read between steps.
    pub fn density_handle(&self) -> BufferHandle {
        self.density.read()
    }

    /// Current parameters.
    pub fn parameters(&self) -> &SimulationParameters {
        &self.params
    }

    /// Replaces the parameters from the next step on.
    ///
    /// Grid dimensions cannot change.
    pub fn set_parameters(&mut self, params: SimulationParameters) -> SmokeResult<()> {
        params.validate()?;
        if params.dimensions != self.params.dimensions {
            return Err(SmokeError::DimensionsChanged {
                current: self.params.dimensions,
                requested: params.dimensions,
            });
        }
        if params != self.params {
            log::debug!("smoke parameters changed: {:?}", params);
            self.params = params;
            self.general_dirty = true;
        }
        Ok(())
    }

    /// Number of completed steps since construction or the last reset.
    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    /// The backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The backend, mutably (e.g. to read the density buffer).
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// The field of the given kind.
    pub fn field(&self, kind: FieldKind) -> &GridField {
        match kind {
            FieldKind::Velocity => &self.velocity,
            FieldKind::Density => &self.density,
            FieldKind::Temperature => &self.temperature,
            FieldKind::Pressure => &self.pressure,
            FieldKind::Divergence => &self.divergence,
            FieldKind::Vorticity => &self.vorticity,
        }
    }

    /// Copies the authoritative data of a field to the host.
    pub fn read_field(&mut self, kind: FieldKind) -> SmokeResult<Vec<f32>> {
        let handle = self.field(kind).read();
        self.backend
            .read_buffer(handle)
            .map_err(|source| SmokeError::Transfer {
                field: kind.name(),
                source,
            })
    }

    /// Overwrites the authoritative data of a field.
    pub fn write_field(&mut self, kind: FieldKind, data: &[f32]) -> SmokeResult<()> {
        let handle = self.field(kind).read();
        self.backend
            .write_buffer(handle, data)
            .map_err(|source| SmokeError::Transfer {
                field: kind.name(),
                source,
            })
    }

    /// Zeroes every field and the step counter. Parameters are kept.
    pub fn reset(&mut self) -> SmokeResult<()> {
        for field in [
            &self.velocity,
            &self.density,
            &self.temperature,
            &self.pressure,
            &self.divergence,
            &self.vorticity,
        ] {
            field.clear_all(&mut self.backend)?;
        }
        self.step_count = 0;
        log::debug!("smoke solver reset");
        Ok(())
    }

    /// Mean absolute divergence the last projection started from.
    ///
    /// `None` before the first step.
    pub fn last_divergence(&mut self) -> SmokeResult<Option<f32>> {
        if self.step_count == 0 {
            return Ok(None);
        }
        let data = self.read_field(FieldKind::Divergence)?;
        Ok(Some(mean_abs(&data)))
    }

    /// Mean absolute divergence of the current velocity.
    ///
    /// Computed in the pressure field's scratch slot, so
    /// [`last_divergence`](Self::last_divergence) is unaffected.
    pub fn measure_divergence(&mut self) -> SmokeResult<f32> {
        self.upload_general()?;
        let scratch = self.pressure.slot(Slot::Write);
        dispatch(
            &mut self.backend,
            Kernel::Divergence,
            &[self.velocity.read()],
            scratch,
        )?;
        let data = self
            .backend
            .read_buffer(scratch)
            .map_err(|source| SmokeError::Transfer {
                field: FieldKind::Pressure.name(),
                source,
            })?;
        Ok(mean_abs(&data))
    }

    /// Sum of density over every cell.
    pub fn total_density(&mut self) -> SmokeResult<f32> {
        Ok(self.read_field(FieldKind::Density)?.iter().sum())
    }

    fn upload_general(&mut self) -> SmokeResult<()> {
        if !self.general_dirty {
            return Ok(());
        }
        let block = self.params.general_params();
        upload(&mut self.backend, ParamBlock::General(block))?;
        log::debug!("uploaded general parameters: {:?}", block);
        self.general_dirty = false;
        Ok(())
    }
}

impl<B: ComputeBackend + std::fmt::Debug> std::fmt::Debug for FluidSolver<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FluidSolver")
            .field("backend", &self.backend)
            .field("params", &self.params)
            .field("step_count", &self.step_count)
            .finish()
    }
}

fn mean_abs(data: &[f32]) -> f32 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().map(|v| v.abs()).sum::<f32>() / data.len() as f32
}
