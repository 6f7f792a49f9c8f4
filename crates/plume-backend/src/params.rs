//! Uniform parameter blocks shared by every kernel.
//!
//! The layouts are `#[repr(C)]` and padded to 16-byte multiples so the
//! same bytes can be written straight into a GPU uniform buffer.

use crate::kernel::ParamKind;
use bytemuck::{Pod, Zeroable};
use glam::{UVec3, Vec3};

/// Grid dimensions and global simulation constants.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct GeneralParams {
    /// Grid extent, `w` unused.
    pub dimensions: [u32; 4],
    /// Time step length.
    pub time_step: f32,
    /// Buoyancy coefficient.
    pub buoyancy: f32,
    /// Downward force per unit density.
    pub smoke_weight: f32,
    /// Temperature that produces no buoyancy.
    pub ambient_temperature: f32,
    /// Vorticity confinement strength.
    pub vorticity_strength: f32,
    _padding: [f32; 3],
}

impl GeneralParams {
    /// Creates a general block.
    pub fn new(
        dimensions: UVec3,
        time_step: f32,
        buoyancy: f32,
        smoke_weight: f32,
        ambient_temperature: f32,
        vorticity_strength: f32,
    ) -> Self {
        Self {
            dimensions: [dimensions.x, dimensions.y, dimensions.z, 0],
            time_step,
            buoyancy,
            smoke_weight,
            ambient_temperature,
            vorticity_strength,
            _padding: [0.0; 3],
        }
    }
}

/// Per-field advection constants.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct AdvectionParams {
    /// Multiplier applied to every advected value.
    pub dissipation: f32,
    _padding: [f32; 3],
}

impl AdvectionParams {
    /// Creates an advection block.
    pub fn new(dissipation: f32) -> Self {
        Self {
            dissipation,
            _padding: [0.0; 3],
        }
    }
}

/// Injection point, target amount and radius.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ImpulseParams {
    /// Centre of the impulse in cell coordinates, `w` unused.
    pub point: [f32; 4],
    /// Target value per component, `w` unused.
    pub amount: [f32; 4],
    /// Cells at or beyond this distance are untouched.
    pub radius: f32,
    _padding: [f32; 3],
}

impl ImpulseParams {
    /// Creates an impulse block that blends every component towards `amount`.
    pub fn new(point: Vec3, amount: f32, radius: f32) -> Self {
        Self {
            point: [point.x, point.y, point.z, 0.0],
            amount: [amount, amount, amount, 0.0],
            radius,
            _padding: [0.0; 3],
        }
    }

    /// Returns the impulse centre.
    pub fn point(&self) -> Vec3 {
        Vec3::new(self.point[0], self.point[1], self.point[2])
    }

    /// Returns the per-component target.
    pub fn amount(&self) -> Vec3 {
        Vec3::new(self.amount[0], self.amount[1], self.amount[2])
    }
}

/// One uploadable parameter block.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ParamBlock {
    /// See [`GeneralParams`].
    General(GeneralParams),
    /// See [`AdvectionParams`].
    Advection(AdvectionParams),
    /// See [`ImpulseParams`].
    Impulse(ImpulseParams),
}

impl ParamBlock {
    /// Which slot this block occupies.
    pub fn kind(&self) -> ParamKind {
        match self {
            ParamBlock::General(_) => ParamKind::General,
            ParamBlock::Advection(_) => ParamKind::Advection,
            ParamBlock::Impulse(_) => ParamKind::Impulse,
        }
    }

    /// Raw bytes as laid out in a uniform buffer.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            ParamBlock::General(p) => bytemuck::bytes_of(p),
            ParamBlock::Advection(p) => bytemuck::bytes_of(p),
            ParamBlock::Impulse(p) => bytemuck::bytes_of(p),
        }
    }
}
