//! Source injection.

use crate::error::SmokeResult;
use crate::field::{GridField, Slot};
use crate::pass::{dispatch, upload};
use glam::Vec3;
use rhizome_plume_backend::{ComputeBackend, ImpulseParams, Kernel, ParamBlock};

/// Blends a spherical region of a field towards a target value.
///
/// Cells closer than `radius` to `point` move towards `amount` by a factor
/// of `exp(-d²)`; everything else is copied unchanged.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImpulseStage {
    /// Centre in cell coordinates.
    pub point: Vec3,
    /// Target value (every component of a vector field).
    pub amount: f32,
    /// Cells at or beyond this distance are untouched.
    pub radius: f32,
}

impl ImpulseStage {
    /// Creates an impulse.
    pub fn new(point: Vec3, amount: f32, radius: f32) -> Self {
        Self {
            point,
            amount,
            radius,
        }
    }

    /// Applies the impulse to `field.Read` and returns the slot holding the result.
    ///
    /// A non-positive radius touches nothing and returns [`Slot::Read`].
    pub fn apply<B: ComputeBackend + ?Sized>(
        &self,
        backend: &mut B,
        field: &GridField,
    ) -> SmokeResult<Slot> {
        if self.radius <= 0.0 {
            return Ok(Slot::Read);
        }
        upload(
            backend,
            ParamBlock::Impulse(ImpulseParams::new(self.point, self.amount, self.radius)),
        )?;
        dispatch(backend, Kernel::Impulse, &[field.read()], field.write())?;
        Ok(Slot::Write)
    }
}
