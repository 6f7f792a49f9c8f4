//! Semi-Lagrangian and MacCormack advection.

use crate::error::SmokeResult;
use crate::field::{GridField, Slot};
use crate::pass::{dispatch, upload};
use rhizome_plume_backend::{AdvectionParams, BufferHandle, ComputeBackend, Kernel, ParamBlock};

/// Moves a quantity along the velocity field.
///
/// With MacCormack enabled the quantity needs `Write`, `Write2` and
/// `Write3` slots; otherwise `Write2` is enough.
#[derive(Clone, Copy, Debug)]
pub struct AdvectionStage {
    /// Apply the MacCormack error correction after the forward pass.
    pub maccormack: bool,
}

impl AdvectionStage {
    /// Creates an advection stage.
    pub fn new(maccormack: bool) -> Self {
        Self { maccormack }
    }

    /// Advects `quantity.Read` by `velocity` and returns the slot holding the result.
    ///
    /// `velocity` may be the quantity's own `Read` buffer. The caller
    /// promotes the returned slot once every field of the step is advected.
    pub fn advect<B: ComputeBackend + ?Sized>(
        &self,
        backend: &mut B,
        velocity: BufferHandle,
        quantity: &GridField,
        dissipation: f32,
    ) -> SmokeResult<Slot> {
        upload(
            backend,
            ParamBlock::Advection(AdvectionParams::new(dissipation)),
        )?;

        let original = quantity.read();
        let forward = quantity.slot(Slot::Write2);
        dispatch(backend, Kernel::AdvectForward, &[velocity, original], forward)?;
        if !self.maccormack {
            return Ok(Slot::Write2);
        }

        let backward = quantity.slot(Slot::Write3);
        dispatch(backend, Kernel::AdvectBackward, &[velocity, forward], backward)?;
        dispatch(
            backend,
            Kernel::MacCormack,
            &[velocity, forward, backward, original],
            quantity.write(),
        )?;
        Ok(Slot::Write)
    }
}
