//! Backend calls with solver error context.

use crate::error::{SmokeError, SmokeResult};
use rhizome_plume_backend::{BufferHandle, ComputeBackend, Kernel, ParamBlock};

pub(crate) fn dispatch<B: ComputeBackend + ?Sized>(
    backend: &mut B,
    kernel: Kernel,
    inputs: &[BufferHandle],
    output: BufferHandle,
) -> SmokeResult<()> {
    backend
        .dispatch(kernel, inputs, &[output])
        .map_err(|source| SmokeError::Dispatch { kernel, source })
}

pub(crate) fn upload<B: ComputeBackend + ?Sized>(
    backend: &mut B,
    block: ParamBlock,
) -> SmokeResult<()> {
    backend
        .write_params(block)
        .map_err(|source| SmokeError::ParamUpload {
            block: block.kind(),
            source,
        })
}
