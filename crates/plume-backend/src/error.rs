//! Backend error types.

use crate::backend::BufferHandle;
use crate::kernel::{Kernel, ParamKind};
use glam::UVec3;
use thiserror::Error;

/// Errors that can occur while allocating, transferring or dispatching.
#[derive(Debug, Error)]
pub enum BackendError {
    /// A buffer could not be created.
    #[error("buffer allocation failed: {0}")]
    AllocationFailed(String),

    /// The handle was not issued by this backend.
    #[error("unknown buffer handle {0:?}")]
    InvalidHandle(BufferHandle),

    /// Wrong number of input or output buffers for a kernel.
    #[error("{kernel} takes {expected_inputs} inputs and 1 output, got {inputs} inputs and {outputs} outputs")]
    ArityMismatch {
        kernel: Kernel,
        expected_inputs: usize,
        inputs: usize,
        outputs: usize,
    },

    /// Buffers bound to one dispatch have different grid dimensions.
    #[error("{kernel}: buffer dimensions differ ({expected} vs {found})")]
    DimensionMismatch {
        kernel: Kernel,
        expected: UVec3,
        found: UVec3,
    },

    /// A buffer has the wrong element format for its operand.
    #[error("{kernel}: operand {operand} has the wrong element format")]
    FormatMismatch { kernel: Kernel, operand: usize },

    /// The output buffer is also bound as an input.
    #[error("{kernel}: output buffer {buffer:?} is also bound as an input")]
    AliasedOutput { kernel: Kernel, buffer: BufferHandle },

    /// A kernel needs a parameter block that was never uploaded.
    #[error("{kernel}: {block:?} parameter block was never uploaded")]
    ParamsNotBound { kernel: Kernel, block: ParamKind },

    /// A parameter block could not be mapped or written.
    #[error("parameter upload failed: {0}")]
    ParamUploadFailed(String),

    /// Host data does not match the buffer size.
    #[error("buffer {buffer:?} holds {expected} values, got {found}")]
    DataLengthMismatch {
        buffer: BufferHandle,
        expected: usize,
        found: usize,
    },

    /// Execution failed on the device.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// Data transfer failed.
    #[error("data transfer failed: {0}")]
    TransferFailed(String),
}
