//! GPU error types.

use rhizome_plume_backend::BackendError;
use thiserror::Error;

/// Errors that can occur during GPU operations.
#[derive(Error, Debug)]
pub enum GpuError {
    /// Failed to request GPU adapter.
    #[error("failed to request GPU adapter")]
    AdapterNotFound,

    /// Failed to request GPU device.
    #[error("failed to request GPU device: {0}")]
    DeviceRequestFailed(#[from] wgpu::RequestDeviceError),

    /// Shader compilation error.
    #[error("shader compilation error: {0}")]
    ShaderError(String),

    /// Buffer operation error.
    #[error("buffer operation failed: {0}")]
    BufferError(String),

    /// Buffer mapping for readback failed.
    #[error("buffer map failed: {0}")]
    MapFailed(#[from] wgpu::BufferAsyncError),

    /// Invalid dimensions.
    #[error("invalid dimensions: {0}")]
    InvalidDimensions(String),
}

/// Result type for GPU operations.
pub type GpuResult<T> = Result<T, GpuError>;

impl From<GpuError> for BackendError {
    fn from(err: GpuError) -> Self {
        match err {
            GpuError::InvalidDimensions(_) | GpuError::BufferError(_) => {
                BackendError::AllocationFailed(err.to_string())
            }
            GpuError::MapFailed(_) => BackendError::TransferFailed(err.to_string()),
            _ => BackendError::ExecutionFailed(err.to_string()),
        }
    }
}
