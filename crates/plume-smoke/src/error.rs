//! Solver error types.

use glam::UVec3;
use rhizome_plume_backend::{BackendError, Kernel, ParamKind};
use thiserror::Error;

/// Errors that can occur while building or stepping a solver.
#[derive(Debug, Error)]
pub enum SmokeError {
    /// A parameter is out of range or not finite.
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// Grid dimensions are fixed once the solver exists.
    #[error("grid dimensions cannot change from {current} to {requested}")]
    DimensionsChanged { current: UVec3, requested: UVec3 },

    /// The backend cannot hold a grid this large.
    #[error("grid {dims} exceeds the backend limit of {max} cells per axis")]
    UnsupportedDimensions { dims: UVec3, max: u32 },

    /// A field buffer could not be allocated.
    #[error("failed to allocate {field} field")]
    Allocation {
        field: &'static str,
        source: BackendError,
    },

    /// A parameter block could not be uploaded.
    #[error("failed to upload {block:?} parameters")]
    ParamUpload {
        block: ParamKind,
        source: BackendError,
    },

    /// A kernel dispatch failed.
    #[error("{kernel} dispatch failed")]
    Dispatch {
        kernel: Kernel,
        source: BackendError,
    },

    /// A field buffer could not be cleared.
    #[error("failed to clear {field} field")]
    Clear {
        field: &'static str,
        source: BackendError,
    },

    /// Reading or writing field data failed.
    #[error("failed to transfer {field} field")]
    Transfer {
        field: &'static str,
        source: BackendError,
    },
}

/// Result type for solver operations.
pub type SmokeResult<T> = Result<T, SmokeError>;
