//! Compute backend contract for plume.
//!
//! The smoke solver never touches device memory directly. It allocates grid
//! buffers, uploads parameter blocks and dispatches named kernels through
//! [`ComputeBackend`], so the same pipeline runs on the host or on a GPU.
//!
//! # Core Types
//!
//! - [`ComputeBackend`] - Trait for compute devices
//! - [`Kernel`] - The grid computations a backend must provide
//! - [`ParamBlock`] - Uniform parameter blocks read by kernels
//! - [`CpuBackend`] - Data-parallel host implementation (always available)
//!
//! # Example
//!
//! ```
//! use rhizome_plume_backend::*;
//! use glam::UVec3;
//!
//! let dims = UVec3::splat(8);
//! let mut backend = CpuBackend::new();
//! backend
//!     .write_params(ParamBlock::General(GeneralParams::new(dims, 0.125, 1.0, 0.05, 0.0, 0.0)))
//!     .unwrap();
//!
//! let pressure = backend.allocate(dims, ElementFormat::Scalar).unwrap();
//! let divergence = backend.allocate(dims, ElementFormat::Scalar).unwrap();
//! let next = backend.allocate(dims, ElementFormat::Scalar).unwrap();
//! backend
//!     .dispatch(Kernel::Jacobi, &[pressure, divergence], &[next])
//!     .unwrap();
//! ```

mod backend;
mod cpu;
mod error;
mod kernel;
pub mod kernels;
mod params;

pub use backend::{
    cell_count, BackendCapabilities, BackendKind, BufferHandle, ComputeBackend, ElementFormat,
};
pub use cpu::CpuBackend;
pub use error::BackendError;
pub use kernel::{Kernel, Operand, ParamKind};
pub use params::{AdvectionParams, GeneralParams, ImpulseParams, ParamBlock};
