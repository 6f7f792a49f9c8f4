//! GPU compute backend for plume.
//!
//! Implements [`ComputeBackend`](rhizome_plume_backend::ComputeBackend) on
//! wgpu compute shaders, so the smoke solver can run every kernel on the
//! device and only read back the density field when a renderer asks.
//!
//! # Example
//!
//! ```ignore
//! use rhizome_plume_gpu::GpuBackend;
//! use rhizome_plume_smoke::{FluidSolver, SimulationParameters};
//!
//! let backend = GpuBackend::new()?;
//! let mut solver = FluidSolver::new(backend, SimulationParameters::default())?;
//! solver.step()?;
//! ```

mod backend;
mod context;
mod error;
mod shaders;

pub use backend::GpuBackend;
pub use context::GpuContext;
pub use error::{GpuError, GpuResult};
pub use shaders::WORKGROUP_SIZE;
