//! GPU-style 3D smoke simulation for plume.
//!
//! Implements an Eulerian smoke solver on a regular grid, driven through a
//! [`ComputeBackend`](rhizome_plume_backend::ComputeBackend) so the same
//! pipeline runs on the host or on a GPU:
//! - `FluidSolver` - Owns the fields and runs the per-step pipeline
//! - `GridField` - A quantity stored in 1 to 4 swappable buffers
//! - `AdvectionStage` - Semi-Lagrangian transport with optional MacCormack correction
//! - `ImpulseStage` - Gaussian source injection
//! - `BuoyancyStage` - Thermal lift and smoke weight
//! - `VorticityStage` - Optional vorticity confinement
//! - `ProjectionStage` - Jacobi pressure projection
//!
//! # Example
//!
//! ```
//! use glam::UVec3;
//! use rhizome_plume_backend::CpuBackend;
//! use rhizome_plume_smoke::{FieldKind, FluidSolver, SimulationParameters};
//!
//! let params = SimulationParameters::new(UVec3::splat(16)).with_jacobi_iterations(20);
//! let mut solver = FluidSolver::new(CpuBackend::new(), params).unwrap();
//! for _ in 0..10 {
//!     solver.step().unwrap();
//! }
//! let density = solver.read_field(FieldKind::Density).unwrap();
//! assert_eq!(density.len(), 16 * 16 * 16);
//! ```

mod advection;
mod buoyancy;
mod error;
mod field;
mod impulse;
mod params;
mod pass;
mod projection;
mod solver;
mod vorticity;

pub use advection::AdvectionStage;
pub use buoyancy::BuoyancyStage;
pub use error::{SmokeError, SmokeResult};
pub use field::{GridField, Slot};
pub use impulse::ImpulseStage;
pub use params::SimulationParameters;
pub use projection::ProjectionStage;
pub use solver::{FieldKind, FluidSolver};
pub use vorticity::VorticityStage;
