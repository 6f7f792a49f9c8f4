//! Core backend trait and types.

use crate::error::BackendError;
use crate::kernel::Kernel;
use crate::params::ParamBlock;
use glam::UVec3;

/// Opaque reference to a grid buffer owned by a backend.
///
/// Handles are cheap to copy and only meaningful to the backend that
/// issued them. Swapping two handles is how fields change slot roles;
/// no data moves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferHandle(u32);

impl BufferHandle {
    /// Wraps a raw backend-specific id.
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw id.
    pub fn id(self) -> u32 {
        self.0
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Per-cell element layout of a grid buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementFormat {
    /// One `f32` per cell (density, temperature, pressure, divergence).
    Scalar,
    /// Three `f32`s per cell (velocity, vorticity).
    Vector3,
}

impl ElementFormat {
    /// Number of `f32` components per cell in host-side data.
    pub fn components(self) -> usize {
        match self {
            ElementFormat::Scalar => 1,
            ElementFormat::Vector3 => 3,
        }
    }
}

/// Number of cells in a grid of the given dimensions.
pub fn cell_count(dims: UVec3) -> usize {
    dims.x as usize * dims.y as usize * dims.z as usize
}

/// A compute device the solver can drive.
///
/// The solver needs exactly four capabilities from its device: allocate
/// grid buffers, clear them, upload small parameter blocks and dispatch
/// named kernels. Reading and writing whole buffers is used for seeding
/// and for handing results to a renderer between steps.
///
/// Dispatches execute in submission order. A dispatch that reads a buffer
/// written by an earlier dispatch observes the completed write.
///
/// # Implementing a Backend
///
/// ```ignore
/// use rhizome_plume_backend::*;
///
/// struct MyBackend;
///
/// impl ComputeBackend for MyBackend {
///     fn name(&self) -> &str { "mine" }
///
///     fn capabilities(&self) -> BackendCapabilities {
///         BackendCapabilities { kind: BackendKind::Custom("mine".into()), max_dimension: 256 }
///     }
///
///     // allocate, clear, write_params, dispatch, read_buffer, write_buffer ...
/// }
/// ```
pub trait ComputeBackend {
    /// Returns the unique name of this backend.
    ///
    /// Used for logging and debugging.
    fn name(&self) -> &str;

    /// Returns the capabilities of this backend.
    fn capabilities(&self) -> BackendCapabilities;

    /// Allocates a zero-initialised grid buffer.
    fn allocate(&mut self, dims: UVec3, format: ElementFormat)
    -> Result<BufferHandle, BackendError>;

    /// Sets every value of a buffer to zero.
    fn clear(&mut self, buffer: BufferHandle) -> Result<(), BackendError>;

    /// Uploads a parameter block, replacing the previous block of its kind.
    ///
    /// Subsequent dispatches observe the new values.
    fn write_params(&mut self, block: ParamBlock) -> Result<(), BackendError>;

    /// Runs one full pass of `kernel`, reading `inputs` and writing `outputs`.
    fn dispatch(
        &mut self,
        kernel: Kernel,
        inputs: &[BufferHandle],
        outputs: &[BufferHandle],
    ) -> Result<(), BackendError>;

    /// Copies a buffer back to the host as packed components.
    fn read_buffer(&mut self, buffer: BufferHandle) -> Result<Vec<f32>, BackendError>;

    /// Replaces a buffer's contents with packed host components.
    fn write_buffer(&mut self, buffer: BufferHandle, data: &[f32]) -> Result<(), BackendError>;
}

/// Capabilities of a compute backend.
#[derive(Clone, Debug)]
pub struct BackendCapabilities {
    /// Broad category of the backend.
    pub kind: BackendKind,
    /// Largest supported grid extent along any axis.
    pub max_dimension: u32,
}

/// Broad category of a backend.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Host execution.
    Cpu,
    /// GPU compute (wgpu).
    Gpu,
    /// Custom backend type.
    Custom(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_components() {
        assert_eq!(ElementFormat::Scalar.components(), 1);
        assert_eq!(ElementFormat::Vector3.components(), 3);
    }

    #[test]
    fn test_cell_count() {
        assert_eq!(cell_count(UVec3::new(4, 5, 6)), 120);
        assert_eq!(cell_count(UVec3::new(4, 0, 6)), 0);
    }

    #[test]
    fn test_handle_roundtrip() {
        let handle = BufferHandle::new(7);
        assert_eq!(handle.id(), 7);
        assert_ne!(handle, BufferHandle::new(8));
    }

    #[test]
    fn test_backend_kind_equality() {
        assert_eq!(BackendKind::Cpu, BackendKind::Cpu);
        assert_ne!(BackendKind::Cpu, BackendKind::Gpu);
        assert_eq!(
            BackendKind::Custom("foo".into()),
            BackendKind::Custom("foo".into())
        );
    }
}
