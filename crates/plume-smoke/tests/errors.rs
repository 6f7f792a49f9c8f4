//! Backend failures surface as solver errors with context.

use glam::UVec3;
use rhizome_plume_backend::{
    BackendCapabilities, BackendError, BufferHandle, ComputeBackend, CpuBackend, ElementFormat,
    Kernel, ParamBlock, ParamKind,
};
use rhizome_plume_smoke::{FluidSolver, SimulationParameters, SmokeError};

/// Which call should fail.
#[derive(Clone, Copy, Debug)]
enum Fault {
    None,
    /// Fail the allocation after this many succeed.
    Allocate(usize),
    Upload(ParamKind),
    Dispatch(Kernel),
}

struct Faulty {
    inner: CpuBackend,
    fault: Fault,
    allocations: usize,
}

impl Faulty {
    fn new(fault: Fault) -> Self {
        Self {
            inner: CpuBackend::new(),
            fault,
            allocations: 0,
        }
    }
}

impl ComputeBackend for Faulty {
    fn name(&self) -> &str {
        "faulty"
    }

    fn capabilities(&self) -> BackendCapabilities {
        self.inner.capabilities()
    }

    fn allocate(
        &mut self,
        dims: UVec3,
        format: ElementFormat,
    ) -> Result<BufferHandle, BackendError> {
        if let Fault::Allocate(n) = self.fault {
            if self.allocations == n {
                return Err(BackendError::AllocationFailed("out of memory".into()));
            }
        }
        self.allocations += 1;
        self.inner.allocate(dims, format)
    }

    fn clear(&mut self, buffer: BufferHandle) -> Result<(), BackendError> {
        self.inner.clear(buffer)
    }

    fn write_params(&mut self, block: ParamBlock) -> Result<(), BackendError> {
        if let Fault::Upload(kind) = self.fault {
            if block.kind() == kind {
                return Err(BackendError::ParamUploadFailed("device lost".into()));
            }
        }
        self.inner.write_params(block)
    }

    fn dispatch(
        &mut self,
        kernel: Kernel,
        inputs: &[BufferHandle],
        outputs: &[BufferHandle],
    ) -> Result<(), BackendError> {
        if let Fault::Dispatch(k) = self.fault {
            if k == kernel {
                return Err(BackendError::ExecutionFailed("device lost".into()));
            }
        }
        self.inner.dispatch(kernel, inputs, outputs)
    }

    fn read_buffer(&mut self, buffer: BufferHandle) -> Result<Vec<f32>, BackendError> {
        self.inner.read_buffer(buffer)
    }

    fn write_buffer(&mut self, buffer: BufferHandle, data: &[f32]) -> Result<(), BackendError> {
        self.inner.write_buffer(buffer, data)
    }
}

fn params() -> SimulationParameters {
    SimulationParameters::new(UVec3::splat(6))
}

#[test]
fn test_healthy_backend_steps() {
    let mut solver = FluidSolver::new(Faulty::new(Fault::None), params()).unwrap();
    solver.step().unwrap();
    assert_eq!(solver.step_count(), 1);
}

#[test]
fn test_allocation_failure_names_field() {
    // Velocity takes the first four buffers, density the next four.
    let result = FluidSolver::new(Faulty::new(Fault::Allocate(5)), params());
    assert!(matches!(
        result,
        Err(SmokeError::Allocation {
            field: "density",
            source: BackendError::AllocationFailed(_)
        })
    ));
}

#[test]
fn test_general_upload_failure() {
    let mut solver = FluidSolver::new(Faulty::new(Fault::Upload(ParamKind::General)), params())
        .unwrap();
    let result = solver.step();
    assert!(matches!(
        result,
        Err(SmokeError::ParamUpload {
            block: ParamKind::General,
            ..
        })
    ));
    assert_eq!(solver.step_count(), 0);
}

#[test]
fn test_impulse_upload_failure() {
    let mut solver = FluidSolver::new(Faulty::new(Fault::Upload(ParamKind::Impulse)), params())
        .unwrap();
    assert!(matches!(
        solver.step(),
        Err(SmokeError::ParamUpload {
            block: ParamKind::Impulse,
            ..
        })
    ));
}

#[test]
fn test_dispatch_failure_aborts_step() {
    for kernel in [Kernel::MacCormack, Kernel::Buoyancy, Kernel::Jacobi, Kernel::SubtractGradient] {
        let mut solver = FluidSolver::new(Faulty::new(Fault::Dispatch(kernel)), params()).unwrap();
        match solver.step() {
            Err(SmokeError::Dispatch { kernel: k, source }) => {
                assert_eq!(k, kernel);
                assert!(matches!(source, BackendError::ExecutionFailed(_)));
            }
            other => panic!("{kernel}: expected a dispatch error, got {other:?}"),
        }
        assert_eq!(solver.step_count(), 0);
    }
}

#[test]
fn test_error_messages() {
    let err = SmokeError::Dispatch {
        kernel: Kernel::Jacobi,
        source: BackendError::ExecutionFailed("device lost".into()),
    };
    assert_eq!(err.to_string(), "jacobi dispatch failed");
    assert!(std::error::Error::source(&err).is_some());
}
