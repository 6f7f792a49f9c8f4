//! CPU backend implementation.

use crate::backend::{
    cell_count, BackendCapabilities, BackendKind, BufferHandle, ComputeBackend, ElementFormat,
};
use crate::error::BackendError;
use crate::kernel::{Kernel, ParamKind};
use crate::kernels::{self, Grid};
use crate::params::{AdvectionParams, GeneralParams, ImpulseParams, ParamBlock};
use glam::{UVec3, Vec3};

/// Reference backend running every kernel on host memory.
///
/// Each dispatch is one rayon data-parallel pass over the output cells and
/// has completed when `dispatch` returns, so submission order is execution
/// order.
///
/// # Example
///
/// ```
/// use rhizome_plume_backend::{BackendKind, ComputeBackend, CpuBackend, ElementFormat};
/// use glam::UVec3;
///
/// let mut backend = CpuBackend::new();
/// assert_eq!(backend.name(), "cpu");
/// assert_eq!(backend.capabilities().kind, BackendKind::Cpu);
///
/// let buffer = backend.allocate(UVec3::splat(4), ElementFormat::Scalar).unwrap();
/// assert_eq!(backend.read_buffer(buffer).unwrap(), vec![0.0; 64]);
/// ```
#[derive(Debug, Default)]
pub struct CpuBackend {
    buffers: Vec<CpuBuffer>,
    general: Option<GeneralParams>,
    advection: Option<AdvectionParams>,
    impulse: Option<ImpulseParams>,
}

#[derive(Debug)]
struct CpuBuffer {
    dims: UVec3,
    format: ElementFormat,
    data: Vec<f32>,
}

/// Parameter values a dispatch runs with.
#[derive(Default)]
struct Bound {
    general: GeneralParams,
    advection: AdvectionParams,
    impulse: ImpulseParams,
}

impl CpuBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of buffers allocated so far.
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    fn buffer(&self, handle: BufferHandle) -> Result<&CpuBuffer, BackendError> {
        self.buffers
            .get(handle.index())
            .ok_or(BackendError::InvalidHandle(handle))
    }

    fn buffer_mut(&mut self, handle: BufferHandle) -> Result<&mut CpuBuffer, BackendError> {
        self.buffers
            .get_mut(handle.index())
            .ok_or(BackendError::InvalidHandle(handle))
    }

    fn describe(
        &self,
        handles: &[BufferHandle],
    ) -> Result<Vec<(BufferHandle, UVec3, ElementFormat)>, BackendError> {
        handles
            .iter()
            .map(|&h| self.buffer(h).map(|b| (h, b.dims, b.format)))
            .collect()
    }

    fn bind(&self, kernel: Kernel) -> Result<Bound, BackendError> {
        for &block in kernel.params() {
            let present = match block {
                ParamKind::General => self.general.is_some(),
                ParamKind::Advection => self.advection.is_some(),
                ParamKind::Impulse => self.impulse.is_some(),
            };
            if !present {
                return Err(BackendError::ParamsNotBound { kernel, block });
            }
        }
        Ok(Bound {
            general: self.general.unwrap_or_default(),
            advection: self.advection.unwrap_or_default(),
            impulse: self.impulse.unwrap_or_default(),
        })
    }

    fn run(
        &self,
        kernel: Kernel,
        grid: Grid,
        format: ElementFormat,
        params: &Bound,
        inputs: &[&[f32]],
        out: &mut [f32],
    ) {
        let dt = params.general.time_step;
        let dissipation = params.advection.dissipation;
        let g = &params.general;
        let vector = format == ElementFormat::Vector3;

        match kernel {
            Kernel::AdvectForward if vector => kernels::advect_forward(
                grid,
                dt,
                dissipation,
                vec3(inputs[0]),
                vec3(inputs[1]),
                vec3_mut(out),
            ),
            Kernel::AdvectForward => {
                kernels::advect_forward(grid, dt, dissipation, vec3(inputs[0]), inputs[1], out)
            }
            Kernel::AdvectBackward if vector => kernels::advect_backward(
                grid,
                dt,
                vec3(inputs[0]),
                vec3(inputs[1]),
                vec3_mut(out),
            ),
            Kernel::AdvectBackward => {
                kernels::advect_backward(grid, dt, vec3(inputs[0]), inputs[1], out)
            }
            Kernel::MacCormack if vector => kernels::maccormack(
                grid,
                dt,
                dissipation,
                vec3(inputs[0]),
                vec3(inputs[3]),
                vec3(inputs[1]),
                vec3(inputs[2]),
                vec3_mut(out),
            ),
            Kernel::MacCormack => kernels::maccormack(
                grid,
                dt,
                dissipation,
                vec3(inputs[0]),
                inputs[3],
                inputs[1],
                inputs[2],
                out,
            ),
            Kernel::Impulse => {
                let p = &params.impulse;
                if vector {
                    kernels::impulse(
                        grid,
                        p.point(),
                        p.amount(),
                        p.radius,
                        vec3(inputs[0]),
                        vec3_mut(out),
                    )
                } else {
                    kernels::impulse(grid, p.point(), p.amount(), p.radius, inputs[0], out)
                }
            }
            Kernel::Buoyancy => kernels::buoyancy(
                grid,
                dt,
                g.buoyancy,
                g.smoke_weight,
                g.ambient_temperature,
                vec3(inputs[0]),
                inputs[1],
                inputs[2],
                vec3_mut(out),
            ),
            Kernel::Vorticity => kernels::vorticity(grid, vec3(inputs[0]), vec3_mut(out)),
            Kernel::Confinement => kernels::confinement(
                grid,
                dt,
                g.vorticity_strength,
                vec3(inputs[0]),
                vec3(inputs[1]),
                vec3_mut(out),
            ),
            Kernel::Divergence => kernels::divergence(grid, vec3(inputs[0]), out),
            Kernel::Jacobi => kernels::jacobi(grid, inputs[0], inputs[1], out),
            Kernel::SubtractGradient => {
                kernels::subtract_gradient(grid, vec3(inputs[0]), inputs[1], vec3_mut(out))
            }
        }
    }
}

fn vec3(data: &[f32]) -> &[Vec3] {
    bytemuck::cast_slice(data)
}

fn vec3_mut(data: &mut [f32]) -> &mut [Vec3] {
    bytemuck::cast_slice_mut(data)
}

impl ComputeBackend for CpuBackend {
    fn name(&self) -> &str {
        "cpu"
    }

    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            kind: BackendKind::Cpu,
            max_dimension: i32::MAX as u32,
        }
    }

    fn allocate(
        &mut self,
        dims: UVec3,
        format: ElementFormat,
    ) -> Result<BufferHandle, BackendError> {
        if dims.cmpeq(UVec3::ZERO).any() {
            return Err(BackendError::AllocationFailed(format!(
                "grid extent {dims} has an empty axis"
            )));
        }
        let id = u32::try_from(self.buffers.len())
            .map_err(|_| BackendError::AllocationFailed("out of buffer handles".into()))?;
        let len = cell_count(dims) * format.components();
        self.buffers.push(CpuBuffer {
            dims,
            format,
            data: vec![0.0; len],
        });
        Ok(BufferHandle::new(id))
    }

    fn clear(&mut self, buffer: BufferHandle) -> Result<(), BackendError> {
        self.buffer_mut(buffer)?.data.fill(0.0);
        Ok(())
    }

    fn write_params(&mut self, block: ParamBlock) -> Result<(), BackendError> {
        match block {
            ParamBlock::General(p) => self.general = Some(p),
            ParamBlock::Advection(p) => self.advection = Some(p),
            ParamBlock::Impulse(p) => self.impulse = Some(p),
        }
        Ok(())
    }

    fn dispatch(
        &mut self,
        kernel: Kernel,
        inputs: &[BufferHandle],
        outputs: &[BufferHandle],
    ) -> Result<(), BackendError> {
        let (dims, format) = kernel.validate(&self.describe(inputs)?, &self.describe(outputs)?)?;
        let params = self.bind(kernel)?;
        // Kernels index with the uploaded dimensions.
        let [x, y, z, _] = params.general.dimensions;
        let uploaded = UVec3::new(x, y, z);
        if uploaded != dims {
            return Err(BackendError::DimensionMismatch {
                kernel,
                expected: dims,
                found: uploaded,
            });
        }

        let output = outputs[0];
        let mut out = std::mem::take(&mut self.buffer_mut(output)?.data);
        {
            let views: Vec<&[f32]> = inputs
                .iter()
                .map(|&h| self.buffers[h.index()].data.as_slice())
                .collect();
            self.run(kernel, Grid::new(dims), format, &params, &views, &mut out);
        }
        self.buffer_mut(output)?.data = out;
        Ok(())
    }

    fn read_buffer(&mut self, buffer: BufferHandle) -> Result<Vec<f32>, BackendError> {
        Ok(self.buffer(buffer)?.data.clone())
    }

    fn write_buffer(&mut self, buffer: BufferHandle, data: &[f32]) -> Result<(), BackendError> {
        let target = self.buffer_mut(buffer)?;
        if target.data.len() != data.len() {
            return Err(BackendError::DataLengthMismatch {
                buffer,
                expected: target.data.len(),
                found: data.len(),
            });
        }
        target.data.copy_from_slice(data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn general(dims: UVec3) -> ParamBlock {
        ParamBlock::General(GeneralParams::new(dims, 0.125, 1.0, 0.05, 0.0, 0.0))
    }

    #[test]
    fn test_cpu_backend_name() {
        assert_eq!(CpuBackend::new().name(), "cpu");
    }

    #[test]
    fn test_cpu_backend_capabilities() {
        let caps = CpuBackend::new().capabilities();
        assert_eq!(caps.kind, BackendKind::Cpu);
        assert!(caps.max_dimension >= 1024);
    }

    #[test]
    fn test_allocate_zeroed() {
        let mut backend = CpuBackend::new();
        let v = backend
            .allocate(UVec3::new(2, 3, 4), ElementFormat::Vector3)
            .unwrap();
        assert_eq!(backend.read_buffer(v).unwrap(), vec![0.0; 72]);
        assert_eq!(backend.buffer_count(), 1);
    }

    #[test]
    fn test_allocate_empty_axis() {
        let mut backend = CpuBackend::new();
        let result = backend.allocate(UVec3::new(4, 0, 4), ElementFormat::Scalar);
        assert!(matches!(result, Err(BackendError::AllocationFailed(_))));
    }

    #[test]
    fn test_write_read_clear() {
        let mut backend = CpuBackend::new();
        let b = backend.allocate(UVec3::splat(2), ElementFormat::Scalar).unwrap();
        let data: Vec<f32> = (0..8).map(|i| i as f32).collect();
        backend.write_buffer(b, &data).unwrap();
        assert_eq!(backend.read_buffer(b).unwrap(), data);
        backend.clear(b).unwrap();
        assert_eq!(backend.read_buffer(b).unwrap(), vec![0.0; 8]);
    }

    #[test]
    fn test_write_length_mismatch() {
        let mut backend = CpuBackend::new();
        let b = backend.allocate(UVec3::splat(2), ElementFormat::Vector3).unwrap();
        let result = backend.write_buffer(b, &[0.0; 8]);
        assert!(matches!(
            result,
            Err(BackendError::DataLengthMismatch {
                expected: 24,
                found: 8,
                ..
            })
        ));
    }

    #[test]
    fn test_invalid_handle() {
        let mut backend = CpuBackend::new();
        let result = backend.clear(BufferHandle::new(3));
        assert!(matches!(result, Err(BackendError::InvalidHandle(_))));
    }

    #[test]
    fn test_dispatch_requires_params() {
        let dims = UVec3::splat(4);
        let mut backend = CpuBackend::new();
        let v = backend.allocate(dims, ElementFormat::Vector3).unwrap();
        let q = backend.allocate(dims, ElementFormat::Scalar).unwrap();
        let out = backend.allocate(dims, ElementFormat::Scalar).unwrap();

        let result = backend.dispatch(Kernel::AdvectForward, &[v, q], &[out]);
        assert!(matches!(
            result,
            Err(BackendError::ParamsNotBound {
                block: ParamKind::General,
                ..
            })
        ));

        backend.write_params(general(dims)).unwrap();
        let result = backend.dispatch(Kernel::AdvectForward, &[v, q], &[out]);
        assert!(matches!(
            result,
            Err(BackendError::ParamsNotBound {
                block: ParamKind::Advection,
                ..
            })
        ));

        backend
            .write_params(ParamBlock::Advection(AdvectionParams::new(1.0)))
            .unwrap();
        backend
            .dispatch(Kernel::AdvectForward, &[v, q], &[out])
            .unwrap();
    }

    #[test]
    fn test_dispatch_rejects_alias() {
        let dims = UVec3::splat(2);
        let mut backend = CpuBackend::new();
        backend.write_params(general(dims)).unwrap();
        let p = backend.allocate(dims, ElementFormat::Scalar).unwrap();
        let d = backend.allocate(dims, ElementFormat::Scalar).unwrap();
        let result = backend.dispatch(Kernel::Jacobi, &[p, d], &[p]);
        assert!(matches!(result, Err(BackendError::AliasedOutput { .. })));
    }

    #[test]
    fn test_dispatch_rejects_stale_general_dims() {
        let dims = UVec3::splat(4);
        let mut backend = CpuBackend::new();
        backend.write_params(general(UVec3::splat(8))).unwrap();
        let p = backend.allocate(dims, ElementFormat::Scalar).unwrap();
        let d = backend.allocate(dims, ElementFormat::Scalar).unwrap();
        let out = backend.allocate(dims, ElementFormat::Scalar).unwrap();

        let result = backend.dispatch(Kernel::Jacobi, &[p, d], &[out]);
        assert!(matches!(
            result,
            Err(BackendError::DimensionMismatch {
                kernel: Kernel::Jacobi,
                expected,
                found,
            }) if expected == dims && found == UVec3::splat(8)
        ));

        backend.write_params(general(dims)).unwrap();
        backend.dispatch(Kernel::Jacobi, &[p, d], &[out]).unwrap();
    }

    #[test]
    fn test_dispatch_vector_advection() {
        let dims = UVec3::splat(4);
        let mut backend = CpuBackend::new();
        backend.write_params(general(dims)).unwrap();
        backend
            .write_params(ParamBlock::Advection(AdvectionParams::new(0.5)))
            .unwrap();
        let v = backend.allocate(dims, ElementFormat::Vector3).unwrap();
        let src = backend.allocate(dims, ElementFormat::Vector3).unwrap();
        let out = backend.allocate(dims, ElementFormat::Vector3).unwrap();
        backend.write_buffer(src, &vec![2.0; 192]).unwrap();

        backend
            .dispatch(Kernel::AdvectForward, &[v, src], &[out])
            .unwrap();
        assert_eq!(backend.read_buffer(out).unwrap(), vec![1.0; 192]);
        // Inputs are untouched.
        assert_eq!(backend.read_buffer(src).unwrap(), vec![2.0; 192]);
    }

    #[test]
    fn test_dispatch_buoyancy() {
        let dims = UVec3::splat(2);
        let mut backend = CpuBackend::new();
        backend.write_params(general(dims)).unwrap();
        let v = backend.allocate(dims, ElementFormat::Vector3).unwrap();
        let t = backend.allocate(dims, ElementFormat::Scalar).unwrap();
        let d = backend.allocate(dims, ElementFormat::Scalar).unwrap();
        let out = backend.allocate(dims, ElementFormat::Vector3).unwrap();
        backend.write_buffer(t, &[2.0; 8]).unwrap();

        backend
            .dispatch(Kernel::Buoyancy, &[v, t, d], &[out])
            .unwrap();
        let data = backend.read_buffer(out).unwrap();
        for cell in data.chunks(3) {
            assert_eq!(cell, &[0.0, 0.25, 0.0]);
        }
    }

    #[test]
    fn test_dispatch_impulse_vector() {
        let dims = UVec3::splat(4);
        let mut backend = CpuBackend::new();
        backend.write_params(general(dims)).unwrap();
        backend
            .write_params(ParamBlock::Impulse(ImpulseParams::new(Vec3::ZERO, 1.0, 1.0)))
            .unwrap();
        let src = backend.allocate(dims, ElementFormat::Vector3).unwrap();
        let out = backend.allocate(dims, ElementFormat::Vector3).unwrap();
        backend.dispatch(Kernel::Impulse, &[src], &[out]).unwrap();
        let data = backend.read_buffer(out).unwrap();
        assert_eq!(&data[0..3], &[1.0, 1.0, 1.0]);
        assert_eq!(&data[3..6], &[0.0, 0.0, 0.0]);
    }
}
