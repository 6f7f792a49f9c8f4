//! GPU compute backend implementation.

use crate::error::{GpuError, GpuResult};
use crate::shaders::{INPUT_BINDINGS, KERNELS, WORKGROUP_SIZE};
use crate::GpuContext;
use glam::UVec3;
use rhizome_plume_backend::{
    cell_count, BackendCapabilities, BackendError, BackendKind, BufferHandle, ComputeBackend,
    ElementFormat, Kernel, ParamBlock, ParamKind,
};
use std::collections::HashMap;

/// Bytes per cell on the device; every cell is a `vec4<f32>`.
const CELL_BYTES: u64 = 16;

const OUTPUT_BINDING: u32 = 3 + INPUT_BINDINGS;

/// GPU compute backend using wgpu.
///
/// Every [`Kernel`] is a WGSL compute entry point sharing one bind group
/// layout. Each dispatch is encoded as its own compute pass and submitted
/// to the context's queue, so dispatches execute in submission order.
///
/// ```ignore
/// use rhizome_plume_gpu::GpuBackend;
///
/// let backend = GpuBackend::new()?;
/// let solver = FluidSolver::new(backend, SimulationParameters::default())?;
/// ```
pub struct GpuBackend {
    ctx: GpuContext,
    layout: wgpu::BindGroupLayout,
    pipelines: HashMap<Kernel, wgpu::ComputePipeline>,
    uniforms: [wgpu::Buffer; 3],
    uploaded: [bool; 3],
    general_dims: Option<UVec3>,
    /// Bound to input slots a kernel does not use.
    placeholder: wgpu::Buffer,
    buffers: Vec<GpuBuffer>,
}

struct GpuBuffer {
    dims: UVec3,
    format: ElementFormat,
    buffer: wgpu::Buffer,
}

fn param_slot(kind: ParamKind) -> usize {
    match kind {
        ParamKind::General => 0,
        ParamKind::Advection => 1,
        ParamKind::Impulse => 2,
    }
}

impl GpuBackend {
    /// Creates a new GPU backend with the default adapter.
    pub fn new() -> GpuResult<Self> {
        Self::with_context(GpuContext::new()?)
    }

    /// Creates a GPU backend with an existing context, compiling every kernel.
    pub fn with_context(ctx: GpuContext) -> GpuResult<Self> {
        let device = &ctx.device;
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("plume_kernels"),
            source: wgpu::ShaderSource::Wgsl(KERNELS.into()),
        });

        let mut entries: Vec<wgpu::BindGroupLayoutEntry> = (0..3)
            .map(|binding| wgpu::BindGroupLayoutEntry {
                binding,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            })
            .collect();
        for binding in 3..=OUTPUT_BINDING {
            entries.push(wgpu::BindGroupLayoutEntry {
                binding,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage {
                        read_only: binding != OUTPUT_BINDING,
                    },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            });
        }

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("plume_bind_group_layout"),
            entries: &entries,
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("plume_pipeline_layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let pipelines = Kernel::ALL
            .iter()
            .map(|&kernel| {
                let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                    label: Some(kernel.name()),
                    layout: Some(&pipeline_layout),
                    module: &shader,
                    entry_point: Some(kernel.name()),
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    cache: None,
                });
                (kernel, pipeline)
            })
            .collect();

        let uniform = |label: &str, size: usize| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size: size as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        };
        let uniforms = [
            uniform(
                "general_params",
                std::mem::size_of::<rhizome_plume_backend::GeneralParams>(),
            ),
            uniform(
                "advection_params",
                std::mem::size_of::<rhizome_plume_backend::AdvectionParams>(),
            ),
            uniform(
                "impulse_params",
                std::mem::size_of::<rhizome_plume_backend::ImpulseParams>(),
            ),
        ];

        let placeholder = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("placeholder_input"),
            size: CELL_BYTES,
            usage: wgpu::BufferUsages::STORAGE,
            mapped_at_creation: false,
        });

        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(GpuError::ShaderError(err.to_string()));
        }

        Ok(Self {
            ctx,
            layout,
            pipelines,
            uniforms,
            uploaded: [false; 3],
            general_dims: None,
            placeholder,
            buffers: Vec::new(),
        })
    }

    /// Returns a reference to the GPU context.
    pub fn context(&self) -> &GpuContext {
        &self.ctx
    }

    fn buffer(&self, handle: BufferHandle) -> Result<&GpuBuffer, BackendError> {
        self.buffers
            .get(handle.id() as usize)
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

    fn submit(&self, encoder: wgpu::CommandEncoder) {
        self.ctx.queue.submit(Some(encoder.finish()));
    }

    fn encoder(&self, label: &str) -> wgpu::CommandEncoder {
        self.ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) })
    }

    fn read_back(&self, buffer: &GpuBuffer) -> GpuResult<Vec<[f32; 4]>> {
        let size = cell_count(buffer.dims) as u64 * CELL_BYTES;
        let staging = self.ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("readback_staging"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = self.encoder("readback_encoder");
        encoder.copy_buffer_to_buffer(&buffer.buffer, 0, &staging, 0, size);
        self.submit(encoder);

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.ctx.device.poll(wgpu::Maintain::Wait);

        match rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                log::error!("GPU readback failed: {}", e);
                return Err(GpuError::MapFailed(e));
            }
            Err(e) => {
                log::error!("GPU readback failed: {}", e);
                return Err(GpuError::BufferError(e.to_string()));
            }
        }

        let cells = {
            let data = slice.get_mapped_range();
            bytemuck::cast_slice::<u8, [f32; 4]>(&data).to_vec()
        };
        staging.unmap();
        Ok(cells)
    }
}

impl std::fmt::Debug for GpuBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuBackend")
            .field("buffers", &self.buffers.len())
            .field("uploaded", &self.uploaded)
            .finish()
    }
}

impl ComputeBackend for GpuBackend {
    fn name(&self) -> &str {
        "gpu"
    }

    fn capabilities(&self) -> BackendCapabilities {
        let limits = self.ctx.limits();
        let by_size = (limits.max_storage_buffer_binding_size as f64 / CELL_BYTES as f64)
            .cbrt()
            .floor() as u32;
        let by_dispatch = limits
            .max_compute_workgroups_per_dimension
            .saturating_mul(WORKGROUP_SIZE);
        BackendCapabilities {
            kind: BackendKind::Gpu,
            max_dimension: by_size.min(by_dispatch),
        }
    }

    fn allocate(
        &mut self,
        dims: UVec3,
        format: ElementFormat,
    ) -> Result<BufferHandle, BackendError> {
        let size = cell_count(dims) as u64 * CELL_BYTES;
        let limit = self.ctx.limits().max_storage_buffer_binding_size as u64;
        if size == 0 || size > limit {
            return Err(GpuError::InvalidDimensions(format!(
                "grid {dims} needs {size} bytes, binding limit is {limit}"
            ))
            .into());
        }
        let id = u32::try_from(self.buffers.len())
            .map_err(|_| BackendError::AllocationFailed("out of buffer handles".into()))?;

        let buffer = self.ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("grid_buffer"),
            size,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_SRC
                | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        self.buffers.push(GpuBuffer {
            dims,
            format,
            buffer,
        });
        Ok(BufferHandle::new(id))
    }

    fn clear(&mut self, buffer: BufferHandle) -> Result<(), BackendError> {
        let target = &self.buffer(buffer)?.buffer;
        let mut encoder = self.encoder("clear_encoder");
        encoder.clear_buffer(target, 0, None);
        self.submit(encoder);
        Ok(())
    }

    fn write_params(&mut self, block: ParamBlock) -> Result<(), BackendError> {
        let slot = param_slot(block.kind());
        if let ParamBlock::General(general) = &block {
            let [x, y, z, _] = general.dimensions;
            self.general_dims = Some(UVec3::new(x, y, z));
        }
        self.ctx
            .queue
            .write_buffer(&self.uniforms[slot], 0, block.as_bytes());
        self.uploaded[slot] = true;
        Ok(())
    }

    fn dispatch(
        &mut self,
        kernel: Kernel,
        inputs: &[BufferHandle],
        outputs: &[BufferHandle],
    ) -> Result<(), BackendError> {
        let (dims, _) = kernel.validate(&self.describe(inputs)?, &self.describe(outputs)?)?;
        for &block in kernel.params() {
            if !self.uploaded[param_slot(block)] {
                return Err(BackendError::ParamsNotBound { kernel, block });
            }
        }
        // The shaders index with the uploaded dimensions.
        if let Some(general) = self.general_dims.filter(|&g| g != dims) {
            return Err(BackendError::DimensionMismatch {
                kernel,
                expected: dims,
                found: general,
            });
        }
        let pipeline = self
            .pipelines
            .get(&kernel)
            .ok_or_else(|| BackendError::ExecutionFailed(format!("no pipeline for {kernel}")))?;

        let mut storage = Vec::with_capacity(INPUT_BINDINGS as usize + 1);
        for slot in 0..INPUT_BINDINGS as usize {
            storage.push(match inputs.get(slot) {
                Some(&h) => &self.buffer(h)?.buffer,
                None => &self.placeholder,
            });
        }
        storage.push(&self.buffer(outputs[0])?.buffer);

        let entries: Vec<wgpu::BindGroupEntry> = self
            .uniforms
            .iter()
            .chain(storage)
            .enumerate()
            .map(|(binding, buffer)| wgpu::BindGroupEntry {
                binding: binding as u32,
                resource: buffer.as_entire_binding(),
            })
            .collect();
        let bind_group = self
            .ctx
            .device
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(kernel.name()),
                layout: &self.layout,
                entries: &entries,
            });

        let mut encoder = self.encoder(kernel.name());
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(kernel.name()),
                timestamp_writes: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(
                dims.x.div_ceil(WORKGROUP_SIZE),
                dims.y.div_ceil(WORKGROUP_SIZE),
                dims.z.div_ceil(WORKGROUP_SIZE),
            );
        }
        self.submit(encoder);
        Ok(())
    }

    fn read_buffer(&mut self, buffer: BufferHandle) -> Result<Vec<f32>, BackendError> {
        let source = self.buffer(buffer)?;
        let components = source.format.components();
        let cells = self.read_back(source)?;
        Ok(cells
            .iter()
            .flat_map(|cell| cell[..components].iter().copied())
            .collect())
    }

    fn write_buffer(&mut self, buffer: BufferHandle, data: &[f32]) -> Result<(), BackendError> {
        let target = self.buffer(buffer)?;
        let components = target.format.components();
        let expected = cell_count(target.dims) * components;
        if data.len() != expected {
            return Err(BackendError::DataLengthMismatch {
                buffer,
                expected,
                found: data.len(),
            });
        }
        let cells: Vec<[f32; 4]> = data
            .chunks_exact(components)
            .map(|c| {
                let mut cell = [0.0; 4];
                cell[..components].copy_from_slice(c);
                cell
            })
            .collect();
        self.ctx
            .queue
            .write_buffer(&target.buffer, 0, bytemuck::cast_slice(&cells));
        Ok(())
    }
}
