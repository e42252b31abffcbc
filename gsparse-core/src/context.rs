use crate::error::{Result, SparseError};
use bytemuck::Pod;
use cfg_if::cfg_if;
use std::borrow::Cow;
use wgpu::{util::DeviceExt, PollType};

/// How a buffer is bound into a compute shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindKind {
    ReadOnly,
    ReadWrite,
}

/// A storage buffer bound at slot `1 + position` in the binding list.
#[derive(Debug, Clone, Copy)]
pub struct ShaderBinding<'a> {
    pub buffer: &'a wgpu::Buffer,
    pub kind: BindKind,
}

/// Everything needed to run one WGSL entry point over a 1-D grid.
///
/// `params` is uploaded into a fresh uniform buffer bound at slot 0.
#[derive(Debug)]
pub struct ShaderLaunch<'a> {
    pub label: &'a str,
    pub source: Cow<'a, str>,
    pub entry_point: &'a str,
    pub params: Vec<u8>,
    pub bindings: Vec<ShaderBinding<'a>>,
    pub workgroups: u32,
}

/// Wrapper for the WGPU device and queue backing a GPU `Device`.
#[derive(Debug)]
pub(crate) struct GpuContext {
    pub(crate) device: wgpu::Device,
    pub(crate) queue: wgpu::Queue,
}

impl GpuContext {
    /// Initializes the WGPU context asynchronously.
    pub(crate) async fn new() -> Result<Self> {
        cfg_if! {
            if #[cfg(target_arch = "wasm32")] {
                let backends = wgpu::Backends::BROWSER_WEBGPU;
            } else {
                let backends = wgpu::Backends::PRIMARY; // Vulkan, Metal, DX12
            }
        }
        log::info!("Initializing WGPU context on {:?}", backends);

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends,
            ..Default::default()
        });

        log::debug!("Requesting adapter");
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|_| SparseError::WgpuInit("No suitable adapter found".to_string()))?;

        log::info!("Selected adapter: {:?}", adapter.get_info());

        // Launch geometry uses blocks of up to 512 invocations, above the
        // WebGPU default of 256, so take whatever the adapter offers.
        let adapter_limits = adapter.limits();
        let mut limits = wgpu::Limits::default().using_resolution(adapter_limits.clone());
        limits.max_storage_buffers_per_shader_stage =
            limits.max_storage_buffers_per_shader_stage.max(6);
        limits.max_compute_invocations_per_workgroup =
            adapter_limits.max_compute_invocations_per_workgroup;
        limits.max_compute_workgroup_size_x = adapter_limits.max_compute_workgroup_size_x;
        log::debug!("Adjusted limits: {:?}", limits);

        let required_features = adapter.features() & wgpu::Features::SHADER_F64;
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("gsparse device"),
                trace: wgpu::Trace::Off,
                memory_hints: wgpu::MemoryHints::Performance,
                required_features,
                required_limits: limits,
            })
            .await
            .map_err(|e| SparseError::WgpuInit(format!("Failed to request device: {}", e)))?;

        if device.features().contains(wgpu::Features::SHADER_F64) {
            log::info!("SHADER_F64 feature enabled, double precision kernels available");
        } else {
            log::warn!("SHADER_F64 not granted, double precision kernels will be unavailable");
        }

        Ok(Self { device, queue })
    }

    pub(crate) fn supports_f64(&self) -> bool {
        self.device.features().contains(wgpu::Features::SHADER_F64)
    }

    pub(crate) fn max_workgroup_size(&self) -> u32 {
        let limits = self.device.limits();
        limits
            .max_compute_invocations_per_workgroup
            .min(limits.max_compute_workgroup_size_x)
    }

    pub(crate) fn max_workgroups(&self) -> u32 {
        self.device.limits().max_compute_workgroups_per_dimension
    }

    pub(crate) fn create_gpu_buffer_with_data(
        &self,
        label: &str,
        contents: &[u8],
        usage: wgpu::BufferUsages,
    ) -> wgpu::Buffer {
        log::debug!("Creating GPU buffer '{}' with {} bytes", label, contents.len());
        self.device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents,
                usage,
            })
    }

    pub(crate) fn create_empty_buffer(
        &self,
        label: &str,
        size: u64,
        usage: wgpu::BufferUsages,
    ) -> wgpu::Buffer {
        log::debug!("Creating empty GPU buffer '{}' of size {}", label, size);
        self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage,
            mapped_at_creation: false,
        })
    }

    /// Queues a write of `data` into `buffer`. Ordered before any later submission.
    pub(crate) fn write_buffer<T: Pod>(&self, buffer: &wgpu::Buffer, data: &[T]) -> Result<u64> {
        let byte_len = std::mem::size_of_val(data) as u64;
        if byte_len == 0 {
            return Ok(0);
        }
        if buffer.size() < byte_len {
            return Err(SparseError::InvalidSize(format!(
                "Target buffer size ({}) is smaller than data size ({})",
                buffer.size(),
                byte_len
            )));
        }
        if !buffer.usage().contains(wgpu::BufferUsages::COPY_DST) {
            return Err(SparseError::Internal(
                "Target buffer must have COPY_DST usage".to_string(),
            ));
        }
        self.queue.write_buffer(buffer, 0, bytemuck::cast_slice(data));
        Ok(byte_len)
    }

    /// Builds a pipeline for `launch` and submits it. Does not wait.
    pub(crate) fn submit_shader(&self, launch: ShaderLaunch<'_>) -> Result<()> {
        let device = &self.device;
        let shader_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(launch.label),
            source: wgpu::ShaderSource::Wgsl(launch.source),
        });

        let mut params = launch.params;
        params.resize(params.len().max(16).next_multiple_of(16), 0);
        let params_buffer = self.create_gpu_buffer_with_data(
            launch.label,
            &params,
            wgpu::BufferUsages::UNIFORM,
        );

        let layout_entry = |slot: u32, ty: wgpu::BufferBindingType| wgpu::BindGroupLayoutEntry {
            binding: slot,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };
        let mut layout_entries = vec![layout_entry(0, wgpu::BufferBindingType::Uniform)];
        layout_entries.extend(launch.bindings.iter().enumerate().map(|(i, binding)| {
            let read_only = binding.kind == BindKind::ReadOnly;
            layout_entry(
                i as u32 + 1,
                wgpu::BufferBindingType::Storage { read_only },
            )
        }));
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(launch.label),
            entries: &layout_entries,
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(launch.label),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(launch.label),
            layout: Some(&pipeline_layout),
            module: &shader_module,
            entry_point: Some(launch.entry_point),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            cache: None,
        });

        let mut group_entries = vec![wgpu::BindGroupEntry {
            binding: 0,
            resource: params_buffer.as_entire_binding(),
        }];
        group_entries.extend(launch.bindings.iter().enumerate().map(|(i, binding)| {
            wgpu::BindGroupEntry {
                binding: i as u32 + 1,
                resource: binding.buffer.as_entire_binding(),
            }
        }));
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(launch.label),
            layout: &bind_group_layout,
            entries: &group_entries,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some(launch.label),
        });
        {
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(launch.label),
                timestamp_writes: None,
            });
            compute_pass.set_pipeline(&pipeline);
            compute_pass.set_bind_group(0, &bind_group, &[]);
            compute_pass.dispatch_workgroups(launch.workgroups, 1, 1);
        }
        self.queue.submit(Some(encoder.finish()));
        Ok(())
    }

    /// Blocks until every submitted command has finished.
    pub(crate) fn wait_idle(&self) -> Result<()> {
        cfg_if! {
            if #[cfg(target_arch = "wasm32")] {
                // The browser drives the queue; awaiting a map is the only wait available.
                Ok(())
            } else {
                self.device
                    .poll(PollType::Wait)
                    .map(|_| ())
                    .map_err(|e| SparseError::Wgpu(format!("Device poll failed: {}", e)))
            }
        }
    }

    /// Reads `element_count` elements of `buffer` back to the CPU.
    pub(crate) async fn read_buffer_to_cpu<T: Pod>(
        &self,
        buffer: &wgpu::Buffer,
        element_count: usize,
    ) -> Result<Vec<T>> {
        let size_bytes = (element_count * std::mem::size_of::<T>()) as u64;
        if size_bytes == 0 {
            return Ok(Vec::new());
        }
        if buffer.size() < size_bytes {
            return Err(SparseError::Internal(format!(
                "GPU buffer size ({}) is smaller than expected size ({})",
                buffer.size(),
                size_bytes
            )));
        }

        let staging_buffer = self.create_empty_buffer(
            "staging_buffer_for_readback",
            size_bytes,
            wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        );
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("read_buffer_encoder"),
            });
        encoder.copy_buffer_to_buffer(buffer, 0, &staging_buffer, 0, size_bytes);
        self.queue.submit(std::iter::once(encoder.finish()));

        let buffer_slice = staging_buffer.slice(..);
        let (sender, receiver) = futures::channel::oneshot::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            if sender.send(result).is_err() {
                log::error!("Readback receiver dropped before buffer mapping completed");
            }
        });

        // The map callback only fires while the device is polled.
        self.wait_idle()?;

        match receiver.await {
            Ok(Ok(())) => {
                let result: Vec<T> = {
                    let data = buffer_slice.get_mapped_range();
                    bytemuck::cast_slice(&data[..]).to_vec()
                };
                staging_buffer.unmap();
                log::debug!("Buffer readback complete ({} bytes)", size_bytes);
                Ok(result)
            }
            Ok(Err(e)) => Err(SparseError::Wgpu(format!("Buffer mapping failed: {}", e))),
            Err(_) => Err(SparseError::Internal(
                "Channel receive error during buffer mapping".to_string(),
            )),
        }
    }
}
