use crate::buffer::DeviceBuffer;
use crate::context::GpuContext;
use crate::error::{Result, SparseError};
use crate::stream::{next_id, BackendKind, Stream};
use crate::traits::Element;
use std::mem;
use std::sync::{Arc, OnceLock};

#[derive(Debug)]
enum Backend {
    Emulated,
    Gpu(Arc<GpuContext>),
}

#[derive(Debug)]
struct DeviceInner {
    id: u64,
    backend: Backend,
    null_stream: Stream,
}

/// An accelerator: the owner of device memory and the factory for streams.
///
/// Cheap to clone; clones refer to the same device.
#[derive(Debug, Clone)]
pub struct Device {
    inner: Arc<DeviceInner>,
}

impl Device {
    /// Creates a host-emulated accelerator with its own null stream.
    pub fn emulated() -> Result<Self> {
        let id = next_id();
        let null_stream = Stream::emulated(id)?;
        log::debug!("Created emulated device {}", id);
        Ok(Self {
            inner: Arc::new(DeviceInner {
                id,
                backend: Backend::Emulated,
                null_stream,
            }),
        })
    }

    /// Creates a device on the first suitable GPU adapter.
    pub async fn gpu() -> Result<Self> {
        let context = Arc::new(GpuContext::new().await?);
        let id = next_id();
        let null_stream = Stream::gpu(id, Arc::clone(&context));
        log::info!("GPU device {} created successfully", id);
        Ok(Self {
            inner: Arc::new(DeviceInner {
                id,
                backend: Backend::Gpu(context),
                null_stream,
            }),
        })
    }

    /// The process-wide device new handles start on.
    ///
    /// Created on first use as an emulated device.
    pub fn default_device() -> Result<Self> {
        static DEFAULT: OnceLock<Device> = OnceLock::new();
        if let Some(device) = DEFAULT.get() {
            return Ok(device.clone());
        }
        let device = Device::emulated()?;
        Ok(DEFAULT.get_or_init(|| device).clone())
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn backend_kind(&self) -> BackendKind {
        match self.inner.backend {
            Backend::Emulated => BackendKind::Emulated,
            Backend::Gpu(_) => BackendKind::Gpu,
        }
    }

    /// The stream used when the caller does not pick one.
    pub fn null_stream(&self) -> Stream {
        self.inner.null_stream.clone()
    }

    /// Creates an additional stream on this device.
    ///
    /// GPU streams share the device queue, so they are also ordered with
    /// respect to each other.
    pub fn create_stream(&self) -> Result<Stream> {
        match &self.inner.backend {
            Backend::Emulated => Stream::emulated(self.inner.id),
            Backend::Gpu(context) => Ok(Stream::gpu(self.inner.id, Arc::clone(context))),
        }
    }

    /// Allocates a buffer initialized with `data`.
    pub fn create_buffer<T: Element>(&self, label: &str, data: &[T]) -> Result<DeviceBuffer<T>> {
        if data.is_empty() {
            return Err(SparseError::InvalidSize(format!(
                "Cannot create device buffer '{}' from empty slice",
                label
            )));
        }
        let buffer = match &self.inner.backend {
            Backend::Emulated => {
                DeviceBuffer::new_emulated(label.to_string(), self.inner.id, data.to_vec())
            }
            Backend::Gpu(context) => {
                let buffer = context.create_gpu_buffer_with_data(
                    label,
                    bytemuck::cast_slice(data),
                    Self::storage_usage(),
                );
                DeviceBuffer::new_gpu(
                    label.to_string(),
                    data.len(),
                    self.inner.id,
                    buffer,
                    Arc::clone(context),
                )
            }
        };
        self.inner.null_stream.record_to_device(buffer.size_bytes());
        Ok(buffer)
    }

    /// Allocates a zero-filled buffer of `len` elements.
    pub fn create_empty_buffer<T: Element>(
        &self,
        label: &str,
        len: usize,
    ) -> Result<DeviceBuffer<T>> {
        if len == 0 {
            return Err(SparseError::InvalidSize(format!(
                "Cannot create device buffer '{}' with size 0",
                label
            )));
        }
        match &self.inner.backend {
            Backend::Emulated => Ok(DeviceBuffer::new_emulated(
                label.to_string(),
                self.inner.id,
                vec![T::zeroed(); len],
            )),
            Backend::Gpu(context) => {
                // wgpu zero-initializes new buffers.
                let byte_size = (len * mem::size_of::<T>()) as u64;
                let buffer = context.create_empty_buffer(label, byte_size, Self::storage_usage());
                Ok(DeviceBuffer::new_gpu(
                    label.to_string(),
                    len,
                    self.inner.id,
                    buffer,
                    Arc::clone(context),
                ))
            }
        }
    }

    fn storage_usage() -> wgpu::BufferUsages {
        wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC | wgpu::BufferUsages::COPY_DST
    }
}
