use crate::context::{BindKind, GpuContext, ShaderBinding};
use crate::error::{Result, SparseError};
use crate::stream::Stream;
use crate::traits::Element;
use futures::channel::oneshot;
use parking_lot::Mutex;
use std::fmt;
use std::mem;
use std::sync::Arc;

/// Storage of an emulated device allocation.
pub type DeviceMemory<T> = Arc<Mutex<Vec<T>>>;

enum Storage<T: Element> {
    Emulated(DeviceMemory<T>),
    Gpu {
        buffer: wgpu::Buffer,
        context: Arc<GpuContext>,
    },
}

/// A typed allocation in device memory.
///
/// Host code never touches the contents directly; reads and writes are
/// enqueued on a stream so they order with kernels on that stream.
pub struct DeviceBuffer<T: Element> {
    label: String,
    len: usize,
    device_id: u64,
    storage: Storage<T>,
}

impl<T: Element> fmt::Debug for DeviceBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceBuffer")
            .field("label", &self.label)
            .field("len", &self.len)
            .field("device_id", &self.device_id)
            .finish()
    }
}

impl<T: Element> fmt::Pointer for DeviceBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.storage {
            Storage::Emulated(memory) => fmt::Pointer::fmt(&Arc::as_ptr(memory), f),
            Storage::Gpu { buffer, .. } => fmt::Pointer::fmt(&(buffer as *const wgpu::Buffer), f),
        }
    }
}

impl<T: Element> DeviceBuffer<T> {
    pub(crate) fn new_emulated(label: String, device_id: u64, data: Vec<T>) -> Self {
        Self {
            label,
            len: data.len(),
            device_id,
            storage: Storage::Emulated(Arc::new(Mutex::new(data))),
        }
    }

    pub(crate) fn new_gpu(
        label: String,
        len: usize,
        device_id: u64,
        buffer: wgpu::Buffer,
        context: Arc<GpuContext>,
    ) -> Self {
        Self {
            label,
            len,
            device_id,
            storage: Storage::Gpu { buffer, context },
        }
    }

    /// Returns the number of elements.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn size_bytes(&self) -> u64 {
        (self.len * mem::size_of::<T>()) as u64
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn device_id(&self) -> u64 {
        self.device_id
    }

    /// Whether both buffers are the same allocation.
    pub fn same_allocation(&self, other: &DeviceBuffer<T>) -> bool {
        match (&self.storage, &other.storage) {
            (Storage::Emulated(a), Storage::Emulated(b)) => Arc::ptr_eq(a, b),
            (Storage::Gpu { buffer: a, .. }, Storage::Gpu { buffer: b, .. }) => std::ptr::eq(a, b),
            _ => false,
        }
    }

    /// Shared storage for emulated kernels, `None` for GPU buffers.
    pub fn emulated_memory(&self) -> Option<DeviceMemory<T>> {
        match &self.storage {
            Storage::Emulated(memory) => Some(Arc::clone(memory)),
            Storage::Gpu { .. } => None,
        }
    }

    /// Binding of this buffer into a WGSL kernel, `None` for emulated buffers.
    pub fn shader_binding(&self, kind: BindKind) -> Option<ShaderBinding<'_>> {
        match &self.storage {
            Storage::Gpu { buffer, .. } => Some(ShaderBinding { buffer, kind }),
            Storage::Emulated(_) => None,
        }
    }

    fn check_stream(&self, stream: &Stream) -> Result<()> {
        if stream.device_id() != self.device_id {
            return Err(SparseError::InvalidPointer(format!(
                "Buffer '{}' lives on device {}, stream {} runs on device {}",
                self.label,
                self.device_id,
                stream.id(),
                stream.device_id()
            )));
        }
        Ok(())
    }

    /// Enqueues a copy of `data` into the buffer. Returns before the copy runs.
    pub fn write_contents(&self, stream: &Stream, data: &[T]) -> Result<()> {
        self.check_stream(stream)?;
        if data.len() != self.len {
            return Err(SparseError::InvalidSize(format!(
                "Data length ({}) does not match buffer '{}' length ({})",
                data.len(),
                self.label,
                self.len
            )));
        }
        match &self.storage {
            Storage::Emulated(memory) => {
                let memory = Arc::clone(memory);
                let data = data.to_vec();
                stream.enqueue(Box::new(move || {
                    memory.lock().copy_from_slice(&data);
                    Ok(())
                }))?;
            }
            Storage::Gpu { buffer, context } => {
                context.write_buffer(buffer, data)?;
            }
        }
        stream.record_to_device(self.size_bytes());
        log::trace!("Enqueued {} byte write to '{}'", self.size_bytes(), self.label);
        Ok(())
    }

    /// Reads the buffer back once all work enqueued before it on `stream` has run.
    pub async fn read_contents(&self, stream: &Stream) -> Result<Vec<T>> {
        self.check_stream(stream)?;
        let contents = match &self.storage {
            Storage::Emulated(memory) => {
                let memory = Arc::clone(memory);
                let (sender, receiver) = oneshot::channel();
                stream.enqueue(Box::new(move || {
                    let _ = sender.send(memory.lock().clone());
                    Ok(())
                }))?;
                receiver.await.map_err(|_| {
                    SparseError::Internal(format!(
                        "Stream {} stopped before reading '{}'",
                        stream.id(),
                        self.label
                    ))
                })?
            }
            Storage::Gpu { buffer, context } => {
                context.read_buffer_to_cpu::<T>(buffer, self.len).await?
            }
        };
        stream.record_from_device(self.size_bytes());
        Ok(contents)
    }

    /// Blocking form of [`DeviceBuffer::read_contents`].
    #[cfg(feature = "native")]
    pub fn read_contents_blocking(&self, stream: &Stream) -> Result<Vec<T>> {
        pollster::block_on(self.read_contents(stream))
    }
}
