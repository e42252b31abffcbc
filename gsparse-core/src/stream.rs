//! In-order execution streams.
//!
//! A stream accepts work and returns before the work runs. Commands on one
//! stream execute in enqueue order; commands on different streams have no
//! ordering relative to each other.

use crate::context::{GpuContext, ShaderLaunch};
use crate::error::{Result, SparseError};
use futures::channel::{mpsc, oneshot};
use parking_lot::Mutex;
use std::fmt;
use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub(crate) fn next_id() -> u64 {
    static NEXT_ID: AtomicU64 = AtomicU64::new(1);
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// An invalid memory access detected while a kernel executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceFault(pub String);

impl DeviceFault {
    pub fn out_of_bounds(kernel: &str, index: i64, len: usize) -> Self {
        DeviceFault(format!(
            "{}: access at index {} outside buffer of length {}",
            kernel, index, len
        ))
    }
}

impl fmt::Display for DeviceFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub type DeviceResult = core::result::Result<(), DeviceFault>;

type Command = Box<dyn FnOnce() -> DeviceResult + Send + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Host threads standing in for the accelerator.
    Emulated,
    /// A wgpu compute device.
    Gpu,
}

/// Grid shape of a kernel launch: `blocks` blocks of `threads_per_block` threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchConfig {
    pub blocks: u32,
    pub threads_per_block: u32,
}

impl LaunchConfig {
    /// Smallest grid of `block_size`-wide blocks covering `n` elements.
    pub fn for_elements(n: usize, block_size: u32) -> Self {
        let block = block_size.max(1) as usize;
        let blocks = if n == 0 { 0 } else { (n - 1) / block + 1 };
        Self {
            blocks: blocks as u32,
            threads_per_block: block_size,
        }
    }

    pub fn total_threads(&self) -> usize {
        self.blocks as usize * self.threads_per_block as usize
    }

    /// Global thread ids of the grid, in launch order.
    pub fn global_ids(&self) -> Range<usize> {
        0..self.total_threads()
    }
}

/// Work counters of a stream.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StreamStats {
    pub kernels_launched: u64,
    pub bytes_to_device: u64,
    pub bytes_from_device: u64,
}

#[derive(Debug, Default)]
struct StreamCounters {
    kernels_launched: AtomicU64,
    bytes_to_device: AtomicU64,
    bytes_from_device: AtomicU64,
}

struct EmulatedQueue {
    sender: mpsc::UnboundedSender<Command>,
    fault: Arc<Mutex<Option<DeviceFault>>>,
}

enum Backend {
    Emulated(EmulatedQueue),
    Gpu(Arc<GpuContext>),
}

struct StreamInner {
    id: u64,
    device_id: u64,
    backend: Backend,
    counters: StreamCounters,
}

/// Handle to an execution stream. Clones refer to the same stream.
///
/// An emulated stream owns one worker thread, which exits once every clone
/// is dropped and the already enqueued work has drained.
#[derive(Clone)]
pub struct Stream {
    inner: Arc<StreamInner>,
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("id", &self.inner.id)
            .field("device_id", &self.inner.device_id)
            .field("backend", &self.backend_kind())
            .finish()
    }
}

impl PartialEq for Stream {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Stream {}

impl Stream {
    pub(crate) fn emulated(device_id: u64) -> Result<Self> {
        let id = next_id();
        let (sender, receiver) = mpsc::unbounded::<Command>();
        let fault = Arc::new(Mutex::new(None));
        let worker_fault = Arc::clone(&fault);

        std::thread::Builder::new()
            .name(format!("gsparse-stream-{}", id))
            .spawn(move || {
                for command in futures::executor::block_on_stream(receiver) {
                    if let Err(device_fault) = command() {
                        log::error!("Device fault on stream {}: {}", id, device_fault);
                        let mut slot = worker_fault.lock();
                        if slot.is_none() {
                            *slot = Some(device_fault);
                        }
                    }
                }
                log::debug!("Stream {} drained, worker exiting", id);
            })
            .map_err(|e| SparseError::Internal(format!("Failed to spawn stream worker: {}", e)))?;

        log::debug!("Created emulated stream {} on device {}", id, device_id);
        Ok(Self {
            inner: Arc::new(StreamInner {
                id,
                device_id,
                backend: Backend::Emulated(EmulatedQueue { sender, fault }),
                counters: StreamCounters::default(),
            }),
        })
    }

    pub(crate) fn gpu(device_id: u64, context: Arc<GpuContext>) -> Self {
        let id = next_id();
        log::debug!("Created GPU stream {} on device {}", id, device_id);
        Self {
            inner: Arc::new(StreamInner {
                id,
                device_id,
                backend: Backend::Gpu(context),
                counters: StreamCounters::default(),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Id of the device this stream executes on.
    pub fn device_id(&self) -> u64 {
        self.inner.device_id
    }

    pub fn backend_kind(&self) -> BackendKind {
        match self.inner.backend {
            Backend::Emulated(_) => BackendKind::Emulated,
            Backend::Gpu(_) => BackendKind::Gpu,
        }
    }

    /// Whether GPU kernels over `f64` can run on this stream.
    pub fn supports_shader_f64(&self) -> bool {
        match &self.inner.backend {
            Backend::Emulated(_) => true,
            Backend::Gpu(context) => context.supports_f64(),
        }
    }

    /// Largest block size a GPU launch may use, `None` on emulated streams.
    pub fn max_block_size(&self) -> Option<u32> {
        match &self.inner.backend {
            Backend::Emulated(_) => None,
            Backend::Gpu(context) => Some(context.max_workgroup_size()),
        }
    }

    /// Largest block count a GPU launch may use, `None` on emulated streams.
    pub fn max_blocks(&self) -> Option<u32> {
        match &self.inner.backend {
            Backend::Emulated(_) => None,
            Backend::Gpu(context) => Some(context.max_workgroups()),
        }
    }

    pub(crate) fn gpu_context(&self) -> Option<&Arc<GpuContext>> {
        match &self.inner.backend {
            Backend::Gpu(context) => Some(context),
            Backend::Emulated(_) => None,
        }
    }

    /// Appends a raw command to an emulated stream.
    pub(crate) fn enqueue(&self, command: Command) -> Result<()> {
        match &self.inner.backend {
            Backend::Emulated(queue) => queue.sender.unbounded_send(command).map_err(|_| {
                SparseError::Internal(format!("Stream {} worker is no longer running", self.id()))
            }),
            Backend::Gpu(_) => Err(SparseError::NotImplemented(
                "Host closures cannot be enqueued on a GPU stream".to_string(),
            )),
        }
    }

    /// Enqueues an emulated kernel. Returns once queued, not once executed.
    pub fn launch<F>(&self, name: &'static str, kernel: F) -> Result<()>
    where
        F: FnOnce() -> DeviceResult + Send + 'static,
    {
        self.enqueue(Box::new(kernel))?;
        let launched = self.inner.counters.kernels_launched.fetch_add(1, Ordering::Relaxed) + 1;
        log::trace!("Enqueued {} on stream {} ({} launched)", name, self.id(), launched);
        Ok(())
    }

    /// Submits a WGSL kernel on a GPU stream. Returns without waiting.
    pub fn launch_shader(&self, launch: ShaderLaunch<'_>) -> Result<()> {
        let context = self.gpu_context().ok_or_else(|| {
            SparseError::NotImplemented("WGSL kernels need a GPU stream".to_string())
        })?;
        let label = launch.label.to_string();
        context.submit_shader(launch)?;
        let launched = self.inner.counters.kernels_launched.fetch_add(1, Ordering::Relaxed) + 1;
        log::trace!("Submitted {} on stream {} ({} launched)", label, self.id(), launched);
        Ok(())
    }

    /// Resolves once everything enqueued before the call has executed.
    ///
    /// A device fault raised by that work is returned here, once.
    pub async fn synchronize(&self) -> Result<()> {
        match &self.inner.backend {
            Backend::Emulated(queue) => {
                let (sender, receiver) = oneshot::channel::<()>();
                self.enqueue(Box::new(move || {
                    // The caller may have stopped waiting; that is fine.
                    let _ = sender.send(());
                    Ok(())
                }))?;
                receiver.await.map_err(|_| {
                    SparseError::Internal(format!(
                        "Stream {} stopped before synchronization",
                        self.id()
                    ))
                })?;
                match queue.fault.lock().take() {
                    Some(fault) => Err(SparseError::Internal(format!("Device fault: {}", fault))),
                    None => Ok(()),
                }
            }
            Backend::Gpu(context) => context.wait_idle(),
        }
    }

    /// Blocking form of [`Stream::synchronize`].
    #[cfg(feature = "native")]
    pub fn synchronize_blocking(&self) -> Result<()> {
        pollster::block_on(self.synchronize())
    }

    pub fn stats(&self) -> StreamStats {
        let counters = &self.inner.counters;
        StreamStats {
            kernels_launched: counters.kernels_launched.load(Ordering::Relaxed),
            bytes_to_device: counters.bytes_to_device.load(Ordering::Relaxed),
            bytes_from_device: counters.bytes_from_device.load(Ordering::Relaxed),
        }
    }

    pub fn reset_stats(&self) {
        let counters = &self.inner.counters;
        counters.kernels_launched.store(0, Ordering::Relaxed);
        counters.bytes_to_device.store(0, Ordering::Relaxed);
        counters.bytes_from_device.store(0, Ordering::Relaxed);
        log::info!("Stream {} counters reset.", self.id());
    }

    pub(crate) fn record_to_device(&self, bytes: u64) {
        self.inner.counters.bytes_to_device.fetch_add(bytes, Ordering::Relaxed);
    }

    pub(crate) fn record_from_device(&self, bytes: u64) {
        self.inner.counters.bytes_from_device.fetch_add(bytes, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pollster::block_on;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_launch_config_rounds_up() {
        let config = LaunchConfig::for_elements(1, 512);
        assert_eq!(config.blocks, 1);
        let config = LaunchConfig::for_elements(512, 512);
        assert_eq!(config.blocks, 1);
        let config = LaunchConfig::for_elements(513, 512);
        assert_eq!(config.blocks, 2);
        assert_eq!(config.total_threads(), 1024);
        assert_eq!(LaunchConfig::for_elements(0, 512).blocks, 0);
    }

    #[test]
    fn test_commands_run_in_enqueue_order() {
        let stream = Stream::emulated(0).unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        for i in 0..32 {
            let log = Arc::clone(&log);
            stream
                .launch("push", move || {
                    log.lock().push(i);
                    Ok(())
                })
                .unwrap();
        }
        block_on(stream.synchronize()).unwrap();
        assert_eq!(*log.lock(), (0..32).collect::<Vec<_>>());
        assert_eq!(stream.stats().kernels_launched, 32);
    }

    #[test]
    fn test_fault_is_reported_once_on_synchronize() {
        let stream = Stream::emulated(0).unwrap();
        let ran_after = Arc::new(AtomicUsize::new(0));
        stream
            .launch("faulty", || Err(DeviceFault::out_of_bounds("faulty", 9, 3)))
            .unwrap();
        let counter = Arc::clone(&ran_after);
        stream
            .launch("after", move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .unwrap();

        let err = block_on(stream.synchronize()).unwrap_err();
        assert!(matches!(err, SparseError::Internal(ref msg) if msg.contains("index 9")));
        assert_eq!(ran_after.load(Ordering::SeqCst), 1);
        assert!(block_on(stream.synchronize()).is_ok());
    }

    #[test]
    fn test_clones_share_identity_and_counters() {
        let stream = Stream::emulated(7).unwrap();
        let clone = stream.clone();
        assert_eq!(stream, clone);
        assert_eq!(clone.device_id(), 7);
        clone.launch("noop", || Ok(())).unwrap();
        assert_eq!(stream.stats().kernels_launched, 1);
        stream.reset_stats();
        assert_eq!(clone.stats(), StreamStats::default());
    }
}
