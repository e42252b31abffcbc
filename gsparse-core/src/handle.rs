use crate::config::{Config, LayerMode};
use crate::device::Device;
use crate::error::Result;
use crate::stream::Stream;
use crate::trace::{TraceRecord, Tracer};
use crate::types::PointerMode;
use std::sync::Arc;

const fn parse_version_part(part: &str) -> i32 {
    let bytes = part.as_bytes();
    let mut value = 0i32;
    let mut i = 0;
    while i < bytes.len() {
        value = value * 10 + (bytes[i] - b'0') as i32;
        i += 1;
    }
    value
}

/// Library version encoded as `major * 100000 + minor * 100 + patch`.
pub const VERSION: i32 = parse_version_part(env!("CARGO_PKG_VERSION_MAJOR")) * 100_000
    + parse_version_part(env!("CARGO_PKG_VERSION_MINOR")) * 100
    + parse_version_part(env!("CARGO_PKG_VERSION_PATCH"));

/// The library context passed to every operation.
///
/// Holds a clone of the stream work is enqueued on (the stream itself is
/// not owned), the pointer mode scalars are read with, and the trace sink.
#[derive(Debug)]
pub struct Handle {
    stream: Stream,
    pointer_mode: PointerMode,
    layer_mode: LayerMode,
    tracer: Arc<dyn Tracer>,
}

impl Handle {
    /// Creates a handle on the null stream of the default device, configured
    /// from the environment.
    pub fn new() -> Result<Self> {
        let device = Device::default_device()?;
        Ok(Self::with_config(&device, &Config::from_env()))
    }

    /// Creates a handle on the null stream of `device`, configured from the environment.
    pub fn with_device(device: &Device) -> Self {
        Self::with_config(device, &Config::from_env())
    }

    pub fn with_config(device: &Device, config: &Config) -> Self {
        let handle = Self {
            stream: device.null_stream(),
            pointer_mode: PointerMode::HOST,
            layer_mode: config.layer_mode,
            tracer: config.tracer(),
        };
        log::debug!(
            "Created handle on stream {} (layer mode {})",
            handle.stream.id(),
            handle.layer_mode.bits()
        );
        handle
    }

    pub fn stream(&self) -> &Stream {
        &self.stream
    }

    /// Replaces the stream later operations enqueue on. Work already queued on
    /// the previous stream is not ordered with respect to the new one.
    pub fn set_stream(&mut self, stream: Stream) {
        log::debug!("Handle stream {} -> {}", self.stream.id(), stream.id());
        self.stream = stream;
    }

    pub fn pointer_mode(&self) -> PointerMode {
        self.pointer_mode
    }

    pub fn set_pointer_mode(&mut self, pointer_mode: PointerMode) {
        self.pointer_mode = pointer_mode;
    }

    pub fn version(&self) -> i32 {
        VERSION
    }

    pub fn layer_mode(&self) -> LayerMode {
        self.layer_mode
    }

    pub fn set_layer_mode(&mut self, layer_mode: LayerMode) {
        self.layer_mode = layer_mode;
    }

    pub fn tracer(&self) -> &Arc<dyn Tracer> {
        &self.tracer
    }

    pub fn set_tracer(&mut self, tracer: Arc<dyn Tracer>) {
        self.tracer = tracer;
    }

    pub fn trace_enabled(&self) -> bool {
        self.layer_mode.contains(LayerMode::TRACE)
    }

    /// Hands a record to the tracer when tracing is enabled. Never fails.
    ///
    /// `build` only runs when the record will actually be emitted.
    pub fn trace(&self, build: impl FnOnce() -> TraceRecord) {
        if !self.trace_enabled() {
            return;
        }
        let record = build();
        if let Err(e) = self.tracer.trace(&record) {
            log::warn!("Tracing {} failed: {}", record.routine(), e);
        }
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        log::debug!("Destroying handle on stream {}", self.stream.id());
    }
}
