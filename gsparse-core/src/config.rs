use crate::trace::{FileTracer, LogTracer, Tracer};
use std::path::PathBuf;
use std::sync::Arc;

/// Bitmask selecting the instrumentation layers.
pub const LAYER_ENV: &str = "GSPARSE_LAYER";
/// File that receives traced calls instead of the `log` facade.
pub const TRACE_PATH_ENV: &str = "GSPARSE_LOG_TRACE_PATH";

/// Instrumentation layers enabled on a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LayerMode(u32);

impl LayerMode {
    pub const NONE: Self = Self(0);
    pub const TRACE: Self = Self(1);

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, other: LayerMode) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }
}

/// Settings read from the environment when a handle is created.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub layer_mode: LayerMode,
    pub trace_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let layer_mode = match lookup(LAYER_ENV) {
            None => LayerMode::NONE,
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(bits) => LayerMode::from_bits(bits),
                Err(_) => {
                    log::warn!("Ignoring malformed {}={:?}, tracing stays off", LAYER_ENV, raw);
                    LayerMode::NONE
                }
            },
        };
        let trace_path = lookup(TRACE_PATH_ENV)
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from);
        Self {
            layer_mode,
            trace_path,
        }
    }

    /// Tracer selected by this configuration.
    ///
    /// The trace file is only opened when the layer mode enables tracing.
    /// Falls back to [`LogTracer`] when the file cannot be opened.
    pub fn tracer(&self) -> Arc<dyn Tracer> {
        let path = self
            .trace_path
            .as_ref()
            .filter(|_| self.layer_mode.contains(LayerMode::TRACE));
        if let Some(path) = path {
            match FileTracer::open(path) {
                Ok(tracer) => return Arc::new(tracer),
                Err(e) => log::warn!(
                    "Cannot open trace file {}: {}, tracing to log instead",
                    path.display(),
                    e
                ),
            }
        }
        Arc::new(LogTracer)
    }
}
