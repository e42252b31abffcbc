//! # gsparse core
//!
//! The context and resource model shared by every gsparse routine: status
//! codes, the enum types of the C-style API, the execution backend
//! (devices, streams and device buffers), the library handle, matrix
//! descriptors, opaque analysis resources, call tracing and configuration.

pub mod auxiliary;
pub mod buffer;
pub mod config;
pub mod context;
pub mod descriptor;
pub mod device;
pub mod error;
pub mod handle;
pub mod resources;
pub mod stream;
pub mod trace;
pub mod traits;
pub mod types;

pub use buffer::{DeviceBuffer, DeviceMemory};
pub use config::{Config, LayerMode};
pub use context::{BindKind, ShaderBinding, ShaderLaunch};
pub use descriptor::MatDescr;
pub use device::Device;
pub use error::{Result, SparseError, Status};
pub use handle::{Handle, VERSION};
pub use resources::{AnalysisKind, HybLayout, HybMat, HybPartition, MatInfo};
pub use stream::{BackendKind, DeviceFault, DeviceResult, LaunchConfig, Stream, StreamStats};
pub use trace::{FileTracer, LogTracer, RecordingTracer, TraceRecord, Tracer};
pub use traits::{Element, Scalar};
pub use types::{DiagType, FillMode, IndexBase, MatrixType, PointerMode};
pub use num_complex::{Complex32, Complex64};
