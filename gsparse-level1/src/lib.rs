//! `gsparse-level1`: sparse level-1 routines over [`gsparse_core`] handles.
//!
//! Each routine validates its arguments in a fixed order, chooses a kernel
//! variant from the handle's pointer mode and enqueues it on the handle's
//! stream without waiting. See [`dispatch`] for the shared sequence.

pub mod axpyi;
pub mod dispatch;
mod kernels;
pub mod roti;

pub use axpyi::{axpyi, caxpyi, daxpyi, saxpyi, zaxpyi, AXPYI_BLOCK_SIZE};
pub use dispatch::ScalarArg;
pub use roti::{croti, droti, roti, sroti, zroti, ROTI_BLOCK_SIZE};

// Re-export the core surface callers need alongside the routines.
pub use gsparse_core::{
    Complex32, Complex64, Device, DeviceBuffer, Handle, IndexBase, PointerMode, Result, Scalar,
    SparseError, Status, Stream,
};
