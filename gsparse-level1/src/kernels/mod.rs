//! Kernel families and their backend launchers.
//!
//! A level-1 kernel updates, for every stored entry `i` of a sparse vector,
//! the pair `(x_val[i], y[x_ind[i] - base])`. The update itself is
//! described once by a [`Level1Kernel`]; the emulated and GPU launchers
//! run it over the launch grid.

mod emulated;
mod gpu;

use gsparse_core::{BackendKind, DeviceBuffer, Element, LaunchConfig, Result, Scalar, Stream};

/// One family of level-1 kernels with `N` scalar coefficients.
pub(crate) trait Level1Kernel<const N: usize> {
    /// Base routine name, e.g. `roti`.
    const NAME: &'static str;

    /// WGSL template. `SCALAR` and `BLOCK_SIZE` are substituted at launch.
    /// It defines the entry points `main_host` and `main_device`.
    const SHADER: &'static str;

    /// Whether the kernel stores into `x_val`.
    const WRITES_X: bool;

    /// Coefficients for which the kernel leaves both vectors unchanged.
    fn is_noop<T: Scalar>(scalars: &[T; N]) -> bool;

    /// New values of `(x_val[i], y[idx])`.
    fn update<T: Scalar>(scalars: &[T; N], x: T, y: T) -> (T, T);
}

/// Scalar coefficients in the residency the pointer mode selected.
#[derive(Debug)]
pub(crate) enum Scalars<'a, T: Element, const N: usize> {
    /// Read on the host at dispatch time.
    Host([T; N]),
    /// Read by the kernel when it executes.
    Device([&'a DeviceBuffer<T>; N]),
}

/// Validated vector arguments of a launch.
#[derive(Debug)]
pub(crate) struct SparseOperands<'a, T: Element> {
    pub nnz: usize,
    pub base: i32,
    pub x_val: &'a DeviceBuffer<T>,
    pub x_ind: &'a DeviceBuffer<i32>,
    pub y: &'a DeviceBuffer<T>,
}

/// Enqueues `K` on `stream`'s backend. Returns without waiting.
pub(crate) fn enqueue<K, T, const N: usize>(
    stream: &Stream,
    config: LaunchConfig,
    operands: &SparseOperands<'_, T>,
    scalars: Scalars<'_, T, N>,
) -> Result<()>
where
    K: Level1Kernel<N>,
    T: Scalar,
{
    match stream.backend_kind() {
        BackendKind::Emulated => emulated::launch::<K, T, N>(stream, config, operands, scalars),
        BackendKind::Gpu => gpu::launch::<K, T, N>(stream, config, operands, scalars),
    }
}
